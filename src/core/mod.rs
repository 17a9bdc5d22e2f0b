//! Core building blocks shared by every tool.
//!
//! URL validation, debouncing, retries, the error taxonomy and
//! configuration live here; nothing in this module performs network I/O.

mod config;
mod debounce;
mod error;
mod retry;
mod url;

pub use config::{
    Config, EndpointsConfig, HttpConfig, RetrySettings, SessionConfig, TokenStoreKind,
    WorkflowConfig,
};
pub use debounce::{Debouncer, DEFAULT_DEBOUNCE};
pub use error::{AuthError, ResolutionError, ValidationError, WorkflowError, WorkflowResult};
pub use retry::{retry_async_when, RetryConfig, RetryResult};
pub use url::{is_valid_github_url, RepositoryReference};
