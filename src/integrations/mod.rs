//! Collaborating services.
//!
//! The account service issues credentials; the analysis service lists
//! branches and produces artifacts. Both sit behind traits so the workflows
//! can be driven without a network.

pub mod api;
pub mod auth;
pub mod backend;

pub use api::{ApiError, ApiResult, Envelope};
pub use auth::{AuthClient, AuthService};
pub use backend::{AskRequest, GenerationBackend, HttpBackend};
