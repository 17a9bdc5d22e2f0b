//! # Repomate
//!
//! Terminal client for AI repository tools: ask questions about a GitHub
//! codebase, generate a README, or summarize it file by file.
//!
//! Every tool follows the same shape. Enter a repository URL, trigger
//! generation, then copy or save the result. Tools are only reachable with
//! a valid session; a credential the services reject is cleared and the
//! user is sent back to login.
//!
//! ## Quick Start
//!
//! ```bash
//! repomate login
//! repomate ask https://github.com/tokio-rs/tokio "Where is the scheduler?"
//! repomate readme https://github.com/serde-rs/serde --output docs
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::unnecessary_literal_bound)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unnecessary_debug_formatting)]

pub mod app;
pub mod core;
pub mod integrations;
pub mod security;
pub mod workflow;

pub use integrations::{ApiError, AuthClient, AuthService, GenerationBackend, HttpBackend};
pub use security::{Credential, Route, Session, SignOutReason};
pub use workflow::{
    Branch, Dispatch, QaWorkflow, ReadmeWorkflow, SummaryWorkflow, Workflow, WorkflowState,
};

// Re-export commonly used types
pub use app::App;
pub use core::{Config, RepositoryReference, WorkflowError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "repomate";
