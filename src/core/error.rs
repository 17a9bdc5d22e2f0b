//! Error taxonomy for the tool workflows.
//!
//! Collaborator failures never reach the user raw: every workflow boundary
//! converts them into one of these kinds before updating state.

use thiserror::Error;

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// A user-visible workflow failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// Malformed or missing input; recovered locally, no request issued.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Branch discovery failed or found nothing.
    #[error("{0}")]
    Resolution(#[from] ResolutionError),

    /// The artifact request failed.
    #[error("{0}")]
    Generation(String),

    /// Credential missing or rejected. Triggers a redirect, not a banner.
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Local failure such as clipboard access or writing a file.
    #[error("{0}")]
    ClientSide(String),
}

impl WorkflowError {
    /// Whether this error is shown as a dismissible banner.
    pub fn is_banner(&self) -> bool {
        !matches!(self, Self::Auth(_))
    }
}

/// Input guard violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a GitHub repository URL")]
    MissingRepositoryUrl,

    #[error("Please enter a valid GitHub repository URL")]
    InvalidRepositoryUrl,

    #[error("Please select a branch")]
    MissingBranch,

    #[error("Branch '{0}' is not available for this repository")]
    UnknownBranch(String),

    #[error("Please enter your question")]
    MissingQuestion,

    #[error("No summary to download. Please generate a summary first.")]
    NothingToDownload,
}

/// Branch discovery failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("No branches found for this repository")]
    NoBranchesFound,

    #[error("{0}")]
    Failed(String),

    #[error("Authentication required")]
    Unauthorized,
}

/// Session failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Not signed in")]
    MissingCredential,

    #[error("Session expired, please sign in again")]
    Rejected,

    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("Signup failed: {0}")]
    SignupFailed(String),

    #[error("Could not resolve the current session: {0}")]
    LookupFailed(String),
}
