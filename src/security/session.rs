//! Session context and guard.
//!
//! One [`Session`] is built per process and cloned into every workflow. It
//! owns the single credential slot and the current [`Route`]. All credential
//! clearing goes through [`Session::invalidate`], which also redirects to the
//! login route.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;

use super::credentials::{Credential, MemoryTokenStore, TokenStore};
use crate::core::{AuthError, WorkflowError};
use crate::integrations::ApiError;

/// Pages a front end can be on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Unauthenticated entry point
    Login,
    /// Account creation
    Signup,
    /// Navigation hub listing the tools
    Hub,
    /// Codebase Q&A
    Qa,
    /// README generator
    Readme,
    /// File-to-file summarizer
    Summary,
}

impl Route {
    /// Whether the route requires a credential.
    pub fn is_protected(self) -> bool {
        !matches!(self, Self::Login | Self::Signup)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Login => "login",
            Self::Signup => "signup",
            Self::Hub => "hub",
            Self::Qa => "qa",
            Self::Readme => "readme",
            Self::Summary => "summary",
        };
        f.write_str(name)
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    /// The user logged out.
    Logout,
    /// A collaborator rejected the credential.
    Rejected,
    /// A protected page was opened without a credential.
    Missing,
}

struct SessionInner {
    credential: RwLock<Option<Credential>>,
    store: Box<dyn TokenStore>,
    route: watch::Sender<Route>,
}

/// Shared session context.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .field("route", &self.route())
            .finish()
    }
}

impl Session {
    /// Build a session over `store`, restoring any persisted credential.
    ///
    /// An unreadable store is treated as signed out.
    pub fn new(store: Box<dyn TokenStore>) -> Self {
        let credential = match store.load() {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read stored session");
                None
            }
        };
        let route = if credential.is_some() { Route::Hub } else { Route::Login };
        let (route, _) = watch::channel(route);

        Self { inner: Arc::new(SessionInner { credential: RwLock::new(credential), store, route }) }
    }

    /// A session that is never persisted.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryTokenStore::new()))
    }

    /// An in-memory session already holding `credential`.
    pub fn with_credential(credential: Credential) -> Self {
        Self::new(Box::new(MemoryTokenStore::with_credential(credential)))
    }

    /// Current credential, if signed in.
    pub fn credential(&self) -> Option<Credential> {
        self.inner.credential.read().clone()
    }

    /// Whether a credential is present.
    pub fn is_authenticated(&self) -> bool {
        self.inner.credential.read().is_some()
    }

    /// Install a freshly issued credential, replacing any previous one.
    pub fn sign_in(&self, credential: Credential) {
        if let Err(e) = self.inner.store.save(&credential) {
            tracing::warn!(error = %e, "Could not persist session; it will last for this run only");
        }
        *self.inner.credential.write() = Some(credential);
        tracing::info!("Signed in");
        self.navigate(Route::Hub);
    }

    /// Clear the credential everywhere and redirect to login.
    pub fn invalidate(&self, reason: SignOutReason) {
        let had_credential = self.inner.credential.write().take().is_some();
        if let Err(e) = self.inner.store.clear() {
            tracing::warn!(error = %e, "Could not clear stored session");
        }
        if had_credential {
            tracing::info!(reason = ?reason, "Signed out");
        }
        self.navigate(Route::Login);
    }

    /// Guard for protected entry points.
    ///
    /// Returns the credential, or redirects to login when there is none.
    pub fn require(&self) -> Result<Credential, WorkflowError> {
        match self.credential() {
            Some(credential) => Ok(credential),
            None => {
                tracing::debug!("No credential, redirecting to login");
                self.invalidate(SignOutReason::Missing);
                Err(AuthError::MissingCredential.into())
            }
        }
    }

    /// Inspect a collaborator failure; invalidate the session if it was an
    /// authentication rejection.
    ///
    /// Returns `true` when the session was invalidated.
    pub fn screen(&self, error: &ApiError) -> bool {
        if error.is_auth_rejection() {
            self.invalidate(SignOutReason::Rejected);
            true
        } else {
            false
        }
    }

    /// Move to `route`. Protected routes redirect to login when signed out.
    pub fn navigate(&self, route: Route) -> Route {
        let target =
            if route.is_protected() && !self.is_authenticated() { Route::Login } else { route };
        self.inner.route.send_replace(target);
        target
    }

    /// Current route.
    pub fn route(&self) -> Route {
        *self.inner.route.borrow()
    }

    /// Watch route changes.
    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.inner.route.subscribe()
    }
}
