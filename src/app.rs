//! Application state and navigation.
//!
//! The `App` ties the session to the two services and hands out tool
//! workflows. Opening a tool goes through the session guard; a missing
//! credential redirects to login before any workflow exists.

use std::sync::Arc;

use crate::core::{
    AuthError, Config, RepositoryReference, ResolutionError, TokenStoreKind, WorkflowError,
};
use crate::integrations::{AuthClient, AuthService, GenerationBackend, HttpBackend};
use crate::security::{
    FileTokenStore, KeyringTokenStore, Route, Session, SignOutReason, TokenStore,
};
use crate::workflow::{
    BranchResolver, BranchSelection, DirectorySink, QaWorkflow, ReadmeTool, ReadmeWorkflow,
    SummaryTool, SummaryWorkflow,
};

/// Reachability of the two services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceHealth {
    pub auth: Result<(), String>,
    pub api: Result<(), String>,
}

impl ServiceHealth {
    pub fn is_healthy(&self) -> bool {
        self.auth.is_ok() && self.api.is_ok()
    }
}

/// Greeting shown on the hub.
pub fn greeting(username: &str) -> String {
    format!("Welcome {username} !!")
}

/// Main application state.
pub struct App {
    config: Config,
    session: Session,
    auth: Arc<dyn AuthService>,
    backend: Arc<dyn GenerationBackend>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl App {
    /// Load configuration and connect to the configured services.
    pub fn new() -> anyhow::Result<Self> {
        Self::from_config(Config::load()?)
    }

    /// Connect to the services named in `config`, restoring any stored session.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let store: Box<dyn TokenStore> = match config.session.store {
            TokenStoreKind::File => Box::new(FileTokenStore::in_data_dir()?),
            TokenStoreKind::Keyring => Box::new(KeyringTokenStore::new()),
        };
        let timeout = config.http.timeout();
        let auth = AuthClient::new(config.endpoints.auth_url.clone(), timeout)?;
        let backend = HttpBackend::new(config.endpoints.api_url.clone(), timeout)?;

        Ok(Self::with_services(config, Session::new(store), Arc::new(auth), Arc::new(backend)))
    }

    /// Assemble an app from explicit parts.
    pub fn with_services(
        config: Config,
        session: Session,
        auth: Arc<dyn AuthService>,
        backend: Arc<dyn GenerationBackend>,
    ) -> Self {
        Self { config, session, auth, backend }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Current route.
    pub fn route(&self) -> Route {
        self.session.route()
    }

    /// Sign in and move to the hub.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::LoginFailed("Username and password are required".into()));
        }

        match self.auth.login(username.trim(), password).await {
            Ok(credential) => {
                self.session.sign_in(credential);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Login failed");
                let message = e.reported_message().unwrap_or("Login failed");
                Err(AuthError::LoginFailed(message.into()))
            }
        }
    }

    /// Create an account and move to the login route.
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        if username.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::SignupFailed("Missing required fields".into()));
        }

        match self.auth.signup(username.trim(), email.trim(), password).await {
            Ok(()) => {
                tracing::info!(username = username.trim(), "Account created");
                self.session.navigate(Route::Login);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Signup failed");
                let message = e.reported_message().unwrap_or("Signup failed");
                Err(AuthError::SignupFailed(message.into()))
            }
        }
    }

    /// Sign out.
    pub fn logout(&self) {
        self.session.invalidate(SignOutReason::Logout);
    }

    /// Enter the hub, resolving the signed-in username.
    ///
    /// A rejected credential is cleared; any other lookup failure sends the
    /// user back to login without clearing it.
    pub async fn enter_hub(&self) -> Result<String, WorkflowError> {
        let credential = self.session.require()?;

        match self.auth.current_user(&credential).await {
            Ok(username) => {
                self.session.navigate(Route::Hub);
                Ok(username)
            }
            Err(e) if self.session.screen(&e) => Err(AuthError::Rejected.into()),
            Err(e) => {
                tracing::warn!(error = %e, "Could not resolve current user");
                self.session.navigate(Route::Login);
                Err(AuthError::LookupFailed(e.to_string()).into())
            }
        }
    }

    /// Return to the hub.
    pub fn back_to_hub(&self) -> Route {
        self.session.navigate(Route::Hub)
    }

    /// Open the codebase Q&A tool.
    pub fn open_qa(&self) -> Result<QaWorkflow, WorkflowError> {
        self.session.require()?;
        self.session.navigate(Route::Qa);
        let workflow = &self.config.workflow;
        Ok(QaWorkflow::with_timing(
            Arc::clone(&self.backend),
            self.session.clone(),
            workflow.debounce(),
            workflow.notice_ttl(),
            self.config.retry.to_retry_config(),
        ))
    }

    /// Open the README generator.
    pub fn open_readme(&self) -> Result<ReadmeWorkflow, WorkflowError> {
        self.session.require()?;
        self.session.navigate(Route::Readme);
        Ok(ReadmeWorkflow::with_notice_ttl(
            ReadmeTool,
            Arc::clone(&self.backend),
            self.session.clone(),
            self.config.workflow.notice_ttl(),
        ))
    }

    /// Open the file-to-file summarizer.
    pub fn open_summary(&self) -> Result<SummaryWorkflow, WorkflowError> {
        self.session.require()?;
        self.session.navigate(Route::Summary);
        Ok(SummaryWorkflow::with_notice_ttl(
            SummaryTool,
            Arc::clone(&self.backend),
            self.session.clone(),
            self.config.workflow.notice_ttl(),
        ))
    }

    /// List a repository's branches without opening a tool.
    pub async fn list_branches(&self, url: &str) -> Result<BranchSelection, WorkflowError> {
        let reference = RepositoryReference::parse(url)?;
        let credential = self.session.require()?;
        let retry = self.config.retry.to_retry_config();
        let resolver = BranchResolver::with_retry(Arc::clone(&self.backend), retry);

        match resolver.resolve(&reference, &credential).await {
            Ok(selection) => Ok(selection),
            Err(ResolutionError::Unauthorized) => {
                self.session.invalidate(SignOutReason::Rejected);
                Err(AuthError::Rejected.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Where downloads are saved.
    pub fn download_sink(&self) -> DirectorySink {
        DirectorySink::new(self.config.workflow.download_path())
    }

    /// Check that both services answer.
    pub async fn health(&self) -> ServiceHealth {
        let (auth, api) = tokio::join!(self.auth.health(), self.backend.health());
        ServiceHealth {
            auth: auth.map_err(|e| e.to_string()),
            api: api.map_err(|e| e.to_string()),
        }
    }
}
