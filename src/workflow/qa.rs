//! Codebase Q&A.
//!
//! Asking needs a branch, so every URL edit schedules branch discovery
//! through a debouncer. Each discovery carries a ticket; a listing that
//! arrives after a newer ticket was issued is dropped, so the visible branch
//! list always belongs to the latest URL.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{
    ArtifactKind, Branch, BranchResolver, Clipboard, Dispatch, FollowUp, Inner, Workflow,
    WorkflowSnapshot, WorkflowState, DEFAULT_NOTICE_TTL,
};
use crate::core::{
    is_valid_github_url, AuthError, Debouncer, RepositoryReference, ResolutionError, RetryConfig,
    ValidationError, WorkflowError, WorkflowResult, DEFAULT_DEBOUNCE,
};
use crate::integrations::{ApiResult, AskRequest, GenerationBackend};
use crate::security::{Credential, Session, SignOutReason};

/// Shown when asking fails without a reason from the service.
pub const QA_FALLBACK: &str = "Something went wrong. Please try again later.";

const DISCOVERY: &str = "branches";

/// Progress of branch discovery for the current URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchPhase {
    /// No valid URL yet
    #[default]
    Idle,
    /// Waiting out the debounce window
    Scheduled,
    /// Listing request in flight
    Loading,
    /// Branches listed and a default selected
    Ready,
    /// Listing failed; see the error banner
    Failed,
}

impl BranchPhase {
    /// Whether discovery has yet to settle.
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Scheduled | Self::Loading)
    }
}

/// Q&A form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QaFields {
    pub question: String,
    pub branches: Vec<Branch>,
    pub selected_branch: Option<String>,
    pub branch_phase: BranchPhase,
}

/// Question answering about one branch of a repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct QaTool;

#[async_trait]
impl ArtifactKind for QaTool {
    type Fields = QaFields;
    type Request = AskRequest;
    type Payload = String;

    fn name(&self) -> &'static str {
        "qa"
    }

    fn prepare(
        &self,
        reference: &RepositoryReference,
        fields: &QaFields,
    ) -> Result<AskRequest, ValidationError> {
        let branch = fields.selected_branch.as_deref().ok_or(ValidationError::MissingBranch)?;
        if !fields.branches.iter().any(|b| b.name == branch) {
            return Err(ValidationError::UnknownBranch(branch.to_string()));
        }
        let question = fields.question.trim();
        if question.is_empty() {
            return Err(ValidationError::MissingQuestion);
        }

        Ok(AskRequest {
            repo_url: reference.url().to_string(),
            branch: branch.to_string(),
            question: question.to_string(),
        })
    }

    async fn execute(
        &self,
        backend: &dyn GenerationBackend,
        request: AskRequest,
        credential: &Credential,
    ) -> ApiResult<String> {
        backend.ask(&request, credential).await
    }

    fn failure_fallback(&self) -> &'static str {
        QA_FALLBACK
    }

    fn follow_ups(&self) -> &'static [FollowUp] {
        &[FollowUp::Copy]
    }

    fn copied_notice(&self) -> &'static str {
        "Answer copied to clipboard!"
    }

    fn allows_regenerate(&self) -> bool {
        true
    }
}

struct Discovery {
    debouncer: Debouncer<&'static str>,
    resolver: Arc<BranchResolver>,
    latest: Arc<AtomicU64>,
    delay: Duration,
}

/// The Q&A workflow: the shared engine plus branch discovery.
///
/// Dropping the last handle cancels any scheduled discovery.
#[derive(Clone)]
pub struct QaWorkflow {
    engine: Workflow<QaTool>,
    discovery: Arc<Discovery>,
}

impl std::fmt::Debug for QaWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QaWorkflow")
            .field("engine", &self.engine)
            .field("delay", &self.discovery.delay)
            .finish_non_exhaustive()
    }
}

impl QaWorkflow {
    /// Create a workflow with the default debounce, notice and retry timing.
    pub fn new(backend: Arc<dyn GenerationBackend>, session: Session) -> Self {
        Self::with_timing(
            backend,
            session,
            DEFAULT_DEBOUNCE,
            DEFAULT_NOTICE_TTL,
            RetryConfig::default(),
        )
    }

    /// Create a workflow with explicit timing.
    pub fn with_timing(
        backend: Arc<dyn GenerationBackend>,
        session: Session,
        debounce: Duration,
        notice_ttl: Duration,
        retry: RetryConfig,
    ) -> Self {
        let resolver = Arc::new(BranchResolver::with_retry(Arc::clone(&backend), retry));
        Self {
            engine: Workflow::with_notice_ttl(QaTool, backend, session, notice_ttl),
            discovery: Arc::new(Discovery {
                debouncer: Debouncer::new(),
                resolver,
                latest: Arc::new(AtomicU64::new(0)),
                delay: debounce,
            }),
        }
    }

    pub fn session(&self) -> &Session {
        self.engine.session()
    }

    pub fn state(&self) -> WorkflowState {
        self.engine.state()
    }

    pub fn snapshot(&self) -> WorkflowSnapshot<QaTool> {
        self.engine.snapshot()
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<u64> {
        self.engine.subscribe()
    }

    pub fn can_generate(&self) -> bool {
        self.engine.can_generate()
    }

    /// Edit the repository URL.
    ///
    /// Clears the branch list, answer and banner. A well-formed URL schedules
    /// branch discovery after the quiet period; anything else cancels it.
    /// Rejected while a question is being answered. Must be called within a
    /// tokio runtime.
    pub fn set_repo_url(&self, url: impl Into<String>) -> bool {
        let url = url.into();
        let valid = is_valid_github_url(&url);

        let ticket = self.engine.update(|inner| {
            if inner.state == WorkflowState::Loading {
                return None;
            }
            inner.repo_url = url;
            inner.state = WorkflowState::Input;
            inner.artifact = None;
            inner.error = None;
            inner.notice = None;
            inner.fields.branches.clear();
            inner.fields.selected_branch = None;
            inner.fields.branch_phase =
                if valid { BranchPhase::Scheduled } else { BranchPhase::Idle };
            Some(self.next_ticket())
        });
        let Some(ticket) = ticket else {
            return false;
        };

        if valid {
            let engine = self.engine.clone();
            let resolver = Arc::clone(&self.discovery.resolver);
            let latest = Arc::clone(&self.discovery.latest);
            let delay = self.discovery.delay;
            tracing::debug!(ticket, delay_ms = delay.as_millis() as u64, "Scheduling discovery");
            self.discovery.debouncer.schedule(DISCOVERY, delay, async move {
                // Failures are already reflected in state.
                let _ = discover(&engine, &resolver, &latest, ticket).await;
            });
        } else {
            self.discovery.debouncer.cancel(&DISCOVERY);
        }
        true
    }

    /// Run branch discovery now, skipping the debounce.
    pub async fn refresh_branches(&self) -> WorkflowResult<Dispatch> {
        if self.engine.state() == WorkflowState::Loading {
            return Ok(Dispatch::Ignored);
        }
        self.discovery.debouncer.cancel(&DISCOVERY);
        let ticket = self.next_ticket();
        discover(&self.engine, &self.discovery.resolver, &self.discovery.latest, ticket).await
    }

    /// Wait until discovery for the current URL settles.
    pub async fn wait_for_branches(&self) -> BranchPhase {
        let mut changes = self.engine.subscribe();
        loop {
            let phase = self.engine.inspect(|inner| inner.fields.branch_phase);
            if !phase.is_pending() || changes.changed().await.is_err() {
                return phase;
            }
        }
    }

    /// Choose the branch to ask about.
    pub fn select_branch(&self, name: &str) -> WorkflowResult<()> {
        self.engine.update(|inner| {
            if inner.state == WorkflowState::Loading {
                return Ok(());
            }
            if !inner.fields.branches.iter().any(|b| b.name == name) {
                let error = ValidationError::UnknownBranch(name.to_string());
                inner.error = Some(error.clone().into());
                return Err(error.into());
            }
            inner.fields.selected_branch = Some(name.to_string());
            Ok(())
        })
    }

    /// Edit the question. Rejected while a question is being answered.
    pub fn set_question(&self, question: impl Into<String>) -> bool {
        let question = question.into();
        self.engine.update(|inner| {
            if inner.state == WorkflowState::Loading {
                return false;
            }
            inner.fields.question = question;
            true
        })
    }

    /// Ask the question. May be repeated once an answer is shown.
    pub async fn generate(&self) -> WorkflowResult<Dispatch> {
        self.engine.generate().await
    }

    /// Copy the answer.
    pub fn copy(&self, clipboard: &dyn Clipboard) -> WorkflowResult<Dispatch> {
        self.engine.copy(clipboard)
    }

    pub fn dismiss_error(&self) -> bool {
        self.engine.dismiss_error()
    }

    /// Return to an empty form. Ignored while a question is being answered.
    pub fn reset(&self) -> bool {
        let reset = self.engine.update(|inner| {
            if inner.is_busy() {
                return false;
            }
            self.next_ticket();
            *inner = Inner::initial(inner.generation);
            true
        });
        if reset {
            self.discovery.debouncer.cancel(&DISCOVERY);
        }
        reset
    }

    /// Tear down: cancel discovery and drop everything in flight.
    pub fn close(&self) {
        self.discovery.debouncer.cancel_all();
        self.next_ticket();
        self.engine.close();
    }

    fn next_ticket(&self) -> u64 {
        self.discovery.latest.fetch_add(1, Ordering::SeqCst) + 1
    }
}

async fn discover(
    engine: &Workflow<QaTool>,
    resolver: &BranchResolver,
    latest: &AtomicU64,
    ticket: u64,
) -> WorkflowResult<Dispatch> {
    let is_current = || latest.load(Ordering::SeqCst) == ticket;

    let url = engine.inspect(|inner| inner.repo_url.clone());
    let reference = match RepositoryReference::parse(&url) {
        Ok(reference) => reference,
        Err(e) => {
            engine.update(|inner| {
                if is_current() {
                    inner.fields.branch_phase = BranchPhase::Idle;
                    inner.error = Some(e.clone().into());
                }
            });
            return Err(e.into());
        }
    };

    let credential = match engine.session().require() {
        Ok(credential) => credential,
        Err(e) => {
            engine.update(|inner| {
                if is_current() {
                    inner.fields.branch_phase = BranchPhase::Idle;
                }
            });
            return Err(e);
        }
    };

    let started = engine.update(|inner| {
        if !is_current() {
            return false;
        }
        inner.fields.branch_phase = BranchPhase::Loading;
        true
    });
    if !started {
        return Ok(Dispatch::Superseded);
    }

    tracing::debug!(repo = %reference, ticket, "Discovering branches");
    let result = resolver.resolve(&reference, &credential).await;

    let mut rejected = false;
    let outcome = engine.update(|inner| {
        if !is_current() {
            tracing::debug!(repo = %reference, ticket, "Discarding stale branch listing");
            return Ok(Dispatch::Superseded);
        }

        match result {
            Ok(selection) => {
                tracing::debug!(
                    repo = %reference,
                    count = selection.branches.len(),
                    default = %selection.default.name,
                    "Branches discovered"
                );
                inner.fields.branches = selection.branches;
                inner.fields.selected_branch = Some(selection.default.name);
                inner.fields.branch_phase = BranchPhase::Ready;
                Ok(Dispatch::Completed)
            }
            Err(ResolutionError::Unauthorized) => {
                rejected = true;
                inner.fields.branch_phase = BranchPhase::Idle;
                Err(AuthError::Rejected.into())
            }
            Err(e) => {
                inner.fields.branch_phase = BranchPhase::Failed;
                inner.error = Some(e.clone().into());
                Err(WorkflowError::from(e))
            }
        }
    });

    if rejected {
        engine.session().invalidate(SignOutReason::Rejected);
    }
    outcome
}
