//! Tool workflows.
//!
//! The three tools share one state machine, [`Workflow`], parametrized by an
//! [`ArtifactKind`] that supplies the variant guard, the collaborator call,
//! its failure fallbacks and the follow-up actions offered on a result.
//!
//! ```text
//! Input ──generate──▶ Loading ──ok──▶ Complete
//!   ▲                    │
//!   │                    └──fail──▶ Error
//!   └────────reset───────────────────┘
//! ```
//!
//! A workflow is a cheap clonable handle. Its state lives behind a mutex that
//! is never held across an `.await`; every change bumps a revision on a
//! watch channel so front ends can redraw.

mod actions;
mod branches;
mod qa;
mod readme;
mod summary;

#[cfg(test)]
pub(crate) mod testing;

pub use actions::{
    ArtifactSink, Clipboard, DirectorySink, FollowUp, MemoryClipboard, MemorySink,
    SystemClipboard,
};
pub use branches::{
    normalize, select_default, Branch, BranchResolver, BranchSelection, BRANCH_FETCH_FALLBACK,
};
pub use qa::{BranchPhase, QaFields, QaTool, QaWorkflow, QA_FALLBACK};
pub use readme::{ReadmeTool, ReadmeWorkflow, README_FILE};
pub use summary::{SummaryTool, SummaryWorkflow, SUMMARY_DOCUMENT};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::core::{AuthError, RepositoryReference, ValidationError, WorkflowError, WorkflowResult};
use crate::integrations::{ApiError, ApiResult, GenerationBackend};
use crate::security::{Credential, Session};

/// How long copy/download notices stay visible.
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(3);

/// Workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowState {
    /// Collecting input
    Input,
    /// A generation request is in flight
    Loading,
    /// An artifact is available
    Complete,
    /// The last generation failed
    Error,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Input => "input",
            Self::Loading => "loading",
            Self::Complete => "complete",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// What became of a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The action ran to completion.
    Completed,
    /// The workflow was busy or had nothing to act on; no call was issued.
    Ignored,
    /// The call finished after the workflow moved on; its result was dropped.
    Superseded,
}

/// Severity of a transient notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient message about a follow-up action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    expires_at: Instant,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>, ttl: Duration) -> Self {
        Self { level, message: message.into(), expires_at: Instant::now() + ttl }
    }

    /// Whether the notice should still be shown.
    pub fn is_active(&self) -> bool {
        Instant::now() < self.expires_at
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }
}

/// A generated payload and the repository it was generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact<P> {
    pub payload: P,
    pub source: RepositoryReference,
}

/// One tool's contribution to the shared workflow.
#[async_trait]
pub trait ArtifactKind: Send + Sync + 'static {
    /// Form fields beyond the repository URL.
    type Fields: fmt::Debug + Clone + Default + Send + Sync;

    /// What `execute` needs from a validated form.
    type Request: Send;

    /// The generated artifact.
    type Payload: fmt::Debug + Clone + AsRef<str> + Send + Sync;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Variant guard; runs after the URL has been validated.
    fn prepare(
        &self,
        reference: &RepositoryReference,
        fields: &Self::Fields,
    ) -> Result<Self::Request, ValidationError>;

    /// Issue the generation call.
    async fn execute(
        &self,
        backend: &dyn GenerationBackend,
        request: Self::Request,
        credential: &Credential,
    ) -> ApiResult<Self::Payload>;

    /// Message when the call fails without a reason.
    fn failure_fallback(&self) -> &'static str;

    /// Message when the service declines without a reason.
    fn rejection_fallback(&self) -> &'static str {
        self.failure_fallback()
    }

    fn success_notice(&self) -> Option<&'static str> {
        None
    }

    /// Actions offered once complete.
    fn follow_ups(&self) -> &'static [FollowUp];

    fn copied_notice(&self) -> &'static str {
        "Copied to clipboard!"
    }

    /// File name for [`FollowUp::Download`].
    fn file_name(&self) -> Option<&'static str> {
        None
    }

    fn downloaded_notice(&self) -> &'static str {
        "Downloaded successfully!"
    }

    /// Whether `generate` may run again from `Complete`.
    fn allows_regenerate(&self) -> bool {
        false
    }

    /// The user-facing message for a failed call.
    fn failure_message(&self, error: &ApiError) -> String {
        if let Some(message) = error.reported_message() {
            return message.to_string();
        }
        match error {
            ApiError::Rejected { .. } => self.rejection_fallback(),
            _ => self.failure_fallback(),
        }
        .to_string()
    }
}

pub(crate) struct Inner<K: ArtifactKind> {
    pub(crate) state: WorkflowState,
    pub(crate) repo_url: String,
    pub(crate) fields: K::Fields,
    pub(crate) artifact: Option<GeneratedArtifact<K::Payload>>,
    pub(crate) error: Option<WorkflowError>,
    pub(crate) notice: Option<Notice>,
    pub(crate) follow_up: Option<FollowUp>,
    /// Bumped per dispatched request and on teardown; a response carrying an
    /// older value is stale.
    pub(crate) generation: u64,
}

impl<K: ArtifactKind> Inner<K> {
    fn initial(generation: u64) -> Self {
        Self {
            state: WorkflowState::Input,
            repo_url: String::new(),
            fields: K::Fields::default(),
            artifact: None,
            error: None,
            notice: None,
            follow_up: None,
            generation,
        }
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.state == WorkflowState::Loading || self.follow_up.is_some()
    }
}

/// Point-in-time view of a workflow.
#[derive(Debug, Clone)]
pub struct WorkflowSnapshot<K: ArtifactKind> {
    pub state: WorkflowState,
    pub repo_url: String,
    pub fields: K::Fields,
    pub artifact: Option<GeneratedArtifact<K::Payload>>,
    /// Dismissible banner.
    pub error: Option<WorkflowError>,
    /// Active notice; expired notices are never reported.
    pub notice: Option<Notice>,
    /// A follow-up call in flight.
    pub follow_up: Option<FollowUp>,
}

impl<K: ArtifactKind> WorkflowSnapshot<K> {
    /// Text of the current artifact.
    pub fn artifact_text(&self) -> Option<&str> {
        self.artifact.as_ref().map(|a| a.payload.as_ref())
    }
}

struct Shared<K: ArtifactKind> {
    kind: K,
    backend: Arc<dyn GenerationBackend>,
    session: Session,
    notice_ttl: Duration,
    inner: Mutex<Inner<K>>,
    changes: watch::Sender<u64>,
}

/// Puts the workflow back into an interactive state if the future driving
/// a call is dropped before the call settles.
pub(crate) struct InFlight<'a, K: ArtifactKind> {
    workflow: &'a Workflow<K>,
    token: u64,
    armed: bool,
}

impl<K: ArtifactKind> InFlight<'_, K> {
    /// The call returned; its outcome is applied by the caller.
    pub(crate) fn settle(mut self) {
        self.armed = false;
    }
}

impl<K: ArtifactKind> Drop for InFlight<'_, K> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let tool = self.workflow.shared.kind.name();
        let token = self.token;
        self.workflow.update(|inner| {
            if inner.generation != token {
                return;
            }
            tracing::debug!(tool, "Abandoned in-flight call");
            if inner.state == WorkflowState::Loading {
                inner.state = WorkflowState::Input;
            }
            inner.follow_up = None;
        });
    }
}

/// The generic tool workflow.
pub struct Workflow<K: ArtifactKind> {
    shared: Arc<Shared<K>>,
}

impl<K: ArtifactKind> Clone for Workflow<K> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<K: ArtifactKind> fmt::Debug for Workflow<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("tool", &self.shared.kind.name())
            .field("state", &self.state())
            .finish()
    }
}

impl<K: ArtifactKind> Workflow<K> {
    /// Create a workflow in `Input` with empty fields.
    pub fn new(kind: K, backend: Arc<dyn GenerationBackend>, session: Session) -> Self {
        Self::with_notice_ttl(kind, backend, session, DEFAULT_NOTICE_TTL)
    }

    /// Create a workflow whose notices last `notice_ttl`.
    pub fn with_notice_ttl(
        kind: K,
        backend: Arc<dyn GenerationBackend>,
        session: Session,
        notice_ttl: Duration,
    ) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                kind,
                backend,
                session,
                notice_ttl,
                inner: Mutex::new(Inner::initial(0)),
                changes,
            }),
        }
    }

    pub fn kind(&self) -> &K {
        &self.shared.kind
    }

    pub fn session(&self) -> &Session {
        &self.shared.session
    }

    pub(crate) fn backend(&self) -> &Arc<dyn GenerationBackend> {
        &self.shared.backend
    }

    /// Current state.
    pub fn state(&self) -> WorkflowState {
        self.shared.inner.lock().state
    }

    /// Copy out the current state.
    pub fn snapshot(&self) -> WorkflowSnapshot<K> {
        let inner = self.shared.inner.lock();
        WorkflowSnapshot {
            state: inner.state,
            repo_url: inner.repo_url.clone(),
            fields: inner.fields.clone(),
            artifact: inner.artifact.clone(),
            error: inner.error.clone(),
            notice: inner.notice.clone().filter(Notice::is_active),
            follow_up: inner.follow_up,
        }
    }

    /// Watch for changes. The value is a revision counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.changes.subscribe()
    }

    /// Whether a `generate` call now would issue a request.
    pub fn can_generate(&self) -> bool {
        self.accepts_trigger(&self.shared.inner.lock())
    }

    /// Edit the repository URL. Rejected while loading.
    pub fn set_repo_url(&self, url: impl Into<String>) -> bool {
        let url = url.into();
        self.update(|inner| {
            if inner.state == WorkflowState::Loading {
                return false;
            }
            inner.repo_url = url;
            true
        })
    }

    /// Validate the form and run the generation call.
    ///
    /// Returns [`Dispatch::Ignored`] without a request while another
    /// generation is in flight. Validation failures leave the workflow in
    /// `Input` with the message as the banner.
    pub async fn generate(&self) -> WorkflowResult<Dispatch> {
        let tool = self.shared.kind.name();

        let (token, reference, request, credential) = {
            let mut inner = self.shared.inner.lock();
            if !self.accepts_trigger(&inner) {
                tracing::debug!(tool, state = %inner.state, "Ignoring generate trigger");
                return Ok(Dispatch::Ignored);
            }

            let prepared = RepositoryReference::parse(&inner.repo_url).and_then(|reference| {
                let request = self.shared.kind.prepare(&reference, &inner.fields)?;
                Ok((reference, request))
            });
            let (reference, request) = match prepared {
                Ok(prepared) => prepared,
                Err(e) => {
                    inner.state = WorkflowState::Input;
                    inner.artifact = None;
                    inner.notice = None;
                    inner.error = Some(e.clone().into());
                    drop(inner);
                    self.publish();
                    return Err(e.into());
                }
            };

            let credential = match self.shared.session.require() {
                Ok(credential) => credential,
                Err(e) => {
                    inner.error = None;
                    drop(inner);
                    self.publish();
                    return Err(e);
                }
            };

            inner.generation += 1;
            inner.state = WorkflowState::Loading;
            inner.artifact = None;
            inner.error = None;
            inner.notice = None;
            (inner.generation, reference, request, credential)
        };
        self.publish();
        tracing::debug!(tool, repo = %reference, "Generating");

        let in_flight = self.in_flight(token);
        let backend = self.shared.backend.as_ref();
        let result = self.shared.kind.execute(backend, request, &credential).await;
        in_flight.settle();

        let mut rejection = None;
        let outcome = self.update(|inner| {
            if inner.generation != token {
                tracing::debug!(tool, repo = %reference, "Discarding stale response");
                return Ok(Dispatch::Superseded);
            }

            match result {
                Ok(payload) => {
                    tracing::info!(tool, repo = %reference, "Generated");
                    inner.state = WorkflowState::Complete;
                    inner.artifact = Some(GeneratedArtifact { payload, source: reference });
                    inner.notice = self
                        .shared
                        .kind
                        .success_notice()
                        .map(|message| self.notice(NoticeLevel::Success, message));
                    Ok(Dispatch::Completed)
                }
                Err(e) if e.is_auth_rejection() => {
                    inner.state = WorkflowState::Input;
                    rejection = Some(e);
                    Err(AuthError::Rejected.into())
                }
                Err(e) => {
                    tracing::warn!(tool, repo = %reference, error = %e, "Generation failed");
                    let message = self.shared.kind.failure_message(&e);
                    inner.state = WorkflowState::Error;
                    inner.error = Some(WorkflowError::Generation(message.clone()));
                    Err(WorkflowError::Generation(message))
                }
            }
        });

        if let Some(e) = rejection {
            self.shared.session.screen(&e);
        }
        outcome
    }

    /// Copy the artifact text to `clipboard`.
    pub fn copy(&self, clipboard: &dyn Clipboard) -> WorkflowResult<Dispatch> {
        let Some(text) = self.completed_text(FollowUp::Copy) else {
            return Ok(Dispatch::Ignored);
        };

        match clipboard.copy(&text) {
            Ok(()) => {
                self.set_notice(NoticeLevel::Success, self.shared.kind.copied_notice());
                Ok(Dispatch::Completed)
            }
            Err(e) => {
                let message = format!("Failed to copy to clipboard: {e}");
                tracing::warn!(tool = self.shared.kind.name(), error = %e, "Copy failed");
                self.set_notice(NoticeLevel::Error, message.clone());
                Err(WorkflowError::ClientSide(message))
            }
        }
    }

    /// Save the artifact text through `sink`.
    pub fn download(&self, sink: &dyn ArtifactSink) -> WorkflowResult<Dispatch> {
        let Some(file_name) = self.shared.kind.file_name() else {
            return Ok(Dispatch::Ignored);
        };
        let Some(text) = self.completed_text(FollowUp::Download) else {
            return Ok(Dispatch::Ignored);
        };

        match sink.save(file_name, text.as_bytes()) {
            Ok(path) => {
                tracing::info!(path = %path.display(), "Saved artifact");
                self.set_notice(NoticeLevel::Success, self.shared.kind.downloaded_notice());
                Ok(Dispatch::Completed)
            }
            Err(e) => {
                let message = format!("Failed to save {file_name}: {e}");
                tracing::warn!(tool = self.shared.kind.name(), error = %e, "Save failed");
                self.set_notice(NoticeLevel::Error, message.clone());
                Err(WorkflowError::ClientSide(message))
            }
        }
    }

    /// Hide the error banner. Returns whether one was shown.
    pub fn dismiss_error(&self) -> bool {
        self.update(|inner| inner.error.take().is_some())
    }

    /// Return every field to its initial value and the state to `Input`.
    ///
    /// Ignored while a request is in flight.
    pub fn reset(&self) -> bool {
        self.update(|inner| {
            if inner.is_busy() {
                return false;
            }
            *inner = Inner::initial(inner.generation);
            true
        })
    }

    /// Tear down: drop all state, including anything in flight.
    ///
    /// Responses to requests already dispatched are discarded on arrival.
    pub fn close(&self) {
        self.update(|inner| *inner = Inner::initial(inner.generation + 1));
    }

    /// Guard a call dispatched under `token` against being dropped mid-flight.
    pub(crate) fn in_flight(&self, token: u64) -> InFlight<'_, K> {
        InFlight { workflow: self, token, armed: true }
    }

    fn accepts_trigger(&self, inner: &Inner<K>) -> bool {
        if inner.follow_up.is_some() {
            return false;
        }
        match inner.state {
            WorkflowState::Loading => false,
            WorkflowState::Complete => self.shared.kind.allows_regenerate(),
            WorkflowState::Input | WorkflowState::Error => true,
        }
    }

    fn completed_text(&self, action: FollowUp) -> Option<String> {
        if !self.shared.kind.follow_ups().contains(&action) {
            return None;
        }
        let inner = self.shared.inner.lock();
        if inner.state != WorkflowState::Complete {
            return None;
        }
        inner.artifact.as_ref().map(|a| a.payload.as_ref().to_string())
    }

    pub(crate) fn notice(&self, level: NoticeLevel, message: impl Into<String>) -> Notice {
        Notice::new(level, message, self.shared.notice_ttl)
    }

    /// Raise a notice if an artifact is still shown.
    pub(crate) fn set_notice(&self, level: NoticeLevel, message: impl Into<String>) {
        let notice = self.notice(level, message);
        self.update(|inner| {
            if inner.state == WorkflowState::Complete {
                inner.notice = Some(notice);
            }
        });
    }

    /// Mutate state under the lock, then notify subscribers.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut Inner<K>) -> R) -> R {
        let result = f(&mut self.shared.inner.lock());
        self.publish();
        result
    }

    pub(crate) fn inspect<R>(&self, f: impl FnOnce(&Inner<K>) -> R) -> R {
        f(&self.shared.inner.lock())
    }

    fn publish(&self) {
        self.shared.changes.send_modify(|revision| *revision = revision.wrapping_add(1));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::testing::{signed_in, FakeBackend, Reply};
    use super::*;
    use crate::security::Route;

    const REPO: &str = "https://github.com/rust-lang/rust";

    fn readme(backend: &Arc<FakeBackend>) -> ReadmeWorkflow {
        ReadmeWorkflow::new(ReadmeTool, backend.clone(), signed_in())
    }

    #[tokio::test]
    async fn test_generate_reaches_complete() {
        let backend = FakeBackend::new();
        backend.set_reply(Reply::Ok("# Rust".into()));
        let workflow = readme(&backend);

        workflow.set_repo_url(REPO);
        assert_eq!(workflow.generate().await.unwrap(), Dispatch::Completed);

        let snapshot = workflow.snapshot();
        assert_eq!(snapshot.state, WorkflowState::Complete);
        assert_eq!(snapshot.artifact_text(), Some("# Rust"));
        assert_eq!(snapshot.artifact.unwrap().source.url(), REPO);
        assert_eq!(snapshot.notice.unwrap().message, "README generated successfully!");
        assert_eq!(backend.calls(), vec![format!("readme:{REPO}")]);
    }

    #[tokio::test]
    async fn test_invalid_url_stays_in_input() {
        let backend = FakeBackend::new();
        let workflow = readme(&backend);

        workflow.set_repo_url("https://gitlab.com/a/b");
        let err = workflow.generate().await.unwrap_err();
        assert_eq!(err, WorkflowError::Validation(ValidationError::InvalidRepositoryUrl));

        let snapshot = workflow.snapshot();
        assert_eq!(snapshot.state, WorkflowState::Input);
        assert_eq!(snapshot.error, Some(err));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failure_uses_reported_reason_or_fallback() {
        let backend = FakeBackend::new();
        let workflow = readme(&backend);
        workflow.set_repo_url(REPO);

        backend.set_reply(Reply::Rejected(Some("Repository is private".into())));
        let err = workflow.generate().await.unwrap_err();
        assert_eq!(err, WorkflowError::Generation("Repository is private".into()));
        assert_eq!(workflow.state(), WorkflowState::Error);

        backend.set_reply(Reply::Rejected(None));
        let err = workflow.generate().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to generate README");

        backend.set_reply(Reply::Fail(502, None));
        let err = workflow.generate().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to generate README. Please try again.");
    }

    #[tokio::test]
    async fn test_complete_does_not_regenerate() {
        let backend = FakeBackend::new();
        backend.set_reply(Reply::Ok("# Rust".into()));
        let workflow = readme(&backend);
        workflow.set_repo_url(REPO);

        workflow.generate().await.unwrap();
        assert!(!workflow.can_generate());
        assert_eq!(workflow.generate().await.unwrap(), Dispatch::Ignored);
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_dismiss_error_keeps_state() {
        let backend = FakeBackend::new();
        backend.set_reply(Reply::Fail(500, Some("boom".into())));
        let workflow = readme(&backend);
        workflow.set_repo_url(REPO);

        workflow.generate().await.unwrap_err();
        assert!(workflow.dismiss_error());
        assert!(!workflow.dismiss_error());
        assert_eq!(workflow.state(), WorkflowState::Error);
        assert!(workflow.can_generate());
    }

    #[tokio::test]
    async fn test_rejected_credential_redirects_without_banner() {
        let backend = FakeBackend::new();
        backend.set_reply(Reply::Unauthorized);
        let workflow = readme(&backend);
        workflow.session().navigate(Route::Readme);
        workflow.set_repo_url(REPO);

        let err = workflow.generate().await.unwrap_err();
        assert_eq!(err, WorkflowError::Auth(AuthError::Rejected));
        assert!(!err.is_banner());

        let snapshot = workflow.snapshot();
        assert_eq!(snapshot.state, WorkflowState::Input);
        assert!(snapshot.error.is_none());
        assert!(!workflow.session().is_authenticated());
        assert_eq!(workflow.session().route(), Route::Login);
    }

    #[tokio::test]
    async fn test_missing_credential_issues_no_call() {
        let backend = FakeBackend::new();
        let workflow = ReadmeWorkflow::new(ReadmeTool, backend.clone(), Session::in_memory());
        workflow.set_repo_url(REPO);

        let err = workflow.generate().await.unwrap_err();
        assert_eq!(err, WorkflowError::Auth(AuthError::MissingCredential));
        assert!(backend.calls().is_empty());
        assert_eq!(workflow.session().route(), Route::Login);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notices_expire() {
        let backend = FakeBackend::new();
        backend.set_reply(Reply::Ok("# Rust".into()));
        let workflow = readme(&backend);
        workflow.set_repo_url(REPO);
        workflow.generate().await.unwrap();

        let clipboard = MemoryClipboard::new();
        assert_eq!(workflow.copy(&clipboard).unwrap(), Dispatch::Completed);
        assert_eq!(clipboard.contents().as_deref(), Some("# Rust"));
        assert_eq!(workflow.snapshot().notice.unwrap().message, "README copied to clipboard!");

        tokio::time::advance(Duration::from_millis(2999)).await;
        assert!(workflow.snapshot().notice.is_some());
        tokio::time::advance(Duration::from_millis(2)).await;
        assert!(workflow.snapshot().notice.is_none());
        assert_eq!(workflow.state(), WorkflowState::Complete);
        assert_eq!(workflow.snapshot().artifact_text(), Some("# Rust"));
    }

    #[tokio::test]
    async fn test_copy_failure_is_client_side() {
        let backend = FakeBackend::new();
        backend.set_reply(Reply::Ok("# Rust".into()));
        let workflow = readme(&backend);
        workflow.set_repo_url(REPO);
        workflow.generate().await.unwrap();

        let err = workflow.copy(&MemoryClipboard::failing("permission denied")).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::ClientSide("Failed to copy to clipboard: permission denied".into())
        );
        let notice = workflow.snapshot().notice.unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(workflow.state(), WorkflowState::Complete);
    }

    #[tokio::test]
    async fn test_system_clipboard_copies_or_reports_cause() {
        let backend = FakeBackend::new();
        backend.set_reply(Reply::Ok("# Rust".into()));
        let workflow = readme(&backend);
        workflow.set_repo_url(REPO);
        workflow.generate().await.unwrap();

        // Headless machines have no clipboard to connect to.
        match workflow.copy(&SystemClipboard) {
            Ok(dispatch) => assert_eq!(dispatch, Dispatch::Completed),
            Err(WorkflowError::ClientSide(message)) => {
                assert!(message.starts_with("Failed to copy to clipboard: "));
                assert!(message.len() > "Failed to copy to clipboard: ".len());
                assert_eq!(workflow.snapshot().notice.unwrap().level, NoticeLevel::Error);
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
        assert_eq!(workflow.state(), WorkflowState::Complete);
    }

    #[tokio::test]
    async fn test_follow_ups_need_an_artifact() {
        let backend = FakeBackend::new();
        let workflow = readme(&backend);
        assert_eq!(workflow.copy(&MemoryClipboard::new()).unwrap(), Dispatch::Ignored);
        assert_eq!(workflow.download(&MemorySink::new()).unwrap(), Dispatch::Ignored);
    }

    #[tokio::test]
    async fn test_reset_restores_initial_fields() {
        let backend = FakeBackend::new();
        backend.set_reply(Reply::Ok("# Rust".into()));
        let workflow = readme(&backend);
        workflow.set_repo_url(REPO);
        workflow.generate().await.unwrap();

        assert!(workflow.reset());
        let snapshot = workflow.snapshot();
        assert_eq!(snapshot.state, WorkflowState::Input);
        assert!(snapshot.repo_url.is_empty());
        assert!(snapshot.artifact.is_none());
        assert!(snapshot.error.is_none());
        assert!(snapshot.notice.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_discards_in_flight_response() {
        let backend = FakeBackend::new();
        backend.set_reply(Reply::Ok("# Rust".into()));
        backend.set_delay(Duration::from_secs(5));
        let workflow = readme(&backend);
        workflow.set_repo_url(REPO);

        let running = tokio::spawn({
            let workflow = workflow.clone();
            async move { workflow.generate().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(workflow.state(), WorkflowState::Loading);
        assert!(!workflow.reset());

        workflow.close();
        assert_eq!(running.await.unwrap().unwrap(), Dispatch::Superseded);
        assert_eq!(workflow.state(), WorkflowState::Input);
        assert!(workflow.snapshot().artifact.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_generate_returns_to_input() {
        let backend = FakeBackend::new();
        backend.set_reply(Reply::Ok("# Rust".into()));
        backend.set_delay(Duration::from_secs(30));
        let workflow = readme(&backend);
        workflow.set_repo_url(REPO);

        let abandoned = tokio::time::timeout(Duration::from_secs(1), workflow.generate()).await;
        assert!(abandoned.is_err());
        tokio::time::sleep(Duration::from_secs(120)).await;

        let snapshot = workflow.snapshot();
        assert_eq!(snapshot.state, WorkflowState::Input);
        assert!(snapshot.artifact.is_none());
        assert!(workflow.can_generate());
        assert!(workflow.set_repo_url(REPO));

        backend.set_delay(Duration::ZERO);
        assert_eq!(workflow.generate().await.unwrap(), Dispatch::Completed);
        assert!(workflow.reset());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let backend = FakeBackend::new();
        backend.set_reply(Reply::Ok("# Rust".into()));
        let workflow = readme(&backend);
        let mut changes = workflow.subscribe();

        workflow.set_repo_url(REPO);
        assert!(changes.has_changed().unwrap());
        changes.borrow_and_update();

        workflow.generate().await.unwrap();
        assert!(changes.has_changed().unwrap());
    }
}
