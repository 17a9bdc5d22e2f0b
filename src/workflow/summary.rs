//! File-to-file summarizer.
//!
//! Generation is two-phase. `generate` produces a markdown preview; the
//! rendered document is a separate call made on demand, and it is always
//! made for the repository that was last previewed, even if the URL field
//! has been edited since. The service only renders documents it has a
//! cached preview for.

use async_trait::async_trait;

use super::{ArtifactKind, ArtifactSink, Dispatch, FollowUp, NoticeLevel, Workflow, WorkflowState};
use crate::core::{AuthError, RepositoryReference, ValidationError, WorkflowError, WorkflowResult};
use crate::integrations::{ApiError, ApiResult, GenerationBackend};
use crate::security::Credential;

/// File name for saved summary documents.
pub const SUMMARY_DOCUMENT: &str = "summary.pdf";

/// The service refused to render the document.
const DOCUMENT_FALLBACK: &str = "Failed to generate PDF summary";

/// The document never arrived intact.
const DOCUMENT_TRANSPORT_FALLBACK: &str = "Failed to download PDF summary. Please try again.";

/// Summary generation: repository URL in, per-file markdown out.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryTool;

/// The summarizer workflow.
pub type SummaryWorkflow = Workflow<SummaryTool>;

#[async_trait]
impl ArtifactKind for SummaryTool {
    type Fields = ();
    type Request = RepositoryReference;
    type Payload = String;

    fn name(&self) -> &'static str {
        "summary"
    }

    fn prepare(
        &self,
        reference: &RepositoryReference,
        _fields: &(),
    ) -> Result<RepositoryReference, ValidationError> {
        Ok(reference.clone())
    }

    async fn execute(
        &self,
        backend: &dyn GenerationBackend,
        request: RepositoryReference,
        credential: &Credential,
    ) -> ApiResult<String> {
        backend.preview_summary(request.url(), credential).await
    }

    fn failure_fallback(&self) -> &'static str {
        "Failed to generate summary. Please try again."
    }

    fn rejection_fallback(&self) -> &'static str {
        "Failed to generate summary"
    }

    fn success_notice(&self) -> Option<&'static str> {
        Some("Summary generated successfully!")
    }

    fn follow_ups(&self) -> &'static [FollowUp] {
        &[FollowUp::Copy, FollowUp::DownloadDocument]
    }

    fn copied_notice(&self) -> &'static str {
        "Summary copied to clipboard!"
    }
}

impl Workflow<SummaryTool> {
    /// Render the document for the last previewed repository and save it.
    ///
    /// Only one document call runs at a time; the state stays `Complete`
    /// whatever the outcome.
    pub async fn download_document(&self, sink: &dyn ArtifactSink) -> WorkflowResult<Dispatch> {
        let started = self.update(|inner| {
            if inner.is_busy() {
                return Ok(None);
            }
            let source = match inner.artifact.as_ref() {
                Some(artifact) if inner.state == WorkflowState::Complete => artifact.source.clone(),
                _ => {
                    inner.error = Some(ValidationError::NothingToDownload.into());
                    return Err(WorkflowError::from(ValidationError::NothingToDownload));
                }
            };
            inner.follow_up = Some(FollowUp::DownloadDocument);
            Ok(Some((inner.generation, source)))
        })?;
        let Some((token, source)) = started else {
            tracing::debug!("Document already being rendered");
            return Ok(Dispatch::Ignored);
        };

        let credential = match self.session().require() {
            Ok(credential) => credential,
            Err(e) => {
                self.update(|inner| inner.follow_up = None);
                return Err(e);
            }
        };

        tracing::debug!(repo = %source, "Rendering summary document");
        let in_flight = self.in_flight(token);
        let rendered = self.backend().summary_document(source.url(), &credential).await;
        in_flight.settle();
        let saved = rendered.map(|bytes| sink.save(SUMMARY_DOCUMENT, &bytes));

        let mut rejection = None;
        let outcome = self.update(|inner| {
            if inner.generation != token {
                return Ok(Dispatch::Superseded);
            }
            inner.follow_up = None;

            let (level, message, result) = match saved {
                Ok(Ok(path)) => {
                    tracing::info!(
                        repo = %source,
                        path = %path.display(),
                        "Saved summary document"
                    );
                    let message = "PDF summary downloaded successfully!";
                    (NoticeLevel::Success, message.to_string(), Ok(Dispatch::Completed))
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Could not save summary document");
                    let message = format!("Failed to save {SUMMARY_DOCUMENT}: {e}");
                    (NoticeLevel::Error, message.clone(), Err(WorkflowError::ClientSide(message)))
                }
                Err(e) if e.is_auth_rejection() => {
                    rejection = Some(e);
                    return Err(AuthError::Rejected.into());
                }
                Err(e) => {
                    tracing::warn!(repo = %source, error = %e, "Failed to generate PDF summary");
                    let message = document_failure(&e);
                    (NoticeLevel::Error, message.clone(), Err(WorkflowError::Generation(message)))
                }
            };
            inner.notice = Some(self.notice(level, message));
            result
        });

        if let Some(e) = rejection {
            self.session().screen(&e);
        }
        outcome
    }
}

fn document_failure(error: &ApiError) -> String {
    if let Some(message) = error.reported_message() {
        return message.to_string();
    }
    match error {
        ApiError::Http(_) | ApiError::Decode(_) => DOCUMENT_TRANSPORT_FALLBACK,
        _ => DOCUMENT_FALLBACK,
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::testing::{signed_in, FakeBackend, Reply};
    use super::super::MemorySink;
    use super::*;
    use crate::security::Route;

    const REPO_A: &str = "https://github.com/tokio-rs/axum";
    const REPO_B: &str = "https://github.com/hyperium/hyper";

    async fn previewed(backend: &std::sync::Arc<FakeBackend>) -> SummaryWorkflow {
        backend.set_reply(Reply::Ok("## src/lib.rs\nRouting.".into()));
        backend.set_document(Reply::Ok(b"%PDF-1.7".to_vec()));
        let workflow = SummaryWorkflow::new(SummaryTool, backend.clone(), signed_in());
        workflow.set_repo_url(REPO_A);
        workflow.generate().await.unwrap();
        workflow
    }

    #[tokio::test]
    async fn test_document_uses_previewed_repository() {
        let backend = FakeBackend::new();
        let workflow = previewed(&backend).await;

        assert!(workflow.set_repo_url(REPO_B));
        let sink = MemorySink::new();
        assert_eq!(workflow.download_document(&sink).await.unwrap(), Dispatch::Completed);

        let expected = vec![format!("preview:{REPO_A}"), format!("document:{REPO_A}")];
        assert_eq!(backend.calls(), expected);
        assert_eq!(sink.files(), vec![("summary.pdf".to_string(), b"%PDF-1.7".to_vec())]);
        assert_eq!(
            workflow.snapshot().notice.unwrap().message,
            "PDF summary downloaded successfully!"
        );
    }

    #[tokio::test]
    async fn test_document_requires_preview() {
        let backend = FakeBackend::new();
        let workflow = SummaryWorkflow::new(SummaryTool, backend.clone(), signed_in());
        workflow.set_repo_url(REPO_A);

        let err = workflow.download_document(&MemorySink::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "No summary to download. Please generate a summary first.");
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_document_failure_keeps_preview() {
        let backend = FakeBackend::new();
        let workflow = previewed(&backend).await;
        backend.set_document(Reply::Fail(400, None));

        let err = workflow.download_document(&MemorySink::new()).await.unwrap_err();
        assert_eq!(err, WorkflowError::Generation("Failed to generate PDF summary".into()));

        let snapshot = workflow.snapshot();
        assert_eq!(snapshot.state, WorkflowState::Complete);
        assert_eq!(snapshot.notice.as_ref().unwrap().level, NoticeLevel::Error);
        assert!(snapshot.artifact_text().unwrap().contains("Routing"));
    }

    #[tokio::test]
    async fn test_document_failure_messages() {
        let backend = FakeBackend::new();
        let workflow = previewed(&backend).await;

        backend.set_document(Reply::Fail(502, Some("Renderer offline".into())));
        let err = workflow.download_document(&MemorySink::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "Renderer offline");

        backend.set_document(Reply::Undecodable);
        let err = workflow.download_document(&MemorySink::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to download PDF summary. Please try again.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_document_call_frees_workflow() {
        let backend = FakeBackend::new();
        let workflow = previewed(&backend).await;
        backend.set_delay(Duration::from_secs(30));

        let sink = MemorySink::new();
        let abandoned =
            tokio::time::timeout(Duration::from_secs(1), workflow.download_document(&sink)).await;
        assert!(abandoned.is_err());

        let snapshot = workflow.snapshot();
        assert_eq!(snapshot.state, WorkflowState::Complete);
        assert!(snapshot.follow_up.is_none());

        backend.set_delay(Duration::ZERO);
        assert_eq!(workflow.download_document(&sink).await.unwrap(), Dispatch::Completed);
        assert_eq!(sink.files().len(), 1);
        assert!(workflow.reset());
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_document_call_at_a_time() {
        let backend = FakeBackend::new();
        let workflow = previewed(&backend).await;
        backend.set_delay(Duration::from_secs(2));

        let sink = std::sync::Arc::new(MemorySink::new());
        let first = tokio::spawn({
            let workflow = workflow.clone();
            let sink = sink.clone();
            async move { workflow.download_document(sink.as_ref()).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(workflow.download_document(sink.as_ref()).await.unwrap(), Dispatch::Ignored);
        assert!(!workflow.reset());
        assert_eq!(first.await.unwrap().unwrap(), Dispatch::Completed);
        assert_eq!(sink.files().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_document_call_signs_out() {
        let backend = FakeBackend::new();
        let workflow = previewed(&backend).await;
        workflow.session().navigate(Route::Summary);
        backend.set_document(Reply::Unauthorized);

        let err = workflow.download_document(&MemorySink::new()).await.unwrap_err();
        assert_eq!(err, WorkflowError::Auth(AuthError::Rejected));
        assert_eq!(workflow.session().route(), Route::Login);
        assert!(!workflow.session().is_authenticated());
    }
}
