//! README generator.

use async_trait::async_trait;

use super::{ArtifactKind, FollowUp, Workflow};
use crate::core::{RepositoryReference, ValidationError};
use crate::integrations::{ApiResult, GenerationBackend};
use crate::security::Credential;

/// File name for saved READMEs.
pub const README_FILE: &str = "README.md";

/// README generation: repository URL in, markdown out.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadmeTool;

/// The README generator workflow.
pub type ReadmeWorkflow = Workflow<ReadmeTool>;

#[async_trait]
impl ArtifactKind for ReadmeTool {
    type Fields = ();
    type Request = RepositoryReference;
    type Payload = String;

    fn name(&self) -> &'static str {
        "readme"
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
        backend.generate_readme(request.url(), credential).await
    }

    fn failure_fallback(&self) -> &'static str {
        "Failed to generate README. Please try again."
    }

    fn rejection_fallback(&self) -> &'static str {
        "Failed to generate README"
    }

    fn success_notice(&self) -> Option<&'static str> {
        Some("README generated successfully!")
    }

    fn follow_ups(&self) -> &'static [FollowUp] {
        &[FollowUp::Copy, FollowUp::Download]
    }

    fn copied_notice(&self) -> &'static str {
        "README copied to clipboard!"
    }

    fn file_name(&self) -> Option<&'static str> {
        Some(README_FILE)
    }

    fn downloaded_notice(&self) -> &'static str {
        "README downloaded successfully!"
    }
}
