//! Repository analysis service client.
//!
//! Every call here is authenticated. Branch discovery and Q&A answer with a
//! plain JSON body; README and summary generation use the
//! `{success, data, error}` envelope; the summary document is raw bytes.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::api::{self, ApiResult};
use crate::security::Credential;
use crate::workflow::Branch;

/// A question about one branch of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    pub repo_url: String,
    pub branch: String,
    pub question: String,
}

/// Calls issued by the tool workflows.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// List the branches of a repository, in provider order.
    async fn list_branches(&self, repo_url: &str, credential: &Credential)
        -> ApiResult<Vec<Branch>>;

    /// Answer a question about a repository branch.
    async fn ask(&self, request: &AskRequest, credential: &Credential) -> ApiResult<String>;

    /// Generate README markdown.
    async fn generate_readme(&self, repo_url: &str, credential: &Credential) -> ApiResult<String>;

    /// Generate the per-file summary as markdown.
    async fn preview_summary(&self, repo_url: &str, credential: &Credential) -> ApiResult<String>;

    /// Render the summary document for a previously previewed repository.
    async fn summary_document(&self, repo_url: &str, credential: &Credential)
        -> ApiResult<Vec<u8>>;

    /// Check that the service answers.
    async fn health(&self) -> ApiResult<()>;
}

#[derive(Serialize)]
struct BranchesRequest<'a> {
    #[serde(rename = "repoUrl")]
    repo_url: &'a str,
}

#[derive(Serialize)]
struct GithubUrlRequest<'a> {
    #[serde(rename = "githubUrl")]
    github_url: &'a str,
}

#[derive(Deserialize)]
struct BranchesResponse {
    #[serde(default)]
    branches: Vec<Branch>,
}

#[derive(Deserialize)]
struct AnswerResponse {
    answer: String,
}

#[derive(Deserialize)]
struct ReadmeData {
    readme_content: String,
}

#[derive(Deserialize)]
struct SummaryData {
    summary_content: String,
}

/// HTTP client for the analysis service.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        Ok(Self { base_url: base_url.into(), client: api::build_client(timeout)? })
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post(&self, path: &str, credential: &Credential) -> reqwest::RequestBuilder {
        api::authorize(self.client.post(api::endpoint(&self.base_url, path)), Some(credential))
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    async fn list_branches(
        &self,
        repo_url: &str,
        credential: &Credential,
    ) -> ApiResult<Vec<Branch>> {
        let response = self
            .post("/api/branches", credential)
            .json(&BranchesRequest { repo_url })
            .send()
            .await?;
        let body: BranchesResponse = api::decode_json(response, true).await?;
        Ok(body.branches)
    }

    async fn ask(&self, request: &AskRequest, credential: &Credential) -> ApiResult<String> {
        let response = self.post("/ask", credential).json(request).send().await?;
        let body: AnswerResponse = api::decode_json(response, true).await?;
        Ok(body.answer)
    }

    async fn generate_readme(&self, repo_url: &str, credential: &Credential) -> ApiResult<String> {
        let response = self
            .post("/api/readme-gen/generate", credential)
            .json(&GithubUrlRequest { github_url: repo_url })
            .send()
            .await?;
        let data: ReadmeData = api::decode_envelope(response).await?;
        Ok(data.readme_content)
    }

    async fn preview_summary(&self, repo_url: &str, credential: &Credential) -> ApiResult<String> {
        let response = self
            .post("/api/file-summary/generate-preview", credential)
            .json(&GithubUrlRequest { github_url: repo_url })
            .send()
            .await?;
        let data: SummaryData = api::decode_envelope(response).await?;
        Ok(data.summary_content)
    }

    async fn summary_document(
        &self,
        repo_url: &str,
        credential: &Credential,
    ) -> ApiResult<Vec<u8>> {
        let response = self
            .post("/api/file-summary/generate", credential)
            .json(&GithubUrlRequest { github_url: repo_url })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api::parse_error(response, true).await);
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn health(&self) -> ApiResult<()> {
        let response = self.client.get(api::endpoint(&self.base_url, "/health")).send().await?;
        if !response.status().is_success() {
            return Err(api::parse_error(response, false).await);
        }
        Ok(())
    }
}
