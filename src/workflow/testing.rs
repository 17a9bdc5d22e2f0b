//! Scripted collaborator for workflow unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::Branch;
use crate::integrations::{ApiError, ApiResult, AskRequest, GenerationBackend};
use crate::security::{Credential, Session};

/// Scripted answer for a generation call.
#[derive(Debug, Clone)]
pub(crate) enum Reply<T> {
    Ok(T),
    Fail(u16, Option<String>),
    Rejected(Option<String>),
    Unauthorized,
    Undecodable,
}

impl<T> Reply<T> {
    fn into_result(self) -> ApiResult<T> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Fail(status, message) => Err(ApiError::Api { status, message }),
            Self::Rejected(message) => Err(ApiError::Rejected { message }),
            Self::Unauthorized => Err(ApiError::Unauthorized),
            Self::Undecodable => Err(ApiError::Decode("unexpected end of body".into())),
        }
    }
}

#[derive(Default)]
struct Script {
    branches: HashMap<String, Reply<Vec<Branch>>>,
    queued_branches: HashMap<String, VecDeque<Reply<Vec<Branch>>>>,
    branch_delays: HashMap<String, Duration>,
    reply: Option<Reply<String>>,
    document: Option<Reply<Vec<u8>>>,
    delay: Duration,
    calls: Vec<String>,
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    script: Mutex<Script>,
}

impl FakeBackend {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn set_branches(&self, repo_url: &str, reply: Reply<Vec<Branch>>) {
        self.script.lock().branches.insert(repo_url.to_string(), reply);
    }

    /// A one-off listing, served before the standing one.
    pub(crate) fn queue_branches(&self, repo_url: &str, reply: Reply<Vec<Branch>>) {
        let mut script = self.script.lock();
        script.queued_branches.entry(repo_url.to_string()).or_default().push_back(reply);
    }

    pub(crate) fn set_branch_delay(&self, repo_url: &str, delay: Duration) {
        self.script.lock().branch_delays.insert(repo_url.to_string(), delay);
    }

    pub(crate) fn set_reply(&self, reply: Reply<String>) {
        self.script.lock().reply = Some(reply);
    }

    pub(crate) fn set_document(&self, reply: Reply<Vec<u8>>) {
        self.script.lock().document = Some(reply);
    }

    /// Delay applied to generation and document calls.
    pub(crate) fn set_delay(&self, delay: Duration) {
        self.script.lock().delay = delay;
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.script.lock().calls.clone()
    }

    async fn generation(&self, call: String) -> ApiResult<String> {
        let (delay, reply) = {
            let mut script = self.script.lock();
            script.calls.push(call);
            (script.delay, script.reply.clone())
        };
        tokio::time::sleep(delay).await;
        reply.unwrap_or(Reply::Fail(500, None)).into_result()
    }
}

#[async_trait]
impl GenerationBackend for FakeBackend {
    async fn list_branches(
        &self,
        repo_url: &str,
        _credential: &Credential,
    ) -> ApiResult<Vec<Branch>> {
        let (delay, reply) = {
            let mut script = self.script.lock();
            script.calls.push(format!("branches:{repo_url}"));
            let queued = script.queued_branches.get_mut(repo_url).and_then(VecDeque::pop_front);
            (
                script.branch_delays.get(repo_url).copied().unwrap_or_default(),
                queued.or_else(|| script.branches.get(repo_url).cloned()),
            )
        };
        tokio::time::sleep(delay).await;
        reply
            .unwrap_or(Reply::Fail(404, Some("Repository not found".into())))
            .into_result()
    }

    async fn ask(&self, request: &AskRequest, _credential: &Credential) -> ApiResult<String> {
        self.generation(format!("ask:{}:{}:{}", request.repo_url, request.branch, request.question))
            .await
    }

    async fn generate_readme(&self, repo_url: &str, _credential: &Credential) -> ApiResult<String> {
        self.generation(format!("readme:{repo_url}")).await
    }

    async fn preview_summary(&self, repo_url: &str, _credential: &Credential) -> ApiResult<String> {
        self.generation(format!("preview:{repo_url}")).await
    }

    async fn summary_document(
        &self,
        repo_url: &str,
        _credential: &Credential,
    ) -> ApiResult<Vec<u8>> {
        let (delay, reply) = {
            let mut script = self.script.lock();
            script.calls.push(format!("document:{repo_url}"));
            (script.delay, script.document.clone())
        };
        tokio::time::sleep(delay).await;
        reply.unwrap_or(Reply::Fail(500, None)).into_result()
    }

    async fn health(&self) -> ApiResult<()> {
        Ok(())
    }
}

/// A session holding a test credential.
pub(crate) fn signed_in() -> Session {
    Session::with_credential(Credential::new("test-token").unwrap())
}

pub(crate) fn branches(names: &[&str]) -> Vec<Branch> {
    names.iter().map(|name| Branch::new(*name)).collect()
}
