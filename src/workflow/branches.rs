//! Branch discovery and default selection.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{retry_async_when, RepositoryReference, ResolutionError, RetryConfig};
use crate::integrations::{ApiError, GenerationBackend};
use crate::security::Credential;

/// Shown when discovery fails without a reason from the service.
pub const BRANCH_FETCH_FALLBACK: &str =
    "Failed to fetch branches. Please check the repository URL and try again.";

/// A repository branch as reported by the metadata provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,

    #[serde(default)]
    pub protected: bool,

    #[serde(default)]
    pub commit_sha: String,
}

impl Branch {
    /// Create an unprotected branch with no known head commit.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), protected: false, commit_sha: String::new() }
    }

    /// Abbreviated head commit, if known.
    pub fn short_sha(&self) -> Option<&str> {
        if self.commit_sha.is_empty() {
            return None;
        }
        let end = self.commit_sha.char_indices().nth(7).map_or(self.commit_sha.len(), |(i, _)| i);
        Some(&self.commit_sha[..end])
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.protected {
            f.write_str(" 🔒")?;
        }
        if let Some(sha) = self.short_sha() {
            write!(f, " ({sha})")?;
        }
        Ok(())
    }
}

/// Drop unnamed entries and later duplicates, keeping provider order.
pub fn normalize(branches: Vec<Branch>) -> Vec<Branch> {
    let mut seen = HashSet::new();
    branches
        .into_iter()
        .filter(|b| !b.name.trim().is_empty())
        .filter(|b| seen.insert(b.name.clone()))
        .collect()
}

/// Pick the default branch: `main`, else `master`, else the first.
pub fn select_default(branches: &[Branch]) -> Option<&Branch> {
    branches
        .iter()
        .find(|b| b.name == "main")
        .or_else(|| branches.iter().find(|b| b.name == "master"))
        .or_else(|| branches.first())
}

/// Outcome of a successful discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchSelection {
    /// Normalized branches in provider order. Never empty.
    pub branches: Vec<Branch>,

    /// The default pick, always one of `branches`.
    pub default: Branch,
}

/// Resolves a repository's branches through the analysis service.
pub struct BranchResolver {
    backend: Arc<dyn GenerationBackend>,
    retry: RetryConfig,
}

impl fmt::Debug for BranchResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BranchResolver").field("retry", &self.retry).finish_non_exhaustive()
    }
}

impl BranchResolver {
    /// Create a resolver with the default retry policy.
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self::with_retry(backend, RetryConfig::default())
    }

    /// Create a resolver with an explicit retry policy.
    pub fn with_retry(backend: Arc<dyn GenerationBackend>, retry: RetryConfig) -> Self {
        Self { backend, retry }
    }

    /// List the branches of `reference` and choose a default.
    ///
    /// An empty listing is retried within the configured bound before
    /// failing with [`ResolutionError::NoBranchesFound`]. Other failures are
    /// not retried.
    pub async fn resolve(
        &self,
        reference: &RepositoryReference,
        credential: &Credential,
    ) -> Result<BranchSelection, ResolutionError> {
        let outcome = retry_async_when(
            &self.retry,
            || self.fetch(reference, credential),
            |e| matches!(e, ResolutionError::NoBranchesFound),
        )
        .await;

        if outcome.was_retried() {
            tracing::debug!(
                repo = %reference,
                attempts = outcome.attempts,
                "Branch discovery retried"
            );
        }
        outcome.into_result()
    }

    async fn fetch(
        &self,
        reference: &RepositoryReference,
        credential: &Credential,
    ) -> Result<BranchSelection, ResolutionError> {
        let branches = self
            .backend
            .list_branches(reference.url(), credential)
            .await
            .map_err(|e| resolution_error(reference, &e))?;

        let branches = normalize(branches);
        let default = select_default(&branches).cloned().ok_or(ResolutionError::NoBranchesFound)?;
        Ok(BranchSelection { branches, default })
    }
}

fn resolution_error(reference: &RepositoryReference, error: &ApiError) -> ResolutionError {
    if error.is_auth_rejection() {
        return ResolutionError::Unauthorized;
    }
    tracing::warn!(repo = %reference, error = %error, "Branch discovery failed");
    ResolutionError::Failed(error.reported_message().unwrap_or(BRANCH_FETCH_FALLBACK).to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::testing::{branches, FakeBackend, Reply};
    use super::*;

    fn names(branches: &[Branch]) -> Vec<&str> {
        branches.iter().map(|b| b.name.as_str()).collect()
    }

    #[test]
    fn test_default_prefers_main() {
        let branches = vec![Branch::new("dev"), Branch::new("main"), Branch::new("master")];
        assert_eq!(select_default(&branches).unwrap().name, "main");
    }

    #[test]
    fn test_default_falls_back_to_master_then_first() {
        let branches = vec![Branch::new("dev"), Branch::new("master")];
        assert_eq!(select_default(&branches).unwrap().name, "master");

        let branches = vec![Branch::new("dev"), Branch::new("feature")];
        assert_eq!(select_default(&branches).unwrap().name, "dev");

        assert!(select_default(&[]).is_none());
    }

    #[test]
    fn test_normalize_dedupes_in_order() {
        let branches = vec![
            Branch::new("dev"),
            Branch { protected: true, ..Branch::new("main") },
            Branch::new(""),
            Branch::new("dev"),
            Branch::new("main"),
        ];
        let normalized = normalize(branches);
        assert_eq!(names(&normalized), vec!["dev", "main"]);
        assert!(normalized[1].protected);
    }

    #[test]
    fn test_branch_display() {
        let branch = Branch {
            name: "main".into(),
            protected: true,
            commit_sha: "0123456789abcdef".into(),
        };
        assert_eq!(branch.to_string(), "main 🔒 (0123456)");
        assert_eq!(Branch::new("dev").to_string(), "dev");
    }

    #[test]
    fn test_short_sha_respects_char_boundaries() {
        let branch = Branch { commit_sha: "ééééééééé".into(), ..Branch::new("main") };
        assert_eq!(branch.short_sha(), Some("ééééééé"));
        assert_eq!(branch.to_string(), "main (ééééééé)");

        let branch = Branch { commit_sha: "abc".into(), ..Branch::new("main") };
        assert_eq!(branch.short_sha(), Some("abc"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_listing_recovers_on_retry() {
        let url = "https://github.com/tokio-rs/mio";
        let backend = FakeBackend::new();
        backend.queue_branches(url, Reply::Ok(Vec::new()));
        backend.set_branches(url, Reply::Ok(branches(&["dev", "main"])));

        let retry = RetryConfig { jitter: false, ..RetryConfig::branch_discovery() };
        let resolver = BranchResolver::with_retry(backend.clone(), retry);
        let reference = RepositoryReference::parse(url).unwrap();
        let credential = Credential::new("test-token").unwrap();

        let started = tokio::time::Instant::now();
        let selection = resolver.resolve(&reference, &credential).await.unwrap();
        assert_eq!(selection.default.name, "main");
        assert_eq!(selection.branches.len(), 2);
        assert_eq!(backend.calls().len(), 2);
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_other_than_empty_are_not_retried() {
        let url = "https://github.com/tokio-rs/mio";
        let backend = FakeBackend::new();
        backend.set_branches(url, Reply::Fail(500, None));

        let resolver = BranchResolver::new(backend.clone());
        let reference = RepositoryReference::parse(url).unwrap();
        let credential = Credential::new("test-token").unwrap();

        let err = resolver.resolve(&reference, &credential).await.unwrap_err();
        assert_eq!(err, ResolutionError::Failed(BRANCH_FETCH_FALLBACK.into()));
        assert_eq!(backend.calls().len(), 1);
    }

    #[test]
    fn test_resolution_error_mapping() {
        let reference = RepositoryReference::parse("https://github.com/a/b").unwrap();

        assert_eq!(
            resolution_error(&reference, &ApiError::Unauthorized),
            ResolutionError::Unauthorized
        );
        assert_eq!(
            resolution_error(
                &reference,
                &ApiError::Api { status: 404, message: Some("Repository not found".into()) }
            ),
            ResolutionError::Failed("Repository not found".into())
        );
        assert_eq!(
            resolution_error(&reference, &ApiError::Decode("eof".into())),
            ResolutionError::Failed(BRANCH_FETCH_FALLBACK.into())
        );
    }
}
