//! GitHub repository URL validation.
//!
//! Every tool accepts the same shape of URL:
//! `http(s)://[www.]github.com/<owner>/<repo>[/]`, where owner and repo are
//! restricted to alphanumerics, `.`, `_` and `-`.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::ValidationError;

static GITHUB_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:www\.)?github\.com/([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)/?$")
        .expect("GitHub URL pattern is valid")
});

/// Check whether a candidate string is a well-formed GitHub repository URL.
///
/// Pure and total: no network access, never fails.
pub fn is_valid_github_url(candidate: &str) -> bool {
    GITHUB_URL.is_match(candidate)
}

/// A validated reference to a GitHub repository.
///
/// Holds the URL exactly as it was entered (the collaborators key their
/// caches on it) together with the parsed owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryReference {
    url: String,
    owner: String,
    name: String,
}

impl RepositoryReference {
    /// Parse user input into a reference.
    ///
    /// Blank input is reported separately from malformed input so callers
    /// can show a field-specific message.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        if input.trim().is_empty() {
            return Err(ValidationError::MissingRepositoryUrl);
        }

        let captures =
            GITHUB_URL.captures(input).ok_or(ValidationError::InvalidRepositoryUrl)?;

        Ok(Self {
            url: input.trim().to_string(),
            owner: captures[1].to_string(),
            name: captures[2].to_string(),
        })
    }

    /// The URL as entered.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Repository owner (user or organization).
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepositoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
