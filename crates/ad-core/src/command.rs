//! Chat input routing.
//!
//! A message that contains a GitHub repository URL starts an analysis task;
//! anything else goes to the general chat endpoint. An optional access token
//! may follow the URL:
//!
//! ```text
//! https://github.com/acme/widget ghp_abc123
//! ```
//!
//! Not finding a repository is a routing decision, not an error.

use std::sync::OnceLock;

use regex::Regex;

/// A repository reference extracted from chat input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryCommand {
    pub repo_url: String,
    pub token: Option<String>,
}

/// Where a chat message should be dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputRoute<'a> {
    Analyze(RepositoryCommand),
    Chat(&'a str),
}

static REPO_RE: OnceLock<Regex> = OnceLock::new();
static TOKEN_RE: OnceLock<Regex> = OnceLock::new();

fn repo_re() -> &'static Regex {
    REPO_RE.get_or_init(|| {
        Regex::new(r"https://github\.com/[A-Za-z0-9._-]+/[A-Za-z0-9._-]+")
            .expect("repository pattern is valid")
    })
}

// Prefixed GitHub tokens first, then a bare word of at least 30 characters.
// A longer word yields its first 40.
fn token_re() -> &'static Regex {
    TOKEN_RE.get_or_init(|| {
        Regex::new(
            r"^(?:(?:ghp|gho|ghu|ghs|ghr)_[A-Za-z0-9_]+|github_pat_[A-Za-z0-9_]+|[A-Za-z0-9_]{30,40})",
        )
        .expect("token pattern is valid")
    })
}

/// Find the first repository URL in `input` and an optional token directly
/// after it. Returns `None` when no URL is present.
pub fn parse_repository_command(input: &str) -> Option<RepositoryCommand> {
    let found = repo_re().find(input)?;
    let rest = input[found.end()..].trim();
    let token = token_re().find(rest).map(|m| m.as_str().to_string());

    Some(RepositoryCommand {
        repo_url: found.as_str().to_string(),
        token,
    })
}

/// Route raw chat input. Callers are expected to have rejected blank input.
pub fn route_input(input: &str) -> InputRoute<'_> {
    match parse_repository_command(input) {
        Some(cmd) => InputRoute::Analyze(cmd),
        None => InputRoute::Chat(input),
    }
}
