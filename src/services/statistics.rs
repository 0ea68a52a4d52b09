//! Dashboard statistics over cached rows.
//!
//! Everything here is a pure function of data already in the cache. Counts
//! are returned sorted by descending count, then by name.

use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use crate::models::{Approval, PrComment, PullRequest};

/// A name with the number of things attributed to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorCount {
    pub name: String,
    pub avatar_url: Option<String>,
    pub count: i64,
}

/// Kind of change a pull request title announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestType {
    Feature,
    Fix,
    Refactor,
    Chore,
    Docs,
    Test,
    Other,
}

impl PullRequestType {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "feat" | "feature" | "features" | "add" => Self::Feature,
            "fix" | "bugfix" | "hotfix" | "bug" => Self::Fix,
            "refactor" | "perf" | "style" | "cleanup" => Self::Refactor,
            "chore" | "build" | "ci" | "deps" | "release" | "revert" => Self::Chore,
            "docs" | "doc" => Self::Docs,
            "test" | "tests" => Self::Test,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Fix => "fix",
            Self::Refactor => "refactor",
            Self::Chore => "chore",
            Self::Docs => "docs",
            Self::Test => "test",
            Self::Other => "other",
        }
    }
}

/// `type(scope)!: subject` or `[type] subject`.
fn title_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:\[([A-Za-z-]+)\]|([A-Za-z-]+)(?:\([^)]*\))?!?\s*:)")
            .expect("title tag regex is valid")
    })
}

/// Classify a pull request by the conventional-commit prefix or bracket tag
/// of its title.
pub fn classify_title(title: &str) -> PullRequestType {
    title_tag_regex()
        .captures(title)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|tag| PullRequestType::from_tag(&tag.as_str().to_ascii_lowercase()))
        .unwrap_or(PullRequestType::Other)
}

fn sorted(counts: HashMap<String, (Option<String>, i64)>) -> Vec<AuthorCount> {
    let mut result: Vec<AuthorCount> = counts
        .into_iter()
        .map(|(name, (avatar_url, count))| AuthorCount {
            name,
            avatar_url,
            count,
        })
        .collect();
    result.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    result
}

/// Pull requests per author. With a non-empty `owners` list only those
/// authors are counted.
pub fn pull_requests_by_author(prs: &[PullRequest], owners: &[String]) -> Vec<AuthorCount> {
    let allowed: HashSet<&str> = owners.iter().map(String::as_str).collect();
    let mut counts: HashMap<String, (Option<String>, i64)> = HashMap::new();

    for pr in prs {
        if !allowed.is_empty() && !allowed.contains(pr.author.as_str()) {
            continue;
        }
        let entry = counts
            .entry(pr.author.clone())
            .or_insert_with(|| (pr.avatar_url.clone(), 0));
        entry.1 += 1;
    }

    sorted(counts)
}

pub fn approvals_by_reviewer(approvals: &[Approval]) -> Vec<AuthorCount> {
    let mut counts: HashMap<String, (Option<String>, i64)> = HashMap::new();
    for approval in approvals {
        let entry = counts
            .entry(approval.reviewer.clone())
            .or_insert_with(|| (approval.avatar_url.clone(), 0));
        entry.1 += 1;
    }
    sorted(counts)
}

/// Review comments received per pull request author.
pub fn review_comments_by_author(comments: &[PrComment]) -> Vec<AuthorCount> {
    let mut counts: HashMap<String, (Option<String>, i64)> = HashMap::new();
    for comment in comments {
        counts.entry(comment.author.clone()).or_insert((None, 0)).1 += comment.review_comments;
    }
    sorted(counts)
}

/// Pull requests per type, most frequent first.
pub fn pull_requests_by_type(prs: &[PullRequest]) -> Vec<(PullRequestType, i64)> {
    let mut counts: HashMap<PullRequestType, i64> = HashMap::new();
    for pr in prs {
        *counts.entry(classify_title(&pr.title)).or_insert(0) += 1;
    }

    let mut result: Vec<_> = counts.into_iter().collect();
    result.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    result
}
