//! Helpers mapping emoji URLs and bracketed tags to emoji ids.
//!
//! - URL form: `http://qzonestyle.gtimg.cn/qzone/em/e400343.gif`
//! - Tag form: `[em]e400343[/em]`

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static URL_STEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^e(\d+)(?:\.[A-Za-z0-9]+)?$").expect("valid regex"));

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[em\]e(\d+)\[/em\]$").expect("valid regex"));

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Either a url or a tag must be given")]
    NoInput,

    #[error("Not an emoji url: {0}")]
    InvalidUrl(String),

    #[error("Not an emoji tag: {0}")]
    InvalidTag(String),
}

/// Extract the emoji id from an asset URL.
///
/// Only the last path segment is inspected; scheme and host are ignored.
pub fn resolve_url(url: &str) -> Result<i64, ResolveError> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let stem = path.rsplit('/').next().unwrap_or_default();

    URL_STEM
        .captures(stem)
        .and_then(|c| c[1].parse().ok())
        .ok_or_else(|| ResolveError::InvalidUrl(url.to_string()))
}

/// Extract the emoji id from a `[em]e<ID>[/em]` tag.
pub fn resolve_tag(tag: &str) -> Result<i64, ResolveError> {
    TAG.captures(tag)
        .and_then(|c| c[1].parse().ok())
        .ok_or_else(|| ResolveError::InvalidTag(tag.to_string()))
}

/// Resolve from whichever input is present, preferring the url.
pub fn resolve(url: Option<&str>, tag: Option<&str>) -> Result<i64, ResolveError> {
    match (url.filter(|u| !u.is_empty()), tag.filter(|t| !t.is_empty())) {
        (Some(url), _) => resolve_url(url),
        (None, Some(tag)) => resolve_tag(tag),
        (None, None) => Err(ResolveError::NoInput),
    }
}

/// Format an id as a bracketed tag.
pub fn to_tag(id: i64) -> String {
    format!("[em]e{}[/em]", id)
}
