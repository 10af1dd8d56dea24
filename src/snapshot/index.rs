use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

use super::SnapshotError;
use crate::fingerprint::Fingerprint;

static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)href\s*=\s*["']([^"']+)["']"#).expect("valid regex")
});

const FINGERPRINT_KEY: &str = "sha256=";

/// A resolved snapshot asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLink {
    /// Download URL, fragment stripped
    pub url: Url,
    /// Fingerprint annotated on the link, if any
    pub fingerprint: Option<Fingerprint>,
    /// Release tag: the path segment preceding the asset name
    pub version: Option<String>,
}

impl AssetLink {
    /// Build a link from a full URL such as `https://host/v1.0.0/emoji.db#sha256=<hex>`.
    pub fn parse(url: &str) -> Result<Self, SnapshotError> {
        let url = Url::parse(url).map_err(|e| SnapshotError::InvalidIndex(e.to_string()))?;
        Ok(Self::from_url(url))
    }

    fn from_url(mut url: Url) -> Self {
        let fingerprint = url.fragment().and_then(parse_fingerprint);
        url.set_fragment(None);

        let version = url.path_segments().and_then(|segments| {
            let segments: Vec<&str> = segments.collect();
            let parent = segments.len().checked_sub(2).map(|i| segments[i])?;
            looks_like_version(parent).then(|| parent.to_string())
        });

        Self {
            url,
            fingerprint,
            version,
        }
    }
}

/// Find the first link in `body` whose path ends with `/<asset_name>`.
///
/// Relative hrefs are resolved against `base`.
pub fn parse_index(body: &str, base: &Url, asset_name: &str) -> Result<AssetLink, SnapshotError> {
    for caps in HREF.captures_iter(body) {
        let href = caps[1].replace("&amp;", "&");
        let Ok(url) = base.join(&href) else {
            continue;
        };

        let is_asset = url
            .path_segments()
            .and_then(|mut s| s.next_back())
            .is_some_and(|last| last == asset_name);

        if is_asset {
            return Ok(AssetLink::from_url(url));
        }
    }

    Err(SnapshotError::InvalidIndex(format!(
        "no link to {} found at {}",
        asset_name, base
    )))
}

fn parse_fingerprint(fragment: &str) -> Option<Fingerprint> {
    let hex = fragment
        .split('&')
        .find_map(|part| part.strip_prefix(FINGERPRINT_KEY))?;

    match hex.parse() {
        Ok(fp) => Some(fp),
        Err(e) => {
            tracing::warn!("Ignoring malformed fingerprint annotation: {}", e);
            None
        }
    }
}

fn looks_like_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .unwrap_or(segment)
        .starts_with(|c: char| c.is_ascii_digit())
}
