//! Bilibili video id extraction.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ModelError, ModelResult};

/// Matches BV ids (`BV1xx411c7mD`) and legacy av ids (`av170001`).
/// Character classes are spelled out so that `\w` stays ASCII-only.
static VIDEO_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:BV[0-9A-Za-z_]+|av[0-9]+)").expect("valid video id pattern")
});

/// Extract the video id from a Bilibili URL.
///
/// The first match anywhere in the input wins, so short links, mobile links
/// and bare ids all work. The id is returned exactly as written in the URL.
pub fn extract_video_id(url: &str) -> ModelResult<String> {
    VIDEO_ID_PATTERN
        .find(url)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ModelError::InvalidVideoUrl(url.to_string()))
}
