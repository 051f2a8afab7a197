//! Video candidates and assembled extraction results.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::post::PostReference;
use crate::quality::{classify_bitrate, refine_from_url, QualityTier};

/// MIME type of every candidate the strategies accept.
pub const MP4_MIME: &str = "video/mp4";

/// One playable video resource discovered by a strategy.
///
/// Two candidates with the same `url` are the same candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoCandidate {
    pub url: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub quality: QualityTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
}

impl VideoCandidate {
    /// MP4 candidate whose tier comes from a known bitrate.
    pub fn with_bitrate(url: impl Into<String>, bitrate_bps: u64) -> Self {
        Self {
            url: url.into(),
            mime_type: MP4_MIME.to_string(),
            quality: classify_bitrate(bitrate_bps),
            bitrate: Some(bitrate_bps),
        }
    }

    /// MP4 candidate without bitrate; tier is inferred from the URL.
    pub fn from_url_hint(url: impl Into<String>) -> Self {
        let url = url.into();
        let quality = refine_from_url(&url);
        Self {
            url,
            mime_type: MP4_MIME.to_string(),
            quality,
            bitrate: None,
        }
    }

    /// Bitrate used for ranking; unknown sorts lowest.
    pub fn rank_bitrate(&self) -> u64 {
        self.bitrate.unwrap_or(0)
    }
}

/// Drop candidates whose URL was already seen. First occurrence wins.
pub fn dedupe_candidates(candidates: Vec<VideoCandidate>) -> Vec<VideoCandidate> {
    let mut seen = HashSet::with_capacity(candidates.len());
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.url.clone()))
        .collect()
}

/// Sort by descending bitrate, keeping discovery order for ties.
pub fn rank_candidates(mut candidates: Vec<VideoCandidate>) -> Vec<VideoCandidate> {
    // sort_by is stable
    candidates.sort_by(|a, b| b.rank_bitrate().cmp(&a.rank_bitrate()));
    candidates
}

/// Final result for a post. Candidates are deduplicated and ranked on construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    post: PostReference,
    candidates: Vec<VideoCandidate>,
    caption: String,
    preview_image: Option<String>,
}

impl ExtractionResult {
    pub fn new(
        post: PostReference,
        candidates: Vec<VideoCandidate>,
        caption: impl Into<String>,
        preview_image: Option<String>,
    ) -> Self {
        Self {
            post,
            candidates: rank_candidates(dedupe_candidates(candidates)),
            caption: caption.into(),
            preview_image: preview_image.filter(|p| !p.is_empty()),
        }
    }

    pub fn post(&self) -> &PostReference {
        &self.post
    }

    pub fn candidates(&self) -> &[VideoCandidate] {
        &self.candidates
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn preview_image(&self) -> Option<&str> {
        self.preview_image.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
