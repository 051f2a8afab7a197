//! Quality tier definitions and classification.
//!
//! Tiers are ordered from lowest to highest:
//!
//! - `Sd`: unknown resolution (no bitrate and no URL hint)
//! - `P360` / `P480` / `P720` / `P1080`: resolution buckets

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lower bitrate bound (bps) for 1080p.
pub const BITRATE_1080P: u64 = 2_176_000;
/// Lower bitrate bound (bps) for 720p.
pub const BITRATE_720P: u64 = 832_000;
/// Lower bitrate bound (bps) for 480p.
pub const BITRATE_480P: u64 = 256_000;

/// URL substrings that reveal a resolution, checked in order.
const URL_HINTS: &[(&str, &str, QualityTier)] = &[
    ("1280x720", "/720/", QualityTier::P720),
    ("1920x1080", "/1080/", QualityTier::P1080),
    ("640x360", "/360/", QualityTier::P360),
    ("854x480", "/480/", QualityTier::P480),
];

/// Coarse resolution label for a video candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum QualityTier {
    #[default]
    #[serde(rename = "SD")]
    Sd,
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
}

impl QualityTier {
    /// All tiers, lowest first.
    pub const ALL: &'static [QualityTier] = &[
        QualityTier::Sd,
        QualityTier::P360,
        QualityTier::P480,
        QualityTier::P720,
        QualityTier::P1080,
    ];

    /// Returns the tier label as rendered to clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Sd => "SD",
            QualityTier::P360 => "360p",
            QualityTier::P480 => "480p",
            QualityTier::P720 => "720p",
            QualityTier::P1080 => "1080p",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for QualityTier {
    type Err = QualityTierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sd" => Ok(QualityTier::Sd),
            "360p" | "360" => Ok(QualityTier::P360),
            "480p" | "480" => Ok(QualityTier::P480),
            "720p" | "720" => Ok(QualityTier::P720),
            "1080p" | "1080" => Ok(QualityTier::P1080),
            _ => Err(QualityTierParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown quality tier: {0}")]
pub struct QualityTierParseError(String);

/// Map a known bitrate to a tier.
pub fn classify_bitrate(bitrate_bps: u64) -> QualityTier {
    if bitrate_bps >= BITRATE_1080P {
        QualityTier::P1080
    } else if bitrate_bps >= BITRATE_720P {
        QualityTier::P720
    } else if bitrate_bps >= BITRATE_480P {
        QualityTier::P480
    } else {
        QualityTier::P360
    }
}

/// Infer a tier from dimension tokens or path segments in a URL.
///
/// Returns `Sd` when the URL carries no recognizable hint.
pub fn refine_from_url(url: &str) -> QualityTier {
    URL_HINTS
        .iter()
        .find(|(dims, segment, _)| url.contains(dims) || url.contains(segment))
        .map(|(_, _, tier)| *tier)
        .unwrap_or(QualityTier::Sd)
}
