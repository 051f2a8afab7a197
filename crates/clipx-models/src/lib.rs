//! Shared data models for the clipx extraction service.
//!
//! This crate provides Serde-serializable types for:
//! - Post references parsed from user-supplied URLs
//! - Quality tiers and bitrate classification
//! - Video candidates and assembled extraction results

pub mod post;
pub mod quality;
pub mod video;

// Re-export common types
pub use post::{PostHost, PostReference, PostUrlError, PostUrlResult};
pub use quality::{classify_bitrate, refine_from_url, QualityTier, QualityTierParseError};
pub use video::{dedupe_candidates, rank_candidates, ExtractionResult, VideoCandidate, MP4_MIME};
