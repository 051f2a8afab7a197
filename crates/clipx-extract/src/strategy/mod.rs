//! Source strategies.
//!
//! Each upstream has its own strategy implementing [`SourceStrategy`]. A
//! strategy never returns an error: network, HTTP and parse failures are
//! folded into [`StrategyOutcome::Failed`] so the pipeline can move on to the
//! next source.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;

use clipx_models::{dedupe_candidates, PostReference, VideoCandidate};

use crate::config::ExtractorConfig;
use crate::error::{ConfigError, StrategyResult};

pub mod authenticated;
pub mod embed;
pub mod legacy;
pub mod syndication;

pub use authenticated::{ApiAccess, AuthenticatedApiStrategy};
pub use embed::EmbedScrapeStrategy;
pub use legacy::LegacyApiStrategy;
pub use syndication::SyndicationStrategy;

/// What a strategy found for a post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyFindings {
    pub candidates: Vec<VideoCandidate>,
    pub caption: Option<String>,
    pub preview_image: Option<String>,
}

impl StrategyFindings {
    /// Add a candidate unless its URL is already present.
    pub fn push_unique(&mut self, candidate: VideoCandidate) {
        if !self.candidates.iter().any(|c| c.url == candidate.url) {
            self.candidates.push(candidate);
        }
    }

    /// Set the preview image if none was recorded yet.
    pub fn offer_preview(&mut self, url: Option<String>) {
        if self.preview_image.is_none() {
            self.preview_image = url.filter(|u| !u.is_empty());
        }
    }

    /// `Found` when at least one candidate exists, `Empty` otherwise.
    ///
    /// An empty outcome still carries the caption and preview so a later
    /// source with videos can reuse them.
    pub fn into_outcome(mut self) -> StrategyOutcome {
        self.candidates = dedupe_candidates(self.candidates);
        if self.candidates.is_empty() {
            StrategyOutcome::Empty {
                caption: self.caption,
                preview_image: self.preview_image,
            }
        } else {
            StrategyOutcome::Found(self)
        }
    }
}

/// Who refused the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimit {
    /// The local governor denied the call before any network traffic.
    Governor { retry_after: Duration },
    /// The upstream answered HTTP 429.
    Upstream { reset_at: Option<DateTime<Utc>> },
}

/// Result of one strategy attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome {
    /// At least one candidate.
    Found(StrategyFindings),
    /// Upstream reachable, no video present. Post details may still be known.
    Empty {
        caption: Option<String>,
        preview_image: Option<String>,
    },
    /// Quota exhausted.
    RateLimited(RateLimit),
    /// Network, HTTP or parse failure.
    Failed(String),
}

impl StrategyOutcome {
    /// `Empty` with nothing learned about the post.
    pub fn empty() -> Self {
        StrategyOutcome::Empty {
            caption: None,
            preview_image: None,
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            StrategyOutcome::Found(_) => "found",
            StrategyOutcome::Empty { .. } => "empty",
            StrategyOutcome::RateLimited(RateLimit::Governor { .. }) => "governor_denied",
            StrategyOutcome::RateLimited(RateLimit::Upstream { .. }) => "rate_limited",
            StrategyOutcome::Failed(_) => "failed",
        }
    }

    /// Fold a fallible attempt into an outcome.
    pub fn from_result(result: StrategyResult<StrategyOutcome>) -> Self {
        result.unwrap_or_else(|e| StrategyOutcome::Failed(e.to_string()))
    }
}

/// One upstream-specific way of finding videos for a post.
#[async_trait]
pub trait SourceStrategy: Send + Sync {
    /// Name of this strategy for logging and metrics.
    fn name(&self) -> &'static str;

    /// Try to find candidates for `post`. Never fails; see [`StrategyOutcome`].
    async fn attempt(&self, post: &PostReference) -> StrategyOutcome;
}

/// Build the shared upstream HTTP client.
pub fn build_http_client(config: &ExtractorConfig) -> Result<Client, ConfigError> {
    let client = Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(10)
        .user_agent(concat!("clipx/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Parse a unix-seconds `x-rate-limit-reset` header value.
pub(crate) fn parse_rate_limit_reset(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Bitrate from a JSON string or number; anything unparseable counts as 0.
pub(crate) fn lenient_bitrate(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StrategyError;

    #[test]
    fn test_findings_into_outcome() {
        assert_eq!(StrategyFindings::default().into_outcome(), StrategyOutcome::empty());

        let mut findings = StrategyFindings::default();
        findings.push_unique(VideoCandidate::with_bitrate("a", 1));
        findings.push_unique(VideoCandidate::with_bitrate("a", 2));
        match findings.into_outcome() {
            StrategyOutcome::Found(f) => assert_eq!(f.candidates.len(), 1),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_empty_outcome_keeps_post_details() {
        let findings = StrategyFindings {
            candidates: Vec::new(),
            caption: Some("words".into()),
            preview_image: Some("thumb".into()),
        };
        assert_eq!(
            findings.into_outcome(),
            StrategyOutcome::Empty {
                caption: Some("words".into()),
                preview_image: Some("thumb".into()),
            }
        );
    }

    #[test]
    fn test_offer_preview_keeps_first() {
        let mut findings = StrategyFindings::default();
        findings.offer_preview(Some(String::new()));
        assert_eq!(findings.preview_image, None);
        findings.offer_preview(Some("first".into()));
        findings.offer_preview(Some("second".into()));
        assert_eq!(findings.preview_image.as_deref(), Some("first"));
    }

    #[test]
    fn test_from_result_folds_errors() {
        let outcome = StrategyOutcome::from_result(Err(StrategyError::http(reqwest::StatusCode::BAD_GATEWAY)));
        assert_eq!(outcome, StrategyOutcome::Failed("Upstream returned HTTP 502".into()));
        assert_eq!(outcome.label(), "failed");
    }

    #[test]
    fn test_lenient_bitrate() {
        use serde_json::json;
        assert_eq!(lenient_bitrate(Some(&json!("3000000"))), 3_000_000);
        assert_eq!(lenient_bitrate(Some(&json!(832000))), 832_000);
        assert_eq!(lenient_bitrate(Some(&json!("fast"))), 0);
        assert_eq!(lenient_bitrate(Some(&json!(null))), 0);
        assert_eq!(lenient_bitrate(None), 0);
    }

    #[test]
    fn test_parse_rate_limit_reset() {
        let reset = parse_rate_limit_reset(Some("1700000000")).unwrap();
        assert_eq!(reset.timestamp(), 1_700_000_000);
        assert!(parse_rate_limit_reset(Some("soon")).is_none());
        assert!(parse_rate_limit_reset(None).is_none());
    }
}
