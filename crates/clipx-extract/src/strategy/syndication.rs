//! Public syndication JSON endpoint.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use clipx_models::{PostReference, VideoCandidate, MP4_MIME};

use crate::error::{StrategyError, StrategyResult};
use crate::strategy::{lenient_bitrate, SourceStrategy, StrategyFindings, StrategyOutcome};

/// Feature flags the endpoint expects; without them some fields are omitted.
const FEATURES: &str = "tfw_timeline_list:;tfw_follower_count_sunset:true;tfw_tweet_edit_backend:on;\
tfw_refsrc_session:on;tfw_fosnr_soft_interventions_enabled:on;tfw_show_birdwatch_pivots_enabled:on;\
tfw_show_business_verified_badge:on;tfw_duplicate_scribes_to_settings:on;\
tfw_use_profile_image_shape_enabled:on;tfw_show_blue_verified_badge:on;\
tfw_legacy_timeline_sunset:true;tfw_show_gov_verified_badge:on;\
tfw_show_business_affiliate_badge:on;tfw_tweet_edit_frontend:on";

#[derive(Debug, Deserialize)]
struct SyndicationPost {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    video: Option<SyndicationVideo>,
}

#[derive(Debug, Deserialize)]
struct SyndicationVideo {
    #[serde(default)]
    variants: Vec<SyndicationVariant>,
    #[serde(default)]
    poster: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SyndicationVariant {
    #[serde(rename = "type", default)]
    mime_type: Option<String>,
    #[serde(default)]
    src: Option<String>,
    /// Sent as a string or a number depending on the post.
    #[serde(default)]
    bitrate: Option<Value>,
}

/// Reads the unauthenticated post summary.
pub struct SyndicationStrategy {
    http: Client,
    url: String,
}

impl SyndicationStrategy {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }

    async fn fetch(&self, post: &PostReference) -> StrategyResult<StrategyOutcome> {
        debug!(post_id = %post.id, "Fetching syndication summary");

        let response = self
            .http
            .get(&self.url)
            .query(&[
                ("id", post.id.as_str()),
                ("lang", "en"),
                ("features", FEATURES),
                ("token", ""),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(StrategyOutcome::empty());
        }
        if !status.is_success() {
            return Err(StrategyError::http(status));
        }

        let body = response.text().await?;
        let summary: SyndicationPost = serde_json::from_str(&body)?;
        Ok(findings_from_summary(summary).into_outcome())
    }
}

#[async_trait]
impl SourceStrategy for SyndicationStrategy {
    fn name(&self) -> &'static str {
        "syndication"
    }

    async fn attempt(&self, post: &PostReference) -> StrategyOutcome {
        StrategyOutcome::from_result(self.fetch(post).await)
    }
}

fn findings_from_summary(summary: SyndicationPost) -> StrategyFindings {
    let mut findings = StrategyFindings {
        caption: summary.text.filter(|t| !t.is_empty()),
        ..Default::default()
    };

    if let Some(video) = summary.video {
        for variant in video.variants {
            if variant.mime_type.as_deref() != Some(MP4_MIME) {
                continue;
            }
            let Some(src) = variant.src.filter(|s| !s.is_empty()) else {
                continue;
            };
            findings.push_unique(VideoCandidate::with_bitrate(src, lenient_bitrate(variant.bitrate.as_ref())));
        }
        findings.offer_preview(video.poster);
    }

    findings
}
