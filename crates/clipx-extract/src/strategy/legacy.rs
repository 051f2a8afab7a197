//! Bearer-authenticated legacy status lookup.
//!
//! Shares the quota gate and credentials with the post lookup. Off by default;
//! enable it through the strategy order.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use clipx_models::{PostReference, VideoCandidate, MP4_MIME};

use crate::config::Endpoints;
use crate::error::StrategyResult;
use crate::strategy::authenticated::{ApiAccess, Lookup};
use crate::strategy::{lenient_bitrate, RateLimit, SourceStrategy, StrategyFindings, StrategyOutcome};

#[derive(Debug, Deserialize)]
struct LegacyStatus {
    #[serde(default)]
    full_text: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    extended_entities: Option<LegacyEntities>,
}

#[derive(Debug, Deserialize)]
struct LegacyEntities {
    #[serde(default)]
    media: Vec<LegacyMedia>,
}

#[derive(Debug, Deserialize)]
struct LegacyMedia {
    #[serde(default)]
    media_url_https: Option<String>,
    #[serde(default)]
    video_info: Option<LegacyVideoInfo>,
}

#[derive(Debug, Deserialize)]
struct LegacyVideoInfo {
    #[serde(default)]
    variants: Vec<LegacyVariant>,
}

#[derive(Debug, Deserialize)]
struct LegacyVariant {
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    bitrate: Option<Value>,
}

pub struct LegacyApiStrategy {
    access: ApiAccess,
    endpoints: Endpoints,
}

impl LegacyApiStrategy {
    pub fn new(access: ApiAccess, endpoints: Endpoints) -> Self {
        Self { access, endpoints }
    }

    async fn fetch(&self, post: &PostReference) -> StrategyResult<StrategyOutcome> {
        let url = self.endpoints.legacy_lookup_url();
        debug!(post_id = %post.id, "Looking up legacy status");

        let query = [
            ("id", post.id.as_str()),
            ("tweet_mode", "extended"),
            ("include_entities", "true"),
        ];
        let body = match self.access.get(&url, &query).await? {
            Lookup::Body(body) => body,
            Lookup::RateLimited(reset_at) => {
                return Ok(StrategyOutcome::RateLimited(RateLimit::Upstream { reset_at }))
            }
        };

        let status: LegacyStatus = serde_json::from_str(&body)?;
        Ok(findings_from_status(status).into_outcome())
    }
}

#[async_trait]
impl SourceStrategy for LegacyApiStrategy {
    fn name(&self) -> &'static str {
        "legacy"
    }

    async fn attempt(&self, post: &PostReference) -> StrategyOutcome {
        if let Some(denied) = self.access.gate(post).await {
            return denied;
        }
        StrategyOutcome::from_result(self.fetch(post).await)
    }
}

fn findings_from_status(status: LegacyStatus) -> StrategyFindings {
    let mut findings = StrategyFindings {
        caption: status.full_text.or(status.text).filter(|t| !t.is_empty()),
        ..Default::default()
    };

    let media = status.extended_entities.map(|e| e.media).unwrap_or_default();
    for item in media {
        let Some(info) = item.video_info else {
            continue;
        };
        findings.offer_preview(item.media_url_https);

        for variant in info.variants {
            if variant.content_type.as_deref() != Some(MP4_MIME) {
                continue;
            }
            if let Some(url) = variant.url.filter(|u| !u.is_empty()) {
                findings.push_unique(VideoCandidate::with_bitrate(url, lenient_bitrate(variant.bitrate.as_ref())));
            }
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use clipx_models::QualityTier;
    use reqwest::Client;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::config::ClientCredentials;
    use crate::credentials::CredentialBroker;
    use crate::rate_governor::RateGovernor;

    fn strategy(server: &MockServer, governor: Arc<RateGovernor>) -> LegacyApiStrategy {
        let endpoints = Endpoints::single_host(server.uri());
        let broker = CredentialBroker::new(
            Client::new(),
            endpoints.token_url(),
            Some(ClientCredentials::new("client", "secret")),
            Duration::from_secs(3600),
        );
        LegacyApiStrategy::new(ApiAccess::new(Client::new(), Arc::new(broker), governor), endpoints)
    }

    fn governor(max_per_window: u32) -> Arc<RateGovernor> {
        Arc::new(RateGovernor::new(Duration::from_secs(900), max_per_window))
    }

    fn post() -> PostReference {
        PostReference::parse("https://twitter.com/user/status/7").unwrap()
    }

    #[tokio::test]
    async fn test_reads_extended_entities() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "t" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/1.1/statuses/show.json"))
            .and(query_param("id", "7"))
            .and(query_param("tweet_mode", "extended"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "full_text": "long caption",
                "extended_entities": { "media": [
                    { "media_url_https": "https://pbs.example/photo.jpg" },
                    {
                        "media_url_https": "https://pbs.example/video.jpg",
                        "video_info": { "variants": [
                            { "content_type": "video/mp4", "bitrate": 832000, "url": "https://v/720.mp4" },
                            { "content_type": "application/x-mpegURL", "url": "https://v/pl.m3u8" }
                        ] }
                    }
                ] }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = strategy(&server, governor(50)).attempt(&post()).await;
        let findings = match outcome {
            StrategyOutcome::Found(findings) => findings,
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert_eq!(findings.candidates.len(), 1);
        assert_eq!(findings.candidates[0].quality, QualityTier::P720);
        assert_eq!(findings.caption.as_deref(), Some("long caption"));
        assert_eq!(findings.preview_image.as_deref(), Some("https://pbs.example/video.jpg"));
    }

    #[tokio::test]
    async fn test_shares_governor_gate() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let governor = governor(1);
        assert!(governor.allow("7").await);
        let outcome = strategy(&server, governor).attempt(&post()).await;
        assert_eq!(outcome.label(), "governor_denied");
    }
}
