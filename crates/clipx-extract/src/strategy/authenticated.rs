//! Bearer-authenticated post lookup.
//!
//! Every call is gated by the [`RateGovernor`] first; a denied call never
//! reaches the network. The bearer token comes from the shared
//! [`CredentialBroker`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use clipx_models::{PostReference, VideoCandidate, MP4_MIME};

use crate::config::Endpoints;
use crate::credentials::CredentialBroker;
use crate::error::{StrategyError, StrategyResult};
use crate::metrics::record_governor_denial;
use crate::rate_governor::RateGovernor;
use crate::strategy::{
    lenient_bitrate, parse_rate_limit_reset, RateLimit, SourceStrategy, StrategyFindings, StrategyOutcome,
};

/// User agent the lookup endpoints expect from app-only clients.
pub const LOOKUP_USER_AGENT: &str = "v2TweetLookupJS";

const EXPANSIONS: &str = "attachments.media_keys,author_id";
const MEDIA_FIELDS: &str =
    "duration_ms,height,media_key,preview_image_url,public_metrics,type,url,width,variants,alt_text";
const TWEET_FIELDS: &str = "created_at,text,public_metrics";

/// Body of an authorized lookup, or the upstream's quota refusal.
pub(crate) enum Lookup {
    Body(String),
    RateLimited(Option<DateTime<Utc>>),
}

/// Quota gate, credential broker and HTTP client shared by the authenticated strategies.
#[derive(Clone)]
pub struct ApiAccess {
    http: Client,
    broker: Arc<CredentialBroker>,
    governor: Arc<RateGovernor>,
}

impl ApiAccess {
    pub fn new(http: Client, broker: Arc<CredentialBroker>, governor: Arc<RateGovernor>) -> Self {
        Self { http, broker, governor }
    }

    /// `Some(RateLimited)` if the governor refuses a call for `post`.
    pub(crate) async fn gate(&self, post: &PostReference) -> Option<StrategyOutcome> {
        if self.governor.allow(&post.id).await {
            return None;
        }
        record_governor_denial();
        warn!(post_id = %post.id, "Rate governor denied authenticated lookup");
        Some(StrategyOutcome::RateLimited(RateLimit::Governor {
            retry_after: self.governor.window(),
        }))
    }

    /// GET `url` with the bearer token.
    ///
    /// 429 is reported as [`Lookup::RateLimited`]; 401 drops the cached token
    /// before failing so the next call re-exchanges.
    pub(crate) async fn get(&self, url: &str, query: &[(&str, &str)]) -> StrategyResult<Lookup> {
        let token = self.broker.get_token().await?;

        let response = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(&token)
            .header(USER_AGENT, LOOKUP_USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let reset_at = parse_rate_limit_reset(
                response
                    .headers()
                    .get("x-rate-limit-reset")
                    .and_then(|v| v.to_str().ok()),
            );
            warn!(reset_at = ?reset_at, "Authenticated upstream rate limit reached");
            return Ok(Lookup::RateLimited(reset_at));
        }
        if status == StatusCode::UNAUTHORIZED {
            self.broker.invalidate().await;
        }
        if !status.is_success() {
            return Err(StrategyError::http(status));
        }

        Ok(Lookup::Body(response.text().await?))
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    data: Option<LookupData>,
    #[serde(default)]
    includes: Option<LookupIncludes>,
}

#[derive(Debug, Deserialize)]
struct LookupData {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupIncludes {
    #[serde(default)]
    media: Vec<LookupMedia>,
}

#[derive(Debug, Deserialize)]
struct LookupMedia {
    #[serde(rename = "type", default)]
    media_type: String,
    #[serde(default)]
    preview_image_url: Option<String>,
    #[serde(default)]
    variants: Vec<LookupVariant>,
}

#[derive(Debug, Deserialize)]
struct LookupVariant {
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    bit_rate: Option<Value>,
}

/// Post lookup with media expansions.
pub struct AuthenticatedApiStrategy {
    access: ApiAccess,
    endpoints: Endpoints,
}

impl AuthenticatedApiStrategy {
    pub fn new(access: ApiAccess, endpoints: Endpoints) -> Self {
        Self { access, endpoints }
    }

    async fn fetch(&self, post: &PostReference) -> StrategyResult<StrategyOutcome> {
        let url = self.endpoints.post_lookup_url(&post.id);
        debug!(post_id = %post.id, "Looking up post");

        let query = [
            ("expansions", EXPANSIONS),
            ("media.fields", MEDIA_FIELDS),
            ("tweet.fields", TWEET_FIELDS),
        ];
        let body = match self.access.get(&url, &query).await? {
            Lookup::Body(body) => body,
            Lookup::RateLimited(reset_at) => {
                return Ok(StrategyOutcome::RateLimited(RateLimit::Upstream { reset_at }))
            }
        };

        let lookup: LookupResponse = serde_json::from_str(&body)?;
        Ok(findings_from_lookup(lookup).into_outcome())
    }
}

#[async_trait]
impl SourceStrategy for AuthenticatedApiStrategy {
    fn name(&self) -> &'static str {
        "authenticated"
    }

    async fn attempt(&self, post: &PostReference) -> StrategyOutcome {
        if let Some(denied) = self.access.gate(post).await {
            return denied;
        }
        StrategyOutcome::from_result(self.fetch(post).await)
    }
}

fn findings_from_lookup(lookup: LookupResponse) -> StrategyFindings {
    let mut findings = StrategyFindings {
        caption: lookup.data.and_then(|d| d.text).filter(|t| !t.is_empty()),
        ..Default::default()
    };

    let media = lookup.includes.map(|i| i.media).unwrap_or_default();
    for item in media {
        if item.media_type != "video" && item.media_type != "animated_gif" {
            continue;
        }
        findings.offer_preview(item.preview_image_url);

        for variant in item.variants {
            if variant.content_type.as_deref() != Some(MP4_MIME) {
                continue;
            }
            if let Some(url) = variant.url.filter(|u| !u.is_empty()) {
                findings.push_unique(VideoCandidate::with_bitrate(url, lenient_bitrate(variant.bit_rate.as_ref())));
            }
        }
    }

    findings
}
