//! HTML embed scrape.
//!
//! The post URL is rewritten onto an embed-rendering host, which serves
//! Open-Graph tags meant for chat-app link previews. Candidates come from
//! `og:video` and `twitter:player:stream` meta tags; no bitrate is exposed, so
//! tiers are inferred from URL hints.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use tracing::debug;
use url::Url;

use clipx_models::{PostHost, PostReference, VideoCandidate};

use crate::config::Endpoints;
use crate::error::{StrategyError, StrategyResult};
use crate::strategy::{SourceStrategy, StrategyFindings, StrategyOutcome};

/// Bot user agent that makes embed hosts render preview tags.
pub const EMBED_USER_AGENT: &str = "Mozilla/5.0 (compatible; Discordbot/2.0; +https://discordapp.com)";

static OG_VIDEO: LazyLock<Regex> = LazyLock::new(|| meta_pattern("og:video"));
static PLAYER_STREAM: LazyLock<Regex> = LazyLock::new(|| meta_pattern("twitter:player:stream"));
static OG_DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| meta_pattern("og:description"));
static OG_IMAGE: LazyLock<Regex> = LazyLock::new(|| meta_pattern("og:image"));

fn meta_pattern(property: &str) -> Regex {
    Regex::new(&format!(
        r#"<meta[^>]*property="{}"[^>]*content="([^"]+)""#,
        regex::escape(property)
    ))
    .expect("meta tag pattern is valid")
}

/// Scrapes Open-Graph tags from the embed host.
pub struct EmbedScrapeStrategy {
    http: Client,
    twitter_base: String,
    x_base: String,
}

impl EmbedScrapeStrategy {
    pub fn new(http: Client, endpoints: &Endpoints) -> Self {
        Self {
            http,
            twitter_base: endpoints.embed_twitter_base.trim_end_matches('/').to_string(),
            x_base: endpoints.embed_x_base.trim_end_matches('/').to_string(),
        }
    }

    /// Rewrite the post URL onto the embed host, keeping its path.
    pub fn embed_url(&self, post: &PostReference) -> String {
        let base = match post.host {
            PostHost::Twitter => &self.twitter_base,
            PostHost::X => &self.x_base,
        };
        let path = Url::parse(&post.url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| post.status_path());
        format!("{}{}", base, path)
    }

    async fn fetch(&self, post: &PostReference) -> StrategyResult<StrategyOutcome> {
        let url = self.embed_url(post);
        debug!(url = %url, "Fetching embed page");

        let response = self.http.get(&url).header(USER_AGENT, EMBED_USER_AGENT).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StrategyError::http(status));
        }

        let html = response.text().await?;
        Ok(parse_embed_html(&html).into_outcome())
    }
}

#[async_trait]
impl SourceStrategy for EmbedScrapeStrategy {
    fn name(&self) -> &'static str {
        "embed"
    }

    async fn attempt(&self, post: &PostReference) -> StrategyOutcome {
        StrategyOutcome::from_result(self.fetch(post).await)
    }
}

/// Extract candidates, caption and preview from embed HTML.
pub fn parse_embed_html(html: &str) -> StrategyFindings {
    let mut findings = StrategyFindings::default();

    for caps in OG_VIDEO.captures_iter(html) {
        let url = decode_entities(&caps[1]);
        if url.contains(".mp4") {
            findings.push_unique(VideoCandidate::from_url_hint(url));
        }
    }

    if let Some(caps) = PLAYER_STREAM.captures(html) {
        findings.push_unique(VideoCandidate::from_url_hint(decode_entities(&caps[1])));
    }

    findings.caption = OG_DESCRIPTION.captures(html).map(|caps| decode_entities(&caps[1]));
    findings.offer_preview(OG_IMAGE.captures(html).map(|caps| decode_entities(&caps[1])));

    findings
}

/// Decode the handful of entities that appear in attribute values.
fn decode_entities(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
