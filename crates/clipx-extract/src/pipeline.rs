//! Extraction pipeline.
//!
//! Resolves the post, consults the cache, then tries each strategy in order
//! until one finds at least one candidate. Strategies run one at a time so the
//! authenticated quota is only spent when the free sources came up empty.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, info_span, warn, Instrument};

use clipx_models::{ExtractionResult, PostReference};

use crate::cache::ResponseCache;
use crate::config::{minutes_ceil, ExtractorConfig, StrategyKind};
use crate::credentials::CredentialBroker;
use crate::error::{ConfigError, ExtractError, ExtractResult};
use crate::metrics::{record_cache_lookup, record_cache_size, record_extraction, record_strategy};
use crate::rate_governor::RateGovernor;
use crate::strategy::{
    build_http_client, ApiAccess, AuthenticatedApiStrategy, EmbedScrapeStrategy, LegacyApiStrategy, RateLimit,
    SourceStrategy, StrategyOutcome, SyndicationStrategy,
};

/// Ordered strategies behind a shared result cache.
pub struct ExtractionPipeline {
    strategies: Vec<Box<dyn SourceStrategy>>,
    cache: Arc<ResponseCache>,
    strategy_timeout: Duration,
}

impl ExtractionPipeline {
    pub fn new(strategies: Vec<Box<dyn SourceStrategy>>, cache: Arc<ResponseCache>, strategy_timeout: Duration) -> Self {
        Self {
            strategies,
            cache,
            strategy_timeout,
        }
    }

    /// Build the configured strategies with one HTTP client, broker and governor.
    pub fn from_config(config: &ExtractorConfig) -> Result<Self, ConfigError> {
        if config.strategies.is_empty() {
            return Err(ConfigError::NoStrategies);
        }

        let http = build_http_client(config)?;
        let endpoints = &config.endpoints;

        if config.credentials.is_none() && config.strategies.iter().any(StrategyKind::requires_credentials) {
            warn!("No client credentials configured; authenticated strategies will fail");
        }

        let broker = Arc::new(CredentialBroker::new(
            http.clone(),
            endpoints.token_url(),
            config.credentials.clone(),
            config.token_ttl,
        ));
        let governor = Arc::new(RateGovernor::new(config.rate_window, config.rate_max_per_window));
        let access = ApiAccess::new(http.clone(), broker, governor);

        let strategies = config
            .strategies
            .iter()
            .map(|kind| -> Box<dyn SourceStrategy> {
                match kind {
                    StrategyKind::Embed => Box::new(EmbedScrapeStrategy::new(http.clone(), endpoints)),
                    StrategyKind::Syndication => {
                        Box::new(SyndicationStrategy::new(http.clone(), endpoints.syndication_url.clone()))
                    }
                    StrategyKind::Authenticated => {
                        Box::new(AuthenticatedApiStrategy::new(access.clone(), endpoints.clone()))
                    }
                    StrategyKind::Legacy => Box::new(LegacyApiStrategy::new(access.clone(), endpoints.clone())),
                }
            })
            .collect();

        let cache = Arc::new(ResponseCache::with_max_entries(config.cache_ttl, config.cache_max_entries));
        let pipeline = Self::new(strategies, cache, config.strategy_timeout);

        info!(
            strategies = ?pipeline.strategy_names(),
            cache_ttl_secs = config.cache_ttl.as_secs(),
            "Extraction pipeline configured"
        );

        Ok(pipeline)
    }

    /// Names of the strategies in the order they run.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Resolve `raw_url` and extract its videos.
    pub async fn extract(&self, raw_url: &str) -> ExtractResult<ExtractionResult> {
        let post = PostReference::parse(raw_url)?;
        self.extract_post(post).await
    }

    /// Extract videos for an already resolved post.
    pub async fn extract_post(&self, post: PostReference) -> ExtractResult<ExtractionResult> {
        let span = info_span!("extract", post_id = %post.id);
        self.run_pipeline(post).instrument(span).await
    }

    async fn run_pipeline(&self, post: PostReference) -> ExtractResult<ExtractionResult> {
        if let Some(cached) = self.cache.get(&post.id).await {
            record_cache_lookup(true);
            record_extraction("cache_hit");
            debug!("Returning cached result");
            return Ok(cached);
        }
        record_cache_lookup(false);

        let mut upstream_rate_limited = false;
        // Earlier sources win; later ones only fill what is still missing.
        let mut caption: Option<String> = None;
        let mut preview_image: Option<String> = None;

        for strategy in &self.strategies {
            match self.attempt(strategy.as_ref(), &post).await {
                StrategyOutcome::Found(findings) => {
                    let result = ExtractionResult::new(
                        post.clone(),
                        findings.candidates,
                        caption.clone().or(findings.caption).unwrap_or_default(),
                        preview_image.clone().or(findings.preview_image),
                    );
                    if result.is_empty() {
                        continue;
                    }

                    info!(
                        strategy = strategy.name(),
                        candidates = result.candidates().len(),
                        "Extraction succeeded"
                    );
                    self.cache.put(post.id.clone(), result.clone()).await;
                    record_cache_size(self.cache.len().await);
                    record_extraction("found");
                    return Ok(result);
                }
                StrategyOutcome::Empty {
                    caption: found_caption,
                    preview_image: found_preview,
                } => {
                    caption = caption.or(found_caption);
                    preview_image = preview_image.or(found_preview);
                }
                StrategyOutcome::Failed(_) => {}
                StrategyOutcome::RateLimited(RateLimit::Governor { retry_after }) => {
                    record_extraction("rate_limited");
                    return Err(ExtractError::RateLimited {
                        retry_after_minutes: minutes_ceil(retry_after),
                    });
                }
                StrategyOutcome::RateLimited(RateLimit::Upstream { .. }) => {
                    upstream_rate_limited = true;
                }
            }
        }

        record_extraction("not_found");
        info!(rate_limited = upstream_rate_limited, "No video found");
        Err(ExtractError::NoVideoFound {
            rate_limited: upstream_rate_limited,
        })
    }

    async fn attempt(&self, strategy: &dyn SourceStrategy, post: &PostReference) -> StrategyOutcome {
        let span = info_span!("strategy", strategy = strategy.name());
        let started = Instant::now();

        let outcome = match tokio::time::timeout(self.strategy_timeout, strategy.attempt(post))
            .instrument(span)
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => StrategyOutcome::Failed(format!(
                "timed out after {}s",
                self.strategy_timeout.as_secs_f64()
            )),
        };

        record_strategy(strategy.name(), outcome.label(), started.elapsed().as_secs_f64());
        match &outcome {
            StrategyOutcome::Failed(reason) => {
                warn!(strategy = strategy.name(), reason = %reason, "Strategy failed")
            }
            other => debug!(strategy = strategy.name(), outcome = other.label(), "Strategy finished"),
        }

        outcome
    }
}
