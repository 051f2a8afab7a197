//! Application state.

use std::sync::Arc;

use clipx_extract::{ConfigError, ExtractionPipeline, ExtractorConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<ExtractionPipeline>,
    /// Rate window in minutes, quoted in rate-limited error messages
    pub rate_window_minutes: u64,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: ApiConfig, extractor: &ExtractorConfig) -> Result<Self, ConfigError> {
        let pipeline = ExtractionPipeline::from_config(extractor)?;
        Ok(Self::with_pipeline(config, pipeline, extractor.rate_window_minutes()))
    }

    /// Wrap an already built pipeline.
    pub fn with_pipeline(config: ApiConfig, pipeline: ExtractionPipeline, rate_window_minutes: u64) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
            rate_window_minutes,
        }
    }
}
