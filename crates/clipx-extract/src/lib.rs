//! Multi-source video extraction.
//!
//! This crate provides:
//! - Source strategies for the embed host, syndication endpoint and authenticated API
//! - The ordered extraction pipeline with its response cache
//! - Per-post rate governor and bearer credential broker
//! - Environment-driven configuration and pipeline metrics

pub mod cache;
pub mod config;
pub mod credentials;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod rate_governor;
pub mod strategy;

pub use cache::ResponseCache;
pub use config::{ClientCredentials, Endpoints, ExtractorConfig, StrategyKind, DEFAULT_STRATEGIES};
pub use credentials::CredentialBroker;
pub use error::{AuthError, ConfigError, ExtractError, ExtractResult, StrategyError};
pub use pipeline::ExtractionPipeline;
pub use rate_governor::RateGovernor;
pub use strategy::{RateLimit, SourceStrategy, StrategyFindings, StrategyOutcome};
