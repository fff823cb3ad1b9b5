//! SML smart meter exporter
//!
//! Extracts identity and usage figures from decoded SML list responses and
//! publishes them as Prometheus metrics.

pub mod api;
pub mod cli;
pub mod config;
pub mod connector;
pub mod metering_sml;
pub mod metrics;
pub mod obis_utils;
pub mod polling;

// Re-export common types for easier access
pub use api::ApiManager;
pub use config::Config;
pub use connector::{JsonLinesConnector, RecordConnector};
pub use metering_sml::SmlMessageExtractor;
pub use metrics::MetricsRegistry;
pub use polling::GaugeBinder;
