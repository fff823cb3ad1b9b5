use crate::metering_sml::SmlMessageExtractor;
use crate::metrics::MetricsRegistry;
use log::{error, info};
use std::sync::{Arc, RwLock};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Unbound,
    Bound,
}

/// Binds the usage gauges to the extractor once the meter identity is known.
pub struct GaugeBinder {
    extractor: Arc<RwLock<SmlMessageExtractor>>,
    registry: Arc<MetricsRegistry>,
    interval: Duration,
    state: BindingState,
}

impl GaugeBinder {
    pub fn new(extractor: Arc<RwLock<SmlMessageExtractor>>, registry: Arc<MetricsRegistry>, interval: Duration) -> Self {
        Self {
            extractor,
            registry,
            interval,
            state: BindingState::Unbound,
        }
    }

    pub fn state(&self) -> BindingState {
        self.state
    }

    pub async fn start_thread(&mut self) {
        info!("Starting gauge binding loop, checking every {:?}", self.interval);
        let mut interval = tokio::time::interval(self.interval);
        loop {
            interval.tick().await;
            self.poll_once();
        }
    }

    pub fn poll_once(&mut self) -> BindingState {
        if self.state == BindingState::Bound {
            return self.state;
        }

        let initialized = match self.extractor.read() {
            Ok(extractor) => extractor.is_initialized(),
            Err(e) => {
                error!("Extractor lock poisoned: {}", e);
                return self.state;
            }
        };

        if initialized {
            let extractor = self.extractor.clone();
            self.registry.total_usage.set_function(Box::new(move || {
                extractor.read().map(|e| e.cumulative_usage()).unwrap_or(0.0)
            }));

            let extractor = self.extractor.clone();
            self.registry.actual_usage.set_function(Box::new(move || {
                extractor.read().map(|e| e.instantaneous_usage()).unwrap_or(0.0)
            }));

            info!("Meter identified, exporting {} and {}",
                self.registry.total_usage.name(), self.registry.actual_usage.name());
            self.state = BindingState::Bound;
        }

        self.state
    }
}
