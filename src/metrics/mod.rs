use log::{debug, error};
use std::fmt::Write;
use std::sync::{Arc, RwLock};

/// Receives the identity labels of the meter.
pub trait IdentitySink {
    fn publish(&self, labels: &[(&str, &str)]);
}

pub type GaugeFn = Box<dyn Fn() -> f64 + Send + Sync>;

/// Info style metric, rendered as `<name>_info{labels} 1.0`.
/// Every publish replaces the complete label set.
pub struct Info {
    name: String,
    help: String,
    labels: RwLock<Vec<(String, String)>>,
}

impl Info {
    pub fn new(name: &str, help: &str) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            labels: RwLock::new(Vec::new()),
        }
    }

    pub fn labels(&self) -> Vec<(String, String)> {
        match self.labels.read() {
            Ok(labels) => labels.clone(),
            Err(e) => {
                error!("Unable to read info metric {}: {}", self.name, e);
                Vec::new()
            }
        }
    }

    fn render(&self, out: &mut String) {
        let labels = self.labels();
        let _ = writeln!(out, "# HELP {}_info {}", self.name, self.help);
        let _ = writeln!(out, "# TYPE {}_info gauge", self.name);
        let _ = writeln!(out, "{}_info{} 1.0", self.name, format_labels(&labels));
    }
}

impl IdentitySink for Info {
    fn publish(&self, labels: &[(&str, &str)]) {
        match self.labels.write() {
            Ok(mut current) => {
                *current = labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
            }
            Err(e) => error!("Unable to update info metric {}: {}", self.name, e),
        }
    }
}

/// Gauge whose value is pulled from a function at scrape time.
/// An unbound gauge is left out of the exposition.
pub struct Gauge {
    name: String,
    help: String,
    function: RwLock<Option<GaugeFn>>,
}

impl Gauge {
    pub fn new(name: &str, help: &str) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            function: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_function(&self, function: GaugeFn) {
        match self.function.write() {
            Ok(mut current) => {
                debug!("Binding gauge {}", self.name);
                *current = Some(function);
            }
            Err(e) => error!("Unable to bind gauge {}: {}", self.name, e),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.function.read().map(|f| f.is_some()).unwrap_or(false)
    }

    pub fn value(&self) -> Option<f64> {
        let function = self.function.read().ok()?;
        let value = function.as_ref().map(|f| f());
        value
    }

    fn render(&self, out: &mut String) {
        if let Some(value) = self.value() {
            let _ = writeln!(out, "# HELP {} {}", self.name, self.help);
            let _ = writeln!(out, "# TYPE {} gauge", self.name);
            let _ = writeln!(out, "{} {}", self.name, format_value(value));
        }
    }
}

/// Everything the exporter publishes on its metrics endpoint.
pub struct MetricsRegistry {
    pub sensor_info: Arc<Info>,
    pub total_usage: Arc<Gauge>,
    pub actual_usage: Arc<Gauge>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            sensor_info: Arc::new(Info::new("sensor_address", "Sensor Address")),
            total_usage: Arc::new(Gauge::new("total_usage", "Total usage in kwh")),
            actual_usage: Arc::new(Gauge::new("actual_usage", "Actual usage in wh")),
        }
    }

    /// Prometheus text exposition of all metrics.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.sensor_info.render(&mut out);
        self.total_usage.render(&mut out);
        self.actual_usage.render(&mut out);
        out
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn format_labels(labels: &[(String, String)]) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let pairs: Vec<String> = labels.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();
    format!("{{{}}}", pairs.join(","))
}

fn escape_label_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "+Inf".to_string() } else { "-Inf".to_string() }
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}
