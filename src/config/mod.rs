use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_yml;
use std::fs::File;
use std::io::prelude::*;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read the config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unable to parse the config file: {0}")]
    Parse(#[from] serde_yml::Error),
}

fn sensor_address_default() -> String { return "/dev/tty0".to_string() }

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct SensorConfig {
    #[serde(default="sensor_address_default")]
    pub address: String,
}

fn httpd_bind_default() -> String { return "0.0.0.0".to_string() }
fn httpd_port_default() -> u16 { return 8010 }

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct HttpdConfig {
    #[serde(default="httpd_bind_default")]
    pub bind: String,
    #[serde(default="httpd_port_default")]
    pub port: u16,
}

fn polling_interval_default() -> u64 { return 10 }

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct PollingConfig {
    #[serde(default="polling_interval_default")]
    pub interval_secs: u64,
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

fn sensor_default() -> SensorConfig { return SensorConfig { address: sensor_address_default() }}
fn httpd_default() -> HttpdConfig { return HttpdConfig { bind: httpd_bind_default(), port: httpd_port_default() }}
fn polling_default() -> PollingConfig { return PollingConfig { interval_secs: polling_interval_default() }}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Config {
    #[serde(default="sensor_default")]
    pub sensor: SensorConfig,
    #[serde(default="httpd_default")]
    pub httpd: HttpdConfig,
    #[serde(default="polling_default")]
    pub polling: PollingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sensor: sensor_default(),
            httpd: httpd_default(),
            polling: polling_default(),
        }
    }
}

impl Config {
    /// Loads the YAML config, or the defaults when no file is given.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            debug!("No config file given, using defaults");
            return Ok(Config::default());
        };

        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let c = Self::from_yaml(&contents)?;
        info!("Loaded config from {}", path);
        Ok(c)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.sensor.address, "/dev/tty0");
        assert_eq!(c.httpd.port, 8010);
        assert_eq!(c.httpd.bind, "0.0.0.0");
        assert_eq!(c.polling.interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let c = Config::from_yaml("httpd:\n  port: 9000\n").unwrap();
        assert_eq!(c.httpd.port, 9000);
        assert_eq!(c.httpd.bind, "0.0.0.0");
        assert_eq!(c.sensor.address, "/dev/tty0");
        assert_eq!(c.polling.interval_secs, 10);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "sensor:\n  address: /dev/ttyUSB0\npolling:\n  interval_secs: 0").unwrap();

        let c = Config::load(file.path().to_str()).unwrap();
        assert_eq!(c.sensor.address, "/dev/ttyUSB0");
        assert_eq!(c.polling.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(Config::load(Some("/nonexistent/sml.yaml")), Err(ConfigError::Io(_))));
        assert!(matches!(Config::from_yaml("httpd: [1, 2"), Err(ConfigError::Parse(_))));
    }
}
