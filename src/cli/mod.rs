use crate::config::Config;
use clap::Parser;

/// Parameters for addressing power consumption sensors
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "sml_exporter", version, about)]
pub struct Arguments {
    /// Path of the sensor delivering decoded SML messages
    #[arg(short = 's', value_name = "SENSOR_ADDRESS")]
    pub sensor_address: Option<String>,

    /// Port for the prometheus server to fetch information
    #[arg(short = 'p', value_name = "PORT")]
    pub port: Option<u16>,

    /// Optional YAML config file
    #[arg(short = 'c', value_name = "CONFIG")]
    pub config: Option<String>,

    /// Seconds between checks whether the meter identified itself
    #[arg(short = 'i', value_name = "SECONDS")]
    pub interval: Option<u64>,
}

impl Arguments {
    /// Command line values take precedence over the config file.
    pub fn apply(&self, config: &mut Config) {
        if let Some(address) = &self.sensor_address {
            config.sensor.address = address.clone();
        }
        if let Some(port) = self.port {
            config.httpd.port = port;
        }
        if let Some(interval) = self.interval {
            config.polling.interval_secs = interval;
        }
    }
}

/// Sensor address and port from the given arguments (without program name).
pub fn parse_args<I, T>(args: I) -> Result<(String, u16), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let arguments = Arguments::try_parse_from(
        std::iter::once(std::ffi::OsString::from("sml_exporter")).chain(args.into_iter().map(Into::into)),
    )?;
    let mut config = Config::default();
    arguments.apply(&mut config);
    Ok((config.sensor.address, config.httpd.port))
}
