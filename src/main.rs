use clap::Parser;
use log::{error, info};
use sml_exporter::{
    cli::Arguments,
    metering_sml::{structs::SML_GET_LIST_RESPONSE, ExtractError},
    metrics::IdentitySink,
    ApiManager, Config, GaugeBinder, JsonLinesConnector, MetricsRegistry, RecordConnector, SmlMessageExtractor,
};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logging
    let default_filter = std::env::var("SML_EXPORTER_LOG_LEVEL").unwrap_or("info".to_string());
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(default_filter));

    let arguments = Arguments::parse();
    let mut config = match Config::load(arguments.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };
    arguments.apply(&mut config);

    let extractor = Arc::new(RwLock::new(SmlMessageExtractor::new()));
    let registry = Arc::new(MetricsRegistry::new());

    let mut threads: Vec<JoinHandle<()>> = Vec::new();

    /* Metrics endpoint first so scrapes work while we wait for the meter */
    let api = ApiManager::new(config.httpd.clone(), registry.clone(), extractor.clone());
    threads.push(tokio::spawn(async move {
        if let Err(e) = api.start_thread().await {
            error!("Metrics server failed: {}", e);
        }
    }));

    registry.sensor_info.publish(&[("address", config.sensor.address.as_str())]);

    let mut connector = JsonLinesConnector::new(&config.sensor.address);
    let handler_extractor = extractor.clone();
    let handler_registry = registry.clone();
    connector.on_record(SML_GET_LIST_RESPONSE, Box::new(move |record| {
        let mut e = handler_extractor.write().map_err(|_| ExtractError::LockPoisoned)?;
        e.ingest(record, handler_registry.sensor_info.as_ref())
    }));

    threads.push(tokio::spawn(async move {
        if let Err(e) = connector.connect().await {
            error!("Unable to connect to sensor: {}", e);
            return;
        }
        if let Err(e) = connector.run().await {
            error!("Sensor connection failed: {}", e);
        }
    }));

    let mut binder = GaugeBinder::new(extractor.clone(), registry.clone(), config.polling.interval());
    threads.push(tokio::spawn(async move {
        binder.start_thread().await;
    }));

    info!("All modules started, now waiting for a signal to exit");
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        if threads.iter().any(|task| task.is_finished()) {
            for task in threads.iter_mut() {
                task.abort();
            }
            break;
        }
    }

    Err(std::io::Error::other("A module stopped, shutting down"))
}
