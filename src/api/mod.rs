use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use log::{error, info};
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::config::HttpdConfig;
use crate::metering_sml::SmlMessageExtractor;
use crate::metrics::MetricsRegistry;

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// State shared with the request handlers.
#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<MetricsRegistry>,
    pub extractor: Arc<RwLock<SmlMessageExtractor>>,
    pub start_time: Instant,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub initialized: bool,
    pub vendor: String,
    pub device: String,
    pub uptime_seconds: u64,
}

pub struct ApiManager {
    config: HttpdConfig,
    state: ApiState,
}

async fn metrics(state: web::Data<ApiState>) -> impl Responder {
    HttpResponse::Ok()
        .content_type(EXPOSITION_CONTENT_TYPE)
        .body(state.registry.render())
}

async fn health_check(state: web::Data<ApiState>) -> impl Responder {
    let (initialized, vendor, device) = match state.extractor.read() {
        Ok(e) => (e.is_initialized(), e.vendor().to_string(), e.device().to_string()),
        Err(e) => {
            error!("Extractor lock poisoned: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };

    let response = HealthResponse {
        status: if initialized { "healthy".to_string() } else { "waiting for meter".to_string() },
        initialized,
        vendor,
        device,
        uptime_seconds: state.start_time.elapsed().as_secs(),
    };

    if initialized {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(metrics))
        .route("/health", web::get().to(health_check));
}

impl ApiManager {
    pub fn new(config: HttpdConfig, registry: Arc<MetricsRegistry>, extractor: Arc<RwLock<SmlMessageExtractor>>) -> Self {
        Self {
            config,
            state: ApiState {
                registry,
                extractor,
                start_time: Instant::now(),
            },
        }
    }

    pub async fn start_thread(&self) -> std::io::Result<()> {
        info!("Starting metrics server on {}:{}", self.config.bind, self.config.port);
        let state = web::Data::new(self.state.clone());
        let server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .configure(configure)
        })
        .bind((self.config.bind.as_str(), self.config.port))?
        .run();
        server.await
    }
}
