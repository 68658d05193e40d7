//! reqmetrics demo server
//!
//! - `GET /v1/users`     : instrumented with a histogram-enabled instrument
//! - `GET /v1/users/:id` : same instrument, 404 for unknown ids
//! - `GET /healthz`      : instrumented with the default instrument
//! - a background task gathers the default registry periodically and logs it,
//!   standing in for an external scrape
//!
//! The default instrument owns the `http` namespace. A `reqmetrics.yaml` must
//! therefore set its own `namespace`; one that omits it falls back to `http`,
//! collides with the default instrument, and aborts startup.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum::{extract, http::StatusCode, routing::get, Json, Router};
use tracing_subscriber::{fmt, EnvFilter};

use reqmetrics_axum::config::{self, HistogramSection, InstrumentConfig};
use reqmetrics_axum::{init_default, wrap_with_default, Instrument};
use reqmetrics_core::default_registry;

const CONFIG_PATH: &str = "reqmetrics.yaml";
const LISTEN: &str = "0.0.0.0:8080";
const SCRAPE_INTERVAL: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    // Default instrument first, so a colliding config namespace fails here.
    init_default().expect("default instrument registration failed");

    let cfg = if Path::new(CONFIG_PATH).exists() {
        config::load_from_file(CONFIG_PATH).expect("config load failed")
    } else {
        InstrumentConfig {
            namespace: "demo".into(),
            api_group: "/v1".into(),
            histogram: Some(HistogramSection::default()),
            ..InstrumentConfig::default()
        }
    };
    let metrics = Instrument::from_config(&cfg, default_registry())
        .expect("instrument setup failed (config namespace must not be `http`)");

    let app = Router::new()
        .route("/v1/users", get(metrics.wrap("/users", list_users)))
        .route("/v1/users/:id", get(metrics.wrap("/users/:id", get_user)))
        .route("/healthz", get(wrap_with_default("/healthz", healthz)));

    tokio::spawn(scrape_loop());

    let listen: SocketAddr = LISTEN.parse().expect("listen must be a valid SocketAddr");
    tracing::info!(%listen, "reqmetrics-demo starting");
    let listener = tokio::net::TcpListener::bind(listen).await.expect("failed to bind");

    axum::serve(listener, app).await.expect("server failed");
}

async fn list_users() -> Json<Vec<&'static str>> {
    Json(vec!["ada", "grace"])
}

async fn get_user(
    extract::Path(id): extract::Path<u32>,
) -> Result<Json<&'static str>, StatusCode> {
    match id {
        1 => Ok(Json("ada")),
        2 => Ok(Json("grace")),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn scrape_loop() {
    let mut tick = tokio::time::interval(SCRAPE_INTERVAL);
    loop {
        tick.tick().await;
        match default_registry().gather() {
            Ok(samples) => {
                tracing::info!(series = samples.len(), "scrape");
                if let Ok(body) = serde_json::to_string(&samples) {
                    tracing::debug!(%body, "scrape body");
                }
            }
            Err(e) => tracing::warn!(error = %e, "scrape failed"),
        }
    }
}
