//! Prometheus metrics for blut-api.
//!
//! Collectors register with the default registry; `serve_metrics` renders it
//! (pool gauges from `db-pool` included).

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

pub mod feed;

lazy_static! {
    /// HTTP requests by method, matched route and status.
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blut_http_requests_total",
        "Total HTTP requests",
        &["method", "route", "status"]
    )
    .expect("failed to register blut_http_requests_total");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "blut_http_request_duration_seconds",
        "HTTP request latency",
        &["method", "route"]
    )
    .expect("failed to register blut_http_request_duration_seconds");

    /// Open WebSocket sessions.
    pub static ref WS_CONNECTIONS: IntGauge = register_int_gauge!(
        "blut_ws_connections",
        "Currently open WebSocket sessions"
    )
    .expect("failed to register blut_ws_connections");
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
