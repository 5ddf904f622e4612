//! Server crate provides HTTP server functionality.
//!
//! This module implements the HTTP server for the rental marketplace:
//! reservation lifecycle routes, the car catalog, the payment ledger,
//! reviews, plus health and Prometheus metrics endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use identity::TokenVerifier;
use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use service::{CarService, PaymentService, ReservationService, ReviewService};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

pub mod error;
pub mod extract;
pub mod handlers;

pub use error::ApiError;

/// Shared state available to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub reservations: Arc<dyn ReservationService>,
    pub cars: Arc<dyn CarService>,
    pub payments: Arc<dyn PaymentService>,
    pub reviews: Arc<dyn ReviewService>,
    pub verifier: TokenVerifier,
    pub metrics: Arc<Metrics>,
}

/// Server represents the HTTP server for the marketplace API.
pub struct Server {
    state: AppState,
    port: String,
}

/// Metrics collects and exposes HTTP server metrics.
pub struct Metrics {
    pub registry: Registry,
    http_requests_total: CounterVec,
    http_request_duration_seconds: HistogramVec,
    errors_total: CounterVec,
    network_traffic_bytes: CounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "endpoint", "status"],
        )
        .expect("Failed to create http_requests_total metric");

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            ),
            &["method", "endpoint"],
        )
        .expect("Failed to create http_request_duration_seconds metric");

        let errors_total = CounterVec::new(
            Opts::new("errors_total", "Total number of errors"),
            &["source", "endpoint"],
        )
        .expect("Failed to create errors_total metric");

        let network_traffic_bytes = CounterVec::new(
            Opts::new("network_traffic_bytes", "Network traffic in bytes"),
            &["direction"],
        )
        .expect("Failed to create network_traffic_bytes metric");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("Failed to register http_requests_total metric");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("Failed to register http_request_duration_seconds metric");
        registry
            .register(Box::new(errors_total.clone()))
            .expect("Failed to register errors_total metric");
        registry
            .register(Box::new(network_traffic_bytes.clone()))
            .expect("Failed to register network_traffic_bytes metric");

        Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            errors_total,
            network_traffic_bytes,
        }
    }

    fn record_request(&self, method: &str, endpoint: &str, status: u16, duration: Duration) {
        self.http_requests_total
            .with_label_values(&[method, endpoint, &status.to_string()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration.as_secs_f64());
    }

    fn record_error(&self, source: &str, endpoint: &str) {
        self.errors_total
            .with_label_values(&[source, endpoint])
            .inc();
    }

    fn record_network_traffic(&self, direction: &str, bytes: usize) {
        self.network_traffic_bytes
            .with_label_values(&[direction])
            .inc_by(bytes as f64);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    /// Creates a new Server instance listening on `port` with the given
    /// application state.
    pub fn new(port: String, state: AppState) -> Self {
        info!("Initializing HTTP server on port {}", port);
        Self { state, port }
    }

    /// Starts the server and blocks until it's shut down.
    pub async fn start(&self) -> Result<()> {
        let app = self.create_router();

        let listener = TcpListener::bind(format!("0.0.0.0:{}", self.port))
            .await
            .context("Failed to bind to port")?;

        info!("HTTP server listening on port {}", self.port);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;

        info!("HTTP server shut down gracefully");
        Ok(())
    }

    fn create_router(&self) -> Router {
        let metrics = self.state.metrics.clone();

        Router::new()
            // Reservations
            .route("/reservation", post(handlers::reservations::create))
            .route("/reservation/{id}", get(handlers::reservations::get_by_id))
            .route("/reservations", get(handlers::reservations::list_mine))
            .route(
                "/reservations/car/{id}",
                get(handlers::reservations::list_for_car),
            )
            .route(
                "/admin/reservations",
                get(handlers::reservations::admin_list),
            )
            .route("/admin/bookings", get(handlers::reservations::admin_bookings))
            .route(
                "/reservation/update/{id}",
                put(handlers::reservations::update),
            )
            .route(
                "/reservation/cancel/{id}",
                put(handlers::reservations::cancel),
            )
            .route(
                "/reservation/purge/{id}",
                delete(handlers::reservations::purge),
            )
            .route(
                "/reservation/{id}/confirm",
                put(handlers::reservations::confirm),
            )
            // Cars
            .route("/car", post(handlers::cars::create))
            .route("/cars", get(handlers::cars::list_owner))
            .route("/api/cars", get(handlers::cars::list_available))
            .route(
                "/car/{id}",
                get(handlers::cars::get_by_id)
                    .put(handlers::cars::update)
                    .delete(handlers::cars::delete),
            )
            .route("/admin/car/{id}/approve", put(handlers::cars::approve))
            .route("/admin/cars", get(handlers::cars::admin_list))
            .route("/car/return/{id}", put(handlers::cars::car_return))
            .route(
                "/address-suggestions",
                get(handlers::cars::address_suggestions),
            )
            // Payments
            .route("/payment", post(handlers::payments::create))
            .route("/payment/verify", post(handlers::payments::verify))
            .route("/payments/car/{id}", get(handlers::payments::list_for_car))
            .route("/payments/admin", get(handlers::payments::admin_list))
            .route(
                "/payments/customer",
                get(handlers::payments::list_for_customer),
            )
            // Reviews
            .route("/review", post(handlers::reviews::create))
            .route("/review/{id}", delete(handlers::reviews::delete))
            .route("/reviews", get(handlers::reviews::list_for_target))
            .route("/my/reviews", get(handlers::reviews::own_reviews))
            .route("/admin/reviews", get(handlers::reviews::admin_list))
            .route("/reviews/car/{id}", get(handlers::reviews::car_reviews))
            // Operational
            .route("/health", get(handlers::health))
            .route("/metrics", get(handlers::metrics))
            .layer(axum::middleware::from_fn_with_state(
                metrics,
                metrics_middleware,
            ))
            .with_state(self.state.clone())
    }
}

/// Middleware for collecting metrics on HTTP requests.
async fn metrics_middleware(
    axum::extract::State(metrics): axum::extract::State<Arc<Metrics>>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let content_length = req
        .headers()
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    if content_length > 0 {
        metrics.record_network_traffic("in", content_length);
    }

    let start = std::time::Instant::now();
    let response = next.run(req).await;
    let duration = start.elapsed();

    let status = response.status().as_u16();
    metrics.record_request(&method, &path, status, duration);
    if status >= 400 {
        metrics.record_error("http", &path);
    }

    let response_size = response
        .headers()
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    if response_size > 0 {
        metrics.record_network_traffic("out", response_size);
    }

    response
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
