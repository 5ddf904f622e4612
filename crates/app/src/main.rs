//! Rental Marketplace Backend Application
//!
//! Main entry point for the car-rental marketplace service. Wires
//! configuration, the database pool and per-entity repositories, the
//! external collaborators (payment gateway, geocoder, notification
//! producer, identity verifier) and the business services into the HTTP
//! server.
//!
//! # Architecture
//!
//! - Repository layer for data access
//! - Service layer for business logic (reservation engine, catalog,
//!   payment ledger, reviews)
//! - Collaborator clients behind narrow traits
//! - API layer for HTTP endpoints with Prometheus metrics

use std::sync::Arc;

use anyhow::{Context, Result};
use app_config::AppConfig;
use gateway::{HttpGateway, PaymentGateway};
use geo::HttpGeocoder;
use identity::TokenVerifier;
use notifier::{KafkaNotifier, LogNotifier, Notifier};
use repository::{
    PgCarsRepository, PgPaymentsRepository, PgReservationsRepository, PgReviewsRepository,
    PgUsersRepository, ReservationsRepository,
};
use server::{AppState, Metrics, Server};
use service::{CarServiceImpl, PaymentServiceImpl, ReservationServiceImpl, ReviewServiceImpl};
use tokio_postgres::{Client, NoTls};
use tracing::{error, info, warn};

/// Opens a dedicated connection for one repository and drives it on a
/// background task.
async fn connect_client(dsn: &str, label: &str) -> Result<Client> {
    let (client, connection) = tokio_postgres::connect(dsn, NoTls)
        .await
        .with_context(|| format!("Failed to connect to database for {label} repository"))?;
    let label = label.to_string();
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("{} connection error: {}", label, e);
        }
    });
    Ok(client)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    info!("Rental marketplace backend starting...");

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize database pool and apply migrations
    let db_pool = match db::init_db_pool(&config).await {
        Ok(pool) => {
            info!("Database initialized successfully");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(anyhow::anyhow!("Failed to initialize database"));
        }
    };

    // One connection per repository; repositories are cheap to clone and
    // shared across the services that need them.
    let dsn = db::dsn(&config);
    let users_repo = PgUsersRepository::new(connect_client(&dsn, "users").await?);
    let cars_repo = PgCarsRepository::new(connect_client(&dsn, "cars").await?);
    let reservations_repo =
        PgReservationsRepository::new(connect_client(&dsn, "reservations").await?);
    let payments_repo = PgPaymentsRepository::new(connect_client(&dsn, "payments").await?);
    let reviews_repo = PgReviewsRepository::new(connect_client(&dsn, "reviews").await?);

    // A crash between the reservation and car writes of an older release
    // could leave a confirmed booking with an available car; re-derive
    // car statuses from confirmed reservations before serving traffic.
    match reservations_repo.reconcile_car_statuses().await {
        Ok(0) => info!("Car statuses consistent with reservations"),
        Ok(corrected) => warn!("Reconciled {} car status rows", corrected),
        Err(e) => error!("Car status reconciliation failed: {}", e),
    }

    // External collaborators
    let payment_gateway: Arc<dyn PaymentGateway> = Arc::new(HttpGateway::new(
        config.gateway_base_url.clone(),
        config.gateway_key_id.clone(),
        config.gateway_key_secret.clone(),
    ));

    let notification_producer: Arc<dyn Notifier> =
        match KafkaNotifier::new(&config.kafka_brokers, &config.kafka_topic) {
            Ok(producer) => Arc::new(producer),
            Err(err) => {
                error!("Failed to initialize Kafka notifier, falling back to logs: {err}");
                Arc::new(LogNotifier)
            }
        };

    let geocoder = HttpGeocoder::new(
        config.geocode_base_url.clone(),
        config.geocode_api_key.clone(),
        config.suggestion_cache_capacity,
        config.suggestion_cache_ttl,
    );

    let gateway_secret = config.gateway_key_secret.clone().into_bytes();

    // Business services
    let reservation_service = Arc::new(ReservationServiceImpl::new(
        db_pool.clone(),
        cars_repo.clone(),
        reservations_repo.clone(),
        users_repo.clone(),
        payments_repo.clone(),
        payment_gateway.clone(),
        notification_producer.clone(),
        gateway_secret.clone(),
    ));
    let car_service = Arc::new(CarServiceImpl::new(
        cars_repo.clone(),
        geocoder,
        config.search_radius_m,
    ));
    let payment_service = Arc::new(PaymentServiceImpl::new(
        cars_repo.clone(),
        reservations_repo.clone(),
        payments_repo.clone(),
        users_repo.clone(),
        payment_gateway.clone(),
        config.gateway_key_id.clone(),
        gateway_secret,
        config.currency.clone(),
    ));
    let review_service = Arc::new(ReviewServiceImpl::new(
        reviews_repo,
        cars_repo,
        users_repo,
        reservations_repo,
    ));

    let state = AppState {
        reservations: reservation_service,
        cars: car_service,
        payments: payment_service,
        reviews: review_service,
        verifier: TokenVerifier::new(config.identity_secret.clone().into_bytes()),
        metrics: Arc::new(Metrics::new()),
    };

    let http_server = Server::new(config.http_port.to_string(), state);
    http_server.start().await?;

    info!("Application stopped");
    Ok(())
}
