use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// `AppConfig` holds all configuration parameters required by the rental
/// backend.
///
/// The configuration is loaded from environment variables (optionally via a
/// `.env` file) or uses default values if a variable is not set. Fields
/// cover the database, HTTP server, notification topic, payment gateway,
/// identity and geocoding collaborators. This struct is deserializable via
/// Serde.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    // --- Database settings ---
    /// Database hostname or service name (e.g. "postgres" in Docker Compose,
    /// "localhost" for local runs).
    pub db_host: String,
    /// Database port (default: 5432).
    pub db_port: u16,
    /// Database user.
    pub db_user: String,
    /// Database password.
    pub db_password: String,
    /// Database name.
    pub db_name: String,

    // --- HTTP server ---
    /// The port on which the HTTP server will listen.
    pub http_port: u16,

    // --- Shutdown timeout ---
    /// Graceful shutdown timeout (human-friendly format, e.g. "5s", "1m").
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub shutdown_timeout: Duration,

    // --- Notification dispatch ---
    /// List of Kafka brokers (comma-separated string in env, parsed to Vec<String>).
    pub kafka_brokers: Vec<String>,
    /// Kafka topic notification events are published to. Delivery (email,
    /// SMS, push) happens downstream of this topic and outside this service.
    pub kafka_topic: String,

    // --- Payment gateway ---
    /// Publishable gateway key id, returned to clients at checkout.
    pub gateway_key_id: String,
    /// Shared gateway secret used for order-signature HMAC validation.
    pub gateway_key_secret: String,
    /// Base URL of the gateway REST API.
    pub gateway_base_url: String,
    /// ISO currency code charged through the gateway.
    pub currency: String,

    // --- Identity ---
    /// Shared secret for bearer-token signature validation.
    pub identity_secret: String,

    // --- Geocoding ---
    /// Base URL of the geocoding/autocomplete API.
    pub geocode_base_url: String,
    /// API key passed through to the geocoding provider.
    pub geocode_api_key: String,
    /// Maximum number of cached address-suggestion entries.
    pub suggestion_cache_capacity: usize,
    /// Time-to-live for cached address suggestions.
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub suggestion_cache_ttl: Duration,

    // --- Catalog search ---
    /// Radius in meters for the proximity car search.
    pub search_radius_m: f64,
}

/// Custom deserializer for durations.
/// Accepts human-readable formats like "5s", "1m", etc.
fn deserialize_duration_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let val = String::deserialize(deserializer)?;
    humantime::parse_duration(&val)
        .map_err(|e| D::Error::custom(format!("Invalid duration '{val}': {e}")))
}

impl AppConfig {
    /// Loads configuration from environment variables (and optionally from
    /// a `.env` file).
    ///
    /// Fields not set via env will be filled with default values.
    ///
    /// # Errors
    /// Returns an error if environment variables are invalid or missing
    /// required values.
    pub fn load() -> Result<Self> {
        // Load from .env file (for Docker environment)
        dotenvy::dotenv().ok();

        // Note: These default values are for local development. Production
        // deployments must override the secrets via environment variables.
        let settings = config::Config::builder()
            // Database
            .set_default("db_host", "localhost")?
            .set_default("db_port", 5432)?
            .set_default("db_user", "rental_user")?
            .set_default("db_password", "securepassword")?
            .set_default("db_name", "rental_db")?
            // HTTP
            .set_default("http_port", 3020)?
            // Shutdown
            .set_default("shutdown_timeout", "5s")?
            // Notifications
            .set_default("kafka_brokers", vec!["localhost:9092"])?
            .set_default("kafka_topic", "notifications")?
            // Payment gateway
            .set_default("gateway_key_id", "rzp_test_key")?
            .set_default("gateway_key_secret", "rzp_test_secret")?
            .set_default("gateway_base_url", "https://api.razorpay.com/v1")?
            .set_default("currency", "INR")?
            // Identity
            .set_default("identity_secret", "dev-identity-secret")?
            // Geocoding
            .set_default("geocode_base_url", "https://maps.googleapis.com/maps/api")?
            .set_default("geocode_api_key", "dev-geocode-key")?
            .set_default("suggestion_cache_capacity", 256)?
            .set_default("suggestion_cache_ttl", "10m")?
            // Catalog search
            .set_default("search_radius_m", 5000.0)?
            .add_source(
                config::Environment::default()
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("kafka_brokers"),
            )
            .build()?;

        settings
            .try_deserialize()
            .context("Failed to load configuration")
    }
}
