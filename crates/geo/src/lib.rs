//! Geocoding collaborator: address → coordinates, partial address →
//! suggestions, plus the great-circle distance used by the proximity car
//! search.
//!
//! Suggestions are memoized in a bounded TTL cache so a burst of
//! autocomplete keystrokes does not hammer the external API.

use std::time::Duration;

use async_trait::async_trait;
use cache::TtlCache;
use serde_json::Value;
use thiserror::Error;

/// Geographic point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Error)]
pub enum GeoError {
    /// The geocoding provider could not be reached.
    #[error("geocoding service unreachable: {0}")]
    Unavailable(String),
    /// The provider answered with a body this client cannot interpret.
    #[error("unexpected geocoding response: {0}")]
    BadResponse(String),
}

/// Narrow contract towards the geocoding provider.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a free-form address; `None` means the provider found no
    /// match (an invalid address, not an error).
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, GeoError>;

    /// Autocomplete suggestions for a partial address.
    async fn suggest(&self, input: &str) -> Result<Vec<String>, GeoError>;
}

/// Great-circle distance in meters between two points (haversine).
pub fn distance_meters(a: Coordinates, b: Coordinates) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;

    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// HTTP implementation of [`Geocoder`] against a Google-Maps-style API.
pub struct HttpGeocoder {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    suggestion_cache: TtlCache<String, Vec<String>>,
}

impl HttpGeocoder {
    pub fn new(base_url: String, api_key: String, cache_capacity: usize, cache_ttl: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            suggestion_cache: TtlCache::new(cache_capacity, cache_ttl),
        }
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, GeoError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| GeoError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeoError::BadResponse(format!(
                "provider returned {}",
                response.status()
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| GeoError::BadResponse(e.to_string()))
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, GeoError> {
        let url = format!("{}/geocode/json", self.base_url);
        let body = self
            .get_json(&url, &[("address", address), ("key", &self.api_key)])
            .await?;
        parse_geocode(&body)
    }

    async fn suggest(&self, input: &str) -> Result<Vec<String>, GeoError> {
        let key = input.trim().to_lowercase();
        if let Some(cached) = self.suggestion_cache.get(&key).await {
            return Ok(cached);
        }

        let url = format!("{}/place/autocomplete/json", self.base_url);
        let body = self
            .get_json(&url, &[("input", input), ("key", &self.api_key)])
            .await?;
        let suggestions = parse_suggestions(&body)?;

        self.suggestion_cache.insert(key, suggestions.clone()).await;
        Ok(suggestions)
    }
}

/// Extract coordinates from a geocoding response body. A provider status
/// of `ZERO_RESULTS` reads as "no match" rather than an error.
pub fn parse_geocode(body: &Value) -> Result<Option<Coordinates>, GeoError> {
    match body["status"].as_str() {
        Some("OK") => {}
        Some("ZERO_RESULTS") => return Ok(None),
        other => {
            return Err(GeoError::BadResponse(format!(
                "geocode status {:?}",
                other.unwrap_or("missing")
            )));
        }
    }

    let location = &body["results"][0]["geometry"]["location"];
    match (location["lat"].as_f64(), location["lng"].as_f64()) {
        (Some(latitude), Some(longitude)) => Ok(Some(Coordinates { latitude, longitude })),
        _ => Ok(None),
    }
}

/// Extract suggestion descriptions from an autocomplete response body.
pub fn parse_suggestions(body: &Value) -> Result<Vec<String>, GeoError> {
    match body["status"].as_str() {
        Some("OK") => {}
        Some("ZERO_RESULTS") => return Ok(Vec::new()),
        other => {
            return Err(GeoError::BadResponse(format!(
                "autocomplete status {:?}",
                other.unwrap_or("missing")
            )));
        }
    }

    let predictions = body["predictions"]
        .as_array()
        .ok_or_else(|| GeoError::BadResponse("predictions missing".into()))?;

    Ok(predictions
        .iter()
        .filter_map(|p| p["description"].as_str().map(str::to_owned))
        .collect())
}
