//! Address lookup against a Nominatim-compatible endpoint. Calls are
//! sequential and blocking; a minimum inter-call delay is enforced so peer
//! lookups never overload the service.

use std::thread;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::Deserialize;

use crate::error::DashError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

pub trait Geocoder {
    /// Ok(None) means the address could not be resolved.
    fn lookup(&self, address: &str) -> Result<Option<Coordinates>, DashError>;
}

/// Geocoder that resolves nothing. Used when lookups are disabled.
pub struct NullGeocoder;

impl Geocoder for NullGeocoder {
    fn lookup(&self, _address: &str) -> Result<Option<Coordinates>, DashError> {
        Ok(None)
    }
}

const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
const AGENT: &str = concat!("canna-dashkit/", env!("CARGO_PKG_VERSION"));
// Nominatim's usage policy caps at one request per second.
const MIN_CALL_INTERVAL: Duration = Duration::from_millis(1100);

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

pub struct NominatimGeocoder {
    client: reqwest::blocking::Client,
    limiter: DefaultDirectRateLimiter,
    endpoint: String,
}

impl NominatimGeocoder {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: &str) -> Self {
        let quota = Quota::with_period(MIN_CALL_INTERVAL)
            .expect("rate-limit interval must be non-zero");
        Self {
            client: reqwest::blocking::Client::new(),
            limiter: RateLimiter::direct(quota),
            endpoint: endpoint.to_string(),
        }
    }

    fn wait_for_slot(&self) {
        while self.limiter.check().is_err() {
            thread::sleep(Duration::from_millis(50));
        }
    }
}

impl Default for NominatimGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Geocoder for NominatimGeocoder {
    fn lookup(&self, address: &str) -> Result<Option<Coordinates>, DashError> {
        self.wait_for_slot();
        tracing::debug!(%address, "geocoding");

        let url = format!(
            "{}?q={}&format=json&limit=1",
            self.endpoint,
            urlencoding::encode(address)
        );
        let hits: Vec<SearchHit> = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, AGENT)
            .send()?
            .error_for_status()?
            .json()?;

        let Some(hit) = hits.into_iter().next() else {
            return Ok(None);
        };
        let latitude = hit
            .lat
            .parse()
            .map_err(|_| DashError::InvalidData(format!("Bad latitude: {}", hit.lat)))?;
        let longitude = hit
            .lon
            .parse()
            .map_err(|_| DashError::InvalidData(format!("Bad longitude: {}", hit.lon)))?;
        Ok(Some(Coordinates {
            latitude,
            longitude,
        }))
    }
}
