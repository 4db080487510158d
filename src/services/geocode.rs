//! Reverse geocoding of capture coordinates.

use std::time::Duration;

use async_trait::async_trait;
use derive_more::Display;
use serde::Deserialize;

use crate::model::attendance::Coordinates;

#[derive(Debug, Display)]
pub enum GeocodeError {
    #[display(fmt = "geocoder request failed: {}", _0)]
    Request(reqwest::Error),
    #[display(fmt = "geocoder returned HTTP {}", _0)]
    Status(u16),
    #[display(fmt = "no address found")]
    NoAddress,
}

impl std::error::Error for GeocodeError {}

impl From<reqwest::Error> for GeocodeError {
    fn from(e: reqwest::Error) -> Self {
        GeocodeError::Request(e)
    }
}

#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse(&self, at: Coordinates) -> Result<String, GeocodeError>;
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    road: Option<String>,
    suburb: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimReverse {
    display_name: Option<String>,
    #[serde(default)]
    address: NominatimAddress,
}

impl NominatimReverse {
    /// `road, suburb, locality, postcode, country` with missing parts skipped,
    /// falling back to the service's own display name.
    fn into_address(self) -> Option<String> {
        let a = self.address;
        let locality = a.city.or(a.town).or(a.village);
        let parts: Vec<String> = [a.road, a.suburb, locality, a.postcode, a.country]
            .into_iter()
            .flatten()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        if !parts.is_empty() {
            return Some(parts.join(", "));
        }
        self.display_name.filter(|d| !d.trim().is_empty())
    }
}

/// Client for a Nominatim-compatible `/reverse` endpoint.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse(&self, at: Coordinates) -> Result<String, GeocodeError> {
        let resp = self
            .client
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", at.latitude.to_string()),
                ("lon", at.longitude.to_string()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body: NominatimReverse = resp.json().await?;
        body.into_address().ok_or(GeocodeError::NoAddress)
    }
}
