//! HTTP lookups behind the map adapter: address geocoding and the user's
//! position.

use std::time::Duration;

use serde::Deserialize;

use crate::config::{GeocoderConfig, PositionConfig, PositionProvider};
use crate::error::MapError;
use crate::geo::{Geo, LatLng};

/// Nominatim-compatible forward and reverse geocoder.
#[derive(Debug, Clone)]
pub struct Geocoder {
    config: GeocoderConfig,
    client: reqwest::blocking::Client,
}

impl Geocoder {
    pub fn new(config: GeocoderConfig) -> Result<Self, MapError> {
        let client = build_client(&config.user_agent, config.timeout_secs)?;
        Ok(Self { config, client })
    }

    pub fn lookup(&self, address: &str) -> Result<Geo, MapError> {
        let query = address.trim();
        if query.is_empty() {
            return Err(MapError::NoMatch(String::new()));
        }
        let url = format!(
            "{}/search?format=json&limit=1&q={}",
            self.config.endpoint.trim_end_matches('/'),
            urlencoding::encode(query)
        );
        tracing::debug!(%url, "geocoding address");
        let hits = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<Vec<SearchHit>>())?;
        let hit = hits
            .into_iter()
            .next()
            .ok_or_else(|| MapError::NoMatch(query.to_string()))?;
        hit.into_geo()
    }

    pub fn reverse(&self, point: LatLng) -> Result<Geo, MapError> {
        let url = format!(
            "{}/reverse?format=json&lat={:.6}&lon={:.6}",
            self.config.endpoint.trim_end_matches('/'),
            point.lat,
            point.lng
        );
        let hit = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<ReverseHit>())?;
        let address = hit
            .display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| point.to_string());
        Ok(Geo::new(point.lat, point.lng, address))
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    display_name: String,
}

impl SearchHit {
    fn into_geo(self) -> Result<Geo, MapError> {
        let lat = self
            .lat
            .parse::<f64>()
            .map_err(|_| MapError::InvalidCoordinates(self.lat.clone()))?;
        let lng = self
            .lon
            .parse::<f64>()
            .map_err(|_| MapError::InvalidCoordinates(self.lon.clone()))?;
        if !LatLng::new(lat, lng).is_valid() {
            return Err(MapError::InvalidCoordinates(format!("{lat}, {lng}")));
        }
        Ok(Geo::new(lat, lng, self.display_name))
    }
}

#[derive(Debug, Deserialize)]
struct ReverseHit {
    display_name: Option<String>,
}

/// Where the user's current position comes from.
#[derive(Debug, Clone)]
pub enum PositionSource {
    Fixed(LatLng),
    IpLookup {
        endpoint: String,
        client: reqwest::blocking::Client,
    },
}

impl PositionSource {
    pub fn from_config(config: &PositionConfig, user_agent: &str) -> Result<Self, MapError> {
        match config.provider {
            PositionProvider::Fixed => {
                let point = LatLng::new(config.latitude, config.longitude);
                if !point.is_valid() {
                    return Err(MapError::InvalidCoordinates(point.to_string()));
                }
                Ok(PositionSource::Fixed(point))
            }
            PositionProvider::IpLookup => Ok(PositionSource::IpLookup {
                endpoint: config.ip_endpoint.clone(),
                client: build_client(user_agent, config.timeout_secs)?,
            }),
        }
    }

    pub fn resolve(&self) -> Result<LatLng, MapError> {
        match self {
            PositionSource::Fixed(point) => Ok(*point),
            PositionSource::IpLookup { endpoint, client } => {
                let hit = client
                    .get(endpoint.as_str())
                    .send()
                    .and_then(|resp| resp.error_for_status())
                    .and_then(|resp| resp.json::<IpHit>())
                    .map_err(|err| MapError::PositionUnavailable(err.to_string()))?;
                let point = LatLng::new(hit.latitude, hit.longitude);
                if !point.is_valid() {
                    return Err(MapError::PositionUnavailable(format!(
                        "lookup returned {point}"
                    )));
                }
                Ok(point)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct IpHit {
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lon")]
    longitude: f64,
}

fn build_client(user_agent: &str, timeout_secs: u64) -> Result<reqwest::blocking::Client, MapError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .user_agent(user_agent.to_string())
        .build()
        .map_err(|err| MapError::InitFailed(err.to_string()))
}
