use crate::core::ranker::GeocodeResolver;
use crate::models::Coordinates;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Errors from the geocoding service
///
/// "Address not found" is not in here on purpose: it is an ordinary
/// outcome and comes back as `Ok(None)` from [`GeocodeClient::lookup`].
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Successful geocode lookup body: `{ lat, lng, roadAddress, jibunAddress }`
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeHit {
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "roadAddress", default)]
    pub road_address: Option<String>,
    #[serde(rename = "jibunAddress", default)]
    pub jibun_address: Option<String>,
}

/// Client for the address-to-coordinates geocoding service
pub struct GeocodeClient {
    endpoint: String,
    client_id: String,
    client_secret: String,
    client: Client,
}

impl GeocodeClient {
    pub fn new(endpoint: String, client_id: String, client_secret: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint,
            client_id,
            client_secret,
            client,
        }
    }

    /// Resolve an address; `Ok(None)` means the service knows no match
    pub async fn lookup(&self, address: &str) -> Result<Option<Coordinates>, GeocodeError> {
        let url = format!(
            "{}?address={}",
            self.endpoint.trim_end_matches('/'),
            urlencoding::encode(address)
        );

        tracing::debug!("Geocoding: {}", address);

        let response = self
            .client
            .get(&url)
            .header("X-NCP-APIGW-API-KEY-ID", &self.client_id)
            .header("X-NCP-APIGW-API-KEY", &self.client_secret)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(GeocodeError::ApiError(format!(
                "Geocoding failed: {}",
                response.status()
            )));
        }

        let hit: GeocodeHit = response
            .json()
            .await
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        Ok(Some(Coordinates::new(hit.lat, hit.lng)))
    }
}

impl GeocodeResolver for GeocodeClient {
    type Error = GeocodeError;

    async fn resolve(&self, address: &str) -> Result<Option<Coordinates>, GeocodeError> {
        self.lookup(address).await
    }
}
