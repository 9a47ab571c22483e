mod http;

pub use http::HttpWeatherApis;

use async_trait::async_trait;
use serde_json::Value;

use crate::{Coordinates, GeocodeRoute, PlaceDetails};

#[derive(thiserror::Error, Debug)]
pub enum UpstreamError {
    #[error("Failed to reach {provider}: {source}")]
    Request {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} responded with status {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("Failed to decode {provider} response: {reason}")]
    Decode {
        provider: &'static str,
        reason: String,
    },
}

/// The third-party services a weather lookup is composed from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WeatherApis: Send + Sync {
    /// Raw geocoding response; see [`crate::extract_coordinates`] for the accepted shapes.
    async fn geocode(&self, route: &GeocodeRoute) -> Result<Value, UpstreamError>;
    /// `Ok(None)` when the provider answered but had no identifier for the point.
    async fn timezone(&self, coordinates: Coordinates) -> Result<Option<String>, UpstreamError>;
    async fn forecast(
        &self,
        coordinates: Coordinates,
        timezone: &str,
    ) -> Result<Value, UpstreamError>;
    async fn reverse_geocode(&self, coordinates: Coordinates)
        -> Result<PlaceDetails, UpstreamError>;
}
