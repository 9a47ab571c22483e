use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    extract_coordinates, Coordinates, GatewayError, GeocodeRoute, PlaceDetails, UpstreamError,
    WeatherApis,
};

/// Timezone handed to the forecast provider when none could be resolved.
pub const AUTO_TIMEZONE: &str = "auto";

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    /// Forecast payload exactly as returned by the forecast provider
    #[schema(value_type = Object)]
    pub weather_data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_data: Option<PlaceDetails>,
}

/// Resolves a free-text location and composes the provider answers into one report.
#[derive(Clone)]
pub struct WeatherAggregator {
    apis: Arc<dyn WeatherApis>,
}

impl WeatherAggregator {
    pub fn new(apis: Arc<dyn WeatherApis>) -> Self {
        Self { apis }
    }

    pub async fn get_weather(&self, location_query: &str) -> Result<WeatherReport, GatewayError> {
        if location_query.trim().is_empty() {
            return Err(GatewayError::InvalidInput(
                "Location query is required".to_string(),
            ));
        }

        let route = GeocodeRoute::classify(location_query);
        let coordinates = self.locate(&route).await?;
        info!("resolved {} to {}", route, coordinates);

        // Reverse geocoding only needs the coordinates, so it runs alongside the
        // timezone -> forecast chain.
        let (weather_data, location_data) = tokio::join!(
            self.forecast_for(coordinates),
            self.place_for(coordinates)
        );

        Ok(WeatherReport {
            weather_data: weather_data?,
            location_data,
        })
    }

    async fn locate(&self, route: &GeocodeRoute) -> Result<Coordinates, GatewayError> {
        let body = self.apis.geocode(route).await.map_err(|err| {
            warn!("geocoding {} failed: {}", route, err);
            match err {
                UpstreamError::Status { .. } => {
                    GatewayError::LocationNotFound("Location not found".to_string())
                }
                other => GatewayError::UpstreamFailure(format!(
                    "Failed to look up location: {}",
                    other
                )),
            }
        })?;

        extract_coordinates(&body).ok_or_else(|| {
            warn!("geocoding {} returned no usable coordinates", route);
            GatewayError::LocationNotFound("Could not resolve coordinates for location".to_string())
        })
    }

    /// Never fails: a missing or broken timezone lookup degrades to [`AUTO_TIMEZONE`]
    /// and the forecast is still requested.
    async fn resolve_timezone(&self, coordinates: Coordinates) -> String {
        match self.apis.timezone(coordinates).await {
            Ok(Some(timezone_id)) if !timezone_id.trim().is_empty() => timezone_id,
            Ok(_) => {
                debug!("no timezone known for {}, using {}", coordinates, AUTO_TIMEZONE);
                AUTO_TIMEZONE.to_string()
            }
            Err(err) => {
                warn!(
                    "timezone lookup for {} failed, using {}: {}",
                    coordinates, AUTO_TIMEZONE, err
                );
                AUTO_TIMEZONE.to_string()
            }
        }
    }

    async fn forecast_for(&self, coordinates: Coordinates) -> Result<Value, GatewayError> {
        let timezone = self.resolve_timezone(coordinates).await;
        self.apis
            .forecast(coordinates, &timezone)
            .await
            .map_err(|err| {
                error!("forecast for {} failed: {}", coordinates, err);
                GatewayError::UpstreamFailure("Failed to fetch weather data".to_string())
            })
    }

    /// The error is dropped here on purpose: a report without a place name is
    /// still a complete answer.
    async fn place_for(&self, coordinates: Coordinates) -> Option<PlaceDetails> {
        match self.apis.reverse_geocode(coordinates).await {
            Ok(place) => Some(place),
            Err(err) => {
                warn!("reverse geocoding {} failed: {}", coordinates, err);
                None
            }
        }
    }
}
