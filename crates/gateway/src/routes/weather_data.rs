use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use log::error;
use std::sync::Arc;

use crate::{AppState, WeatherReport};

#[utoipa::path(
    get,
    path = "/weather-data/{weatherSearch}",
    params(
        ("weatherSearch" = String, Path, description = "Place name or 5-digit US postal code"),
    ),
    responses(
        (status = OK, description = "Forecast and, when available, the resolved place", body = WeatherReport),
        (status = BAD_REQUEST, description = "Empty location query", content_type = "text/plain", body = String),
        (status = INTERNAL_SERVER_ERROR, description = "Location could not be resolved or a provider failed", content_type = "text/plain", body = String)
    ))]
pub async fn get_weather_data(
    State(state): State<Arc<AppState>>,
    Path(weather_search): Path<String>,
) -> Result<Json<WeatherReport>, (StatusCode, String)> {
    state
        .aggregator
        .get_weather(&weather_search)
        .await
        .map(Json)
        .map_err(|err| {
            error!("error getting weather for {:?}: {}", weather_search, err);
            (err.status_code(), err.to_string())
        })
}
