use crate::helpers::{body_string, spawn_app, MockUpstreamApis};
use axum::{body::Body, http::Request};
use gateway::{GeocodeRoute, PlaceDetails, UpstreamError};
use hyper::{Method, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;

fn forecast_body() -> Value {
    json!({
        "latitude": 34.25,
        "longitude": -118.5,
        "current": {"temperature_2m": 68.2, "weather_code": 1},
        "hourly": {"temperature_2m": [66.0, 67.1]},
        "daily": {"temperature_2m_max": [75.3]}
    })
}

fn get_weather(search: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(format!("/api/weather-data/{}", search))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn weather_lookup_returns_forecast_and_place() {
    let mut apis = MockUpstreamApis::new();
    apis.expect_geocode()
        .withf(|route| *route == GeocodeRoute::PostalCode("90210".to_string()))
        .times(1)
        .returning(|_| Ok(json!([{"lat": "34.25", "lon": "-118.5"}])));
    apis.expect_timezone()
        .times(1)
        .returning(|_| Ok(Some("America/Los_Angeles".to_string())));
    apis.expect_forecast()
        .withf(|_, timezone| timezone == "America/Los_Angeles")
        .times(1)
        .returning(|_, _| Ok(forecast_body()));
    apis.expect_reverse_geocode().times(1).returning(|_| {
        Ok(PlaceDetails {
            town: Some("Beverly Hills".to_string()),
            state: Some("California".to_string()),
            region_code: Some("US-CA".to_string()),
            postal_code: Some("90210".to_string()),
            ..Default::default()
        })
    });
    let test_app = spawn_app(Arc::new(apis)).await;

    let response = test_app.send(get_weather("90210")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["weatherData"], forecast_body());
    assert_eq!(body["locationData"]["town"], "Beverly Hills");
    assert_eq!(body["locationData"]["regionCode"], "US-CA");
    assert_eq!(body["locationData"]["postalCode"], "90210");
}

#[tokio::test]
async fn place_names_are_country_qualified() {
    let mut apis = MockUpstreamApis::new();
    apis.expect_geocode()
        .withf(|route| *route == GeocodeRoute::Place("Paris, US".to_string()))
        .times(1)
        .returning(|_| Ok(json!({"lat": 33.625, "lng": -95.5})));
    apis.expect_timezone().returning(|_| Ok(None));
    apis.expect_forecast()
        .withf(|coords, timezone| {
            coords.latitude == 33.625 && coords.longitude == -95.5 && timezone == "auto"
        })
        .times(1)
        .returning(|_, _| Ok(forecast_body()));
    apis.expect_reverse_geocode()
        .returning(|_| Ok(PlaceDetails::default()));
    let test_app = spawn_app(Arc::new(apis)).await;

    let response = test_app.send(get_weather("Paris")).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_reverse_geocode_leaves_out_location_data() {
    let mut apis = MockUpstreamApis::new();
    apis.expect_geocode()
        .returning(|_| Ok(json!([{"lat": 34.25, "lon": -118.5}])));
    apis.expect_timezone()
        .returning(|_| Ok(Some("America/Los_Angeles".to_string())));
    apis.expect_forecast()
        .returning(|_, _| Ok(forecast_body()));
    apis.expect_reverse_geocode().times(1).returning(|_| {
        Err(UpstreamError::Status {
            provider: "reverse geocoding provider",
            status: 502,
            body: String::from("bad gateway"),
        })
    });
    let test_app = spawn_app(Arc::new(apis)).await;

    let response = test_app.send(get_weather("90210")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["weatherData"], forecast_body());
    assert!(body.get("locationData").is_none());
}

#[tokio::test]
async fn unknown_location_is_a_server_error() {
    let mut apis = MockUpstreamApis::new();
    apis.expect_geocode().times(1).returning(|_| {
        Err(UpstreamError::Status {
            provider: "geocoding provider",
            status: 404,
            body: String::from("[]"),
        })
    });
    apis.expect_timezone().times(0);
    apis.expect_forecast().times(0);
    apis.expect_reverse_geocode().times(0);
    let test_app = spawn_app(Arc::new(apis)).await;

    let response = test_app.send(get_weather("Atlantis")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_string(response).await, "Location not found");
}

#[tokio::test]
async fn empty_candidate_list_is_a_server_error() {
    let mut apis = MockUpstreamApis::new();
    apis.expect_geocode().times(1).returning(|_| Ok(json!([])));
    apis.expect_forecast().times(0);
    let test_app = spawn_app(Arc::new(apis)).await;

    let response = test_app.send(get_weather("Nowhere")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn forecast_failure_is_reported() {
    let mut apis = MockUpstreamApis::new();
    apis.expect_geocode()
        .returning(|_| Ok(json!([{"lat": 34.25, "lon": -118.5}])));
    apis.expect_timezone().returning(|_| Ok(None));
    apis.expect_forecast().times(1).returning(|_, _| {
        Err(UpstreamError::Decode {
            provider: "forecast provider",
            reason: String::from("expected value"),
        })
    });
    apis.expect_reverse_geocode()
        .returning(|_| Ok(PlaceDetails::default()));
    let test_app = spawn_app(Arc::new(apis)).await;

    let response = test_app.send(get_weather("90210")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_string(response).await, "Failed to fetch weather data");
}

#[tokio::test]
async fn blank_search_is_a_bad_request() {
    let mut apis = MockUpstreamApis::new();
    apis.expect_geocode().times(0);
    let test_app = spawn_app(Arc::new(apis)).await;

    let response = test_app.send(get_weather("%20%20")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
