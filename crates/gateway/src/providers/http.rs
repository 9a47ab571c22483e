use async_trait::async_trait;
use log::{debug, trace};
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use super::{UpstreamError, WeatherApis};
use crate::{
    Coordinates, GeocodeRoute, PlaceDetails, ProviderSettings, ReverseGeocodeResponse,
    POSTAL_CODE_COUNTRY,
};

const GEOCODER: &str = "geocoding provider";
const REVERSE_GEOCODER: &str = "reverse geocoding provider";
const TIMEZONE: &str = "timezone provider";
const FORECAST: &str = "forecast provider";

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,weather_code,surface_pressure,wind_speed_10m,wind_direction_10m";
const HOURLY_FIELDS: &str =
    "temperature_2m,apparent_temperature,precipitation_probability,weather_code,wind_speed_10m";
const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min,sunrise,sunset,uv_index_max,precipitation_probability_max";
const FORECAST_HOURS: &str = "24";

#[derive(Debug, Deserialize)]
struct TimezoneResponse {
    #[serde(rename = "timezoneId")]
    timezone_id: Option<String>,
}

/// [`WeatherApis`] backed by the real providers over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpWeatherApis {
    http: Client,
    settings: ProviderSettings,
}

impl HttpWeatherApis {
    pub fn new(settings: ProviderSettings) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(concat!("weather-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, settings })
    }

    fn geocode_url(&self, route: &GeocodeRoute) -> String {
        let base = self.settings.geocode_url.trim_end_matches('/');
        let api_key = urlencoding::encode(&self.settings.weather_api_key);
        match route {
            GeocodeRoute::PostalCode(code) => format!(
                "{}/search?postalcode={}&country={}&api_key={}",
                base, code, POSTAL_CODE_COUNTRY, api_key
            ),
            GeocodeRoute::Place(_) => format!(
                "{}/search?q={}&api_key={}",
                base,
                route.encoded_value(),
                api_key
            ),
        }
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        provider: &'static str,
        request: RequestBuilder,
    ) -> Result<T, UpstreamError> {
        let res = request
            .send()
            .await
            .map_err(|source| UpstreamError::Request { provider, source })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| UpstreamError::Request { provider, source })?;
        trace!("{} responded with {}: {}", provider, status, truncate_body(&body));

        if !status.is_success() {
            return Err(UpstreamError::Status {
                provider,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| UpstreamError::Decode {
            provider,
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl WeatherApis for HttpWeatherApis {
    async fn geocode(&self, route: &GeocodeRoute) -> Result<Value, UpstreamError> {
        debug!("geocoding {}", route);
        let request = self.http.get(self.geocode_url(route));
        self.fetch_json(GEOCODER, request).await
    }

    async fn timezone(&self, coordinates: Coordinates) -> Result<Option<String>, UpstreamError> {
        let url = format!(
            "{}/timezoneJSON",
            self.settings.timezone_url.trim_end_matches('/')
        );
        let request = self.http.get(url).query(&[
            ("lat", coordinates.latitude.to_string()),
            ("lng", coordinates.longitude.to_string()),
            ("username", self.settings.geonames_username.clone()),
        ]);
        let parsed: TimezoneResponse = self.fetch_json(TIMEZONE, request).await?;
        Ok(parsed.timezone_id.filter(|id| !id.trim().is_empty()))
    }

    async fn forecast(
        &self,
        coordinates: Coordinates,
        timezone: &str,
    ) -> Result<Value, UpstreamError> {
        let latitude = coordinates.latitude.to_string();
        let longitude = coordinates.longitude.to_string();
        let request = self.http.get(&self.settings.forecast_url).query(&[
            ("latitude", latitude.as_str()),
            ("longitude", longitude.as_str()),
            ("timezone", timezone),
            ("current", CURRENT_FIELDS),
            ("hourly", HOURLY_FIELDS),
            ("daily", DAILY_FIELDS),
            ("forecast_hours", FORECAST_HOURS),
            ("temperature_unit", "fahrenheit"),
            ("wind_speed_unit", "mph"),
            ("precipitation_unit", "inch"),
        ]);
        self.fetch_json(FORECAST, request).await
    }

    async fn reverse_geocode(
        &self,
        coordinates: Coordinates,
    ) -> Result<PlaceDetails, UpstreamError> {
        let url = format!(
            "{}/reverse",
            self.settings.geocode_url.trim_end_matches('/')
        );
        let request = self.http.get(url).query(&[
            ("lat", coordinates.latitude.to_string()),
            ("lon", coordinates.longitude.to_string()),
            ("api_key", self.settings.weather_api_key.clone()),
        ]);
        let parsed: ReverseGeocodeResponse = self.fetch_json(REVERSE_GEOCODER, request).await?;
        parsed
            .address
            .map(PlaceDetails::from)
            .ok_or_else(|| UpstreamError::Decode {
                provider: REVERSE_GEOCODER,
                reason: "response contained no address".to_string(),
            })
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
