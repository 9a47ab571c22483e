use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{borrow::Cow, fmt, sync::OnceLock};
use utoipa::ToSchema;

/// Appended to every free-text query before it is geocoded.
///
/// Non-US places get qualified as US ones too ("Paris" -> "Paris, US"); kept for
/// compatibility with existing clients.
pub const COUNTRY_QUALIFIER: &str = ", US";

/// Country sent along with postal-code lookups.
pub const POSTAL_CODE_COUNTRY: &str = "US";

fn postal_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // ASCII only: non-Latin digits are not postal codes, and "é90210" has a boundary.
    PATTERN.get_or_init(|| Regex::new(r"(?-u)\b[0-9]{5}\b").expect("postal code pattern is valid"))
}

/// How a location query is sent to the geocoding provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeocodeRoute {
    /// A standalone 5-digit token found somewhere in the query
    PostalCode(String),
    /// The original query, country qualified
    Place(String),
}

impl GeocodeRoute {
    pub fn classify(location_query: &str) -> Self {
        match postal_code_pattern().find(location_query) {
            Some(code) => GeocodeRoute::PostalCode(code.as_str().to_owned()),
            None => GeocodeRoute::Place(format!("{}{}", location_query, COUNTRY_QUALIFIER)),
        }
    }

    pub fn value(&self) -> &str {
        match self {
            GeocodeRoute::PostalCode(code) => code,
            GeocodeRoute::Place(query) => query,
        }
    }

    /// Percent-encoded form of [`GeocodeRoute::value`], ready to be placed in a URL.
    pub fn encoded_value(&self) -> Cow<'_, str> {
        urlencoding::encode(self.value())
    }
}

impl fmt::Display for GeocodeRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeocodeRoute::PostalCode(code) => write!(f, "postal code {}", code),
            GeocodeRoute::Place(query) => write!(f, "place \"{}\"", query),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Pulls coordinates out of a geocoding response.
///
/// Accepts a list of candidates (the first one wins) or a single object, with
/// `lat` and `lon` (or `lng`) given as numbers or numeric strings.
pub fn extract_coordinates(body: &Value) -> Option<Coordinates> {
    let candidate = match body {
        Value::Array(candidates) => candidates.first()?,
        single => single,
    };
    let latitude = coordinate(candidate.get("lat")?)?;
    let longitude = coordinate(candidate.get("lon").or_else(|| candidate.get("lng"))?)?;
    Some(Coordinates {
        latitude,
        longitude,
    })
}

fn coordinate(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Address block of a reverse-geocoding response.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawAddress {
    pub city: Option<String>,
    pub town: Option<String>,
    pub county: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "ISO3166-2-lvl4")]
    pub region_code: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReverseGeocodeResponse {
    pub address: Option<RawAddress>,
}

/// Human readable place returned next to the forecast.
#[derive(Debug, Default, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub town: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

impl From<RawAddress> for PlaceDetails {
    fn from(address: RawAddress) -> Self {
        PlaceDetails {
            town: address.city.or(address.town),
            county: address.county,
            state: address.state,
            region_code: address.region_code,
            postal_code: address.postcode,
            country: address.country,
            country_code: address.country_code,
        }
    }
}
