//! Weather Gateway
//!
//! Stateless HTTP façade that:
//! - resolves a free-text location and merges geocoding, timezone, forecast and
//!   reverse-geocoding answers into one response
//! - renders HTML to PDF in a headless browser launched per request

mod aggregator;
mod error;
mod geocode;
mod pdf;
mod providers;
mod rate_limit;
pub mod routes;
mod startup;
mod utils;

pub use aggregator::*;
pub use error::*;
pub use geocode::*;
pub use pdf::*;
pub use providers::*;
pub use rate_limit::*;
pub use routes::*;
pub use startup::*;
pub use utils::*;
