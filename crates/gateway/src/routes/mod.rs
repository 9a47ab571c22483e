pub mod generate_pdf;
pub mod health;
pub mod weather_data;

pub use generate_pdf::*;
pub use health::*;
pub use weather_data::*;
