use clap::Parser;
use fern::{
    colors::{Color, ColoredLevelConfig},
    Dispatch,
};
use log::LevelFilter;
use std::{env, time::Duration};
use time::{format_description::well_known::Iso8601, OffsetDateTime};
use weather_gateway_core::{
    find_config_file, load_config, ConfigSource, DEFAULT_GATEWAY_PORT, DEFAULT_ROUTE_PREFIX,
};

use crate::GatewayError;

pub const DEFAULT_GEOCODE_URL: &str = "https://geocode.maps.co";
pub const DEFAULT_TIMEZONE_URL: &str = "http://api.geonames.org";
pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:5173"];

#[derive(Parser, Clone, Debug, serde::Deserialize, Default)]
#[command(
    author,
    version,
    about = "Weather Gateway - aggregated weather lookups and HTML to PDF rendering"
)]
pub struct Cli {
    /// Path to config file (TOML format)
    /// Searched in order: this flag, $WEATHER_GATEWAY_CONFIG, ./gateway.toml,
    /// $XDG_CONFIG_HOME/weather-gateway/gateway.toml, /etc/weather-gateway/gateway.toml
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, env = "WEATHER_GATEWAY_LEVEL")]
    pub level: Option<String>,

    /// Host to listen on (use 0.0.0.0 for all interfaces)
    #[arg(long, env = "WEATHER_GATEWAY_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "WEATHER_GATEWAY_PORT")]
    pub port: Option<u16>,

    /// Prefix all API routes are mounted under
    #[arg(long, env = "WEATHER_GATEWAY_ROUTE_PREFIX")]
    pub route_prefix: Option<String>,

    /// GeoNames account used for timezone lookups (required)
    #[arg(long, env = "WEATHER_GATEWAY_GEONAMES_USERNAME")]
    pub geonames_username: Option<String>,

    /// API key for the location search / reverse geocoding service (required)
    #[arg(long, env = "WEATHER_GATEWAY_WEATHER_API_KEY")]
    pub weather_api_key: Option<String>,

    /// Base URL of the geocoding service
    #[arg(long, env = "WEATHER_GATEWAY_GEOCODE_URL")]
    pub geocode_url: Option<String>,

    /// Base URL of the timezone service
    #[arg(long, env = "WEATHER_GATEWAY_TIMEZONE_URL")]
    pub timezone_url: Option<String>,

    /// Forecast endpoint
    #[arg(long, env = "WEATHER_GATEWAY_FORECAST_URL")]
    pub forecast_url: Option<String>,

    /// Serve POST /generate-pdf (true/false)
    #[arg(long, env = "WEATHER_GATEWAY_ENABLE_PDF")]
    pub enable_pdf: Option<bool>,

    /// WebDriver endpoint used to launch the headless browser
    #[arg(long, env = "WEATHER_GATEWAY_WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,

    /// Browser executable handed to the WebDriver (platform specific)
    #[arg(long, env = "WEATHER_GATEWAY_BROWSER_BINARY")]
    pub browser_binary: Option<String>,

    /// Seconds to wait for a page to settle before printing
    #[arg(long, env = "WEATHER_GATEWAY_PDF_SETTLE_SECS")]
    pub pdf_settle_secs: Option<u64>,

    /// Origins allowed by CORS, comma separated
    #[arg(long, env = "WEATHER_GATEWAY_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Option<Vec<String>>,

    /// Requests allowed per client within the rate limit window
    #[arg(long, env = "WEATHER_GATEWAY_RATE_LIMIT_REQUESTS")]
    pub rate_limit_requests: Option<u32>,

    /// Rate limit window in seconds
    #[arg(long, env = "WEATHER_GATEWAY_RATE_LIMIT_WINDOW_SECS")]
    pub rate_limit_window_secs: Option<u64>,

    /// Largest accepted request body in bytes
    #[arg(long, env = "WEATHER_GATEWAY_BODY_LIMIT_BYTES")]
    pub body_limit_bytes: Option<usize>,
}

/// Credentials and endpoints of the upstream weather providers.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub geocode_url: String,
    pub timezone_url: String,
    pub forecast_url: String,
    pub geonames_username: String,
    pub weather_api_key: String,
}

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub webdriver_url: String,
    pub browser_binary: Option<String>,
    pub settle_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct IngressSettings {
    pub route_prefix: String,
    pub allowed_origins: Vec<String>,
    pub rate_limit_requests: u32,
    pub rate_limit_window: Duration,
    pub body_limit_bytes: usize,
}

impl Default for IngressSettings {
    /// 50 requests per 15 minutes, 10MB bodies
    fn default() -> Self {
        Self {
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|origin| origin.to_string())
                .collect(),
            rate_limit_requests: 50,
            rate_limit_window: Duration::from_secs(15 * 60),
            body_limit_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Validated configuration the server is started with.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub providers: ProviderSettings,
    /// `None` when PDF rendering is switched off
    pub browser: Option<BrowserSettings>,
    pub ingress: IngressSettings,
}

impl Cli {
    pub fn host(&self) -> String {
        self.host
            .clone()
            .unwrap_or_else(|| "127.0.0.1".to_string())
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_GATEWAY_PORT)
    }

    pub fn route_prefix(&self) -> String {
        normalize_prefix(
            self.route_prefix
                .as_deref()
                .unwrap_or(DEFAULT_ROUTE_PREFIX),
        )
    }

    /// Checks the required secrets once and freezes everything into [`Settings`].
    pub fn settings(&self) -> Result<Settings, GatewayError> {
        let geonames_username = required(&self.geonames_username, "geonames_username")?;
        let weather_api_key = required(&self.weather_api_key, "weather_api_key")?;

        let providers = ProviderSettings {
            geocode_url: self
                .geocode_url
                .clone()
                .unwrap_or_else(|| DEFAULT_GEOCODE_URL.to_string()),
            timezone_url: self
                .timezone_url
                .clone()
                .unwrap_or_else(|| DEFAULT_TIMEZONE_URL.to_string()),
            forecast_url: self
                .forecast_url
                .clone()
                .unwrap_or_else(|| DEFAULT_FORECAST_URL.to_string()),
            geonames_username,
            weather_api_key,
        };

        let browser = self.enable_pdf.unwrap_or(true).then(|| BrowserSettings {
            webdriver_url: self
                .webdriver_url
                .clone()
                .unwrap_or_else(|| DEFAULT_WEBDRIVER_URL.to_string()),
            browser_binary: self.browser_binary.clone(),
            settle_timeout: Duration::from_secs(self.pdf_settle_secs.unwrap_or(10)),
        });

        let defaults = IngressSettings::default();
        let ingress = IngressSettings {
            route_prefix: self.route_prefix(),
            allowed_origins: self
                .allowed_origins
                .clone()
                .filter(|origins| !origins.is_empty())
                .unwrap_or(defaults.allowed_origins),
            rate_limit_requests: self
                .rate_limit_requests
                .unwrap_or(defaults.rate_limit_requests),
            rate_limit_window: self
                .rate_limit_window_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_limit_window),
            body_limit_bytes: self.body_limit_bytes.unwrap_or(defaults.body_limit_bytes),
        };

        Ok(Settings {
            host: self.host(),
            port: self.port(),
            providers,
            browser,
            ingress,
        })
    }
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, GatewayError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .ok_or(GatewayError::ConfigurationMissing(field))
}

/// "api/" -> "/api"; "" and "/" mean no prefix at all.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Load configuration from CLI args, config file, and environment
pub fn get_config_info() -> Cli {
    let cli_args = Cli::parse();

    let source = if let Some(ref path) = cli_args.config {
        ConfigSource::Explicit(path.into())
    } else {
        find_config_file("WEATHER_GATEWAY_CONFIG", "gateway.toml")
    };

    if let Some(path) = source.path() {
        log::info!("Loading config from: {}", path.display());
    }

    let file_config: Cli = match load_config(&source) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ignoring config file {}: {:#}", source, e);
            Cli::default()
        }
    };

    cli_args.merged_over(file_config)
}

impl Cli {
    /// Values set on the command line (or through env vars) win over `file`.
    pub fn merged_over(self, file: Cli) -> Cli {
        Cli {
            config: self.config,
            level: self.level.or(file.level),
            host: self.host.or(file.host),
            port: self.port.or(file.port),
            route_prefix: self.route_prefix.or(file.route_prefix),
            geonames_username: self.geonames_username.or(file.geonames_username),
            weather_api_key: self.weather_api_key.or(file.weather_api_key),
            geocode_url: self.geocode_url.or(file.geocode_url),
            timezone_url: self.timezone_url.or(file.timezone_url),
            forecast_url: self.forecast_url.or(file.forecast_url),
            enable_pdf: self.enable_pdf.or(file.enable_pdf),
            webdriver_url: self.webdriver_url.or(file.webdriver_url),
            browser_binary: self.browser_binary.or(file.browser_binary),
            pdf_settle_secs: self.pdf_settle_secs.or(file.pdf_settle_secs),
            allowed_origins: self.allowed_origins.or(file.allowed_origins),
            rate_limit_requests: self.rate_limit_requests.or(file.rate_limit_requests),
            rate_limit_window_secs: self.rate_limit_window_secs.or(file.rate_limit_window_secs),
            body_limit_bytes: self.body_limit_bytes.or(file.body_limit_bytes),
        }
    }
}

pub fn get_log_level(cli: &Cli) -> LevelFilter {
    let level_str = cli
        .level
        .clone()
        .or_else(|| env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());

    match level_str.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

pub fn setup_logger() -> Dispatch {
    let colors = ColoredLevelConfig::new()
        .trace(Color::White)
        .debug(Color::Cyan)
        .info(Color::Blue)
        .warn(Color::Yellow)
        .error(Color::Magenta);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            let timestamp = OffsetDateTime::now_utc()
                .format(&Iso8601::DEFAULT)
                .unwrap_or_default();
            out.finish(format_args!(
                "[{} {}] {}: {}",
                timestamp,
                colors.color(record.level()),
                record.target(),
                message
            ));
        })
        .chain(std::io::stdout())
}
