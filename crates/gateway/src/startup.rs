use crate::{
    generate_pdf, get_weather_data, hello, rate_limit, routes, Browser, GeneratePdf,
    HttpWeatherApis, IngressSettings, PdfRenderer, PlaceDetails, RateLimiter, Settings,
    WeatherAggregator, WeatherApis, WeatherReport, WebDriverBrowser,
};
use anyhow::anyhow;
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Request},
    http::HeaderValue,
    middleware::{self, Next},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use hyper::{
    header::{ACCEPT, CONTENT_TYPE},
    Method,
};
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{AllowOrigin, CorsLayer};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: WeatherAggregator,
    /// `None` when PDF rendering is switched off
    pub pdf_renderer: Option<PdfRenderer>,
    pub ingress: IngressSettings,
}

impl AppState {
    pub fn new(
        apis: Arc<dyn WeatherApis>,
        browser: Option<Arc<dyn Browser>>,
        ingress: IngressSettings,
    ) -> Self {
        Self {
            aggregator: WeatherAggregator::new(apis),
            pdf_renderer: browser.map(PdfRenderer::new),
            ingress,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::hello,
        routes::weather_data::get_weather_data,
        routes::generate_pdf::generate_pdf,
    ),
    components(schemas(WeatherReport, PlaceDetails, GeneratePdf)),
    tags(
        (name = "weather gateway api", description = "aggregated weather lookups and HTML to PDF rendering")
    )
)]
struct ApiDoc;

pub fn build_app_state(settings: &Settings) -> Result<AppState, anyhow::Error> {
    let apis = HttpWeatherApis::new(settings.providers.clone())
        .map_err(|e| anyhow!("error building http client: {}", e))?;

    let browser = settings.browser.clone().map(|browser| {
        info!("  PDF rendering via WebDriver at {}", browser.webdriver_url);
        Arc::new(WebDriverBrowser::new(browser)) as Arc<dyn Browser>
    });

    Ok(AppState::new(
        Arc::new(apis),
        browser,
        settings.ingress.clone(),
    ))
}

pub fn app(app_state: AppState) -> Router {
    let ingress = app_state.ingress.clone();
    let limiter = Arc::new(Mutex::new(RateLimiter::new(
        ingress.rate_limit_requests,
        ingress.rate_limit_window,
    )));

    let api = Router::new()
        .route("/hello", get(hello))
        .route("/weather-data/{weatherSearch}", get(get_weather_data))
        .route("/generate-pdf", post(generate_pdf))
        .with_state(Arc::new(app_state));

    let routes = if ingress.route_prefix.is_empty() {
        api
    } else {
        Router::new().nest(&ingress.route_prefix, api)
    };

    routes
        .layer(middleware::from_fn_with_state(limiter, rate_limit))
        .layer(middleware::from_fn(log_request))
        .layer(DefaultBodyLimit::max(ingress.body_limit_bytes))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(cors_layer(&ingress.allowed_origins))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE])
        .allow_origin(AllowOrigin::list(origins))
}

async fn log_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    let now = time::OffsetDateTime::now_utc();
    let path = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_default();
    info!(target: "http_request", "new request, {} {}", request.method().as_str(), path);

    let response = next.run(request).await;
    let response_time = time::OffsetDateTime::now_utc() - now;
    info!(target: "http_response", "response, code: {}, time: {}", response.status().as_str(), response_time);

    response
}
