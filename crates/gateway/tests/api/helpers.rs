use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::Request,
    response::Response,
    Router,
};
use gateway::{
    app, AppState, Browser, BrowserSession, Coordinates, GeocodeRoute, IngressSettings,
    PdfError, PdfOptions, PlaceDetails, ProviderSettings, UpstreamError, WeatherApis,
};
use mockall::mock;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

mock! {
    pub UpstreamApis {}
    #[async_trait]
    impl WeatherApis for UpstreamApis {
        async fn geocode(&self, route: &GeocodeRoute) -> Result<Value, UpstreamError>;
        async fn timezone(&self, coordinates: Coordinates) -> Result<Option<String>, UpstreamError>;
        async fn forecast(&self, coordinates: Coordinates, timezone: &str) -> Result<Value, UpstreamError>;
        async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<PlaceDetails, UpstreamError>;
    }
}

mock! {
    pub HeadlessBrowser {}
    #[async_trait]
    impl Browser for HeadlessBrowser {
        async fn launch(&self) -> Result<Box<dyn BrowserSession>, PdfError>;
    }
}

mock! {
    pub PageSession {}
    #[async_trait]
    impl BrowserSession for PageSession {
        async fn load_html(&mut self, html: &str) -> Result<(), PdfError>;
        async fn print_pdf(&mut self, options: &PdfOptions) -> Result<Vec<u8>, PdfError>;
        async fn close(&mut self) -> Result<(), PdfError>;
    }
}

pub struct TestApp {
    pub app: Router,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request.")
    }
}

pub async fn spawn_app(weather_apis: Arc<dyn WeatherApis>) -> TestApp {
    spawn_app_with(
        weather_apis,
        Some(Arc::new(MockHeadlessBrowser::new())),
        IngressSettings::default(),
    )
    .await
}

pub async fn spawn_app_with(
    weather_apis: Arc<dyn WeatherApis>,
    browser: Option<Arc<dyn Browser>>,
    ingress: IngressSettings,
) -> TestApp {
    let app_state = AppState::new(weather_apis, browser, ingress);
    TestApp { app: app(app_state) }
}

pub async fn body_string(response: Response) -> String {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

pub fn provider_settings(base_url: &str) -> ProviderSettings {
    ProviderSettings {
        geocode_url: base_url.to_string(),
        timezone_url: base_url.to_string(),
        forecast_url: format!("{}/v1/forecast", base_url),
        geonames_username: String::from("demo"),
        weather_api_key: String::from("test-key"),
    }
}
