use crate::helpers::{
    body_string, spawn_app_with, MockHeadlessBrowser, MockPageSession, MockUpstreamApis,
};
use axum::{body::Body, http::Request};
use gateway::{Browser, IngressSettings, PdfError};
use hyper::{header, Method, StatusCode};
use serde_json::json;
use std::sync::Arc;

const PDF_BYTES: &[u8] = b"%PDF-1.7\n%fake document\n%%EOF";

fn post_pdf(body: String) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/generate-pdf")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn browser_with(session: MockPageSession) -> Arc<dyn Browser> {
    let mut browser = MockHeadlessBrowser::new();
    browser
        .expect_launch()
        .times(1)
        .return_once(move || Ok(Box::new(session)));
    Arc::new(browser)
}

fn browser_never_launched() -> Arc<dyn Browser> {
    let mut browser = MockHeadlessBrowser::new();
    browser.expect_launch().times(0);
    Arc::new(browser)
}

#[tokio::test]
async fn html_is_rendered_to_an_inline_pdf() {
    let mut session = MockPageSession::new();
    session
        .expect_load_html()
        .withf(|html| html == "<html><body><h1>Forecast</h1></body></html>")
        .times(1)
        .returning(|_| Ok(()));
    session
        .expect_print_pdf()
        .times(1)
        .returning(|_| Ok(PDF_BYTES.to_vec()));
    session.expect_close().times(1).returning(|| Ok(()));
    let test_app = spawn_app_with(
        Arc::new(MockUpstreamApis::new()),
        Some(browser_with(session)),
        IngressSettings::default(),
    )
    .await;

    let body = json!({"htmlContent": "<html><body><h1>Forecast</h1></body></html>"});
    let response = test_app.send(post_pdf(body.to_string())).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "inline; filename=\"generated.pdf\""
    );
    let pdf = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(pdf.as_ref(), PDF_BYTES);
}

#[tokio::test]
async fn missing_html_content_is_a_bad_request() {
    let test_app = spawn_app_with(
        Arc::new(MockUpstreamApis::new()),
        Some(browser_never_launched()),
        IngressSettings::default(),
    )
    .await;

    let response = test_app.send(post_pdf(json!({}).to_string())).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_string(response).await, "htmlContent is required");
}

#[tokio::test]
async fn empty_html_content_is_a_bad_request() {
    let test_app = spawn_app_with(
        Arc::new(MockUpstreamApis::new()),
        Some(browser_never_launched()),
        IngressSettings::default(),
    )
    .await;

    let response = test_app
        .send(post_pdf(json!({"htmlContent": ""}).to_string()))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unreadable_body_is_a_bad_request() {
    let test_app = spawn_app_with(
        Arc::new(MockUpstreamApis::new()),
        Some(browser_never_launched()),
        IngressSettings::default(),
    )
    .await;

    let response = test_app.send(post_pdf(String::from("{not json"))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn render_failure_still_closes_the_browser() {
    let mut session = MockPageSession::new();
    session.expect_load_html().returning(|_| Ok(()));
    session
        .expect_print_pdf()
        .times(1)
        .returning(|_| Err(PdfError::Render("printing failed".to_string())));
    session.expect_close().times(1).returning(|| Ok(()));
    let test_app = spawn_app_with(
        Arc::new(MockUpstreamApis::new()),
        Some(browser_with(session)),
        IngressSettings::default(),
    )
    .await;

    let response = test_app
        .send(post_pdf(json!({"htmlContent": "<p>x</p>"}).to_string()))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_string(response).await.contains("Failed to render PDF"));
}

#[tokio::test]
async fn browser_launch_failure_is_a_server_error() {
    let mut browser = MockHeadlessBrowser::new();
    browser
        .expect_launch()
        .times(1)
        .returning(|| Err(PdfError::Launch("chromedriver unreachable".to_string())));
    let test_app = spawn_app_with(
        Arc::new(MockUpstreamApis::new()),
        Some(Arc::new(browser)),
        IngressSettings::default(),
    )
    .await;

    let response = test_app
        .send(post_pdf(json!({"htmlContent": "<p>x</p>"}).to_string()))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn disabled_pdf_rendering_is_not_found() {
    let test_app = spawn_app_with(
        Arc::new(MockUpstreamApis::new()),
        None,
        IngressSettings::default(),
    )
    .await;

    let response = test_app
        .send(post_pdf(json!({"htmlContent": "<p>x</p>"}).to_string()))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "PDF generation is disabled");
}

#[tokio::test]
async fn oversized_bodies_are_rejected() {
    let ingress = IngressSettings {
        body_limit_bytes: 64,
        ..Default::default()
    };
    let test_app = spawn_app_with(
        Arc::new(MockUpstreamApis::new()),
        Some(browser_never_launched()),
        ingress,
    )
    .await;

    let html = "x".repeat(512);
    let response = test_app
        .send(post_pdf(json!({ "htmlContent": html }).to_string()))
        .await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
