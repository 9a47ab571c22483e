use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, StatusCode},
    Json,
};
use hyper::{
    header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    HeaderMap,
};
use log::{error, info, warn};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{AppState, GatewayError, PdfError};

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePdf {
    /// Complete HTML document to render
    pub html_content: Option<String>,
}

#[utoipa::path(
    post,
    path = "/generate-pdf",
    request_body = GeneratePdf,
    responses(
        (status = OK, description = "Rendered document", content_type = "application/pdf", body = Vec<u8>),
        (status = BAD_REQUEST, description = "htmlContent is missing or empty", content_type = "text/plain", body = String),
        (status = PAYLOAD_TOO_LARGE, description = "Request body exceeds the configured limit", content_type = "text/plain", body = String),
        (status = NOT_FOUND, description = "PDF generation is switched off", content_type = "text/plain", body = String),
        (status = INTERNAL_SERVER_ERROR, description = "Browser failed to render the document", content_type = "text/plain", body = String)
    ))]
pub async fn generate_pdf(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GeneratePdf>, JsonRejection>,
) -> Result<(HeaderMap, Vec<u8>), (StatusCode, String)> {
    let Some(renderer) = state.pdf_renderer.clone() else {
        return Err((
            StatusCode::NOT_FOUND,
            "PDF generation is disabled".to_string(),
        ));
    };

    let html_content = match payload {
        Ok(Json(request)) => request.html_content.unwrap_or_default(),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!("pdf request body too large: {}", rejection);
            return Err((rejection.status(), rejection.body_text()));
        }
        Err(rejection) => {
            warn!("unreadable pdf request body: {}", rejection);
            String::new()
        }
    };
    if html_content.is_empty() {
        let err = GatewayError::from(PdfError::MissingContent);
        return Err((err.status_code(), err.to_string()));
    }

    // Detached so the browser is always closed, even if the client goes away mid-render.
    let render = tokio::spawn(async move { renderer.render(&html_content).await });
    let pdf = render
        .await
        .map_err(|err| {
            error!("pdf render task failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to render PDF".to_string(),
            )
        })?
        .map_err(|err| {
            error!("error generating pdf: {}", err);
            let err = GatewayError::from(err);
            (err.status_code(), err.to_string())
        })?;

    info!("generated pdf of {} bytes", pdf.len());

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    headers.insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_static("inline; filename=\"generated.pdf\""),
    );

    Ok((headers, pdf))
}
