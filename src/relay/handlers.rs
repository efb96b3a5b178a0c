//! HTTP request handler for the relay.

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;

use super::server::AppState;
use super::types::{GenerateRequest, GenerateResponse, InferenceRequest};
use crate::error::Error;

/// Provider header disabling response caching, so each request generates
/// a fresh image.
const USE_CACHE_HEADER: &str = "x-use-cache";

/// Attach the fixed CORS headers to a response.
///
/// Called on every outgoing response, success and error alike, so that
/// browser callers can read the body regardless of outcome.
fn attach_cors_headers(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
}

/// Handle every inbound request.
///
/// OPTIONS answers the CORS preflight, POST runs a generation, and any
/// other method is rejected with 405.
pub async fn relay(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    let mut response = match method {
        Method::OPTIONS => StatusCode::OK.into_response(),
        Method::POST => match generate(&state, &body).await {
            Ok(generated) => (StatusCode::OK, Json(generated)).into_response(),
            Err(error) => error.into_response(),
        },
        _ => {
            tracing::debug!(method = %method, "Rejecting request with unsupported method");
            (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response()
        }
    };

    attach_cors_headers(&mut response);
    response
}

/// Execute one generation: validate the prompt, call the provider, and
/// translate its response.
async fn generate(state: &AppState, body: &[u8]) -> crate::Result<GenerateResponse> {
    // A body that is not valid JSON is an unexpected failure (500), while
    // valid JSON without a usable prompt is a client error (400).
    let request: GenerateRequest = serde_json::from_slice(body)
        .map_err(|e| Error::Internal(format!("Failed to parse request body: {}", e)))?;

    let prompt = match request.prompt.as_deref() {
        Some(p) if !p.is_empty() => p,
        _ => return Err(Error::Validation),
    };

    let upstream = &state.config.upstream;

    tracing::info!(
        prompt_chars = prompt.len(),
        url = %upstream.url,
        "Forwarding prompt to inference provider"
    );

    let upstream_response = state
        .http_client
        .post(&upstream.url)
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", upstream.api_token.expose_secret()),
        )
        .header(header::CONTENT_TYPE, "application/json")
        .header(USE_CACHE_HEADER, "false")
        .json(&InferenceRequest { inputs: prompt })
        .send()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to reach inference provider");
            Error::Internal(format!("Failed to reach inference provider: {}", e))
        })?;

    let status = upstream_response.status();
    if !status.is_success() {
        let details = upstream_response.text().await.unwrap_or_default();
        tracing::error!(status = %status, body = %details, "Provider returned error");
        return Err(Error::Upstream {
            status: status.as_u16(),
            details,
        });
    }

    let image_bytes = upstream_response.bytes().await?;

    tracing::info!(image_bytes = image_bytes.len(), "Image generated");

    Ok(GenerateResponse::from_image_bytes(&image_bytes))
}
