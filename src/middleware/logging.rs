use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;

const MAX_LOGGED_BODY: usize = 2000;
const MAX_BUFFERED_BODY: usize = 1024 * 1024;

/// Middleware that logs each request and response, including truncated
/// bodies. Purchase callbacks and spend requests are small; keeping their
/// bodies in the log is what makes support diagnosis of crediting disputes
/// possible.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_BUFFERED_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(request_id = %request_id, "Failed to read request body: {}", e);
            return (StatusCode::BAD_REQUEST, "Failed to read request body").into_response();
        }
    };

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        body = %truncate_body(&String::from_utf8_lossy(&bytes)),
        "→ Request"
    );

    let request = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(request).await;

    let status = response.status();
    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, MAX_BUFFERED_BODY).await.unwrap_or_else(|e| {
        tracing::error!(request_id = %request_id, "Failed to read response body: {}", e);
        Default::default()
    });

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %status.as_u16(),
        latency_ms = %start.elapsed().as_millis(),
        body = %truncate_body(&String::from_utf8_lossy(&bytes)),
        "← Response"
    );

    Response::from_parts(parts, Body::from(bytes))
}

/// Truncate body for logging, adding ellipsis if truncated
fn truncate_body(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_LOGGED_BODY) {
        None => body.to_string(),
        Some((idx, _)) => format!(
            "{}...[truncated, {} bytes total]",
            &body[..idx],
            body.len()
        ),
    }
}
