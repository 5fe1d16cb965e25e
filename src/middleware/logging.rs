use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{error, info, warn};

/// Message of a failed request, attached to the response by `ApiError`.
#[derive(Clone, Debug)]
pub struct ErrorRecord(pub String);

pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let elapsed = start.elapsed();
    let failure = response
        .extensions()
        .get::<ErrorRecord>()
        .map(|record| record.0.as_str())
        .unwrap_or("");

    if status.is_server_error() {
        error!(
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            error = %failure,
            "Failed to process request"
        );
    } else if status.is_client_error() {
        warn!(
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            error = %failure,
            "Rejected request"
        );
    } else {
        info!(
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            "Processed request"
        );
    }

    response
}
