// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use poem::http::StatusCode;
use poem::{handler, Response};
use prometheus::{Encoder, TextEncoder};
use tracing::warn;

/// Every registered metric in the Prometheus text format.
pub fn encode_metrics() -> prometheus::Result<Vec<u8>> {
    let mut body = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut body)?;
    Ok(body)
}

#[handler]
pub fn metrics() -> Response {
    match encode_metrics() {
        Ok(body) => Response::builder()
            .content_type(TextEncoder::new().format_type())
            .body(body),
        Err(e) => {
            warn!("Failed to encode metrics: {}", e);
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .finish()
        }
    }
}
