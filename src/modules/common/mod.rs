// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use super::error::MailQueueError;
use poem::error::ResponseError;
use poem::Body;
use poem::{http::StatusCode, Response};
use tracing::error;

pub mod log;
pub mod signal;

impl ResponseError for MailQueueError {
    fn status(&self) -> StatusCode {
        self.code().status()
    }

    fn as_response(&self) -> Response
    where
        Self: std::error::Error + Send + Sync + 'static,
    {
        let code = self.code();
        match self {
            MailQueueError::Generic {
                message, location, ..
            } => {
                error!(
                    error_code = code as u32,
                    error_message = %message,
                    error_location = ?location
                );
            }
            MailQueueError::Transport { location, .. } => {
                error!(
                    error_code = code as u32,
                    error_message = %self,
                    error_location = ?location
                );
            }
        }

        let body = Body::from_json(serde_json::json!({
            "code": code as u32,
            "message": self.to_string(),
        }))
        .unwrap_or_else(|_| Body::from_string(self.to_string()));

        Response::builder().status(self.status()).body(body)
    }
}
