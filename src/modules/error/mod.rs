// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt::Formatter;

use crate::modules::smtp::stage::SendStage;
use code::ErrorCode;
use poem::http::StatusCode;
use poem_openapi::{payload::Json, ApiResponse, Object};
use snafu::{Location, Snafu};

pub mod code;
pub mod handler;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MailQueueError {
    #[snafu(display("{message}"))]
    Generic {
        message: String,
        #[snafu(implicit)]
        location: Location,
        code: ErrorCode,
    },
    /// A failure during one step of the SMTP conversation.
    #[snafu(display("smtp {stage} failed: {message}"))]
    Transport {
        stage: SendStage,
        message: String,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type MailQueueResult<T, E = MailQueueError> = std::result::Result<T, E>;

impl MailQueueError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MailQueueError::Generic { code, .. } => *code,
            MailQueueError::Transport { stage, .. } => stage.error_code(),
        }
    }

    pub fn stage(&self) -> Option<&SendStage> {
        match self {
            MailQueueError::Transport { stage, .. } => Some(stage),
            MailQueueError::Generic { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Object)]
pub struct ApiError {
    pub message: String,
    pub code: u32,
}

impl From<MailQueueError> for ApiErrorResponse {
    fn from(error: MailQueueError) -> Self {
        let code = error.code();
        match error {
            MailQueueError::Generic {
                message, location, ..
            } => {
                tracing::error!(
                    "API error occurred: [{:#?}] {} at {:?}",
                    code,
                    message,
                    location
                );
                ApiErrorResponse::Generic(code.status(), Json(ApiError::new(message, code as u32)))
            }
            other => {
                let message = other.to_string();
                tracing::error!("API error occurred: [{:#?}] {}", code, message);
                ApiErrorResponse::Generic(code.status(), Json(ApiError::new(message, code as u32)))
            }
        }
    }
}

impl ApiError {
    pub fn new(message: String, code: u32) -> Self {
        Self { message, code }
    }

    pub fn new_with_error_code<ErrorType: std::fmt::Display>(
        error: ErrorType,
        code: u32,
    ) -> ApiError {
        Self::new(format!("{:#}", error), code)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error({}): {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Clone, ApiResponse)]
pub enum ApiErrorResponse {
    Generic(StatusCode, Json<ApiError>),
}
