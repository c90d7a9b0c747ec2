// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use poem::http::StatusCode;
use poem_openapi::Enum;

#[derive(Copy, Clone, Debug, Enum, Eq, PartialEq)]
#[repr(u32)]
pub enum ErrorCode {
    // Client-side errors (10000–10999)
    InvalidParameter = 10000,
    MissingConfiguration = 10020,
    ExceedsLimitation = 10040,
    MethodNotAllowed = 10090,

    // Account errors (20000–20999)
    PermissionDenied = 20000,
    AccountDisabled = 20010,
    DecryptionFailed = 20020,

    // Resource errors (30000–30999)
    ResourceNotFound = 30000,
    AlreadyExists = 30010,

    // Network connection errors (40000–40999)
    NetworkError = 40000,
    ConnectionTimeout = 40010,

    // Mail service errors (50000–50999)
    SmtpCommandFailed = 50030,
    SmtpConnectionFailed = 50040,
    SmtpAuthenticationFailed = 50050,

    // Internal system errors (70000–70999)
    InternalError = 70000,
    StorageError = 70020,
    UnhandledPoemError = 70010,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidParameter
            | ErrorCode::MissingConfiguration
            | ErrorCode::ExceedsLimitation => StatusCode::BAD_REQUEST,
            ErrorCode::PermissionDenied => StatusCode::UNAUTHORIZED,
            ErrorCode::AccountDisabled => StatusCode::FORBIDDEN,
            ErrorCode::ResourceNotFound => StatusCode::NOT_FOUND,
            ErrorCode::AlreadyExists => StatusCode::CONFLICT,
            ErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorCode::DecryptionFailed
            | ErrorCode::NetworkError
            | ErrorCode::ConnectionTimeout
            | ErrorCode::SmtpCommandFailed
            | ErrorCode::SmtpConnectionFailed
            | ErrorCode::SmtpAuthenticationFailed
            | ErrorCode::InternalError
            | ErrorCode::StorageError
            | ErrorCode::UnhandledPoemError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Configuration errors never consume an attempt: the affected group is
    /// skipped and its entries stay `pending`.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ErrorCode::AccountDisabled
                | ErrorCode::ResourceNotFound
                | ErrorCode::MissingConfiguration
                | ErrorCode::DecryptionFailed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;

    #[test]
    fn configuration_codes() {
        assert!(ErrorCode::AccountDisabled.is_configuration());
        assert!(ErrorCode::ResourceNotFound.is_configuration());
        assert!(ErrorCode::MissingConfiguration.is_configuration());
        assert!(!ErrorCode::SmtpCommandFailed.is_configuration());
        assert!(!ErrorCode::StorageError.is_configuration());
    }
}
