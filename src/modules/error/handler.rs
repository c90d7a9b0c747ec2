// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::{code::ErrorCode, ApiError, ApiErrorResponse, MailQueueError};
use poem::{IntoResponse, Response};
use poem_openapi::payload::Json;

/// Gives poem's own rejections (unknown route, wrong method, malformed
/// request) the same JSON body as every other API error. The HTTP status
/// poem chose is kept.
pub async fn error_handler(error: poem::Error) -> Response {
    if error.is::<MailQueueError>() {
        return error.into_response();
    }
    let Some(code) = classify(&error) else {
        return error.into_response();
    };
    let body = ApiError::new_with_error_code(error.to_string(), code as u32);
    let mut response = ApiErrorResponse::Generic(code.status(), Json(body)).into_response();
    response.set_status(error.status());
    response
}

fn classify(error: &poem::Error) -> Option<ErrorCode> {
    if error.is::<poem::error::NotFoundError>() {
        Some(ErrorCode::ResourceNotFound)
    } else if error.is::<poem::error::MethodNotAllowedError>() {
        Some(ErrorCode::MethodNotAllowed)
    } else if is_malformed_request(error) {
        Some(ErrorCode::InvalidParameter)
    } else if error.has_source() {
        Some(ErrorCode::UnhandledPoemError)
    } else {
        None
    }
}

fn is_malformed_request(error: &poem::Error) -> bool {
    error.is::<poem::error::ParsePathError>()
        || error.is::<poem::error::ParseQueryError>()
        || error.is::<poem::error::ParseJsonError>()
        || error.is::<poem_openapi::error::ParseRequestPayloadError>()
        || error.is::<poem_openapi::error::ContentTypeError>()
        || error.is::<poem_openapi::error::ParseParamError>()
        || error.is::<poem_openapi::error::ParsePathError>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use poem::http::StatusCode;

    #[test]
    fn routing_rejections_map_to_codes() {
        let not_found: poem::Error = poem::error::NotFoundError.into();
        assert_eq!(classify(&not_found), Some(ErrorCode::ResourceNotFound));

        let wrong_method: poem::Error = poem::error::MethodNotAllowedError.into();
        assert_eq!(classify(&wrong_method), Some(ErrorCode::MethodNotAllowed));
    }

    #[test]
    fn other_failures_fall_back_by_source() {
        let wrapped = poem::Error::from_string("upstream closed", StatusCode::BAD_GATEWAY);
        assert_eq!(classify(&wrapped), Some(ErrorCode::UnhandledPoemError));

        let bare = poem::Error::from_response(
            Response::builder().status(StatusCode::BAD_GATEWAY).finish(),
        );
        assert_eq!(classify(&bare), None);
    }

    #[tokio::test]
    async fn rejection_keeps_poem_status() {
        let response = error_handler(poem::error::MethodNotAllowedError.into()).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
