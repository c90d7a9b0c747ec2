// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::common::log::Tracing;
use crate::modules::common::signal::shutdown_requested;
use crate::modules::error::code::ErrorCode;
use crate::modules::error::handler::error_handler;
use crate::modules::error::MailQueueResult;
use crate::modules::metrics::endpoint::metrics;
use crate::modules::settings::cli::SETTINGS;

use super::error::ApiErrorResponse;
use crate::raise_error;
use api::{create_openapi_service, ApiContext};
use poem::listener::TcpListener;
use poem::middleware::CatchPanic;
use poem::{get, EndpointExt, Route, Server};
use std::time::Duration;

pub mod api;

pub type ApiResult<T, E = ApiErrorResponse> = std::result::Result<T, E>;

const DESCRIPTION: &str = r#"
    MailQueue is a multi-tenant outbound email queue.

    - Tenants queue messages over REST; a background sweep delivers them through the tenant's own SMTP accounts.
    - Each mail account carries an hourly sending quota; entries over quota wait for the next cycle.
    - Failed attempts are retried up to a per-entry ceiling.
"#;

/// Serves the API and `/metrics` until the process shutdown signal fires.
pub async fn start_http_server(context: ApiContext) -> MailQueueResult<()> {
    let listener = TcpListener::bind((
        SETTINGS
            .mailqueue_bind_ip
            .clone()
            .unwrap_or("0.0.0.0".into()),
        SETTINGS.mailqueue_http_port as u16,
    ));

    let api_service = create_openapi_service(context)
        .description(DESCRIPTION)
        .summary("A multi-tenant outbound email queue with per-account hourly quotas");

    let swagger = api_service.swagger_ui();
    let redoc = api_service.redoc();
    let spec_json = api_service.spec_endpoint();

    let open_api_route = Route::new()
        .nest_no_strip("/api/v1", api_service)
        .with(Tracing);

    let route = Route::new()
        .nest("/api-docs/swagger", swagger)
        .nest("/api-docs/redoc", redoc)
        .nest("/api-docs/spec.json", spec_json)
        .at("/metrics", get(metrics))
        .nest_no_strip("/api/v1", open_api_route)
        .with(CatchPanic::new());

    let mut shutdown = shutdown_requested();
    let server = Server::new(listener)
        .name("MailQueue API Service")
        .idle_timeout(Duration::from_secs(60))
        .run_with_graceful_shutdown(
            route.catch_all_error(error_handler),
            async move {
                let _ = shutdown.recv().await;
            },
            Some(Duration::from_secs(5)),
        );
    tracing::info!(
        "MailQueue API Service is now running on port {}.",
        SETTINGS.mailqueue_http_port
    );
    server
        .await
        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))
}
