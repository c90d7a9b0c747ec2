// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use account::AccountApi;
use outbox::OutboxApi;
use poem_openapi::{OpenApiService, Tags};

use crate::mailqueue_version;
use crate::modules::store::nativedb::NativeDbOutboxStore;
use crate::modules::vault::AesGcmVault;

pub mod account;
pub mod outbox;

#[derive(Tags)]
pub enum ApiTags {
    Account,
    Outbox,
}

/// Shared handles the API operates on.
#[derive(Clone)]
pub struct ApiContext {
    pub store: Arc<NativeDbOutboxStore>,
    pub vault: Arc<AesGcmVault>,
    pub default_hourly_quota: u32,
    pub default_max_attempts: u32,
}

type MailQueueOpenApi = (AccountApi, OutboxApi);

pub fn create_openapi_service(context: ApiContext) -> OpenApiService<MailQueueOpenApi, ()> {
    OpenApiService::new(
        (
            AccountApi {
                context: context.clone(),
            },
            OutboxApi { context },
        ),
        "MailQueueApi",
        mailqueue_version!(),
    )
}
