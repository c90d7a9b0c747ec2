// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::code::ErrorCode;
use crate::modules::outbox::entity::QueueEntry;
use crate::modules::outbox::enqueue;
use crate::modules::outbox::payload::EnqueueRequest;
use crate::modules::rest::api::{ApiContext, ApiTags};
use crate::modules::rest::ApiResult;
use crate::modules::store::OutboxStore;
use crate::{raise_error, utc_now};
use poem_openapi::param::Path;
use poem_openapi::param::Query;
use poem_openapi::payload::Json;
use poem_openapi::OpenApi;

const MAX_PAGE: u32 = 500;

pub struct OutboxApi {
    pub context: ApiContext,
}

#[OpenApi(prefix_path = "/api/v1", tag = "ApiTags::Outbox")]
impl OutboxApi {
    /// Queue an email for delivery. It is sent by a later dispatch cycle.
    #[oai(path = "/outbox", method = "post", operation_id = "enqueue")]
    async fn enqueue(
        &self,
        /// Message and routing for the new entry
        payload: Json<EnqueueRequest>,
    ) -> ApiResult<Json<QueueEntry>> {
        let entry = enqueue(
            self.context.store.as_ref(),
            payload.0,
            self.context.default_max_attempts,
        )
        .await?;
        Ok(Json(entry))
    }

    /// Get one queue entry with its status, attempts and last error.
    #[oai(path = "/outbox/:id", method = "get", operation_id = "get_entry")]
    async fn get_entry(
        &self,
        /// The queue entry ID
        id: Path<u64>,
    ) -> ApiResult<Json<QueueEntry>> {
        let entry = self.context.store.get_entry(id.0).await?.ok_or_else(|| {
            raise_error!(
                format!("Queue entry {} not found", id.0),
                ErrorCode::ResourceNotFound
            )
        })?;
        Ok(Json(entry))
    }

    /// List a tenant's due entries, oldest first.
    #[oai(
        path = "/tenant-outbox/:tenant_id",
        method = "get",
        operation_id = "list_tenant_pending"
    )]
    async fn list_tenant_pending(
        &self,
        /// The tenant ID
        tenant_id: Path<u64>,
        /// Maximum entries to return (default 100, at most 500)
        limit: Query<Option<u32>>,
    ) -> ApiResult<Json<Vec<QueueEntry>>> {
        let limit = limit.0.unwrap_or(100).clamp(1, MAX_PAGE) as usize;
        let entries = self
            .context
            .store
            .pending_for_tenant(tenant_id.0, limit, utc_now!())
            .await?;
        Ok(Json(entries))
    }
}
