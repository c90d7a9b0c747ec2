// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::code::ErrorCode;
use crate::modules::error::MailQueueResult;
use crate::modules::outbox::entity::{EntryStatus, QueueEntry};
use crate::modules::outbox::payload::EnqueueRequest;
use crate::modules::store::OutboxStore;
use crate::{id, raise_error, utc_now, validate_email};
use tracing::debug;

pub mod entity;
pub mod payload;

/// Validates the request and persists a new `pending` entry with no attempts consumed.
pub async fn enqueue<S: OutboxStore>(
    store: &S,
    request: EnqueueRequest,
    default_max_attempts: u32,
) -> MailQueueResult<QueueEntry> {
    if request.recipients.is_empty() {
        return Err(raise_error!(
            "At least one recipient is required.".into(),
            ErrorCode::InvalidParameter
        ));
    }
    for recipient in &request.recipients {
        validate_email!(recipient)?;
    }
    if let Some(account_id) = request.account_id {
        store
            .get_tenant_account(account_id, request.tenant_id)
            .await?
            .ok_or_else(|| {
                raise_error!(
                    format!(
                        "Mail account {} not found for tenant {}",
                        account_id, request.tenant_id
                    ),
                    ErrorCode::ResourceNotFound
                )
            })?;
    }

    let now = utc_now!();
    let entry = QueueEntry {
        id: id!(),
        tenant_id: request.tenant_id,
        account_id: request.account_id,
        delivery_account_id: None,
        category: request.category.unwrap_or_default(),
        recipients: request.recipients,
        subject: request.subject,
        body: request.body,
        is_html: request.is_html,
        status: EntryStatus::Pending,
        attempts: 0,
        max_attempts: request.max_attempts.unwrap_or(default_max_attempts).max(1),
        last_error: None,
        not_before: request.not_before,
        sent_at: None,
        created_at: now,
        updated_at: now,
    };
    store.create_entry(entry.clone()).await?;
    debug!(
        "Queued entry {} for tenant {} ({:?}, {} recipient(s))",
        entry.id,
        entry.tenant_id,
        entry.category,
        entry.recipients.len()
    );
    Ok(entry)
}
