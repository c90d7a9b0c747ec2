// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::future::Future;

use crate::modules::account::entity::MailAccount;
use crate::modules::error::MailQueueResult;
use crate::modules::outbox::entity::QueueEntry;

pub mod nativedb;

/// Persistence contract of the outbox.
///
/// Implementations must give read-your-writes consistency for a single entry
/// updated by a single processor; no multi-entry transaction is assumed.
/// All `pending_*` queries return only due entries (`pending` and past their
/// not-before instant), oldest first.
pub trait OutboxStore: Send + Sync {
    fn create_entry(&self, entry: QueueEntry) -> impl Future<Output = MailQueueResult<()>> + Send;

    fn get_entry(
        &self,
        id: u64,
    ) -> impl Future<Output = MailQueueResult<Option<QueueEntry>>> + Send;

    fn pending_for_tenant(
        &self,
        tenant_id: u64,
        limit: usize,
        now: i64,
    ) -> impl Future<Output = MailQueueResult<Vec<QueueEntry>>> + Send;

    /// Due entries that name `account_id` explicitly.
    fn pending_for_account(
        &self,
        account_id: u64,
        limit: usize,
        now: i64,
    ) -> impl Future<Output = MailQueueResult<Vec<QueueEntry>>> + Send;

    /// Distinct tenants with at least one due entry, ascending.
    fn tenants_with_pending(
        &self,
        now: i64,
    ) -> impl Future<Output = MailQueueResult<Vec<u64>>> + Send;

    fn update_entry(&self, entry: QueueEntry) -> impl Future<Output = MailQueueResult<()>> + Send;

    /// Entries delivered through `account_id` with `sent_at` in `(since, until]`.
    fn count_sent_in_window(
        &self,
        account_id: u64,
        since: i64,
        until: i64,
    ) -> impl Future<Output = MailQueueResult<u32>> + Send;

    fn get_account(
        &self,
        id: u64,
    ) -> impl Future<Output = MailQueueResult<Option<MailAccount>>> + Send;

    /// `None` unless the account exists and belongs to `tenant_id`.
    fn get_tenant_account(
        &self,
        id: u64,
        tenant_id: u64,
    ) -> impl Future<Output = MailQueueResult<Option<MailAccount>>> + Send;

    fn default_account(
        &self,
        tenant_id: u64,
    ) -> impl Future<Output = MailQueueResult<Option<MailAccount>>> + Send;

    /// Inserts or replaces an account. Saving a default account clears the
    /// flag on the tenant's previous default.
    fn save_account(
        &self,
        account: MailAccount,
    ) -> impl Future<Output = MailQueueResult<()>> + Send;

    /// Returns `processing` entries last touched at or before `updated_before`
    /// to `pending` without consuming an attempt. Returns the number moved.
    fn requeue_processing(
        &self,
        updated_before: i64,
        now: i64,
    ) -> impl Future<Output = MailQueueResult<usize>> + Send;
}
