// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use itertools::Itertools;
use native_db::Database;

use crate::modules::account::entity::{MailAccount, MailAccountKey};
use crate::modules::database::{
    batch_update_impl, filter_by_secondary_key_impl, insert_impl, range_by_secondary_key_impl,
    secondary_find_impl, update_impl, with_rw_impl,
};
use crate::modules::error::code::ErrorCode;
use crate::modules::error::MailQueueResult;
use crate::modules::outbox::entity::{EntryStatus, QueueEntry, QueueEntryKey};
use crate::modules::store::OutboxStore;
use crate::{raise_error, utc_now};

/// `OutboxStore` over an embedded native_db database.
#[derive(Clone)]
pub struct NativeDbOutboxStore {
    database: Arc<Database<'static>>,
}

impl NativeDbOutboxStore {
    pub fn new(database: Arc<Database<'static>>) -> Self {
        Self { database }
    }

    fn due_oldest_first(entries: Vec<QueueEntry>, limit: usize, now: i64) -> Vec<QueueEntry> {
        entries
            .into_iter()
            .filter(|e| e.is_due(now))
            .sorted_by_key(|e| (e.created_at, e.id))
            .take(limit)
            .collect()
    }
}

impl OutboxStore for NativeDbOutboxStore {
    async fn create_entry(&self, entry: QueueEntry) -> MailQueueResult<()> {
        insert_impl(&self.database, entry).await
    }

    async fn get_entry(&self, id: u64) -> MailQueueResult<Option<QueueEntry>> {
        secondary_find_impl(&self.database, QueueEntryKey::id, id).await
    }

    async fn pending_for_tenant(
        &self,
        tenant_id: u64,
        limit: usize,
        now: i64,
    ) -> MailQueueResult<Vec<QueueEntry>> {
        let entries = filter_by_secondary_key_impl::<QueueEntry>(
            &self.database,
            QueueEntryKey::tenant_status,
            QueueEntry::tenant_status_key(tenant_id, &EntryStatus::Pending),
        )
        .await?;
        Ok(Self::due_oldest_first(entries, limit, now))
    }

    async fn pending_for_account(
        &self,
        account_id: u64,
        limit: usize,
        now: i64,
    ) -> MailQueueResult<Vec<QueueEntry>> {
        let entries = filter_by_secondary_key_impl::<QueueEntry>(
            &self.database,
            QueueEntryKey::account_status,
            QueueEntry::account_status_key(account_id, &EntryStatus::Pending),
        )
        .await?;
        Ok(Self::due_oldest_first(entries, limit, now))
    }

    async fn tenants_with_pending(&self, now: i64) -> MailQueueResult<Vec<u64>> {
        let entries = filter_by_secondary_key_impl::<QueueEntry>(
            &self.database,
            QueueEntryKey::status_code,
            EntryStatus::Pending.code(),
        )
        .await?;
        Ok(entries
            .into_iter()
            .filter(|e| e.is_due(now))
            .map(|e| e.tenant_id)
            .unique()
            .sorted()
            .collect())
    }

    async fn update_entry(&self, entry: QueueEntry) -> MailQueueResult<()> {
        let id = entry.id;
        update_impl(
            &self.database,
            move |rw| {
                rw.get()
                    .secondary::<QueueEntry>(QueueEntryKey::id, id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::StorageError))?
                    .ok_or_else(|| {
                        raise_error!(
                            format!("Queue entry {} not found", id),
                            ErrorCode::ResourceNotFound
                        )
                    })
            },
            move |_| Ok(entry),
        )
        .await?;
        Ok(())
    }

    async fn count_sent_in_window(
        &self,
        account_id: u64,
        since: i64,
        until: i64,
    ) -> MailQueueResult<u32> {
        if until <= since {
            return Ok(0);
        }
        let sent = range_by_secondary_key_impl::<QueueEntry, Option<String>>(
            &self.database,
            QueueEntryKey::delivery_sent,
            Some(QueueEntry::delivery_sent_key(
                account_id,
                since.saturating_add(1),
            )),
            Some(QueueEntry::delivery_sent_key(account_id, until)),
        )
        .await?;
        Ok(sent.len() as u32)
    }

    async fn get_account(&self, id: u64) -> MailQueueResult<Option<MailAccount>> {
        secondary_find_impl(&self.database, MailAccountKey::id, id).await
    }

    async fn get_tenant_account(
        &self,
        id: u64,
        tenant_id: u64,
    ) -> MailQueueResult<Option<MailAccount>> {
        Ok(self
            .get_account(id)
            .await?
            .filter(|account| account.tenant_id == tenant_id))
    }

    async fn default_account(&self, tenant_id: u64) -> MailQueueResult<Option<MailAccount>> {
        let accounts = filter_by_secondary_key_impl::<MailAccount>(
            &self.database,
            MailAccountKey::tenant_id,
            tenant_id,
        )
        .await?;
        Ok(accounts.into_iter().find(|a| a.is_default))
    }

    async fn save_account(&self, account: MailAccount) -> MailQueueResult<()> {
        with_rw_impl(&self.database, move |rw| {
            if account.is_default {
                let siblings: Vec<MailAccount> = rw
                    .scan()
                    .secondary(MailAccountKey::tenant_id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::StorageError))?
                    .start_with(account.tenant_id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::StorageError))?
                    .try_collect()
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::StorageError))?;
                for sibling in siblings
                    .into_iter()
                    .filter(|a| a.is_default && a.id != account.id)
                {
                    let mut cleared = sibling.clone();
                    cleared.is_default = false;
                    cleared.updated_at = utc_now!();
                    rw.update(sibling, cleared)
                        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::StorageError))?;
                }
            }

            let existing: Option<MailAccount> = rw
                .get()
                .secondary(MailAccountKey::id, account.id)
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::StorageError))?;
            let written = match existing {
                Some(current) => rw.update(current, account),
                None => rw.insert(account),
            };
            written.map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::StorageError))
        })
        .await
    }

    async fn requeue_processing(&self, updated_before: i64, now: i64) -> MailQueueResult<usize> {
        let moved = batch_update_impl(
            &self.database,
            move |rw| {
                let processing: Vec<QueueEntry> = rw
                    .scan()
                    .secondary(QueueEntryKey::status_code)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::StorageError))?
                    .start_with(EntryStatus::Processing.code())
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::StorageError))?
                    .try_collect()
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::StorageError))?;
                Ok(processing
                    .into_iter()
                    .filter(|e| e.updated_at <= updated_before)
                    .collect())
            },
            move |stranded: &Vec<QueueEntry>| {
                Ok(stranded
                    .iter()
                    .map(|entry| {
                        let mut requeued = entry.clone();
                        requeued.requeue(now);
                        (entry.clone(), requeued)
                    })
                    .collect())
            },
        )
        .await?;
        Ok(moved.len())
    }
}
