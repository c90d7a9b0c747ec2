// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::account::entity::MailAccount;
use crate::modules::error::code::ErrorCode;
use crate::modules::error::MailQueueResult;
use crate::modules::outbox::entity::QueueEntry;
use crate::raise_error;
use db_type::{KeyOptions, ToKeyDefinition};
use itertools::Itertools;
use native_db::*;
use std::sync::{Arc, LazyLock};
use transaction::RwTransaction;

pub mod manager;

pub static OUTBOX_MODELS: LazyLock<Models> = LazyLock::new(|| {
    let mut adapter = ModelsAdapter::new();
    adapter.register_outbox_models();
    adapter.models
});

pub struct ModelsAdapter {
    pub models: Models,
}

impl ModelsAdapter {
    pub fn new() -> Self {
        ModelsAdapter {
            models: Models::new(),
        }
    }

    pub fn register_model<T: ToInput>(&mut self) {
        self.models.define::<T>().expect("failed to define model");
    }

    pub fn register_outbox_models(&mut self) {
        self.register_model::<QueueEntry>();
        self.register_model::<MailAccount>();
    }
}

macro_rules! storage_error {
    ($e:expr) => {
        raise_error!(format!("{:#?}", $e), ErrorCode::StorageError)
    };
}

pub async fn insert_impl<T: ToInput + Clone + Send + 'static>(
    database: &Arc<Database<'static>>,
    item: T,
) -> MailQueueResult<()> {
    let db = database.clone();
    tokio::task::spawn_blocking(move || {
        let rw_transaction = db.rw_transaction().map_err(|e| storage_error!(e))?;
        rw_transaction.insert(item).map_err(|e| storage_error!(e))?;
        rw_transaction.commit().map_err(|e| storage_error!(e))?;
        Ok(())
    })
    .await
    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
}

/// Runs `write` inside one read-write transaction and commits it.
pub async fn with_rw_impl<R: Send + 'static>(
    database: &Arc<Database<'static>>,
    write: impl FnOnce(&RwTransaction) -> MailQueueResult<R> + Send + 'static,
) -> MailQueueResult<R> {
    let db = database.clone();
    tokio::task::spawn_blocking(move || {
        let rw = db.rw_transaction().map_err(|e| storage_error!(e))?;
        let result = write(&rw)?;
        rw.commit().map_err(|e| storage_error!(e))?;
        Ok(result)
    })
    .await
    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
}

pub async fn update_impl<T: ToInput + Clone + std::fmt::Debug + Send + 'static>(
    database: &Arc<Database<'static>>,
    current: impl FnOnce(&RwTransaction) -> MailQueueResult<T> + Send + 'static,
    updated: impl FnOnce(&T) -> MailQueueResult<T> + Send + 'static,
) -> MailQueueResult<T> {
    with_rw_impl(database, move |rw| {
        let current_item = current(rw)?;
        let updated_item = updated(&current_item)?;
        rw.update(current_item.clone(), updated_item)
            .map_err(|e| storage_error!(e))?;
        Ok(current_item)
    })
    .await
}

pub async fn batch_update_impl<T: ToInput + Clone + std::fmt::Debug + Send + 'static>(
    database: &Arc<Database<'static>>,
    filter: impl FnOnce(&RwTransaction) -> MailQueueResult<Vec<T>> + Send + 'static,
    updated: impl FnOnce(&Vec<T>) -> MailQueueResult<Vec<(T, T)>> + Send + 'static,
) -> MailQueueResult<Vec<T>> {
    with_rw_impl(database, move |rw| {
        let targets = filter(rw)?;
        let tuples = updated(&targets)?;
        for (old, updated) in tuples {
            rw.update(old, updated).map_err(|e| storage_error!(e))?;
        }
        Ok(targets)
    })
    .await
}

pub async fn filter_by_secondary_key_impl<T: ToInput + Clone + Send + 'static>(
    database: &Arc<Database<'static>>,
    key_def: impl ToKeyDefinition<KeyOptions> + Send + 'static,
    start_with: impl ToKey + Send + 'static,
) -> MailQueueResult<Vec<T>> {
    let db = database.clone();
    tokio::task::spawn_blocking(move || {
        let r_transaction = db.r_transaction().map_err(|e| storage_error!(e))?;
        let entities: Vec<T> = r_transaction
            .scan()
            .secondary(key_def)
            .map_err(|e| storage_error!(e))?
            .start_with(start_with)
            .map_err(|e| storage_error!(e))?
            .try_collect()
            .map_err(|e| storage_error!(e))?;
        Ok(entities)
    })
    .await
    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
}

/// Entities whose secondary key falls in `[start, end]`.
pub async fn range_by_secondary_key_impl<T, K>(
    database: &Arc<Database<'static>>,
    key_def: impl ToKeyDefinition<KeyOptions> + Send + 'static,
    start: K,
    end: K,
) -> MailQueueResult<Vec<T>>
where
    T: ToInput + Clone + Send + 'static,
    K: ToKey + Send + 'static,
{
    let db = database.clone();
    tokio::task::spawn_blocking(move || {
        let r_transaction = db.r_transaction().map_err(|e| storage_error!(e))?;
        let entities: Vec<T> = r_transaction
            .scan()
            .secondary(key_def)
            .map_err(|e| storage_error!(e))?
            .range(start..=end)
            .map_err(|e| storage_error!(e))?
            .try_collect()
            .map_err(|e| storage_error!(e))?;
        Ok(entities)
    })
    .await
    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
}

pub async fn secondary_find_impl<T: ToInput + Clone + Send + 'static>(
    database: &Arc<Database<'static>>,
    key_def: impl ToKeyDefinition<KeyOptions> + Send + 'static,
    key: impl ToKey + Send + 'static,
) -> MailQueueResult<Option<T>> {
    let db = database.clone();
    tokio::task::spawn_blocking(move || {
        let r_transaction = db.r_transaction().map_err(|e| storage_error!(e))?;
        let entity: Option<T> = r_transaction
            .get()
            .secondary(key_def, key)
            .map_err(|e| storage_error!(e))?;
        Ok(entity)
    })
    .await
    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
}
