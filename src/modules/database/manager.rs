// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::database::OUTBOX_MODELS;
use crate::modules::error::{code::ErrorCode, MailQueueError, MailQueueResult};
use crate::modules::settings::cli::Settings;
use crate::modules::settings::dir::DataLayout;
use crate::raise_error;
use native_db::{Builder, Database};
use std::sync::Arc;
use tracing::info;

const DEFAULT_CACHE_SIZE: u64 = 134217728;
const MIN_CACHE_SIZE: u64 = 67108864;

pub struct DatabaseManager;

impl DatabaseManager {
    /// Opens the outbox database: in memory for ephemeral runs, otherwise
    /// a file under the data directory.
    pub fn open(settings: &Settings) -> MailQueueResult<Arc<Database<'static>>> {
        if settings.mailqueue_memory_mode_enabled {
            info!("Outbox database running in memory; queued mail will not survive a restart");
            return Self::open_in_memory();
        }
        let path = DataLayout::from_settings(settings).outbox_db();
        info!("Opening outbox database at: {:?}", &path);
        let mut database = Builder::new()
            .set_cache_size(
                settings
                    .mailqueue_db_cache_size
                    .unwrap_or(DEFAULT_CACHE_SIZE)
                    .max(MIN_CACHE_SIZE) as usize,
            )
            .create(&OUTBOX_MODELS, path)
            .map_err(Self::handle_database_error)?;
        database
            .compact()
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::StorageError))?;
        Ok(Arc::new(database))
    }

    pub fn open_in_memory() -> MailQueueResult<Arc<Database<'static>>> {
        let database = Builder::new()
            .create_in_memory(&OUTBOX_MODELS)
            .map_err(Self::handle_database_error)?;
        Ok(Arc::new(database))
    }

    fn handle_database_error(error: native_db::db_type::Error) -> MailQueueError {
        let message = format!("{:?}", error);
        if message.contains("DatabaseAlreadyOpen") {
            raise_error!(
                "Database is already open by another instance".into(),
                ErrorCode::StorageError
            )
        } else {
            raise_error!(
                format!("Failed to create database: {}", message),
                ErrorCode::StorageError
            )
        }
    }
}
