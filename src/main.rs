// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use modules::{
    common::signal::forward_os_signals,
    database::manager::DatabaseManager,
    dispatch::{DispatchConfig, DispatchEngine},
    error::MailQueueResult,
    logger,
    metrics::record_build_info,
    poller::QueuePoller,
    rest::{api::ApiContext, start_http_server},
    settings::{cli::SETTINGS, dir::DataLayout},
    smtp::transport::{install_crypto_provider, SmtpTransport},
    store::nativedb::NativeDbOutboxStore,
    vault::AesGcmVault,
};
use tracing::{error, info};

mod modules;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> MailQueueResult<()> {
    logger::initialize_logging();
    info!("Starting mailqueue-server");
    info!("Version:  {}", mailqueue_version!());
    info!("Git:      [{}]", env!("GIT_HASH"));

    if let Err(error) = initialize() {
        eprintln!("{:?}", error);
        return Err(error);
    }

    let database = DatabaseManager::open(&SETTINGS)?;
    let store = Arc::new(NativeDbOutboxStore::new(database));
    let vault = Arc::new(AesGcmVault::new(SETTINGS.mailqueue_encrypt_password.clone()));
    let transport = Arc::new(SmtpTransport::new(Duration::from_secs(
        SETTINGS.mailqueue_send_timeout_secs,
    )));

    let engine = Arc::new(DispatchEngine::new(
        store.clone(),
        vault.clone(),
        transport,
        DispatchConfig::from_settings(&SETTINGS),
    ));
    let poller = QueuePoller::new(
        engine,
        Duration::from_secs(SETTINGS.mailqueue_poll_interval_secs),
    )
    .start()
    .await?;

    let context = ApiContext {
        store,
        vault,
        default_hourly_quota: SETTINGS.mailqueue_default_hourly_quota,
        default_max_attempts: SETTINGS.mailqueue_default_max_attempts,
    };
    let served = start_http_server(context).await;
    if let Err(e) = &served {
        error!("REST server stopped with error: {}", e);
    }

    poller.stop().await;
    info!("mailqueue-server stopped");
    served
}

/// Process-wide setup that must complete before the store is opened.
fn initialize() -> MailQueueResult<()> {
    forward_os_signals();
    if !SETTINGS.mailqueue_memory_mode_enabled {
        DataLayout::from_settings(&SETTINGS).prepare()?;
    }
    install_crypto_provider()?;
    record_build_info();
    Ok(())
}
