// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::logger::{parse_log_level, LocalTimer};
use crate::modules::settings::cli::SETTINGS;
use crate::modules::settings::dir::DataLayout;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;

/// Keeps the non-blocking writer flushing for the life of the process.
pub static LOG_WORKER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

pub fn setup_file_logger() -> Result<(), tracing::dispatcher::SetGlobalDefaultError> {
    let level = parse_log_level(&SETTINGS.mailqueue_log_level);
    let with_ansi = SETTINGS.mailqueue_ansi_logs;

    let log_dir = DataLayout::from_settings(&SETTINGS).log_dir();
    let (server_nonb, server_guard) = match server_log_writer(log_dir.clone()) {
        Ok(writer) => writer,
        Err(e) => {
            eprintln!("Failed to open log directory {:?}: {}", log_dir, e);
            std::process::exit(1);
        }
    };
    let _ = LOG_WORKER_GUARD.set(server_guard);

    let server_layer = fmt::layer()
        .with_timer(LocalTimer)
        .with_ansi(with_ansi)
        .with_level(true)
        .with_writer(server_nonb)
        .with_target(true);

    let subscriber = tracing_subscriber::registry()
        .with(LevelFilter::from_level(level))
        .with(server_layer);

    tracing::subscriber::set_global_default(subscriber)
}

fn server_log_writer(
    log_dir: PathBuf,
) -> Result<(NonBlocking, WorkerGuard), tracing_appender::rolling::InitError> {
    let rolling = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("server")
        .max_log_files(SETTINGS.mailqueue_max_server_log_files)
        .build(log_dir)?;
    Ok(tracing_appender::non_blocking(rolling))
}
