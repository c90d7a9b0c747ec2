// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

pub mod account;
pub mod common;
pub mod database;
pub mod dispatch;
pub mod error;
pub mod logger;
pub mod metrics;
pub mod outbox;
pub mod poller;
pub mod rest;
pub mod scheduler;
pub mod settings;
pub mod smtp;
pub mod store;
pub mod utils;
pub mod vault;
