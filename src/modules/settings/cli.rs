// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use clap::{builder::ValueParser, Parser};
use std::{path::PathBuf, sync::LazyLock};

#[cfg(not(test))]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::parse);

#[cfg(test)]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::new_for_test);

#[derive(Debug, Parser)]
#[clap(
    name = "mailqueue",
    about = "A multi-tenant outbound email queue that delivers through each tenant's own SMTP accounts,
    honoring a per-account hourly sending quota.",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Settings {
    /// mailqueue log level (default: "info")
    #[clap(
        long,
        default_value = "info",
        env,
        help = "Set the log level for mailqueue"
    )]
    pub mailqueue_log_level: String,

    /// mailqueue HTTP port (default: 15630)
    #[clap(
        long,
        default_value = "15630",
        env,
        help = "Set the HTTP port for mailqueue"
    )]
    pub mailqueue_http_port: i32,

    /// The IP address the HTTP server binds to, in IPv4 format (e.g., 192.168.1.1).
    #[clap(
        long,
        env,
        default_value = "0.0.0.0",
        help = "The IP address the HTTP server binds to, in IPv4 format (e.g., 192.168.1.1).",
        value_parser = ValueParser::new(|s: &str| {
            if s.parse::<std::net::Ipv4Addr>().is_err() {
                return Err("The bind IP address must be a valid IPv4 address.".to_string());
            }
            Ok(s.to_string())
        })
    )]
    pub mailqueue_bind_ip: Option<String>,

    /// Enable ANSI logs (default: true)
    #[clap(long, default_value = "true", env, help = "Enable ANSI formatted logs")]
    pub mailqueue_ansi_logs: bool,

    /// Enable log file output (default: false)
    /// If false, logs will be printed to stdout
    #[clap(
        long,
        default_value = "false",
        env,
        help = "Enable log file output (otherwise logs go to stdout)"
    )]
    pub mailqueue_log_to_file: bool,

    /// Enable JSON logs (default: false)
    #[clap(
        long,
        default_value = "false",
        env,
        help = "Enable JSON formatted logs"
    )]
    pub mailqueue_json_logs: bool,

    /// Maximum number of log files (default: 5)
    #[clap(
        long,
        default_value = "5",
        env,
        help = "Set the maximum number of server log files"
    )]
    pub mailqueue_max_server_log_files: usize,

    /// Key material for the SMTP credential vault
    #[clap(
        long,
        default_value = "change-this-default-password-now",
        env,
        help = "Set the password SMTP credentials are encrypted with. ⚠️ Change this default in production!"
    )]
    pub mailqueue_encrypt_password: String,

    #[clap(
        long,
        env,
        help = "Set the data directory for mailqueue",
        value_parser = ValueParser::new(|s: &str| {
            let path = PathBuf::from(s);
            if !path.is_absolute() {
                return Err("Path must be an absolute directory path".to_string());
            }
            if !path.exists() {
                return Err(format!("Path {:?} does not exist", path));
            }
            if !path.is_dir() {
                return Err(format!("Path {:?} is not a directory", path));
            }
            Ok(s.to_string())
        })
    )]
    pub mailqueue_root_dir: String,

    #[clap(
        long,
        env,
        default_value = "134217728",
        help = "Set the cache size for the outbox database in bytes (minimum 64MB)"
    )]
    pub mailqueue_db_cache_size: Option<u64>,

    #[clap(
        long,
        env,
        default_value = "false",
        help = "Keep the outbox in memory only. Queued mail is lost on restart"
    )]
    pub mailqueue_memory_mode_enabled: bool,

    #[clap(
        long,
        env,
        default_value = "10",
        help = "Seconds between two queue sweeps (minimum: 1)",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub mailqueue_poll_interval_secs: u64,

    #[clap(
        long,
        env,
        default_value = "100",
        help = "Maximum number of due entries fetched per tenant in one sweep",
        value_parser = ValueParser::new(|s: &str| {
            let value: usize = s.parse().map_err(|_| format!("Invalid batch size: {}", s))?;
            if value < 1 {
                return Err("Batch size must be at least 1".to_string());
            }
            Ok(value)
        })
    )]
    pub mailqueue_batch_size: usize,

    #[clap(
        long,
        env,
        default_value = "60",
        help = "Deadline in seconds for one complete SMTP conversation",
        value_parser = clap::value_parser!(u64).range(1..=600)
    )]
    pub mailqueue_send_timeout_secs: u64,

    #[clap(
        long,
        env,
        default_value = "80",
        help = "Hourly quota given to mail accounts created without one"
    )]
    pub mailqueue_default_hourly_quota: u32,

    #[clap(
        long,
        env,
        default_value = "3",
        help = "Delivery attempts given to entries enqueued without a limit",
        value_parser = clap::value_parser!(u32).range(1..=20)
    )]
    pub mailqueue_default_max_attempts: u32,
}

impl Settings {
    #[cfg(test)]
    pub fn new_for_test() -> Self {
        Self {
            mailqueue_log_level: "info".to_string(),
            mailqueue_http_port: 15630,
            mailqueue_bind_ip: Default::default(),
            mailqueue_ansi_logs: false,
            mailqueue_json_logs: false,
            mailqueue_log_to_file: false,
            mailqueue_max_server_log_files: 5,
            mailqueue_encrypt_password: "change-this-default-password-now".into(),
            mailqueue_root_dir: std::env::temp_dir()
                .join("mailqueue_data")
                .to_string_lossy()
                .into_owned(),
            mailqueue_db_cache_size: None,
            mailqueue_memory_mode_enabled: true,
            mailqueue_poll_interval_secs: 10,
            mailqueue_batch_size: 100,
            mailqueue_send_timeout_secs: 60,
            mailqueue_default_hourly_quota: 80,
            mailqueue_default_max_attempts: 3,
        }
    }
}
