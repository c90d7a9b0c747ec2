// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::LazyLock;

use crate::{mailqueue_version, utc_now};
use prometheus::{
    register_gauge, register_gauge_vec, register_histogram_vec, register_int_counter,
    register_int_counter_vec, Gauge, GaugeVec, HistogramVec, IntCounter, IntCounterVec,
};

pub mod endpoint;

/// Send outcomes. A `retry` is a failed attempt that leaves the entry pending.
pub const SENT: &str = "sent";
pub const RETRY: &str = "retry";
pub const FAILED: &str = "failed";

// Group skip reasons
pub const NO_ACCOUNT: &str = "no_account";
pub const INACTIVE: &str = "inactive";
pub const CREDENTIAL: &str = "credential";

pub const METRIC_REQUEST_DURATION_BY_METHOD_AND_OPERATION: &str =
    "mailqueue_request_duration_seconds_by_method_and_operation";
pub const METRIC_REQUEST_TOTAL_BY_METHOD_AND_OPERATION: &str =
    "mailqueue_request_total_by_method_and_operation";
pub const METRIC_EMAIL_SEND_TOTAL: &str = "mailqueue_email_send_total";
pub const METRIC_EMAIL_SEND_DURATION_SECONDS: &str = "mailqueue_email_send_duration_seconds";
pub const METRIC_QUOTA_DEFERRED_TOTAL: &str = "mailqueue_quota_deferred_total";
pub const METRIC_GROUP_SKIPPED_TOTAL: &str = "mailqueue_group_skipped_total";
pub const METRIC_SWEEP_TOTAL: &str = "mailqueue_sweep_total";
pub const METRIC_BUILD_INFO: &str = "mailqueue_build_info";
pub const METRIC_START_TIMESTAMP: &str = "mailqueue_start_timestamp";

pub static MAILQUEUE_BUILD_INFO: LazyLock<GaugeVec> = LazyLock::new(|| {
    register_gauge_vec!(
        METRIC_BUILD_INFO,
        "Build information including version and commit hash",
        &["version", "commit"]
    )
    .expect("Failed to register mailqueue_build_info")
});

pub static MAILQUEUE_START_TIMESTAMP: LazyLock<Gauge> = LazyLock::new(|| {
    register_gauge!(
        METRIC_START_TIMESTAMP,
        "Unix timestamp (milliseconds) when the service started"
    )
    .expect("Failed to register mailqueue_start_timestamp")
});

pub static MAILQUEUE_REQUEST_DURATION_BY_METHOD_AND_OPERATION: LazyLock<HistogramVec> =
    LazyLock::new(|| {
        register_histogram_vec!(
            METRIC_REQUEST_DURATION_BY_METHOD_AND_OPERATION,
            "Distribution of HTTP request durations, measured in seconds, grouped by method, operation ID, and status code",
            &["method", "operation_id", "status"]
        )
        .expect("Failed to register request_duration_seconds_by_method_and_operation")
    });

pub static MAILQUEUE_REQUEST_TOTAL_BY_METHOD_AND_OPERATION: LazyLock<IntCounterVec> =
    LazyLock::new(|| {
        register_int_counter_vec!(
            METRIC_REQUEST_TOTAL_BY_METHOD_AND_OPERATION,
            "Total number of HTTP requests, grouped by method, operation ID, and status code",
            &["method", "operation_id", "status"]
        )
        .expect("Failed to register request_total_by_method_and_operation")
    });

pub static MAILQUEUE_EMAIL_SEND_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        METRIC_EMAIL_SEND_TOTAL,
        "Total number of send attempts, grouped by outcome (sent, retry, failed)",
        &["outcome"]
    )
    .expect("Failed to register mailqueue_email_send_total")
});

pub static MAILQUEUE_EMAIL_SEND_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        METRIC_EMAIL_SEND_DURATION_SECONDS,
        "Distribution of SMTP conversation durations, measured in seconds",
        &["outcome"],
        vec![0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0, 30.0, 60.0]
    )
    .expect("Failed to register email_send_duration_seconds")
});

pub static MAILQUEUE_QUOTA_DEFERRED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        METRIC_QUOTA_DEFERRED_TOTAL,
        "Total number of due entries left pending because their account's hourly quota was exhausted"
    )
    .expect("Failed to register mailqueue_quota_deferred_total")
});

pub static MAILQUEUE_GROUP_SKIPPED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        METRIC_GROUP_SKIPPED_TOTAL,
        "Total number of account groups skipped for configuration reasons",
        &["reason"]
    )
    .expect("Failed to register mailqueue_group_skipped_total")
});

pub static MAILQUEUE_SWEEP_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(METRIC_SWEEP_TOTAL, "Total number of completed poller sweeps")
        .expect("Failed to register mailqueue_sweep_total")
});

/// Stamps the build and start-time gauges. Call once at startup.
pub fn record_build_info() {
    MAILQUEUE_START_TIMESTAMP.set(utc_now!() as f64);
    MAILQUEUE_BUILD_INFO
        .with_label_values(&[mailqueue_version!(), env!("GIT_HASH")])
        .set(1.0);
}
