// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use native_db::*;
use native_model::{native_model, Model};
use poem_openapi::{Enum, Object};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// One outbound message and its delivery lifecycle.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, Object)]
#[native_model(id = 1, version = 1)]
#[native_db(
    primary_key(pk -> String),
    secondary_key(status_code -> u32),
    secondary_key(tenant_status -> String),
    secondary_key(account_status -> String),
    secondary_key(delivery_sent -> Option<String>, optional)
)]
pub struct QueueEntry {
    #[secondary_key(unique)]
    pub id: u64,
    #[secondary_key]
    pub tenant_id: u64,
    /// Explicit mail account. `None` routes through the tenant's default account.
    pub account_id: Option<u64>,
    /// Account the entry was last handed to, recorded when it enters `processing`.
    pub delivery_account_id: Option<u64>,
    pub category: EmailCategory,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub is_html: bool,
    pub status: EntryStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub last_error: Option<String>,
    /// Not eligible for dispatch before this instant (UNIX epoch milliseconds).
    pub not_before: Option<i64>,
    pub sent_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl QueueEntry {
    fn pk(&self) -> String {
        format!("{}_{}", self.created_at, self.id)
    }

    pub fn status_code(&self) -> u32 {
        self.status.code()
    }

    pub fn tenant_status(&self) -> String {
        Self::tenant_status_key(self.tenant_id, &self.status)
    }

    pub fn account_status(&self) -> String {
        Self::account_status_key(self.account_id.unwrap_or(0), &self.status)
    }

    /// Set only once sent: delivery account, then send time.
    pub fn delivery_sent(&self) -> Option<String> {
        match (self.status == EntryStatus::Sent, self.delivery_account_id, self.sent_at) {
            (true, Some(account_id), Some(sent_at)) => {
                Some(Self::delivery_sent_key(account_id, sent_at))
            }
            _ => None,
        }
    }

    pub fn tenant_status_key(tenant_id: u64, status: &EntryStatus) -> String {
        format!("{}:{}", tenant_id, status.code())
    }

    pub fn account_status_key(account_id: u64, status: &EntryStatus) -> String {
        format!("{}:{}", account_id, status.code())
    }

    /// Fixed width, so lexical order within one account is send-time order.
    pub fn delivery_sent_key(account_id: u64, sent_at: i64) -> String {
        format!("{:020}:{:020}", account_id, sent_at.max(0))
    }

    /// Pending and past its not-before instant, if any.
    pub fn is_due(&self, now: i64) -> bool {
        self.status == EntryStatus::Pending && self.not_before.map_or(true, |t| t <= now)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn mark_processing(&mut self, account_id: u64, now: i64) {
        self.status = EntryStatus::Processing;
        self.delivery_account_id = Some(account_id);
        self.updated_at = now;
    }

    pub fn mark_sent(&mut self, now: i64) {
        self.status = EntryStatus::Sent;
        self.sent_at = Some(now);
        self.updated_at = now;
    }

    /// Consumes one attempt. The entry returns to `pending` while attempts
    /// remain and becomes terminal `failed` once the ceiling is reached.
    pub fn record_failure(&mut self, error: String, now: i64) {
        self.attempts = (self.attempts + 1).min(self.max_attempts);
        self.last_error = Some(error);
        self.status = if self.attempts >= self.max_attempts {
            EntryStatus::Failed
        } else {
            EntryStatus::Pending
        };
        self.updated_at = now;
    }

    /// Returns an entry stranded in `processing` to `pending` without
    /// consuming an attempt.
    pub fn requeue(&mut self, now: i64) {
        self.status = EntryStatus::Pending;
        self.updated_at = now;
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize, Enum)]
pub enum EntryStatus {
    /// Waiting for a dispatch cycle.
    #[default]
    Pending,
    /// Handed to the transport; outcome not recorded yet.
    Processing,
    /// Delivered. Terminal.
    Sent,
    /// Attempt ceiling reached. Terminal.
    Failed,
}

impl EntryStatus {
    pub fn code(&self) -> u32 {
        match self {
            EntryStatus::Pending => 1,
            EntryStatus::Processing => 2,
            EntryStatus::Sent => 3,
            EntryStatus::Failed => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EntryStatus::Sent | EntryStatus::Failed)
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status_str = match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Processing => "processing",
            EntryStatus::Sent => "sent",
            EntryStatus::Failed => "failed",
        };
        write!(f, "{}", status_str)
    }
}

/// Informational tag. Dispatch treats every category the same way.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, Enum)]
pub enum EmailCategory {
    PasswordReset,
    Invitation,
    Notification,
    StockAlert,
    WarehouseBill,
    #[default]
    Custom,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(attempts: u32, max_attempts: u32) -> QueueEntry {
        QueueEntry {
            id: 1,
            tenant_id: 7,
            recipients: vec!["a@x.com".into()],
            attempts,
            max_attempts,
            ..Default::default()
        }
    }

    #[test]
    fn failure_below_ceiling_returns_to_pending() {
        let mut e = entry(0, 3);
        e.mark_processing(9, 10);
        e.record_failure("boom".into(), 11);
        assert_eq!(e.status, EntryStatus::Pending);
        assert_eq!(e.attempts, 1);
        assert_eq!(e.last_error.as_deref(), Some("boom"));
    }

    #[test]
    fn failure_at_last_attempt_is_terminal() {
        let mut e = entry(2, 3);
        e.mark_processing(9, 10);
        e.record_failure("boom".into(), 11);
        assert_eq!(e.status, EntryStatus::Failed);
        assert_eq!(e.attempts, 3);
        assert!(e.is_terminal());
    }

    #[test]
    fn attempts_never_exceed_ceiling() {
        let mut e = entry(3, 3);
        e.record_failure("again".into(), 1);
        assert_eq!(e.attempts, 3);
        assert_eq!(e.status, EntryStatus::Failed);
    }

    #[test]
    fn due_respects_not_before() {
        let mut e = entry(0, 3);
        assert!(e.is_due(100));
        e.not_before = Some(200);
        assert!(!e.is_due(100));
        assert!(e.is_due(200));
        e.status = EntryStatus::Processing;
        assert!(!e.is_due(300));
    }

    #[test]
    fn sent_stamps_time_once() {
        let mut e = entry(0, 3);
        e.mark_processing(4, 10);
        assert_eq!(e.delivery_account_id, Some(4));
        e.mark_sent(42);
        assert_eq!(e.status, EntryStatus::Sent);
        assert_eq!(e.sent_at, Some(42));
    }

    #[test]
    fn secondary_keys_distinguish_tenants() {
        let e = entry(0, 3);
        assert_eq!(e.tenant_status(), "7:1");
        assert_eq!(e.account_status(), "0:1");
        assert_ne!(
            QueueEntry::tenant_status_key(1, &EntryStatus::Pending),
            QueueEntry::tenant_status_key(11, &EntryStatus::Pending)
        );
    }

    #[test]
    fn only_sent_entries_carry_a_delivery_key() {
        let mut e = entry(0, 3);
        assert_eq!(e.delivery_sent(), None);
        e.mark_processing(4, 10);
        assert_eq!(e.delivery_sent(), None);
        e.mark_sent(42);
        assert_eq!(
            e.delivery_sent().as_deref(),
            Some("00000000000000000004:00000000000000000042")
        );
        assert!(QueueEntry::delivery_sent_key(4, 999) < QueueEntry::delivery_sent_key(4, 1_000));
        assert!(QueueEntry::delivery_sent_key(4, i64::MAX) < QueueEntry::delivery_sent_key(5, 0));
    }
}
