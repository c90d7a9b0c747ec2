// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

/// Outcome of one account group within a dispatch pass.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GroupReport {
    pub account_id: u64,
    pub sent: usize,
    /// Failed attempts that left the entry pending.
    pub retried: usize,
    /// Failed attempts that made the entry terminal.
    pub failed: usize,
    /// Due entries left pending because the hourly quota ran out.
    pub deferred: usize,
    /// Transitions that could not be persisted.
    pub store_errors: usize,
}

impl GroupReport {
    pub fn new(account_id: u64) -> Self {
        Self {
            account_id,
            ..Default::default()
        }
    }

    pub fn attempted(&self) -> usize {
        self.sent + self.retried + self.failed
    }
}

/// Outcome of `process_tenant`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TenantReport {
    pub tenant_id: u64,
    pub fetched: usize,
    pub sent: usize,
    pub retried: usize,
    pub failed: usize,
    pub deferred: usize,
    pub store_errors: usize,
    /// Groups not processed: missing, inactive or undecryptable account.
    pub skipped_groups: usize,
    pub skipped_entries: usize,
}

impl TenantReport {
    pub fn new(tenant_id: u64) -> Self {
        Self {
            tenant_id,
            ..Default::default()
        }
    }

    pub fn absorb(&mut self, group: &GroupReport) {
        self.sent += group.sent;
        self.retried += group.retried;
        self.failed += group.failed;
        self.deferred += group.deferred;
        self.store_errors += group.store_errors;
    }

    pub fn skip(&mut self, entries: usize) {
        self.skipped_groups += 1;
        self.skipped_entries += entries;
    }

    pub fn attempted(&self) -> usize {
        self.sent + self.retried + self.failed
    }
}
