// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;
use std::time::{Duration, Instant};

use itertools::Itertools;
use tracing::{debug, error, info, warn};

use crate::modules::account::entity::MailAccount;
use crate::modules::dispatch::report::{GroupReport, TenantReport};
use crate::modules::error::code::ErrorCode;
use crate::modules::error::MailQueueResult;
use crate::modules::metrics::{
    CREDENTIAL, FAILED, INACTIVE, MAILQUEUE_EMAIL_SEND_DURATION_SECONDS,
    MAILQUEUE_EMAIL_SEND_TOTAL, MAILQUEUE_GROUP_SKIPPED_TOTAL, MAILQUEUE_QUOTA_DEFERRED_TOTAL,
    NO_ACCOUNT, RETRY, SENT,
};
use crate::modules::outbox::entity::{EntryStatus, QueueEntry};
use crate::modules::settings::cli::Settings;
use crate::modules::smtp::envelope::Envelope;
use crate::modules::smtp::transport::{ResolvedAccount, Transport};
use crate::modules::store::OutboxStore;
use crate::modules::vault::CredentialVault;
use crate::{raise_error, utc_now};

pub mod report;
#[cfg(test)]
mod tests;

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const QUOTA_WINDOW: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(2 * 60);

#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Most due entries fetched for one tenant per pass.
    pub batch_size: usize,
    /// Trailing window the hourly quota is counted over.
    pub quota_window: Duration,
    /// Age after which a `processing` entry is presumed abandoned.
    pub stale_after: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            quota_window: QUOTA_WINDOW,
            stale_after: DEFAULT_STALE_AFTER,
        }
    }
}

impl DispatchConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            batch_size: settings.mailqueue_batch_size.max(1),
            quota_window: QUOTA_WINDOW,
            // Must exceed the send deadline.
            stale_after: Duration::from_secs(settings.mailqueue_send_timeout_secs * 2),
        }
    }
}

/// Rate-limiting and retry logic between the outbox and the wire.
///
/// Every pass is strictly sequential: groups one after another, and sends
/// within a group one at a time, so the quota count read at the start of a
/// group can overshoot by at most the send in flight.
pub struct DispatchEngine<S, V, T> {
    store: Arc<S>,
    vault: Arc<V>,
    transport: Arc<T>,
    config: DispatchConfig,
}

impl<S, V, T> DispatchEngine<S, V, T>
where
    S: OutboxStore,
    V: CredentialVault,
    T: Transport,
{
    pub fn new(store: Arc<S>, vault: Arc<V>, transport: Arc<T>, config: DispatchConfig) -> Self {
        Self {
            store,
            vault,
            transport,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Dispatches up to one batch of the tenant's due entries.
    ///
    /// Only a failure to list the entries is returned as an error. Failures
    /// of individual groups are logged and counted in the report.
    pub async fn process_tenant(&self, tenant_id: u64) -> MailQueueResult<TenantReport> {
        let mut report = TenantReport::new(tenant_id);
        let entries = self
            .store
            .pending_for_tenant(tenant_id, self.config.batch_size, utc_now!())
            .await?;
        if entries.is_empty() {
            return Ok(report);
        }
        report.fetched = entries.len();

        // Lazily resolved, at most once per call.
        let mut default_account: Option<Option<MailAccount>> = None;
        let mut routes: Vec<(Option<u64>, MailAccount)> = Vec::new();
        for account_ref in entries.iter().map(|e| e.account_id).unique().collect::<Vec<_>>() {
            let count = entries.iter().filter(|e| e.account_id == account_ref).count();
            match self
                .resolve_account(tenant_id, account_ref, count, &mut default_account)
                .await
            {
                Some(account) => routes.push((account_ref, account)),
                None => report.skip(count),
            }
        }

        for (account, group) in group_by_resolved_account(entries, &routes) {
            match self.process_group(&group, &account).await {
                Ok(group_report) => report.absorb(&group_report),
                Err(e) => {
                    if e.code().is_configuration() {
                        warn!(
                            "Skipping {} entries of tenant {} on account {}: {}",
                            group.len(),
                            tenant_id,
                            account.id,
                            e
                        );
                    } else {
                        error!(
                            "Account group {} of tenant {} aborted: {}",
                            account.id, tenant_id, e
                        );
                    }
                    report.skip(group.len());
                }
            }
        }

        Ok(report)
    }

    /// Returns stale `processing` entries to `pending`. An entry is stale once
    /// its last write is older than `stale_after`.
    pub async fn recover_stranded(&self) -> MailQueueResult<usize> {
        let now = utc_now!();
        let cutoff = now - self.config.stale_after.as_millis() as i64;
        self.store.requeue_processing(cutoff, now).await
    }

    /// Looks up the account an entry reference routes to. `None` means the
    /// entries must be skipped this pass; the reason is logged here.
    async fn resolve_account(
        &self,
        tenant_id: u64,
        account_ref: Option<u64>,
        count: usize,
        default_account: &mut Option<Option<MailAccount>>,
    ) -> Option<MailAccount> {
        let lookup = match account_ref {
            Some(account_id) => self.store.get_tenant_account(account_id, tenant_id).await,
            None => match default_account.clone() {
                Some(resolved) => Ok(resolved),
                None => {
                    let resolved = self.store.default_account(tenant_id).await;
                    if let Ok(found) = &resolved {
                        *default_account = Some(found.clone());
                    }
                    resolved
                }
            },
        };

        match lookup {
            Ok(Some(account)) => Some(account),
            Ok(None) => {
                match account_ref {
                    Some(account_id) => warn!(
                        "Skipping {} entries of tenant {}: mail account {} not found",
                        count, tenant_id, account_id
                    ),
                    None => warn!(
                        "Skipping {} entries of tenant {}: no default mail account",
                        count, tenant_id
                    ),
                }
                MAILQUEUE_GROUP_SKIPPED_TOTAL
                    .with_label_values(&[NO_ACCOUNT])
                    .inc();
                None
            }
            Err(e) => {
                warn!(
                    "Skipping {} entries of tenant {}: account lookup failed: {}",
                    count, tenant_id, e
                );
                None
            }
        }
    }

    /// Sends as many of `entries` as the account's remaining hourly budget
    /// allows, in the given order. An error means no entry was touched.
    pub async fn process_group(
        &self,
        entries: &[QueueEntry],
        account: &MailAccount,
    ) -> MailQueueResult<GroupReport> {
        let mut report = GroupReport::new(account.id);
        if !account.active {
            MAILQUEUE_GROUP_SKIPPED_TOTAL
                .with_label_values(&[INACTIVE])
                .inc();
            return Err(raise_error!(
                format!("Mail account {} is inactive", account.id),
                ErrorCode::AccountDisabled
            ));
        }
        if entries.is_empty() {
            return Ok(report);
        }

        let now = utc_now!();
        let window_start = now - self.config.quota_window.as_millis() as i64;
        let sent_in_window = self
            .store
            .count_sent_in_window(account.id, window_start, now)
            .await?;
        let remaining = account.hourly_quota.saturating_sub(sent_in_window) as usize;
        if remaining == 0 {
            debug!(
                "Account {} reached its hourly quota ({}/{}); deferring {} entries",
                account.id,
                sent_in_window,
                account.hourly_quota,
                entries.len()
            );
            report.deferred = entries.len();
            MAILQUEUE_QUOTA_DEFERRED_TOTAL.inc_by(entries.len() as u64);
            return Ok(report);
        }

        let (batch, rest) = entries.split_at(remaining.min(entries.len()));
        if !rest.is_empty() {
            debug!(
                "Account {} has {} sends left this hour; deferring {} entries",
                account.id,
                remaining,
                rest.len()
            );
            report.deferred = rest.len();
            MAILQUEUE_QUOTA_DEFERRED_TOTAL.inc_by(rest.len() as u64);
        }

        let password = self.vault.decrypt(&account.secret).inspect_err(|_| {
            MAILQUEUE_GROUP_SKIPPED_TOTAL
                .with_label_values(&[CREDENTIAL])
                .inc();
        })?;
        let resolved = ResolvedAccount::new(account, password);

        for entry in batch {
            self.deliver(entry.clone(), account, &resolved, &mut report)
                .await;
        }
        Ok(report)
    }

    async fn deliver(
        &self,
        mut entry: QueueEntry,
        account: &MailAccount,
        resolved: &ResolvedAccount,
        report: &mut GroupReport,
    ) {
        entry.mark_processing(account.id, utc_now!());
        if let Err(e) = self.store.update_entry(entry.clone()).await {
            warn!(
                "Could not mark entry {} processing, leaving it for the next cycle: {}",
                entry.id, e
            );
            report.store_errors += 1;
            return;
        }

        let envelope = Envelope::new(&entry, account);
        let started = Instant::now();
        let result = self.transport.send(resolved, &envelope).await;
        let elapsed = started.elapsed().as_secs_f64();

        let outcome = match result {
            Ok(()) => {
                entry.mark_sent(utc_now!());
                info!(
                    "Entry {} sent via account {} to {} recipient(s)",
                    entry.id,
                    account.id,
                    entry.recipients.len()
                );
                report.sent += 1;
                SENT
            }
            Err(e) => {
                entry.record_failure(e.to_string(), utc_now!());
                if entry.status == EntryStatus::Failed {
                    error!(
                        "Entry {} failed permanently after {} attempt(s): {}",
                        entry.id, entry.attempts, e
                    );
                    report.failed += 1;
                    FAILED
                } else {
                    warn!(
                        "Attempt {}/{} for entry {} failed: {}",
                        entry.attempts, entry.max_attempts, entry.id, e
                    );
                    report.retried += 1;
                    RETRY
                }
            }
        };
        MAILQUEUE_EMAIL_SEND_TOTAL
            .with_label_values(&[outcome])
            .inc();
        MAILQUEUE_EMAIL_SEND_DURATION_SECONDS
            .with_label_values(&[outcome])
            .observe(elapsed);

        if let Err(e) = self.store.update_entry(entry.clone()).await {
            warn!(
                "Could not record {} outcome for entry {}: {}",
                outcome, entry.id, e
            );
            report.store_errors += 1;
        }
    }
}

/// Groups entries by the account they resolve to. Explicit and default-routed
/// entries on the same account form one group. Fetch order is kept
/// across groups (first appearance) and within each group. Entries without
/// a route are dropped.
fn group_by_resolved_account(
    entries: Vec<QueueEntry>,
    routes: &[(Option<u64>, MailAccount)],
) -> Vec<(MailAccount, Vec<QueueEntry>)> {
    let mut groups: Vec<(MailAccount, Vec<QueueEntry>)> = Vec::new();
    for entry in entries {
        let Some((_, account)) = routes.iter().find(|(r, _)| *r == entry.account_id) else {
            continue;
        };
        match groups.iter_mut().find(|(a, _)| a.id == account.id) {
            Some((_, group)) => group.push(entry),
            None => groups.push((account.clone(), vec![entry])),
        }
    }
    groups
}
