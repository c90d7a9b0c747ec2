// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::{Arc, Mutex};

use crate::modules::account::entity::{MailAccount, Security};
use crate::modules::database::manager::DatabaseManager;
use crate::modules::dispatch::{DispatchConfig, DispatchEngine};
use crate::modules::error::code::ErrorCode;
use crate::modules::error::MailQueueResult;
use crate::modules::outbox::entity::{EntryStatus, QueueEntry};
use crate::modules::smtp::envelope::Envelope;
use crate::modules::smtp::stage::SendStage;
use crate::modules::smtp::transport::{ResolvedAccount, Transport};
use crate::modules::store::nativedb::NativeDbOutboxStore;
use crate::modules::store::OutboxStore;
use crate::modules::vault::CredentialVault;
use crate::{raise_error, raise_transport_error, utc_now};

const MINUTE: i64 = 60 * 1000;
const TENANT: u64 = 1;

#[derive(Default)]
struct RecordingTransport {
    calls: Mutex<Vec<(ResolvedAccount, Envelope)>>,
    fail_with: Option<SendStage>,
}

impl RecordingTransport {
    fn failing(stage: SendStage) -> Self {
        Self {
            fail_with: Some(stage),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<(ResolvedAccount, Envelope)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    async fn send(&self, account: &ResolvedAccount, envelope: &Envelope) -> MailQueueResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push((account.clone(), envelope.clone()));
        match self.fail_with {
            Some(stage) => Err(raise_transport_error!(
                stage,
                "550 5.7.1 relaying denied".into()
            )),
            None => Ok(()),
        }
    }
}

struct PlainVault;

impl CredentialVault for PlainVault {
    fn encrypt(&self, plaintext: &str) -> MailQueueResult<String> {
        Ok(format!("plain:{}", plaintext))
    }

    fn decrypt(&self, secret: &str) -> MailQueueResult<String> {
        secret
            .strip_prefix("plain:")
            .map(str::to_string)
            .ok_or_else(|| raise_error!("bad secret".into(), ErrorCode::DecryptionFailed))
    }
}

/// A real store that refuses to persist chosen `(entry id, status)` writes,
/// each once.
struct FaultyStore {
    inner: NativeDbOutboxStore,
    refused: Mutex<Vec<(u64, EntryStatus)>>,
}

impl FaultyStore {
    fn refuse(&self, entry_id: u64, status: EntryStatus) {
        self.refused.lock().unwrap().push((entry_id, status));
    }
}

impl OutboxStore for FaultyStore {
    async fn create_entry(&self, entry: QueueEntry) -> MailQueueResult<()> {
        self.inner.create_entry(entry).await
    }

    async fn get_entry(&self, id: u64) -> MailQueueResult<Option<QueueEntry>> {
        self.inner.get_entry(id).await
    }

    async fn pending_for_tenant(
        &self,
        tenant_id: u64,
        limit: usize,
        now: i64,
    ) -> MailQueueResult<Vec<QueueEntry>> {
        self.inner.pending_for_tenant(tenant_id, limit, now).await
    }

    async fn pending_for_account(
        &self,
        account_id: u64,
        limit: usize,
        now: i64,
    ) -> MailQueueResult<Vec<QueueEntry>> {
        self.inner.pending_for_account(account_id, limit, now).await
    }

    async fn tenants_with_pending(&self, now: i64) -> MailQueueResult<Vec<u64>> {
        self.inner.tenants_with_pending(now).await
    }

    async fn update_entry(&self, entry: QueueEntry) -> MailQueueResult<()> {
        let refused = {
            let mut refused = self.refused.lock().unwrap();
            let key = (entry.id, entry.status.clone());
            match refused.iter().position(|r| *r == key) {
                Some(index) => {
                    refused.remove(index);
                    true
                }
                None => false,
            }
        };
        if refused {
            return Err(raise_error!(
                "write conflict".into(),
                ErrorCode::StorageError
            ));
        }
        self.inner.update_entry(entry).await
    }

    async fn count_sent_in_window(
        &self,
        account_id: u64,
        since: i64,
        until: i64,
    ) -> MailQueueResult<u32> {
        self.inner
            .count_sent_in_window(account_id, since, until)
            .await
    }

    async fn get_account(&self, id: u64) -> MailQueueResult<Option<MailAccount>> {
        self.inner.get_account(id).await
    }

    async fn get_tenant_account(
        &self,
        id: u64,
        tenant_id: u64,
    ) -> MailQueueResult<Option<MailAccount>> {
        self.inner.get_tenant_account(id, tenant_id).await
    }

    async fn default_account(&self, tenant_id: u64) -> MailQueueResult<Option<MailAccount>> {
        self.inner.default_account(tenant_id).await
    }

    async fn save_account(&self, account: MailAccount) -> MailQueueResult<()> {
        self.inner.save_account(account).await
    }

    async fn requeue_processing(&self, updated_before: i64, now: i64) -> MailQueueResult<usize> {
        self.inner.requeue_processing(updated_before, now).await
    }
}

struct Fixture {
    store: Arc<FaultyStore>,
    transport: Arc<RecordingTransport>,
    engine: DispatchEngine<FaultyStore, PlainVault, RecordingTransport>,
}

impl Fixture {
    fn new(transport: RecordingTransport) -> Self {
        Self::with_config(transport, DispatchConfig::default())
    }

    fn with_config(transport: RecordingTransport, config: DispatchConfig) -> Self {
        let store = Arc::new(FaultyStore {
            inner: NativeDbOutboxStore::new(DatabaseManager::open_in_memory().unwrap()),
            refused: Mutex::new(Vec::new()),
        });
        let transport = Arc::new(transport);
        let engine = DispatchEngine::new(
            store.clone(),
            Arc::new(PlainVault),
            transport.clone(),
            config,
        );
        Self {
            store,
            transport,
            engine,
        }
    }

    fn sent_subjects(&self) -> Vec<String> {
        self.transport
            .calls()
            .into_iter()
            .map(|(_, envelope)| envelope.subject)
            .collect()
    }

    async fn add_account(&self, id: u64, quota: u32) -> MailAccount {
        let account = MailAccount {
            id,
            tenant_id: TENANT,
            host: "127.0.0.1".into(),
            port: 2525,
            username: format!("robot{}@x.com", id),
            secret: "plain:hunter2".into(),
            from_name: "Acme".into(),
            security: Security::None,
            hourly_quota: quota,
            active: true,
            created_at: id as i64,
            updated_at: id as i64,
            ..Default::default()
        };
        self.store.save_account(account.clone()).await.unwrap();
        account
    }

    async fn save(&self, account: MailAccount) {
        self.store.save_account(account).await.unwrap();
    }

    async fn add_entry(&self, id: u64, account_id: Option<u64>) -> QueueEntry {
        let entry = QueueEntry {
            id,
            tenant_id: TENANT,
            account_id,
            recipients: vec!["a@x.com".into()],
            subject: format!("message {}", id),
            body: "hello".into(),
            max_attempts: 3,
            created_at: id as i64,
            updated_at: id as i64,
            ..Default::default()
        };
        self.store.create_entry(entry.clone()).await.unwrap();
        entry
    }

    /// An entry already delivered through `account_id`, `minutes_ago` minutes back.
    async fn add_sent(&self, id: u64, account_id: u64, minutes_ago: i64) {
        let mut entry = QueueEntry {
            id,
            tenant_id: TENANT,
            account_id: Some(account_id),
            recipients: vec!["old@x.com".into()],
            max_attempts: 3,
            created_at: id as i64,
            ..Default::default()
        };
        entry.mark_processing(account_id, 1);
        entry.mark_sent(utc_now!() - minutes_ago * MINUTE);
        self.store.create_entry(entry).await.unwrap();
    }

    async fn entry(&self, id: u64) -> QueueEntry {
        self.store.get_entry(id).await.unwrap().unwrap()
    }
}

// Scenario A
#[tokio::test]
async fn single_entry_is_sent_once() {
    let f = Fixture::new(RecordingTransport::default());
    f.add_account(10, 80).await;
    f.add_entry(1, Some(10)).await;

    let report = f.engine.process_tenant(TENANT).await.unwrap();

    assert_eq!(report.sent, 1);
    let calls = f.transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0.password, "hunter2");
    assert_eq!(calls[0].1.recipients, vec!["a@x.com".to_string()]);
    let entry = f.entry(1).await;
    assert_eq!(entry.status, EntryStatus::Sent);
    assert!(entry.sent_at.is_some());
    assert_eq!(entry.attempts, 0);
}

// Scenario B
#[tokio::test]
async fn quota_of_one_sends_exactly_one() {
    let f = Fixture::new(RecordingTransport::default());
    f.add_account(10, 1).await;
    f.add_entry(1, Some(10)).await;
    f.add_entry(2, Some(10)).await;

    let report = f.engine.process_tenant(TENANT).await.unwrap();

    assert_eq!(report.sent, 1);
    assert_eq!(report.deferred, 1);
    assert_eq!(f.entry(1).await.status, EntryStatus::Sent);
    let deferred = f.entry(2).await;
    assert_eq!(deferred.status, EntryStatus::Pending);
    assert_eq!(deferred.attempts, 0);
}

// Scenario C
#[tokio::test]
async fn three_failed_cycles_end_in_failed() {
    let f = Fixture::new(RecordingTransport::failing(SendStage::Recipient(1)));
    f.add_account(10, 80).await;
    f.add_entry(1, Some(10)).await;

    let mut observed = Vec::new();
    for _ in 0..3 {
        f.engine.process_tenant(TENANT).await.unwrap();
        let entry = f.entry(1).await;
        observed.push((entry.attempts, entry.status));
    }

    assert_eq!(
        observed,
        vec![
            (1, EntryStatus::Pending),
            (2, EntryStatus::Pending),
            (3, EntryStatus::Failed)
        ]
    );
    let entry = f.entry(1).await;
    assert!(entry
        .last_error
        .as_deref()
        .is_some_and(|e| e.contains("recipient-1")));

    // Terminal: a further cycle neither sends nor mutates it.
    f.engine.process_tenant(TENANT).await.unwrap();
    assert_eq!(f.transport.calls().len(), 3);
    assert_eq!(f.entry(1).await, entry);
}

// Scenario D
#[tokio::test]
async fn unknown_account_skips_group_untouched() {
    let f = Fixture::new(RecordingTransport::default());
    let before = f.add_entry(1, Some(404)).await;

    let report = f.engine.process_tenant(TENANT).await.unwrap();

    assert_eq!(report.skipped_groups, 1);
    assert_eq!(report.skipped_entries, 1);
    assert!(f.transport.calls().is_empty());
    assert_eq!(f.entry(1).await, before);
}

#[tokio::test]
async fn partial_budget_sends_remaining_oldest_first() {
    // Q = 5, W = 2, G = 5: min(G, Q - W) = 3.
    let f = Fixture::new(RecordingTransport::default());
    f.add_account(10, 5).await;
    f.add_sent(100, 10, 5).await;
    f.add_sent(101, 10, 30).await;
    for id in 1..=5 {
        f.add_entry(id, Some(10)).await;
    }

    let report = f.engine.process_tenant(TENANT).await.unwrap();

    assert_eq!(report.sent, 3);
    assert_eq!(report.deferred, 2);
    for id in 1..=3 {
        assert_eq!(f.entry(id).await.status, EntryStatus::Sent);
    }
    for id in 4..=5 {
        assert_eq!(f.entry(id).await.status, EntryStatus::Pending);
    }
}

#[tokio::test]
async fn exhausted_quota_mutates_nothing() {
    let f = Fixture::new(RecordingTransport::default());
    f.add_account(10, 2).await;
    f.add_sent(100, 10, 1).await;
    f.add_sent(101, 10, 59).await;
    let before = vec![f.add_entry(1, Some(10)).await, f.add_entry(2, Some(10)).await];

    let report = f.engine.process_tenant(TENANT).await.unwrap();

    assert_eq!(report.attempted(), 0);
    assert_eq!(report.deferred, 2);
    assert!(f.transport.calls().is_empty());
    assert_eq!(vec![f.entry(1).await, f.entry(2).await], before);
}

#[tokio::test]
async fn sends_older_than_window_do_not_count() {
    let f = Fixture::new(RecordingTransport::default());
    f.add_account(10, 1).await;
    f.add_sent(100, 10, 61).await;
    f.add_entry(1, Some(10)).await;

    let report = f.engine.process_tenant(TENANT).await.unwrap();
    assert_eq!(report.sent, 1);
}

#[tokio::test]
async fn inactive_account_consumes_no_attempts() {
    let f = Fixture::new(RecordingTransport::default());
    let mut account = f.add_account(10, 80).await;
    account.active = false;
    f.save(account.clone()).await;
    let before = f.add_entry(1, Some(10)).await;

    let report = f.engine.process_tenant(TENANT).await.unwrap();

    assert_eq!(report.skipped_groups, 1);
    assert!(f.transport.calls().is_empty());
    assert_eq!(f.entry(1).await, before);

    let error = f.engine.process_group(&[before], &account).await.unwrap_err();
    assert_eq!(error.code(), ErrorCode::AccountDisabled);
}

#[tokio::test]
async fn account_of_another_tenant_is_not_found() {
    let f = Fixture::new(RecordingTransport::default());
    let mut foreign = f.add_account(10, 80).await;
    foreign.tenant_id = TENANT + 1;
    f.save(foreign).await;
    let before = f.add_entry(1, Some(10)).await;

    let report = f.engine.process_tenant(TENANT).await.unwrap();

    assert_eq!(report.skipped_groups, 1);
    assert!(f.transport.calls().is_empty());
    assert_eq!(f.entry(1).await, before);
}

#[tokio::test]
async fn unassigned_entries_use_default_account() {
    let f = Fixture::new(RecordingTransport::default());
    f.add_account(10, 80).await;
    let mut default = f.add_account(11, 80).await;
    default.is_default = true;
    f.save(default).await;
    f.add_entry(1, None).await;
    f.add_entry(2, None).await;

    let report = f.engine.process_tenant(TENANT).await.unwrap();

    assert_eq!(report.sent, 2);
    assert!(f.transport.calls().iter().all(|(a, _)| a.account_id == 11));
    let entry = f.entry(1).await;
    assert_eq!(entry.account_id, None);
    assert_eq!(entry.delivery_account_id, Some(11));
}

#[tokio::test]
async fn default_account_sends_count_against_its_quota() {
    let f = Fixture::new(RecordingTransport::default());
    let mut default = f.add_account(11, 1).await;
    default.is_default = true;
    f.save(default).await;
    f.add_entry(1, None).await;
    f.engine.process_tenant(TENANT).await.unwrap();

    f.add_entry(2, Some(11)).await;
    let report = f.engine.process_tenant(TENANT).await.unwrap();

    assert_eq!(report.sent, 0);
    assert_eq!(report.deferred, 1);
}

#[tokio::test]
async fn missing_default_does_not_block_other_groups() {
    let f = Fixture::new(RecordingTransport::default());
    f.add_account(10, 80).await;
    let orphan = f.add_entry(1, None).await;
    f.add_entry(2, Some(10)).await;

    let report = f.engine.process_tenant(TENANT).await.unwrap();

    assert_eq!(report.skipped_groups, 1);
    assert_eq!(report.sent, 1);
    assert_eq!(f.entry(1).await, orphan);
    assert_eq!(f.entry(2).await.status, EntryStatus::Sent);
}

#[tokio::test]
async fn accounts_have_independent_budgets() {
    let f = Fixture::new(RecordingTransport::default());
    f.add_account(10, 1).await;
    f.add_account(20, 1).await;
    f.add_entry(1, Some(10)).await;
    f.add_entry(2, Some(20)).await;
    f.add_entry(3, Some(10)).await;
    f.add_entry(4, Some(20)).await;

    let report = f.engine.process_tenant(TENANT).await.unwrap();

    assert_eq!(report.sent, 2);
    assert_eq!(report.deferred, 2);
    assert_eq!(f.entry(1).await.status, EntryStatus::Sent);
    assert_eq!(f.entry(2).await.status, EntryStatus::Sent);
}

#[tokio::test]
async fn failure_below_last_attempt_increments_by_one() {
    let f = Fixture::new(RecordingTransport::failing(SendStage::Auth));
    f.add_account(10, 80).await;
    let mut entry = f.add_entry(1, Some(10)).await;
    entry.max_attempts = 5;
    entry.attempts = 2;
    f.store.update_entry(entry).await.unwrap();

    let report = f.engine.process_tenant(TENANT).await.unwrap();

    assert_eq!(report.retried, 1);
    let entry = f.entry(1).await;
    assert_eq!(entry.attempts, 3);
    assert_eq!(entry.status, EntryStatus::Pending);
}

#[tokio::test]
async fn failure_at_last_attempt_is_terminal_with_message() {
    let f = Fixture::new(RecordingTransport::failing(SendStage::DataClose));
    f.add_account(10, 80).await;
    let mut entry = f.add_entry(1, Some(10)).await;
    entry.attempts = 2;
    f.store.update_entry(entry).await.unwrap();

    let report = f.engine.process_tenant(TENANT).await.unwrap();

    assert_eq!(report.failed, 1);
    let entry = f.entry(1).await;
    assert_eq!(entry.attempts, 3);
    assert_eq!(entry.status, EntryStatus::Failed);
    assert!(entry.last_error.is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn undecryptable_secret_leaves_entries_untouched() {
    let f = Fixture::new(RecordingTransport::default());
    let mut account = f.add_account(10, 80).await;
    account.secret = "garbage".into();
    f.save(account).await;
    let before = f.add_entry(1, Some(10)).await;

    let report = f.engine.process_tenant(TENANT).await.unwrap();

    assert_eq!(report.skipped_groups, 1);
    assert!(f.transport.calls().is_empty());
    assert_eq!(f.entry(1).await, before);
}

#[tokio::test]
async fn tenant_without_due_entries_is_a_no_op() {
    let f = Fixture::new(RecordingTransport::default());
    f.add_account(10, 80).await;

    let report = f.engine.process_tenant(TENANT).await.unwrap();

    assert_eq!(report.fetched, 0);
    assert!(f.transport.calls().is_empty());
}

#[tokio::test]
async fn envelope_carries_account_sender_and_all_recipients() {
    let f = Fixture::new(RecordingTransport::default());
    let mut account = f.add_account(10, 80).await;
    account.from_address = Some("noreply@x.com".into());
    f.save(account).await;
    let mut entry = f.add_entry(1, Some(10)).await;
    entry.recipients = vec!["a@x.com".into(), "b@x.com".into()];
    entry.is_html = true;
    f.store.update_entry(entry).await.unwrap();

    f.engine.process_tenant(TENANT).await.unwrap();

    let (_, envelope) = &f.transport.calls()[0];
    assert_eq!(envelope.from_address, "noreply@x.com");
    assert_eq!(envelope.from_name, "Acme");
    assert_eq!(envelope.recipients.len(), 2);
    assert!(envelope.is_html);
}

#[tokio::test]
async fn batch_size_caps_one_pass() {
    let f = Fixture::with_config(
        RecordingTransport::default(),
        DispatchConfig {
            batch_size: 2,
            ..Default::default()
        },
    );
    f.add_account(10, 80).await;
    for id in 1..=3 {
        f.add_entry(id, Some(10)).await;
    }

    let report = f.engine.process_tenant(TENANT).await.unwrap();

    assert_eq!(report.fetched, 2);
    assert_eq!(report.sent, 2);
    assert_eq!(f.entry(3).await.status, EntryStatus::Pending);
}

#[tokio::test]
async fn explicit_and_default_routes_share_one_budget_in_fetch_order() {
    let f = Fixture::new(RecordingTransport::default());
    let mut default = f.add_account(11, 2).await;
    default.is_default = true;
    f.save(default).await;
    f.add_entry(1, Some(11)).await;
    f.add_entry(2, None).await;
    f.add_entry(3, Some(11)).await;

    let report = f.engine.process_tenant(TENANT).await.unwrap();

    assert_eq!(report.sent, 2);
    assert_eq!(report.deferred, 1);
    assert_eq!(report.skipped_groups, 0);
    assert_eq!(
        vec![
            f.entry(1).await.status,
            f.entry(2).await.status,
            f.entry(3).await.status
        ],
        vec![EntryStatus::Sent, EntryStatus::Sent, EntryStatus::Pending]
    );
    assert_eq!(f.sent_subjects(), vec!["message 1", "message 2"]);
}

#[tokio::test]
async fn unsaved_processing_mark_skips_entry_and_continues() {
    let f = Fixture::new(RecordingTransport::default());
    f.add_account(10, 80).await;
    let before = f.add_entry(1, Some(10)).await;
    f.add_entry(2, Some(10)).await;
    f.store.refuse(1, EntryStatus::Processing);

    let report = f.engine.process_tenant(TENANT).await.unwrap();

    assert_eq!(report.store_errors, 1);
    assert_eq!(report.sent, 1);
    assert_eq!(f.sent_subjects(), vec!["message 2"]);
    assert_eq!(f.entry(1).await, before);
    assert_eq!(f.entry(2).await.status, EntryStatus::Sent);
}

#[tokio::test]
async fn unsaved_outcome_is_swallowed_and_group_continues() {
    let f = Fixture::new(RecordingTransport::default());
    f.add_account(10, 80).await;
    f.add_entry(1, Some(10)).await;
    f.add_entry(2, Some(10)).await;
    f.store.refuse(1, EntryStatus::Sent);

    let report = f.engine.process_tenant(TENANT).await.unwrap();

    assert_eq!(report.store_errors, 1);
    assert_eq!(report.sent, 2);
    assert_eq!(f.sent_subjects(), vec!["message 1", "message 2"]);
    let stuck = f.entry(1).await;
    assert_eq!(stuck.status, EntryStatus::Processing);
    assert_eq!(stuck.delivery_account_id, Some(10));
    assert_eq!(f.entry(2).await.status, EntryStatus::Sent);
}

#[tokio::test]
async fn stale_processing_entry_is_requeued_without_an_attempt() {
    let f = Fixture::with_config(
        RecordingTransport::default(),
        DispatchConfig {
            stale_after: std::time::Duration::ZERO,
            ..Default::default()
        },
    );
    f.add_account(10, 80).await;
    let mut entry = f.add_entry(1, Some(10)).await;
    entry.attempts = 1;
    entry.mark_processing(10, utc_now!() - MINUTE);
    f.store.update_entry(entry).await.unwrap();

    assert_eq!(f.engine.recover_stranded().await.unwrap(), 1);
    let requeued = f.entry(1).await;
    assert_eq!(requeued.status, EntryStatus::Pending);
    assert_eq!(requeued.attempts, 1);
}
