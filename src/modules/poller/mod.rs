// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::modules::dispatch::DispatchEngine;
use crate::modules::error::MailQueueResult;
use crate::modules::metrics::MAILQUEUE_SWEEP_TOTAL;
use crate::modules::scheduler::periodic::{PeriodicTask, TaskHandle};
use crate::modules::smtp::transport::Transport;
use crate::modules::store::OutboxStore;
use crate::modules::vault::CredentialVault;
use crate::utc_now;


const TASK_NAME: &str = "queue-poller";

/// Periodically sweeps every tenant with due entries through the engine.
pub struct QueuePoller<S, V, T> {
    engine: Arc<DispatchEngine<S, V, T>>,
    interval: Duration,
}

pub struct PollerHandle {
    task: TaskHandle,
}

impl PollerHandle {
    /// Takes effect before the next tick. A sweep in flight runs to completion.
    pub async fn stop(self) {
        self.task.cancel().await;
        info!("Queue poller stopped");
    }
}

impl<S, V, T> QueuePoller<S, V, T>
where
    S: OutboxStore + 'static,
    V: CredentialVault + 'static,
    T: Transport + 'static,
{
    pub fn new(engine: Arc<DispatchEngine<S, V, T>>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Recovers entries left `processing` by an interrupted run, then starts
    /// the loop. The first sweep runs immediately.
    pub async fn start(self) -> MailQueueResult<PollerHandle> {
        let now = utc_now!();
        let recovered = self.engine.store().requeue_processing(now, now).await?;
        if recovered > 0 {
            warn!(
                "Returned {} entries stranded in processing to pending",
                recovered
            );
        }

        let engine = self.engine;
        let task = PeriodicTask::new(TASK_NAME).start(
            move || {
                let engine = engine.clone();
                async move { sweep(&engine).await.map(|_| ()) }
            },
            self.interval,
            true,
        );
        Ok(PollerHandle { task })
    }
}

/// One pass over every tenant with due work, one tenant at a time, after
/// returning stale `processing` entries to the queue.
/// A failing tenant is logged and does not stop the others. Returns the
/// number of tenants visited.
pub async fn sweep<S, V, T>(engine: &DispatchEngine<S, V, T>) -> MailQueueResult<usize>
where
    S: OutboxStore,
    V: CredentialVault,
    T: Transport,
{
    match engine.recover_stranded().await {
        Ok(0) => {}
        Ok(recovered) => warn!(
            "Returned {} stale processing entries to pending",
            recovered
        ),
        Err(e) => warn!("Could not recover stale processing entries: {}", e),
    }

    let tenants = engine.store().tenants_with_pending(utc_now!()).await?;
    for tenant_id in &tenants {
        match engine.process_tenant(*tenant_id).await {
            Ok(report) if report.attempted() > 0 || report.skipped_groups > 0 => {
                info!(
                    "Tenant {}: {} sent, {} retrying, {} failed, {} deferred, {} groups skipped",
                    tenant_id,
                    report.sent,
                    report.retried,
                    report.failed,
                    report.deferred,
                    report.skipped_groups
                );
            }
            Ok(report) => {
                debug!(
                    "Tenant {}: nothing sent, {} deferred",
                    tenant_id, report.deferred
                );
            }
            Err(e) => {
                warn!("Dispatch for tenant {} failed: {}", tenant_id, e);
            }
        }
    }
    MAILQUEUE_SWEEP_TOTAL.inc();
    Ok(tenants.len())
}
