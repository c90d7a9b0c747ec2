// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::{common::signal::shutdown_requested, error::MailQueueResult};
use std::{future::Future, time::Duration};
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// A named background loop that runs one job per tick.
///
/// Runs never overlap: the job is awaited inside the loop, and a tick that
/// falls due while a run is still going is delayed until it finishes.
pub struct PeriodicTask {
    name: String,
}

/// Dropping the handle without calling `cancel` also ends the loop.
pub struct TaskHandle {
    cancel_sender: Option<oneshot::Sender<()>>,
    join_handle: tokio::task::JoinHandle<()>,
}

impl TaskHandle {
    /// Requests the loop to stop and waits for it. A run already in flight
    /// completes; no new run starts afterwards.
    pub async fn cancel(mut self) {
        if let Some(sender) = self.cancel_sender.take() {
            let _ = sender.send(());
        }
        let _ = self.join_handle.await;
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle.is_finished()
    }
}

impl PeriodicTask {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
        }
    }

    pub fn start<F, T>(self, task: T, interval: Duration, run_immediately: bool) -> TaskHandle
    where
        T: Fn() -> F + Send + Sync + 'static,
        F: Future<Output = MailQueueResult<()>> + Send + 'static,
    {
        info!("Task '{}' started, interval {:?}", &self.name, interval);

        let (cancel_sender, mut cancel_receiver) = oneshot::channel::<()>();
        let name = self.name;

        let join_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut shutdown = shutdown_requested();

            if !run_immediately {
                interval.tick().await; // discard first immediate tick
            }

            loop {
                tokio::select! {
                    biased;

                    _ = &mut cancel_receiver => {
                        info!("Task '{}' received cancellation signal", name);
                        break;
                    }
                    _ = shutdown.recv() => {
                        info!("Task '{}' shutting down due to shutdown signal", name);
                        break;
                    }
                    _ = interval.tick() => {
                        if let Err(e) = task().await {
                            warn!("Task '{}' failed: {:?}", name, e);
                        }
                    }
                }
            }

            info!("Task '{}' stopped", name);
        });

        TaskHandle {
            cancel_sender: Some(cancel_sender),
            join_handle,
        }
    }
}
