// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::LazyLock;

use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

static SHUTDOWN: LazyLock<broadcast::Sender<()>> = LazyLock::new(|| broadcast::channel(1).0);

/// Yields once the process has been asked to stop. Receivers created after
/// the request never fire.
pub fn shutdown_requested() -> broadcast::Receiver<()> {
    SHUTDOWN.subscribe()
}

/// Forwards the first Ctrl+C or SIGTERM to every `shutdown_requested`
/// receiver. Call once, from inside the runtime.
pub fn forward_os_signals() {
    tokio::spawn(async {
        wait_for_os_signal().await;
        info!("Shutdown requested, stopping the poller and the API");
        let _ = SHUTDOWN.send(());
    });
}

/// A handler that cannot be installed never fires.
async fn wait_for_os_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Error installing Ctrl+C signal handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Error installing terminate signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}
