use std::sync::Arc;
use std::time::Duration;

use metrio_storage::MetricStore;
use tokio::time::interval;
use tracing::{info, warn};

/// Periodic flush of the store to its persisted image. A non-positive
/// interval disables the timer; the shutdown flush still runs.
pub fn spawn_store_timer(store: Arc<dyn MetricStore>, store_interval: i64) {
    if store_interval <= 0 {
        info!("periodic persistence disabled");
        return;
    }
    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(store_interval as u64));
        // The first tick fires immediately; nothing to flush yet.
        tick.tick().await;
        loop {
            tick.tick().await;
            if let Err(err) = store.persist().await {
                warn!(error = %err, "periodic persist failed");
            }
        }
    });
}

/// Waits for SIGINT/SIGTERM, performs exactly one final persist and exits.
/// There is no second chance after this point.
pub async fn shutdown_flush(store: Arc<dyn MetricStore>) {
    wait_for_termination().await;
    info!("termination signal received, persisting store");
    if let Err(err) = store.persist().await {
        warn!(error = %err, "final persist failed");
    }
    std::process::exit(0);
}

async fn wait_for_termination() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut term) = signal(SignalKind::terminate()) {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
            return;
        }
    }
    let _ = tokio::signal::ctrl_c().await;
}
