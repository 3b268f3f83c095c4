use std::sync::Arc;

use metrio_common::types::Metric;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tracing::warn;

/// Moves metrics from the staging queue into the main queue consumed by
/// the sender pool. Runs until the staging side closes.
pub async fn fan_out(
    mut staging: mpsc::Receiver<Metric>,
    main_tx: mpsc::Sender<Metric>,
    main_rx: Arc<Mutex<mpsc::Receiver<Metric>>>,
    capacity: usize,
) {
    while let Some(metric) = staging.recv().await {
        offer(&main_tx, &main_rx, capacity, metric).await;
    }
}

/// Non-blocking push into the main queue. When the queue is full, up to
/// `capacity` buffered-but-undelivered metrics are discarded to make room;
/// the producer is never stalled. Lossy by design.
pub async fn offer(
    main_tx: &mpsc::Sender<Metric>,
    main_rx: &Mutex<mpsc::Receiver<Metric>>,
    capacity: usize,
    metric: Metric,
) {
    match main_tx.try_send(metric) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(metric)) => {
            let dropped = drain(&mut *main_rx.lock().await, capacity);
            warn!(dropped, "main queue full, drained buffered metrics");
            if let Err(err) = main_tx.try_send(metric) {
                warn!(metric = %err.into_inner().id, "metric dropped after drain");
            }
        }
        Err(mpsc::error::TrySendError::Closed(metric)) => {
            warn!(metric = %metric.id, "main queue closed, metric dropped");
        }
    }
}

fn drain(rx: &mut mpsc::Receiver<Metric>, capacity: usize) -> usize {
    let mut dropped = 0;
    for _ in 0..capacity {
        if rx.try_recv().is_err() {
            break;
        }
        dropped += 1;
    }
    dropped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn overload_drains_instead_of_blocking() {
        let (main_tx, main_rx) = mpsc::channel(10);
        let main_rx = Arc::new(Mutex::new(main_rx));

        // No consumer running: the 11th offer hits a full queue, drains
        // it, and the remaining offers land in the emptied queue.
        for i in 0..15 {
            offer(&main_tx, &main_rx, 10, Metric::counter(format!("m{i}"), 1)).await;
        }

        let mut rx = main_rx.lock().await;
        let mut buffered = Vec::new();
        while let Ok(metric) = rx.try_recv() {
            buffered.push(metric.id);
        }
        assert_eq!(buffered, vec!["m10", "m11", "m12", "m13", "m14"]);
    }

    #[tokio::test]
    async fn queue_accepts_new_items_after_a_drain() {
        let (main_tx, main_rx) = mpsc::channel(2);
        let main_rx = Arc::new(Mutex::new(main_rx));

        for i in 0..3 {
            offer(&main_tx, &main_rx, 2, Metric::counter(format!("m{i}"), 1)).await;
        }
        offer(&main_tx, &main_rx, 2, Metric::counter("late", 1)).await;

        let mut rx = main_rx.lock().await;
        assert_eq!(rx.try_recv().unwrap().id, "m2");
        assert_eq!(rx.try_recv().unwrap().id, "late");
        assert!(rx.try_recv().is_err());
    }
}
