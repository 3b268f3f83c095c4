mod buffer;
mod collector;
mod config;
mod transport;

use std::sync::{Arc, Mutex};

use anyhow::Result;
use metrio_common::MetrioError;
use metrio_common::types::Metric;
use tokio::sync::mpsc;
use tokio::time::{Duration, interval};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::collector::{Collector, SystemSource};
use crate::config::AgentConfig;
use crate::transport::MetricClient;

fn lock_collector(collector: &Mutex<Collector>) -> std::sync::MutexGuard<'_, Collector> {
    collector.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = AgentConfig::load()?;
    info!(
        address = %config.address,
        poll_secs = config.poll_interval,
        report_secs = config.report_interval,
        workers = config.rate_limit,
        signing = config.key.is_some(),
        "metrio-agent starting"
    );

    let collector = Collector::new(Box::new(SystemSource::new()))?;
    let staging_capacity = collector.metric_count();
    let main_capacity = staging_capacity * 5;
    let collector = Arc::new(Mutex::new(collector));
    let client = Arc::new(MetricClient::new(&config.address, config.key.clone())?);

    let (staging_tx, staging_rx) = mpsc::channel::<Metric>(staging_capacity);
    let (main_tx, main_rx) = mpsc::channel::<Metric>(main_capacity);
    let main_rx = Arc::new(tokio::sync::Mutex::new(main_rx));
    let (batch_tx, mut batch_rx) = mpsc::channel::<Vec<Metric>>(staging_capacity);
    let (error_tx, mut error_rx) = mpsc::channel::<MetrioError>(config.rate_limit);

    // Shared error sink for the sender pool.
    tokio::spawn(async move {
        while let Some(err) = error_rx.recv().await {
            warn!(error = %err, "sender pool error");
        }
    });

    // Sender pool: each worker pulls one metric at a time off the main
    // queue and issues a single update call. A failed metric is reported
    // and the worker moves on.
    for worker in 0..config.rate_limit {
        let main_rx = Arc::clone(&main_rx);
        let client = Arc::clone(&client);
        let errors = error_tx.clone();
        tokio::spawn(async move {
            loop {
                let metric = { main_rx.lock().await.recv().await };
                let Some(metric) = metric else { break };
                if let Err(err) = client.send_metric(&metric).await {
                    let _ = errors.send(err).await;
                }
            }
            info!(worker, "sender worker stopped");
        });
    }

    // Staging to main queue fan-out with drain-on-full.
    tokio::spawn(buffer::fan_out(
        staging_rx,
        main_tx,
        Arc::clone(&main_rx),
        main_capacity,
    ));

    // Batch transmitter: one in-flight batch per report cycle. On retry
    // exhaustion the snapshot is dropped, never requeued.
    {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            while let Some(snapshot) = batch_rx.recv().await {
                if let Err(err) = client.send_batch(&snapshot).await {
                    warn!(error = %err, "batch send failed, dropping this cycle");
                }
            }
        });
    }

    // Poll loop: refresh samples at the poll cadence.
    {
        let collector = Arc::clone(&collector);
        let poll_interval = config.poll_interval;
        tokio::spawn(async move {
            let mut tick = interval(Duration::from_secs(poll_interval));
            loop {
                tick.tick().await;
                lock_collector(&collector).sample();
                debug!("samples refreshed");
            }
        });
    }

    // Report loop: build the snapshot and offer it to both transport
    // paths. A full queue on either path drops for that path only and
    // never blocks this loop.
    let mut tick = interval(Duration::from_secs(config.report_interval));
    loop {
        tick.tick().await;
        let snapshot = lock_collector(&collector).collect();

        if batch_tx.try_send(snapshot.clone()).is_err() {
            warn!("batch queue full, dropping this cycle's snapshot");
        }
        for metric in snapshot {
            if let Err(err) = staging_tx.try_send(metric) {
                warn!(metric = %err.into_inner().id, "staging queue full, metric dropped");
            }
        }
    }
}
