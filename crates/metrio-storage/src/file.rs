use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use metrio_common::error::Result;
use metrio_common::types::{Metric, StoreImage};
use tracing::{info, warn};

use crate::memory::MemoryStore;
use crate::traits::MetricStore;

/// Memory store with a file-backed persisted image. `persist` rewrites the
/// whole file, `restore` replaces the resident maps wholesale. A missing or
/// corrupt file is recoverable: the store starts empty.
pub struct FileStore {
    memory: MemoryStore,
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            memory: MemoryStore::new(),
            path,
        }
    }
}

#[async_trait]
impl MetricStore for FileStore {
    async fn gauge(&self, name: &str) -> Result<Option<f64>> {
        self.memory.gauge(name).await
    }

    async fn gauges(&self) -> Result<HashMap<String, f64>> {
        self.memory.gauges().await
    }

    async fn set_gauge(&self, name: &str, value: f64) -> Result<()> {
        self.memory.set_gauge(name, value).await
    }

    async fn counter(&self, name: &str) -> Result<Option<i64>> {
        self.memory.counter(name).await
    }

    async fn counters(&self) -> Result<HashMap<String, i64>> {
        self.memory.counters().await
    }

    async fn add_counter(&self, name: &str, delta: i64) -> Result<()> {
        self.memory.add_counter(name, delta).await
    }

    async fn dump(&self) -> Result<StoreImage> {
        self.memory.dump().await
    }

    async fn apply_batch(&self, metrics: &[Metric]) -> Result<()> {
        self.memory.apply_batch(metrics).await
    }

    async fn persist(&self) -> Result<()> {
        let image = self.memory.snapshot();
        let bytes = serde_json::to_vec_pretty(&image)?;
        tokio::fs::write(&self.path, bytes).await?;
        info!(path = %self.path.display(), "store image written");
        Ok(())
    }

    async fn restore(&self) -> Result<()> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "no store image to restore, starting empty");
                return Ok(());
            }
        };
        match serde_json::from_slice::<StoreImage>(&bytes) {
            Ok(image) => {
                self.memory.replace(image);
                info!(path = %self.path.display(), "store image restored");
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "corrupt store image, starting empty");
            }
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.memory.ping().await
    }
}
