use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use metrio_common::error::{MetrioError, Result};
use metrio_common::types::{Metric, MetricKind, StoreImage};

use crate::traits::MetricStore;

/// Resident store shared by concurrent request handlers. A single lock is
/// enough at this serving bandwidth; counter accumulation happens under the
/// write guard so read-add-write is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<StoreImage>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreImage> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreImage> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn snapshot(&self) -> StoreImage {
        self.read().clone()
    }

    /// Replaces the resident maps wholesale, used by restore.
    pub(crate) fn replace(&self, image: StoreImage) {
        *self.write() = image;
    }

    pub(crate) fn apply(&self, metrics: &[Metric]) -> Result<()> {
        let mut inner = self.write();
        for metric in metrics {
            match metric.kind {
                MetricKind::Gauge => {
                    let value = metric.value.ok_or(MetrioError::MissingValue {
                        id: metric.id.clone(),
                        field: "value",
                    })?;
                    inner.gauges.insert(metric.id.clone(), value);
                }
                MetricKind::Counter => {
                    let delta = metric.delta.ok_or(MetrioError::MissingValue {
                        id: metric.id.clone(),
                        field: "delta",
                    })?;
                    *inner.counters.entry(metric.id.clone()).or_insert(0) += delta;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MetricStore for MemoryStore {
    async fn gauge(&self, name: &str) -> Result<Option<f64>> {
        Ok(self.read().gauges.get(name).copied())
    }

    async fn gauges(&self) -> Result<HashMap<String, f64>> {
        Ok(self.read().gauges.clone())
    }

    async fn set_gauge(&self, name: &str, value: f64) -> Result<()> {
        self.write().gauges.insert(name.to_string(), value);
        Ok(())
    }

    async fn counter(&self, name: &str) -> Result<Option<i64>> {
        Ok(self.read().counters.get(name).copied())
    }

    async fn counters(&self) -> Result<HashMap<String, i64>> {
        Ok(self.read().counters.clone())
    }

    async fn add_counter(&self, name: &str, delta: i64) -> Result<()> {
        *self.write().counters.entry(name.to_string()).or_insert(0) += delta;
        Ok(())
    }

    async fn dump(&self) -> Result<StoreImage> {
        Ok(self.snapshot())
    }

    async fn apply_batch(&self, metrics: &[Metric]) -> Result<()> {
        self.apply(metrics)
    }

    async fn persist(&self) -> Result<()> {
        Ok(())
    }

    async fn restore(&self) -> Result<()> {
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Err(MetrioError::DatabaseUnavailable(
            "no database backend configured".to_string(),
        ))
    }
}
