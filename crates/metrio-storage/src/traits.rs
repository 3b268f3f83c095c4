use std::collections::HashMap;

use async_trait::async_trait;
use metrio_common::error::Result;
use metrio_common::types::{Metric, StoreImage};

/// Uniform capability set of a metric store backend. The server selects one
/// implementation at startup and passes it as `Arc<dyn MetricStore>` into
/// the router and every background task.
#[async_trait]
pub trait MetricStore: Send + Sync {
    async fn gauge(&self, name: &str) -> Result<Option<f64>>;
    async fn gauges(&self) -> Result<HashMap<String, f64>>;
    /// Last write wins.
    async fn set_gauge(&self, name: &str, value: f64) -> Result<()>;
    async fn counter(&self, name: &str) -> Result<Option<i64>>;
    async fn counters(&self) -> Result<HashMap<String, i64>>;
    /// Adds `delta` to the stored value as one logical read-add-write,
    /// atomic with respect to concurrent updates of the same name.
    async fn add_counter(&self, name: &str, delta: i64) -> Result<()>;
    async fn dump(&self) -> Result<StoreImage>;
    /// Applies every metric of a snapshot: gauges upsert, counters
    /// accumulate. Entries applied before a failure stay committed.
    async fn apply_batch(&self, metrics: &[Metric]) -> Result<()>;
    /// Writes the persisted image. A no-op for backends that are already
    /// durable (memory has nothing durable, sqlite commits per statement).
    async fn persist(&self) -> Result<()>;
    /// One-time load of the persisted image at startup.
    async fn restore(&self) -> Result<()>;
    /// Database reachability probe.
    async fn ping(&self) -> Result<()>;
}
