pub mod error;
pub mod retry;
pub mod sign;
pub mod types;

pub use error::{MetrioError, Result};
pub use types::{Metric, MetricKind, StoreImage};
