use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MetrioError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Gauge => f.write_str("gauge"),
            MetricKind::Counter => f.write_str("counter"),
        }
    }
}

impl FromStr for MetricKind {
    type Err = MetrioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gauge" => Ok(MetricKind::Gauge),
            "counter" => Ok(MetricKind::Counter),
            other => Err(MetrioError::UnknownKind(other.to_string())),
        }
    }
}

/// One named sample on the wire. Gauges carry `value`, counters carry
/// `delta`; the other field is absent from the encoded form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MetricKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl Metric {
    pub fn gauge(id: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            kind: MetricKind::Gauge,
            delta: None,
            value: Some(value),
        }
    }

    pub fn counter(id: impl Into<String>, delta: i64) -> Self {
        Self {
            id: id.into(),
            kind: MetricKind::Counter,
            delta: Some(delta),
            value: None,
        }
    }
}

/// Full contents of a store: the persisted file layout and the shape
/// returned by `MetricStore::dump`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreImage {
    pub gauges: HashMap<String, f64>,
    pub counters: HashMap<String, i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_kind_round_trips_through_str() {
        assert_eq!("gauge".parse::<MetricKind>().unwrap(), MetricKind::Gauge);
        assert_eq!(
            "counter".parse::<MetricKind>().unwrap(),
            MetricKind::Counter
        );
        assert!("histogram".parse::<MetricKind>().is_err());
    }

    #[test]
    fn gauge_serializes_without_delta() {
        let encoded = serde_json::to_string(&Metric::gauge("Alloc", 100.5)).unwrap();
        assert_eq!(encoded, r#"{"id":"Alloc","type":"gauge","value":100.5}"#);
    }

    #[test]
    fn counter_serializes_without_value() {
        let encoded = serde_json::to_string(&Metric::counter("PollCount", 3)).unwrap();
        assert_eq!(encoded, r#"{"id":"PollCount","type":"counter","delta":3}"#);
    }

    #[test]
    fn metric_decodes_from_wire_json() {
        let metric: Metric =
            serde_json::from_str(r#"{"id":"HeapSys","type":"gauge","value":42.0}"#).unwrap();
        assert_eq!(metric.kind, MetricKind::Gauge);
        assert_eq!(metric.value, Some(42.0));
        assert_eq!(metric.delta, None);
    }
}
