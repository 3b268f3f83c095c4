use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Html;
use metrio_common::error::{MetrioError, Result};
use metrio_common::types::{Metric, MetricKind};
use metrio_storage::MetricStore;

use crate::body::decode_body;
use crate::error::ApiError;
use crate::state::AppState;

type ApiResult<T> = std::result::Result<T, ApiError>;

async fn apply_metric(store: &dyn MetricStore, metric: &Metric) -> Result<()> {
    match metric.kind {
        MetricKind::Gauge => {
            let value = metric.value.ok_or(MetrioError::MissingValue {
                id: metric.id.clone(),
                field: "value",
            })?;
            store.set_gauge(&metric.id, value).await
        }
        MetricKind::Counter => {
            let delta = metric.delta.ok_or(MetrioError::MissingValue {
                id: metric.id.clone(),
                field: "delta",
            })?;
            store.add_counter(&metric.id, delta).await
        }
    }
}

/// Reads the post-merge value back from the store.
async fn merged(store: &dyn MetricStore, kind: MetricKind, id: &str) -> Result<Metric> {
    match kind {
        MetricKind::Gauge => {
            let value = store.gauge(id).await?.ok_or_else(|| MetrioError::NotFound {
                kind,
                id: id.to_string(),
            })?;
            Ok(Metric::gauge(id, value))
        }
        MetricKind::Counter => {
            let delta = store.counter(id).await?.ok_or_else(|| MetrioError::NotFound {
                kind,
                id: id.to_string(),
            })?;
            Ok(Metric::counter(id, delta))
        }
    }
}

pub async fn update_path(
    State(state): State<AppState>,
    Path((kind, name, value)): Path<(String, String, String)>,
) -> ApiResult<Json<Metric>> {
    let kind: MetricKind = kind.parse()?;
    let metric = match kind {
        MetricKind::Gauge => {
            let value = value
                .parse::<f64>()
                .map_err(|_| MetrioError::InvalidValue(value.clone()))?;
            Metric::gauge(name, value)
        }
        MetricKind::Counter => {
            let delta = value
                .parse::<i64>()
                .map_err(|_| MetrioError::InvalidValue(value.clone()))?;
            Metric::counter(name, delta)
        }
    };
    apply_metric(state.store.as_ref(), &metric).await?;
    Ok(Json(merged(state.store.as_ref(), kind, &metric.id).await?))
}

pub async fn update_body(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Metric>> {
    let body = decode_body(&headers, &body, state.key.as_deref())?;
    let metric: Metric = serde_json::from_slice(&body).map_err(MetrioError::from)?;
    apply_metric(state.store.as_ref(), &metric).await?;
    Ok(Json(merged(state.store.as_ref(), metric.kind, &metric.id).await?))
}

pub async fn updates(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let body = decode_body(&headers, &body, state.key.as_deref())?;
    let metrics: Vec<Metric> = serde_json::from_slice(&body).map_err(MetrioError::from)?;
    state.store.apply_batch(&metrics).await?;
    Ok(StatusCode::OK)
}

pub async fn value_path(
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
) -> ApiResult<String> {
    let kind: MetricKind = kind.parse()?;
    let metric = merged(state.store.as_ref(), kind, &name).await?;
    Ok(match kind {
        MetricKind::Gauge => metric.value.unwrap_or_default().to_string(),
        MetricKind::Counter => metric.delta.unwrap_or_default().to_string(),
    })
}

pub async fn value_body(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Metric>> {
    let body = decode_body(&headers, &body, state.key.as_deref())?;
    let query: Metric = serde_json::from_slice(&body).map_err(MetrioError::from)?;
    Ok(Json(merged(state.store.as_ref(), query.kind, &query.id).await?))
}

pub async fn index(State(state): State<AppState>) -> ApiResult<Html<String>> {
    let image = state.store.dump().await?;

    let mut gauges: Vec<_> = image.gauges.into_iter().collect();
    gauges.sort_by(|a, b| a.0.cmp(&b.0));
    let mut counters: Vec<_> = image.counters.into_iter().collect();
    counters.sort_by(|a, b| a.0.cmp(&b.0));

    let gauge_rows: String = gauges
        .iter()
        .map(|(name, value)| format!("<li>{name}: {value}</li>\n"))
        .collect();
    let counter_rows: String = counters
        .iter()
        .map(|(name, value)| format!("<li>{name}: {value}</li>\n"))
        .collect();

    Ok(Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"UTF-8\"><title>metrio</title></head>\n\
         <body>\n<h3>Metric values</h3>\n\
         <h5>gauges</h5>\n<ul>\n{gauge_rows}</ul>\n\
         <h5>counters</h5>\n<ul>\n{counter_rows}</ul>\n</body>\n</html>"
    )))
}

pub async fn ping(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.store.ping().await?;
    Ok(StatusCode::OK)
}
