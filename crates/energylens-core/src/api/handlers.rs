//! API handlers for the HTTP REST API

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{error, warn};

use crate::analytics::ReportBuilder;
use crate::error::Error;
use crate::models::{
    start_of_day, DateRange, PerformanceReport, RecordsPage, SummaryReport, TimeFrame,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Report builder over the configured store
    pub reports: ReportBuilder,
    /// Metrics handle, `None` when telemetry is disabled
    pub prometheus: Option<PrometheusHandle>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok` or `unavailable`
    pub status: String,
    /// Crate version
    pub version: String,
}

/// Health check endpoint; 503 when the store does not answer
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status) = match state.reports.engine().store().health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            warn!(error = %e, "Store health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Prometheus exposition of the service's own metrics
pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.prometheus {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

/// Report request for one container
#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    /// Namespace of the container
    pub namespace: String,
    /// Container name
    pub containername: String,
    /// `weekly`, `monthly` or `yearly`; anything else means weekly
    pub time_frame: Option<String>,
}

impl ReportRequest {
    fn time_frame(&self) -> TimeFrame {
        TimeFrame::from(self.time_frame.as_deref())
    }
}

/// Energy summary of a container
pub async fn energy_metrics(
    State(state): State<AppState>,
    Json(req): Json<ReportRequest>,
) -> Result<Json<SummaryReport>, Error> {
    let report = state
        .reports
        .summary_report(&req.namespace, &req.containername, req.time_frame())
        .await?;
    Ok(Json(report))
}

/// Per-API performance of a container
pub async fn performance_stats(
    State(state): State<AppState>,
    Json(req): Json<ReportRequest>,
) -> Result<Json<PerformanceReport>, Error> {
    let report = state
        .reports
        .performance_report(&req.namespace, &req.containername, req.time_frame())
        .await?;
    Ok(Json(report))
}

/// Raw range query request
#[derive(Debug, Deserialize)]
pub struct RecordsRequest {
    /// Namespace of the container
    pub namespace: String,
    /// Container name
    pub containername: String,
    /// Inclusive start
    #[serde(rename = "startDate", deserialize_with = "deserialize_instant")]
    pub start_date: DateTime<Utc>,
    /// Inclusive end
    #[serde(rename = "endDate", deserialize_with = "deserialize_instant")]
    pub end_date: DateTime<Utc>,
}

/// Records of a container between two instants
pub async fn filtered_metrics(
    State(state): State<AppState>,
    Json(req): Json<RecordsRequest>,
) -> Result<Json<RecordsPage>, Error> {
    let range = DateRange::new(req.start_date, req.end_date);
    let page = state
        .reports
        .filtered_records(&req.namespace, &req.containername, range)
        .await?;
    Ok(Json(page))
}

/// Accepts RFC 3339 instants or bare `YYYY-MM-DD` dates (midnight UTC)
fn deserialize_instant<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_instant(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {raw}")))
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(start_of_day)
}

/// Error body returned for failed requests
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    details: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        error!(error = %self, "Request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Internal server error",
                details: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_instant() {
        assert_eq!(
            parse_instant("2025-05-01T10:30:00Z"),
            Some(Utc.with_ymd_and_hms(2025, 5, 1, 10, 30, 0).unwrap())
        );
        assert_eq!(
            parse_instant("2025-05-01T12:30:00+02:00"),
            Some(Utc.with_ymd_and_hms(2025, 5, 1, 10, 30, 0).unwrap())
        );
        assert_eq!(
            parse_instant("2025-05-01"),
            Some(Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_instant("yesterday"), None);
    }
}
