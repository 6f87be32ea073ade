use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use http::{header, HeaderMap, StatusCode, Uri};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::receivers::{diagnose, Diagnosis};
use super::AppState;
use crate::{metrics, Error};

pub const REMEDIATION_TRIGGERED: &str = "Nginx restart triggered";
pub const REMEDIATION_FAILED: &str = "Error running playbook";

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn metrics() -> Response {
    match metrics::gather_metrics() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            text,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to gather metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Handles a POST on any path: log what the alert says, then run the
/// remediation and report whether it could be run.
pub async fn receive_alert(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let span = info_span!("alert", request_id = %Uuid::new_v4(), path = %uri.path());
    handle_alert(state, headers, body).instrument(span).await
}

async fn handle_alert(state: Arc<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let body = declared_body(&headers, &body);

    info!("Alert received");

    let diagnosis = diagnose(body);
    metrics::record_alert(diagnosis.kind());
    match &diagnosis {
        Diagnosis::Status {
            status,
            alert_name,
            alert_count,
        } => info!(
            alert_name = alert_name.as_deref().unwrap_or("unknown"),
            alert_count,
            "Alert: {}",
            status
        ),
        Diagnosis::Unknown { alert_count } => info!(alert_count, "Alert: unknown"),
        Diagnosis::NoPayload(reason) => info!(%reason, "No JSON payload"),
    }

    // The run lives in its own task so a client hanging up mid-request does
    // not abandon a half-finished remediation.
    let remediator = state.remediator.clone();
    let started = Instant::now();
    let run = tokio::spawn(async move { remediator.remediate().await }.in_current_span());

    let result = match run.await {
        Ok(result) => result,
        Err(e) => Err(Error::Internal(format!("remediation task failed: {}", e))),
    };

    match result {
        Ok(outcome) => {
            let label = if outcome.success { "success" } else { "nonzero_exit" };
            metrics::record_remediation(label, outcome.elapsed.as_secs_f64());
            info!(
                exit_code = ?outcome.exit_code,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "Remediation finished"
            );
            (StatusCode::OK, REMEDIATION_TRIGGERED).into_response()
        }
        Err(e) => {
            metrics::record_remediation("failed", started.elapsed().as_secs_f64());
            error!("Remediation failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, REMEDIATION_FAILED).into_response()
        }
    }
}

/// The part of the body covered by `Content-Length`. A missing or unreadable
/// header means an empty body.
fn declared_body<'a>(headers: &HeaderMap, body: &'a [u8]) -> &'a [u8] {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    if declared > body.len() {
        warn!(
            declared,
            received = body.len(),
            "Body shorter than Content-Length"
        );
    }

    &body[..declared.min(body.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn with_length(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn missing_content_length_reads_nothing() {
        assert_eq!(declared_body(&HeaderMap::new(), b"{\"alerts\":[]}"), b"");
    }

    #[test]
    fn content_length_truncates_body() {
        assert_eq!(declared_body(&with_length("3"), b"abcdef"), b"abc");
    }

    #[test]
    fn content_length_larger_than_body_keeps_everything() {
        assert_eq!(declared_body(&with_length("64"), b"abc"), b"abc");
    }

    #[test]
    fn unparsable_content_length_reads_nothing() {
        assert_eq!(declared_body(&with_length("lots"), b"abc"), b"");
    }
}
