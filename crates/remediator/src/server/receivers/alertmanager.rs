use serde_json::Value;
use std::fmt;

/// What the diagnostic parse learned about a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnosis {
    /// `alerts[0].status` was present.
    Status {
        status: String,
        alert_name: Option<String>,
        alert_count: usize,
    },
    /// A JSON object whose first alert carries no status, or which has no
    /// `alerts` key at all.
    Unknown { alert_count: usize },
    NoPayload(NoPayloadReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoPayloadReason {
    EmptyBody,
    InvalidUtf8,
    Malformed(String),
    NotAnObject,
    NoAlerts,
}

impl fmt::Display for NoPayloadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoPayloadReason::EmptyBody => write!(f, "empty body"),
            NoPayloadReason::InvalidUtf8 => write!(f, "body is not valid UTF-8"),
            NoPayloadReason::Malformed(e) => write!(f, "malformed JSON: {}", e),
            NoPayloadReason::NotAnObject => write!(f, "payload is not an Alertmanager object"),
            NoPayloadReason::NoAlerts => write!(f, "no alerts in payload"),
        }
    }
}

impl Diagnosis {
    /// Metric label for this diagnosis.
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnosis::Status { .. } => "status",
            Diagnosis::Unknown { .. } => "unknown",
            Diagnosis::NoPayload(_) => "none",
        }
    }

    pub fn status(&self) -> Option<&str> {
        match self {
            Diagnosis::Status { status, .. } => Some(status),
            _ => None,
        }
    }
}

/// Best-effort read of `alerts[0].status`. Never fails; only the fields it
/// reads are looked at, everything else in the document is ignored.
pub fn diagnose(body: &[u8]) -> Diagnosis {
    if body.is_empty() {
        return Diagnosis::NoPayload(NoPayloadReason::EmptyBody);
    }

    let text = match std::str::from_utf8(body) {
        Ok(text) => text,
        Err(_) => return Diagnosis::NoPayload(NoPayloadReason::InvalidUtf8),
    };

    let document: Value = match serde_json::from_str(text) {
        Ok(document) => document,
        Err(e) => return Diagnosis::NoPayload(NoPayloadReason::Malformed(e.to_string())),
    };

    let Some(document) = document.as_object() else {
        return Diagnosis::NoPayload(NoPayloadReason::NotAnObject);
    };

    let alerts = match document.get("alerts") {
        None => return Diagnosis::Unknown { alert_count: 0 },
        Some(Value::Array(alerts)) => alerts,
        Some(_) => return Diagnosis::NoPayload(NoPayloadReason::NotAnObject),
    };

    let first = match alerts.first() {
        None => return Diagnosis::NoPayload(NoPayloadReason::NoAlerts),
        Some(Value::Object(first)) => first,
        Some(_) => return Diagnosis::NoPayload(NoPayloadReason::NotAnObject),
    };

    let alert_name = first
        .get("labels")
        .and_then(|labels| labels.get("alertname"))
        .and_then(Value::as_str)
        .map(String::from);

    match first.get("status") {
        None | Some(Value::Null) => Diagnosis::Unknown {
            alert_count: alerts.len(),
        },
        Some(Value::String(status)) => Diagnosis::Status {
            status: status.clone(),
            alert_name,
            alert_count: alerts.len(),
        },
        Some(other) => Diagnosis::Status {
            status: other.to_string(),
            alert_name,
            alert_count: alerts.len(),
        },
    }
}
