//! Display formatting for execution outcomes and stored list entries.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, Utc};
use serde_json::Value;

use crate::models::ExecutionResult;

pub const DEFAULT_VERSION: &str = "1.0";
pub const UNKNOWN_AUTHOR: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResult {
    pub body: String,
    pub tags: Vec<String>,
}

pub fn present(result: &ExecutionResult) -> RenderedResult {
    RenderedResult {
        body: format_payload(&result.result),
        tags: metadata_tags(result.metadata.as_ref()),
    }
}

/// Strings are shown as-is; structured values are pretty-printed JSON.
pub fn format_payload(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string())
        }
    }
}

/// One `key: value` tag per metadata entry.
pub fn metadata_tags(metadata: Option<&BTreeMap<String, Value>>) -> Vec<String> {
    metadata
        .map(|map| {
            map.iter()
                .map(|(key, value)| match value {
                    Value::String(s) => format!("{key}: {s}"),
                    other => format!("{key}: {other}"),
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days < 7 {
        format!("{days}d ago")
    } else {
        then.with_timezone(&Local).format("%Y-%m-%d").to_string()
    }
}

pub fn version_label(version: Option<&str>) -> String {
    format!("v{}", version.unwrap_or(DEFAULT_VERSION))
}

pub fn author_label(author: Option<&str>) -> &str {
    author.unwrap_or(UNKNOWN_AUTHOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    #[test]
    fn scalar_payloads() {
        assert_eq!(format_payload(&json!("done")), "done");
        assert_eq!(format_payload(&json!(42)), "42");
        assert_eq!(format_payload(&json!(true)), "true");
        assert_eq!(format_payload(&Value::Null), "null");
    }

    #[test]
    fn structured_payload_is_pretty_printed() {
        let payload = json!({"rows": [1, 2]});
        assert_eq!(
            format_payload(&payload),
            "{\n  \"rows\": [\n    1,\n    2\n  ]\n}"
        );
    }

    #[test]
    fn metadata_becomes_tags() {
        let result: ExecutionResult = serde_json::from_value(json!({
            "result": "ok",
            "metadata": {"duration": "1.2s", "exit_code": 0}
        }))
        .unwrap();
        let rendered = present(&result);
        assert_eq!(rendered.body, "ok");
        assert_eq!(rendered.tags, vec!["duration: 1.2s", "exit_code: 0"]);
        assert!(metadata_tags(None).is_empty());
    }

    #[test]
    fn relative_times() {
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();
        assert_eq!(time_ago(now - Duration::seconds(30), now), "Just now");
        assert_eq!(time_ago(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(time_ago(now - Duration::hours(3), now), "3h ago");
        assert_eq!(time_ago(now - Duration::days(2), now), "2d ago");
        assert_eq!(time_ago(now + Duration::minutes(5), now), "Just now");
        assert!(time_ago(now - Duration::days(30), now).starts_with("2024-04-"));
    }

    #[test]
    fn labels_fall_back() {
        assert_eq!(version_label(None), "v1.0");
        assert_eq!(version_label(Some("2.1")), "v2.1");
        assert_eq!(author_label(None), "Unknown");
    }
}
