use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{wire::null_as_default, ModelError};

/// One change recorded against an alert, as listed by the history endpoint. An entry
/// describes either a severity change (carries `severity` and `value`) or a status change
/// (carries `status`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub resource: String,
    pub event: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub environment: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub service: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(with = "crate::time::serde_wire")]
    pub update_time: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn from_value(value: Value) -> Result<Self, ModelError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn short_id(&self) -> &str {
        crate::short_id(&self.id)
    }

    pub fn is_severity_change(&self) -> bool {
        self.severity.is_some()
    }

    pub fn is_status_change(&self) -> bool {
        self.status.is_some()
    }
}
