//! Loose shapes of the JSON bodies exchanged with the server. Every field is optional
//! here; defaults and validation are applied when converting to the domain types.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireAlert {
    pub id: Option<String>,
    pub resource: Option<String>,
    pub event: Option<String>,
    pub environment: Option<String>,
    pub severity: Option<String>,
    pub correlate: Option<Vec<String>>,
    pub status: Option<String>,
    pub service: Option<Vec<String>>,
    pub group: Option<String>,
    pub value: Option<String>,
    pub text: Option<String>,
    pub tags: Option<Vec<String>>,
    pub attributes: Option<BTreeMap<String, Value>>,
    pub origin: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub create_time: Option<String>,
    pub timeout: Option<u64>,
    pub raw_data: Option<String>,

    // Server-computed
    pub duplicate_count: Option<u64>,
    pub repeat: Option<bool>,
    pub previous_severity: Option<String>,
    pub trend_indication: Option<String>,
    pub receive_time: Option<String>,
    pub last_receive_id: Option<String>,
    pub last_receive_time: Option<String>,
    pub expire_time: Option<String>,
    pub history: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireHeartbeat {
    pub id: Option<String>,
    pub origin: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub create_time: Option<String>,
    pub timeout: Option<u64>,
    pub receive_time: Option<String>,
}

/// Treat empty strings the same as absent values.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Decode an explicit `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
