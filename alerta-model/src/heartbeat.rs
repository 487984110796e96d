use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    alert::Header,
    default_origin,
    time::{self, TimeField, Timestamps},
    wire::{non_empty, WireHeartbeat},
    ModelError, ValidationError, DEFAULT_TIMEOUT, HEARTBEAT_EVENT_TYPE,
};

/// Liveness signal from a monitored origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heartbeat {
    id: String,
    origin: String,
    tags: Vec<String>,
    create_time: DateTime<Utc>,
    timeout: u64,
    receive_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct HeartbeatBuilder {
    id: Option<String>,
    origin: Option<String>,
    tags: Vec<String>,
    create_time: Option<DateTime<Utc>>,
    timeout: Option<u64>,
}

impl HeartbeatBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn create_time(mut self, create_time: DateTime<Utc>) -> Self {
        self.create_time = Some(create_time);
        self
    }

    pub fn timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Heartbeat {
        Heartbeat {
            id: non_empty(self.id).unwrap_or_else(|| Uuid::new_v4().to_string()),
            origin: non_empty(self.origin).unwrap_or_else(default_origin),
            tags: self.tags,
            create_time: self.create_time.unwrap_or_else(time::now),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            receive_time: None,
        }
    }
}

impl Heartbeat {
    pub fn builder() -> HeartbeatBuilder {
        HeartbeatBuilder::default()
    }

    /// Decode a client-side heartbeat body. The `id` is kept when present.
    pub fn parse(payload: &str) -> Result<Self, ModelError> {
        let wire: WireHeartbeat = serde_json::from_str(payload)?;
        let builder = HeartbeatBuilder {
            id: wire.id,
            origin: wire.origin,
            tags: wire.tags.unwrap_or_default(),
            create_time: time::from_wire_opt("createTime", wire.create_time.as_deref())?,
            timeout: wire.timeout,
        };
        Ok(builder.build())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn short_id(&self) -> &str {
        crate::short_id(&self.id)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn event_type(&self) -> &'static str {
        HEARTBEAT_EVENT_TYPE
    }

    pub fn create_time(&self) -> DateTime<Utc> {
        self.create_time
    }

    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    pub fn receive_time(&self) -> Option<DateTime<Utc>> {
        self.receive_time
    }

    pub fn mark_received(&mut self) {
        self.receive_time = Some(time::now());
    }

    pub fn header(&self) -> Header {
        Header {
            origin: self.origin.clone(),
            event_type: HEARTBEAT_EVENT_TYPE.to_owned(),
            correlation_id: self.id.clone(),
        }
    }

    pub fn to_wire_body(&self) -> Value {
        json!({
            "id": self.id,
            "origin": self.origin,
            "tags": self.tags,
            "type": HEARTBEAT_EVENT_TYPE,
            "createTime": time::to_wire(&self.create_time),
            "timeout": self.timeout,
        })
    }
}

impl Timestamps for Heartbeat {
    fn timestamp(&self, field: TimeField) -> Option<DateTime<Utc>> {
        match field {
            TimeField::CreateTime => Some(self.create_time),
            TimeField::ReceiveTime => self.receive_time,
            _ => None,
        }
    }
}

impl fmt::Display for Heartbeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = serde_json::to_string_pretty(&self.to_wire_body()).map_err(|_| fmt::Error)?;
        f.write_str(&body)
    }
}

/// A heartbeat as stored and reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatRecord {
    id: String,
    origin: String,
    tags: Vec<String>,
    event_type: String,
    create_time: DateTime<Utc>,
    timeout: u64,
    receive_time: Option<DateTime<Utc>>,
}

impl HeartbeatRecord {
    pub fn parse(payload: &str) -> Result<Self, ModelError> {
        let wire: WireHeartbeat = serde_json::from_str(payload)?;
        Self::from_wire(wire)
    }

    pub fn from_value(value: Value) -> Result<Self, ModelError> {
        let wire: WireHeartbeat = serde_json::from_value(value)?;
        Self::from_wire(wire)
    }

    fn from_wire(wire: WireHeartbeat) -> Result<Self, ModelError> {
        let id = non_empty(wire.id).ok_or(ValidationError::MissingField("id"))?;
        let create_time = time::from_wire_opt("createTime", wire.create_time.as_deref())?;
        let receive_time = time::from_wire_opt("receiveTime", wire.receive_time.as_deref())?;
        Ok(Self {
            id,
            origin: wire.origin.unwrap_or_default(),
            tags: wire.tags.unwrap_or_default(),
            event_type: non_empty(wire.event_type)
                .unwrap_or_else(|| HEARTBEAT_EVENT_TYPE.to_owned()),
            create_time: create_time.unwrap_or_else(time::now),
            timeout: wire.timeout.unwrap_or(DEFAULT_TIMEOUT),
            receive_time,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn short_id(&self) -> &str {
        crate::short_id(&self.id)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn create_time(&self) -> DateTime<Utc> {
        self.create_time
    }

    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    pub fn receive_time(&self) -> Option<DateTime<Utc>> {
        self.receive_time
    }

    pub fn to_wire_body(&self) -> Value {
        let mut body = json!({
            "id": self.id,
            "origin": self.origin,
            "tags": self.tags,
            "type": self.event_type,
            "createTime": time::to_wire(&self.create_time),
            "timeout": self.timeout,
        });
        if let (Some(map), Some(receive_time)) = (body.as_object_mut(), self.receive_time) {
            map.insert("receiveTime".into(), time::to_wire(&receive_time).into());
        }
        body
    }
}

impl Timestamps for HeartbeatRecord {
    fn timestamp(&self, field: TimeField) -> Option<DateTime<Utc>> {
        match field {
            TimeField::CreateTime => Some(self.create_time),
            TimeField::ReceiveTime => self.receive_time,
            _ => None,
        }
    }
}

impl fmt::Display for HeartbeatRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = serde_json::to_string_pretty(&self.to_wire_body()).map_err(|_| fmt::Error)?;
        f.write_str(&body)
    }
}
