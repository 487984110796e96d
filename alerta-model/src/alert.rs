use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    default_origin,
    time::{self, TimeField, Timestamps},
    wire::{non_empty, WireAlert},
    ModelError, ValidationError, DEFAULT_EVENT_TYPE, DEFAULT_GROUP, DEFAULT_SEVERITY,
    DEFAULT_STATUS, DEFAULT_TIMEOUT, DEFAULT_VALUE,
};

/// Characters the server's storage layer reserves for its own query syntax.
const RESERVED_KEY_CHARS: [char; 2] = ['.', '$'];

/// An alert built on the client and not yet known to the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    id: String,
    resource: String,
    event: String,
    environment: String,
    severity: String,
    correlate: Vec<String>,
    status: String,
    service: Vec<String>,
    group: String,
    value: String,
    text: String,
    tags: Vec<String>,
    attributes: BTreeMap<String, Value>,
    origin: String,
    event_type: String,
    create_time: DateTime<Utc>,
    timeout: u64,
    raw_data: String,
    receive_time: Option<DateTime<Utc>>,
}

/// Metadata sent alongside the body of create requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub origin: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(rename = "correlation-id")]
    pub correlation_id: String,
}

impl Header {
    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("origin", self.origin.as_str()),
            ("type", self.event_type.as_str()),
            ("correlation-id", self.correlation_id.as_str()),
        ]
    }
}

impl Alert {
    pub fn builder(resource: impl Into<String>, event: impl Into<String>) -> AlertBuilder {
        AlertBuilder::new(resource, event)
    }

    /// Decode a client-side wire body. The `id` is kept when present.
    pub fn parse(payload: &str) -> Result<Self, ModelError> {
        let wire: WireAlert = serde_json::from_str(payload)?;
        Self::from_wire(wire)
    }

    pub(crate) fn from_wire(wire: WireAlert) -> Result<Self, ModelError> {
        let create_time = time::from_wire_opt("createTime", wire.create_time.as_deref())?;
        let mut builder = AlertBuilder::new(
            wire.resource.unwrap_or_default(),
            wire.event.unwrap_or_default(),
        );
        builder.id = wire.id;
        builder.environment = wire.environment;
        builder.severity = wire.severity;
        builder.correlate = wire.correlate.unwrap_or_default();
        builder.status = wire.status;
        builder.service = wire.service.unwrap_or_default();
        builder.group = wire.group;
        builder.value = wire.value;
        builder.text = wire.text;
        builder.tags = wire.tags.unwrap_or_default();
        builder.attributes = wire.attributes.unwrap_or_default();
        builder.origin = wire.origin;
        builder.event_type = wire.event_type;
        builder.create_time = create_time;
        builder.timeout = wire.timeout;
        builder.raw_data = wire.raw_data;
        Ok(builder.build()?)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn short_id(&self) -> &str {
        crate::short_id(&self.id)
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn severity(&self) -> &str {
        &self.severity
    }

    pub fn correlate(&self) -> &[String] {
        &self.correlate
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn service(&self) -> &[String] {
        &self.service
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    pub fn origin(&self) -> &str {
        &self.origin
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

    pub fn raw_data(&self) -> &str {
        &self.raw_data
    }

    pub fn receive_time(&self) -> Option<DateTime<Utc>> {
        self.receive_time
    }

    /// Stamp the alert as received now.
    pub fn mark_received(&mut self) {
        self.receive_time = Some(time::now());
    }

    pub(crate) fn set_status(&mut self, status: String) {
        self.status = status;
    }

    pub fn header(&self) -> Header {
        Header {
            origin: self.origin.clone(),
            event_type: self.event_type.clone(),
            correlation_id: self.id.clone(),
        }
    }

    /// The body sent when creating the alert.
    pub fn to_wire_body(&self) -> Value {
        json!({
            "id": self.id,
            "resource": self.resource,
            "event": self.event,
            "environment": self.environment,
            "severity": self.severity,
            "correlate": self.correlate,
            "status": self.status,
            "service": self.service,
            "group": self.group,
            "value": self.value,
            "text": self.text,
            "tags": self.tags,
            "attributes": self.attributes,
            "origin": self.origin,
            "type": self.event_type,
            "createTime": time::to_wire(&self.create_time),
            "timeout": self.timeout,
            "rawData": self.raw_data,
        })
    }
}

impl Timestamps for Alert {
    fn timestamp(&self, field: TimeField) -> Option<DateTime<Utc>> {
        match field {
            TimeField::CreateTime => Some(self.create_time),
            TimeField::ReceiveTime => self.receive_time,
            TimeField::LastReceiveTime | TimeField::ExpireTime => None,
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = serde_json::to_string_pretty(&self.to_wire_body()).map_err(|_| fmt::Error)?;
        f.write_str(&body)
    }
}

macro_rules! string_setters {
    ($($(#[$meta:meta])* $field:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $field(mut self, $field: impl Into<String>) -> Self {
                self.$field = Some($field.into());
                self
            }
        )*
    };
}

/// Named optional fields for [`Alert`]. Anything left unset takes its documented default.
#[derive(Debug, Clone, Default)]
pub struct AlertBuilder {
    id: Option<String>,
    resource: String,
    event: String,
    environment: Option<String>,
    severity: Option<String>,
    correlate: Vec<String>,
    status: Option<String>,
    service: Vec<String>,
    group: Option<String>,
    value: Option<String>,
    text: Option<String>,
    tags: Vec<String>,
    attributes: BTreeMap<String, Value>,
    origin: Option<String>,
    event_type: Option<String>,
    create_time: Option<DateTime<Utc>>,
    timeout: Option<u64>,
    raw_data: Option<String>,
}

impl AlertBuilder {
    pub fn new(resource: impl Into<String>, event: impl Into<String>) -> Self {
        Self { resource: resource.into(), event: event.into(), ..Default::default() }
    }

    string_setters! {
        /// Use a known identifier instead of generating one.
        id,
        environment,
        severity,
        /// Status is normally assigned by the server.
        status,
        group,
        value,
        text,
        /// Usually of the form `app/host`.
        origin,
        event_type,
        raw_data,
    }

    pub fn correlate<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.correlate = events.into_iter().map(Into::into).collect();
        self
    }

    pub fn service<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.service = services.into_iter().map(Into::into).collect();
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

    pub fn attributes(mut self, attributes: BTreeMap<String, Value>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
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

    pub fn build(self) -> Result<Alert, ValidationError> {
        if self.resource.is_empty() {
            return Err(ValidationError::MissingField("resource"));
        }
        if self.event.is_empty() {
            return Err(ValidationError::MissingField("event"));
        }
        if let Some(key) = self.attributes.keys().find(|key| key.contains(RESERVED_KEY_CHARS)) {
            return Err(ValidationError::ReservedAttributeKey(key.clone()));
        }

        let mut correlate = self.correlate;
        if !correlate.is_empty() && !correlate.contains(&self.event) {
            correlate.push(self.event.clone());
        }

        // An empty string stands for "not given", the same as on the wire.
        let or_default = |value: Option<String>, default: &str| {
            non_empty(value).unwrap_or_else(|| default.to_owned())
        };

        Ok(Alert {
            id: non_empty(self.id).unwrap_or_else(|| Uuid::new_v4().to_string()),
            resource: self.resource,
            event: self.event,
            environment: self.environment.unwrap_or_default(),
            severity: or_default(self.severity, DEFAULT_SEVERITY),
            correlate,
            status: or_default(self.status, DEFAULT_STATUS),
            service: self.service,
            group: or_default(self.group, DEFAULT_GROUP),
            value: or_default(self.value, DEFAULT_VALUE),
            text: self.text.unwrap_or_default(),
            tags: self.tags,
            attributes: self.attributes,
            origin: non_empty(self.origin).unwrap_or_else(default_origin),
            event_type: or_default(self.event_type, DEFAULT_EVENT_TYPE),
            create_time: self.create_time.unwrap_or_else(time::now),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            raw_data: self.raw_data.unwrap_or_default(),
            receive_time: None,
        })
    }
}
