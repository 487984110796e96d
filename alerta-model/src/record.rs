use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    alert::Alert,
    time::{self, TimeField, Timestamps},
    wire::{non_empty, WireAlert},
    ModelError, ValidationError,
};

/// Values the server computes when it accepts an alert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerFields {
    /// Server-assigned status; replaces the client's value when present.
    pub status: Option<String>,
    pub duplicate_count: u64,
    pub repeat: bool,
    pub previous_severity: Option<String>,
    pub trend_indication: Option<String>,
    pub receive_time: Option<DateTime<Utc>>,
    pub last_receive_id: Option<String>,
    pub last_receive_time: Option<DateTime<Utc>>,
    pub expire_time: Option<DateTime<Utc>>,
    pub history: Vec<Value>,
}

/// The server's view of an alert. Records are rebuilt from every response and never
/// updated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRecord {
    alert: Alert,
    server: ServerFields,
}

impl AlertRecord {
    /// Upgrade a client alert with the fields the server filled in on acceptance.
    pub fn from_accepted(mut alert: Alert, mut server: ServerFields) -> Self {
        if let Some(status) = server.status.take() {
            alert.set_status(status);
        }
        server.receive_time = server.receive_time.or(alert.receive_time());
        Self { alert, server }
    }

    pub fn parse(payload: &str) -> Result<Self, ModelError> {
        let wire: WireAlert = serde_json::from_str(payload)?;
        Self::from_wire(wire)
    }

    pub fn from_value(value: Value) -> Result<Self, ModelError> {
        let wire: WireAlert = serde_json::from_value(value)?;
        Self::from_wire(wire)
    }

    fn from_wire(mut wire: WireAlert) -> Result<Self, ModelError> {
        if non_empty(wire.id.clone()).is_none() {
            return Err(ValidationError::MissingField("id").into());
        }
        let receive_time = time::from_wire_opt("receiveTime", wire.receive_time.as_deref())?;
        let last_receive_time =
            time::from_wire_opt("lastReceiveTime", wire.last_receive_time.as_deref())?;
        let expire_time = time::from_wire_opt("expireTime", wire.expire_time.as_deref())?;

        let server = ServerFields {
            status: None,
            duplicate_count: wire.duplicate_count.take().unwrap_or_default(),
            repeat: wire.repeat.take().unwrap_or_default(),
            previous_severity: wire.previous_severity.take(),
            trend_indication: wire.trend_indication.take(),
            receive_time,
            last_receive_id: wire.last_receive_id.take(),
            last_receive_time,
            expire_time,
            history: wire.history.take().unwrap_or_default(),
        };
        let alert = Alert::from_wire(wire)?;
        Ok(Self { alert, server })
    }

    pub fn id(&self) -> &str {
        self.alert.id()
    }

    pub fn short_id(&self) -> &str {
        self.alert.short_id()
    }

    /// The client-side fields of the record.
    pub fn alert(&self) -> &Alert {
        &self.alert
    }

    pub fn server(&self) -> &ServerFields {
        &self.server
    }

    pub fn duplicate_count(&self) -> u64 {
        self.server.duplicate_count
    }

    pub fn repeat(&self) -> bool {
        self.server.repeat
    }

    pub fn receive_time(&self) -> Option<DateTime<Utc>> {
        self.server.receive_time
    }

    pub fn last_receive_time(&self) -> Option<DateTime<Utc>> {
        self.server.last_receive_time
    }

    /// The instant the record was last seen by the server, falling back to its creation.
    pub fn latest_time(&self) -> DateTime<Utc> {
        self.server
            .last_receive_time
            .or(self.server.receive_time)
            .unwrap_or_else(|| self.alert.create_time())
    }

    pub fn to_wire_body(&self) -> Value {
        let mut body = self.alert.to_wire_body();
        let Some(map) = body.as_object_mut() else {
            return body;
        };
        let server = &self.server;
        map.insert("duplicateCount".into(), server.duplicate_count.into());
        map.insert("repeat".into(), server.repeat.into());
        if let Some(previous) = &server.previous_severity {
            map.insert("previousSeverity".into(), previous.clone().into());
        }
        if let Some(trend) = &server.trend_indication {
            map.insert("trendIndication".into(), trend.clone().into());
        }
        if let Some(id) = &server.last_receive_id {
            map.insert("lastReceiveId".into(), id.clone().into());
        }
        for (key, instant) in [
            ("receiveTime", server.receive_time),
            ("lastReceiveTime", server.last_receive_time),
            ("expireTime", server.expire_time),
        ] {
            if let Some(instant) = instant {
                map.insert(key.into(), time::to_wire(&instant).into());
            }
        }
        map.insert("history".into(), Value::Array(server.history.clone()));
        body
    }
}

impl Timestamps for AlertRecord {
    fn timestamp(&self, field: TimeField) -> Option<DateTime<Utc>> {
        match field {
            TimeField::CreateTime => Some(self.alert.create_time()),
            TimeField::ReceiveTime => self.server.receive_time,
            TimeField::LastReceiveTime => self.server.last_receive_time,
            TimeField::ExpireTime => self.server.expire_time,
        }
    }
}

impl fmt::Display for AlertRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = serde_json::to_string_pretty(&self.to_wire_body()).map_err(|_| fmt::Error)?;
        f.write_str(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(h: u32, m: u32, s: u32, ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, h, m, s).unwrap() + chrono::Duration::milliseconds(ms)
    }

    fn record() -> AlertRecord {
        let alert = Alert::builder("web01", "HttpError")
            .environment("Production")
            .severity("major")
            .correlate(["HttpOK"])
            .service(["Web"])
            .tags(["london"])
            .attribute("region", "eu-west-1")
            .create_time(at(9, 0, 0, 17))
            .raw_data("500 Internal Server Error")
            .build()
            .unwrap();
        AlertRecord::from_accepted(
            alert,
            ServerFields {
                status: Some("open".into()),
                duplicate_count: 3,
                repeat: true,
                previous_severity: Some("minor".into()),
                trend_indication: Some("moreSevere".into()),
                receive_time: Some(at(9, 0, 0, 250)),
                last_receive_id: Some("e3f1c2aa-1111-2222-3333-444455556666".into()),
                last_receive_time: Some(at(9, 15, 42, 999)),
                expire_time: Some(at(10, 0, 0, 0)),
                history: vec![json!({"event": "HttpError", "severity": "minor"})],
            },
        )
    }

    #[test]
    fn test_from_accepted_applies_server_status() {
        let record = record();
        assert_eq!(record.alert().status(), "open");
        assert_eq!(record.server().status, None);
        assert_eq!(record.duplicate_count(), 3);
        assert!(record.repeat());
        assert_eq!(record.alert().correlate(), ["HttpOK", "HttpError"]);
    }

    #[test]
    fn test_roundtrip_preserves_every_field() {
        let record = record();
        let parsed = AlertRecord::parse(&record.to_wire_body().to_string()).unwrap();
        assert_eq!(parsed, record);
        for field in [
            TimeField::CreateTime,
            TimeField::ReceiveTime,
            TimeField::LastReceiveTime,
            TimeField::ExpireTime,
        ] {
            assert_eq!(parsed.timestamp(field), record.timestamp(field));
            assert!(parsed.timestamp(field).is_some());
        }
    }

    #[test]
    fn test_roundtrip_of_empty_strings() {
        let alert = Alert::builder("web01", "HttpError")
            .group("")
            .origin("")
            .severity("")
            .value("")
            .event_type("")
            .create_time(at(9, 0, 0, 0))
            .build()
            .unwrap();
        assert_eq!(alert.group(), "Misc");
        assert_eq!(alert.origin(), crate::default_origin());
        assert_eq!(alert.severity(), "normal");

        let record = AlertRecord::from_accepted(alert, ServerFields::default());
        let parsed = AlertRecord::parse(&record.to_wire_body().to_string()).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_parse_applies_defaults() {
        let record = AlertRecord::from_value(json!({
            "id": "5108bc20-0000-0000-0000-000000000000",
            "resource": "web01",
            "event": "HttpError",
            "environment": null,
            "group": "",
            "lastReceiveTime": "2024-05-20T09:15:42.999Z",
            "someFutureField": {"ignored": true}
        }))
        .unwrap();
        let alert = record.alert();
        assert_eq!(alert.environment(), "");
        assert_eq!(alert.group(), "Misc");
        assert_eq!(alert.value(), "n/a");
        assert_eq!(alert.severity(), "normal");
        assert_eq!(alert.status(), "unknown");
        assert_eq!(alert.event_type(), "exceptionAlert");
        assert_eq!(alert.timeout(), 86400);
        assert_eq!(record.duplicate_count(), 0);
        assert!(!record.repeat());
        assert!(record.server().history.is_empty());
        assert_eq!(record.last_receive_time(), Some(at(9, 15, 42, 999)));
        assert_eq!(record.latest_time(), at(9, 15, 42, 999));
    }

    #[test]
    fn test_parse_error_kinds() {
        assert!(matches!(AlertRecord::parse("{not json"), Err(ModelError::Parse(_))));

        let missing_event = json!({"id": "a", "resource": "web01"});
        assert!(matches!(
            AlertRecord::from_value(missing_event),
            Err(ModelError::Validation(ValidationError::MissingField("event")))
        ));

        let missing_id = json!({"resource": "web01", "event": "HttpError"});
        assert!(matches!(
            AlertRecord::from_value(missing_id),
            Err(ModelError::Validation(ValidationError::MissingField("id")))
        ));

        for field in ["createTime", "receiveTime", "lastReceiveTime", "expireTime"] {
            let mut payload = json!({"id": "a", "resource": "web01", "event": "HttpError"});
            payload[field] = json!("2024-05-20 09:15:42");
            match AlertRecord::from_value(payload) {
                Err(ModelError::Validation(ValidationError::InvalidTimestamp { field: f, .. })) => {
                    assert_eq!(f, field)
                }
                other => panic!("expected invalid timestamp for {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_reserved_attribute_key_in_payload() {
        let payload = json!({
            "id": "a",
            "resource": "web01",
            "event": "HttpError",
            "attributes": {"$set": 1}
        });
        assert!(matches!(
            AlertRecord::from_value(payload),
            Err(ModelError::Validation(ValidationError::ReservedAttributeKey(_)))
        ));
    }

    #[test]
    fn test_format_record_timestamps() {
        let record = record();
        let tz = crate::Tz::UTC;
        assert_eq!(
            record.format_timestamp("lastReceiveTime", "iso", tz).unwrap(),
            "2024-05-20T09:15:42.999Z"
        );
        assert_eq!(
            record.format_timestamp("expireTime", "local", tz).unwrap(),
            "2024/05/20 10:00:00"
        );
    }
}
