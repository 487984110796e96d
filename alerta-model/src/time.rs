//! Timestamp handling shared by alerts and heartbeats.
//!
//! Every timestamp is held as a UTC instant. The wire carries them as
//! `%Y-%m-%dT%H:%M:%S.%fZ` with millisecond precision; every other textual form is
//! rendered on demand through [`TimeStyle`].

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use chrono_tz::Tz;
use strum::{Display, EnumIter, EnumString};

use crate::ValidationError;

/// Format used when writing timestamps to the wire.
pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

const WIRE_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Current instant, truncated to the precision the wire can carry.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub fn to_wire(instant: &DateTime<Utc>) -> String {
    instant.format(WIRE_FORMAT).to_string()
}

/// Parse a wire timestamp. The fractional seconds and the trailing `Z` are mandatory.
pub fn from_wire(field: &'static str, value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let invalid = || ValidationError::InvalidTimestamp { field, value: value.to_owned() };
    if !value.contains('.') {
        return Err(invalid());
    }
    NaiveDateTime::parse_from_str(value, WIRE_PARSE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| invalid())
}

pub(crate) fn from_wire_opt(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, ValidationError> {
    value.map(|v| from_wire(field, v)).transpose()
}

/// Serde adapter for fields that always carry a wire timestamp.
pub mod serde_wire {
    use chrono::{DateTime, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_wire(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::from_wire("timestamp", &raw).map_err(D::Error::custom)
    }
}

/// Timestamp-valued fields of alerts and heartbeats. Accepts both the wire name and the
/// snake_case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum TimeField {
    #[strum(to_string = "createTime", serialize = "create_time")]
    CreateTime,
    #[strum(to_string = "receiveTime", serialize = "receive_time")]
    ReceiveTime,
    #[strum(to_string = "lastReceiveTime", serialize = "last_receive_time")]
    LastReceiveTime,
    #[strum(to_string = "expireTime", serialize = "expire_time")]
    ExpireTime,
}

impl TimeField {
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        Self::from_str(name).map_err(|_| ValidationError::NotATimestamp(name.to_owned()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum TimeStyle {
    /// `YYYY/MM/DD HH:MM:SS` in the configured zone.
    #[default]
    #[strum(to_string = "local")]
    Local,
    #[strum(to_string = "iso", serialize = "iso8601")]
    Iso,
    #[strum(to_string = "rfc", serialize = "rfc2822")]
    Rfc,
    /// Abbreviated weekday, day of month and time in the configured zone.
    #[strum(to_string = "short")]
    Short,
    /// Whole seconds since the unix epoch.
    #[strum(to_string = "epoch")]
    Epoch,
    #[strum(to_string = "raw")]
    Raw,
}

impl TimeStyle {
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        Self::from_str(name).map_err(|_| ValidationError::UnknownTimeStyle(name.to_owned()))
    }

    pub fn render(self, instant: &DateTime<Utc>, tz: Tz) -> String {
        match self {
            Self::Local => instant.with_timezone(&tz).format("%Y/%m/%d %H:%M:%S").to_string(),
            Self::Iso => to_wire(instant),
            Self::Rfc => instant.to_rfc2822(),
            Self::Short => instant.with_timezone(&tz).format("%a %d %H:%M:%S").to_string(),
            Self::Epoch => instant.timestamp().to_string(),
            Self::Raw => instant.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }
}

/// Access to the timestamp fields of a domain object and their textual projections.
pub trait Timestamps {
    /// The instant stored for `field`, or `None` if the object has no such value.
    fn timestamp(&self, field: TimeField) -> Option<DateTime<Utc>>;

    fn format_time(
        &self,
        field: TimeField,
        style: TimeStyle,
        tz: Tz,
    ) -> Result<String, ValidationError> {
        let instant = self.timestamp(field).ok_or(ValidationError::TimestampNotSet(field))?;
        Ok(style.render(&instant, tz))
    }

    /// Render the named field in the named style, e.g. `("lastReceiveTime", "iso")`.
    fn format_timestamp(
        &self,
        field: &str,
        style: &str,
        tz: Tz,
    ) -> Result<String, ValidationError> {
        let field = TimeField::parse(field)?;
        let style = TimeStyle::parse(style)?;
        self.format_time(field, style, tz)
    }
}
