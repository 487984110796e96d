use std::path::Path;

use once_cell::sync::Lazy;
use sysinfo::System;

mod alert;
mod error;
mod heartbeat;
mod history;
mod record;
pub mod time;
mod wire;

pub use alert::{Alert, AlertBuilder, Header};
pub use error::{ModelError, ValidationError};
pub use heartbeat::{Heartbeat, HeartbeatBuilder, HeartbeatRecord};
pub use history::HistoryEntry;
pub use record::{AlertRecord, ServerFields};
pub use time::{TimeField, TimeStyle, Timestamps};

pub use chrono_tz::Tz;

pub const DEFAULT_SEVERITY: &str = "normal";
pub const DEFAULT_STATUS: &str = "unknown";
pub const DEFAULT_GROUP: &str = "Misc";
pub const DEFAULT_VALUE: &str = "n/a";
pub const DEFAULT_EVENT_TYPE: &str = "exceptionAlert";
pub const HEARTBEAT_EVENT_TYPE: &str = "Heartbeat";
/// Seconds an open alert or a heartbeat stays valid before the server expires it.
pub const DEFAULT_TIMEOUT: u64 = 86400;

static DEFAULT_ORIGIN: Lazy<String> = Lazy::new(|| {
    let program = std::env::args()
        .next()
        .as_deref()
        .and_then(|arg0| {
            Path::new(arg0).file_name().map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "alerta".to_string());
    let host = System::host_name().unwrap_or_else(|| "localhost".to_string());
    format!("{program}/{host}")
});

/// Origin used when the caller does not name one, in the form `<program>/<host>`.
pub fn default_origin() -> String {
    DEFAULT_ORIGIN.clone()
}

/// First eight characters of an identifier, as shown in listings.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}
