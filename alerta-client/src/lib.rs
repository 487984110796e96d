mod bulk;
mod client;
mod error;
mod http;
pub mod query;
mod transport;
pub mod watch;

#[cfg(test)]
mod testing;

pub use bulk::{percent, BulkAction, BulkProgress, BulkReport, Silent};
pub use client::{Accepted, AlertList, AlertStatus, ApiClient};
pub use error::ClientError;
pub use http::HttpTransport;
pub use query::{Filter, Operator, Query};
pub use transport::{ApiRequest, Method, RawResponse, Transport};
pub use watch::Watcher;

/// Name of the HTTP stack requests are sent with.
pub const HTTP_LIBRARY: &str = "reqwest 0.12";
