use std::time::Duration;

use alerta_model::{time, Alert, AlertRecord, Heartbeat, HeartbeatRecord, HistoryEntry, ModelError};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use strum::{Display, EnumString};
use tracing::debug;

use crate::{
    http::HttpTransport,
    query::Query,
    transport::{ApiRequest, Transport},
    ClientError,
};

/// Status values accepted by the set-status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum AlertStatus {
    Open,
    Ack,
    Assigned,
    Closed,
}

/// Answer to creating an alert.
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted {
    pub id: String,
    pub record: Option<AlertRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertList {
    pub alerts: Vec<AlertRecord>,
    pub total: u64,
    /// Newest receive time the server saw for this query.
    pub last_time: Option<DateTime<Utc>>,
}

/// Typed access to the alert API. All calls are sequential; each returns once the server has
/// answered.
#[derive(Debug, Clone)]
pub struct ApiClient<T = HttpTransport> {
    transport: T,
}

impl ApiClient<HttpTransport> {
    pub fn connect(endpoint: &str, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self::new(HttpTransport::new(endpoint, timeout)?))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// Execute a request and unwrap the response envelope. HTTP failures and envelopes with
    /// `"status": "error"` are reported as distinct errors.
    async fn call(&self, request: ApiRequest) -> Result<Value, ClientError> {
        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            return Err(ClientError::Transport {
                status_code: response.status,
                body: response.body,
            });
        }
        let body: Value = serde_json::from_str(&response.body).map_err(ModelError::from)?;
        if body.get("status").and_then(Value::as_str) == Some("error") {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_owned();
            return Err(ClientError::Service { message });
        }
        Ok(body)
    }

    pub async fn send_alert(&self, alert: &Alert) -> Result<Accepted, ClientError> {
        let mut request = ApiRequest::post("/alert", alert.to_wire_body());
        for (name, value) in alert.header().pairs() {
            request = request.header(name, value);
        }
        let mut body = self.call(request).await?;
        let record = match body.get_mut("alert").map(Value::take) {
            Some(Value::Null) | None => None,
            Some(value) => Some(AlertRecord::from_value(value)?),
        };
        let id = match (string_field(&body, "id"), &record) {
            (Some(id), _) => id,
            (None, Some(record)) => record.id().to_owned(),
            (None, None) => return Err(ClientError::MissingField("id")),
        };
        debug!("alert {id} accepted");
        Ok(Accepted { id, record })
    }

    pub async fn send_heartbeat(&self, heartbeat: &Heartbeat) -> Result<String, ClientError> {
        let mut request = ApiRequest::post("/heartbeat", heartbeat.to_wire_body());
        for (name, value) in heartbeat.header().pairs() {
            request = request.header(name, value);
        }
        let body = self.call(request).await?;
        string_field(&body, "id").ok_or(ClientError::MissingField("id"))
    }

    pub async fn get_alerts(&self, query: &Query) -> Result<AlertList, ClientError> {
        let mut body = self.call(ApiRequest::get("/alerts").query(query.to_params())).await?;
        let alerts = records(&mut body, "alerts", AlertRecord::from_value)?;
        let total = body.get("total").and_then(Value::as_u64).unwrap_or(alerts.len() as u64);
        let last_time = match body.get("lastTime").and_then(Value::as_str) {
            Some(raw) if !raw.is_empty() => Some(time::from_wire("lastTime", raw)?),
            _ => None,
        };
        Ok(AlertList { alerts, total, last_time })
    }

    pub async fn get_count(&self, query: &Query) -> Result<u64, ClientError> {
        let body = self.call(ApiRequest::get("/alerts/count").query(query.to_params())).await?;
        body.get("total").and_then(Value::as_u64).ok_or(ClientError::MissingField("total"))
    }

    pub async fn get_history(&self, query: &Query) -> Result<Vec<HistoryEntry>, ClientError> {
        let request = ApiRequest::get("/alerts/history").query(query.to_history_params());
        let mut body = self.call(request).await?;
        records(&mut body, "history", HistoryEntry::from_value)
    }

    pub async fn get_alert(&self, id: &str) -> Result<AlertRecord, ClientError> {
        let mut body = self.call(ApiRequest::get(format!("/alert/{id}"))).await?;
        match body.get_mut("alert").map(Value::take) {
            Some(value) if !value.is_null() => Ok(AlertRecord::from_value(value)?),
            _ => Err(ClientError::MissingField("alert")),
        }
    }

    pub async fn tag_alert(&self, id: &str, tags: &[String]) -> Result<(), ClientError> {
        self.call(ApiRequest::post(format!("/alert/{id}/tag"), json!({ "tags": tags }))).await?;
        Ok(())
    }

    pub async fn untag_alert(&self, id: &str, tags: &[String]) -> Result<(), ClientError> {
        self.call(ApiRequest::post(format!("/alert/{id}/untag"), json!({ "tags": tags }))).await?;
        Ok(())
    }

    pub async fn update_status(&self, id: &str, status: AlertStatus) -> Result<(), ClientError> {
        let body = json!({ "status": status.to_string() });
        self.call(ApiRequest::post(format!("/alert/{id}/status"), body)).await?;
        Ok(())
    }

    pub async fn open_alert(&self, id: &str) -> Result<(), ClientError> {
        self.update_status(id, AlertStatus::Open).await
    }

    pub async fn ack_alert(&self, id: &str) -> Result<(), ClientError> {
        self.update_status(id, AlertStatus::Ack).await
    }

    /// Un-acknowledging re-opens the alert.
    pub async fn unack_alert(&self, id: &str) -> Result<(), ClientError> {
        self.open_alert(id).await
    }

    pub async fn assign_alert(&self, id: &str) -> Result<(), ClientError> {
        self.update_status(id, AlertStatus::Assigned).await
    }

    pub async fn close_alert(&self, id: &str) -> Result<(), ClientError> {
        self.update_status(id, AlertStatus::Closed).await
    }

    pub async fn delete_alert(&self, id: &str) -> Result<(), ClientError> {
        self.call(ApiRequest::delete(format!("/alert/{id}"))).await?;
        Ok(())
    }

    pub async fn get_heartbeats(&self) -> Result<Vec<HeartbeatRecord>, ClientError> {
        let mut body = self.call(ApiRequest::get("/heartbeats")).await?;
        records(&mut body, "heartbeats", HeartbeatRecord::from_value)
    }

    pub async fn delete_heartbeat(&self, id: &str) -> Result<(), ClientError> {
        self.call(ApiRequest::delete(format!("/heartbeat/{id}"))).await?;
        Ok(())
    }
}

fn string_field(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_owned)
}

/// Decode the array under `key`. A missing or null array is treated as empty.
fn records<R>(
    body: &mut Value,
    key: &str,
    decode: fn(Value) -> Result<R, ModelError>,
) -> Result<Vec<R>, ClientError> {
    match body.get_mut(key).map(Value::take) {
        Some(Value::Array(items)) => {
            items.into_iter().map(|item| decode(item).map_err(ClientError::from)).collect()
        }
        _ => Ok(Vec::new()),
    }
}
