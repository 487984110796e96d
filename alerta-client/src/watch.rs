use std::{ops::ControlFlow, time::Duration};

use alerta_model::{time, AlertRecord};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{client::ApiClient, query::Query, transport::Transport, ClientError};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Repeatedly lists alerts matching a query, yielding only records newer than the last
/// batch. The cursor only moves forward.
pub struct Watcher<'a, T> {
    client: &'a ApiClient<T>,
    query: Query,
    interval: Duration,
    cursor: Option<DateTime<Utc>>,
}

impl<'a, T: Transport> Watcher<'a, T> {
    pub fn new(client: &'a ApiClient<T>, query: Query) -> Self {
        Self { client, query, interval: DEFAULT_INTERVAL, cursor: None }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Fetch one batch. Records at or before the current cursor are dropped even if the
    /// server returns them.
    pub async fn poll(&mut self) -> Result<Vec<AlertRecord>, ClientError> {
        let query = match self.cursor {
            Some(cursor) => self.query.with_from_date(time::to_wire(&cursor)),
            None => self.query.clone(),
        };
        let list = self.client.get_alerts(&query).await?;

        let cursor = self.cursor;
        let fresh: Vec<AlertRecord> = list
            .alerts
            .into_iter()
            .filter(|record| cursor.map_or(true, |cursor| record.latest_time() > cursor))
            .collect();

        let newest = fresh.iter().map(AlertRecord::latest_time).max();
        self.cursor = [self.cursor, list.last_time, newest].into_iter().flatten().max();
        debug!("watch cursor now {:?}", self.cursor.map(|c| time::to_wire(&c)));
        Ok(fresh)
    }

    /// Poll until `render` breaks or a request fails, sleeping between polls.
    pub async fn run<F>(&mut self, mut render: F) -> Result<(), ClientError>
    where
        F: FnMut(&[AlertRecord]) -> ControlFlow<()>,
    {
        loop {
            let batch = self.poll().await?;
            if render(&batch).is_break() {
                return Ok(());
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        query::FROM_DATE,
        testing::{alert_json, FakeService},
    };
    use serde_json::json;

    fn batch(records: &[(&str, u32)], last_time: Option<&str>) -> serde_json::Value {
        let alerts: Vec<_> = records.iter().map(|(id, minute)| alert_json(id, *minute)).collect();
        let mut body = json!({"status": "ok", "total": alerts.len(), "alerts": alerts});
        if let Some(last_time) = last_time {
            body["lastTime"] = json!(last_time);
        }
        body
    }

    fn from_date(request: &crate::transport::ApiRequest) -> Option<&str> {
        request.query.iter().find(|(k, _)| k == FROM_DATE).map(|(_, v)| v.as_str())
    }

    #[tokio::test]
    async fn test_cursor_advances_and_old_records_are_not_repeated() {
        let service = FakeService::new([
            FakeService::ok(batch(&[("a1", 1), ("a2", 5)], Some("2024-05-20T09:05:00.000Z"))),
            FakeService::ok(batch(&[("a2", 5), ("a3", 3), ("a4", 7)], None)),
            FakeService::ok(batch(&[], None)),
        ]);
        let client = ApiClient::new(service);
        let mut watcher = Watcher::new(&client, Query::from_tokens(["group=Web"]));

        let ids = |records: Vec<AlertRecord>| -> Vec<String> {
            records.iter().map(|r| r.id().to_owned()).collect()
        };
        assert_eq!(ids(watcher.poll().await.unwrap()), ["a1", "a2"]);
        assert_eq!(ids(watcher.poll().await.unwrap()), ["a4"]);

        assert!(watcher.poll().await.unwrap().is_empty());
        assert_eq!(
            watcher.cursor.map(|c| time::to_wire(&c)).as_deref(),
            Some("2024-05-20T09:07:00.000Z")
        );

        let requests = client.transport().requests();
        assert_eq!(from_date(&requests[0]), None);
        assert_eq!(from_date(&requests[1]), Some("2024-05-20T09:05:00.000Z"));
        assert_eq!(from_date(&requests[2]), Some("2024-05-20T09:07:00.000Z"));
    }

    #[tokio::test]
    async fn test_run_stops_when_renderer_breaks() {
        let service = FakeService::new([
            FakeService::ok(batch(&[("a1", 1)], None)),
            FakeService::ok(batch(&[("a2", 2)], None)),
        ]);
        let client = ApiClient::new(service);
        let mut watcher = Watcher::new(&client, Query::new()).interval(Duration::ZERO);

        let mut seen = Vec::new();
        watcher
            .run(|records| {
                seen.extend(records.iter().map(|r| r.id().to_owned()));
                if seen.len() >= 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .await
            .unwrap();

        assert_eq!(seen, ["a1", "a2"]);
        assert_eq!(client.transport().remaining(), 0);
    }

    #[tokio::test]
    async fn test_run_surfaces_errors() {
        let service =
            FakeService::new([FakeService::ok(json!({"status": "error", "message": "denied"}))]);
        let client = ApiClient::new(service);
        let mut watcher = Watcher::new(&client, Query::new()).interval(Duration::ZERO);
        let err = watcher.run(|_| ControlFlow::Continue(())).await.unwrap_err();
        assert!(matches!(err, ClientError::Service { .. }));
    }
}
