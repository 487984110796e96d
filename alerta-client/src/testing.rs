//! Scripted in-memory service for tests that span several requests.

use std::{collections::VecDeque, sync::Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{
    transport::{ApiRequest, RawResponse, Transport},
    ClientError,
};

/// Answers requests from a fixed script, in order, and records every request it sees.
pub(crate) struct FakeService {
    script: Mutex<VecDeque<RawResponse>>,
    seen: Mutex<Vec<ApiRequest>>,
}

impl FakeService {
    pub fn new(script: impl IntoIterator<Item = RawResponse>) -> Self {
        Self { script: Mutex::new(script.into_iter().collect()), seen: Mutex::new(Vec::new()) }
    }

    pub fn ok(body: Value) -> RawResponse {
        RawResponse { status: 200, body: body.to_string() }
    }

    pub fn status(status: u16, body: &str) -> RawResponse {
        RawResponse { status, body: body.to_owned() }
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for FakeService {
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, ClientError> {
        let response = self.script.lock().unwrap().pop_front();
        let Some(response) = response else {
            panic!("no scripted response left for {} {}", request.method, request.path);
        };
        self.seen.lock().unwrap().push(request);
        Ok(response)
    }
}

/// An alert record whose last receive time is `minute` minutes past 09:00 on 2024-05-20.
pub(crate) fn alert_json(id: &str, minute: u32) -> Value {
    json!({
        "id": id,
        "resource": "web01",
        "event": "HttpError",
        "severity": "major",
        "status": "open",
        "createTime": "2024-05-20T08:00:00.000Z",
        "receiveTime": "2024-05-20T08:00:00.100Z",
        "lastReceiveTime": format!("2024-05-20T09:{minute:02}:00.000Z"),
    })
}
