use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::{
    transport::{ApiRequest, Method, RawResponse, Transport},
    ClientError,
};

/// [`Transport`] backed by a `reqwest` client bound to one API endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ClientError> {
        let endpoint = Url::parse(endpoint)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    fn url_for(&self, path: &str) -> Result<Url, ClientError> {
        let base = self.endpoint.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, ClientError> {
        let url = self.url_for(&request.path)?;
        debug!("{} {url} query={:?}", request.method, request.query);

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self.client.request(method, url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            debug!("Request Headers: {:?}", request.headers);
            debug!("Request Body: {body}");
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!("Response Status: {status}");
        debug!("Response Body: {body}");
        Ok(RawResponse { status, body })
    }
}
