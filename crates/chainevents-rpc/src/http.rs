//! HTTP JSON-RPC transport backed by `reqwest`.
//!
//! Stateless per request; retries belong to the caller.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::RpcError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};
use crate::transport::RpcTransport;

pub struct HttpTransport {
    url: String,
    http: reqwest::Client,
}

impl HttpTransport {
    /// Build a client for `url`. No network I/O happens here.
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RpcError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, RpcError> {
        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| RpcError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RpcError::Http(format!("HTTP {status}: {body}")));
        }

        resp.json::<JsonRpcResponse>()
            .await
            .map_err(|e| RpcError::Http(e.to_string()))
    }

    fn url(&self) -> &str {
        &self.url
    }
}
