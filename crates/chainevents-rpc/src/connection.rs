//! Connection Manager: dial, probe, retry, reconnect.
//!
//! ```text
//! Disconnected ──connect()──▶ Connecting ──dial + probe ok──▶ Verified ──▶ Active
//!      ▲                           │                                        │
//!      └──── attempt failed ───────┘◀──────── mark_failed() / reconnect() ──┘
//! ```
//!
//! The connection is replaced wholesale on reconnect; holders of the old
//! `Arc<dyn EvmRpc>` keep a closed client.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chainevents_core::{ConfigError, IndexerConfig, RetryBudget};

use crate::client::{EthClient, EvmRpc};
use crate::error::RpcError;
use crate::http::HttpTransport;
use crate::ws::WsTransport;

/// The four recognised endpoint schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
    Ws,
    Wss,
}

impl Scheme {
    pub fn is_websocket(self) -> bool {
        matches!(self, Self::Ws | Self::Wss)
    }
}

/// A validated RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: String,
    scheme: Scheme,
    host: String,
}

impl Endpoint {
    /// Validate `url`. An unknown scheme is a configuration error.
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let parsed = url::Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let scheme = match parsed.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            "ws" => Scheme::Ws,
            "wss" => Scheme::Wss,
            _ => {
                return Err(ConfigError::UnsupportedScheme {
                    url: url.to_string(),
                })
            }
        };
        Ok(Self {
            url: url.to_string(),
            scheme,
            host: parsed.host_str().unwrap_or_default().to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// `scheme://host`, safe to log (paths often carry API keys).
    pub fn redacted(&self) -> String {
        let scheme = match self.scheme {
            Scheme::Http => "http",
            Scheme::Https => "https",
            Scheme::Ws => "ws",
            Scheme::Wss => "wss",
        };
        format!("{scheme}://{}", self.host)
    }
}

/// Opens a fresh connection to an endpoint.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, endpoint: &Endpoint) -> Result<Arc<dyn EvmRpc>, RpcError>;
}

/// Dials real nodes: `reqwest` for http(s), `tokio-tungstenite` for ws(s).
#[derive(Debug, Clone)]
pub struct NodeDialer {
    call_timeout: Duration,
}

impl NodeDialer {
    pub fn new(call_timeout: Duration) -> Self {
        Self { call_timeout }
    }
}

#[async_trait]
impl Dialer for NodeDialer {
    async fn dial(&self, endpoint: &Endpoint) -> Result<Arc<dyn EvmRpc>, RpcError> {
        let client: Arc<dyn EvmRpc> = if endpoint.scheme().is_websocket() {
            let transport = WsTransport::connect(endpoint.url()).await?;
            Arc::new(EthClient::new(transport, self.call_timeout))
        } else {
            let transport = HttpTransport::new(endpoint.url(), self.call_timeout)?;
            Arc::new(EthClient::new(transport, self.call_timeout))
        };
        Ok(client)
    }
}

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    /// Dialed and the liveness probe answered.
    Verified,
    /// Handed out to the indexer.
    Active,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Verified => write!(f, "verified"),
            Self::Active => write!(f, "active"),
        }
    }
}

/// Owns the single live RPC connection.
pub struct ConnectionManager {
    endpoint: Endpoint,
    dialer: Arc<dyn Dialer>,
    retry: RetryBudget,
    dial_timeout: Duration,
    probe_timeout: Duration,
    state: ConnectionState,
    client: Option<Arc<dyn EvmRpc>>,
}

impl ConnectionManager {
    pub fn new(
        endpoint: Endpoint,
        dialer: Arc<dyn Dialer>,
        retry: RetryBudget,
        dial_timeout: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            endpoint,
            dialer,
            retry,
            dial_timeout,
            probe_timeout,
            state: ConnectionState::Disconnected,
            client: None,
        }
    }

    /// Manager for `config.rpc_url` using the real node dialer.
    pub fn from_config(config: &IndexerConfig) -> Result<Self, ConfigError> {
        let endpoint = Endpoint::parse(&config.rpc_url)?;
        Ok(Self::new(
            endpoint,
            Arc::new(NodeDialer::new(config.call_timeout)),
            config.connect_retry,
            config.call_timeout,
            config.probe_timeout,
        ))
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn retry(&self) -> RetryBudget {
        self.retry
    }

    /// The active connection, if any.
    pub fn client(&self) -> Option<Arc<dyn EvmRpc>> {
        self.client.clone()
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "connection state");
            self.state = next;
        }
    }

    /// Dial and probe until one attempt succeeds or the budget runs out.
    pub async fn connect(&mut self) -> Result<Arc<dyn EvmRpc>, RpcError> {
        let attempts = self.retry.attempts();
        let mut last = RpcError::Closed;

        for attempt in 1..=attempts {
            self.transition(ConnectionState::Connecting);
            tracing::info!(endpoint = %self.endpoint.redacted(), attempt, max = attempts, "connecting to RPC");

            match self.try_once().await {
                Ok(client) => {
                    self.client = Some(client.clone());
                    self.transition(ConnectionState::Active);
                    return Ok(client);
                }
                Err(e) => {
                    self.transition(ConnectionState::Disconnected);
                    tracing::warn!(attempt, max = attempts, error = %e, "connect attempt failed");
                    last = e;
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.retry.delay).await;
            }
        }

        tracing::error!(attempts, error = %last, "giving up on RPC endpoint");
        Err(RpcError::ConnectExhausted {
            attempts,
            last: last.to_string(),
        })
    }

    async fn try_once(&mut self) -> Result<Arc<dyn EvmRpc>, RpcError> {
        let client = tokio::time::timeout(self.dial_timeout, self.dialer.dial(&self.endpoint))
            .await
            .map_err(|_| RpcError::Timeout {
                ms: self.dial_timeout.as_millis() as u64,
            })??;

        match tokio::time::timeout(self.probe_timeout, client.latest_header()).await {
            Ok(Ok(head)) => {
                self.transition(ConnectionState::Verified);
                tracing::info!(endpoint = %self.endpoint.redacted(), head = head.number, "connected to RPC");
                Ok(client)
            }
            Ok(Err(e)) => {
                client.close().await;
                Err(e)
            }
            Err(_) => {
                client.close().await;
                Err(RpcError::Timeout {
                    ms: self.probe_timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Record a runtime I/O failure on the active connection.
    pub fn mark_failed(&mut self) {
        self.transition(ConnectionState::Disconnected);
    }

    /// Drop the current connection and run `connect` again.
    pub async fn reconnect(&mut self) -> Result<Arc<dyn EvmRpc>, RpcError> {
        if let Some(old) = self.client.take() {
            old.close().await;
        }
        self.transition(ConnectionState::Disconnected);
        tracing::info!(endpoint = %self.endpoint.redacted(), "reconnecting to RPC");
        self.connect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256};
    use chainevents_core::{BlockHeader, RawLog};
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    struct Node {
        healthy: bool,
        closed: AtomicBool,
    }

    #[async_trait]
    impl EvmRpc for Node {
        async fn latest_header(&self) -> Result<BlockHeader, RpcError> {
            if self.healthy {
                Ok(BlockHeader {
                    number: 42,
                    hash: B256::ZERO,
                })
            } else {
                Err(RpcError::Http("503".into()))
            }
        }

        async fn filter_logs(&self, _: Address, _: u64, _: u64) -> Result<Vec<RawLog>, RpcError> {
            Ok(vec![])
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    /// Dial fails `dial_failures` times, then probes fail `probe_failures` times.
    struct ScriptedDialer {
        dial_failures: u32,
        probe_failures: u32,
        calls: AtomicU32,
    }

    impl ScriptedDialer {
        fn new(dial_failures: u32, probe_failures: u32) -> Arc<Self> {
            Arc::new(Self {
                dial_failures,
                probe_failures,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl Dialer for ScriptedDialer {
        async fn dial(&self, _: &Endpoint) -> Result<Arc<dyn EvmRpc>, RpcError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.dial_failures {
                return Err(RpcError::Http("connection refused".into()));
            }
            Ok(Arc::new(Node {
                healthy: n >= self.dial_failures + self.probe_failures,
                closed: AtomicBool::new(false),
            }))
        }
    }

    fn manager(dialer: Arc<ScriptedDialer>, attempts: u32) -> ConnectionManager {
        ConnectionManager::new(
            Endpoint::parse("http://localhost:8545").unwrap(),
            dialer,
            RetryBudget::new(attempts, Duration::ZERO),
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
    }

    #[test]
    fn endpoint_schemes() {
        for url in ["http://a", "https://a/v2/key", "ws://a:8546", "wss://a"] {
            assert!(Endpoint::parse(url).is_ok(), "{url}");
        }
        assert!(matches!(
            Endpoint::parse("ftp://node"),
            Err(ConfigError::UnsupportedScheme { .. })
        ));
        assert!(matches!(
            Endpoint::parse("not a url"),
            Err(ConfigError::InvalidUrl { .. })
        ));
        let ep = Endpoint::parse("https://base.example.com/v2/secret").unwrap();
        assert_eq!(ep.redacted(), "https://base.example.com");
        assert!(Endpoint::parse("wss://a").unwrap().scheme().is_websocket());
    }

    #[tokio::test]
    async fn connect_retries_dial_and_probe_failures() {
        let dialer = ScriptedDialer::new(2, 1);
        let mut mgr = manager(dialer.clone(), 5);
        assert_eq!(mgr.state(), ConnectionState::Disconnected);

        let client = mgr.connect().await.unwrap();
        assert_eq!(client.latest_header().await.unwrap().number, 42);
        assert_eq!(dialer.calls.load(Ordering::SeqCst), 4);
        assert_eq!(mgr.state(), ConnectionState::Active);
    }

    #[tokio::test]
    async fn connect_gives_up_after_budget() {
        let dialer = ScriptedDialer::new(u32::MAX, 0);
        let mut mgr = manager(dialer.clone(), 3);
        let err = mgr.connect().await.err().unwrap();
        assert!(matches!(err, RpcError::ConnectExhausted { attempts: 3, .. }));
        assert_eq!(dialer.calls.load(Ordering::SeqCst), 3);
        assert_eq!(mgr.state(), ConnectionState::Disconnected);
        assert!(mgr.client().is_none());
    }

    #[tokio::test]
    async fn reconnect_replaces_connection() {
        let dialer = ScriptedDialer::new(0, 0);
        let mut mgr = manager(dialer.clone(), 2);
        let first = mgr.connect().await.unwrap();
        mgr.mark_failed();
        assert_eq!(mgr.state(), ConnectionState::Disconnected);

        let second = mgr.reconnect().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(dialer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(mgr.state(), ConnectionState::Active);
    }
}
