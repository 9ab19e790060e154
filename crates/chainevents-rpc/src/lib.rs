//! chainevents-rpc: everything between the indexer and the node.
//!
//! - [`transport`]: the `RpcTransport` trait plus HTTP ([`http`]) and
//!   WebSocket ([`ws`]) implementations.
//! - [`client`]: the two EVM calls the indexer needs, behind `EvmRpc`.
//! - [`connection`]: dial + liveness probe + bounded retry, and reconnect.

pub mod client;
pub mod connection;
pub mod error;
pub mod http;
pub mod request;
pub mod transport;
pub mod wire;
pub mod ws;

pub use client::{EthClient, EvmRpc};
pub use connection::{ConnectionManager, ConnectionState, Dialer, Endpoint, NodeDialer, Scheme};
pub use error::RpcError;
pub use http::HttpTransport;
pub use transport::RpcTransport;
pub use ws::WsTransport;
