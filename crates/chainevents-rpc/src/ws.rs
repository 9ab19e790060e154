//! WebSocket JSON-RPC transport.
//!
//! A background task owns the socket. Callers hand requests to it over a
//! channel and get the matching response (by id) back on a oneshot. When the
//! socket drops, every pending and future request fails; reconnecting is the
//! `ConnectionManager`'s job, not this transport's.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::RpcError;
use crate::request::{JsonRpcRequest, JsonRpcResponse, RpcId};
use crate::transport::RpcTransport;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Reply = oneshot::Sender<Result<JsonRpcResponse, RpcError>>;

enum WsCommand {
    Send { req: JsonRpcRequest, tx: Reply },
    Close,
}

pub struct WsTransport {
    url: String,
    cmd_tx: mpsc::UnboundedSender<WsCommand>,
}

impl WsTransport {
    /// Open the socket and start the background task.
    ///
    /// Fails if the handshake fails; nothing is retried here.
    pub async fn connect(url: impl Into<String>) -> Result<Self, RpcError> {
        let url = url.into();
        let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| RpcError::WebSocket(e.to_string()))?;
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        tokio::spawn(ws_task(url.clone(), ws_stream, cmd_rx));
        Ok(Self { url, cmd_tx })
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(WsCommand::Close);
    }
}

#[async_trait]
impl RpcTransport for WsTransport {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, RpcError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(WsCommand::Send { req, tx })
            .map_err(|_| RpcError::Closed)?;
        rx.await.map_err(|_| RpcError::Closed)?
    }

    async fn close(&self) {
        let _ = self.cmd_tx.send(WsCommand::Close);
    }

    fn url(&self) -> &str {
        &self.url
    }
}

async fn ws_task(url: String, ws_stream: WsStream, mut cmd_rx: mpsc::UnboundedReceiver<WsCommand>) {
    let (mut sink, mut stream) = ws_stream.split();
    let mut pending: HashMap<u64, Reply> = HashMap::new();

    let reason = loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                None | Some(WsCommand::Close) => {
                    let _ = sink.send(Message::Close(None)).await;
                    break "closed locally".to_string();
                }
                Some(WsCommand::Send { req, tx }) => {
                    let Some(id) = req.numeric_id() else {
                        let _ = tx.send(Err(RpcError::InvalidResponse("request id must be numeric".into())));
                        continue;
                    };
                    let text = match serde_json::to_string(&req) {
                        Ok(text) => text,
                        Err(e) => {
                            let _ = tx.send(Err(e.into()));
                            continue;
                        }
                    };
                    pending.insert(id, tx);
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        break format!("send failed: {e}");
                    }
                }
            },
            msg = stream.next() => match msg {
                None => break "stream ended".to_string(),
                Some(Err(e)) => break format!("receive failed: {e}"),
                Some(Ok(Message::Text(text))) => dispatch(text.as_str(), &mut pending),
                Some(Ok(Message::Binary(bytes))) => {
                    if let Ok(text) = std::str::from_utf8(&bytes) {
                        dispatch(text, &mut pending);
                    }
                }
                Some(Ok(Message::Close(_))) => break "closed by peer".to_string(),
                Some(Ok(_)) => {}
            },
        }
    };

    tracing::debug!(url = %url, reason = %reason, pending = pending.len(), "WebSocket task exiting");
    for (_, tx) in pending.drain() {
        let _ = tx.send(Err(RpcError::WebSocket(reason.clone())));
    }
}

fn dispatch(text: &str, pending: &mut HashMap<u64, Reply>) {
    let resp = match serde_json::from_str::<JsonRpcResponse>(text) {
        Ok(resp) => resp,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring non-response WebSocket message");
            return;
        }
    };
    let id = match &resp.id {
        RpcId::Number(n) => *n,
        _ => return,
    };
    if let Some(tx) = pending.remove(&id) {
        let _ = tx.send(Ok(resp));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_matches_by_id() {
        let mut pending = HashMap::new();
        let (tx1, mut rx1) = oneshot::channel();
        let (tx2, mut rx2) = oneshot::channel();
        pending.insert(1, tx1);
        pending.insert(2, tx2);

        dispatch(r#"{"jsonrpc":"2.0","id":2,"result":"0x10"}"#, &mut pending);
        assert!(rx1.try_recv().is_err());
        let resp = rx2.try_recv().unwrap().unwrap();
        assert_eq!(resp.into_result().unwrap(), serde_json::json!("0x10"));
        assert_eq!(pending.len(), 1);

        dispatch("not json", &mut pending);
        dispatch(r#"{"jsonrpc":"2.0","method":"eth_subscription","params":{}}"#, &mut pending);
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails() {
        let err = WsTransport::connect("ws://127.0.0.1:1").await.err().unwrap();
        assert!(matches!(err, RpcError::WebSocket(_)));
    }
}
