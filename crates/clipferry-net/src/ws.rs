//! Long-lived WebSocket connection with framed text messages
//!
//! [`connect`] performs the upgrade and hands back a [`WsConnection`]
//! for sending plus an event channel carrying `Open`, inbound messages,
//! and the close/error terminal events. One owned task drives the
//! socket; cancelling the connection token (what [`WsConnection::close`]
//! does) wakes the task out of its blocking read so teardown is bounded.
//! Dropping the connection closes it too, so replacing a connection
//! object always tears down the previous reader.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::Result;

/// Events observed on a WebSocket connection
#[derive(Debug, Clone, PartialEq)]
pub enum WsEvent {
    /// Handshake finished, the connection is usable
    Open,
    /// Inbound text message
    Message(String),
    /// Peer closed the connection or the stream ended
    Closed,
    /// Transport error; the connection is dead
    Error(String),
}

/// Handle to a live WebSocket connection
pub struct WsConnection {
    out_tx: mpsc::Sender<String>,
    cancel: CancellationToken,
}

impl WsConnection {
    /// Queue a text message for sending
    ///
    /// Fails once the connection task has terminated.
    pub async fn send(&self, text: String) -> Result<()> {
        self.out_tx
            .send(text)
            .await
            .map_err(|_| crate::NetworkError::ConnectionFailed("connection closed".to_string()))
    }

    /// Close the connection; safe to call any number of times
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Connect to `url` (`ws://` or `wss://`) and spawn the socket task
pub async fn connect(url: &str) -> Result<(WsConnection, mpsc::Receiver<WsEvent>)> {
    let (mut stream, _response) = tokio_tungstenite::connect_async(url).await?;

    let (out_tx, mut out_rx) = mpsc::channel::<String>(64);
    let (event_tx, event_rx) = mpsc::channel::<WsEvent>(256);
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();

    tokio::spawn(async move {
        let _ = event_tx.send(WsEvent::Open).await;
        let mut out_open = true;

        loop {
            tokio::select! {
                _ = task_cancel.cancelled() => {
                    let _ = stream.close(None).await;
                    let _ = event_tx.send(WsEvent::Closed).await;
                    break;
                }
                outbound = out_rx.recv(), if out_open => {
                    match outbound {
                        Some(text) => {
                            if let Err(e) = stream.send(Message::Text(text.into())).await {
                                let _ = event_tx.send(WsEvent::Error(e.to_string())).await;
                                break;
                            }
                        }
                        // All senders dropped; keep reading until close
                        None => out_open = false,
                    }
                }
                inbound = stream.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => {
                            let _ = event_tx.send(WsEvent::Message(text.to_string())).await;
                        }
                        Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_))) => {
                            // Protocol heartbeats ride as text; everything else is noise
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            debug!("websocket closed by peer");
                            let _ = event_tx.send(WsEvent::Closed).await;
                            break;
                        }
                        Some(Err(e)) => {
                            let _ = event_tx.send(WsEvent::Error(e.to_string())).await;
                            break;
                        }
                    }
                }
            }
        }
    });

    Ok((WsConnection { out_tx, cancel }, event_rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ws::{Message as AxumMsg, WebSocket, WebSocketUpgrade};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;

    async fn echo_socket(mut socket: WebSocket) {
        while let Some(Ok(msg)) = socket.recv().await {
            if let AxumMsg::Text(text) = msg {
                if socket.send(AxumMsg::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    }

    async fn spawn_echo_server() -> String {
        let app = Router::new().route(
            "/ws",
            get(|upgrade: WebSocketUpgrade| async move {
                upgrade.on_upgrade(echo_socket).into_response()
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("ws://{}/ws", addr)
    }

    #[tokio::test]
    async fn test_open_send_receive() {
        let url = spawn_echo_server().await;
        let (conn, mut events) = connect(&url).await.unwrap();

        assert_eq!(events.recv().await, Some(WsEvent::Open));

        conn.send("hello".to_string()).await.unwrap();
        assert_eq!(events.recv().await, Some(WsEvent::Message("hello".to_string())));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_unblocks_reader() {
        let url = spawn_echo_server().await;
        let (conn, mut events) = connect(&url).await.unwrap();
        assert_eq!(events.recv().await, Some(WsEvent::Open));

        conn.close();
        conn.close();

        // The reader task must terminate and report Closed
        let event = tokio::time::timeout(std::time::Duration::from_secs(5), events.recv())
            .await
            .expect("reader did not terminate");
        assert_eq!(event, Some(WsEvent::Closed));

        // Sending after close eventually fails once the task is gone
        let _ = conn.send("late".to_string()).await;
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let result = connect("ws://127.0.0.1:1/ws").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_drop_tears_down_reader() {
        let url = spawn_echo_server().await;
        let (conn, mut events) = connect(&url).await.unwrap();
        assert_eq!(events.recv().await, Some(WsEvent::Open));

        drop(conn);

        let event = tokio::time::timeout(std::time::Duration::from_secs(5), events.recv())
            .await
            .expect("reader did not terminate");
        assert_eq!(event, Some(WsEvent::Closed));
    }
}
