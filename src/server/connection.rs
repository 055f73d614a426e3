//! WebSocket connection handling
//!
//! One `Connection` per accepted socket. After the upgrade the socket is
//! split: a writer task drains this connection's outbound queue into the
//! sink, and the reader loop decodes frames and hands them to the router.
//! However the reader loop ends, the session is torn down through the
//! router exactly once.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::error::{Error, Result};
use crate::protocol::codec;
use crate::registry::PeerSender;
use crate::router::{Dispatch, MessageRouter};
use crate::server::config::ServerConfig;
use crate::server::handler::SignalingHandler;
use crate::session::Session;

type WsStream = WebSocketStream<TcpStream>;

/// How long the writer gets to flush queued frames after the reader stops
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// A single client connection
pub struct Connection<H: SignalingHandler> {
    conn_id: u64,
    peer_addr: SocketAddr,
    config: ServerConfig,
    handler: Arc<H>,
    router: Arc<MessageRouter>,
}

impl<H: SignalingHandler> Connection<H> {
    /// Create a connection handler
    pub fn new(
        conn_id: u64,
        peer_addr: SocketAddr,
        config: ServerConfig,
        handler: Arc<H>,
        router: Arc<MessageRouter>,
    ) -> Self {
        Self {
            conn_id,
            peer_addr,
            config,
            handler,
            router,
        }
    }

    /// Upgrade the socket and serve it until it closes
    pub async fn run(self, socket: TcpStream) -> Result<()> {
        let ws = self.accept(socket).await?;
        tracing::debug!(conn_id = self.conn_id, peer = %self.peer_addr, "WebSocket established");

        let (sink, mut stream) = ws.split();
        let (sender, outbound) =
            PeerSender::channel(self.conn_id, self.config.outbound_queue_capacity);
        let mut session = Session::new(sender, self.peer_addr);

        let mut writer = tokio::spawn(write_loop(
            self.conn_id,
            sink,
            outbound,
            self.config.ping_interval,
        ));

        let result = self.read_loop(&mut stream, &mut session).await;

        let ctx = session.context();
        if let Some(id) = self.router.disconnect(&mut session).await {
            self.handler.on_leave(&ctx, &id).await;
        }

        tracing::debug!(
            conn_id = self.conn_id,
            client_id = ?session.client_id(),
            duration_ms = session.duration().as_millis() as u64,
            "Session ended"
        );

        // Dropping the session drops the last sender we own; the writer
        // flushes what is queued and closes the socket.
        drop(session);
        if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
            .await
            .is_err()
        {
            writer.abort();
        }

        result
    }

    async fn accept(&self, socket: TcpStream) -> Result<WsStream> {
        let path = self.config.ws_path.clone();
        let check_path = move |request: &Request, response: Response| {
            if request.uri().path() == path {
                Ok(response)
            } else {
                let mut rejection = ErrorResponse::new(Some("Not Found".to_string()));
                *rejection.status_mut() = StatusCode::NOT_FOUND;
                Err(rejection)
            }
        };

        let mut ws_config = WebSocketConfig::default();
        ws_config.max_message_size = Some(self.config.max_message_size);

        let handshake =
            tokio_tungstenite::accept_hdr_async_with_config(socket, check_path, Some(ws_config));

        match tokio::time::timeout(self.config.handshake_timeout, handshake).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(Error::HandshakeTimeout),
        }
    }

    async fn read_loop(
        &self,
        stream: &mut SplitStream<WsStream>,
        session: &mut Session,
    ) -> Result<()> {
        // Dropped on return, so the writer still sees every sender go away
        let sender = session.sender().clone();

        loop {
            let message = tokio::select! {
                _ = sender.evicted() => return Err(Error::Evicted),
                next = self.next_message(stream) => match next? {
                    Some(message) => message,
                    None => return Ok(()),
                },
            };

            match message {
                Message::Text(text) => self.handle_frame(session, text.as_bytes()).await,
                Message::Binary(data) => self.handle_frame(session, &data).await,
                Message::Close(frame) => {
                    tracing::debug!(conn_id = self.conn_id, reason = ?frame, "Client closed");
                    return Ok(());
                }
                // tungstenite answers pings itself; any frame resets the idle timer
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn next_message(&self, stream: &mut SplitStream<WsStream>) -> Result<Option<Message>> {
        let next = if self.config.idle_timeout.is_zero() {
            stream.next().await
        } else {
            match tokio::time::timeout(self.config.idle_timeout, stream.next()).await {
                Ok(next) => next,
                Err(_) => return Err(Error::IdleTimeout),
            }
        };

        Ok(next.transpose()?)
    }

    async fn handle_frame(&self, session: &mut Session, payload: &[u8]) {
        let message = match codec::decode(payload) {
            Ok(message) => message,
            Err(e) => {
                self.router.stats().record_decode_error();
                tracing::debug!(conn_id = self.conn_id, error = %e, "Discarding malformed frame");
                return;
            }
        };

        tracing::trace!(
            conn_id = self.conn_id,
            kind = %message.kind,
            from = %message.from,
            to = %message.to,
            "Received"
        );

        match self.router.dispatch(session, message).await {
            Dispatch::Joined(id) => self.handler.on_join(&session.context(), &id).await,
            Dispatch::Dropped(reason) => {
                self.handler
                    .on_undelivered(&session.context(), &reason)
                    .await
            }
            _ => {}
        }
    }
}

/// Drain the outbound queue into the socket, pinging on an interval.
/// Ends when every sender is gone or the socket fails.
async fn write_loop(
    conn_id: u64,
    mut sink: SplitSink<WsStream, Message>,
    mut outbound: mpsc::Receiver<Bytes>,
    ping_interval: Duration,
) {
    let mut ping = (!ping_interval.is_zero()).then(|| {
        let mut ticker = tokio::time::interval_at(Instant::now() + ping_interval, ping_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    loop {
        let message = tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => frame_to_message(frame),
                None => break,
            },
            _ = next_ping(&mut ping) => Message::Ping(Vec::new()),
        };

        if let Err(e) = sink.send(message).await {
            tracing::debug!(conn_id = conn_id, error = %e, "Write failed");
            return;
        }
    }

    let _ = sink.close().await;
}

async fn next_ping(ping: &mut Option<Interval>) {
    match ping {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn frame_to_message(frame: Bytes) -> Message {
    // Frames come from serde_json, so they are always UTF-8
    match String::from_utf8(frame.to_vec()) {
        Ok(text) => Message::Text(text),
        Err(e) => Message::Binary(e.into_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_to_message_text() {
        let message = frame_to_message(Bytes::from_static(br#"{"type":"offer"}"#));
        assert_eq!(message, Message::Text(r#"{"type":"offer"}"#.to_string()));
    }

    #[test]
    fn test_frame_to_message_binary_fallback() {
        let message = frame_to_message(Bytes::from_static(&[0xff, 0xfe]));
        assert_eq!(message, Message::Binary(vec![0xff, 0xfe]));
    }

    #[tokio::test]
    async fn test_next_ping_disabled_never_fires() {
        let mut ping = None;
        let fired = tokio::time::timeout(Duration::from_millis(20), next_ping(&mut ping)).await;
        assert!(fired.is_err());
    }
}
