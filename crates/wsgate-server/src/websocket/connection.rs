//! Live socket handle for a registered session.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt};
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::debug;

use crate::errors::SocketError;

/// Write half of a client socket.
pub type WsSink = Pin<Box<dyn Sink<Message, Error = axum::Error> + Send>>;

/// A client socket owned by the connection registry.
///
/// Writers serialize on the sink lock; the read half stays with the
/// session task. [`close`](Self::close) takes effect once no matter how
/// many paths race to call it.
pub struct ClientConnection {
    /// Session id this socket is registered under.
    pub id: String,
    sink: tokio::sync::Mutex<WsSink>,
    closed: AtomicBool,
    cancel: CancellationToken,
    connected_at: Instant,
    last_seen: Mutex<Instant>,
}

impl ClientConnection {
    /// Wrap the write half of a socket.
    pub fn new(id: String, sink: WsSink) -> Self {
        let now = Instant::now();
        Self {
            id,
            sink: tokio::sync::Mutex::new(sink),
            closed: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            connected_at: now,
            last_seen: Mutex::new(now),
        }
    }

    /// Write a text frame.
    pub async fn send_text(&self, text: &str) -> Result<(), SocketError> {
        self.send(Message::Text(text.into())).await
    }

    /// Write a Ping frame.
    pub async fn ping(&self) -> Result<(), SocketError> {
        self.send(Message::Ping(Vec::new().into())).await
    }

    async fn send(&self, message: Message) -> Result<(), SocketError> {
        if self.is_closed() {
            return Err(SocketError::Closed);
        }
        let mut sink = self.sink.lock().await;
        sink.send(message)
            .await
            .map_err(|e| SocketError::Write(e.to_string()))
    }

    /// Close the socket. Only the first call sends the close frame; later
    /// calls return `Ok(())` without touching the socket.
    pub async fn close(&self) -> Result<(), SocketError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.cancel.cancel();
        let mut sink = self.sink.lock().await;
        let result = sink
            .close()
            .await
            .map_err(|e| SocketError::Close(e.to_string()));
        debug!(session_id = %self.id, ok = result.is_ok(), "socket closed");
        result
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Resolves once the socket has been closed locally.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Record inbound activity (any frame, including Pong).
    pub fn mark_alive(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Time since the last inbound frame (or since connect).
    pub fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}


#[cfg(test)]
mod tests {
    use futures::{FutureExt, StreamExt};

    use super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn send_text_writes_frame() {
        let (conn, mut rx) = channel_connection("s1");
        conn.send_text("hello").await.unwrap();
        assert_eq!(drain_texts(&mut rx), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn ping_writes_ping_frame() {
        let (conn, mut rx) = channel_connection("s1");
        conn.ping().await.unwrap();
        let frame = rx.next().now_or_never().flatten().unwrap();
        assert!(matches!(frame, Message::Ping(_)));
    }

    #[tokio::test]
    async fn write_to_dropped_peer_fails() {
        let (conn, rx) = channel_connection("s1");
        drop(rx);
        let err = conn.send_text("hello").await.unwrap_err();
        assert!(matches!(err, SocketError::Write(_)));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let conn = broken_connection("s1");
        assert!(matches!(conn.close().await, Err(SocketError::Close(_))));
        // The second close does not touch the socket again.
        assert_eq!(conn.close().await, Ok(()));
        assert!(conn.is_closed());
    }

    #[tokio::test]
    async fn send_after_close_is_rejected() {
        let (conn, mut rx) = channel_connection("s1");
        conn.close().await.unwrap();
        assert_eq!(conn.send_text("late").await, Err(SocketError::Closed));
        assert!(drain_texts(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn closed_future_resolves_on_close() {
        let (conn, _rx) = channel_connection("s1");
        let waiter = {
            let conn = conn.clone();
            tokio::spawn(async move { conn.closed().await })
        };
        conn.close().await.unwrap();
        waiter.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn mark_alive_resets_idle_time() {
        let (conn, _rx) = channel_connection("s1");
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(conn.idle_for(), Duration::from_secs(5));
        conn.mark_alive();
        assert_eq!(conn.idle_for(), Duration::ZERO);
        assert_eq!(conn.age(), Duration::from_secs(5));
    }
}
