//! Client connection representation and management.
//!
//! A [`ClientConnection`] owns exactly one WebSocket and exposes
//! read-one-message, send-one-message and close-once semantics on top of it.
//! It also tracks when the client last sent something, which the idle reaper
//! uses to find dead clients.

use crate::error::{CodecError, ConnectionError};
use crate::messaging::{MessageBuffer, MessagePool, PooledMessage, MESSAGE_CAPACITY};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio::time::{Duration, Instant};
use tokio_tungstenite::tungstenite::error::CapacityError;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, WebSocketConfig};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, trace};

/// Any byte stream a WebSocket can run over.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

/// An already upgraded WebSocket over a type-erased transport.
pub type ClientStream = WebSocketStream<Box<dyn Transport>>;

/// Upper bound for flushing a close frame to a peer that stopped reading.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default upper bound for one outbound message to reach the transport.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// WebSocket settings for client sockets.
///
/// Frames and reassembled messages are capped at [`MESSAGE_CAPACITY`], so an
/// oversized frame is rejected from its header instead of being buffered.
pub fn websocket_config() -> WebSocketConfig {
    WebSocketConfig::default()
        .max_message_size(Some(MESSAGE_CAPACITY))
        .max_frame_size(Some(MESSAGE_CAPACITY))
}

const STATE_OPEN: u8 = 0;
const STATE_CLOSING: u8 = 1;
const STATE_CLOSED: u8 = 2;

/// Close state of a [`ClientConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closing,
    Closed,
}

/// Connection to a single game client.
///
/// Reads are performed by the session loop only; sends may come from any
/// task (room broadcasts, replies). Closing is idempotent and safe to race
/// against an in-flight read: the reader is woken and reports a closed
/// transport instead of waiting on the peer.
pub struct ClientConnection {
    remote_addr: Option<SocketAddr>,
    sink: tokio::sync::Mutex<SplitSink<ClientStream, Message>>,
    stream: tokio::sync::Mutex<SplitStream<ClientStream>>,
    state: AtomicU8,
    /// Set once the peer sent a close frame; its code wins over ours
    peer_closed: AtomicBool,
    closed: watch::Sender<bool>,
    connected_at: Instant,
    /// Nanoseconds between `connected_at` and the last received message
    last_received: AtomicU64,
    send_timeout: Duration,
    pool: MessagePool,
}

impl ClientConnection {
    /// Wraps an upgraded WebSocket.
    ///
    /// The activity clock starts at construction, so a client that never
    /// sends anything still times out.
    pub fn new(socket: ClientStream, remote_addr: Option<SocketAddr>, pool: MessagePool) -> Self {
        let (sink, stream) = socket.split();
        let (closed, _) = watch::channel(false);
        Self {
            remote_addr,
            sink: tokio::sync::Mutex::new(sink),
            stream: tokio::sync::Mutex::new(stream),
            state: AtomicU8::new(STATE_OPEN),
            peer_closed: AtomicBool::new(false),
            closed,
            connected_at: Instant::now(),
            last_received: AtomicU64::new(0),
            send_timeout: SEND_TIMEOUT,
            pool,
        }
    }

    /// Overrides how long a send may wait on the transport before the peer
    /// is given up on.
    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    /// The remote network address of the client, if known.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn state(&self) -> ConnectionState {
        match self.state.load(Ordering::Acquire) {
            STATE_OPEN => ConnectionState::Open,
            STATE_CLOSING => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// When the last message was received (connection time if none yet).
    pub fn last_message_received_at(&self) -> Instant {
        self.connected_at + Duration::from_nanos(self.last_received.load(Ordering::Acquire))
    }

    /// How long the client has been silent as of `now`.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_message_received_at())
    }

    /// Reads the next message into `message`.
    ///
    /// Returns `Ok(false)` when the connection is (or becomes) closed, whether
    /// by the peer or by a local [`close`](Self::close). Ping and pong frames
    /// are skipped.
    pub async fn read_message(&self, message: &mut MessageBuffer) -> Result<bool, ConnectionError> {
        if !self.is_open() {
            return Ok(false);
        }

        let closed = self.closed.subscribe();
        let mut stream = self.stream.lock().await;
        tokio::pin! {
            let closed = wait_closed(closed);
        }

        loop {
            let frame = tokio::select! {
                biased;
                _ = &mut closed => return Ok(false),
                frame = stream.next() => frame,
            };

            let payload = match frame {
                None => return Ok(false),
                Some(Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed)) => {
                    return Ok(false)
                }
                Some(Err(tungstenite::Error::Capacity(CapacityError::MessageTooLong { size, .. }))) => {
                    return Err(ConnectionError::Oversized(size))
                }
                Some(Err(e)) => return Err(ConnectionError::Transport(e)),
                Some(Ok(Message::Binary(data))) => data,
                Some(Ok(Message::Text(text))) => text.as_bytes().to_vec().into(),
                Some(Ok(Message::Close(frame))) => {
                    trace!("Peer sent close frame: {:?}", frame);
                    self.peer_closed.store(true, Ordering::Release);
                    return Ok(false);
                }
                Some(Ok(_)) => continue,
            };

            if payload.len() > MESSAGE_CAPACITY {
                return Err(ConnectionError::Oversized(payload.len()));
            }
            message
                .fill_from(&payload)
                .map_err(|_| ConnectionError::Oversized(payload.len()))?;
            self.touch();
            return Ok(true);
        }
    }

    /// Sends the written region of `message` as one binary frame.
    ///
    /// Best effort: nothing is sent unless the connection is open, and a
    /// transport failure closes this connection instead of surfacing to the
    /// caller.
    ///
    /// A send returns as soon as the connection closes. One that cannot reach
    /// the transport within the send timeout (the peer stopped reading) drops
    /// the connection without a close handshake.
    pub async fn send(&self, message: &MessageBuffer) {
        if !self.is_open() {
            return;
        }

        let frame = Message::binary(message.written().to_vec());
        let delivery = tokio::time::timeout(self.send_timeout, async {
            let mut sink = self.sink.lock().await;
            sink.send(frame).await
        });

        let result = tokio::select! {
            _ = wait_closed(self.closed.subscribe()) => return,
            result = delivery => result,
        };

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!("Send to {:?} failed, closing connection: {}", self.remote_addr, e);
                self.close(CloseCode::Error, "send failed").await;
            }
            Err(_) => {
                debug!(
                    "Send to {:?} stalled for {:?}, dropping connection",
                    self.remote_addr, self.send_timeout
                );
                self.abandon();
            }
        }
    }

    /// Builds a message with `id` from the pool for sending to one or more
    /// connections.
    pub fn build(
        &self,
        id: u16,
        populate: impl FnOnce(&mut MessageBuffer) -> Result<(), CodecError>,
    ) -> Result<PooledMessage, CodecError> {
        let mut message = self.pool.acquire();
        message.write_u16(id)?;
        populate(&mut message)?;
        Ok(message)
    }

    /// Builds a message with `id` and sends it to this connection.
    ///
    /// The pooled buffer is released on every path, including a failing
    /// `populate`.
    pub async fn build_and_send(
        &self,
        id: u16,
        populate: impl FnOnce(&mut MessageBuffer) -> Result<(), CodecError>,
    ) -> Result<(), CodecError> {
        let message = self.build(id, populate)?;
        self.send(&message).await;
        Ok(())
    }

    /// Closes the connection. Only the first call has any effect.
    ///
    /// If the peer already sent a close frame, its code and reason are echoed
    /// back instead of the supplied ones.
    pub async fn close(&self, code: CloseCode, reason: &str) {
        if self
            .state
            .compare_exchange(STATE_OPEN, STATE_CLOSING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let peer_closed = self.peer_closed.load(Ordering::Acquire);

        let flushed = tokio::time::timeout(CLOSE_TIMEOUT, async {
            let mut sink = self.sink.lock().await;
            if peer_closed {
                // The websocket layer already queued an echo of the peer's frame.
                sink.close().await
            } else {
                let frame = CloseFrame {
                    code,
                    reason: reason.into(),
                };
                sink.send(Message::Close(Some(frame))).await
            }
        })
        .await;

        match flushed {
            Ok(Ok(())) => trace!("Close frame sent to {:?}", self.remote_addr),
            Ok(Err(e)) => trace!("Close frame to {:?} not delivered: {}", self.remote_addr, e),
            Err(_) => debug!("Timed out sending close frame to {:?}", self.remote_addr),
        }

        self.state.store(STATE_CLOSED, Ordering::Release);
        self.closed.send_replace(true);
    }

    /// Marks an open connection closed without queueing a close frame behind
    /// a write that never completed.
    fn abandon(&self) {
        if self
            .state
            .compare_exchange(STATE_OPEN, STATE_CLOSED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.closed.send_replace(true);
        }
    }

    /// Resolves once the connection is fully closed.
    pub async fn closed(&self) {
        wait_closed(self.closed.subscribe()).await;
    }

    fn touch(&self) {
        let elapsed = Instant::now().saturating_duration_since(self.connected_at);
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.last_received.store(nanos, Ordering::Release);
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("remote_addr", &self.remote_addr)
            .field("state", &self.state())
            .finish()
    }
}

async fn wait_closed(mut closed: watch::Receiver<bool>) {
    loop {
        if *closed.borrow_and_update() {
            return;
        }
        if closed.changed().await.is_err() {
            return;
        }
    }
}
