//! Shared fixtures for unit tests.

use crate::connection::{websocket_config, ClientConnection, Transport};
use crate::messaging::{MessageBuffer, MessagePool};
use crate::session::Session;
use crate::store::{Account, Character};
use chrono::Utc;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::io::DuplexStream;
use tokio::time::Duration;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use uuid::Uuid;

pub type TestClient = WebSocketStream<DuplexStream>;

async fn pipe(pool: MessagePool, capacity: usize) -> (ClientConnection, TestClient) {
    let (server, client) = tokio::io::duplex(capacity);
    let server: Box<dyn Transport> = Box::new(server);
    let server = WebSocketStream::from_raw_socket(server, Role::Server, Some(websocket_config())).await;
    let client = WebSocketStream::from_raw_socket(client, Role::Client, None).await;
    (ClientConnection::new(server, None, pool), client)
}

/// A server side connection wired to an in-memory client socket.
pub async fn connection(pool: MessagePool) -> (ClientConnection, TestClient) {
    pipe(pool, 64 * 1024).await
}

pub async fn session() -> (Arc<Session>, TestClient) {
    let (conn, client) = connection(MessagePool::new()).await;
    (Arc::new(Session::new(conn)), client)
}

/// A session over a 1 KiB pipe that gives up on sends after 100ms.
///
/// Leave the client unread to simulate a peer that stopped reading.
pub async fn cramped_session() -> (Arc<Session>, TestClient) {
    let (conn, client) = pipe(MessagePool::new(), 1024).await;
    let conn = conn.with_send_timeout(Duration::from_millis(100));
    (Arc::new(Session::new(conn)), client)
}

pub fn account(name: &str) -> Arc<Account> {
    Arc::new(Account {
        id: Uuid::new_v4(),
        name: name.to_string(),
        password_hash: String::new(),
        created_at: Utc::now(),
    })
}

pub fn character(name: &str, account_id: Uuid) -> Arc<Character> {
    Arc::new(Character {
        id: Uuid::new_v4(),
        name: name.to_string(),
        account_id,
        created_at: Utc::now(),
    })
}

/// Receives the next binary frame as a readable message.
pub async fn recv(client: &mut TestClient) -> MessageBuffer {
    let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("stream ended")
        .expect("transport error");
    match frame {
        Message::Binary(data) => {
            let mut message = MessageBuffer::new();
            message.fill_from(&data).expect("frame fits a message");
            message
        }
        other => panic!("expected a binary frame, got {other:?}"),
    }
}

/// Asserts that nothing arrives within a short grace period.
pub async fn assert_silent(client: &mut TestClient) {
    let next = tokio::time::timeout(Duration::from_millis(50), client.next()).await;
    assert!(next.is_err(), "unexpected frame: {next:?}");
}
