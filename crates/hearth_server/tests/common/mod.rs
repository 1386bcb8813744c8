//! Test harness driving real session loops over in-memory sockets.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use hearth_server::connection::{websocket_config, ClientConnection, Transport};
use chrono::Utc;
use hearth_server::messaging::ids::{incoming, outgoing, STATUS_SUCCESS};
use hearth_server::store::{Account, Character};
use hearth_server::{
    default_dispatch_table, CodecError, MessageBuffer, RoomTemplate, ServerContext, Session, SessionManager,
    SessionRegistry, DEFAULT_ROOM_ID,
};
use std::future::Future;
use std::sync::Arc;
use tokio::io::DuplexStream;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use uuid::Uuid;

pub const WAIT: Duration = Duration::from_secs(5);

/// Lowest bcrypt cost, keeps tests fast.
pub const TEST_HASH_COST: u32 = 4;

pub struct TestServer {
    pub context: Arc<ServerContext>,
    pub manager: SessionManager,
}

impl TestServer {
    pub fn new() -> Self {
        let lobby = RoomTemplate {
            id: DEFAULT_ROOM_ID,
            title: "Lobby".into(),
        };
        let context = Arc::new(ServerContext::in_memory(TEST_HASH_COST, [lobby]));
        let dispatch = Arc::new(default_dispatch_table().expect("built-in handlers have unique ids"));
        let manager = SessionManager::new(context.clone(), dispatch);
        Self { context, manager }
    }

    /// Opens a client whose server side runs a full session loop.
    pub async fn connect(&self) -> TestClient {
        let (server, client) = tokio::io::duplex(64 * 1024);
        let server: Box<dyn Transport> = Box::new(server);
        let server = WebSocketStream::from_raw_socket(server, Role::Server, Some(websocket_config())).await;
        let connection = ClientConnection::new(server, None, self.context.pool().clone());

        let manager = self.manager.clone();
        let session_loop = tokio::spawn(async move { manager.handle_client(connection).await });

        let ws = WebSocketStream::from_raw_socket(client, Role::Client, None).await;
        TestClient { ws, session_loop }
    }

    /// A session put straight into the lobby as `name`, skipping the handlers
    /// and their name rules. No session loop runs for it.
    pub async fn resident(&self, name: &str) -> (Arc<Session>, WebSocketStream<DuplexStream>) {
        let (server, client) = tokio::io::duplex(64 * 1024);
        let server: Box<dyn Transport> = Box::new(server);
        let server = WebSocketStream::from_raw_socket(server, Role::Server, Some(websocket_config())).await;
        let session = Arc::new(Session::new(ClientConnection::new(server, None, self.context.pool().clone())));

        let account = Arc::new(Account {
            id: Uuid::new_v4(),
            name: name.to_string(),
            password_hash: String::new(),
            created_at: Utc::now(),
        });
        let character = Arc::new(Character {
            id: Uuid::new_v4(),
            name: name.to_string(),
            account_id: account.id,
            created_at: Utc::now(),
        });
        let registry = SessionRegistry::new();
        assert!(registry.claim_account(&session, account));
        assert!(registry.claim_character(&session, character));
        self.context
            .rooms()
            .join(DEFAULT_ROOM_ID, &session)
            .await
            .expect("resident fits into the lobby");

        let ws = WebSocketStream::from_raw_socket(client, Role::Client, None).await;
        (session, ws)
    }

    /// Registers an account on a throwaway connection.
    pub async fn register(&self, name: &str, password: &str) {
        let mut client = self.connect().await;
        let mut reply = client.register(name, password).await;
        assert_eq!(reply.read_byte().unwrap(), STATUS_SUCCESS, "registration of {name} failed");
        client.expect_closed().await;
    }

    /// Registers, logs in, creates and selects a character named like the
    /// account. The snapshot sent on entering the lobby is returned.
    pub async fn enter_world(&self, name: &str) -> (TestClient, MessageBuffer) {
        self.register(name, "secret").await;
        let mut client = self.connect().await;

        let mut reply = client.login(name, "secret").await;
        assert_eq!(reply.read_byte().unwrap(), STATUS_SUCCESS);

        client.send(incoming::CHARACTER_CREATION, |m| m.write_string(name)).await;
        let mut reply = client.recv_id(outgoing::CHARACTER_CREATION).await;
        assert_eq!(reply.read_byte().unwrap(), STATUS_SUCCESS);

        client.send(incoming::CHARACTER_SELECTION, |m| m.write_string(name)).await;
        let mut reply = client.recv_id(outgoing::CHARACTER_SELECTION).await;
        assert_eq!(reply.read_byte().unwrap(), STATUS_SUCCESS);

        let snapshot = client.recv_id(outgoing::SELF_ENTER_ROOM).await;
        (client, snapshot)
    }
}

pub struct TestClient {
    pub ws: WebSocketStream<DuplexStream>,
    pub session_loop: JoinHandle<()>,
}

impl TestClient {
    pub async fn send(&mut self, id: u16, populate: impl FnOnce(&mut MessageBuffer) -> Result<(), CodecError>) {
        let mut message = MessageBuffer::new();
        message.write_u16(id).unwrap();
        populate(&mut message).unwrap();
        self.ws.send(Message::binary(message.written().to_vec())).await.unwrap();
    }

    pub async fn send_raw(&mut self, bytes: Vec<u8>) {
        self.ws.send(Message::binary(bytes)).await.unwrap();
    }

    /// Next binary message, id not yet consumed.
    pub async fn recv(&mut self) -> MessageBuffer {
        loop {
            let frame = timeout(WAIT, self.ws.next())
                .await
                .expect("timed out waiting for a message")
                .expect("connection ended")
                .expect("transport error");
            match frame {
                Message::Binary(data) => {
                    let mut message = MessageBuffer::new();
                    message.fill_from(&data).unwrap();
                    return message;
                }
                Message::Ping(_) | Message::Pong(_) => continue,
                other => panic!("expected a binary message, got {other:?}"),
            }
        }
    }

    /// Next message, asserting its id; the id is consumed.
    pub async fn recv_id(&mut self, id: u16) -> MessageBuffer {
        let mut message = self.recv().await;
        assert_eq!(message.read_u16().unwrap(), id);
        message
    }

    /// Waits for the server to close the connection and returns its close code.
    pub async fn expect_closed(&mut self) -> Option<CloseCode> {
        loop {
            match timeout(WAIT, self.ws.next()).await.expect("timed out waiting for close") {
                Some(Ok(Message::Close(frame))) => return frame.map(|f| f.code),
                Some(Ok(Message::Binary(_))) | Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(other)) => panic!("unexpected frame {other:?}"),
                Some(Err(_)) | None => return None,
            }
        }
    }

    /// Waits for the server side session loop to finish.
    pub async fn finished(self) {
        timeout(WAIT, self.session_loop)
            .await
            .expect("session loop did not finish")
            .expect("session loop panicked");
    }

    pub async fn register(&mut self, name: &str, password: &str) -> MessageBuffer {
        self.send(incoming::ACCOUNT_REGISTRATION, |m| {
            m.write_string(name)?;
            m.write_string(password)
        })
        .await;
        self.recv_id(outgoing::ACCOUNT_REGISTRATION).await
    }

    pub async fn login(&mut self, name: &str, password: &str) -> MessageBuffer {
        self.send(incoming::ACCOUNT_LOGIN, |m| {
            m.write_string(name)?;
            m.write_string(password)
        })
        .await;
        self.recv_id(outgoing::ACCOUNT_LOGIN).await
    }
}

/// Polls `condition` until it holds or the wait budget runs out.
pub async fn eventually<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    timeout(WAIT, async {
        while !condition().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
