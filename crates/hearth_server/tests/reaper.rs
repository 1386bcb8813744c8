mod common;

use common::{eventually, TestServer};
use hearth_server::messaging::ids::{incoming, outgoing};
use hearth_server::IdleReaper;
use tokio::time::{sleep, Duration, Instant};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

#[tokio::test]
async fn silent_connection_is_reaped_and_deregistered() {
    let server = TestServer::new();
    let sessions = server.context.sessions().clone();
    let reaper = IdleReaper::new(sessions.clone(), Duration::from_millis(100), Duration::from_secs(30));

    let mut silent = server.connect().await;
    eventually(|| {
        let sessions = sessions.clone();
        async move { sessions.len() == 1 }
    })
    .await;

    assert_eq!(reaper.sweep(Instant::now()).await, 0);
    sleep(Duration::from_millis(150)).await;
    assert_eq!(reaper.sweep(Instant::now()).await, 1);

    assert_eq!(silent.expect_closed().await, Some(CloseCode::Away));
    silent.finished().await;
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn pinging_clients_survive_sweeps() {
    let server = TestServer::new();
    let sessions = server.context.sessions().clone();
    let reaper = IdleReaper::new(sessions.clone(), Duration::from_millis(100), Duration::from_secs(30));

    let mut client = server.connect().await;
    for _ in 0..4 {
        sleep(Duration::from_millis(40)).await;
        client.send(incoming::PING, |_| Ok(())).await;
        client.recv_id(outgoing::PONG).await;
        assert_eq!(reaper.sweep(Instant::now()).await, 0);
    }
    assert_eq!(sessions.len(), 1);
}

#[tokio::test]
async fn spawned_reaper_closes_idle_sessions_on_its_own() {
    let server = TestServer::new();
    let sessions = server.context.sessions().clone();
    let shutdown = hearth_server::ShutdownState::new();
    let handle = IdleReaper::new(sessions.clone(), Duration::from_millis(50), Duration::from_millis(25))
        .spawn(shutdown.clone());

    let mut client = server.connect().await;
    client.expect_closed().await;
    client.finished().await;
    assert!(sessions.is_empty());

    shutdown.initiate_shutdown();
    handle.await.unwrap();
}
