mod common;

use common::TestServer;
use hearth_server::messaging::ids::{STATUS_FAILURE, STATUS_SUCCESS};

#[tokio::test]
async fn unknown_account_and_wrong_password_are_reported() {
    let server = TestServer::new();
    server.register("hank", "right").await;

    let mut client = server.connect().await;
    let mut reply = client.login("nobody", "x").await;
    assert_eq!(reply.read_byte().unwrap(), STATUS_FAILURE);
    assert_eq!(reply.read_string().unwrap(), "Account does not exist.");
    client.finished().await;

    let mut client = server.connect().await;
    let mut reply = client.login("hank", "wrong").await;
    assert_eq!(reply.read_byte().unwrap(), STATUS_FAILURE);
    assert_eq!(reply.read_string().unwrap(), "Wrong password.");
    client.finished().await;

    assert_eq!(server.context.sessions().account_count(), 0);
}

#[tokio::test]
async fn login_is_case_insensitive_and_indexes_the_session() {
    let server = TestServer::new();
    server.register("Ivy", "pw").await;

    let mut client = server.connect().await;
    let mut reply = client.login("IVY", "pw").await;
    assert_eq!(reply.read_byte().unwrap(), STATUS_SUCCESS);

    let account = server.context.accounts().find_account_by_name("ivy").await.unwrap().unwrap();
    let session = server
        .context
        .sessions()
        .get_by_account_id(account.id)
        .expect("logged in session is indexed by account");
    assert_eq!(session.account().map(|a| a.id), Some(account.id));
}

#[tokio::test]
async fn concurrent_logins_have_exactly_one_winner() {
    let server = TestServer::new();
    server.register("jade", "pw").await;

    let a = server.connect().await;
    let b = server.connect().await;

    let attempt = |mut client: common::TestClient| async move {
        let mut reply = client.login("jade", "pw").await;
        let status = reply.read_byte().unwrap();
        let text = if status == STATUS_FAILURE {
            Some(reply.read_string().unwrap())
        } else {
            None
        };
        (status, text, client)
    };
    let ((status_a, text_a, a), (status_b, text_b, b)) = tokio::join!(attempt(a), attempt(b));

    let mut statuses = [status_a, status_b];
    statuses.sort();
    assert_eq!(statuses, [STATUS_FAILURE, STATUS_SUCCESS]);

    let failure = text_a.or(text_b).unwrap();
    assert_eq!(failure, "Account already in use by another session.");

    let account = server.context.accounts().find_account_by_name("jade").await.unwrap().unwrap();
    let holder = server.context.sessions().get_by_account_id(account.id).unwrap();
    assert_eq!(holder.account().map(|acc| acc.id), Some(account.id));
    assert_eq!(server.context.sessions().account_count(), 1);

    // The loser's session ends; the winner stays.
    let (loser, winner) = if status_a == STATUS_FAILURE { (a, b) } else { (b, a) };
    loser.finished().await;
    assert_eq!(server.context.sessions().len(), 1);
    drop(winner);
}

#[tokio::test]
async fn account_is_free_again_after_logout() {
    let server = TestServer::new();
    server.register("kim", "pw").await;

    let mut first = server.connect().await;
    let mut reply = first.login("kim", "pw").await;
    assert_eq!(reply.read_byte().unwrap(), STATUS_SUCCESS);
    first.ws.close(None).await.unwrap();
    first.finished().await;

    let mut second = server.connect().await;
    let mut reply = second.login("kim", "pw").await;
    assert_eq!(reply.read_byte().unwrap(), STATUS_SUCCESS);
}
