//! Viewer sessions over a real socket.

use std::{sync::Arc, time::Duration};

use clash_back::{
    config::AppConfig,
    dao::{content::ContentLibrary, tournament_store::MemoryTournamentStore},
    dto::ws::ServerMessage,
    routes,
    services::tournament_service,
    state::{
        SharedState,
        tournament::{Challenge, Theme},
    },
};
use futures::{SinkExt, StreamExt};
use tokio::{net::TcpListener, time::timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Viewer = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn serve() -> (SharedState, String) {
    let content = ContentLibrary::from_challenges((0..20).map(|i| Challenge {
        id: format!("c{i}"),
        theme: Theme::ALL[i % Theme::ALL.len()],
        prompt: format!("prompt {i}"),
        answer: format!("answer {i}"),
        metadata: None,
    }));
    let state = tournament_service::bootstrap(
        Arc::new(AppConfig::default()),
        Arc::new(content),
        Arc::new(MemoryTournamentStore::new()),
    )
    .await
    .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = routes::router(Arc::clone(&state));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (state, format!("ws://{addr}/ws"))
}

async fn connect(url: &str) -> Viewer {
    let (viewer, _) = connect_async(url).await.unwrap();
    viewer
}

/// Next frame of any kind, failing the test instead of hanging.
async fn next_frame(viewer: &mut Viewer) -> Message {
    timeout(Duration::from_secs(5), viewer.next())
        .await
        .expect("viewer received nothing")
        .unwrap()
        .unwrap()
}

async fn next_message(viewer: &mut Viewer) -> ServerMessage {
    loop {
        if let Message::Text(text) = next_frame(viewer).await {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

#[tokio::test]
async fn viewer_gets_the_snapshot_on_connect() {
    let (state, url) = serve().await;
    let mut viewer = connect(&url).await;

    let ServerMessage::StateUpdate { data } = next_message(&mut viewer).await else {
        panic!("first frame must be the snapshot");
    };
    assert_eq!(data.bracket.len(), 8);
    assert_eq!(state.viewers().len(), 1);
}

#[tokio::test]
async fn state_request_resends_the_snapshot_and_unknown_frames_are_ignored() {
    let (_state, url) = serve().await;
    let mut viewer = connect(&url).await;
    next_message(&mut viewer).await;

    viewer
        .send(Message::text(r#"{"type":"hello"}"#))
        .await
        .unwrap();
    viewer.send(Message::text("not json")).await.unwrap();
    viewer
        .send(Message::text(r#"{"type":"state:request"}"#))
        .await
        .unwrap();

    let message = next_message(&mut viewer).await;
    assert_eq!(message.kind(), "state:update");
}

#[tokio::test]
async fn commands_reach_the_viewer_as_snapshot_then_detail() {
    let (state, url) = serve().await;
    let mut viewer = connect(&url).await;
    next_message(&mut viewer).await;

    tournament_service::start_match(&state, "g1").await.unwrap();

    let ServerMessage::StateUpdate { data } = next_message(&mut viewer).await else {
        panic!("a command must broadcast the snapshot first");
    };
    assert_eq!(data.current_match_id.as_deref(), Some("g1"));
    let detail = next_message(&mut viewer).await;
    assert!(matches!(detail, ServerMessage::MatchStart { ref match_id, .. } if match_id == "g1"));
}

#[tokio::test]
async fn pings_are_answered() {
    let (_state, url) = serve().await;
    let mut viewer = connect(&url).await;
    next_message(&mut viewer).await;

    viewer
        .send(Message::Ping(b"still there?".to_vec().into()))
        .await
        .unwrap();
    loop {
        if let Message::Pong(payload) = next_frame(&mut viewer).await {
            assert_eq!(&payload[..], b"still there?");
            break;
        }
    }
}

#[tokio::test]
async fn closing_viewers_ends_their_session() {
    let (state, url) = serve().await;
    let mut viewer = connect(&url).await;
    next_message(&mut viewer).await;

    assert_eq!(state.close_viewers(), 1);
    loop {
        match timeout(Duration::from_secs(5), viewer.next())
            .await
            .expect("session never closed")
        {
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
            Some(Ok(_)) => {}
        }
    }

    timeout(Duration::from_secs(5), async {
        while !state.viewers().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("viewer still registered");
}
