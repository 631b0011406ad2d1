use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ServerFrame, ServerMessage, ViewerMessage},
    services::broadcast::snapshot_message,
    state::{SharedState, ViewerConnection},
};

/// The writer channel is gone; the connection should be torn down.
#[derive(Debug, Error)]
#[error("connection closed")]
struct ConnectionClosed;

/// Handle the full lifecycle of a viewer WebSocket connection.
///
/// The viewer receives the current snapshot right away, then every broadcast frame in
/// commit order. A viewer that falls behind the hub gets a fresh snapshot instead of the
/// frames it missed.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let viewer_id = Uuid::new_v4();
    let (frames, snapshot) = state.subscribe_with_snapshot().await;
    if send_message(&outbound_tx, &snapshot).is_err() {
        finalize(writer_task, outbound_tx).await;
        return;
    }

    state.viewers().insert(
        viewer_id,
        ViewerConnection {
            id: viewer_id,
            tx: outbound_tx.clone(),
        },
    );
    info!(id = %viewer_id, viewers = state.viewers().len(), "viewer connected");

    let forwarder = tokio::spawn(forward_frames(
        state.clone(),
        viewer_id,
        frames,
        outbound_tx.clone(),
    ));

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ViewerMessage>(&text) {
                Ok(ViewerMessage::StateRequest) => {
                    debug!(id = %viewer_id, "viewer requested a snapshot");
                    let snapshot = snapshot_message(state.engine().await.state());
                    if send_message(&outbound_tx, &snapshot).is_err() {
                        break;
                    }
                }
                Ok(ViewerMessage::Unknown) => {
                    debug!(id = %viewer_id, payload = %text.as_str(), "ignoring viewer message");
                }
                Err(err) => {
                    debug!(id = %viewer_id, error = %err, "ignoring malformed viewer message");
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(id = %viewer_id, "viewer closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(id = %viewer_id, error = %err, "websocket error");
                break;
            }
        }
    }

    state.viewers().remove(&viewer_id);
    forwarder.abort();
    info!(id = %viewer_id, viewers = state.viewers().len(), "viewer disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Pump hub frames into the viewer's writer channel until either side goes away.
async fn forward_frames(
    state: SharedState,
    viewer_id: Uuid,
    mut frames: tokio::sync::broadcast::Receiver<ServerFrame>,
    tx: mpsc::UnboundedSender<Message>,
) {
    loop {
        tokio::select! {
            _ = tx.closed() => break,
            frame = frames.recv() => match frame {
                Ok(frame) => {
                    if tx.send(Message::Text(String::from(&*frame.text).into())).is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(id = %viewer_id, skipped, "viewer lagged behind; resending snapshot");
                    let snapshot = snapshot_message(state.engine().await.state());
                    if send_message(&tx, &snapshot).is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}

/// Serialise a message and queue it on the writer channel.
///
/// Serialisation failures are logged and swallowed; only a closed writer is reported.
fn send_message(
    tx: &mpsc::UnboundedSender<Message>,
    message: &ServerMessage,
) -> Result<(), ConnectionClosed> {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(kind = message.kind(), error = %err, "failed to serialise message");
            return Ok(());
        }
    };
    tx.send(Message::Text(payload.into())).map_err(|_| ConnectionClosed)
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{content::ContentLibrary, tournament_store::MemoryTournamentStore},
        services::tournament_service,
    };

    async fn shared() -> SharedState {
        tournament_service::bootstrap(
            Arc::new(AppConfig::default()),
            Arc::new(ContentLibrary::from_challenges([])),
            Arc::new(MemoryTournamentStore::new()),
        )
        .await
        .unwrap()
    }

    fn kind(message: Message) -> String {
        let Message::Text(text) = message else {
            panic!("expected a text frame");
        };
        let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
        value["type"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn frames_are_forwarded_in_order() {
        let state = shared().await;
        let frames = state.hub().subscribe();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let forwarder = tokio::spawn(forward_frames(state.clone(), Uuid::new_v4(), frames, tx));

        tournament_service::play_sfx(&state, "first");
        tournament_service::play_sfx(&state, "second");
        for expected in ["first", "second"] {
            let Some(Message::Text(text)) = rx.recv().await else {
                panic!("expected a text frame");
            };
            assert!(text.as_str().contains(expected));
        }

        drop(rx);
        forwarder.await.unwrap();
    }

    #[tokio::test]
    async fn lagged_viewer_gets_a_fresh_snapshot() {
        let state = shared().await;
        let frames = state.hub().subscribe();
        for _ in 0..80 {
            tournament_service::play_sfx(&state, "tick");
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let forwarder = tokio::spawn(forward_frames(state.clone(), Uuid::new_v4(), frames, tx));

        assert_eq!(kind(rx.recv().await.unwrap()), "state:update");
        assert_eq!(kind(rx.recv().await.unwrap()), "sfx");

        drop(rx);
        forwarder.await.unwrap();
    }
}
