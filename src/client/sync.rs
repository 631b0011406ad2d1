//! Background task keeping a [`SnapshotMirror`] in step with the server.

use std::time::Duration;

use futures::StreamExt;
use tokio::time::sleep;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::client::{commands::CommandClient, mirror::SnapshotMirror};

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Connect to the realtime channel and feed every frame to `mirror`, reconnecting with
/// exponential backoff. Runs until the task is dropped or aborted.
pub async fn run_sync(client: CommandClient, mirror: SnapshotMirror) {
    let url = client.ws_url();
    let mut delay = INITIAL_BACKOFF;

    loop {
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                info!(%url, "connected to realtime channel");
                mirror.set_connected(true);
                delay = INITIAL_BACKOFF;

                if let Some(snapshot) = client.fetch_snapshot().await {
                    mirror.replace_snapshot(snapshot);
                }
                pump_frames(stream, &mirror).await;

                mirror.set_connected(false);
                warn!(%url, "realtime channel closed; reconnecting");
            }
            Err(err) => {
                warn!(%url, error = %err, retry_ms = delay.as_millis() as u64, "failed to connect");
            }
        }

        sleep(delay).await;
        delay = (delay * 2).min(MAX_BACKOFF);
    }
}

async fn pump_frames(
    mut stream: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    mirror: &SnapshotMirror,
) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let effect = mirror.apply_frame(text.as_str());
                debug!(?effect, "frame applied");
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "realtime channel error");
                break;
            }
        }
    }
}
