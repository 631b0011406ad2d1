pub mod bracket;
pub mod engine;
mod hub;
pub mod state_machine;
pub mod tournament;

use std::{sync::Arc, time::Duration};

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard, mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{
        models::{TournamentDocument, TournamentEntity},
        tournament_store::TournamentStore,
    },
    dto::{format_system_time, ws::ServerFrame, ws::ServerMessage},
    error::ServiceError,
    services::broadcast,
    state::engine::{BracketEngine, BracketError},
};

pub use self::hub::BroadcastHub;

pub type SharedState = Arc<AppState>;
const HUB_CAPACITY: usize = 64;

#[derive(Clone)]
/// Handle used to push messages to a connected viewer.
pub struct ViewerConnection {
    pub id: Uuid,
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Central application state: the engine, its store, and the realtime fan-out.
pub struct AppState {
    engine: RwLock<BracketEngine>,
    store: Arc<dyn TournamentStore>,
    hub: BroadcastHub,
    viewers: DashMap<Uuid, ViewerConnection>,
    degraded: watch::Sender<bool>,
    command_gate: Mutex<()>,
    persist_timeout: Option<Duration>,
    config: Arc<AppConfig>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        engine: BracketEngine,
        store: Arc<dyn TournamentStore>,
        config: Arc<AppConfig>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(false);
        Arc::new(Self {
            engine: RwLock::new(engine),
            store,
            hub: BroadcastHub::new(HUB_CAPACITY),
            viewers: DashMap::new(),
            degraded: degraded_tx,
            command_gate: Mutex::new(()),
            persist_timeout: config.persist_timeout(),
            config,
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Persistence backend.
    pub fn store(&self) -> Arc<dyn TournamentStore> {
        Arc::clone(&self.store)
    }

    /// Broadcast hub feeding every viewer socket.
    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// Registry of connected viewers keyed by connection id.
    pub fn viewers(&self) -> &DashMap<Uuid, ViewerConnection> {
        &self.viewers
    }

    /// Read access to the committed engine.
    pub async fn engine(&self) -> RwLockReadGuard<'_, BracketEngine> {
        self.engine.read().await
    }

    /// Subscribe to the hub and capture the committed snapshot as one step, so no
    /// broadcast falls between the two.
    pub async fn subscribe_with_snapshot(
        &self,
    ) -> (tokio::sync::broadcast::Receiver<ServerFrame>, ServerMessage) {
        let _gate = self.command_gate.lock().await;
        let receiver = self.hub.subscribe();
        let snapshot = broadcast::snapshot_message(self.engine.read().await.state());
        (receiver, snapshot)
    }

    /// Ask every connected viewer to close its socket, returning how many were asked.
    pub fn close_viewers(&self) -> usize {
        let mut closed = 0;
        for viewer in self.viewers.iter() {
            if viewer.tx.send(Message::Close(None)).is_ok() {
                debug!(id = %viewer.id, "closing viewer");
                closed += 1;
            }
        }
        closed
    }

    /// Whether the last save failed.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update the degraded flag, returning whether it changed.
    fn update_degraded(&self, value: bool) -> bool {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        })
    }

    /// Run a command against a draft copy of the engine, persist the draft, commit it
    /// and broadcast the resulting snapshot.
    ///
    /// Commands are serialised through a single gate, so viewers receive snapshots in
    /// commit order. A failed command leaves the committed state untouched. A failed or
    /// timed-out save does not undo the command; it switches the service to degraded
    /// mode instead.
    pub async fn run_command<F, T>(&self, command: &'static str, work: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut BracketEngine) -> Result<T, BracketError>,
    {
        self.run_announced_command(command, |engine| Ok((work(engine)?, Vec::new())))
            .await
    }

    /// Like [`AppState::run_command`], but `work` also returns informational messages.
    ///
    /// They are broadcast right after the snapshot and before the gate is released, so
    /// no other command's snapshot can land between the two.
    pub async fn run_announced_command<F, T>(
        &self,
        command: &'static str,
        work: F,
    ) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut BracketEngine) -> Result<(T, Vec<ServerMessage>), BracketError>,
    {
        let gate = self.command_gate.lock().await;
        let mut draft = self.engine.read().await.clone();

        let (value, messages) = work(&mut draft).map_err(|err| {
            debug!(command, error = %err, "command rejected");
            ServiceError::from(err)
        })?;

        self.persist(command, &draft).await;
        broadcast::broadcast_snapshot(self, draft.state());
        for message in &messages {
            broadcast::broadcast_message(self, message);
        }
        *self.engine.write().await = draft;
        drop(gate);
        Ok(value)
    }

    /// Save the engine state, tracking the outcome in the degraded flag.
    pub async fn persist(&self, command: &'static str, engine: &BracketEngine) {
        let document = TournamentDocument::new(
            TournamentEntity::from(engine.state()),
            format_system_time(std::time::SystemTime::now()),
        );
        let save = self.store.save(document);

        let outcome = match self.persist_timeout {
            Some(limit) => match timeout(limit, save).await {
                Ok(result) => result.map_err(ServiceError::from),
                Err(_) => Err(ServiceError::Timeout),
            },
            None => save.await.map_err(ServiceError::from),
        };

        match outcome {
            Ok(()) => {
                if self.update_degraded(false) {
                    info!(command, "tournament saved again; leaving degraded mode");
                    broadcast::broadcast_system_status(self, false);
                }
            }
            Err(err) => {
                warn!(command, error = %err, "failed to save tournament; keeping state in memory");
                if self.update_degraded(true) {
                    broadcast::broadcast_system_status(self, true);
                }
            }
        }
    }
}
