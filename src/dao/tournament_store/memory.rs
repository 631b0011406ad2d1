use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use futures::future::BoxFuture;
use tokio::sync::Mutex;

use crate::dao::{
    models::TournamentDocument,
    storage::{StorageError, StorageResult},
    tournament_store::TournamentStore,
};

/// Volatile store used for ephemeral sessions and tests.
///
/// Clones share the same slot, so a test can keep a handle to inspect saves or to
/// simulate an outage with [`set_failing`](Self::set_failing).
#[derive(Clone, Default)]
pub struct MemoryTournamentStore {
    document: Arc<Mutex<Option<TournamentDocument>>>,
    failing: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

impl MemoryTournamentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already saved document.
    pub fn with_document(document: TournamentDocument) -> Self {
        Self {
            document: Arc::new(Mutex::new(Some(document))),
            ..Self::default()
        }
    }

    /// Make every subsequent operation fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Last saved document.
    pub async fn document(&self) -> Option<TournamentDocument> {
        self.document.lock().await.clone()
    }

    fn check(&self) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable(
                "memory store switched off".into(),
                io::Error::other("simulated outage"),
            ));
        }
        Ok(())
    }
}

impl TournamentStore for MemoryTournamentStore {
    fn save(&self, document: TournamentDocument) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.check()?;
            *store.document.lock().await = Some(document);
            store.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn load(&self) -> BoxFuture<'static, StorageResult<Option<TournamentDocument>>> {
        let store = self.clone();
        Box::pin(async move {
            store.check()?;
            Ok(store.document.lock().await.clone())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.check() })
    }
}
