use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::BoxFuture;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::dao::{
    models::TournamentDocument,
    storage::{StorageError, StorageResult},
    tournament_store::TournamentStore,
};

/// Keeps the tournament as a pretty-printed JSON file on local disk.
///
/// Saves go through a sibling temporary file and a rename so a crash mid-write
/// never leaves a truncated document behind.
#[derive(Clone)]
pub struct FileTournamentStore {
    path: Arc<PathBuf>,
}

impl FileTournamentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file unique to one save, so overlapping saves never share a temp file.
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "tournament.json".into());
        name.push(format!(".{}.tmp", Uuid::new_v4()));
        self.path.with_file_name(name)
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

impl TournamentStore for FileTournamentStore {
    fn save(&self, document: TournamentDocument) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let path = store.path.display().to_string();
            let body = serde_json::to_vec_pretty(&document)
                .map_err(|err| StorageError::unavailable(format!("encoding {path}"), err))?;

            fs::create_dir_all(store.parent_dir()).await.map_err(|err| {
                StorageError::unavailable(format!("creating parent of {path}"), err)
            })?;

            let temp = store.temp_path();
            let written = match fs::write(&temp, body).await {
                Ok(()) => fs::rename(&temp, store.path.as_path())
                    .await
                    .map_err(|err| StorageError::unavailable(format!("replacing {path}"), err)),
                Err(err) => Err(StorageError::unavailable(
                    format!("writing {}", temp.display()),
                    err,
                )),
            };
            if written.is_err() {
                if let Err(err) = fs::remove_file(&temp).await {
                    debug!(temp = %temp.display(), error = %err, "no temp file to clean up");
                }
            }
            written
        })
    }

    fn load(&self) -> BoxFuture<'static, StorageResult<Option<TournamentDocument>>> {
        let store = self.clone();
        Box::pin(async move {
            let path = store.path.display().to_string();
            let contents = match fs::read_to_string(store.path.as_path()).await {
                Ok(contents) => contents,
                Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
                Err(err) => return Err(StorageError::unavailable(format!("reading {path}"), err)),
            };
            serde_json::from_str(&contents)
                .map(Some)
                .map_err(|err| StorageError::corrupt(format!("decoding {path}"), err))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let dir = store.parent_dir();
            match fs::metadata(&dir).await {
                Ok(meta) if meta.permissions().readonly() => Err(StorageError::unavailable(
                    format!("{} is read-only", dir.display()),
                    std::io::Error::from(ErrorKind::PermissionDenied),
                )),
                Ok(_) => Ok(()),
                // The directory is created on first save.
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(err) => Err(StorageError::unavailable(
                    format!("inspecting {}", dir.display()),
                    err,
                )),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::TournamentEntity;
    use crate::state::{
        bracket::BracketTopology,
        tournament::{Settings, Team},
    };

    fn document() -> TournamentDocument {
        let teams = (1..=8)
            .map(|i| Team::new(format!("t{i}"), format!("Team {i}"), vec![]))
            .collect();
        let state = BracketTopology::eight_teams()
            .seed(teams, Settings::default())
            .unwrap();
        TournamentDocument::new(TournamentEntity::from(&state), "2026-01-01T00:00:00Z".into())
    }

    fn scratch_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("clash-store-{}", Uuid::new_v4()))
            .join("tournament.json")
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let store = FileTournamentStore::new(scratch_path());
        assert!(store.load().await.unwrap().is_none());
        store.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn save_then_load_returns_the_document() {
        let path = scratch_path();
        let store = FileTournamentStore::new(&path);
        let doc = document();
        store.save(doc.clone()).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(doc));
        assert_eq!(entries(&path), ["tournament.json"]);

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    fn entries(path: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_saves_all_land() {
        let path = scratch_path();
        let store = FileTournamentStore::new(&path);
        let doc = document();

        let saves: Vec<_> = (0..16)
            .map(|_| tokio::spawn(store.save(doc.clone())))
            .collect();
        for save in saves {
            save.await.unwrap().unwrap();
        }

        assert_eq!(store.load().await.unwrap(), Some(doc));
        assert_eq!(entries(&path), ["tournament.json"]);

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[tokio::test]
    async fn failed_rename_leaves_no_temp_file() {
        let path = scratch_path();
        // A directory in place of the document makes the rename fail.
        std::fs::create_dir_all(path.join("blocker")).unwrap();

        let store = FileTournamentStore::new(&path);
        assert!(store.save(document()).await.is_err());
        assert_eq!(entries(&path), ["tournament.json"]);

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[tokio::test]
    async fn garbage_is_reported_as_corrupt() {
        let path = scratch_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{\"schemaVersion\": 1").unwrap();

        let store = FileTournamentStore::new(&path);
        assert!(matches!(
            store.load().await,
            Err(StorageError::Corrupt { .. })
        ));

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }
}
