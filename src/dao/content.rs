//! Challenge content loaded from per-theme JSON files.

use std::{
    collections::{BTreeMap, HashSet},
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::state::tournament::{Challenge, Theme};

/// Failure while reading challenge files.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Offending file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a JSON list of challenges.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Offending file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// File backing each theme pool inside the content directory.
fn file_name(theme: Theme) -> &'static str {
    match theme {
        Theme::Lyrics => "lyrics.json",
        Theme::Scene => "scenes.json",
        Theme::Emoji => "emojis.json",
        Theme::Trivia => "trivia.json",
    }
}

#[derive(Debug, Deserialize)]
struct RawChallenge {
    id: String,
    #[serde(default)]
    theme: Option<Theme>,
    prompt: String,
    answer: String,
    #[serde(default)]
    metadata: Option<BTreeMap<String, String>>,
}

/// Read-only pools of challenges, one per theme.
#[derive(Debug, Clone, Default)]
pub struct ContentLibrary {
    pools: IndexMap<Theme, Vec<Challenge>>,
}

impl ContentLibrary {
    /// Load every theme pool from `dir`. Missing files yield empty pools.
    pub fn load(dir: &Path) -> Result<Self, ContentError> {
        let mut library = Self::default();
        let mut seen = HashSet::new();

        for theme in Theme::ALL {
            let path = dir.join(file_name(theme));
            let contents = match fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    info!(path = %path.display(), %theme, "no challenge file; theme pool is empty");
                    continue;
                }
                Err(source) => return Err(ContentError::Io { path, source }),
            };

            let raw: Vec<RawChallenge> = serde_json::from_str(&contents)
                .map_err(|source| ContentError::Parse { path: path.clone(), source })?;

            let mut pool = Vec::with_capacity(raw.len());
            for item in raw {
                if item.theme.is_some_and(|declared| declared != theme) {
                    warn!(
                        id = %item.id,
                        %theme,
                        "challenge declares another theme; filed under its pool"
                    );
                }
                if !seen.insert(item.id.clone()) {
                    warn!(id = %item.id, %theme, "duplicate challenge id skipped");
                    continue;
                }
                pool.push(Challenge {
                    id: item.id,
                    theme,
                    prompt: item.prompt,
                    answer: item.answer,
                    metadata: item.metadata,
                });
            }

            info!(path = %path.display(), %theme, count = pool.len(), "loaded challenges");
            library.pools.insert(theme, pool);
        }

        Ok(library)
    }

    /// Build a library from in-memory challenges, grouping them by theme.
    pub fn from_challenges(challenges: impl IntoIterator<Item = Challenge>) -> Self {
        let mut pools: IndexMap<Theme, Vec<Challenge>> = IndexMap::new();
        for challenge in challenges {
            pools.entry(challenge.theme).or_default().push(challenge);
        }
        Self { pools }
    }

    /// Challenges of `theme`; empty when the theme has no content.
    pub fn pool(&self, theme: Theme) -> &[Challenge] {
        self.pools.get(&theme).map(Vec::as_slice).unwrap_or_default()
    }

    /// Themes with at least one challenge.
    pub fn themes(&self) -> impl Iterator<Item = Theme> + '_ {
        Theme::ALL
            .into_iter()
            .filter(|theme| !self.pool(*theme).is_empty())
    }

    /// Total number of challenges across every pool.
    pub fn len(&self) -> usize {
        self.pools.values().map(Vec::len).sum()
    }

    /// Whether no content was loaded at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("clash-content-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn loads_pools_and_tolerates_missing_files() {
        let dir = scratch_dir();
        fs::write(
            dir.join("trivia.json"),
            r#"[{"id":"tr1","theme":"trivia","prompt":"2+2?","answer":"4"},
                {"id":"tr2","prompt":"Capital of France?","answer":"Paris","metadata":{"hint":"Eiffel"}}]"#,
        )
        .unwrap();

        let library = ContentLibrary::load(&dir).unwrap();
        assert_eq!(library.pool(Theme::Trivia).len(), 2);
        assert!(library.pool(Theme::Lyrics).is_empty());
        assert_eq!(library.themes().collect::<Vec<_>>(), vec![Theme::Trivia]);
        assert_eq!(
            library.pool(Theme::Trivia)[1]
                .metadata
                .as_ref()
                .and_then(|m| m.get("hint"))
                .map(String::as_str),
            Some("Eiffel")
        );

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn duplicate_ids_across_pools_are_skipped() {
        let dir = scratch_dir();
        fs::write(
            dir.join("emojis.json"),
            r#"[{"id":"x","prompt":"🦁👑","answer":"The Lion King"}]"#,
        )
        .unwrap();
        fs::write(
            dir.join("scenes.json"),
            r#"[{"id":"x","prompt":"I'll be back","answer":"Terminator"}]"#,
        )
        .unwrap();

        let library = ContentLibrary::load(&dir).unwrap();
        assert_eq!(library.len(), 1);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = scratch_dir();
        fs::write(dir.join("lyrics.json"), "{not json").unwrap();
        assert!(matches!(
            ContentLibrary::load(&dir),
            Err(ContentError::Parse { .. })
        ));
        fs::remove_dir_all(dir).unwrap();
    }
}
