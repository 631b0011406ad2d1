//! Application-level configuration: seed roster, default settings, bracket wiring and
//! filesystem locations.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::validation::validate_settings,
    state::{
        bracket::BracketTopology,
        tournament::{Settings, Team},
    },
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CLASH_CONFIG_PATH";
const DEFAULT_STATE_PATH: &str = "state/tournament.json";
const STATE_PATH_ENV: &str = "CLASH_STATE_PATH";
const DEFAULT_CONTENT_DIR: &str = "content";
const CONTENT_DIR_ENV: &str = "CLASH_CONTENT_DIR";
const FRONTEND_DIR_ENV: &str = "CLASH_FRONTEND_DIR";
const DEFAULT_PERSIST_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    settings: Settings,
    teams: Vec<Team>,
    topology: BracketTopology,
    state_path: PathBuf,
    content_dir: PathBuf,
    frontend_dir: Option<PathBuf>,
    persist_timeout: Option<Duration>,
}

impl AppConfig {
    /// Load the configuration file and environment overrides, falling back to built-in
    /// defaults for anything missing or invalid.
    pub fn load() -> Self {
        let path = env_path(CONFIG_PATH_ENV).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut config = Self::from_path(&path);

        if let Some(state_path) = env_path(STATE_PATH_ENV) {
            config.state_path = state_path;
        }
        if let Some(content_dir) = env_path(CONTENT_DIR_ENV) {
            config.content_dir = content_dir;
        }
        config.frontend_dir = env_path(FRONTEND_DIR_ENV);
        config
    }

    /// Read the JSON configuration at `path` without looking at the environment.
    pub fn from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        teams = app_config.teams.len(),
                        matches = app_config.topology.nodes.len(),
                        "loaded tournament config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Settings applied to a freshly seeded tournament.
    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Seed roster used when no teams are supplied.
    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    /// Bracket wiring used for fresh tournaments.
    pub fn topology(&self) -> &BracketTopology {
        &self.topology
    }

    /// Where the tournament document is saved.
    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Directory holding the per-theme challenge files.
    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// Built frontend to serve for non-API paths.
    pub fn frontend_dir(&self) -> Option<&Path> {
        self.frontend_dir.as_deref()
    }

    /// Maximum duration of a save before the service turns degraded.
    pub fn persist_timeout(&self) -> Option<Duration> {
        self.persist_timeout
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            teams: default_teams(),
            topology: BracketTopology::default(),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            content_dir: PathBuf::from(DEFAULT_CONTENT_DIR),
            frontend_dir: None,
            persist_timeout: Some(Duration::from_millis(DEFAULT_PERSIST_TIMEOUT_MS)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    settings: Option<Settings>,
    #[serde(default)]
    teams: Option<Vec<RawTeam>>,
    #[serde(default)]
    bracket: Option<BracketTopology>,
    #[serde(default)]
    state_path: Option<PathBuf>,
    #[serde(default)]
    content_dir: Option<PathBuf>,
    /// `0` disables the timeout.
    #[serde(default)]
    persist_timeout_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();

        let topology = match value.bracket {
            Some(topology) => match topology.validate() {
                Ok(()) => topology,
                Err(err) => {
                    warn!(error = %err, "invalid bracket in config; using the 8-team bracket");
                    defaults.topology
                }
            },
            None => defaults.topology,
        };

        let teams = match value.teams {
            Some(teams) if teams.len() >= topology.seed_capacity() => {
                teams.into_iter().map(Into::into).collect()
            }
            Some(teams) => {
                warn!(
                    supplied = teams.len(),
                    required = topology.seed_capacity(),
                    "not enough teams in config; using the default roster"
                );
                defaults.teams
            }
            None => defaults.teams,
        };

        let settings = match value.settings {
            Some(settings) => match validate_settings(&settings) {
                Ok(()) => settings,
                Err(err) => {
                    warn!(error = %err, "invalid settings in config; using the defaults");
                    defaults.settings
                }
            },
            None => defaults.settings,
        };

        let persist_timeout = match value.persist_timeout_ms {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => defaults.persist_timeout,
        };

        Self {
            settings,
            teams,
            topology,
            state_path: value.state_path.unwrap_or(defaults.state_path),
            content_dir: value.content_dir.unwrap_or(defaults.content_dir),
            frontend_dir: None,
            persist_timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of a roster entry inside the configuration file.
struct RawTeam {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    players: Vec<String>,
}

impl From<RawTeam> for Team {
    fn from(value: RawTeam) -> Self {
        let id = value.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        Team::new(id, value.name, value.players)
    }
}

/// Resolve a path from the environment, ignoring empty values.
fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
}

/// Built-in roster shipped with the binary.
fn default_teams() -> Vec<Team> {
    [
        ("Manaal & Ahmed", ["Manaal", "Ahmed"]),
        ("Samia & Rafay", ["Samia", "Rafay"]),
        ("Shahir & Laibah", ["Shahir", "Laibah"]),
        ("Rafay & Anum", ["Rafay", "Anum"]),
        ("Sadia & Daniyaal", ["Sadia", "Daniyaal"]),
        ("Maaz & Misbah", ["Maaz", "Misbah"]),
        ("Javeria & Osama", ["Javeria", "Osama"]),
        ("Dua & Amal", ["Dua", "Amal"]),
    ]
    .into_iter()
    .map(|(name, players)| {
        Team::new(
            Uuid::new_v4().to_string(),
            name,
            players.into_iter().map(String::from).collect(),
        )
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(contents: &str) -> PathBuf {
        let path = env::temp_dir().join(format!("clash-config-{}.json", Uuid::new_v4()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = AppConfig::from_path(Path::new("/definitely/not/here.json"));
        assert_eq!(config.teams().len(), 8);
        assert_eq!(config.settings(), Settings::default());
        assert_eq!(config.topology(), &BracketTopology::eight_teams());
        assert_eq!(config.persist_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn file_overrides_settings_and_teams() {
        let teams: Vec<String> = (1..=8)
            .map(|i| format!(r#"{{"id":"t{i}","name":"Team {i}"}}"#))
            .collect();
        let path = write_config(&format!(
            r#"{{"settings":{{"bestOf":3,"clinchEarly":false}},"teams":[{}],"persistTimeoutMs":0}}"#,
            teams.join(",")
        ));

        let config = AppConfig::from_path(&path);
        assert_eq!(config.settings().best_of, 3);
        assert!(!config.settings().clinch_early);
        assert_eq!(config.teams()[0].id, "t1");
        assert_eq!(config.persist_timeout(), None);

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn short_roster_falls_back_to_default_teams() {
        let path = write_config(r#"{"teams":[{"name":"Lonely"}]}"#);
        let config = AppConfig::from_path(&path);
        assert_eq!(config.teams().len(), 8);
        assert_eq!(config.teams()[0].name, "Manaal & Ahmed");
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn custom_four_team_bracket() {
        let path = write_config(
            r#"{
                "bracket": {
                    "nodes": [
                        {"id": "semi1"},
                        {"id": "semi2"},
                        {"id": "final", "sourceA": "semi1", "sourceB": "semi2"}
                    ],
                    "finalMatchId": "final"
                },
                "teams": [{"name":"A"},{"name":"B"},{"name":"C"},{"name":"D"}]
            }"#,
        );
        let config = AppConfig::from_path(&path);
        assert_eq!(config.topology().seed_capacity(), 4);
        assert_eq!(config.teams().len(), 4);
        assert_eq!(config.topology().third_place_match_id, None);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn unplayable_settings_fall_back_to_defaults() {
        let path = write_config(r#"{"settings":{"bestOf":0}}"#);
        assert_eq!(AppConfig::from_path(&path).settings(), Settings::default());
        fs::remove_file(path).unwrap();

        let path = write_config(r#"{"settings":{"scoring":{"perCorrect":0,"winBonus":2}}}"#);
        assert_eq!(AppConfig::from_path(&path).settings(), Settings::default());
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn invalid_bracket_falls_back_to_default() {
        let path = write_config(
            r#"{"bracket":{"nodes":[{"id":"x","sourceA":"y","sourceB":"z"}],"finalMatchId":"x"}}"#,
        );
        let config = AppConfig::from_path(&path);
        assert_eq!(config.topology(), &BracketTopology::eight_teams());
        fs::remove_file(path).unwrap();
    }
}
