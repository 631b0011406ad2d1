//! HTTP client for the host commands.
//!
//! Every command is fire-and-forget: failures are logged and swallowed, and the effect
//! shows up through the next `state:update` frame.

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    dto::{
        commands::{
            AdvanceRequest, MatchCommand, OverrideScoreRequest, ResetTournamentRequest,
            SfxRequest, SubmitChallengeRequest, SubmitRoundRequest, TeamInput, ThemeRequest,
        },
        snapshot::TournamentSnapshot,
    },
    state::tournament::{RoundResult, Side, Theme},
};

/// Default server location when `CLASH_SERVER_URL` is unset.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Thin wrapper over the command endpoints.
#[derive(Debug, Clone)]
pub struct CommandClient {
    base_url: String,
    client: reqwest::Client,
}

impl CommandClient {
    /// Client for the server at `base_url` (no trailing slash needed).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Client for `CLASH_SERVER_URL`, or the local default.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("CLASH_SERVER_URL")
                .ok()
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
        )
    }

    /// Server root this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `ws://` address of the realtime channel.
    pub fn ws_url(&self) -> String {
        let rest = self
            .base_url
            .strip_prefix("https://")
            .map(|rest| format!("wss://{rest}"))
            .or_else(|| {
                self.base_url
                    .strip_prefix("http://")
                    .map(|rest| format!("ws://{rest}"))
            })
            .unwrap_or_else(|| self.base_url.clone());
        format!("{rest}/ws")
    }

    /// Fetch the full snapshot, or `None` when the server cannot be reached.
    pub async fn fetch_snapshot(&self) -> Option<TournamentSnapshot> {
        let response = match self.client.get(self.url("/state")).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "failed to fetch snapshot");
                return None;
            }
        };
        if !response.status().is_success() {
            warn!(status = %response.status(), "snapshot request rejected");
            return None;
        }
        match response.json().await {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!(error = %err, "failed to decode snapshot");
                None
            }
        }
    }

    /// Put a match on screen.
    pub async fn start_match(&self, match_id: &str) {
        self.post("/start-match", &match_command(match_id)).await;
    }

    /// Draw a challenge, optionally forcing its theme.
    pub async fn set_theme(
        &self,
        match_id: &str,
        theme: Option<Theme>,
        disabled: Option<Vec<Theme>>,
    ) {
        let body = ThemeRequest {
            match_id: match_id.to_string(),
            theme,
            disabled,
        };
        self.post("/theme", &body).await;
    }

    /// Score one side of the round.
    pub async fn submit_challenge(&self, match_id: &str, team: Side, result: RoundResult) {
        let body = SubmitChallengeRequest {
            match_id: match_id.to_string(),
            team,
            result,
        };
        self.post("/submit-challenge", &body).await;
    }

    /// Score both sides of the round.
    pub async fn submit_round(&self, match_id: &str, team_a: RoundResult, team_b: RoundResult) {
        let body = SubmitRoundRequest {
            match_id: match_id.to_string(),
            team_a,
            team_b,
        };
        self.post("/submit-round", &body).await;
    }

    /// Skip to another challenge.
    pub async fn next_challenge(&self, match_id: &str) {
        self.post("/next-challenge", &match_command(match_id)).await;
    }

    /// Declare a winner by hand.
    pub async fn advance(&self, match_id: &str, winner_id: &str) {
        let body = AdvanceRequest {
            match_id: match_id.to_string(),
            winner_id: winner_id.to_string(),
        };
        self.post("/advance", &body).await;
    }

    /// Correct scores.
    pub async fn override_score(&self, request: &OverrideScoreRequest) {
        self.post("/override-score", request).await;
    }

    /// Roll a match back to pending.
    pub async fn reset_match(&self, match_id: &str) {
        self.post("/reset-match", &match_command(match_id)).await;
    }

    /// Drop the challenge on screen.
    pub async fn reset_round(&self, match_id: &str) {
        self.post("/reset-round", &match_command(match_id)).await;
    }

    /// Wipe the tournament. The caller is responsible for asking the host first.
    pub async fn reset_tournament(&self, teams: Option<Vec<TeamInput>>) {
        let body = ResetTournamentRequest {
            teams,
            settings: None,
            confirm: true,
        };
        self.post("/reset", &body).await;
    }

    /// Replace the roster.
    pub async fn set_teams(&self, teams: &[TeamInput]) {
        self.post("/teams", &teams).await;
    }

    /// Broadcast a sound cue.
    pub async fn play_sfx(&self, event: &str) {
        let body = SfxRequest {
            event: event.to_string(),
        };
        self.post("/sfx", &body).await;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) {
        match self.client.post(self.url(path)).json(body).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(path, "command accepted");
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!(path, %status, body = %body, "command rejected");
            }
            Err(err) => warn!(path, error = %err, "command failed"),
        }
    }
}

fn match_command(match_id: &str) -> MatchCommand {
    MatchCommand {
        match_id: match_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_url_follows_the_http_scheme() {
        assert_eq!(
            CommandClient::new("http://localhost:8000/").ws_url(),
            "ws://localhost:8000/ws"
        );
        assert_eq!(
            CommandClient::new("https://clash.example").ws_url(),
            "wss://clash.example/ws"
        );
    }

    #[tokio::test]
    async fn unreachable_server_yields_no_snapshot() {
        let client = CommandClient::new("http://127.0.0.1:9");
        assert!(client.fetch_snapshot().await.is_none());
        client.start_match("g1").await;
    }
}
