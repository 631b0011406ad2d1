//! Declarative bracket wiring.
//!
//! A topology is an ordered list of match nodes. Leaf nodes are seeded with teams;
//! every other node names the two earlier matches feeding it and whether their
//! winners or losers advance.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::state::tournament::{Match, MatchId, Settings, SlotOutcome, Team, TournamentState};

/// A single match slot in the bracket graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchNode {
    /// Identifier of the match.
    pub id: MatchId,
    /// Display label.
    #[serde(default)]
    pub label: Option<String>,
    /// Match feeding slot A.
    #[serde(default)]
    pub source_a: Option<MatchId>,
    /// Match feeding slot B.
    #[serde(default)]
    pub source_b: Option<MatchId>,
    /// Outcome of the sources that advances here.
    #[serde(default)]
    pub source_outcome: SlotOutcome,
}

impl MatchNode {
    fn leaf(id: &str, label: &str) -> Self {
        Self {
            id: id.into(),
            label: Some(label.into()),
            source_a: None,
            source_b: None,
            source_outcome: SlotOutcome::Winner,
        }
    }

    fn fed(id: &str, label: &str, a: &str, b: &str, outcome: SlotOutcome) -> Self {
        Self {
            id: id.into(),
            label: Some(label.into()),
            source_a: Some(a.into()),
            source_b: Some(b.into()),
            source_outcome: outcome,
        }
    }

    /// Leaf nodes receive seeded teams instead of upstream results.
    pub fn is_leaf(&self) -> bool {
        self.source_a.is_none() && self.source_b.is_none()
    }
}

/// Reasons a topology is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// The topology has no match at all.
    #[error("bracket has no matches")]
    Empty,
    /// Two nodes share an identifier.
    #[error("duplicate match id `{0}`")]
    DuplicateMatch(MatchId),
    /// A node names a source that is not declared before it.
    #[error("match `{node}` is fed by `{upstream}`, which is not an earlier match")]
    UnknownSource {
        /// Node holding the reference.
        node: MatchId,
        /// Unresolved source id.
        upstream: MatchId,
    },
    /// A node has exactly one source.
    #[error("match `{0}` must have either zero or two sources")]
    HalfFed(MatchId),
    /// A designated match is missing.
    #[error("designated match `{0}` is not part of the bracket")]
    MissingDesignated(MatchId),
}

/// Ordered bracket graph with its final and optional third-place designations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketTopology {
    /// Matches in play order; sources always precede the matches they feed.
    pub nodes: Vec<MatchNode>,
    /// Match deciding the champion.
    pub final_match_id: MatchId,
    /// Match deciding third place.
    #[serde(default)]
    pub third_place_match_id: Option<MatchId>,
}

impl Default for BracketTopology {
    fn default() -> Self {
        Self::eight_teams()
    }
}

impl BracketTopology {
    /// Four group matches, two semifinals, a final and a third-place match.
    pub fn eight_teams() -> Self {
        use SlotOutcome::{Loser, Winner};

        Self {
            nodes: vec![
                MatchNode::leaf("g1", "Group Stage 1"),
                MatchNode::leaf("g2", "Group Stage 2"),
                MatchNode::leaf("g3", "Group Stage 3"),
                MatchNode::leaf("g4", "Group Stage 4"),
                MatchNode::fed("sf1", "Semifinal 1", "g1", "g2", Winner),
                MatchNode::fed("sf2", "Semifinal 2", "g3", "g4", Winner),
                MatchNode::fed("final", "Final", "sf1", "sf2", Winner),
                MatchNode::fed("third", "Third Place", "sf1", "sf2", Loser),
            ],
            final_match_id: "final".into(),
            third_place_match_id: Some("third".into()),
        }
    }

    /// Recover the wiring of an existing bracket.
    pub fn from_state(state: &TournamentState) -> Self {
        Self {
            nodes: state
                .bracket
                .iter()
                .map(|m| MatchNode {
                    id: m.id.clone(),
                    label: m.label.clone(),
                    source_a: m.source_a.clone(),
                    source_b: m.source_b.clone(),
                    source_outcome: m.source_outcome,
                })
                .collect(),
            final_match_id: state.final_match_id.clone(),
            third_place_match_id: state.third_place_match_id.clone(),
        }
    }

    /// Check identifiers, source ordering and designations.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.nodes.is_empty() {
            return Err(TopologyError::Empty);
        }

        let mut seen: HashSet<&str> = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            match (&node.source_a, &node.source_b) {
                (None, None) => {}
                (Some(a), Some(b)) => {
                    for source in [a, b] {
                        if !seen.contains(source.as_str()) {
                            return Err(TopologyError::UnknownSource {
                                node: node.id.clone(),
                                upstream: source.clone(),
                            });
                        }
                    }
                }
                _ => return Err(TopologyError::HalfFed(node.id.clone())),
            }
            if !seen.insert(node.id.as_str()) {
                return Err(TopologyError::DuplicateMatch(node.id.clone()));
            }
        }

        let designated = std::iter::once(&self.final_match_id).chain(&self.third_place_match_id);
        for id in designated {
            if !seen.contains(id.as_str()) {
                return Err(TopologyError::MissingDesignated(id.clone()));
            }
        }

        Ok(())
    }

    /// Nodes that receive seeded teams.
    pub fn leaves(&self) -> impl Iterator<Item = &MatchNode> {
        self.nodes.iter().filter(|node| node.is_leaf())
    }

    /// Number of teams needed to fill every leaf.
    pub fn seed_capacity(&self) -> usize {
        self.leaves().count() * 2
    }

    /// Build a fresh tournament: leaves are filled two teams at a time in roster order.
    ///
    /// Returns `None` when fewer teams than [`seed_capacity`](Self::seed_capacity) are
    /// supplied. Every supplied team joins the leaderboard with a zero score, but only
    /// the first `seed_capacity` are placed in the bracket.
    pub fn seed(&self, teams: Vec<Team>, settings: Settings) -> Option<TournamentState> {
        let capacity = self.seed_capacity();
        if teams.len() < capacity {
            return None;
        }
        if teams.len() > capacity {
            warn!(
                supplied = teams.len(),
                capacity, "more teams than bracket slots; extra teams are not seeded"
            );
        }

        let mut seeds = teams.iter().map(|team| team.id.clone());
        let bracket = self
            .nodes
            .iter()
            .map(|node| {
                let mut m = Match::new(node.id.clone(), settings.best_of);
                m.label = node.label.clone();
                m.source_a = node.source_a.clone();
                m.source_b = node.source_b.clone();
                m.source_outcome = node.source_outcome;
                if node.is_leaf() {
                    m.team_a = seeds.next();
                    m.team_b = seeds.next();
                }
                m
            })
            .collect();

        let leaderboard = teams
            .into_iter()
            .map(|team| Team { score: 0, ..team })
            .collect();

        Some(TournamentState {
            bracket,
            leaderboard,
            settings,
            current_match_id: None,
            global_used_challenge_ids: Vec::new(),
            final_match_id: self.final_match_id.clone(),
            third_place_match_id: self.third_place_match_id.clone(),
        })
    }
}
