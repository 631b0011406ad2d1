use thiserror::Error;

use crate::state::tournament::MatchStatus;

/// Events that can be applied to a match lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    /// The host puts the match on screen.
    Start,
    /// A winner has been decided.
    Resolve,
    /// The host rolls the match back to its initial state.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while match is {from:?}")]
pub struct InvalidTransition {
    /// The status the match was in when the event was received.
    pub from: MatchStatus,
    /// The event that cannot be applied from this status.
    pub event: MatchEvent,
}

/// Compute the status reached by applying `event` while in `from`.
///
/// Forward edges are strictly `pending -> in_progress -> completed`; `Reset` is the only
/// way back and is accepted from every status.
pub fn compute_transition(
    from: MatchStatus,
    event: MatchEvent,
) -> Result<MatchStatus, InvalidTransition> {
    use MatchEvent::*;
    use MatchStatus::*;

    match (from, event) {
        (Pending, Start) => Ok(InProgress),
        (InProgress, Resolve) => Ok(Completed),
        (_, Reset) => Ok(Pending),
        (from, event) => Err(InvalidTransition { from, event }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_path_is_pending_in_progress_completed() {
        let started = compute_transition(MatchStatus::Pending, MatchEvent::Start).unwrap();
        assert_eq!(started, MatchStatus::InProgress);
        let done = compute_transition(started, MatchEvent::Resolve).unwrap();
        assert_eq!(done, MatchStatus::Completed);
    }

    #[test]
    fn reset_is_accepted_from_every_status() {
        for from in [
            MatchStatus::Pending,
            MatchStatus::InProgress,
            MatchStatus::Completed,
        ] {
            assert_eq!(
                compute_transition(from, MatchEvent::Reset),
                Ok(MatchStatus::Pending)
            );
        }
    }

    #[test]
    fn cannot_resolve_a_pending_match() {
        let err = compute_transition(MatchStatus::Pending, MatchEvent::Resolve).unwrap_err();
        assert_eq!(err.from, MatchStatus::Pending);
        assert_eq!(err.event, MatchEvent::Resolve);
    }

    #[test]
    fn completed_match_cannot_restart() {
        assert!(compute_transition(MatchStatus::Completed, MatchEvent::Start).is_err());
        assert!(compute_transition(MatchStatus::Completed, MatchEvent::Resolve).is_err());
    }

    #[test]
    fn in_progress_match_cannot_start_again() {
        assert!(compute_transition(MatchStatus::InProgress, MatchEvent::Start).is_err());
    }
}
