use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::controller::PetUpdate;
use crate::perception::Action;

/// A bubble comment with its auto-hide deadline.
#[derive(Debug, Clone)]
struct TimedComment {
    text: String,
    hide_at: Instant,
}

/// Presentation-facing state: the current mood animation and the bubble
/// text. Mutated only on the UI thread.
pub struct PresentationState {
    action: Action,
    comment: Option<TimedComment>,
    comment_duration: Duration,
    last_seq: u64,
    transitions: u64,
}

impl PresentationState {
    pub fn new(comment_duration: Duration) -> Self {
        Self {
            action: Action::Idle,
            comment: None,
            comment_duration,
            last_seq: 0,
            transitions: 0,
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_ref().map(|c| c.text.as_str())
    }

    /// Animation switches so far. Stays flat when the same action is
    /// applied repeatedly.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Applies one analysis outcome. Results arriving out of order are
    /// rejected: only a sequence number greater than the last applied one
    /// may mutate state (reject-stale policy).
    pub fn apply(&mut self, update: PetUpdate, now: Instant) -> bool {
        if update.seq <= self.last_seq {
            warn!(
                "Discarding stale analysis for capture {} (already applied {})",
                update.seq, self.last_seq
            );
            return false;
        }
        self.last_seq = update.seq;
        match Action::parse(&update.result.action) {
            Some(action) => self.set_action(action),
            None => {
                // Unknown moods are logged and ignored, the current
                // animation keeps playing.
                warn!("Unrecognized action '{}', ignoring", update.result.action);
            }
        }
        self.show_comment(update.result.comment, now);
        true
    }

    pub fn set_action(&mut self, action: Action) {
        if action == self.action {
            return;
        }
        info!("Animation switched to: {:?}", action);
        self.action = action;
        self.transitions += 1;
    }

    pub fn show_comment(&mut self, text: String, now: Instant) {
        self.comment = Some(TimedComment {
            text,
            hide_at: now + self.comment_duration,
        });
    }

    /// Clears an expired comment. Called once per UI frame.
    pub fn tick(&mut self, now: Instant) {
        if let Some(comment) = &self.comment {
            if now >= comment.hide_at {
                debug!("Hiding comment '{}'", comment.text);
                self.comment = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::AnalysisResult;

    fn update(seq: u64, comment: &str, action: &str) -> PetUpdate {
        PetUpdate {
            seq,
            result: AnalysisResult {
                comment: comment.to_string(),
                action: action.to_string(),
            },
        }
    }

    fn state() -> PresentationState {
        PresentationState::new(Duration::from_secs(8))
    }

    #[test]
    fn starts_idle_with_no_transitions() {
        let state = state();
        assert_eq!(state.action(), Action::Idle);
        assert_eq!(state.transitions(), 0);
        assert!(state.comment().is_none());
    }

    #[test]
    fn engage_transitions_exactly_once_and_comment_auto_clears() {
        let mut state = state();
        let now = Instant::now();
        assert!(state.apply(update(1, "Ready to respawn!", "engage"), now));
        assert_eq!(state.action(), Action::Engage);
        assert_eq!(state.transitions(), 1);
        assert_eq!(state.comment(), Some("Ready to respawn!"));

        // Still visible just before the deadline, gone at it.
        state.tick(now + Duration::from_secs(7));
        assert_eq!(state.comment(), Some("Ready to respawn!"));
        state.tick(now + Duration::from_secs(8));
        assert!(state.comment().is_none());
    }

    #[test]
    fn repeated_action_is_idempotent() {
        let mut state = state();
        let now = Instant::now();
        state.apply(update(1, "go go go", "engage"), now);
        state.apply(update(2, "still going", "engage"), now);
        assert_eq!(state.transitions(), 1);

        state.set_action(Action::Engage);
        state.set_action(Action::Engage);
        assert_eq!(state.transitions(), 1);
    }

    #[test]
    fn stale_sequence_is_rejected() {
        let mut state = state();
        let now = Instant::now();
        assert!(state.apply(update(2, "newer", "engage"), now));
        // Cycle 1 finished after cycle 2: its result must not win.
        assert!(!state.apply(update(1, "older", "idle"), now));
        assert_eq!(state.action(), Action::Engage);
        assert_eq!(state.comment(), Some("newer"));
    }

    #[test]
    fn duplicate_sequence_is_rejected() {
        let mut state = state();
        let now = Instant::now();
        assert!(state.apply(update(1, "first", "idle"), now));
        assert!(!state.apply(update(1, "echo", "engage"), now));
        assert_eq!(state.comment(), Some("first"));
    }

    #[test]
    fn unrecognized_action_keeps_animation_but_shows_comment() {
        let mut state = state();
        let now = Instant::now();
        assert!(state.apply(update(1, "zzz", "sleep"), now));
        assert_eq!(state.action(), Action::Idle);
        assert_eq!(state.transitions(), 0);
        assert_eq!(state.comment(), Some("zzz"));
    }

    #[test]
    fn new_comment_refreshes_deadline() {
        let mut state = state();
        let now = Instant::now();
        state.show_comment("first".to_string(), now);
        let later = now + Duration::from_secs(5);
        state.show_comment("second".to_string(), later);
        state.tick(now + Duration::from_secs(8));
        assert_eq!(state.comment(), Some("second"));
        state.tick(later + Duration::from_secs(8));
        assert!(state.comment().is_none());
    }
}
