use std::fmt;

use chrono::{DateTime, Utc};
use lingo_core::model::{ExerciseId, ExerciseKind, XpAward};

use crate::error::GENERIC_FAILURE_MESSAGE;

/// Data-free tag of a `FlowState`, used in errors and views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    Loading,
    InProgress,
    LastStep,
    Completed,
    Failed,
    Abandoned,
}

impl fmt::Display for FlowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Loading => "loading",
            Self::InProgress => "in progress",
            Self::LastStep => "on the last step",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
        };
        f.write_str(label)
    }
}

/// Why a session could not start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowFailure {
    /// The backend fetch failed; carries the learner-facing message.
    Fetch(String),
    InvalidExercise(String),
    KindMismatch {
        expected: ExerciseKind,
        actual: ExerciseKind,
    },
    Empty,
}

impl FlowFailure {
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Fetch(message) => message.clone(),
            Self::Empty => "This exercise has no steps yet.".to_string(),
            Self::InvalidExercise(_) | Self::KindMismatch { .. } => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
        }
    }
}

/// Summary handed to the result screen once a session is completed.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionResult {
    pub exercise_id: ExerciseId,
    pub kind: ExerciseKind,
    pub title: String,
    pub answered: usize,
    pub correct: usize,
    pub xp: XpAward,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowState {
    /// Exercise metadata not fetched yet.
    Loading,
    InProgress,
    /// Cursor on the final step; the primary action becomes "finish".
    LastStep,
    Completed(SessionResult),
    Failed(FlowFailure),
    /// Learner confirmed quitting.
    Abandoned,
}

impl FlowState {
    #[must_use]
    pub fn phase(&self) -> FlowPhase {
        match self {
            Self::Loading => FlowPhase::Loading,
            Self::InProgress => FlowPhase::InProgress,
            Self::LastStep => FlowPhase::LastStep,
            Self::Completed(_) => FlowPhase::Completed,
            Self::Failed(_) => FlowPhase::Failed,
            Self::Abandoned => FlowPhase::Abandoned,
        }
    }

    /// True while a step screen is on display.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress | Self::LastStep)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryAction {
    Continue,
    Finish,
    Hidden,
}

/// Snapshot of everything a step screen needs to render its chrome.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowView {
    pub phase: FlowPhase,
    pub progress: f64,
    pub current_step: usize,
    pub total_steps: usize,
    pub is_last_step: bool,
    pub primary_action: PrimaryAction,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_step_phases_are_active() {
        assert!(FlowState::InProgress.is_active());
        assert!(FlowState::LastStep.is_active());
        assert!(!FlowState::Loading.is_active());
        assert!(!FlowState::Abandoned.is_active());
        assert!(!FlowState::Failed(FlowFailure::Empty).is_active());
    }

    #[test]
    fn fetch_failure_message_is_passed_through() {
        let failure = FlowFailure::Fetch("Please rephrase.".into());
        assert_eq!(failure.user_message(), "Please rephrase.");
        assert_eq!(
            FlowFailure::InvalidExercise("bad".into()).user_message(),
            GENERIC_FAILURE_MESSAGE
        );
    }
}
