use serde::{Deserialize, Serialize};

/// XP granted for completing a session, with the learner's new total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct XpAward {
    pub earned: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub display_name: String,
    pub xp: u32,
}

/// Backend verdict on a single submitted step.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StepFeedback {
    pub accepted: bool,
    #[serde(default)]
    pub correct: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StepFeedback {
    #[must_use]
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            correct: None,
            message: None,
        }
    }

    #[must_use]
    pub fn with_correct(mut self, correct: bool) -> Self {
        self.correct = Some(correct);
        self
    }
}
