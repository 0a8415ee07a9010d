mod exercise;
mod ids;
mod preferences;
mod xp;

pub use exercise::{
    Exercise, ExerciseError, ExerciseKind, ExerciseStep, PyramidOperation, PyramidStage,
    QuizQuestion, StepAnswer,
};
pub use ids::{ExerciseId, ParseIdError};
pub use preferences::{
    DEFAULT_LANGUAGE, LANGUAGE_KEY, NOTIFICATIONS_KEY, PreferenceError, Preferences, THEME_KEY,
    Theme, parse_toggle,
};
pub use xp::{LeaderboardEntry, StepFeedback, XpAward};
