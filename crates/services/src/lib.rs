#![forbid(unsafe_code)]

pub mod backend;
pub mod error;
pub mod flow;
pub mod leaderboard_service;
pub mod preferences_service;

pub use lingo_core::Clock;

pub use backend::{BackendConfig, ExerciseBackend, HttpBackend, SessionSubmission};
pub use error::{BackendError, FlowError};
pub use flow::{
    BackAction, ExerciseFlow, FlowFailure, FlowPhase, FlowState, FlowView, PrimaryAction,
    QuitPrompt, Route, SessionResult, StepOutcome, SystemChrome,
};
pub use leaderboard_service::LeaderboardService;
pub use preferences_service::PreferencesService;
