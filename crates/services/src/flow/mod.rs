mod controller;
mod host;
mod state;

pub use controller::{ExerciseFlow, StepOutcome};
pub use host::{BackAction, QuitPrompt, Route, SystemChrome};
pub use state::{
    FlowFailure, FlowPhase, FlowState, FlowView, PrimaryAction, SessionResult,
};
