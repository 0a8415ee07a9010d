//! Contracts between the flow controller and the screen hosting it.

use lingo_core::model::ExerciseKind;

use super::state::SessionResult;

/// Confirmation dialog shown before abandoning a session.
pub trait QuitPrompt {
    fn confirm_quit(&self) -> bool;
}

impl<F> QuitPrompt for F
where
    F: Fn() -> bool,
{
    fn confirm_quit(&self) -> bool {
        self()
    }
}

/// Platform navigation-bar visibility. Calls are fire-and-forget.
pub trait SystemChrome: Send + Sync {
    fn set_navigation_bar_visible(&self, visible: bool);
}

/// Where the host should navigate after a flow transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    ModuleRoot(ExerciseKind),
    Result(SessionResult),
}

/// Outcome of a hardware back press.
#[derive(Debug, Clone, PartialEq)]
pub enum BackAction {
    /// Not intercepted; the host applies its default navigation.
    PassThrough,
    /// Intercepted; navigate to the route if the learner confirmed quitting.
    Handled(Option<Route>),
}
