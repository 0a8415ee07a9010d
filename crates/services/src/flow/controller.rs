use std::sync::Arc;

use chrono::{DateTime, Utc};
use lingo_core::model::{
    Exercise, ExerciseId, ExerciseKind, ExerciseStep, StepAnswer, StepFeedback,
};
use lingo_core::{Clock, SessionProgress};
use rand::rng;
use rand::seq::SliceRandom;

use super::host::{BackAction, QuitPrompt, Route, SystemChrome};
use super::state::{FlowFailure, FlowPhase, FlowState, FlowView, PrimaryAction, SessionResult};
use crate::backend::{ExerciseBackend, SessionSubmission};
use crate::error::FlowError;

/// Result of answering a non-final step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub feedback: StepFeedback,
    pub view: FlowView,
}

#[derive(Debug, Clone)]
struct RecordedAnswer {
    answer: StepAnswer,
    correct: Option<bool>,
}

/// Drives one quiz or pyramid session from loading to the result screen.
///
/// The controller exclusively owns the session's `SessionProgress`; a fresh session
/// needs a fresh controller.
pub struct ExerciseFlow {
    kind: ExerciseKind,
    backend: Arc<dyn ExerciseBackend>,
    clock: Clock,
    chrome: Option<Arc<dyn SystemChrome>>,
    navigation_bar_hidden: bool,
    shuffle_options: bool,
    state: FlowState,
    progress: SessionProgress,
    exercise: Option<Exercise>,
    presented: Option<ExerciseStep>,
    answers: Vec<RecordedAnswer>,
    /// Final answer already accepted by the backend while completion is outstanding.
    pending_final: Option<RecordedAnswer>,
    started_at: Option<DateTime<Utc>>,
}

impl ExerciseFlow {
    #[must_use]
    pub fn new(kind: ExerciseKind, backend: Arc<dyn ExerciseBackend>, clock: Clock) -> Self {
        Self {
            kind,
            backend,
            clock,
            chrome: None,
            navigation_bar_hidden: false,
            shuffle_options: false,
            state: FlowState::Loading,
            progress: SessionProgress::new(),
            exercise: None,
            presented: None,
            answers: Vec::new(),
            pending_final: None,
            started_at: None,
        }
    }

    #[must_use]
    pub fn with_chrome(mut self, chrome: Arc<dyn SystemChrome>) -> Self {
        self.chrome = Some(chrome);
        self
    }

    #[must_use]
    pub fn with_shuffle_options(mut self, shuffle_options: bool) -> Self {
        self.shuffle_options = shuffle_options;
        self
    }

    #[must_use]
    pub fn kind(&self) -> ExerciseKind {
        self.kind
    }

    #[must_use]
    pub fn state(&self) -> &FlowState {
        &self.state
    }

    #[must_use]
    pub fn phase(&self) -> FlowPhase {
        self.state.phase()
    }

    #[must_use]
    pub fn progress(&self) -> &SessionProgress {
        &self.progress
    }

    #[must_use]
    pub fn exercise(&self) -> Option<&Exercise> {
        self.exercise.as_ref()
    }

    /// The step under the cursor, as it should be presented.
    #[must_use]
    pub fn current_step_data(&self) -> Option<&ExerciseStep> {
        if self.state.is_active() {
            self.presented.as_ref()
        } else {
            None
        }
    }

    #[must_use]
    pub fn view(&self) -> FlowView {
        let phase = self.phase();
        let progress = match self.state {
            FlowState::Completed(_) => lingo_core::progress::FULL_PROGRESS,
            _ => self.progress.progress(),
        };
        let primary_action = match phase {
            FlowPhase::InProgress => PrimaryAction::Continue,
            FlowPhase::LastStep => PrimaryAction::Finish,
            _ => PrimaryAction::Hidden,
        };
        let error = match &self.state {
            FlowState::Failed(failure) => Some(failure.user_message()),
            _ => None,
        };

        FlowView {
            phase,
            progress,
            current_step: self.progress.current_step(),
            total_steps: self.progress.total_steps(),
            is_last_step: self.progress.is_last_step(),
            primary_action,
            error,
        }
    }

    /// Fetch the exercise and start the session.
    ///
    /// A failed fetch or an unusable payload moves the flow to `Failed`; that is reported
    /// through the returned view rather than as an error, and cannot be retried.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidTransition` unless the flow is still loading.
    pub async fn load(&mut self, exercise_id: ExerciseId) -> Result<FlowView, FlowError> {
        self.load_resumed(exercise_id, 0).await
    }

    /// Like [`ExerciseFlow::load`], but resume after `completed_steps` steps.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidTransition` unless the flow is still loading.
    pub async fn load_resumed(
        &mut self,
        exercise_id: ExerciseId,
        completed_steps: usize,
    ) -> Result<FlowView, FlowError> {
        self.expect_phase(FlowPhase::Loading, "load")?;

        match self.backend.fetch_exercise(exercise_id).await {
            Ok(exercise) => self.begin(exercise, completed_steps),
            Err(err) => {
                tracing::warn!(%exercise_id, error = %err, "exercise fetch failed");
                self.state = FlowState::Failed(FlowFailure::Fetch(err.user_message()));
            }
        }

        Ok(self.view())
    }

    fn begin(&mut self, exercise: Exercise, completed_steps: usize) {
        if exercise.kind != self.kind {
            tracing::warn!(
                expected = %self.kind,
                actual = %exercise.kind,
                "exercise kind mismatch"
            );
            self.state = FlowState::Failed(FlowFailure::KindMismatch {
                expected: self.kind,
                actual: exercise.kind,
            });
            return;
        }
        if let Err(err) = exercise.validate() {
            tracing::warn!(exercise_id = %exercise.id, error = %err, "invalid exercise payload");
            self.state = FlowState::Failed(FlowFailure::InvalidExercise(err.to_string()));
            return;
        }
        if exercise.step_count() == 0 {
            self.state = FlowState::Failed(FlowFailure::Empty);
            return;
        }

        self.progress.reset_progress();
        self.progress.set_total_steps(exercise.step_count());
        if completed_steps > 0 {
            self.progress.resume_at(completed_steps);
        }
        self.answers.clear();
        self.pending_final = None;
        self.started_at = Some(self.clock.now());

        tracing::info!(
            exercise_id = %exercise.id,
            kind = %exercise.kind,
            steps = exercise.step_count(),
            resumed_at = self.progress.current_step(),
            "session started"
        );
        self.exercise = Some(exercise);
        self.set_navigation_bar_visible(false);
        self.enter_current_step();
    }

    /// Submit the answer for the current (non-final) step and advance.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidTransition` outside `InProgress`, or
    /// `FlowError::Backend` if the submission fails; the session stays on the same step.
    pub async fn submit_answer(&mut self, answer: StepAnswer) -> Result<StepOutcome, FlowError> {
        self.expect_phase(FlowPhase::InProgress, "submit an answer")?;

        let (exercise_id, index) = self.cursor()?;
        let feedback = self
            .backend
            .submit_step(exercise_id, index, &answer)
            .await?;

        let correct = self.grade(index, &answer, &feedback);
        self.answers.push(RecordedAnswer { answer, correct });
        self.progress.update_progress();
        self.enter_current_step();

        Ok(StepOutcome {
            feedback,
            view: self.view(),
        })
    }

    /// Submit the final answer, complete the session, and hand back the result route.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidTransition` outside `LastStep`, or `FlowError::Backend`
    /// if either request fails; the session then stays on the last step. Once the final
    /// step has been accepted, a retry only repeats the completion request and `answer`
    /// is ignored.
    pub async fn finish(&mut self, answer: StepAnswer) -> Result<Route, FlowError> {
        self.expect_phase(FlowPhase::LastStep, "finish")?;

        let (exercise_id, index) = self.cursor()?;
        let final_answer = match self.pending_final.take() {
            Some(accepted) => accepted,
            None => {
                let feedback = self
                    .backend
                    .submit_step(exercise_id, index, &answer)
                    .await?;
                RecordedAnswer {
                    correct: self.grade(index, &answer, &feedback),
                    answer,
                }
            }
        };

        let started_at = self.started_at.unwrap_or_else(|| self.clock.now());
        let completed_at = self.clock.now();
        let correct = self
            .answers
            .iter()
            .chain(std::iter::once(&final_answer))
            .filter(|recorded| recorded.correct == Some(true))
            .count();
        let submission = SessionSubmission {
            answers: self
                .answers
                .iter()
                .chain(std::iter::once(&final_answer))
                .map(|recorded| recorded.answer.clone())
                .collect(),
            correct: u32::try_from(correct).unwrap_or(u32::MAX),
            started_at,
            completed_at,
        };
        let xp = match self.backend.complete_session(exercise_id, &submission).await {
            Ok(xp) => xp,
            Err(err) => {
                self.pending_final = Some(final_answer);
                return Err(err.into());
            }
        };

        self.answers.push(final_answer);
        let result = SessionResult {
            exercise_id,
            kind: self.kind,
            title: self
                .exercise
                .as_ref()
                .map(|exercise| exercise.title.clone())
                .unwrap_or_default(),
            answered: self.answers.len(),
            correct,
            xp,
            started_at,
            completed_at,
        };

        tracing::info!(
            %exercise_id,
            answered = result.answered,
            correct = result.correct,
            xp = result.xp.earned,
            "session completed"
        );
        self.progress.reset_progress();
        self.presented = None;
        self.set_navigation_bar_visible(true);
        self.state = FlowState::Completed(result.clone());

        Ok(Route::Result(result))
    }

    /// Ask to abandon the session.
    ///
    /// Returns `None` when the learner declines; otherwise progress is reset and the host
    /// should navigate to the returned module root.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidTransition` while loading or after the session ended.
    pub fn quit(&mut self, prompt: &dyn QuitPrompt) -> Result<Option<Route>, FlowError> {
        match self.phase() {
            FlowPhase::Loading | FlowPhase::Completed | FlowPhase::Abandoned => {
                Err(FlowError::InvalidTransition {
                    from: self.phase(),
                    action: "quit",
                })
            }
            FlowPhase::InProgress | FlowPhase::LastStep | FlowPhase::Failed => {
                Ok(self.confirm_and_abandon(prompt))
            }
        }
    }

    /// Intercept a hardware back press while a step screen is shown.
    pub fn handle_back(&mut self, prompt: &dyn QuitPrompt) -> BackAction {
        if self.state.is_active() {
            BackAction::Handled(self.confirm_and_abandon(prompt))
        } else {
            BackAction::PassThrough
        }
    }

    fn confirm_and_abandon(&mut self, prompt: &dyn QuitPrompt) -> Option<Route> {
        if !prompt.confirm_quit() {
            return None;
        }

        tracing::info!(
            kind = %self.kind,
            step = self.progress.current_step(),
            "session abandoned"
        );
        self.progress.reset_progress();
        self.presented = None;
        self.pending_final = None;
        self.set_navigation_bar_visible(true);
        self.state = FlowState::Abandoned;
        Some(Route::ModuleRoot(self.kind))
    }

    fn expect_phase(&self, expected: FlowPhase, action: &'static str) -> Result<(), FlowError> {
        let from = self.phase();
        if from == expected {
            Ok(())
        } else {
            Err(FlowError::InvalidTransition { from, action })
        }
    }

    fn cursor(&self) -> Result<(ExerciseId, usize), FlowError> {
        let exercise = self
            .exercise
            .as_ref()
            .ok_or(FlowError::InvalidTransition {
                from: self.phase(),
                action: "answer without an exercise",
            })?;
        Ok((exercise.id, self.progress.current_step()))
    }

    /// Quiz answers are checked locally; other steps rely on the backend verdict.
    fn grade(&self, index: usize, answer: &StepAnswer, feedback: &StepFeedback) -> Option<bool> {
        match self.exercise.as_ref().and_then(|exercise| exercise.step(index)) {
            Some(ExerciseStep::Quiz(question)) => Some(question.is_correct(answer.as_str())),
            _ => feedback.correct,
        }
    }

    fn enter_current_step(&mut self) {
        self.state = if self.progress.is_last_step() {
            FlowState::LastStep
        } else {
            FlowState::InProgress
        };

        let step = self
            .exercise
            .as_ref()
            .and_then(|exercise| exercise.step(self.progress.current_step()))
            .cloned();
        self.presented = match step {
            Some(ExerciseStep::Quiz(mut question)) if self.shuffle_options => {
                question.options.shuffle(&mut rng());
                Some(ExerciseStep::Quiz(question))
            }
            other => other,
        };
    }

    fn set_navigation_bar_visible(&mut self, visible: bool) {
        if let Some(chrome) = self.chrome.as_ref() {
            chrome.set_navigation_bar_visible(visible);
        }
        self.navigation_bar_hidden = !visible;
    }
}

impl Drop for ExerciseFlow {
    fn drop(&mut self) {
        if self.navigation_bar_hidden {
            self.set_navigation_bar_visible(true);
        }
    }
}
