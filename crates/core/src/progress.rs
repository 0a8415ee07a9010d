//! Session progress tracking with front-loaded step weighting.
//!
//! Earlier steps of a session advance the progress bar further than later ones:
//! step `i` of `n` carries weight `(n - i)^1.4`, normalized so that all steps sum to 100.

/// Exponent applied to the remaining-step count when weighting a step.
pub const STEP_WEIGHT_EXPONENT: f64 = 1.4;

/// Upper bound for the accumulated percentage.
pub const FULL_PROGRESS: f64 = 100.0;

/// Raw (unnormalized) weights for a session of `total_steps` steps.
///
/// Weights strictly decrease with the step index. Returns an empty vector for zero steps.
#[must_use]
pub fn step_weights(total_steps: usize) -> Vec<f64> {
    (0..total_steps)
        .map(|index| {
            #[allow(clippy::cast_precision_loss)]
            let remaining = (total_steps - index) as f64;
            remaining.powf(STEP_WEIGHT_EXPONENT)
        })
        .collect()
}

/// Percentage of the progress bar credited to each step, in step order.
///
/// The returned values sum to 100 (within floating point error) for any
/// `total_steps >= 1`. A non-positive weight sum yields all zeros instead of dividing by it.
#[must_use]
pub fn step_percentages(total_steps: usize) -> Vec<f64> {
    let weights = step_weights(total_steps);
    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 {
        return vec![0.0; weights.len()];
    }

    weights
        .into_iter()
        .map(|weight| weight / sum * FULL_PROGRESS)
        .collect()
}

/// Position and accumulated percentage of a single exercise session.
///
/// Created empty; the owner sets the step count once exercise metadata is known and
/// advances it after each completed step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionProgress {
    total_steps: usize,
    current_step: usize,
    percent: f64,
    percentages: Vec<f64>,
}

impl SessionProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of steps and recompute the per-step percentages.
    ///
    /// The current step and accumulated percentage are kept as they are; pair this with
    /// [`SessionProgress::reset_progress`] when reusing an instance. A current step beyond
    /// the new total is pulled back to the total.
    pub fn set_total_steps(&mut self, total_steps: usize) {
        self.total_steps = total_steps;
        self.percentages = step_percentages(total_steps);
        self.current_step = self.current_step.min(total_steps);
    }

    /// Move the cursor directly to `step` without touching the accumulated percentage.
    pub fn set_current_step(&mut self, step: usize) {
        self.current_step = step.min(self.total_steps);
    }

    /// Resume a partially completed session at `step`.
    ///
    /// Produces the same state as `step` successive calls to
    /// [`SessionProgress::update_progress`] from a fresh start.
    pub fn resume_at(&mut self, step: usize) {
        self.percent = 0.0;
        self.current_step = 0;
        let target = step.min(self.total_steps);
        while self.current_step < target && self.update_progress() {}
    }

    /// Credit the current step and advance to the next one.
    ///
    /// Does nothing on the final step or when no steps are set. Returns whether the
    /// state changed.
    pub fn update_progress(&mut self) -> bool {
        if self.total_steps == 0 || self.current_step >= self.total_steps - 1 {
            return false;
        }

        let credit = self
            .percentages
            .get(self.current_step)
            .copied()
            .unwrap_or(0.0);
        self.percent = (self.percent + credit).min(FULL_PROGRESS);
        self.current_step += 1;
        true
    }

    /// Return every field to zero.
    pub fn reset_progress(&mut self) {
        self.total_steps = 0;
        self.current_step = 0;
        self.percent = 0.0;
        self.percentages.clear();
    }

    /// True when the cursor sits on the final step. Never true for an empty session.
    #[must_use]
    pub fn is_last_step(&self) -> bool {
        self.total_steps > 0 && self.current_step == self.total_steps - 1
    }

    /// Accumulated completion percentage in `[0, 100]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.percent
    }

    #[must_use]
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    #[must_use]
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    #[must_use]
    pub fn percentages(&self) -> &[f64] {
        &self.percentages
    }
}
