use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ExerciseId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExerciseError {
    #[error("exercise title cannot be empty")]
    EmptyTitle,

    #[error("step {index} does not match the exercise kind")]
    KindMismatch { index: usize },

    #[error("quiz question at step {index} has no options")]
    NoOptions { index: usize },

    #[error("quiz answer at step {index} is not one of its options")]
    AnswerNotInOptions { index: usize },

    #[error("pyramid stage at step {index} has an empty sentence")]
    EmptySentence { index: usize },
}

/// Learning module an exercise belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    Quiz,
    Pyramid,
}

impl ExerciseKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quiz => "quiz",
            Self::Pyramid => "pyramid",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "quiz" => Some(Self::Quiz),
            "pyramid" => Some(Self::Pyramid),
            _ => None,
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transformation requested by a pyramid stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PyramidOperation {
    Expand,
    Shrink,
    Replace,
    Paraphrase,
}

/// A single vocabulary question with its answer options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: String,
}

impl QuizQuestion {
    /// Compare a chosen option against the expected answer, ignoring surrounding whitespace.
    #[must_use]
    pub fn is_correct(&self, choice: &str) -> bool {
        self.answer.trim() == choice.trim()
    }
}

/// One stage of a pyramid exercise: rewrite `sentence` according to `operation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PyramidStage {
    pub operation: PyramidOperation,
    pub sentence: String,
    pub instruction: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExerciseStep {
    Quiz(QuizQuestion),
    Pyramid(PyramidStage),
}

impl ExerciseStep {
    #[must_use]
    pub fn kind(&self) -> ExerciseKind {
        match self {
            Self::Quiz(_) => ExerciseKind::Quiz,
            Self::Pyramid(_) => ExerciseKind::Pyramid,
        }
    }
}

/// Answer given by the learner for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StepAnswer {
    /// Text of the chosen quiz option.
    Choice(String),
    /// Sentence written for a pyramid stage.
    Text(String),
}

impl StepAnswer {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Choice(value) | Self::Text(value) => value,
        }
    }
}

/// Exercise payload as served by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: ExerciseId,
    pub kind: ExerciseKind,
    pub title: String,
    #[serde(default)]
    pub steps: Vec<ExerciseStep>,
}

impl Exercise {
    /// Check the payload for structural problems.
    ///
    /// An exercise without steps is accepted here; callers decide how to present it.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError` for a blank title, a step of the wrong kind, or a
    /// malformed quiz question / pyramid stage.
    pub fn validate(&self) -> Result<(), ExerciseError> {
        if self.title.trim().is_empty() {
            return Err(ExerciseError::EmptyTitle);
        }

        for (index, step) in self.steps.iter().enumerate() {
            if step.kind() != self.kind {
                return Err(ExerciseError::KindMismatch { index });
            }
            match step {
                ExerciseStep::Quiz(question) => {
                    if question.options.is_empty() {
                        return Err(ExerciseError::NoOptions { index });
                    }
                    if !question.options.iter().any(|opt| question.is_correct(opt)) {
                        return Err(ExerciseError::AnswerNotInOptions { index });
                    }
                }
                ExerciseStep::Pyramid(stage) => {
                    if stage.sentence.trim().is_empty() {
                        return Err(ExerciseError::EmptySentence { index });
                    }
                }
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn step(&self, index: usize) -> Option<&ExerciseStep> {
        self.steps.get(index)
    }

    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(answer: &str) -> ExerciseStep {
        ExerciseStep::Quiz(QuizQuestion {
            prompt: "der Hund".into(),
            options: vec!["the dog".into(), "the cat".into()],
            answer: answer.into(),
        })
    }

    fn quiz(steps: Vec<ExerciseStep>) -> Exercise {
        Exercise {
            id: ExerciseId::new(1),
            kind: ExerciseKind::Quiz,
            title: "Animals".into(),
            steps,
        }
    }

    #[test]
    fn valid_quiz_passes() {
        assert_eq!(quiz(vec![question("the dog")]).validate(), Ok(()));
    }

    #[test]
    fn empty_steps_are_structurally_valid() {
        assert_eq!(quiz(Vec::new()).validate(), Ok(()));
    }

    #[test]
    fn rejects_answer_outside_options() {
        let err = quiz(vec![question("the dog"), question("the bird")])
            .validate()
            .unwrap_err();
        assert_eq!(err, ExerciseError::AnswerNotInOptions { index: 1 });
    }

    #[test]
    fn rejects_mixed_step_kinds() {
        let stage = ExerciseStep::Pyramid(PyramidStage {
            operation: PyramidOperation::Expand,
            sentence: "I eat.".into(),
            instruction: "Add an object".into(),
        });
        let err = quiz(vec![question("the dog"), stage]).validate().unwrap_err();
        assert_eq!(err, ExerciseError::KindMismatch { index: 1 });
    }

    #[test]
    fn rejects_blank_title() {
        let mut exercise = quiz(vec![question("the dog")]);
        exercise.title = "  ".into();
        assert_eq!(exercise.validate(), Err(ExerciseError::EmptyTitle));
    }

    #[test]
    fn decodes_tagged_steps() {
        let json = r#"{
            "id": 9,
            "kind": "pyramid",
            "title": "Sentences",
            "steps": [
                { "type": "pyramid", "operation": "shrink", "sentence": "The big red car stopped.", "instruction": "Remove adjectives" }
            ]
        }"#;
        let exercise: Exercise = serde_json::from_str(json).unwrap();
        assert_eq!(exercise.kind, ExerciseKind::Pyramid);
        assert_eq!(exercise.step_count(), 1);
        assert!(matches!(
            exercise.step(0),
            Some(ExerciseStep::Pyramid(PyramidStage { operation: PyramidOperation::Shrink, .. }))
        ));
    }

    #[test]
    fn answer_encodes_with_type_tag() {
        let json = serde_json::to_value(StepAnswer::Choice("the dog".into())).unwrap();
        assert_eq!(json["type"], "choice");
        assert_eq!(json["value"], "the dog");
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!(ExerciseKind::parse("Quiz"), Some(ExerciseKind::Quiz));
        assert_eq!(ExerciseKind::parse("pyramid "), Some(ExerciseKind::Pyramid));
        assert_eq!(ExerciseKind::parse("email"), None);
    }
}
