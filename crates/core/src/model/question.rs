use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::ids::{QuestionId, QuizId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("a question needs at least {min} options, got {got}")]
    NotEnoughOptions { min: usize, got: usize },

    #[error("option {index} has empty text")]
    EmptyOptionText { index: usize },

    #[error("a question needs exactly one correct option, got {got}")]
    WrongCorrectCount { got: usize },

    #[error("time limit must be between {min} and {max} seconds")]
    InvalidTimeLimit { min: u32, max: u32 },

    #[error("invalid image url: {0}")]
    InvalidImageUrl(String),
}

//
// ─── OPTIONS ───────────────────────────────────────────────────────────────────
//

/// Minimum number of answer options for a playable question.
pub const MIN_OPTIONS: usize = 2;

/// Answer-window bounds in seconds.
pub const MIN_TIME_LIMIT_SECS: u32 = 5;
pub const MAX_TIME_LIMIT_SECS: u32 = 600;

/// One selectable answer for a question.
///
/// Serialized as JSON when persisted, mirroring how the question bank
/// stores its option lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub text: String,
    pub correct: bool,
}

impl QuestionOption {
    #[must_use]
    pub fn new(text: impl Into<String>, correct: bool) -> Self {
        Self {
            text: text.into(),
            correct,
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single quiz question with its answer options and timing.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    id: QuestionId,
    quiz_id: QuizId,
    text: String,
    image_url: Option<Url>,
    time_limit_secs: u32,
    order_index: u32,
    options: Vec<QuestionOption>,
    created_at: DateTime<Utc>,
}

impl Question {
    /// Creates a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the text is empty, the option list is
    /// too short or has anything other than exactly one correct option, or
    /// the time limit is out of bounds.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: QuestionId,
        quiz_id: QuizId,
        text: impl Into<String>,
        image_url: Option<Url>,
        time_limit_secs: u32,
        order_index: u32,
        options: Vec<QuestionOption>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if !(MIN_TIME_LIMIT_SECS..=MAX_TIME_LIMIT_SECS).contains(&time_limit_secs) {
            return Err(QuestionError::InvalidTimeLimit {
                min: MIN_TIME_LIMIT_SECS,
                max: MAX_TIME_LIMIT_SECS,
            });
        }
        if options.len() < MIN_OPTIONS {
            return Err(QuestionError::NotEnoughOptions {
                min: MIN_OPTIONS,
                got: options.len(),
            });
        }
        for (index, option) in options.iter().enumerate() {
            if option.text.trim().is_empty() {
                return Err(QuestionError::EmptyOptionText { index });
            }
        }
        let correct = options.iter().filter(|o| o.correct).count();
        if correct != 1 {
            return Err(QuestionError::WrongCorrectCount { got: correct });
        }

        Ok(Self {
            id,
            quiz_id,
            text: text.trim().to_owned(),
            image_url,
            time_limit_secs,
            order_index,
            options,
            created_at,
        })
    }

    /// Rehydrate a question from persisted storage.
    ///
    /// Runs the same validation as `new`; a row that fails it is corrupt.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the persisted fields fail validation or
    /// the stored image URL does not parse.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: QuestionId,
        quiz_id: QuizId,
        text: String,
        image_url: Option<String>,
        time_limit_secs: u32,
        order_index: u32,
        options: Vec<QuestionOption>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuestionError> {
        let image_url = image_url
            .map(|raw| Url::parse(&raw).map_err(|_| QuestionError::InvalidImageUrl(raw)))
            .transpose()?;
        Self::new(
            id,
            quiz_id,
            text,
            image_url,
            time_limit_secs,
            order_index,
            options,
            created_at,
        )
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn image_url(&self) -> Option<&Url> {
        self.image_url.as_ref()
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    /// Answer window as a duration.
    #[must_use]
    pub fn time_limit(&self) -> Duration {
        Duration::seconds(i64::from(self.time_limit_secs))
    }

    #[must_use]
    pub fn order_index(&self) -> u32 {
        self.order_index
    }

    #[must_use]
    pub fn options(&self) -> &[QuestionOption] {
        &self.options
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Index of the single correct option.
    #[must_use]
    pub fn correct_option(&self) -> usize {
        self.options
            .iter()
            .position(|o| o.correct)
            .unwrap_or_default()
    }

    /// Whether the option at `index` is the correct one.
    ///
    /// Out-of-range indexes are simply not correct; range checking is the
    /// round machine's job.
    #[must_use]
    pub fn is_correct(&self, index: usize) -> bool {
        self.options.get(index).is_some_and(|o| o.correct)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn options() -> Vec<QuestionOption> {
        vec![
            QuestionOption::new("Berlin", true),
            QuestionOption::new("Paris", false),
            QuestionOption::new("Madrid", false),
        ]
    }

    fn build(text: &str, options: Vec<QuestionOption>, limit: u32) -> Result<Question, QuestionError> {
        Question::new(
            QuestionId::new(1),
            QuizId::new(1),
            text,
            None,
            limit,
            0,
            options,
            fixed_now(),
        )
    }

    #[test]
    fn question_happy_path() {
        let q = build("Capital of Germany?", options(), 30).unwrap();
        assert_eq!(q.text(), "Capital of Germany?");
        assert_eq!(q.option_count(), 3);
        assert_eq!(q.correct_option(), 0);
        assert!(q.is_correct(0));
        assert!(!q.is_correct(1));
        assert!(!q.is_correct(99));
        assert_eq!(q.time_limit(), Duration::seconds(30));
    }

    #[test]
    fn question_rejects_empty_text() {
        let err = build("  ", options(), 30).unwrap_err();
        assert_eq!(err, QuestionError::EmptyText);
    }

    #[test]
    fn question_rejects_single_option() {
        let err = build("Q?", vec![QuestionOption::new("only", true)], 30).unwrap_err();
        assert_eq!(err, QuestionError::NotEnoughOptions { min: 2, got: 1 });
    }

    #[test]
    fn question_rejects_zero_or_two_correct() {
        let none = vec![
            QuestionOption::new("a", false),
            QuestionOption::new("b", false),
        ];
        let err = build("Q?", none, 30).unwrap_err();
        assert_eq!(err, QuestionError::WrongCorrectCount { got: 0 });

        let both = vec![
            QuestionOption::new("a", true),
            QuestionOption::new("b", true),
        ];
        let err = build("Q?", both, 30).unwrap_err();
        assert_eq!(err, QuestionError::WrongCorrectCount { got: 2 });
    }

    #[test]
    fn question_rejects_blank_option() {
        let opts = vec![
            QuestionOption::new("a", true),
            QuestionOption::new("  ", false),
        ];
        let err = build("Q?", opts, 30).unwrap_err();
        assert_eq!(err, QuestionError::EmptyOptionText { index: 1 });
    }

    #[test]
    fn question_rejects_out_of_bounds_time_limit() {
        let err = build("Q?", options(), 2).unwrap_err();
        assert!(matches!(err, QuestionError::InvalidTimeLimit { .. }));

        let err = build("Q?", options(), 601).unwrap_err();
        assert!(matches!(err, QuestionError::InvalidTimeLimit { .. }));
    }

    #[test]
    fn from_persisted_parses_image_url() {
        let q = Question::from_persisted(
            QuestionId::new(2),
            QuizId::new(1),
            "Which logo is this?".into(),
            Some("https://example.com/logo.png".into()),
            20,
            1,
            options(),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(
            q.image_url().map(Url::as_str),
            Some("https://example.com/logo.png")
        );
    }

    #[test]
    fn from_persisted_rejects_bad_image_url() {
        let err = Question::from_persisted(
            QuestionId::new(2),
            QuizId::new(1),
            "Q?".into(),
            Some("not a url".into()),
            20,
            1,
            options(),
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, QuestionError::InvalidImageUrl(_)));
    }
}
