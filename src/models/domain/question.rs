use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

pub const MAX_QUESTION_WEIGHT: i32 = 1000;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuizQuestion {
    pub id: String,
    pub prompt: String,
    pub options: Vec<QuizQuestionOption>,
    /// Exactly one option is correct; there is no partial credit.
    pub correct_option_id: String,
    pub weight: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuizQuestionOption {
    pub id: String,
    pub text: String,
}

impl QuizQuestion {
    pub fn is_correct(&self, option_id: &str) -> bool {
        self.correct_option_id == option_id
    }

    pub fn option_text(&self, option_id: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.id == option_id)
            .map(|o| o.text.as_str())
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.prompt.trim().is_empty() {
            return Err(AppError::ValidationError(format!(
                "Question '{}' has an empty prompt",
                self.id
            )));
        }

        if !(1..=MAX_QUESTION_WEIGHT).contains(&self.weight) {
            return Err(AppError::ValidationError(format!(
                "Question '{}' must have a weight between 1 and {}, got {}",
                self.id, MAX_QUESTION_WEIGHT, self.weight
            )));
        }

        if self.options.len() < 2 {
            return Err(AppError::ValidationError(format!(
                "Question '{}' needs at least two options",
                self.id
            )));
        }

        let mut seen = HashSet::new();
        for option in &self.options {
            if !seen.insert(option.id.as_str()) {
                return Err(AppError::ValidationError(format!(
                    "Question '{}' has duplicate option id '{}'",
                    self.id, option.id
                )));
            }
        }

        if !seen.contains(self.correct_option_id.as_str()) {
            return Err(AppError::ValidationError(format!(
                "Question '{}' marks unknown option '{}' as correct",
                self.id, self.correct_option_id
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(weight: i32, correct: &str) -> QuizQuestion {
        QuizQuestion {
            id: "q1".to_string(),
            prompt: "What is the capital of Nigeria?".to_string(),
            options: vec![
                QuizQuestionOption {
                    id: "A".to_string(),
                    text: "Lagos".to_string(),
                },
                QuizQuestionOption {
                    id: "B".to_string(),
                    text: "Abuja".to_string(),
                },
            ],
            correct_option_id: correct.to_string(),
            weight,
        }
    }

    #[test]
    fn valid_question_passes() {
        let q = question(2, "B");
        assert!(q.validate().is_ok());
        assert!(q.is_correct("B"));
        assert!(!q.is_correct("A"));
        assert_eq!(q.option_text("B"), Some("Abuja"));
        assert_eq!(q.option_text("Z"), None);
    }

    #[test]
    fn non_positive_weight_is_rejected() {
        for weight in [0, -3] {
            let err = question(weight, "B").validate().unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)));
        }
    }

    #[test]
    fn unknown_correct_option_is_rejected() {
        let err = question(1, "C").validate().unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn duplicate_option_ids_are_rejected() {
        let mut q = question(1, "A");
        q.options[1].id = "A".to_string();
        assert!(matches!(q.validate(), Err(AppError::ValidationError(_))));
    }
}
