use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::models::domain::{QuizQuestion, QuizQuestionOption};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterStudentRequest {
    #[validate(length(min = 3, max = 15))]
    pub matric_number: String,

    #[validate(length(min = 1, max = 30))]
    pub first_name: String,

    #[validate(length(min = 1, max = 30))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterLecturerRequest {
    #[validate(length(min = 3, max = 15))]
    pub staff_id: String,

    #[validate(length(min = 1, max = 30))]
    pub first_name: String,

    #[validate(length(min = 1, max = 30))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// `username` is a matric number or a staff id.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 15))]
    pub username: String,

    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(min = 2, max = 10))]
    pub code: String,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateCourseRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub enrollment_open: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseSearchParams {
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct QuestionOptionInput {
    #[validate(length(min = 1, max = 64))]
    pub id: String,

    #[validate(length(min = 1, max = 500))]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct QuestionInput {
    #[validate(length(min = 1, max = 64))]
    pub id: String,

    #[validate(length(min = 1, max = 1000))]
    pub prompt: String,

    #[validate(nested)]
    pub options: Vec<QuestionOptionInput>,

    #[validate(length(min = 1, max = 64))]
    pub correct_option_id: String,

    #[validate(range(min = 1, max = 1000))]
    pub weight: i32,
}

impl From<QuestionInput> for QuizQuestion {
    fn from(input: QuestionInput) -> Self {
        QuizQuestion {
            id: input.id,
            prompt: input.prompt,
            options: input
                .options
                .into_iter()
                .map(|o| QuizQuestionOption {
                    id: o.id,
                    text: o.text,
                })
                .collect(),
            correct_option_id: input.correct_option_id,
            weight: input.weight,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuizRequest {
    pub course_id: String,

    #[validate(length(min = 1, max = 255))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 5000))]
    pub instructions: String,

    #[validate(length(min = 1, max = 200), nested)]
    pub questions: Vec<QuestionInput>,

    pub opens_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,

    #[validate(range(min = 1, max = 10080))]
    pub time_limit_minutes: Option<i64>,

    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,

    #[validate(length(max = 5000))]
    pub instructions: Option<String>,

    #[validate(length(min = 1, max = 200), nested)]
    pub questions: Option<Vec<QuestionInput>>,

    pub opens_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,

    /// `null` removes the limit.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub time_limit_minutes: Option<Option<i64>>,

    pub is_active: Option<bool>,
}

impl UpdateQuizRequest {
    /// True when the request only toggles visibility.
    pub fn only_sets_active(&self) -> bool {
        self.is_active.is_some()
            && self.title.is_none()
            && self.instructions.is_none()
            && self.questions.is_none()
            && self.opens_at.is_none()
            && self.closes_at.is_none()
            && self.time_limit_minutes.is_none()
    }
}

/// Keeps an explicit `null` apart from an absent field.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuizListParams {
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitAnswersRequest {
    /// Question id to chosen option id.
    pub answers: BTreeMap<String, String>,
}
