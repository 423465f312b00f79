use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::domain::{
    AttemptStatus, Quiz, QuizAttempt, QuizQuestion, QuizQuestionOption, User, UserRole,
};

#[derive(Debug, Clone, Serialize)]
pub struct UserDto {
    pub id: String,
    pub login_id: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        UserDto {
            full_name: user.full_name(),
            id: user.id,
            login_id: user.login_id,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub user: UserDto,
}

/// A question as shown to a student: the correct option is withheld.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicQuestion {
    pub id: String,
    pub prompt: String,
    pub options: Vec<QuizQuestionOption>,
    pub weight: i32,
}

impl From<&QuizQuestion> for PublicQuestion {
    fn from(question: &QuizQuestion) -> Self {
        PublicQuestion {
            id: question.id.clone(),
            prompt: question.prompt.clone(),
            options: question.options.clone(),
            weight: question.weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicQuiz {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub instructions: String,
    pub opens_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
    pub time_limit_minutes: Option<i64>,
    pub max_score: i32,
    pub questions: Vec<PublicQuestion>,
}

impl From<&Quiz> for PublicQuiz {
    fn from(quiz: &Quiz) -> Self {
        PublicQuiz {
            id: quiz.id.clone(),
            course_id: quiz.course_id.clone(),
            title: quiz.title.clone(),
            instructions: quiz.instructions.clone(),
            opens_at: quiz.opens_at,
            closes_at: quiz.closes_at,
            time_limit_minutes: quiz.time_limit_minutes,
            max_score: quiz.max_score(),
            questions: quiz.questions.iter().map(PublicQuestion::from).collect(),
        }
    }
}

/// Owners and admins see the full quiz; students see the public view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QuizView {
    Full(Quiz),
    Public(PublicQuiz),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizListItem {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub opens_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
    pub question_count: usize,
    pub max_score: i32,
    pub locked: bool,
    pub is_active: bool,
}

impl From<&Quiz> for QuizListItem {
    fn from(quiz: &Quiz) -> Self {
        QuizListItem {
            id: quiz.id.clone(),
            course_id: quiz.course_id.clone(),
            title: quiz.title.clone(),
            opens_at: quiz.opens_at,
            closes_at: quiz.closes_at,
            question_count: quiz.questions.len(),
            max_score: quiz.max_score(),
            locked: quiz.locked,
            is_active: quiz.is_active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartAttemptResponse {
    pub attempt_id: String,
    pub quiz_id: String,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub max_score: i32,
    pub questions: Vec<PublicQuestion>,
}

impl StartAttemptResponse {
    pub fn new(attempt: &QuizAttempt, quiz: &Quiz) -> Self {
        StartAttemptResponse {
            attempt_id: attempt.id.clone(),
            quiz_id: attempt.quiz_id.clone(),
            status: attempt.status,
            started_at: attempt.started_at,
            deadline: attempt.deadline,
            max_score: attempt.max_score,
            questions: quiz.questions.iter().map(PublicQuestion::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionFeedback {
    pub question_id: String,
    pub prompt: String,
    pub selected_option_id: Option<String>,
    pub selected_option_text: Option<String>,
    pub correct_option_id: String,
    pub correct_option_text: Option<String>,
    pub is_correct: bool,
    pub points_earned: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionResult {
    pub attempt_id: String,
    pub quiz_id: String,
    pub status: AttemptStatus,
    pub score: i32,
    pub max_score: i32,
    pub submitted_at: DateTime<Utc>,
    pub feedback: Vec<QuestionFeedback>,
}
