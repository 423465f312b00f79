pub mod fixtures {
    use chrono::{DateTime, Utc};

    use crate::models::{
        domain::{Quiz, QuizQuestion},
        dto::request::{CreateQuizRequest, QuestionInput, QuestionOptionInput},
    };

    /// Two options, "A" (first) and "B" (second). "B" is correct.
    pub fn question_input(id: &str, weight: i32) -> QuestionInput {
        QuestionInput {
            id: id.to_string(),
            prompt: format!("Question {}", id),
            options: vec![
                QuestionOptionInput {
                    id: "A".to_string(),
                    text: "first".to_string(),
                },
                QuestionOptionInput {
                    id: "B".to_string(),
                    text: "second".to_string(),
                },
            ],
            correct_option_id: "B".to_string(),
            weight,
        }
    }

    /// Three questions, q1..q3, weighted 1, 2 and 3.
    pub fn quiz_request(
        course_id: &str,
        opens_at: DateTime<Utc>,
        closes_at: DateTime<Utc>,
    ) -> CreateQuizRequest {
        CreateQuizRequest {
            course_id: course_id.to_string(),
            title: "Weekly Quiz".to_string(),
            instructions: "Pick one option per question".to_string(),
            questions: vec![
                question_input("q1", 1),
                question_input("q2", 2),
                question_input("q3", 3),
            ],
            opens_at,
            closes_at,
            time_limit_minutes: None,
            is_active: None,
        }
    }

    pub fn quiz(course_id: &str, opens_at: DateTime<Utc>, closes_at: DateTime<Utc>) -> Quiz {
        let request = quiz_request(course_id, opens_at, closes_at);
        let questions: Vec<QuizQuestion> = request.questions.into_iter().map(Into::into).collect();

        Quiz::new(
            course_id,
            &request.title,
            &request.instructions,
            questions,
            opens_at,
            closes_at,
            None,
            opens_at,
        )
    }
}

pub mod test_helpers {
    use actix_web::http::StatusCode;

    /// Asserts that a status code represents an error (4xx or 5xx)
    pub fn assert_error_status(status: StatusCode) {
        assert!(
            status.is_client_error() || status.is_server_error(),
            "Expected error status, got: {}",
            status
        );
    }

    /// Asserts that a status code represents success (2xx)
    pub fn assert_success_status(status: StatusCode) {
        assert!(
            status.is_success(),
            "Expected success status, got: {}",
            status
        );
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_fixture_quiz_is_valid() {
        let now = Utc::now();
        let quiz = quiz("course-1", now, now + Duration::hours(1));

        assert!(quiz.validate().is_ok());
        assert_eq!(quiz.max_score(), 6);
        assert_eq!(quiz.questions.len(), 3);
    }
}
