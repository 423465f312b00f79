#![allow(dead_code)]

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, TimeZone, Utc};

use acadex_server::{
    app_state::AppState,
    clock::ManualClock,
    config::Config,
    models::{
        domain::{Course, Principal},
        dto::request::{CreateCourseRequest, CreateQuizRequest, QuestionInput, QuestionOptionInput},
    },
};

pub struct World {
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub lecturer: Principal,
    pub student: Principal,
    pub course: Course,
    pub t0: DateTime<Utc>,
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
}

pub fn question(id: &str, weight: i32) -> QuestionInput {
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

pub fn quiz_request(
    course_id: &str,
    opens_at: DateTime<Utc>,
    closes_at: DateTime<Utc>,
    questions: Vec<QuestionInput>,
) -> CreateQuizRequest {
    CreateQuizRequest {
        course_id: course_id.to_string(),
        title: "Week 3 Quiz".to_string(),
        instructions: String::new(),
        questions,
        opens_at,
        closes_at,
        time_limit_minutes: None,
        is_active: None,
    }
}

pub fn answers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(q, o)| (q.to_string(), o.to_string()))
        .collect()
}

/// A lecturer with one course and one enrolled student, clock at T0 - 10min.
pub async fn world() -> World {
    let t0 = t0();
    let clock = Arc::new(ManualClock::new(t0 - chrono::Duration::minutes(10)));
    let state = AppState::in_memory(Config::test_config(), clock.clone());

    let lecturer = Principal::lecturer("lecturer-1");
    let student = Principal::student("student-1");

    let course = state
        .course_service
        .create_course(
            &lecturer,
            CreateCourseRequest {
                code: "CSC301".to_string(),
                title: "Algorithms".to_string(),
                description: Some("Design and analysis".to_string()),
            },
        )
        .await
        .expect("create course");

    state
        .course_service
        .enroll(&student, &course.id)
        .await
        .expect("enroll student");

    World {
        state,
        clock,
        lecturer,
        student,
        course,
        t0,
    }
}
