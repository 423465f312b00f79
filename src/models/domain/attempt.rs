use std::{cmp::Ordering, collections::BTreeMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
    Expired,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Submitted => "submitted",
            AttemptStatus::Expired => "expired",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuizAttempt {
    pub id: String,
    pub quiz_id: String,
    pub course_id: String,
    pub student_id: String,
    /// Question id to chosen option id.
    pub answers: BTreeMap<String, String>,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub score: Option<i32>,
    pub max_score: i32,
    pub status: AttemptStatus,
    /// Mirrors `status != Expired`; the store's uniqueness constraint on
    /// (quiz_id, student_id) only covers active attempts.
    pub active: bool,
}

impl QuizAttempt {
    pub fn start(
        quiz_id: &str,
        course_id: &str,
        student_id: &str,
        max_score: i32,
        started_at: DateTime<Utc>,
        deadline: DateTime<Utc>,
    ) -> Self {
        QuizAttempt {
            id: Uuid::new_v4().to_string(),
            quiz_id: quiz_id.to_string(),
            course_id: course_id.to_string(),
            student_id: student_id.to_string(),
            answers: BTreeMap::new(),
            started_at,
            deadline,
            submitted_at: None,
            score: None,
            max_score,
            status: AttemptStatus::InProgress,
            active: true,
        }
    }

    /// Listing order: by start time, ties broken by id.
    pub fn chronological(a: &QuizAttempt, b: &QuizAttempt) -> Ordering {
        a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id))
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == AttemptStatus::InProgress && now >= self.deadline
    }

    pub fn mark_expired(&mut self) {
        self.status = AttemptStatus::Expired;
        self.active = false;
    }

    pub fn mark_submitted(
        &mut self,
        answers: BTreeMap<String, String>,
        score: i32,
        submitted_at: DateTime<Utc>,
    ) {
        self.answers = answers;
        self.score = Some(score);
        self.submitted_at = Some(submitted_at);
        self.status = AttemptStatus::Submitted;
    }
}
