use std::{cmp::Ordering, collections::HashSet};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    models::domain::question::QuizQuestion,
};

/// One week.
pub const MAX_TIME_LIMIT_MINUTES: i64 = 7 * 24 * 60;
pub const MAX_QUESTIONS: usize = 200;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Quiz {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub instructions: String,
    pub questions: Vec<QuizQuestion>,
    /// Attempts may start in `[opens_at, closes_at)`.
    pub opens_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
    pub time_limit_minutes: Option<i64>,
    /// Set on the first attempt; a locked quiz can no longer be edited.
    pub locked: bool,
    /// Inactive quizzes are hidden from students and cannot be started.
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleState {
    NotYetOpen,
    Open,
    Closed,
}

impl Quiz {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        course_id: &str,
        title: &str,
        instructions: &str,
        questions: Vec<QuizQuestion>,
        opens_at: DateTime<Utc>,
        closes_at: DateTime<Utc>,
        time_limit_minutes: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        Quiz {
            id: Uuid::new_v4().to_string(),
            course_id: course_id.to_string(),
            title: title.trim().to_string(),
            instructions: instructions.to_string(),
            questions,
            opens_at,
            closes_at,
            time_limit_minutes,
            locked: false,
            is_active: true,
            created_at: now,
            modified_at: now,
        }
    }

    /// Listing order: by opening time, ties broken by id.
    pub fn schedule_order(a: &Quiz, b: &Quiz) -> Ordering {
        a.opens_at.cmp(&b.opens_at).then_with(|| a.id.cmp(&b.id))
    }

    /// Saturates instead of overflowing; `validate` keeps real quizzes far
    /// below the bound.
    pub fn max_score(&self) -> i32 {
        self.questions
            .iter()
            .fold(0i32, |total, q| total.saturating_add(q.weight))
    }

    pub fn schedule_state(&self, now: DateTime<Utc>) -> ScheduleState {
        if now < self.opens_at {
            ScheduleState::NotYetOpen
        } else if now >= self.closes_at {
            ScheduleState::Closed
        } else {
            ScheduleState::Open
        }
    }

    /// The instant an attempt started at `started_at` must be submitted by.
    pub fn deadline_for(&self, started_at: DateTime<Utc>) -> DateTime<Utc> {
        self.time_limit_minutes
            .and_then(TimeDelta::try_minutes)
            .and_then(|limit| started_at.checked_add_signed(limit))
            .map_or(self.closes_at, |deadline| deadline.min(self.closes_at))
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.title.is_empty() {
            return Err(AppError::ValidationError(
                "Quiz title must not be empty".to_string(),
            ));
        }

        if self.opens_at >= self.closes_at {
            return Err(AppError::ValidationError(
                "Quiz must open before it closes".to_string(),
            ));
        }

        if let Some(minutes) = self.time_limit_minutes {
            if !(1..=MAX_TIME_LIMIT_MINUTES).contains(&minutes) {
                return Err(AppError::ValidationError(format!(
                    "Time limit must be between 1 and {} minutes",
                    MAX_TIME_LIMIT_MINUTES
                )));
            }
        }

        if self.questions.is_empty() {
            return Err(AppError::ValidationError(
                "Quiz must contain at least one question".to_string(),
            ));
        }

        if self.questions.len() > MAX_QUESTIONS {
            return Err(AppError::ValidationError(format!(
                "Quiz may contain at most {} questions",
                MAX_QUESTIONS
            )));
        }

        let mut ids = HashSet::new();
        for question in &self.questions {
            if !ids.insert(question.id.as_str()) {
                return Err(AppError::ValidationError(format!(
                    "Duplicate question id '{}'",
                    question.id
                )));
            }
            question.validate()?;
        }

        let total = self
            .questions
            .iter()
            .try_fold(0i32, |total, q| total.checked_add(q.weight));
        if total.is_none() {
            return Err(AppError::ValidationError(
                "Total question weight is too large".to_string(),
            ));
        }

        Ok(())
    }
}
