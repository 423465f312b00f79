use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Course {
    pub id: String,
    pub lecturer_id: String,
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub enrollment_open: bool,
    pub created_at: DateTime<Utc>,
}

impl Course {
    pub fn new(lecturer_id: &str, code: &str, title: &str, description: Option<&str>) -> Self {
        Course {
            id: Uuid::new_v4().to_string(),
            lecturer_id: lecturer_id.to_string(),
            code: code.trim().to_uppercase(),
            title: title.trim().to_string(),
            description: description.map(str::to_string),
            enrollment_open: true,
            created_at: Utc::now(),
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.lecturer_id == user_id
    }

    /// Case-insensitive match on title or code.
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.title.to_lowercase().contains(&query)
            || self.code.to_lowercase().contains(&query)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Enrollment {
    pub id: String,
    pub course_id: String,
    pub student_id: String,
    pub enrolled_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn new(course_id: &str, student_id: &str, enrolled_at: DateTime<Utc>) -> Self {
        Enrollment {
            id: Uuid::new_v4().to_string(),
            course_id: course_id.to_string(),
            student_id: student_id.to_string(),
            enrolled_at,
        }
    }

    pub fn chronological(a: &Enrollment, b: &Enrollment) -> Ordering {
        a.enrolled_at.cmp(&b.enrolled_at).then_with(|| a.id.cmp(&b.id))
    }
}
