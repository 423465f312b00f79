use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Lecturer,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Lecturer => "lecturer",
            UserRole::Admin => "admin",
        }
    }
}

/// A stored account. `login_id` is the matric number for students and the
/// staff id for lecturers and admins.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub login_id: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        first_name: &str,
        last_name: &str,
        email: Option<&str>,
        role: UserRole,
        login_id: &str,
        password_hash: &str,
    ) -> Self {
        User {
            id: Uuid::new_v4().to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.map(str::to_string),
            role,
            login_id: login_id.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn principal(&self) -> Principal {
        Principal::new(&self.id, self.role)
    }
}

/// The authenticated caller every service operation is evaluated against.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Principal {
    pub id: String,
    pub role: UserRole,
}

impl Principal {
    pub fn new(id: &str, role: UserRole) -> Self {
        Self {
            id: id.to_string(),
            role,
        }
    }

    pub fn student(id: &str) -> Self {
        Self::new(id, UserRole::Student)
    }

    pub fn lecturer(id: &str) -> Self {
        Self::new(id, UserRole::Lecturer)
    }

    pub fn admin(id: &str) -> Self {
        Self::new(id, UserRole::Admin)
    }

    pub fn is_student(&self) -> bool {
        self.role == UserRole::Student
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
