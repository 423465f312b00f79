pub mod attempt_repository;
pub mod course_repository;
pub mod memory;
pub mod quiz_repository;
pub mod user_repository;

pub use attempt_repository::{AttemptRepository, MongoAttemptRepository};
pub use course_repository::{
    CourseRepository, EnrollmentRepository, MongoCourseRepository, MongoEnrollmentRepository,
};
pub use memory::{
    InMemoryAttemptRepository, InMemoryCourseRepository, InMemoryEnrollmentRepository,
    InMemoryQuizRepository, InMemoryUserRepository,
};
pub use quiz_repository::{MongoQuizRepository, QuizRepository};
pub use user_repository::{MongoUserRepository, UserRepository};

use std::sync::Arc;

use crate::{db::Database, errors::AppResult};

/// One handle per collection, shared by every service.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub courses: Arc<dyn CourseRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Repositories {
    pub fn mongo(db: &Database) -> Self {
        Self {
            users: Arc::new(MongoUserRepository::new(db)),
            courses: Arc::new(MongoCourseRepository::new(db)),
            enrollments: Arc::new(MongoEnrollmentRepository::new(db)),
            quizzes: Arc::new(MongoQuizRepository::new(db)),
            attempts: Arc::new(MongoAttemptRepository::new(db)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            courses: Arc::new(InMemoryCourseRepository::new()),
            enrollments: Arc::new(InMemoryEnrollmentRepository::new()),
            quizzes: Arc::new(InMemoryQuizRepository::new()),
            attempts: Arc::new(InMemoryAttemptRepository::new()),
        }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        self.users.ensure_indexes().await?;
        self.courses.ensure_indexes().await?;
        self.enrollments.ensure_indexes().await?;
        self.quizzes.ensure_indexes().await?;
        self.attempts.ensure_indexes().await?;
        Ok(())
    }
}
