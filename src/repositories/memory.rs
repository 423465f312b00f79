//! In-process store backing the `memory` storage backend and the test suite.
//! Every operation holds the collection's lock for its whole
//! check-then-write, which gives the same uniqueness guarantees as the
//! MongoDB indexes.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{AttemptStatus, Course, Enrollment, Quiz, QuizAttempt, User},
    repositories::{
        AttemptRepository, CourseRepository, EnrollmentRepository, QuizRepository, UserRepository,
    },
};

#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.login_id == user.login_id) {
            return Err(AppError::AlreadyExists(format!(
                "User with login id '{}' already exists",
                user.login_id
            )));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(id).cloned())
    }

    async fn find_by_login_id(&self, login_id: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.login_id == login_id).cloned())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryCourseRepository {
    courses: Arc<RwLock<HashMap<String, Course>>>,
}

impl InMemoryCourseRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn sorted<F>(&self, filter: F) -> Vec<Course>
    where
        F: Fn(&Course) -> bool,
    {
        let courses = self.courses.read().await;
        let mut items: Vec<_> = courses.values().filter(|c| filter(c)).cloned().collect();
        items.sort_by(|a, b| a.code.cmp(&b.code).then_with(|| a.id.cmp(&b.id)));
        items
    }
}

#[async_trait]
impl CourseRepository for InMemoryCourseRepository {
    async fn create(&self, course: Course) -> AppResult<Course> {
        let mut courses = self.courses.write().await;
        let duplicate = courses
            .values()
            .any(|c| c.lecturer_id == course.lecturer_id && c.code == course.code);
        if duplicate {
            return Err(AppError::AlreadyExists(format!(
                "You already have a course with code '{}'",
                course.code
            )));
        }
        courses.insert(course.id.clone(), course.clone());
        Ok(course)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Course>> {
        let courses = self.courses.read().await;
        Ok(courses.get(id).cloned())
    }

    async fn update(&self, course: Course) -> AppResult<Course> {
        let mut courses = self.courses.write().await;
        let stored = courses
            .get_mut(&course.id)
            .ok_or_else(|| AppError::NotFound(format!("Course with id '{}' not found", course.id)))?;
        *stored = course.clone();
        Ok(course)
    }

    async fn list_all(&self) -> AppResult<Vec<Course>> {
        Ok(self.sorted(|_| true).await)
    }

    async fn list_by_lecturer(&self, lecturer_id: &str) -> AppResult<Vec<Course>> {
        Ok(self.sorted(|c| c.lecturer_id == lecturer_id).await)
    }

    async fn list_open(&self) -> AppResult<Vec<Course>> {
        Ok(self.sorted(|c| c.enrollment_open).await)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryEnrollmentRepository {
    enrollments: Arc<RwLock<Vec<Enrollment>>>,
}

impl InMemoryEnrollmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryEnrollmentRepository {
    async fn create(&self, enrollment: Enrollment) -> AppResult<Enrollment> {
        let mut enrollments = self.enrollments.write().await;
        let duplicate = enrollments
            .iter()
            .any(|e| e.course_id == enrollment.course_id && e.student_id == enrollment.student_id);
        if duplicate {
            return Err(AppError::AlreadyEnrolled(format!(
                "Student is already enrolled in course '{}'",
                enrollment.course_id
            )));
        }
        enrollments.push(enrollment.clone());
        Ok(enrollment)
    }

    async fn is_enrolled(&self, course_id: &str, student_id: &str) -> AppResult<bool> {
        let enrollments = self.enrollments.read().await;
        Ok(enrollments
            .iter()
            .any(|e| e.course_id == course_id && e.student_id == student_id))
    }

    async fn list_by_course(&self, course_id: &str) -> AppResult<Vec<Enrollment>> {
        let enrollments = self.enrollments.read().await;
        let mut items: Vec<_> = enrollments
            .iter()
            .filter(|e| e.course_id == course_id)
            .cloned()
            .collect();
        items.sort_by(Enrollment::chronological);
        Ok(items)
    }

    async fn list_by_student(&self, student_id: &str) -> AppResult<Vec<Enrollment>> {
        let enrollments = self.enrollments.read().await;
        let mut items: Vec<_> = enrollments
            .iter()
            .filter(|e| e.student_id == student_id)
            .cloned()
            .collect();
        items.sort_by(Enrollment::chronological);
        Ok(items)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryQuizRepository {
    quizzes: Arc<RwLock<HashMap<String, Quiz>>>,
}

impl InMemoryQuizRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuizRepository for InMemoryQuizRepository {
    async fn create(&self, quiz: Quiz) -> AppResult<Quiz> {
        let mut quizzes = self.quizzes.write().await;
        if quizzes.contains_key(&quiz.id) {
            return Err(AppError::AlreadyExists(format!(
                "Quiz with id '{}' already exists",
                quiz.id
            )));
        }
        quizzes.insert(quiz.id.clone(), quiz.clone());
        Ok(quiz)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        let quizzes = self.quizzes.read().await;
        Ok(quizzes.get(id).cloned())
    }

    async fn list_all(&self) -> AppResult<Vec<Quiz>> {
        let quizzes = self.quizzes.read().await;
        let mut items: Vec<_> = quizzes.values().cloned().collect();
        items.sort_by(Quiz::schedule_order);
        Ok(items)
    }

    async fn list_by_courses(&self, course_ids: &[String]) -> AppResult<Vec<Quiz>> {
        let quizzes = self.quizzes.read().await;
        let mut items: Vec<_> = quizzes
            .values()
            .filter(|q| course_ids.contains(&q.course_id))
            .cloned()
            .collect();
        items.sort_by(Quiz::schedule_order);
        Ok(items)
    }

    async fn update_unlocked(&self, quiz: Quiz) -> AppResult<bool> {
        let mut quizzes = self.quizzes.write().await;
        let stored = quizzes
            .get(&quiz.id)
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", quiz.id)))?;

        if stored.locked {
            return Ok(false);
        }

        quizzes.insert(quiz.id.clone(), quiz);
        Ok(true)
    }

    async fn lock(&self, id: &str) -> AppResult<()> {
        let mut quizzes = self.quizzes.write().await;
        let quiz = quizzes
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", id)))?;
        quiz.locked = true;
        Ok(())
    }

    async fn set_active(&self, id: &str, active: bool) -> AppResult<()> {
        let mut quizzes = self.quizzes.write().await;
        let quiz = quizzes
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", id)))?;
        quiz.is_active = active;
        Ok(())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAttemptRepository {
    attempts: Arc<RwLock<HashMap<String, QuizAttempt>>>,
}

impl InMemoryAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn sorted<F>(&self, filter: F) -> Vec<QuizAttempt>
    where
        F: Fn(&QuizAttempt) -> bool,
    {
        let attempts = self.attempts.read().await;
        let mut items: Vec<_> = attempts.values().filter(|a| filter(a)).cloned().collect();
        items.sort_by(QuizAttempt::chronological);
        items
    }

    async fn transition<F>(&self, id: &str, apply: F) -> Option<QuizAttempt>
    where
        F: FnOnce(&mut QuizAttempt),
    {
        let mut attempts = self.attempts.write().await;
        let attempt = attempts.get_mut(id)?;
        if attempt.status != AttemptStatus::InProgress {
            return None;
        }
        apply(attempt);
        Some(attempt.clone())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryAttemptRepository {
    async fn insert_active(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        let mut attempts = self.attempts.write().await;
        let conflict = attempts.values().any(|a| {
            a.active && a.quiz_id == attempt.quiz_id && a.student_id == attempt.student_id
        });
        if conflict {
            return Err(AppError::AlreadyAttempted(format!(
                "Student has already attempted quiz '{}'",
                attempt.quiz_id
            )));
        }
        attempts.insert(attempt.id.clone(), attempt.clone());
        Ok(attempt)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts.get(id).cloned())
    }

    async fn find_active(&self, quiz_id: &str, student_id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .values()
            .find(|a| a.active && a.quiz_id == quiz_id && a.student_id == student_id)
            .cloned())
    }

    async fn submit(
        &self,
        id: &str,
        answers: BTreeMap<String, String>,
        score: i32,
        submitted_at: DateTime<Utc>,
    ) -> AppResult<Option<QuizAttempt>> {
        Ok(self
            .transition(id, |a| a.mark_submitted(answers, score, submitted_at))
            .await)
    }

    async fn expire(&self, id: &str) -> AppResult<Option<QuizAttempt>> {
        Ok(self.transition(id, QuizAttempt::mark_expired).await)
    }

    async fn list_by_quiz(&self, quiz_id: &str) -> AppResult<Vec<QuizAttempt>> {
        Ok(self.sorted(|a| a.quiz_id == quiz_id).await)
    }

    async fn list_by_student(&self, student_id: &str) -> AppResult<Vec<QuizAttempt>> {
        Ok(self.sorted(|a| a.student_id == student_id).await)
    }

    async fn list_submitted_by_course(&self, course_id: &str) -> AppResult<Vec<QuizAttempt>> {
        Ok(self
            .sorted(|a| a.course_id == course_id && a.status == AttemptStatus::Submitted)
            .await)
    }

    async fn count_by_quiz(&self, quiz_id: &str) -> AppResult<u64> {
        let attempts = self.attempts.read().await;
        Ok(attempts.values().filter(|a| a.quiz_id == quiz_id).count() as u64)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}
