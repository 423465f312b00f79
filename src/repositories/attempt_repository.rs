use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson},
    options::{IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use crate::{
    db::{is_duplicate_key_error, Database, ATTEMPTS_COLLECTION},
    errors::{AppError, AppResult},
    models::domain::{AttemptStatus, QuizAttempt},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Atomic check-and-insert. A second active attempt for the same
    /// (quiz, student) fails with `AlreadyAttempted`.
    async fn insert_active(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>>;
    async fn find_active(&self, quiz_id: &str, student_id: &str) -> AppResult<Option<QuizAttempt>>;
    /// InProgress -> Submitted in one conditional write. Returns `None` when
    /// the attempt is no longer in progress.
    async fn submit(
        &self,
        id: &str,
        answers: BTreeMap<String, String>,
        score: i32,
        submitted_at: DateTime<Utc>,
    ) -> AppResult<Option<QuizAttempt>>;
    /// InProgress -> Expired in one conditional write. Returns `None` when
    /// the attempt is no longer in progress.
    async fn expire(&self, id: &str) -> AppResult<Option<QuizAttempt>>;
    async fn list_by_quiz(&self, quiz_id: &str) -> AppResult<Vec<QuizAttempt>>;
    async fn list_by_student(&self, student_id: &str) -> AppResult<Vec<QuizAttempt>>;
    async fn list_submitted_by_course(&self, course_id: &str) -> AppResult<Vec<QuizAttempt>>;
    async fn count_by_quiz(&self, quiz_id: &str) -> AppResult<u64>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoAttemptRepository {
    collection: Collection<QuizAttempt>,
}

impl MongoAttemptRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(ATTEMPTS_COLLECTION);
        Self { collection }
    }
}

#[async_trait]
impl AttemptRepository for MongoAttemptRepository {
    async fn insert_active(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        match self.collection.insert_one(&attempt).await {
            Ok(_) => Ok(attempt),
            Err(e) if is_duplicate_key_error(&e) => Err(AppError::AlreadyAttempted(format!(
                "Student has already attempted quiz '{}'",
                attempt.quiz_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempt = self.collection.find_one(doc! { "id": id }).await?;
        Ok(attempt)
    }

    async fn find_active(&self, quiz_id: &str, student_id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempt = self
            .collection
            .find_one(doc! {
                "quiz_id": quiz_id,
                "student_id": student_id,
                "active": true
            })
            .await?;
        Ok(attempt)
    }

    async fn submit(
        &self,
        id: &str,
        answers: BTreeMap<String, String>,
        score: i32,
        submitted_at: DateTime<Utc>,
    ) -> AppResult<Option<QuizAttempt>> {
        let update = doc! {
            "$set": {
                "answers": to_bson(&answers)?,
                "score": score,
                "submitted_at": to_bson(&submitted_at)?,
                "status": AttemptStatus::Submitted.as_str(),
            }
        };

        let attempt = self
            .collection
            .find_one_and_update(
                doc! { "id": id, "status": AttemptStatus::InProgress.as_str() },
                update,
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(attempt)
    }

    async fn expire(&self, id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempt = self
            .collection
            .find_one_and_update(
                doc! { "id": id, "status": AttemptStatus::InProgress.as_str() },
                doc! {
                    "$set": {
                        "status": AttemptStatus::Expired.as_str(),
                        "active": false,
                    }
                },
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(attempt)
    }

    async fn list_by_quiz(&self, quiz_id: &str) -> AppResult<Vec<QuizAttempt>> {
        let mut attempts: Vec<QuizAttempt> = self
            .collection
            .find(doc! { "quiz_id": quiz_id })
            .await?
            .try_collect()
            .await?;
        attempts.sort_by(QuizAttempt::chronological);
        Ok(attempts)
    }

    async fn list_by_student(&self, student_id: &str) -> AppResult<Vec<QuizAttempt>> {
        let mut attempts: Vec<QuizAttempt> = self
            .collection
            .find(doc! { "student_id": student_id })
            .await?
            .try_collect()
            .await?;
        attempts.sort_by(QuizAttempt::chronological);
        Ok(attempts)
    }

    async fn list_submitted_by_course(&self, course_id: &str) -> AppResult<Vec<QuizAttempt>> {
        let mut attempts: Vec<QuizAttempt> = self
            .collection
            .find(doc! {
                "course_id": course_id,
                "status": AttemptStatus::Submitted.as_str()
            })
            .await?
            .try_collect()
            .await?;
        attempts.sort_by(QuizAttempt::chronological);
        Ok(attempts)
    }

    async fn count_by_quiz(&self, quiz_id: &str) -> AppResult<u64> {
        let count = self
            .collection
            .count_documents(doc! { "quiz_id": quiz_id })
            .await?;
        Ok(count)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for attempts collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        // One active (in progress or submitted) attempt per student and quiz.
        let active_pair_index = IndexModel::builder()
            .keys(doc! { "quiz_id": 1, "student_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .partial_filter_expression(doc! { "active": true })
                    .name("quiz_student_active_unique".to_string())
                    .build(),
            )
            .build();

        let student_index = IndexModel::builder()
            .keys(doc! { "student_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("student_id".to_string())
                    .build(),
            )
            .build();

        let course_status_index = IndexModel::builder()
            .keys(doc! { "course_id": 1, "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("course_status".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(active_pair_index).await?;
        self.collection.create_index(student_index).await?;
        self.collection.create_index(course_status_index).await?;

        log::info!("Successfully created indexes for attempts collection");
        Ok(())
    }
}
