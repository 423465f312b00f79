use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::{Database, QUIZZES_COLLECTION},
    errors::{AppError, AppResult},
    models::domain::Quiz,
};

#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn create(&self, quiz: Quiz) -> AppResult<Quiz>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>>;
    async fn list_all(&self) -> AppResult<Vec<Quiz>>;
    async fn list_by_courses(&self, course_ids: &[String]) -> AppResult<Vec<Quiz>>;
    /// Replaces the quiz only while it is unlocked. Returns `false` when the
    /// stored quiz is locked.
    async fn update_unlocked(&self, quiz: Quiz) -> AppResult<bool>;
    /// Marks the quiz as having attempts. Idempotent.
    async fn lock(&self, id: &str) -> AppResult<()>;
    /// Toggles visibility regardless of the lock.
    async fn set_active(&self, id: &str, active: bool) -> AppResult<()>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoQuizRepository {
    collection: Collection<Quiz>,
}

impl MongoQuizRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(QUIZZES_COLLECTION);
        Self { collection }
    }
}

#[async_trait]
impl QuizRepository for MongoQuizRepository {
    async fn create(&self, quiz: Quiz) -> AppResult<Quiz> {
        self.collection.insert_one(&quiz).await?;
        Ok(quiz)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        let quiz = self.collection.find_one(doc! { "id": id }).await?;
        Ok(quiz)
    }

    async fn list_all(&self) -> AppResult<Vec<Quiz>> {
        let mut quizzes: Vec<Quiz> = self.collection.find(doc! {}).await?.try_collect().await?;
        quizzes.sort_by(Quiz::schedule_order);
        Ok(quizzes)
    }

    async fn list_by_courses(&self, course_ids: &[String]) -> AppResult<Vec<Quiz>> {
        if course_ids.is_empty() {
            return Ok(vec![]);
        }

        // Timestamps are stored as text, so ordering happens after the fetch.
        let mut quizzes: Vec<Quiz> = self
            .collection
            .find(doc! { "course_id": { "$in": course_ids.to_vec() } })
            .await?
            .try_collect()
            .await?;
        quizzes.sort_by(Quiz::schedule_order);
        Ok(quizzes)
    }

    async fn update_unlocked(&self, quiz: Quiz) -> AppResult<bool> {
        let result = self
            .collection
            .replace_one(doc! { "id": &quiz.id, "locked": false }, &quiz)
            .await?;

        if result.matched_count == 0 {
            let exists = self.collection.find_one(doc! { "id": &quiz.id }).await?;
            if exists.is_none() {
                return Err(AppError::NotFound(format!(
                    "Quiz with id '{}' not found",
                    quiz.id
                )));
            }
            return Ok(false);
        }

        Ok(true)
    }

    async fn lock(&self, id: &str) -> AppResult<()> {
        let result = self
            .collection
            .update_one(doc! { "id": id }, doc! { "$set": { "locked": true } })
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("Quiz with id '{}' not found", id)));
        }
        Ok(())
    }

    async fn set_active(&self, id: &str, active: bool) -> AppResult<()> {
        let result = self
            .collection
            .update_one(doc! { "id": id }, doc! { "$set": { "is_active": active } })
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("Quiz with id '{}' not found", id)));
        }
        Ok(())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quizzes collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let course_index = IndexModel::builder()
            .keys(doc! { "course_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("course_id".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(course_index).await?;

        log::info!("Successfully created indexes for quizzes collection");
        Ok(())
    }
}
