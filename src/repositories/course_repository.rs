use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::{is_duplicate_key_error, Database, COURSES_COLLECTION, ENROLLMENTS_COLLECTION},
    errors::{AppError, AppResult},
    models::domain::{Course, Enrollment},
};

#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the lecturer already owns the code.
    async fn create(&self, course: Course) -> AppResult<Course>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Course>>;
    /// Replaces the stored course; fails with `NotFound` when it is gone.
    async fn update(&self, course: Course) -> AppResult<Course>;
    async fn list_all(&self) -> AppResult<Vec<Course>>;
    async fn list_by_lecturer(&self, lecturer_id: &str) -> AppResult<Vec<Course>>;
    async fn list_open(&self) -> AppResult<Vec<Course>>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Check-and-insert; fails with `AlreadyEnrolled` on a duplicate pair.
    async fn create(&self, enrollment: Enrollment) -> AppResult<Enrollment>;
    async fn is_enrolled(&self, course_id: &str, student_id: &str) -> AppResult<bool>;
    async fn list_by_course(&self, course_id: &str) -> AppResult<Vec<Enrollment>>;
    async fn list_by_student(&self, student_id: &str) -> AppResult<Vec<Enrollment>>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoCourseRepository {
    collection: Collection<Course>,
}

impl MongoCourseRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(COURSES_COLLECTION);
        Self { collection }
    }
}

#[async_trait]
impl CourseRepository for MongoCourseRepository {
    async fn create(&self, course: Course) -> AppResult<Course> {
        match self.collection.insert_one(&course).await {
            Ok(_) => Ok(course),
            Err(e) if is_duplicate_key_error(&e) => Err(AppError::AlreadyExists(format!(
                "You already have a course with code '{}'",
                course.code
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Course>> {
        let course = self.collection.find_one(doc! { "id": id }).await?;
        Ok(course)
    }

    async fn update(&self, course: Course) -> AppResult<Course> {
        let result = self
            .collection
            .replace_one(doc! { "id": &course.id }, &course)
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!(
                "Course with id '{}' not found",
                course.id
            )));
        }
        Ok(course)
    }

    async fn list_all(&self) -> AppResult<Vec<Course>> {
        let courses = self
            .collection
            .find(doc! {})
            .sort(doc! { "code": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(courses)
    }

    async fn list_by_lecturer(&self, lecturer_id: &str) -> AppResult<Vec<Course>> {
        let courses = self
            .collection
            .find(doc! { "lecturer_id": lecturer_id })
            .sort(doc! { "code": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(courses)
    }

    async fn list_open(&self) -> AppResult<Vec<Course>> {
        let courses = self
            .collection
            .find(doc! { "enrollment_open": true })
            .sort(doc! { "code": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(courses)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for courses collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let code_index = IndexModel::builder()
            .keys(doc! { "lecturer_id": 1, "code": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("lecturer_code_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(code_index).await?;

        log::info!("Successfully created indexes for courses collection");
        Ok(())
    }
}

pub struct MongoEnrollmentRepository {
    collection: Collection<Enrollment>,
}

impl MongoEnrollmentRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(ENROLLMENTS_COLLECTION);
        Self { collection }
    }
}

#[async_trait]
impl EnrollmentRepository for MongoEnrollmentRepository {
    async fn create(&self, enrollment: Enrollment) -> AppResult<Enrollment> {
        match self.collection.insert_one(&enrollment).await {
            Ok(_) => Ok(enrollment),
            Err(e) if is_duplicate_key_error(&e) => Err(AppError::AlreadyEnrolled(format!(
                "Student is already enrolled in course '{}'",
                enrollment.course_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn is_enrolled(&self, course_id: &str, student_id: &str) -> AppResult<bool> {
        let enrollment = self
            .collection
            .find_one(doc! { "course_id": course_id, "student_id": student_id })
            .await?;
        Ok(enrollment.is_some())
    }

    async fn list_by_course(&self, course_id: &str) -> AppResult<Vec<Enrollment>> {
        let mut enrollments: Vec<Enrollment> = self
            .collection
            .find(doc! { "course_id": course_id })
            .await?
            .try_collect()
            .await?;
        enrollments.sort_by(Enrollment::chronological);
        Ok(enrollments)
    }

    async fn list_by_student(&self, student_id: &str) -> AppResult<Vec<Enrollment>> {
        let mut enrollments: Vec<Enrollment> = self
            .collection
            .find(doc! { "student_id": student_id })
            .await?
            .try_collect()
            .await?;
        enrollments.sort_by(Enrollment::chronological);
        Ok(enrollments)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for enrollments collection");

        let pair_index = IndexModel::builder()
            .keys(doc! { "course_id": 1, "student_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("course_student_unique".to_string())
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

        self.collection.create_index(pair_index).await?;
        self.collection.create_index(student_index).await?;

        log::info!("Successfully created indexes for enrollments collection");
        Ok(())
    }
}
