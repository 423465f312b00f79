use std::{sync::Arc, time::Duration};

use once_cell::sync::Lazy;
use regex::Regex;
use validator::Validate;

use crate::{
    auth::{authorize, Action, Relation},
    clock::Clock,
    errors::{AppError, AppResult},
    models::{
        domain::{Course, Enrollment, Principal, UserRole},
        dto::request::{CreateCourseRequest, UpdateCourseRequest},
    },
    repositories::{CourseRepository, EnrollmentRepository},
    services::{course_relation, with_timeout},
};

/// Letters, digits, spaces and dashes; must start with a letter or digit.
static COURSE_CODE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9][A-Z0-9 \-]{1,9}$").expect("course code pattern"));

pub struct CourseService {
    courses: Arc<dyn CourseRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl CourseService {
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Self {
        Self {
            courses,
            enrollments,
            clock,
            timeout,
        }
    }

    pub async fn create_course(
        &self,
        caller: &Principal,
        request: CreateCourseRequest,
    ) -> AppResult<Course> {
        authorize(caller, Action::CreateCourse, Relation::Unrelated)?;
        request.validate()?;

        if request.title.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Course title must not be blank".to_string(),
            ));
        }

        let code = request.code.trim().to_uppercase();
        if !COURSE_CODE_REGEX.is_match(&code) {
            return Err(AppError::ValidationError(format!(
                "Invalid course code '{}'",
                request.code
            )));
        }

        let mut course = Course::new(
            &caller.id,
            &code,
            &request.title,
            request.description.as_deref(),
        );
        course.created_at = self.clock.now();

        let course = with_timeout(self.timeout, self.courses.create(course)).await?;
        log::info!("Lecturer {} created course {}", caller.id, course.code);
        Ok(course)
    }

    pub async fn get_course(&self, id: &str) -> AppResult<Course> {
        with_timeout(self.timeout, self.courses.find_by_id(id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Course with id '{}' not found", id)))
    }

    /// Owner-only edit of title, description and the enrollment switch.
    pub async fn update_course(
        &self,
        caller: &Principal,
        id: &str,
        changes: UpdateCourseRequest,
    ) -> AppResult<Course> {
        changes.validate()?;

        let mut course = self.get_course(id).await?;
        let relation =
            course_relation(self.enrollments.as_ref(), self.timeout, caller, &course).await?;
        authorize(caller, Action::EditCourse, relation)?;

        if let Some(title) = changes.title {
            if title.trim().is_empty() {
                return Err(AppError::ValidationError(
                    "Course title must not be blank".to_string(),
                ));
            }
            course.title = title.trim().to_string();
        }
        if let Some(description) = changes.description {
            course.description = Some(description);
        }
        if let Some(open) = changes.enrollment_open {
            course.enrollment_open = open;
        }

        let course = with_timeout(self.timeout, self.courses.update(course)).await?;
        log::info!(
            "Course {} updated by {} (enrollment_open={})",
            course.code,
            caller.id,
            course.enrollment_open
        );
        Ok(course)
    }

    pub async fn enroll(&self, caller: &Principal, course_id: &str) -> AppResult<Enrollment> {
        authorize(caller, Action::Enroll, Relation::Unrelated)?;

        let course = self.get_course(course_id).await?;
        if !course.enrollment_open {
            return Err(AppError::Forbidden(format!(
                "Enrollment for course '{}' is closed",
                course.code
            )));
        }

        let enrollment = Enrollment::new(&course.id, &caller.id, self.clock.now());
        let enrollment = with_timeout(self.timeout, self.enrollments.create(enrollment)).await?;
        log::info!("Student {} enrolled in course {}", caller.id, course.code);
        Ok(enrollment)
    }

    /// Students see courses open for enrollment, lecturers their own courses,
    /// admins everything. `search` filters on title or code.
    pub async fn list_courses(
        &self,
        caller: &Principal,
        search: Option<&str>,
    ) -> AppResult<Vec<Course>> {
        let courses = match caller.role {
            UserRole::Student => with_timeout(self.timeout, self.courses.list_open()).await?,
            UserRole::Lecturer => {
                with_timeout(self.timeout, self.courses.list_by_lecturer(&caller.id)).await?
            }
            UserRole::Admin => with_timeout(self.timeout, self.courses.list_all()).await?,
        };

        Ok(match search {
            Some(query) => courses
                .into_iter()
                .filter(|c| c.matches_search(query))
                .collect(),
            None => courses,
        })
    }

    pub async fn list_enrollments(
        &self,
        caller: &Principal,
        course_id: &str,
    ) -> AppResult<Vec<Enrollment>> {
        let course = self.get_course(course_id).await?;
        let relation =
            course_relation(self.enrollments.as_ref(), self.timeout, caller, &course).await?;
        authorize(caller, Action::ListEnrollments, relation)?;

        with_timeout(self.timeout, self.enrollments.list_by_course(&course.id)).await
    }

    pub async fn my_enrollments(&self, caller: &Principal) -> AppResult<Vec<Enrollment>> {
        if !caller.is_student() {
            return Err(AppError::PermissionDenied(
                "Only students have enrollments".to_string(),
            ));
        }

        with_timeout(self.timeout, self.enrollments.list_by_student(&caller.id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::SystemClock,
        repositories::{InMemoryCourseRepository, InMemoryEnrollmentRepository},
    };

    fn service() -> CourseService {
        CourseService::new(
            Arc::new(InMemoryCourseRepository::new()),
            Arc::new(InMemoryEnrollmentRepository::new()),
            Arc::new(SystemClock),
            Duration::from_secs(1),
        )
    }

    fn request(code: &str, title: &str) -> CreateCourseRequest {
        CreateCourseRequest {
            code: code.to_string(),
            title: title.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_only_lecturers_create_courses() {
        let service = service();

        let result = service
            .create_course(&Principal::student("s1"), request("CSC101", "Intro"))
            .await;
        assert!(matches!(result, Err(AppError::PermissionDenied(_))));

        let course = service
            .create_course(&Principal::lecturer("l1"), request("csc101", "Intro"))
            .await
            .unwrap();
        assert_eq!(course.code, "CSC101");
        assert_eq!(course.lecturer_id, "l1");
    }

    #[tokio::test]
    async fn test_course_code_rules() {
        let service = service();
        let lecturer = Principal::lecturer("l1");

        let bad = service.create_course(&lecturer, request("!!", "Title")).await;
        assert!(matches!(bad, Err(AppError::ValidationError(_))));

        let blank = service.create_course(&lecturer, request("MTH101", "   ")).await;
        assert!(matches!(blank, Err(AppError::ValidationError(_))));

        service.create_course(&lecturer, request("MTH101", "Calculus")).await.unwrap();
        let duplicate = service.create_course(&lecturer, request("mth101", "Again")).await;
        assert!(matches!(duplicate, Err(AppError::AlreadyExists(_))));

        // Another lecturer may reuse the code.
        service
            .create_course(&Principal::lecturer("l2"), request("MTH101", "Calculus"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_enroll_rules() {
        let service = service();
        let course = service
            .create_course(&Principal::lecturer("l1"), request("PHY101", "Physics"))
            .await
            .unwrap();
        let student = Principal::student("s1");

        let missing = service.enroll(&student, "no-such-course").await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let not_student = service.enroll(&Principal::lecturer("l1"), &course.id).await;
        assert!(matches!(not_student, Err(AppError::PermissionDenied(_))));

        service.enroll(&student, &course.id).await.unwrap();
        let again = service.enroll(&student, &course.id).await;
        assert!(matches!(again, Err(AppError::AlreadyEnrolled(_))));

        let mine = service.my_enrollments(&student).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].course_id, course.id);
    }

    #[tokio::test]
    async fn test_closed_enrollment_is_forbidden() {
        let courses = Arc::new(InMemoryCourseRepository::new());
        let mut closed = Course::new("l1", "CHM101", "Chemistry", None);
        closed.enrollment_open = false;
        courses.create(closed.clone()).await.unwrap();

        let service = CourseService::new(
            courses,
            Arc::new(InMemoryEnrollmentRepository::new()),
            Arc::new(SystemClock),
            Duration::from_secs(1),
        );

        let result = service.enroll(&Principal::student("s1"), &closed.id).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let visible = service
            .list_courses(&Principal::student("s1"), None)
            .await
            .unwrap();
        assert!(visible.is_empty());
    }

    #[tokio::test]
    async fn test_list_courses_by_role_and_search() {
        let service = service();
        service
            .create_course(&Principal::lecturer("l1"), request("CSC101", "Programming"))
            .await
            .unwrap();
        service
            .create_course(&Principal::lecturer("l2"), request("BIO101", "Biology"))
            .await
            .unwrap();

        let own = service.list_courses(&Principal::lecturer("l1"), None).await.unwrap();
        assert_eq!(own.len(), 1);

        let all = service.list_courses(&Principal::admin("a1"), None).await.unwrap();
        assert_eq!(all.len(), 2);

        let found = service
            .list_courses(&Principal::student("s1"), Some("bio"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, "BIO101");
    }

    #[tokio::test]
    async fn test_list_enrollments_is_owner_or_admin() {
        let service = service();
        let course = service
            .create_course(&Principal::lecturer("l1"), request("CSC201", "Data"))
            .await
            .unwrap();
        service.enroll(&Principal::student("s1"), &course.id).await.unwrap();

        let owner = service
            .list_enrollments(&Principal::lecturer("l1"), &course.id)
            .await
            .unwrap();
        assert_eq!(owner.len(), 1);

        assert!(service
            .list_enrollments(&Principal::admin("a1"), &course.id)
            .await
            .is_ok());

        let other = service
            .list_enrollments(&Principal::lecturer("l2"), &course.id)
            .await;
        assert!(matches!(other, Err(AppError::PermissionDenied(_))));

        let student = service
            .list_enrollments(&Principal::student("s1"), &course.id)
            .await;
        assert!(matches!(student, Err(AppError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_owner_closes_and_reopens_enrollment() {
        let service = service();
        let owner = Principal::lecturer("l1");
        let student = Principal::student("s1");
        let course = service
            .create_course(&owner, request("ENG101", "Writing"))
            .await
            .unwrap();

        let close = UpdateCourseRequest {
            enrollment_open: Some(false),
            ..Default::default()
        };

        let stranger = service
            .update_course(&Principal::lecturer("l2"), &course.id, close.clone())
            .await;
        assert!(matches!(stranger, Err(AppError::PermissionDenied(_))));
        let by_student = service.update_course(&student, &course.id, close.clone()).await;
        assert!(matches!(by_student, Err(AppError::PermissionDenied(_))));
        let missing = service.update_course(&owner, "nope", close.clone()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let closed = service.update_course(&owner, &course.id, close).await.unwrap();
        assert!(!closed.enrollment_open);
        assert_eq!(closed.title, "Writing");

        let denied = service.enroll(&student, &course.id).await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));
        assert!(service.list_courses(&student, None).await.unwrap().is_empty());

        let reopened = service
            .update_course(
                &owner,
                &course.id,
                UpdateCourseRequest {
                    title: Some("Academic Writing".to_string()),
                    enrollment_open: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(reopened.title, "Academic Writing");
        service.enroll(&student, &course.id).await.unwrap();

        let blank = service
            .update_course(
                &owner,
                &course.id,
                UpdateCourseRequest {
                    title: Some("  ".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(blank, Err(AppError::ValidationError(_))));
    }
}
