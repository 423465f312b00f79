use std::{sync::Arc, time::Duration};

use validator::Validate;

use crate::{
    auth::{authorize, Action},
    clock::Clock,
    errors::{AppError, AppResult},
    models::{
        domain::{Course, Principal, Quiz, QuizQuestion, UserRole},
        dto::{
            request::{CreateQuizRequest, UpdateQuizRequest},
            response::{PublicQuiz, QuizView},
        },
    },
    repositories::{AttemptRepository, CourseRepository, EnrollmentRepository, QuizRepository},
    services::{course_relation, with_timeout},
};

pub struct QuizService {
    quizzes: Arc<dyn QuizRepository>,
    courses: Arc<dyn CourseRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    attempts: Arc<dyn AttemptRepository>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl QuizService {
    pub fn new(
        quizzes: Arc<dyn QuizRepository>,
        courses: Arc<dyn CourseRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        attempts: Arc<dyn AttemptRepository>,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Self {
        Self {
            quizzes,
            courses,
            enrollments,
            attempts,
            clock,
            timeout,
        }
    }

    async fn find_course(&self, id: &str) -> AppResult<Course> {
        with_timeout(self.timeout, self.courses.find_by_id(id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Course with id '{}' not found", id)))
    }

    async fn find_quiz(&self, id: &str) -> AppResult<Quiz> {
        with_timeout(self.timeout, self.quizzes.find_by_id(id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", id)))
    }

    pub async fn create_quiz(
        &self,
        caller: &Principal,
        request: CreateQuizRequest,
    ) -> AppResult<Quiz> {
        request.validate()?;

        let course = self.find_course(&request.course_id).await?;
        let relation =
            course_relation(self.enrollments.as_ref(), self.timeout, caller, &course).await?;
        authorize(caller, Action::CreateQuiz, relation)?;

        let questions: Vec<QuizQuestion> = request.questions.into_iter().map(Into::into).collect();
        let mut quiz = Quiz::new(
            &course.id,
            &request.title,
            &request.instructions,
            questions,
            request.opens_at,
            request.closes_at,
            request.time_limit_minutes,
            self.clock.now(),
        );
        if let Some(active) = request.is_active {
            quiz.is_active = active;
        }
        quiz.validate()?;

        let quiz = with_timeout(self.timeout, self.quizzes.create(quiz)).await?;
        log::info!(
            "Lecturer {} created quiz {} for course {}",
            caller.id,
            quiz.id,
            course.code
        );
        Ok(quiz)
    }

    /// Students get the quiz without its answer key.
    pub async fn get_quiz(&self, caller: &Principal, id: &str) -> AppResult<QuizView> {
        let quiz = self.find_quiz(id).await?;
        let course = self.find_course(&quiz.course_id).await?;
        let relation =
            course_relation(self.enrollments.as_ref(), self.timeout, caller, &course).await?;
        authorize(caller, Action::ViewQuiz, relation)?;

        Ok(if caller.is_student() {
            QuizView::Public(PublicQuiz::from(&quiz))
        } else {
            QuizView::Full(quiz)
        })
    }

    /// Applies `changes` while the quiz has no attempts. The final write is
    /// conditional on the stored quiz still being unlocked. A request that
    /// only sets `is_active` is allowed on locked quizzes too.
    pub async fn edit_quiz(
        &self,
        caller: &Principal,
        id: &str,
        changes: UpdateQuizRequest,
    ) -> AppResult<Quiz> {
        changes.validate()?;

        let mut quiz = self.find_quiz(id).await?;
        let course = self.find_course(&quiz.course_id).await?;
        let relation =
            course_relation(self.enrollments.as_ref(), self.timeout, caller, &course).await?;
        authorize(caller, Action::EditQuiz, relation)?;

        if let (true, Some(active)) = (changes.only_sets_active(), changes.is_active) {
            with_timeout(self.timeout, self.quizzes.set_active(&quiz.id, active)).await?;
            quiz.is_active = active;
            log::info!("Quiz {} active={} set by {}", quiz.id, active, caller.id);
            return Ok(quiz);
        }

        let locked_error = || AppError::Locked(format!("Quiz '{}' already has attempts", id));

        if quiz.locked || with_timeout(self.timeout, self.attempts.count_by_quiz(id)).await? > 0 {
            return Err(locked_error());
        }

        if let Some(title) = changes.title {
            quiz.title = title.trim().to_string();
        }
        if let Some(instructions) = changes.instructions {
            quiz.instructions = instructions;
        }
        if let Some(questions) = changes.questions {
            quiz.questions = questions.into_iter().map(Into::into).collect();
        }
        if let Some(opens_at) = changes.opens_at {
            quiz.opens_at = opens_at;
        }
        if let Some(closes_at) = changes.closes_at {
            quiz.closes_at = closes_at;
        }
        if let Some(limit) = changes.time_limit_minutes {
            quiz.time_limit_minutes = limit;
        }
        if let Some(active) = changes.is_active {
            quiz.is_active = active;
        }
        quiz.modified_at = self.clock.now();
        quiz.validate()?;

        if !with_timeout(self.timeout, self.quizzes.update_unlocked(quiz.clone())).await? {
            return Err(locked_error());
        }

        log::info!("Quiz {} updated by {}", quiz.id, caller.id);
        Ok(quiz)
    }

    /// Students see active quizzes of courses they are enrolled in, lecturers
    /// those of their own courses, admins all quizzes. `is_active` narrows
    /// the list for lecturers and admins; students only ever see active ones.
    pub async fn list_quizzes(
        &self,
        caller: &Principal,
        is_active: Option<bool>,
    ) -> AppResult<Vec<Quiz>> {
        let wanted = if caller.is_student() {
            Some(true)
        } else {
            is_active
        };

        let quizzes = self.visible_quizzes(caller).await?;
        Ok(match wanted {
            Some(active) => quizzes.into_iter().filter(|q| q.is_active == active).collect(),
            None => quizzes,
        })
    }

    async fn visible_quizzes(&self, caller: &Principal) -> AppResult<Vec<Quiz>> {
        let course_ids: Vec<String> = match caller.role {
            UserRole::Admin => return with_timeout(self.timeout, self.quizzes.list_all()).await,
            UserRole::Student => {
                with_timeout(self.timeout, self.enrollments.list_by_student(&caller.id))
                    .await?
                    .into_iter()
                    .map(|e| e.course_id)
                    .collect()
            }
            UserRole::Lecturer => {
                with_timeout(self.timeout, self.courses.list_by_lecturer(&caller.id))
                    .await?
                    .into_iter()
                    .map(|c| c.id)
                    .collect()
            }
        };

        with_timeout(self.timeout, self.quizzes.list_by_courses(&course_ids)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        models::domain::{Enrollment, QuizAttempt},
        repositories::{
            InMemoryAttemptRepository, InMemoryCourseRepository, InMemoryEnrollmentRepository,
            InMemoryQuizRepository,
        },
        test_utils::fixtures,
    };
    use chrono::{Duration as ChronoDuration, Utc};

    struct Harness {
        service: QuizService,
        attempts: Arc<InMemoryAttemptRepository>,
        enrollments: Arc<InMemoryEnrollmentRepository>,
        course: Course,
        clock: Arc<ManualClock>,
    }

    async fn harness() -> Harness {
        let courses = Arc::new(InMemoryCourseRepository::new());
        let enrollments = Arc::new(InMemoryEnrollmentRepository::new());
        let attempts = Arc::new(InMemoryAttemptRepository::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));

        let course = Course::new("lect-1", "CSC101", "Programming", None);
        courses.create(course.clone()).await.unwrap();

        let service = QuizService::new(
            Arc::new(InMemoryQuizRepository::new()),
            courses,
            enrollments.clone(),
            attempts.clone(),
            clock.clone(),
            Duration::from_secs(1),
        );

        Harness {
            service,
            attempts,
            enrollments,
            course,
            clock,
        }
    }

    #[tokio::test]
    async fn test_create_quiz_checks_ownership_and_window() {
        let h = harness().await;
        let now = h.clock.now();

        let missing = h
            .service
            .create_quiz(
                &Principal::lecturer("lect-1"),
                fixtures::quiz_request("no-course", now, now + ChronoDuration::hours(1)),
            )
            .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let not_owner = h
            .service
            .create_quiz(
                &Principal::lecturer("lect-2"),
                fixtures::quiz_request(&h.course.id, now, now + ChronoDuration::hours(1)),
            )
            .await;
        assert!(matches!(not_owner, Err(AppError::PermissionDenied(_))));

        for closes_at in [now, now - ChronoDuration::minutes(1)] {
            let inverted = h
                .service
                .create_quiz(
                    &Principal::lecturer("lect-1"),
                    fixtures::quiz_request(&h.course.id, now, closes_at),
                )
                .await;
            assert!(matches!(inverted, Err(AppError::ValidationError(_))));
        }

        let quiz = h
            .service
            .create_quiz(
                &Principal::lecturer("lect-1"),
                fixtures::quiz_request(&h.course.id, now, now + ChronoDuration::hours(1)),
            )
            .await
            .unwrap();
        assert_eq!(quiz.max_score(), 6);
        assert!(!quiz.locked);
    }

    #[tokio::test]
    async fn test_create_quiz_rejects_bad_weight() {
        let h = harness().await;
        let now = h.clock.now();
        let mut request = fixtures::quiz_request(&h.course.id, now, now + ChronoDuration::hours(1));
        request.questions[0].weight = 0;

        let result = h
            .service
            .create_quiz(&Principal::lecturer("lect-1"), request)
            .await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_get_quiz_views() {
        let h = harness().await;
        let now = h.clock.now();
        let quiz = h
            .service
            .create_quiz(
                &Principal::lecturer("lect-1"),
                fixtures::quiz_request(&h.course.id, now, now + ChronoDuration::hours(1)),
            )
            .await
            .unwrap();

        let outsider = h.service.get_quiz(&Principal::student("s1"), &quiz.id).await;
        assert!(matches!(outsider, Err(AppError::Forbidden(_))));

        let other_lecturer = h.service.get_quiz(&Principal::lecturer("lect-2"), &quiz.id).await;
        assert!(matches!(other_lecturer, Err(AppError::Forbidden(_))));

        h.enrollments
            .create(Enrollment::new(&h.course.id, "s1", now))
            .await
            .unwrap();
        let student_view = h.service.get_quiz(&Principal::student("s1"), &quiz.id).await.unwrap();
        assert!(matches!(student_view, QuizView::Public(_)));

        let owner_view = h
            .service
            .get_quiz(&Principal::lecturer("lect-1"), &quiz.id)
            .await
            .unwrap();
        assert!(matches!(owner_view, QuizView::Full(_)));

        let missing = h.service.get_quiz(&Principal::admin("a1"), "nope").await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_edit_quiz_until_first_attempt() {
        let h = harness().await;
        let now = h.clock.now();
        let lecturer = Principal::lecturer("lect-1");
        let quiz = h
            .service
            .create_quiz(
                &lecturer,
                fixtures::quiz_request(&h.course.id, now, now + ChronoDuration::hours(1)),
            )
            .await
            .unwrap();

        let not_owner = h
            .service
            .edit_quiz(&Principal::lecturer("lect-2"), &quiz.id, UpdateQuizRequest::default())
            .await;
        assert!(matches!(not_owner, Err(AppError::PermissionDenied(_))));

        let edited = h
            .service
            .edit_quiz(
                &lecturer,
                &quiz.id,
                UpdateQuizRequest {
                    title: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.title, "Renamed");

        let invalid = h
            .service
            .edit_quiz(
                &lecturer,
                &quiz.id,
                UpdateQuizRequest {
                    closes_at: Some(quiz.opens_at),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(invalid, Err(AppError::ValidationError(_))));

        h.attempts
            .insert_active(QuizAttempt::start(
                &quiz.id,
                &h.course.id,
                "s1",
                quiz.max_score(),
                now,
                quiz.closes_at,
            ))
            .await
            .unwrap();

        let locked = h
            .service
            .edit_quiz(
                &lecturer,
                &quiz.id,
                UpdateQuizRequest {
                    title: Some("Too late".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(locked, Err(AppError::Locked(_))));
    }

    #[tokio::test]
    async fn test_list_quizzes_by_role() {
        let h = harness().await;
        let now = h.clock.now();
        h.service
            .create_quiz(
                &Principal::lecturer("lect-1"),
                fixtures::quiz_request(&h.course.id, now, now + ChronoDuration::hours(1)),
            )
            .await
            .unwrap();

        let lecturer = h.service.list_quizzes(&Principal::lecturer("lect-1"), None).await.unwrap();
        assert_eq!(lecturer.len(), 1);

        let stranger = h.service.list_quizzes(&Principal::student("s1"), None).await.unwrap();
        assert!(stranger.is_empty());

        h.enrollments
            .create(Enrollment::new(&h.course.id, "s1", now))
            .await
            .unwrap();
        let enrolled = h.service.list_quizzes(&Principal::student("s1"), None).await.unwrap();
        assert_eq!(enrolled.len(), 1);

        let admin = h.service.list_quizzes(&Principal::admin("a1"), None).await.unwrap();
        assert_eq!(admin.len(), 1);
    }

    #[tokio::test]
    async fn test_create_quiz_rejects_unbounded_limits() {
        let h = harness().await;
        let now = h.clock.now();
        let lecturer = Principal::lecturer("lect-1");

        let mut huge_limit =
            fixtures::quiz_request(&h.course.id, now, now + ChronoDuration::hours(1));
        huge_limit.time_limit_minutes = Some(i64::MAX / 2);
        let result = h.service.create_quiz(&lecturer, huge_limit).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));

        let mut huge_weights =
            fixtures::quiz_request(&h.course.id, now, now + ChronoDuration::hours(1));
        for question in huge_weights.questions.iter_mut() {
            question.weight = i32::MAX;
        }
        let result = h.service.create_quiz(&lecturer, huge_weights).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_edit_quiz_clears_time_limit() {
        let h = harness().await;
        let now = h.clock.now();
        let lecturer = Principal::lecturer("lect-1");
        let mut request = fixtures::quiz_request(&h.course.id, now, now + ChronoDuration::hours(1));
        request.time_limit_minutes = Some(20);
        let quiz = h.service.create_quiz(&lecturer, request).await.unwrap();
        assert_eq!(quiz.time_limit_minutes, Some(20));

        let kept = h
            .service
            .edit_quiz(
                &lecturer,
                &quiz.id,
                UpdateQuizRequest {
                    title: Some("Same limit".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(kept.time_limit_minutes, Some(20));

        let cleared = h
            .service
            .edit_quiz(
                &lecturer,
                &quiz.id,
                UpdateQuizRequest {
                    time_limit_minutes: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.time_limit_minutes, None);

        let stored = h.service.get_quiz(&lecturer, &quiz.id).await.unwrap();
        match stored {
            QuizView::Full(stored) => assert_eq!(stored.time_limit_minutes, None),
            QuizView::Public(_) => panic!("owner should see the full quiz"),
        }
    }

    #[tokio::test]
    async fn test_inactive_quizzes_are_hidden_from_students() {
        let h = harness().await;
        let now = h.clock.now();
        let lecturer = Principal::lecturer("lect-1");
        let student = Principal::student("s1");
        h.enrollments
            .create(Enrollment::new(&h.course.id, "s1", now))
            .await
            .unwrap();

        let visible = h
            .service
            .create_quiz(
                &lecturer,
                fixtures::quiz_request(&h.course.id, now, now + ChronoDuration::hours(1)),
            )
            .await
            .unwrap();
        let mut draft = fixtures::quiz_request(&h.course.id, now, now + ChronoDuration::hours(2));
        draft.is_active = Some(false);
        let draft = h.service.create_quiz(&lecturer, draft).await.unwrap();
        assert!(!draft.is_active);

        let seen = h.service.list_quizzes(&student, None).await.unwrap();
        assert_eq!(seen.iter().map(|q| &q.id).collect::<Vec<_>>(), vec![&visible.id]);

        // Students cannot widen the filter.
        let seen = h.service.list_quizzes(&student, Some(false)).await.unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].is_active);

        let all = h.service.list_quizzes(&lecturer, None).await.unwrap();
        assert_eq!(all.len(), 2);
        let inactive = h.service.list_quizzes(&lecturer, Some(false)).await.unwrap();
        assert_eq!(inactive.iter().map(|q| &q.id).collect::<Vec<_>>(), vec![&draft.id]);
        let active = h.service.list_quizzes(&lecturer, Some(true)).await.unwrap();
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn test_locked_quiz_can_still_be_deactivated() {
        let h = harness().await;
        let now = h.clock.now();
        let lecturer = Principal::lecturer("lect-1");
        let quiz = h
            .service
            .create_quiz(
                &lecturer,
                fixtures::quiz_request(&h.course.id, now, now + ChronoDuration::hours(1)),
            )
            .await
            .unwrap();
        h.attempts
            .insert_active(QuizAttempt::start(
                &quiz.id,
                &h.course.id,
                "s1",
                quiz.max_score(),
                now,
                quiz.closes_at,
            ))
            .await
            .unwrap();

        let deactivate = UpdateQuizRequest {
            is_active: Some(false),
            ..Default::default()
        };
        let updated = h.service.edit_quiz(&lecturer, &quiz.id, deactivate.clone()).await.unwrap();
        assert!(!updated.is_active);

        let not_owner = h
            .service
            .edit_quiz(&Principal::lecturer("lect-2"), &quiz.id, deactivate)
            .await;
        assert!(matches!(not_owner, Err(AppError::PermissionDenied(_))));

        // Anything beyond the toggle still needs an unlocked quiz.
        let mixed = h
            .service
            .edit_quiz(
                &lecturer,
                &quiz.id,
                UpdateQuizRequest {
                    title: Some("Renamed".to_string()),
                    is_active: Some(true),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(mixed, Err(AppError::Locked(_))));

        let listed = h.service.list_quizzes(&lecturer, Some(false)).await.unwrap();
        assert_eq!(listed.len(), 1);
    }
}
