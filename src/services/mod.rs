pub mod attempt_service;
pub mod course_service;
pub mod quiz_service;
pub mod result_service;
pub mod user_service;

use std::{future::Future, time::Duration};

use crate::{
    auth::Relation,
    errors::AppResult,
    models::domain::{Course, Principal},
    repositories::EnrollmentRepository,
};

pub use attempt_service::AttemptService;
pub use course_service::CourseService;
pub use quiz_service::QuizService;
pub use result_service::ResultService;
pub use user_service::UserService;

/// Bounds a store call. An elapsed deadline surfaces as `Unavailable`.
pub(crate) async fn with_timeout<T, F>(limit: Duration, call: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(elapsed) => {
            log::warn!("Storage call did not complete within {:?}", limit);
            Err(elapsed.into())
        }
    }
}

/// How `caller` relates to `course` for the authorization table.
pub(crate) async fn course_relation(
    enrollments: &dyn EnrollmentRepository,
    limit: Duration,
    caller: &Principal,
    course: &Course,
) -> AppResult<Relation> {
    if course.is_owned_by(&caller.id) {
        return Ok(Relation::Owner);
    }

    if caller.is_student()
        && with_timeout(limit, enrollments.is_enrolled(&course.id, &caller.id)).await?
    {
        return Ok(Relation::Enrolled);
    }

    Ok(Relation::Unrelated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    #[tokio::test]
    async fn with_timeout_passes_results_through() {
        let ok = with_timeout(Duration::from_millis(50), async { Ok::<_, AppError>(7) }).await;
        assert_eq!(ok, Ok(7));

        let err = with_timeout(Duration::from_millis(50), async {
            Err::<i32, _>(AppError::NotFound("missing".to_string()))
        })
        .await;
        assert!(matches!(err, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn with_timeout_maps_elapsed_to_unavailable() {
        let result = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, AppError>(())
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, AppError::Unavailable(_)));
        assert!(err.is_retryable());
    }
}
