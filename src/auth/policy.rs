//! Authorization table.
//!
//! Every access decision in the services goes through [`authorize`], which
//! looks up `(role, action, relation)` and either allows the call or returns
//! the error kind that action reports on denial.

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Principal, UserRole},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    CreateCourse,
    EditCourse,
    Enroll,
    ListEnrollments,
    CreateQuiz,
    ViewQuiz,
    EditQuiz,
    StartAttempt,
    SubmitAttempt,
    ViewAttempt,
    ListQuizAttempts,
    ViewStudentSummary,
    ViewCourseAggregate,
}

/// How the caller relates to the resource being acted on.
///
/// `Owner` means the lecturer owns the course for course-scoped resources,
/// and the student is the attempt or summary subject for student-scoped ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    Owner,
    Enrolled,
    Unrelated,
}

impl Action {
    fn denial(self) -> AppError {
        match self {
            Action::ViewQuiz => {
                AppError::Forbidden("You do not have access to this quiz".to_string())
            }
            Action::ViewStudentSummary => {
                AppError::Forbidden("You can only view your own results".to_string())
            }
            Action::SubmitAttempt | Action::ViewAttempt => {
                AppError::NotFound("Attempt not found".to_string())
            }
            Action::CreateCourse => {
                AppError::PermissionDenied("Only lecturers can create courses".to_string())
            }
            Action::Enroll => {
                AppError::PermissionDenied("Only students can enroll in courses".to_string())
            }
            Action::StartAttempt => {
                AppError::PermissionDenied("Only students can attempt quizzes".to_string())
            }
            Action::EditCourse
            | Action::ListEnrollments
            | Action::CreateQuiz
            | Action::EditQuiz
            | Action::ListQuizAttempts
            | Action::ViewCourseAggregate => AppError::PermissionDenied(
                "Only the lecturer who owns this course can do that".to_string(),
            ),
        }
    }
}

fn is_allowed(role: UserRole, action: Action, relation: Relation) -> bool {
    use Action::*;
    use Relation::*;
    use UserRole::*;

    matches!(
        (role, action, relation),
        (Lecturer, CreateCourse, _)
            | (Lecturer, EditCourse, Owner)
            | (Student, Enroll, _)
            | (Lecturer, ListEnrollments, Owner)
            | (Admin, ListEnrollments, _)
            | (Lecturer, CreateQuiz, Owner)
            | (Lecturer, EditQuiz, Owner)
            | (Student, ViewQuiz, Enrolled)
            | (Lecturer, ViewQuiz, Owner)
            | (Admin, ViewQuiz, _)
            | (Student, StartAttempt, _)
            | (Student, SubmitAttempt, Owner)
            | (Student, ViewAttempt, Owner)
            | (Lecturer, ViewAttempt, Owner)
            | (Admin, ViewAttempt, _)
            | (Lecturer, ListQuizAttempts, Owner)
            | (Admin, ListQuizAttempts, _)
            | (Student, ViewStudentSummary, Owner)
            | (Admin, ViewStudentSummary, _)
            | (Lecturer, ViewCourseAggregate, Owner)
    )
}

pub fn authorize(principal: &Principal, action: Action, relation: Relation) -> AppResult<()> {
    if is_allowed(principal.role, action, relation) {
        Ok(())
    } else {
        Err(action.denial())
    }
}
