pub mod attempt;
pub mod course;
pub mod question;
pub mod quiz;
pub mod summary;
pub mod user;
pub use attempt::{AttemptStatus, QuizAttempt};
pub use course::{Course, Enrollment};
pub use question::{QuizQuestion, QuizQuestionOption};
pub use quiz::{Quiz, ScheduleState};
pub use summary::{CourseAggregate, QuizAggregate, StudentQuizResult, StudentSummary};
pub use user::{Principal, User, UserRole};
