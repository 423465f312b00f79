pub mod attempt_handler;
pub mod auth_handler;
pub mod course_handler;
pub mod health_handler;
pub mod quiz_handler;
pub mod result_handler;

use actix_web::web;

use crate::{auth::AuthMiddleware, errors::AppError};

/// Registers every route. Everything under `/api` except `/api/auth`
/// requires a bearer token.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into()),
    )
    .service(health_handler::health_check)
    .service(health_handler::health_check_ready)
    .service(
        web::scope("/api/auth")
            .service(auth_handler::register_student)
            .service(auth_handler::register_lecturer)
            .service(auth_handler::login)
            .service(auth_handler::refresh_token),
    )
    .service(
        web::scope("/api")
            .wrap(AuthMiddleware)
            .service(course_handler::create_course)
            .service(course_handler::list_courses)
            .service(course_handler::update_course)
            .service(course_handler::enroll)
            .service(course_handler::list_enrollments)
            .service(course_handler::my_enrollments)
            .service(result_handler::course_aggregate)
            .service(result_handler::student_summary)
            .service(quiz_handler::create_quiz)
            .service(quiz_handler::list_quizzes)
            .service(quiz_handler::get_quiz)
            .service(quiz_handler::edit_quiz)
            .service(quiz_handler::start_attempt)
            .service(quiz_handler::list_quiz_attempts)
            .service(attempt_handler::my_attempts)
            .service(attempt_handler::get_attempt)
            .service(attempt_handler::submit_answers),
    );
}
