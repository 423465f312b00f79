use actix_web::{get, post, put, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::{
        request::{CreateQuizRequest, QuizListParams, UpdateQuizRequest},
        response::{QuizListItem, StartAttemptResponse},
    },
};

#[post("/quizzes")]
pub async fn create_quiz(
    state: web::Data<AppState>,
    request: web::Json<CreateQuizRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quiz = state
        .quiz_service
        .create_quiz(&auth.0, request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(quiz))
}

#[get("/quizzes")]
pub async fn list_quizzes(
    state: web::Data<AppState>,
    query: web::Query<QuizListParams>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quizzes = state
        .quiz_service
        .list_quizzes(&auth.0, query.is_active)
        .await?;
    let items: Vec<QuizListItem> = quizzes.iter().map(QuizListItem::from).collect();
    Ok(HttpResponse::Ok().json(items))
}

#[get("/quizzes/{id}")]
pub async fn get_quiz(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quiz = state.quiz_service.get_quiz(&auth.0, &id).await?;
    Ok(HttpResponse::Ok().json(quiz))
}

#[put("/quizzes/{id}")]
pub async fn edit_quiz(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<UpdateQuizRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quiz = state
        .quiz_service
        .edit_quiz(&auth.0, &id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(quiz))
}

#[post("/quizzes/{id}/attempts")]
pub async fn start_attempt(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let (attempt, quiz) = state.attempt_service.start_attempt(&auth.0, &id).await?;
    Ok(HttpResponse::Created().json(StartAttemptResponse::new(&attempt, &quiz)))
}

#[get("/quizzes/{id}/attempts")]
pub async fn list_quiz_attempts(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let attempts = state
        .attempt_service
        .list_quiz_attempts(&auth.0, &id)
        .await?;
    Ok(HttpResponse::Ok().json(attempts))
}
