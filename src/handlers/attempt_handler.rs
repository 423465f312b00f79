use actix_web::{get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::request::SubmitAnswersRequest,
};

#[get("/attempts/me")]
pub async fn my_attempts(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let attempts = state.attempt_service.my_attempts(&auth.0).await?;
    Ok(HttpResponse::Ok().json(attempts))
}

#[get("/attempts/{id}")]
pub async fn get_attempt(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let attempt = state.attempt_service.get_attempt(&auth.0, &id).await?;
    Ok(HttpResponse::Ok().json(attempt))
}

#[post("/attempts/{id}/submit")]
pub async fn submit_answers(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<SubmitAnswersRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let result = state
        .attempt_service
        .submit_answers(&auth.0, &id, request.into_inner().answers)
        .await?;
    Ok(HttpResponse::Ok().json(result))
}
