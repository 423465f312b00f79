use actix_web::{get, web, HttpResponse};

use crate::{app_state::AppState, auth::AuthenticatedUser, errors::AppError};

#[get("/students/{id}/summary")]
pub async fn student_summary(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let summary = state.result_service.student_summary(&auth.0, &id).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[get("/courses/{id}/aggregate")]
pub async fn course_aggregate(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let aggregate = state.result_service.course_aggregate(&auth.0, &id).await?;
    Ok(HttpResponse::Ok().json(aggregate))
}
