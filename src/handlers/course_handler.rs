use actix_web::{get, post, put, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::request::{CourseSearchParams, CreateCourseRequest, UpdateCourseRequest},
};

#[post("/courses")]
pub async fn create_course(
    state: web::Data<AppState>,
    request: web::Json<CreateCourseRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let course = state
        .course_service
        .create_course(&auth.0, request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(course))
}

#[get("/courses")]
pub async fn list_courses(
    state: web::Data<AppState>,
    query: web::Query<CourseSearchParams>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let courses = state
        .course_service
        .list_courses(&auth.0, query.search.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(courses))
}

#[put("/courses/{id}")]
pub async fn update_course(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<UpdateCourseRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let course = state
        .course_service
        .update_course(&auth.0, &id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(course))
}

#[post("/courses/{id}/enroll")]
pub async fn enroll(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let enrollment = state.course_service.enroll(&auth.0, &id).await?;
    Ok(HttpResponse::Created().json(enrollment))
}

#[get("/courses/{id}/enrollments")]
pub async fn list_enrollments(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let enrollments = state.course_service.list_enrollments(&auth.0, &id).await?;
    Ok(HttpResponse::Ok().json(enrollments))
}

#[get("/enrollments/me")]
pub async fn my_enrollments(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let enrollments = state.course_service.my_enrollments(&auth.0).await?;
    Ok(HttpResponse::Ok().json(enrollments))
}
