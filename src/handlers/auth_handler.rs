use actix_web::{post, web, HttpResponse};
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::JwtService,
    errors::AppError,
    models::{
        domain::User,
        dto::{
            request::{
                LoginRequest, RefreshTokenRequest, RegisterLecturerRequest,
                RegisterStudentRequest,
            },
            response::{ApiResponse, LoginResponse, UserDto},
        },
    },
};

#[post("/register/student")]
pub async fn register_student(
    state: web::Data<AppState>,
    request: web::Json<RegisterStudentRequest>,
) -> Result<HttpResponse, AppError> {
    let user = state.user_service.register_student(request.into_inner()).await?;

    Ok(HttpResponse::Created().json(ApiResponse {
        data: UserDto::from(user),
        message: "Student account created".to_string(),
    }))
}

#[post("/register/lecturer")]
pub async fn register_lecturer(
    state: web::Data<AppState>,
    request: web::Json<RegisterLecturerRequest>,
) -> Result<HttpResponse, AppError> {
    let user = state
        .user_service
        .register_lecturer(request.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse {
        data: UserDto::from(user),
        message: "Lecturer account created".to_string(),
    }))
}

#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    jwt_service: web::Data<JwtService>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let user = state.user_service.authenticate(request.into_inner()).await?;
    log::info!("User {} logged in", user.login_id);

    issue_tokens(&jwt_service, user)
}

/// Exchanges a valid refresh token for a fresh token pair.
#[post("/refresh")]
pub async fn refresh_token(
    state: web::Data<AppState>,
    jwt_service: web::Data<JwtService>,
    request: web::Json<RefreshTokenRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    let claims = jwt_service.validate_refresh_token(&request.refresh_token)?;

    let user = state
        .user_service
        .get_user(&claims.sub)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::Unauthorized(
                "User associated with refresh token not found".to_string(),
            ),
            other => other,
        })?;

    log::info!("Token refreshed for user {}", user.login_id);

    issue_tokens(&jwt_service, user)
}

fn issue_tokens(jwt_service: &JwtService, user: User) -> Result<HttpResponse, AppError> {
    let token = jwt_service.create_token(&user)?;
    let new_refresh_token = jwt_service.create_refresh_token(&user)?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        refresh_token: new_refresh_token,
        token_type: "Bearer",
        user: UserDto::from(user),
    }))
}
