use std::{sync::Arc, time::Duration};

use validator::Validate;

use crate::{
    auth::{hash_password, verify_password},
    errors::{AppError, AppResult},
    models::{
        domain::{User, UserRole},
        dto::request::{LoginRequest, RegisterLecturerRequest, RegisterStudentRequest},
    },
    repositories::UserRepository,
    services::with_timeout,
};

pub struct UserService {
    repository: Arc<dyn UserRepository>,
    timeout: Duration,
}

/// Matric numbers and staff ids are matched case-insensitively.
fn normalize_login_id(login_id: &str) -> String {
    login_id.trim().to_uppercase()
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>, timeout: Duration) -> Self {
        Self {
            repository,
            timeout,
        }
    }

    pub async fn register_student(&self, request: RegisterStudentRequest) -> AppResult<User> {
        request.validate()?;

        self.register(
            &request.first_name,
            &request.last_name,
            request.email.as_deref(),
            UserRole::Student,
            &request.matric_number,
            &request.password,
        )
        .await
    }

    pub async fn register_lecturer(&self, request: RegisterLecturerRequest) -> AppResult<User> {
        request.validate()?;

        self.register(
            &request.first_name,
            &request.last_name,
            request.email.as_deref(),
            UserRole::Lecturer,
            &request.staff_id,
            &request.password,
        )
        .await
    }

    async fn register(
        &self,
        first_name: &str,
        last_name: &str,
        email: Option<&str>,
        role: UserRole,
        login_id: &str,
        password: &str,
    ) -> AppResult<User> {
        let login_id = normalize_login_id(login_id);
        let password_hash = hash_password(password)?;
        let user = User::new(
            first_name.trim(),
            last_name.trim(),
            email,
            role,
            &login_id,
            &password_hash,
        );

        let user = with_timeout(self.timeout, self.repository.create(user)).await?;
        log::info!("Registered {} account {}", user.role.as_str(), user.login_id);
        Ok(user)
    }

    /// Checks a login id and password pair. Unknown ids and wrong passwords
    /// produce the same error.
    pub async fn authenticate(&self, request: LoginRequest) -> AppResult<User> {
        request.validate()?;

        let login_id = normalize_login_id(&request.username);
        let invalid = || AppError::Unauthorized("Invalid login id or password".to_string());

        let user = with_timeout(self.timeout, self.repository.find_by_login_id(&login_id))
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&request.password, &user.password_hash)? {
            log::warn!("Failed login attempt for {}", login_id);
            return Err(invalid());
        }

        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> AppResult<User> {
        with_timeout(self.timeout, self.repository.find_by_id(id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id '{}' not found", id)))
    }

    /// Creates the bootstrap admin account unless the login id is taken.
    pub async fn ensure_admin(&self, login_id: &str, password: &str) -> AppResult<User> {
        let normalized = normalize_login_id(login_id);
        if let Some(existing) =
            with_timeout(self.timeout, self.repository.find_by_login_id(&normalized)).await?
        {
            if existing.role != UserRole::Admin {
                return Err(AppError::AlreadyExists(format!(
                    "Login id '{}' belongs to a non-admin account",
                    normalized
                )));
            }
            return Ok(existing);
        }

        self.register("System", "Administrator", None, UserRole::Admin, &normalized, password)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryUserRepository;

    fn service() -> UserService {
        UserService::new(
            Arc::new(InMemoryUserRepository::new()),
            Duration::from_secs(1),
        )
    }

    fn student_request(matric: &str) -> RegisterStudentRequest {
        RegisterStudentRequest {
            matric_number: matric.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Obi".to_string(),
            email: Some("ada@example.com".to_string()),
            password: "s3cure-pass".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_and_login_student() {
        let service = service();
        let user = service.register_student(student_request("csc/20/001")).await.unwrap();

        assert_eq!(user.role, UserRole::Student);
        assert_eq!(user.login_id, "CSC/20/001");
        assert_ne!(user.password_hash, "s3cure-pass");

        let logged_in = service
            .authenticate(LoginRequest {
                username: "CSC/20/001".to_string(),
                password: "s3cure-pass".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_login_id_is_rejected() {
        let service = service();
        service.register_student(student_request("CSC001")).await.unwrap();

        let result = service.register_student(student_request("csc001")).await;
        assert!(matches!(result, Err(AppError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_the_same() {
        let service = service();
        service.register_student(student_request("CSC002")).await.unwrap();

        let wrong = service
            .authenticate(LoginRequest {
                username: "CSC002".to_string(),
                password: "not-the-password".to_string(),
            })
            .await
            .unwrap_err();
        let unknown = service
            .authenticate(LoginRequest {
                username: "NOBODY".to_string(),
                password: "not-the-password".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(wrong, unknown);
        assert!(matches!(wrong, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_register_lecturer_validates_request() {
        let service = service();
        let result = service
            .register_lecturer(RegisterLecturerRequest {
                staff_id: "STF1".to_string(),
                first_name: "".to_string(),
                last_name: "Ade".to_string(),
                email: None,
                password: "short".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let service = service();
        let first = service.ensure_admin("admin", "admin-password").await.unwrap();
        let second = service.ensure_admin("ADMIN", "admin-password").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.role, UserRole::Admin);
    }
}
