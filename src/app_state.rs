use std::sync::Arc;

use secrecy::ExposeSecret;

use crate::{
    clock::{Clock, SystemClock},
    config::{Config, StorageBackend},
    db::Database,
    errors::AppResult,
    repositories::Repositories,
    services::{AttemptService, CourseService, QuizService, ResultService, UserService},
};

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub course_service: Arc<CourseService>,
    pub quiz_service: Arc<QuizService>,
    pub attempt_service: Arc<AttemptService>,
    pub result_service: Arc<ResultService>,
    pub db: Option<Database>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let (repositories, db) = match config.storage_backend {
            StorageBackend::Mongo => {
                let db = Database::connect(&config).await?;
                (Repositories::mongo(&db), Some(db))
            }
            StorageBackend::Memory => {
                log::warn!("Using the in-memory store; data is lost on restart");
                (Repositories::in_memory(), None)
            }
        };

        repositories.ensure_indexes().await?;

        let state = Self::from_parts(config, repositories, Arc::new(SystemClock), db);

        if let (Some(login_id), Some(password)) = (
            state.config.admin_login_id.as_deref(),
            state.config.admin_password.as_ref(),
        ) {
            let admin = state
                .user_service
                .ensure_admin(login_id, password.expose_secret())
                .await?;
            log::info!("Admin account {} is available", admin.login_id);
        }

        Ok(state)
    }

    /// In-memory state driven by `clock`.
    pub fn in_memory(config: Config, clock: Arc<dyn Clock>) -> Self {
        Self::from_parts(config, Repositories::in_memory(), clock, None)
    }

    pub fn from_parts(
        config: Config,
        repositories: Repositories,
        clock: Arc<dyn Clock>,
        db: Option<Database>,
    ) -> Self {
        let timeout = config.store_timeout();
        let Repositories {
            users,
            courses,
            enrollments,
            quizzes,
            attempts,
        } = repositories;

        Self {
            user_service: Arc::new(UserService::new(users, timeout)),
            course_service: Arc::new(CourseService::new(
                courses.clone(),
                enrollments.clone(),
                clock.clone(),
                timeout,
            )),
            quiz_service: Arc::new(QuizService::new(
                quizzes.clone(),
                courses.clone(),
                enrollments.clone(),
                attempts.clone(),
                clock.clone(),
                timeout,
            )),
            attempt_service: Arc::new(AttemptService::new(
                attempts.clone(),
                quizzes.clone(),
                courses.clone(),
                enrollments.clone(),
                clock,
                timeout,
            )),
            result_service: Arc::new(ResultService::new(
                attempts,
                quizzes,
                courses,
                enrollments,
                timeout,
            )),
            db,
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_cloneable() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_memory_backend_bootstraps_admin() {
        let mut config = Config::test_config();
        config.admin_login_id = Some("root".to_string());
        config.admin_password = Some(secrecy::SecretString::from("root-password".to_string()));

        let state = AppState::new(config).await.unwrap();
        assert!(state.db.is_none());

        let admin = state
            .user_service
            .authenticate(crate::models::dto::request::LoginRequest {
                username: "root".to_string(),
                password: "root-password".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(admin.role, crate::models::domain::UserRole::Admin);
    }
}
