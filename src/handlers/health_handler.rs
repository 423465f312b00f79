use actix_web::{get, web, HttpResponse};

use crate::app_state::AppState;

#[get("/health")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[get("/health/ready")]
pub async fn health_check_ready(state: web::Data<AppState>) -> HttpResponse {
    let (storage, healthy) = match &state.db {
        Some(db) => {
            let ok = db.health_check().await.is_ok();
            ("mongodb", ok)
        }
        None => ("memory", true),
    };

    let response = serde_json::json!({
        "status": if healthy { "ready" } else { "not_ready" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": {
            "backend": storage,
            "status": if healthy { "ok" } else { "error" }
        }
    });

    if healthy {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
