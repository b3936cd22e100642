pub mod auth;
pub mod health;
pub mod metrics;
pub mod tasks;

use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::auth::AuthMiddleware;
use crate::error::AppError;

/// Registers every route plus the extractor error handlers.
///
/// `web::Data<AppState>` must be registered by the caller.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .service(index)
        .service(health::health)
        .service(metrics::metrics)
        .service(
            web::scope("/api")
                .service(health::api_health)
                .service(
                    web::scope("/auth")
                        .service(auth::register)
                        .service(auth::login)
                        .service(auth::me),
                )
                .service(
                    web::scope("/tasks")
                        .wrap(AuthMiddleware)
                        .service(tasks::get_tasks)
                        .service(tasks::create_task)
                        .service(tasks::get_task)
                        .service(tasks::update_task)
                        .service(tasks::delete_task),
                ),
        )
        .default_service(web::to(not_found));
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = match &err {
            JsonPayloadError::Deserialize(e) => format!("Invalid request body: {}", e),
            JsonPayloadError::ContentType => "Content-Type must be application/json".to_string(),
            other => format!("Invalid request body: {}", other),
        };
        AppError::BadRequest(message).into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Invalid query parameters: {}", err)).into()
    })
}

#[actix_web::get("/")]
async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Task Tracker API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "Register": "POST /api/auth/register",
            "Login": "POST /api/auth/login",
            "Current User": "GET /api/auth/me",
            "Get Tasks": "GET /api/tasks",
            "Get Task": "GET /api/tasks/:id",
            "Create Task": "POST /api/tasks",
            "Update Task": "PUT /api/tasks/:id",
            "Delete Task": "DELETE /api/tasks/:id",
            "Health Check": "GET /api/health",
            "Metrics": "GET /metrics"
        }
    }))
}

async fn not_found(req: HttpRequest) -> Result<HttpResponse, AppError> {
    log::debug!("No route for {} {}", req.method(), req.path());
    Err(AppError::NotFound("API route not found".into()))
}
