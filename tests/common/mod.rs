#![allow(dead_code)]

use actix_web::{body::MessageBody, dev::ServiceResponse, http::header, test, web, App};
use serde_json::json;
use std::sync::Arc;
use task_tracker::{
    auth::AuthResponse,
    config::Config,
    db::MemoryDatabase,
    metrics::MetricsMiddleware,
    models::UserProfile,
    routes, AppState,
};

pub const JWT_SECRET: &str = "integration_test_secret";

pub struct TestContext {
    pub state: web::Data<AppState>,
    pub db: Arc<MemoryDatabase>,
}

pub struct TestUser {
    pub user: UserProfile,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> (header::HeaderName, String) {
        (header::AUTHORIZATION, format!("Bearer {}", self.token))
    }
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "JWT_SECRET" => Some(JWT_SECRET.to_string()),
        "BCRYPT_COST" => Some("4".to_string()),
        "DATABASE_URL" => Some("memory".to_string()),
        _ => None,
    })
    .expect("test config")
}

pub fn test_context() -> TestContext {
    let db = Arc::new(MemoryDatabase::new());
    let state = AppState::new(db.clone(), &test_config()).expect("app state");
    TestContext {
        state: web::Data::new(state),
        db,
    }
}

pub async fn init_app(
    ctx: &TestContext,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = ServiceResponse<impl MessageBody>,
    Error = actix_web::Error,
> {
    test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .wrap(MetricsMiddleware::new(ctx.state.metrics.clone()))
            .configure(routes::config),
    )
    .await
}

pub async fn register_user(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    username: &str,
    email: &str,
    password: &str,
) -> TestUser {
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": username,
            "email": email,
            "password": password
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    assert_eq!(
        status,
        actix_web::http::StatusCode::CREATED,
        "Registration failed. Body: {:?}",
        String::from_utf8_lossy(&body)
    );

    let auth: AuthResponse =
        serde_json::from_slice(&body).expect("Failed to parse registration response");
    TestUser {
        user: auth.user,
        token: auth.token,
    }
}

/// Reads the `message` field of a JSON error body.
pub async fn message_of(resp: ServiceResponse<impl MessageBody>) -> String {
    let body = test::read_body(resp).await;
    let json: serde_json::Value = serde_json::from_slice(&body)
        .unwrap_or_else(|_| panic!("Body is not JSON: {:?}", String::from_utf8_lossy(&body)));
    json["message"]
        .as_str()
        .unwrap_or_else(|| panic!("No message in {}", json))
        .to_string()
}
