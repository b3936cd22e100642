mod common;

use actix_web::{http::header, http::StatusCode, rt, test, App, HttpServer};
use chrono::{Duration, Utc};
use common::{init_app, message_of, register_user, test_context, JWT_SECRET};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::net::TcpListener;
use task_tracker::auth::{AuthResponse, Claims, TokenService};
use task_tracker::routes;

#[actix_rt::test]
async fn test_register_and_login_flow() {
    let ctx = test_context();
    let app = init_app(&ctx).await;

    let alice = register_user(&app, "alice", "alice@x.com", "secret1").await;
    assert!(!alice.token.is_empty(), "Token should be a non-empty string");
    assert_eq!(alice.user.username, "alice");
    assert_eq!(alice.user.email, "alice@x.com");

    // Login by username
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "alice", "password": "secret1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let login: AuthResponse = test::read_body_json(resp).await;
    assert_eq!(login.user.id, alice.user.id);
    assert_eq!(login.message, "Login successful");

    // Login by email, sent in the username field
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "ALICE@x.com", "password": "secret1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Login by email field
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "alice@x.com", "password": "secret1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Blank username with a usable email
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "", "email": "alice@x.com", "password": "secret1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let login: AuthResponse = test::read_body_json(resp).await;
    assert_eq!(login.user.id, alice.user.id);

    // Wrong password
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "alice", "password": "wrong" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message_of(resp).await, "Invalid username or password");

    // Current user
    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .append_header(alice.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["id"], alice.user.id.to_string());
}

#[actix_rt::test]
async fn test_duplicate_registration_is_generic() {
    let ctx = test_context();
    let app = init_app(&ctx).await;
    register_user(&app, "alice", "alice@x.com", "secret1").await;

    for payload in [
        json!({ "username": "alice", "email": "other@x.com", "password": "secret1" }),
        json!({ "username": "alice2", "email": "Alice@X.com", "password": "secret1" }),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(message_of(resp).await, "Username or email already exists");
    }
}

#[actix_rt::test]
async fn test_invalid_registration_inputs() {
    let ctx = test_context();
    let app = init_app(&ctx).await;

    let test_cases = vec![
        (
            json!({ "email": "test@example.com", "password": "secret1" }),
            "Please fill in all fields",
        ),
        (
            json!({ "username": "testuser", "password": "secret1" }),
            "Please fill in all fields",
        ),
        (
            json!({ "username": "testuser", "email": "test@example.com" }),
            "Please fill in all fields",
        ),
        (
            json!({ "username": "testuser", "email": "invalid-email", "password": "secret1" }),
            "Please enter a valid email address",
        ),
        (
            json!({ "username": "u", "email": "test@example.com", "password": "secret1" }),
            "Username must be between 3 and 32 characters",
        ),
        (
            json!({ "username": "user name!", "email": "test@example.com", "password": "secret1" }),
            "Username must be alphanumeric, underscores, or hyphens",
        ),
        (
            json!({ "username": "testuser", "email": "test@example.com", "password": "12345" }),
            "Password must be at least 6 characters",
        ),
    ];

    for (payload, expected_message) in test_cases {
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(
            resp.status(),
            StatusCode::BAD_REQUEST,
            "Unexpected status for {}",
            payload
        );
        assert_eq!(message_of(resp).await, expected_message);
    }

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(message_of(resp).await.starts_with("Invalid request body"));
}

#[actix_rt::test]
async fn test_invalid_login_inputs() {
    let ctx = test_context();
    let app = init_app(&ctx).await;
    register_user(&app, "login_test_user", "login@example.com", "secret1").await;

    let test_cases = vec![
        (
            json!({ "password": "secret1" }),
            "Please enter username and password",
        ),
        (
            json!({ "username": "login_test_user" }),
            "Please enter username and password",
        ),
        (
            json!({ "username": "login_test_user", "password": "WrongPassword" }),
            "Invalid username or password",
        ),
        (
            json!({ "username": "nobody", "password": "secret1" }),
            "Invalid username or password",
        ),
    ];

    for (payload, expected_message) in test_cases {
        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(message_of(resp).await, expected_message);
    }
}

#[actix_rt::test]
async fn test_auth_gate_rejections() {
    let ctx = test_context();
    let app = init_app(&ctx).await;
    let alice = register_user(&app, "alice", "alice@x.com", "secret1").await;

    let forged = TokenService::new("some other secret", Duration::days(7))
        .encode(&Claims {
            user_id: alice.user.id,
            username: "alice".into(),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::days(7)).timestamp(),
        })
        .unwrap();
    let issued = Utc::now() - Duration::days(8);
    let expired = TokenService::new(JWT_SECRET, Duration::days(7))
        .encode(&Claims {
            user_id: alice.user.id,
            username: "alice".into(),
            iat: issued.timestamp(),
            exp: (issued + Duration::days(7)).timestamp(),
        })
        .unwrap();

    let cases: Vec<(Option<String>, &str)> = vec![
        (None, "Please log in"),
        (Some("Basic YWxpY2U6c2VjcmV0MQ==".into()), "Please log in"),
        (Some(alice.token.clone()), "Please log in"),
        (Some(format!("Bearer {}", forged)), "Invalid login token"),
        (Some("Bearer not.a.jwt".into()), "Invalid login token"),
        (
            Some(format!("Bearer {}", expired)),
            "Login expired, please log in again",
        ),
    ];

    for (authorization, expected_message) in cases {
        let mut req = test::TestRequest::get().uri("/api/tasks");
        if let Some(value) = &authorization {
            req = req.insert_header((header::AUTHORIZATION, value.as_str()));
        }
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(
            resp.status(),
            StatusCode::UNAUTHORIZED,
            "Expected 401 for {:?}",
            authorization
        );
        assert_eq!(message_of(resp).await, expected_message);
    }
}

#[actix_rt::test]
async fn test_token_for_deleted_user_is_rejected() {
    let ctx = test_context();
    let app = init_app(&ctx).await;
    let alice = register_user(&app, "alice", "alice@x.com", "secret1").await;

    ctx.db.remove_user(alice.user.id).await;

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .append_header(alice.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(message_of(resp).await, "User not found");
}

#[actix_rt::test]
async fn test_create_task_unauthorized_over_http() {
    let ctx = test_context();

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let state = ctx.state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(routes::config)
    })
    .workers(1)
    .listen(listener)
    .expect("Failed to listen")
    .run();
    let handle = server.handle();
    rt::spawn(server);

    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{}/api/tasks", port))
        .json(&json!({ "title": "Unauthorized Task" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await.expect("JSON body");
    assert_eq!(body["message"], "Please log in");

    handle.stop(false).await;
}

#[test_log::test]
fn test_token_service_rejects_foreign_secret() {
    let ours = TokenService::new(JWT_SECRET, Duration::days(7));
    let theirs = TokenService::new("another", Duration::days(7));
    let claims = Claims {
        user_id: uuid::Uuid::new_v4(),
        username: "bob".into(),
        iat: Utc::now().timestamp(),
        exp: (Utc::now() + Duration::hours(1)).timestamp(),
    };

    let token = theirs.encode(&claims).unwrap();
    assert!(ours.verify(&token).is_err());
    assert_eq!(theirs.verify(&token).unwrap(), claims);
}

