#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use projectflows_api::auth::jwt::{generate_access_token, JwtConfig};
use projectflows_api::auth::password::hash_password;
use projectflows_api::config::ServerConfig;
use projectflows_api::router::build_app_router;
use projectflows_api::state::AppState;
use projectflows_core::types::DbId;
use projectflows_db::models::organization::{CreateDepartment, CreateDivision, CreateMissionGroup};
use projectflows_db::models::user::{CreateUser, User};
use projectflows_db::repositories::{OrganizationRepo, UserRepo};

/// Password given to every seeded user.
pub const TEST_PASSWORD: &str = "Test_password_123";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        cookie_secure: false,
        log_json: false,
        jwt: JwtConfig {
            secret: "integration-test-secret-0123456789".to_string(),
            access_token_expiry_mins: 60,
            refresh_token_expiry_days: 7,
        },
    }
}

/// Build the full application router, middleware included, over `pool`.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

/// Two divisions under one mission group.
///
/// ```text
/// mission group
/// ├── division_a: dept_a1, dept_a2
/// └── division_b: dept_b1
/// ```
pub struct Org {
    pub mission_group: DbId,
    pub division_a: DbId,
    pub division_b: DbId,
    pub dept_a1: DbId,
    pub dept_a2: DbId,
    pub dept_b1: DbId,
}

pub async fn seed_org(pool: &PgPool) -> Org {
    let mission_group = OrganizationRepo::create_mission_group(
        pool,
        &CreateMissionGroup { name: "Operations".into() },
    )
    .await
    .expect("mission group insert should succeed")
    .id;

    let division = |name: &str| CreateDivision {
        mission_group_id: mission_group,
        name: name.to_string(),
    };
    let division_a = OrganizationRepo::create_division(pool, &division("Engineering"))
        .await
        .expect("division insert should succeed")
        .id;
    let division_b = OrganizationRepo::create_division(pool, &division("Finance"))
        .await
        .expect("division insert should succeed")
        .id;

    let department = |division_id: DbId, name: &str| CreateDepartment {
        division_id,
        name: name.to_string(),
        tel: None,
    };
    let dept_a1 = OrganizationRepo::create_department(pool, &department(division_a, "Platform"))
        .await
        .expect("department insert should succeed")
        .id;
    let dept_a2 = OrganizationRepo::create_department(pool, &department(division_a, "Apps"))
        .await
        .expect("department insert should succeed")
        .id;
    let dept_b1 = OrganizationRepo::create_department(pool, &department(division_b, "Accounts"))
        .await
        .expect("department insert should succeed")
        .id;

    Org { mission_group, division_a, division_b, dept_a1, dept_a2, dept_b1 }
}

/// Insert an ACTIVE user with [`TEST_PASSWORD`].
pub async fn create_user(pool: &PgPool, email: &str, role: &str, department_id: DbId) -> User {
    let password_hash = hash_password(TEST_PASSWORD).expect("hashing should succeed");
    let full_name = email.split('@').next().unwrap_or(email).replace('.', " ");
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            password_hash,
            full_name,
            role: role.to_string(),
            department_id: Some(department_id),
            additional_roles: None,
            job_title: None,
            phone: None,
        },
    )
    .await
    .expect("user insert should succeed")
}

/// A signed access token for `user`, bypassing the login endpoint.
pub fn token_for(user: &User) -> String {
    generate_access_token(user.id, &user.role, &test_config().jwt)
        .expect("token generation should succeed")
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn patch_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response<Body> {
    send(app, Method::PATCH, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status, then return `data` from the success envelope.
pub async fn expect_data(response: Response<Body>, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    json["data"].clone()
}

/// Assert the status and the error `code` of a failure envelope.
pub async fn expect_error(response: Response<Body>, status: StatusCode, code: &str) {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], code);
}
