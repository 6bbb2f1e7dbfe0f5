//! HTTP-level tests for user administration and the organization tree.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_user, delete_auth, expect_data, expect_error, get_auth, patch_json_auth,
    post_json, post_json_auth, seed_org, token_for, TEST_PASSWORD,
};
use serde_json::json;
use sqlx::PgPool;

fn new_user(email: &str, role: &str, department_id: i64) -> serde_json::Value {
    json!({
        "email": email,
        "password": "Fresh_Pass_9x",
        "full_name": "New Person",
        "role": role,
        "department_id": department_id,
    })
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_admin_creates_user(pool: PgPool) {
    let org = seed_org(&pool).await;
    let admin = create_user(&pool, "admin@corp.test", "ADMIN", org.dept_a1).await;
    let app = common::build_test_app(pool);
    let token = token_for(&admin);

    let body = new_user("New.Person@corp.test", "MEMBER", org.dept_a2);
    let user = expect_data(post_json_auth(app.clone(), "/api/users", body.clone(), &token).await, StatusCode::CREATED).await;
    assert_eq!(user["email"], "new.person@corp.test");
    assert_eq!(user["role"], "MEMBER");
    assert_eq!(user["status"], "ACTIVE");
    assert!(user.get("password_hash").is_none());

    let response = post_json_auth(app.clone(), "/api/users", body, &token).await;
    expect_error(response, StatusCode::CONFLICT, "CONFLICT").await;

    let response = post_json(
        app,
        "/api/auth/login",
        json!({ "email": "new.person@corp.test", "password": "Fresh_Pass_9x" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_create_user_rejects_weak_password(pool: PgPool) {
    let org = seed_org(&pool).await;
    let admin = create_user(&pool, "admin@corp.test", "ADMIN", org.dept_a1).await;
    let app = common::build_test_app(pool);

    let mut body = new_user("weak@corp.test", "USER", org.dept_a1);
    body["password"] = json!("password");
    let response = post_json_auth(app, "/api/users", body, &token_for(&admin)).await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_chief_creates_within_mission_group_only_below_own_rank(pool: PgPool) {
    let org = seed_org(&pool).await;
    let chief = create_user(&pool, "chief@corp.test", "CHIEF", org.dept_a1).await;
    let head = create_user(&pool, "head@corp.test", "HEAD", org.dept_a1).await;
    let app = common::build_test_app(pool);
    let token = token_for(&chief);

    let body = new_user("lead@corp.test", "LEADER", org.dept_b1);
    let response = post_json_auth(app.clone(), "/api/users", body, &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = new_user("peer@corp.test", "CHIEF", org.dept_b1);
    let response = post_json_auth(app.clone(), "/api/users", body, &token).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    // HEAD manages people but cannot create accounts.
    let body = new_user("junior@corp.test", "USER", org.dept_a1);
    let response = post_json_auth(app, "/api/users", body, &token_for(&head)).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;
}

// ---------------------------------------------------------------------------
// Visibility and management
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_user_list_is_scoped(pool: PgPool) {
    let org = seed_org(&pool).await;
    let head = create_user(&pool, "head@corp.test", "HEAD", org.dept_a1).await;
    create_user(&pool, "member@corp.test", "MEMBER", org.dept_a1).await;
    let stranger = create_user(&pool, "stranger@corp.test", "MEMBER", org.dept_b1).await;
    let app = common::build_test_app(pool);
    let token = token_for(&head);

    let json = body_json(get_auth(app.clone(), "/api/users", &token).await).await;
    assert_eq!(json["pagination"]["total"], 2);

    let json = body_json(get_auth(app.clone(), "/api/users?search=member", &token).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let uri = format!("/api/users/{}", stranger.id);
    let response = get_auth(app, &uri, &token).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_head_suspends_member(pool: PgPool) {
    let org = seed_org(&pool).await;
    let head = create_user(&pool, "head@corp.test", "HEAD", org.dept_a1).await;
    let member = create_user(&pool, "member@corp.test", "MEMBER", org.dept_a1).await;
    let app = common::build_test_app(pool);

    let uri = format!("/api/users/{}/status", member.id);
    let response = patch_json_auth(app.clone(), &uri, json!({ "status": "PAUSED" }), &token_for(&head)).await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;

    let user = expect_data(
        patch_json_auth(app.clone(), &uri, json!({ "status": "SUSPENDED" }), &token_for(&head)).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(user["status"], "SUSPENDED");

    let response = get_auth(app.clone(), "/api/auth/session", &token_for(&member)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Members manage nobody, and nobody manages themselves.
    let uri = format!("/api/users/{}/status", head.id);
    let response = patch_json_auth(app, &uri, json!({ "status": "INACTIVE" }), &token_for(&head)).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_role_changes_respect_rank(pool: PgPool) {
    let org = seed_org(&pool).await;
    let head = create_user(&pool, "head@corp.test", "HEAD", org.dept_a1).await;
    let member = create_user(&pool, "member@corp.test", "MEMBER", org.dept_a1).await;
    let app = common::build_test_app(pool);
    let token = token_for(&head);
    let uri = format!("/api/users/{}", member.id);

    let response = patch_json_auth(app.clone(), &uri, json!({ "role": "HEAD" }), &token).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    let user = expect_data(
        patch_json_auth(app.clone(), &uri, json!({ "role": "USER", "job_title": "Analyst" }), &token).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(user["role"], "USER");
    assert_eq!(user["job_title"], "Analyst");

    let uri = format!("/api/users/{}/permissions", member.id);
    let data = expect_data(get_auth(app.clone(), &uri, &token).await, StatusCode::OK).await;
    assert_eq!(data["effective_role"], "USER");
    assert_eq!(data["permissions"].as_array().unwrap().len(), 2);

    let uri = format!("/api/users/{}", member.id);
    let response = delete_auth(app, &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_change_password(pool: PgPool) {
    let org = seed_org(&pool).await;
    let member = create_user(&pool, "member@corp.test", "MEMBER", org.dept_a1).await;
    let app = common::build_test_app(pool);
    let token = token_for(&member);

    let body = json!({ "current_password": "Not_the_password_1", "new_password": "Brand_new_pass_2" });
    let response = post_json_auth(app.clone(), "/api/users/me/change-password", body, &token).await;
    expect_error(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;

    let body = json!({ "current_password": TEST_PASSWORD, "new_password": "Brand_new_pass_2" });
    let response = post_json_auth(app.clone(), "/api/users/me/change-password", body, &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json!({ "email": "member@corp.test", "password": TEST_PASSWORD });
    let response = post_json(app.clone(), "/api/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = json!({ "email": "member@corp.test", "password": "Brand_new_pass_2" });
    let response = post_json(app, "/api/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Organization
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_organization_tree_follows_scope(pool: PgPool) {
    let org = seed_org(&pool).await;
    let admin = create_user(&pool, "admin@corp.test", "ADMIN", org.dept_a1).await;
    let leader = create_user(&pool, "leader@corp.test", "LEADER", org.dept_b1).await;
    let app = common::build_test_app(pool);

    let tree = expect_data(get_auth(app.clone(), "/api/organization", &token_for(&admin)).await, StatusCode::OK).await;
    assert_eq!(tree["scope_kind"], "all");
    assert_eq!(tree["mission_groups"][0]["divisions"].as_array().unwrap().len(), 2);

    let tree = expect_data(get_auth(app.clone(), "/api/organization", &token_for(&leader)).await, StatusCode::OK).await;
    assert_eq!(tree["scope_kind"], "department");
    let divisions = tree["mission_groups"][0]["divisions"].as_array().unwrap();
    assert_eq!(divisions.len(), 1);
    assert_eq!(divisions[0]["departments"][0]["id"], org.dept_b1);

    let departments = expect_data(
        get_auth(app, "/api/organization/departments", &token_for(&leader)).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(departments.as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_department_management(pool: PgPool) {
    let org = seed_org(&pool).await;
    let admin = create_user(&pool, "admin@corp.test", "ADMIN", org.dept_a1).await;
    let head = create_user(&pool, "head@corp.test", "HEAD", org.dept_a1).await;
    let app = common::build_test_app(pool);
    let token = token_for(&admin);

    let body = json!({ "division_id": org.division_b, "name": "Payroll" });
    let response = post_json_auth(app.clone(), "/api/organization/departments", body.clone(), &token_for(&head)).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    let department = expect_data(
        post_json_auth(app.clone(), "/api/organization/departments", body, &token).await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(department["name"], "Payroll");

    let response = post_json_auth(
        app.clone(),
        "/api/organization/mission-groups",
        json!({ "name": "Research" }),
        &token_for(&head),
    )
    .await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    // dept_a1 still has members.
    let uri = format!("/api/organization/departments/{}", org.dept_a1);
    let response = delete_auth(app.clone(), &uri, &token).await;
    expect_error(response, StatusCode::CONFLICT, "CONFLICT").await;

    let uri = format!("/api/organization/departments/{}", department["id"]);
    let response = delete_auth(app, &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
