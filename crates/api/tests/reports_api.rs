//! HTTP-level tests for the scoped task report and the personal dashboard.

mod common;

use axum::http::StatusCode;
use axum::Router;
use chrono::Utc;
use common::{
    create_user, expect_data, expect_error, get_auth, post_json_auth, seed_org, token_for, Org,
};
use serde_json::json;
use sqlx::PgPool;

struct Fixture {
    app: Router,
    org: Org,
    head: String,
    leader: String,
    admin: String,
    member_id: i64,
    member: String,
}

/// Two tasks in `dept_a1` (one completed, one open and assigned to the
/// member) and one task in `dept_b1`.
async fn fixture(pool: PgPool) -> Fixture {
    let org = seed_org(&pool).await;
    let head = create_user(&pool, "head@corp.test", "HEAD", org.dept_a1).await;
    let leader = create_user(&pool, "leader@corp.test", "LEADER", org.dept_a2).await;
    let admin = create_user(&pool, "admin@corp.test", "ADMIN", org.dept_a1).await;
    let member = create_user(&pool, "member@corp.test", "MEMBER", org.dept_a1).await;
    let app = common::build_test_app(pool);

    let f = Fixture {
        app,
        head: token_for(&head),
        leader: token_for(&leader),
        admin: token_for(&admin),
        member_id: member.id,
        member: token_for(&member),
        org,
    };

    let a1_project = create_project(&f, f.org.dept_a1, &f.head).await;
    let done = create_task(&f, a1_project, json!({ "name": "Audit", "assignee_user_ids": [f.member_id] }), &f.head).await;
    create_task(&f, a1_project, json!({ "name": "Migrate", "assignee_user_ids": [f.member_id] }), &f.head).await;
    let uri = format!("/api/tasks/{done}/close");
    let response = post_json_auth(f.app.clone(), &uri, json!({ "type": "COMPLETED" }), &f.head).await;
    assert_eq!(response.status(), StatusCode::OK);

    let b1_project = create_project(&f, f.org.dept_b1, &f.admin).await;
    create_task(&f, b1_project, json!({ "name": "Reconcile" }), &f.admin).await;

    f
}

async fn create_project(f: &Fixture, department_id: i64, token: &str) -> i64 {
    let body = json!({ "name": "Reporting", "department_id": department_id });
    let project = expect_data(post_json_auth(f.app.clone(), "/api/projects", body, token).await, StatusCode::CREATED).await;
    project["id"].as_i64().unwrap()
}

async fn create_task(f: &Fixture, project_id: i64, body: serde_json::Value, token: &str) -> i64 {
    let uri = format!("/api/projects/{project_id}/tasks");
    let task = expect_data(post_json_auth(f.app.clone(), &uri, body, token).await, StatusCode::CREATED).await;
    task["id"].as_i64().unwrap()
}

// ---------------------------------------------------------------------------
// Task report
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_member_cannot_view_reports(pool: PgPool) {
    let f = fixture(pool).await;
    let response = get_auth(f.app.clone(), "/api/reports/tasks", &f.member).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_head_report_covers_own_department(pool: PgPool) {
    let f = fixture(pool).await;
    let report = expect_data(get_auth(f.app.clone(), "/api/reports/tasks", &f.head).await, StatusCode::OK).await;

    assert_eq!(report["department_ids"], json!([f.org.dept_a1]));
    assert_eq!(report["summary"]["total"], 2);
    assert_eq!(report["summary"]["completed"], 1);
    assert_eq!(report["summary"]["open"], 1);
    assert_eq!(report["tasks"].as_array().unwrap().len(), 2);

    let assignees = report["summary"]["assignees"].as_array().unwrap();
    assert_eq!(assignees.len(), 1);
    assert_eq!(assignees[0]["user_id"], f.member_id);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_report_filters_outside_scope_are_forbidden(pool: PgPool) {
    let f = fixture(pool).await;

    let uri = format!("/api/reports/tasks?department_id={}", f.org.dept_b1);
    let response = get_auth(f.app.clone(), &uri, &f.head).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    let uri = format!("/api/reports/tasks?division_id={}", f.org.division_b);
    let response = get_auth(f.app.clone(), &uri, &f.leader).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_report_narrows_wide_filters_to_scope(pool: PgPool) {
    let f = fixture(pool).await;

    // A LEADER asking for the whole mission group only gets their division.
    let uri = format!("/api/reports/tasks?mission_group_id={}", f.org.mission_group);
    let report = expect_data(get_auth(f.app.clone(), &uri, &f.leader).await, StatusCode::OK).await;
    let mut departments: Vec<i64> = report["department_ids"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d.as_i64().unwrap())
        .collect();
    departments.sort_unstable();
    assert_eq!(departments, vec![f.org.dept_a1, f.org.dept_a2]);
    assert_eq!(report["summary"]["total"], 2);

    let report = expect_data(get_auth(f.app.clone(), &uri, &f.admin).await, StatusCode::OK).await;
    assert_eq!(report["department_ids"].as_array().unwrap().len(), 3);
    assert_eq!(report["summary"]["total"], 3);

    // Department beats division beats mission group.
    let uri = format!(
        "/api/reports/tasks?mission_group_id={}&department_id={}",
        f.org.mission_group, f.org.dept_b1
    );
    let report = expect_data(get_auth(f.app.clone(), &uri, &f.admin).await, StatusCode::OK).await;
    assert_eq!(report["department_ids"], json!([f.org.dept_b1]));
    assert_eq!(report["summary"]["total"], 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_report_window(pool: PgPool) {
    let f = fixture(pool).await;
    let today = Utc::now().format("%Y-%m-%d").to_string();

    // A date-only end bound includes the whole day.
    let uri = format!("/api/reports/tasks?start_date={today}&end_date={today}");
    let report = expect_data(get_auth(f.app.clone(), &uri, &f.head).await, StatusCode::OK).await;
    assert_eq!(report["summary"]["total"], 2);

    let uri = "/api/reports/tasks?start_date=2020-01-01&end_date=2020-01-31";
    let report = expect_data(get_auth(f.app.clone(), uri, &f.head).await, StatusCode::OK).await;
    assert_eq!(report["summary"]["total"], 0);

    let uri = "/api/reports/tasks?start_date=2020-02-01&end_date=2020-01-01";
    let response = get_auth(f.app.clone(), uri, &f.head).await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_dashboard_shows_own_work(pool: PgPool) {
    let f = fixture(pool).await;

    let dashboard = expect_data(get_auth(f.app.clone(), "/api/dashboard", &f.member).await, StatusCode::OK).await;
    assert_eq!(dashboard["stats"]["assigned"], 2);
    assert_eq!(dashboard["stats"]["open"], 1);
    assert_eq!(dashboard["stats"]["completed"], 1);
    assert_eq!(dashboard["my_tasks"].as_array().unwrap().len(), 1);
    assert_eq!(dashboard["my_tasks"][0]["name"], "Migrate");

    let dashboard = expect_data(get_auth(f.app.clone(), "/api/dashboard", &f.head).await, StatusCode::OK).await;
    assert_eq!(dashboard["stats"]["assigned"], 0);
    assert!(!dashboard["recent_activity"].as_array().unwrap().is_empty());
}
