//! HTTP-level tests for pinned tasks, the task search, activity feeds,
//! batch status / phase creation and the division overview.

mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{
    create_user, delete_auth, expect_data, expect_error, get_auth, post_json_auth, seed_org,
    token_for, Org,
};
use serde_json::{json, Value};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    app: Router,
    org: Org,
    head_id: i64,
    head: String,
    member_id: i64,
    member: String,
    user: String,
    outsider: String,
    project_id: i64,
}

/// HEAD, MEMBER and USER in `dept_a1` with one project owned by the HEAD,
/// plus a HEAD of `dept_b1`.
async fn fixture(pool: PgPool) -> Fixture {
    let org = seed_org(&pool).await;
    let head = create_user(&pool, "head@corp.test", "HEAD", org.dept_a1).await;
    let member = create_user(&pool, "member@corp.test", "MEMBER", org.dept_a1).await;
    let user = create_user(&pool, "user@corp.test", "USER", org.dept_a1).await;
    let outsider = create_user(&pool, "outsider@corp.test", "HEAD", org.dept_b1).await;

    let app = common::build_test_app(pool);
    let head_token = token_for(&head);
    let body = json!({ "name": "Analytics", "department_id": org.dept_a1 });
    let project = expect_data(
        post_json_auth(app.clone(), "/api/projects", body, &head_token).await,
        StatusCode::CREATED,
    )
    .await;

    Fixture {
        app,
        org,
        head_id: head.id,
        head: head_token,
        member_id: member.id,
        member: token_for(&member),
        user: token_for(&user),
        outsider: token_for(&outsider),
        project_id: project["id"].as_i64().unwrap(),
    }
}

async fn create_task(f: &Fixture, body: Value) -> Value {
    let uri = format!("/api/projects/{}/tasks", f.project_id);
    let response = post_json_auth(f.app.clone(), &uri, body, &f.head).await;
    expect_data(response, StatusCode::CREATED).await
}

// ---------------------------------------------------------------------------
// Pinned tasks
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_pin_list_and_unpin(pool: PgPool) {
    let f = fixture(pool).await;
    let task = create_task(&f, json!({ "name": "Weekly export" })).await;
    let task_id = task["id"].as_i64().unwrap();

    let body = json!({ "task_id": task_id });
    let pinned = expect_data(
        post_json_auth(f.app.clone(), "/api/users/me/pinned-tasks", body.clone(), &f.member).await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(pinned["id"], task_id);

    let response = post_json_auth(f.app.clone(), "/api/users/me/pinned-tasks", body, &f.member).await;
    expect_error(response, StatusCode::CONFLICT, "CONFLICT").await;

    let list = expect_data(
        get_auth(f.app.clone(), "/api/users/me/pinned-tasks", &f.member).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(list["total"], 1);
    assert_eq!(list["tasks"][0]["id"], task_id);
    assert!(list["tasks"][0]["pinned_at"].is_string());

    // Pins are per user.
    let other = expect_data(
        get_auth(f.app.clone(), "/api/users/me/pinned-tasks", &f.head).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(other["total"], 0);

    let uri = format!("/api/users/me/pinned-tasks/{task_id}");
    let response = delete_auth(f.app.clone(), &uri, &f.member).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = delete_auth(f.app.clone(), &uri, &f.member).await;
    expect_error(response, StatusCode::NOT_FOUND, "NOT_FOUND").await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_cannot_pin_invisible_or_missing_task(pool: PgPool) {
    let f = fixture(pool).await;
    let task = create_task(&f, json!({ "name": "Internal" })).await;

    let body = json!({ "task_id": task["id"] });
    let response = post_json_auth(f.app.clone(), "/api/users/me/pinned-tasks", body, &f.outsider).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    let body = json!({ "task_id": 999_999 });
    let response = post_json_auth(f.app.clone(), "/api/users/me/pinned-tasks", body, &f.member).await;
    expect_error(response, StatusCode::NOT_FOUND, "NOT_FOUND").await;
}

// ---------------------------------------------------------------------------
// Task search
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_task_search_filters_and_scope(pool: PgPool) {
    let f = fixture(pool).await;
    create_task(&f, json!({ "name": "Urgent fix", "priority": 1, "assignee_user_ids": [f.member_id] })).await;
    create_task(&f, json!({ "name": "Someday", "priority": 4 })).await;

    let response = get_auth(f.app.clone(), "/api/tasks", &f.member).await;
    let json = common::body_json(response).await;
    assert_eq!(json["pagination"]["total"], 2);
    // Newest first.
    assert_eq!(json["data"][0]["name"], "Someday");
    assert_eq!(json["data"][0]["comment_count"], 0);

    let uri = format!("/api/tasks?assignee_user_id={}", f.member_id);
    let json = common::body_json(get_auth(f.app.clone(), &uri, &f.member).await).await;
    assert_eq!(json["pagination"]["total"], 1);
    assert_eq!(json["data"][0]["name"], "Urgent fix");

    let json = common::body_json(get_auth(f.app.clone(), "/api/tasks?priority=4", &f.head).await).await;
    assert_eq!(json["pagination"]["total"], 1);

    let json = common::body_json(get_auth(f.app.clone(), "/api/tasks?limit=1&page=2", &f.head).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["pagination"]["has_prev"], true);

    let json = common::body_json(get_auth(f.app.clone(), "/api/tasks", &f.outsider).await).await;
    assert_eq!(json["pagination"]["total"], 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_task_search_rejects_bad_filters(pool: PgPool) {
    let f = fixture(pool).await;

    let response = get_auth(f.app.clone(), "/api/tasks?priority=9", &f.member).await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;

    let uri = format!("/api/tasks?project_id={}", f.project_id);
    let response = get_auth(f.app.clone(), &uri, &f.outsider).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;
}

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_activity_list_requires_reporting_role(pool: PgPool) {
    let f = fixture(pool).await;
    create_task(&f, json!({ "name": "Logged" })).await;

    let response = get_auth(f.app.clone(), "/api/activities", &f.member).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;
    let response = get_auth(f.app.clone(), "/api/activities/stats", &f.user).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    let json = common::body_json(get_auth(f.app.clone(), "/api/activities", &f.head).await).await;
    assert_eq!(json["pagination"]["total"], 1);
    assert_eq!(json["data"][0]["task_name"], "Logged");
    assert_eq!(json["data"][0]["project_id"], f.project_id);
    assert_eq!(json["data"][0]["user_id"], f.head_id);

    // Another department's HEAD sees none of it.
    let json = common::body_json(get_auth(f.app.clone(), "/api/activities", &f.outsider).await).await;
    assert_eq!(json["pagination"]["total"], 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_recent_activity_merges_sources(pool: PgPool) {
    let f = fixture(pool).await;
    let task = create_task(&f, json!({ "name": "Shared", "assignee_user_ids": [f.member_id] })).await;

    let uri = format!("/api/tasks/{}/comments", task["id"]);
    let body = json!({ "content": "Started on this" });
    expect_data(post_json_auth(f.app.clone(), &uri, body, &f.head).await, StatusCode::CREATED).await;

    let items = expect_data(
        get_auth(f.app.clone(), "/api/activities/recent", &f.member).await,
        StatusCode::OK,
    )
    .await;
    let items = items.as_array().unwrap();
    let comment = items.iter().find(|i| i["source"] == "comment").unwrap();
    assert!(comment["text"].as_str().unwrap().ends_with(": Started on this"));
    assert!(items.iter().any(|i| i["source"] == "notification"));

    let own = expect_data(
        get_auth(f.app.clone(), "/api/activities/recent?limit=1", &f.head).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(own.as_array().unwrap().len(), 1);
    assert_eq!(own[0]["source"], "history");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_activity_stats(pool: PgPool) {
    let f = fixture(pool).await;
    let task = create_task(&f, json!({ "name": "Counted" })).await;
    let uri = format!("/api/tasks/{}/comments", task["id"]);
    expect_data(
        post_json_auth(f.app.clone(), &uri, json!({ "content": "noted" }), &f.head).await,
        StatusCode::CREATED,
    )
    .await;

    let stats = expect_data(
        get_auth(f.app.clone(), "/api/activities/stats?period=14d", &f.head).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(stats["period_days"], 14);
    assert_eq!(stats["totals"]["total_activities"], 1);
    assert_eq!(stats["totals"]["total_comments"], 1);
    assert_eq!(stats["top_users"][0]["user_id"], f.head_id);
    assert_eq!(stats["top_tasks"][0]["task_name"], "Counted");
    let daily = stats["daily"].as_array().unwrap();
    assert_eq!(daily.len(), 14);
    assert_eq!(daily[13]["count"], 1);

    let uri = format!("/api/activities/stats?user_id={}", f.member_id);
    let stats = expect_data(get_auth(f.app.clone(), &uri, &f.head).await, StatusCode::OK).await;
    assert_eq!(stats["totals"]["total_activities"], 0);

    let response = get_auth(f.app.clone(), "/api/activities/stats?period=week", &f.head).await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;

    let uri = format!("/api/activities/stats?project_id={}", f.project_id);
    let response = get_auth(f.app.clone(), &uri, &f.outsider).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_project_and_user_activities(pool: PgPool) {
    let f = fixture(pool).await;
    create_task(&f, json!({ "name": "First" })).await;
    create_task(&f, json!({ "name": "Second" })).await;

    let uri = format!("/api/projects/{}/activities?limit=1", f.project_id);
    let json = common::body_json(get_auth(f.app.clone(), &uri, &f.member).await).await;
    assert_eq!(json["pagination"]["total"], 2);
    assert_eq!(json["pagination"]["has_next"], true);
    assert_eq!(json["data"][0]["task_name"], "Second");

    let uri = format!("/api/projects/{}/activities", f.project_id);
    let response = get_auth(f.app.clone(), &uri, &f.outsider).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    let uri = format!("/api/users/{}/activities", f.head_id);
    let json = common::body_json(get_auth(f.app.clone(), &uri, &f.head).await).await;
    assert_eq!(json["pagination"]["total"], 2);
}

// ---------------------------------------------------------------------------
// Batch creation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_batch_create_statuses(pool: PgPool) {
    let f = fixture(pool).await;
    let uri = format!("/api/projects/{}/statuses/batch", f.project_id);

    let body = json!({ "statuses": [
        { "name": "Review", "color": "#a855f7", "sort_order": 4, "status_type": "IN_PROGRESS" },
        { "name": "Shipped", "color": "#22c55e", "sort_order": 5, "status_type": "DONE" },
    ]});
    let created = expect_data(post_json_auth(f.app.clone(), &uri, body, &f.head).await, StatusCode::CREATED).await;
    assert_eq!(created.as_array().unwrap().len(), 2);
    assert_eq!(created[0]["name"], "Review");

    let uri_list = format!("/api/projects/{}/statuses", f.project_id);
    let all = expect_data(get_auth(f.app.clone(), &uri_list, &f.head).await, StatusCode::OK).await;
    assert_eq!(all.as_array().unwrap().len(), 5);

    let response = post_json_auth(f.app.clone(), &uri, json!({ "statuses": [] }), &f.head).await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;

    // One bad entry rejects the whole batch.
    let body = json!({ "statuses": [
        { "name": "Fine", "color": "#000000", "sort_order": 6, "status_type": "NOT_STARTED" },
        { "name": "Broken", "color": "green", "sort_order": 7, "status_type": "NOT_STARTED" },
    ]});
    let response = post_json_auth(f.app.clone(), &uri, body, &f.head).await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
    let all = expect_data(get_auth(f.app.clone(), &uri_list, &f.head).await, StatusCode::OK).await;
    assert_eq!(all.as_array().unwrap().len(), 5);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_batch_create_phases(pool: PgPool) {
    let f = fixture(pool).await;
    let uri = format!("/api/projects/{}/phases/batch", f.project_id);

    let body = json!({ "phases": [
        { "name": "Discovery", "sort_order": 1 },
        { "name": "Delivery", "sort_order": 2, "start_date": "2025-03-01", "end_date": "2025-06-30" },
    ]});
    let created = expect_data(post_json_auth(f.app.clone(), &uri, body, &f.head).await, StatusCode::CREATED).await;
    assert_eq!(created.as_array().unwrap().len(), 2);
    assert_eq!(created[1]["name"], "Delivery");

    let response = post_json_auth(f.app.clone(), &uri, json!({ "phases": [] }), &f.head).await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;

    let body = json!({ "phases": [{ "name": "Late", "sort_order": 3 }] });
    let response = post_json_auth(f.app.clone(), &uri, body, &f.member).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;
}

// ---------------------------------------------------------------------------
// Division overview
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_division_overview(pool: PgPool) {
    let f = fixture(pool).await;
    let task = create_task(&f, json!({ "name": "Overdue", "due_date": "2020-01-01", "priority": 1 })).await;
    let body = json!({ "task_id": task["id"] });
    expect_data(
        post_json_auth(f.app.clone(), "/api/users/me/pinned-tasks", body, &f.head).await,
        StatusCode::CREATED,
    )
    .await;

    let uri = format!("/api/divisions/{}/overview", f.org.division_a);
    let overview = expect_data(get_auth(f.app.clone(), &uri, &f.head).await, StatusCode::OK).await;
    assert_eq!(overview["division"]["id"], f.org.division_a);
    assert_eq!(overview["stats"]["total_projects"], 1);
    assert_eq!(overview["stats"]["total_tasks"], 1);
    assert_eq!(overview["stats"]["overdue_tasks"], 1);

    // A HEAD only sees their own department of the division.
    let departments = overview["departments"].as_array().unwrap();
    assert_eq!(departments.len(), 1);
    assert_eq!(departments[0]["id"], f.org.dept_a1);
    assert_eq!(departments[0]["personnel_count"], 3);

    let overdue = overview["critical_tasks"]["overdue"].as_array().unwrap();
    assert_eq!(overdue[0]["id"], task["id"]);
    assert_eq!(overdue[0]["is_pinned"], true);

    let response = get_auth(f.app.clone(), &uri, &f.outsider).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    let response = get_auth(f.app.clone(), "/api/divisions/999999/overview", &f.head).await;
    expect_error(response, StatusCode::NOT_FOUND, "NOT_FOUND").await;

    let bad = format!("{uri}?start_date=2025-06-01&end_date=2025-01-01");
    let response = get_auth(f.app.clone(), &bad, &f.head).await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
}
