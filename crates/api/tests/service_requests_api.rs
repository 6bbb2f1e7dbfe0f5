//! HTTP-level tests for the service request workflow: submission,
//! approval into a task, completion through that task, and feedback.

mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{
    create_user, delete_auth, expect_data, expect_error, get_auth, patch_json_auth,
    post_json_auth, seed_org, token_for,
};
use serde_json::{json, Value};
use sqlx::PgPool;

struct Fixture {
    app: Router,
    requester_id: i64,
    requester: String,
    head: String,
    member_id: i64,
    member: String,
    admin: String,
    outsider: String,
    project_id: i64,
}

/// A USER who submits, a HEAD who approves and a MEMBER who does the work,
/// all in `dept_a1`. An ADMIN and a USER of `dept_b1` stand outside.
async fn fixture(pool: PgPool) -> Fixture {
    let org = seed_org(&pool).await;
    let requester = create_user(&pool, "requester@corp.test", "USER", org.dept_a1).await;
    let head = create_user(&pool, "head@corp.test", "HEAD", org.dept_a1).await;
    let member = create_user(&pool, "member@corp.test", "MEMBER", org.dept_a1).await;
    let admin = create_user(&pool, "admin@corp.test", "ADMIN", org.dept_b1).await;
    let outsider = create_user(&pool, "outsider@corp.test", "USER", org.dept_b1).await;

    let app = common::build_test_app(pool);
    let head_token = token_for(&head);
    let body = json!({ "name": "Service desk", "department_id": org.dept_a1 });
    let project = expect_data(
        post_json_auth(app.clone(), "/api/projects", body, &head_token).await,
        StatusCode::CREATED,
    )
    .await;

    Fixture {
        app,
        requester_id: requester.id,
        requester: token_for(&requester),
        head: head_token,
        member_id: member.id,
        member: token_for(&member),
        admin: token_for(&admin),
        outsider: token_for(&outsider),
        project_id: project["id"].as_i64().unwrap(),
    }
}

fn request_body() -> Value {
    json!({
        "type": "DATA",
        "subject": "Quarterly enrolment figures",
        "description": "Need the enrolment numbers per faculty for the last four quarters.",
        "urgency": "HIGH",
        "purposes": ["EDUCATION"],
    })
}

async fn submit(f: &Fixture) -> Value {
    let response = post_json_auth(f.app.clone(), "/api/service-requests", request_body(), &f.requester).await;
    expect_data(response, StatusCode::CREATED).await
}

async fn approve(f: &Fixture, request_id: i64) -> Value {
    let uri = format!("/api/service-requests/{request_id}/approve");
    let body = json!({ "project_id": f.project_id, "assignee_user_ids": [f.member_id] });
    expect_data(post_json_auth(f.app.clone(), &uri, body, &f.head).await, StatusCode::OK).await
}

async fn unread(f: &Fixture, token: &str) -> i64 {
    let data = expect_data(
        get_auth(f.app.clone(), "/api/notifications/unread-count", token).await,
        StatusCode::OK,
    )
    .await;
    data["count"].as_i64().unwrap()
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_submit_request(pool: PgPool) {
    let f = fixture(pool).await;
    let request = submit(&f).await;

    assert_eq!(request["status"], "PENDING");
    assert_eq!(request["request_type"], "DATA");
    assert_eq!(request["requester_user_id"], f.requester_id);
    let number = request["request_number"].as_str().unwrap();
    assert!(number.starts_with("SR-"));
    assert!(number.ends_with("-00001"));

    // HEAD and ADMIN are approvers; the MEMBER is not.
    assert_eq!(unread(&f, &f.head).await, 1);
    assert_eq!(unread(&f, &f.admin).await, 1);
    assert_eq!(unread(&f, &f.member).await, 0);

    let second = submit(&f).await;
    assert!(second["request_number"].as_str().unwrap().ends_with("-00002"));

    let uri = format!("/api/service-requests/{}", second["id"]);
    let detail = expect_data(get_auth(f.app.clone(), &uri, &f.requester).await, StatusCode::OK).await;
    assert_eq!(detail["queue_position"], 2);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_submit_validation(pool: PgPool) {
    let f = fixture(pool).await;

    let mut no_purpose = request_body();
    no_purpose["purposes"] = json!([]);
    let mut short_subject = request_body();
    short_subject["subject"] = json!("Hi");
    let mut bad_type = request_body();
    bad_type["type"] = json!("COFFEE");

    for body in [no_purpose, short_subject, bad_type] {
        let response = post_json_auth(f.app.clone(), "/api/service-requests", body, &f.requester).await;
        expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_list_visibility(pool: PgPool) {
    let f = fixture(pool).await;
    let request = submit(&f).await;

    let data = expect_data(get_auth(f.app.clone(), "/api/service-requests", &f.member).await, StatusCode::OK).await;
    assert_eq!(data["requests"].as_array().unwrap().len(), 1);
    assert!(!data["available_fiscal_years"].as_array().unwrap().is_empty());

    let data = expect_data(get_auth(f.app.clone(), "/api/service-requests", &f.outsider).await, StatusCode::OK).await;
    assert!(data["requests"].as_array().unwrap().is_empty());

    let data = expect_data(get_auth(f.app.clone(), "/api/service-requests", &f.admin).await, StatusCode::OK).await;
    assert_eq!(data["requests"].as_array().unwrap().len(), 1);

    let data = expect_data(
        get_auth(f.app.clone(), "/api/service-requests?my_requests=true", &f.head).await,
        StatusCode::OK,
    )
    .await;
    assert!(data["requests"].as_array().unwrap().is_empty());

    let uri = format!("/api/service-requests/{}", request["id"]);
    let response = get_auth(f.app.clone(), &uri, &f.outsider).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    let response = get_auth(f.app.clone(), "/api/service-requests?fiscal_years=abc", &f.admin).await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_requester_edits_while_pending(pool: PgPool) {
    let f = fixture(pool).await;
    let request = submit(&f).await;
    let uri = format!("/api/service-requests/{}", request["id"]);

    let body = json!({ "subject": "Quarterly enrolment by faculty" });
    let updated = expect_data(patch_json_auth(f.app.clone(), &uri, body.clone(), &f.requester).await, StatusCode::OK).await;
    assert_eq!(updated["subject"], "Quarterly enrolment by faculty");

    let response = patch_json_auth(f.app.clone(), &uri, body, &f.head).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_approval_creates_task_and_closing_completes_request(pool: PgPool) {
    let f = fixture(pool).await;
    let request = submit(&f).await;
    let request_id = request["id"].as_i64().unwrap();

    let approval = approve(&f, request_id).await;
    assert_eq!(approval["request"]["status"], "APPROVED");
    let task = &approval["task"];
    assert_eq!(task["project_id"], f.project_id);
    assert_eq!(task["assignee_user_id"], f.member_id);
    assert_eq!(approval["request"]["task_id"], task["id"]);
    assert!(task["name"].as_str().unwrap().contains(request["request_number"].as_str().unwrap()));
    assert_eq!(unread(&f, &f.requester).await, 1);

    let uri = format!("/api/service-requests/{request_id}/approve");
    let body = json!({ "project_id": f.project_id });
    let response = post_json_auth(f.app.clone(), &uri, body, &f.head).await;
    expect_error(response, StatusCode::CONFLICT, "CONFLICT").await;

    let close_uri = format!("/api/tasks/{}/close", task["id"]);
    let response = post_json_auth(f.app.clone(), &close_uri, json!({ "type": "COMPLETED" }), &f.member).await;
    assert_eq!(response.status(), StatusCode::OK);

    let uri = format!("/api/service-requests/{request_id}");
    let detail = expect_data(get_auth(f.app.clone(), &uri, &f.requester).await, StatusCode::OK).await;
    assert_eq!(detail["status"], "COMPLETED");
    assert!(detail["completed_at"].is_string());
    assert!(detail["queue_position"].is_null());
    assert_eq!(unread(&f, &f.requester).await, 2);

    let timeline_uri = format!("/api/service-requests/{request_id}/timeline");
    let timeline = expect_data(get_auth(f.app.clone(), &timeline_uri, &f.requester).await, StatusCode::OK).await;
    let actions: Vec<&str> = timeline
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["action"].as_str().unwrap())
        .collect();
    for action in ["CREATED", "APPROVED", "TASK_CREATED", "COMPLETED"] {
        assert!(actions.contains(&action), "missing {action} in {actions:?}");
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_aborting_the_task_cancels_request(pool: PgPool) {
    let f = fixture(pool).await;
    let request = submit(&f).await;
    let approval = approve(&f, request["id"].as_i64().unwrap()).await;

    let close_uri = format!("/api/tasks/{}/close", approval["task"]["id"]);
    let response = post_json_auth(f.app.clone(), &close_uri, json!({ "type": "ABORTED" }), &f.head).await;
    assert_eq!(response.status(), StatusCode::OK);

    let uri = format!("/api/service-requests/{}", request["id"]);
    let detail = expect_data(get_auth(f.app.clone(), &uri, &f.requester).await, StatusCode::OK).await;
    assert_eq!(detail["status"], "CANCELLED");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_only_approvers_decide(pool: PgPool) {
    let f = fixture(pool).await;
    let request = submit(&f).await;

    let uri = format!("/api/service-requests/{}/approve", request["id"]);
    let response = post_json_auth(f.app.clone(), &uri, json!({ "project_id": f.project_id }), &f.member).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    let uri = format!("/api/service-requests/{}/reject", request["id"]);
    let response = post_json_auth(f.app.clone(), &uri, json!({ "reason": "No" }), &f.requester).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_reject_requires_reason(pool: PgPool) {
    let f = fixture(pool).await;
    let request = submit(&f).await;
    let uri = format!("/api/service-requests/{}/reject", request["id"]);

    let response = post_json_auth(f.app.clone(), &uri, json!({ "reason": "   " }), &f.head).await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;

    let rejected = expect_data(
        post_json_auth(f.app.clone(), &uri, json!({ "reason": " Data is already public " }), &f.head).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(rejected["status"], "REJECTED");
    assert_eq!(rejected["rejection_reason"], "Data is already public");

    let approve_uri = format!("/api/service-requests/{}/approve", request["id"]);
    let response = post_json_auth(f.app.clone(), &approve_uri, json!({ "project_id": f.project_id }), &f.head).await;
    expect_error(response, StatusCode::CONFLICT, "CONFLICT").await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_cancel_rules(pool: PgPool) {
    let f = fixture(pool).await;
    let first = submit(&f).await;
    let second = submit(&f).await;

    let uri = format!("/api/service-requests/{}", first["id"]);
    let response = delete_auth(f.app.clone(), &uri, &f.head).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    let cancelled = expect_data(delete_auth(f.app.clone(), &uri, &f.requester).await, StatusCode::OK).await;
    assert_eq!(cancelled["status"], "CANCELLED");

    let response = delete_auth(f.app.clone(), &uri, &f.requester).await;
    expect_error(response, StatusCode::CONFLICT, "CONFLICT").await;

    // An ADMIN may cancel someone else's request, and the requester hears about it.
    let before = unread(&f, &f.requester).await;
    let uri = format!("/api/service-requests/{}", second["id"]);
    let cancelled = expect_data(delete_auth(f.app.clone(), &uri, &f.admin).await, StatusCode::OK).await;
    assert_eq!(cancelled["status"], "CANCELLED");
    assert_eq!(unread(&f, &f.requester).await, before + 1);
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_feedback_on_completed_request(pool: PgPool) {
    let f = fixture(pool).await;
    let request = submit(&f).await;
    let request_id = request["id"].as_i64().unwrap();
    let feedback_uri = format!("/api/service-requests/{request_id}/feedback");

    let response = post_json_auth(f.app.clone(), &feedback_uri, json!({ "rating": 8 }), &f.requester).await;
    expect_error(response, StatusCode::CONFLICT, "CONFLICT").await;

    let approval = approve(&f, request_id).await;
    let close_uri = format!("/api/tasks/{}/close", approval["task"]["id"]);
    post_json_auth(f.app.clone(), &close_uri, json!({ "type": "COMPLETED" }), &f.member).await;

    let response = post_json_auth(f.app.clone(), &feedback_uri, json!({ "rating": 11 }), &f.requester).await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;

    let response = post_json_auth(f.app.clone(), &feedback_uri, json!({ "rating": 8 }), &f.head).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    let feedback = expect_data(
        post_json_auth(f.app.clone(), &feedback_uri, json!({ "rating": 9, "comment": "Fast" }), &f.requester).await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(feedback["rating"], 9);

    let admin_before = unread(&f, &f.admin).await;
    let feedback = expect_data(
        post_json_auth(f.app.clone(), &feedback_uri, json!({ "rating": 2 }), &f.requester).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(feedback["rating"], 2);
    assert_eq!(unread(&f, &f.admin).await, admin_before + 1);

    let stored = expect_data(get_auth(f.app.clone(), &feedback_uri, &f.head).await, StatusCode::OK).await;
    assert_eq!(stored["rating"], 2);

    let response = get_auth(f.app.clone(), "/api/service-requests/feedback/stats", &f.head).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    let stats = expect_data(
        get_auth(f.app.clone(), "/api/service-requests/feedback/stats?type=DATA", &f.admin).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["low_rating_count"], 1);
    assert_eq!(stats["distribution"].as_array().unwrap().len(), 10);
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_request_comments_notify_the_other_party(pool: PgPool) {
    let f = fixture(pool).await;
    let request = submit(&f).await;
    let uri = format!("/api/service-requests/{}/comments", request["id"]);

    let before = unread(&f, &f.requester).await;
    let body = json!({ "content": "Which faculties exactly?" });
    let comment = expect_data(post_json_auth(f.app.clone(), &uri, body, &f.head).await, StatusCode::CREATED).await;
    assert_eq!(comment["content"], "Which faculties exactly?");
    assert_eq!(unread(&f, &f.requester).await, before + 1);

    // The author is not notified of their own comment.
    let before = unread(&f, &f.requester).await;
    let body = json!({ "content": "All of them" });
    expect_data(post_json_auth(f.app.clone(), &uri, body, &f.requester).await, StatusCode::CREATED).await;
    assert_eq!(unread(&f, &f.requester).await, before);

    let list = expect_data(get_auth(f.app.clone(), &uri, &f.requester).await, StatusCode::OK).await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["content"], "Which faculties exactly?");
    assert_eq!(list[1]["user_id"], f.requester_id);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_request_comment_validation_and_visibility(pool: PgPool) {
    let f = fixture(pool).await;
    let request = submit(&f).await;
    let uri = format!("/api/service-requests/{}/comments", request["id"]);

    let response = post_json_auth(f.app.clone(), &uri, json!({ "content": "   " }), &f.requester).await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;

    let response = post_json_auth(f.app.clone(), &uri, json!({ "content": "Hello" }), &f.outsider).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    let response = get_auth(f.app.clone(), "/api/service-requests/999999/comments", &f.requester).await;
    expect_error(response, StatusCode::NOT_FOUND, "NOT_FOUND").await;
}
