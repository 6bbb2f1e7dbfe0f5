//! Integration tests for the organization hierarchy and users.
//!
//! - Hierarchy loading ignores soft-deleted units
//! - Department delete is guarded by live dependents
//! - Email uniqueness and case-insensitive lookup
//! - Login bookkeeping (failed count, lock, reset)

use assert_matches::assert_matches;
use projectflows_core::roles::Role;
use projectflows_core::scope::{resolve_accessible_scope, ScopeKind};
use projectflows_db::models::organization::{CreateDepartment, CreateDivision, CreateMissionGroup};
use projectflows_db::models::user::{CreateUser, UserFilter};
use projectflows_db::repositories::{OrganizationRepo, UserRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_department(pool: &PgPool, name: &str) -> (i64, i64, i64) {
    let mg = OrganizationRepo::create_mission_group(
        pool,
        &CreateMissionGroup {
            name: format!("{name} MG"),
        },
    )
    .await
    .unwrap();
    let div = OrganizationRepo::create_division(
        pool,
        &CreateDivision {
            mission_group_id: mg.id,
            name: format!("{name} Division"),
        },
    )
    .await
    .unwrap();
    let dept = OrganizationRepo::create_department(
        pool,
        &CreateDepartment {
            division_id: div.id,
            name: name.to_string(),
            tel: None,
        },
    )
    .await
    .unwrap();
    (mg.id, div.id, dept.id)
}

fn new_user(email: &str, role: &str, department_id: Option<i64>) -> CreateUser {
    CreateUser {
        email: email.to_string(),
        password_hash: "not-a-real-hash".to_string(),
        full_name: "Test User".to_string(),
        role: role.to_string(),
        department_id,
        additional_roles: None,
        job_title: None,
        phone: None,
    }
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_hierarchy_skips_deleted_departments(pool: PgPool) {
    let (mg, div, dept) = seed_department(&pool, "Survey").await;
    let extra = OrganizationRepo::create_department(
        &pool,
        &CreateDepartment {
            division_id: div,
            name: "Archive".to_string(),
            tel: None,
        },
    )
    .await
    .unwrap();

    assert!(OrganizationRepo::soft_delete_department(&pool, extra.id).await.unwrap());
    assert!(!OrganizationRepo::soft_delete_department(&pool, extra.id).await.unwrap());

    let hierarchy = OrganizationRepo::load_hierarchy(&pool).await.unwrap();
    assert!(hierarchy.contains_department(dept));
    assert!(!hierarchy.contains_department(extra.id));
    assert_eq!(hierarchy.mission_group_of(dept), Some(mg));

    let leader = UserRepo::create(&pool, &new_user("leader@example.com", "LEADER", Some(dept)))
        .await
        .unwrap();
    let scope = resolve_accessible_scope(Some(&leader.actor()), &hierarchy);
    assert_eq!(scope.kind, ScopeKind::Department);
    assert_eq!(scope.department_list(), vec![dept]);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_department_dependents(pool: PgPool) {
    let (_, _, dept) = seed_department(&pool, "Planning").await;
    assert_eq!(OrganizationRepo::department_dependents(&pool, dept).await.unwrap(), 0);

    UserRepo::create(&pool, &new_user("member@example.com", "MEMBER", Some(dept)))
        .await
        .unwrap();
    assert_eq!(OrganizationRepo::department_dependents(&pool, dept).await.unwrap(), 1);
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_email_rejected(pool: PgPool) {
    UserRepo::create(&pool, &new_user("dup@example.com", "USER", None))
        .await
        .unwrap();
    let result = UserRepo::create(&pool, &new_user("dup@example.com", "USER", None)).await;

    assert_matches!(result, Err(sqlx::Error::Database(e)) => {
        assert_eq!(e.constraint(), Some("uq_users_email"));
    });
}

#[sqlx::test(migrations = "./migrations")]
async fn test_find_by_email_is_case_insensitive(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("mixed@example.com", "MEMBER", None))
        .await
        .unwrap();
    let found = UserRepo::find_by_email(&pool, "MIXED@example.com").await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));
    assert_eq!(user.role(), Role::Member);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_soft_deleted_user_hidden(pool: PgPool) {
    let (_, _, dept) = seed_department(&pool, "Ops").await;
    let user = UserRepo::create(&pool, &new_user("gone@example.com", "MEMBER", Some(dept)))
        .await
        .unwrap();

    assert!(UserRepo::soft_delete(&pool, user.id).await.unwrap());
    assert!(UserRepo::find_by_id(&pool, user.id).await.unwrap().is_none());

    let filter = UserFilter {
        department_ids: Some(vec![dept]),
        limit: 50,
        ..Default::default()
    };
    assert_eq!(UserRepo::count(&pool, &filter).await.unwrap(), 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_failed_login_bookkeeping(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("login@example.com", "USER", None))
        .await
        .unwrap();

    assert_eq!(UserRepo::increment_failed_login(&pool, user.id).await.unwrap(), 1);
    assert_eq!(UserRepo::increment_failed_login(&pool, user.id).await.unwrap(), 2);

    let until = chrono::Utc::now() + chrono::Duration::minutes(15);
    UserRepo::lock_account(&pool, user.id, until).await.unwrap();
    let locked = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert!(locked.locked_until.is_some());

    UserRepo::record_successful_login(&pool, user.id).await.unwrap();
    let reset = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(reset.failed_login_count, 0);
    assert!(reset.locked_until.is_none());
    assert!(reset.last_login_at.is_some());
}
