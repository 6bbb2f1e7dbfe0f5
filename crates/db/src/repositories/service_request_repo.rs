//! Repository for `service_requests` and `request_timelines`.

use chrono::{Datelike, Utc};
use projectflows_core::service_request::{
    next_request_number, request_number_prefix, RequestStatus, TimelineAction,
    APPROVED_TASK_PRIORITY,
};
use projectflows_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::service_request::{
    ApproveRequest, CreateServiceRequest, NewTimeline, RequestTimeline, ServiceRequest,
    ServiceRequestFilter, UpdateServiceRequest,
};
use crate::models::task::{CreateTask, Task};
use crate::repositories::TaskRepo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, request_number, request_type, status, urgency, subject, description, \
                       purposes, other_purpose, location, requester_user_id, approver_user_id, \
                       approved_at, rejection_reason, task_id, fiscal_year, completed_at, \
                       cancelled_at, created_at, updated_at";

const TIMELINE_COLUMNS: &str = "id, request_id, action, description, user_id, created_at";

/// Advisory lock key serializing request number allocation.
const NUMBER_LOCK_KEY: i64 = 0x5352_4e55_4d42;

/// Provides the service request workflow.
pub struct ServiceRequestRepo;

impl ServiceRequestRepo {
    /// Insert a request under the next free `SR-YYYY-NNNNN` number and
    /// record its CREATED timeline entry.
    pub async fn create(
        pool: &PgPool,
        input: &CreateServiceRequest,
        timeline_text: &str,
    ) -> Result<ServiceRequest, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(NUMBER_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let year = Utc::now().year();
        let last: Option<String> = sqlx::query_scalar(
            "SELECT request_number FROM service_requests
             WHERE request_number LIKE $1 || '%'
             ORDER BY split_part(request_number, '-', 3)::INT DESC
             LIMIT 1",
        )
        .bind(request_number_prefix(year))
        .fetch_optional(&mut *tx)
        .await?;
        let number = next_request_number(year, last.as_deref());

        let query = format!(
            "INSERT INTO service_requests
                (request_number, request_type, urgency, subject, description, purposes,
                 other_purpose, location, requester_user_id, fiscal_year)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        let request = sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(&number)
            .bind(&input.request_type)
            .bind(&input.urgency)
            .bind(&input.subject)
            .bind(&input.description)
            .bind(&input.purposes)
            .bind(&input.other_purpose)
            .bind(&input.location)
            .bind(input.requester_user_id)
            .bind(input.fiscal_year)
            .fetch_one(&mut *tx)
            .await?;

        Self::insert_timeline(
            &mut *tx,
            request.id,
            &NewTimeline {
                action: TimelineAction::Created.as_str(),
                description: timeline_text.to_string(),
                user_id: Some(input.requester_user_id),
            },
        )
        .await?;

        tx.commit().await?;
        Ok(request)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ServiceRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM service_requests WHERE id = $1");
        sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Requests matching `filter`, newest first.
    pub async fn list(
        pool: &PgPool,
        filter: &ServiceRequestFilter,
    ) -> Result<Vec<ServiceRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM service_requests sr
             WHERE ($1::TEXT IS NULL OR sr.request_type = $1)
               AND ($2::TEXT IS NULL OR sr.status = $2)
               AND (CARDINALITY($3::INT[]) = 0 OR sr.fiscal_year = ANY($3))
               AND ($4::TEXT IS NULL
                    OR sr.request_number ILIKE '%' || $4 || '%'
                    OR sr.subject ILIKE '%' || $4 || '%'
                    OR sr.description ILIKE '%' || $4 || '%')
               AND ($5::BIGINT IS NULL OR sr.requester_user_id = $5)
               AND ($6::BIGINT[] IS NULL OR EXISTS (
                    SELECT 1 FROM users u
                    WHERE u.id = sr.requester_user_id AND u.department_id = ANY($6)))
             ORDER BY sr.created_at DESC, sr.id DESC"
        );
        sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(&filter.request_type)
            .bind(&filter.status)
            .bind(&filter.fiscal_years)
            .bind(&filter.search)
            .bind(filter.requester_user_id)
            .bind(&filter.requester_department_ids)
            .fetch_all(pool)
            .await
    }

    /// 1-based position among PENDING requests of the same type, oldest
    /// first. `None` for requests that are no longer pending.
    pub async fn queue_position(
        pool: &PgPool,
        request: &ServiceRequest,
    ) -> Result<Option<i64>, sqlx::Error> {
        if request.status() != Some(RequestStatus::Pending) {
            return Ok(None);
        }
        let position: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM service_requests
             WHERE request_type = $1 AND status = 'PENDING'
               AND (created_at, id) <= ($2, $3)",
        )
        .bind(&request.request_type)
        .bind(request.created_at)
        .bind(request.id)
        .fetch_one(pool)
        .await?;
        Ok(position)
    }

    /// Edit a PENDING request. Only non-`None` fields are applied.
    ///
    /// Returns `None` if the request is missing or no longer pending.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateServiceRequest,
    ) -> Result<Option<ServiceRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE service_requests SET
                urgency = COALESCE($2, urgency),
                subject = COALESCE($3, subject),
                description = COALESCE($4, description),
                purposes = COALESCE($5, purposes),
                other_purpose = COALESCE($6, other_purpose),
                location = COALESCE($7, location)
             WHERE id = $1 AND status = 'PENDING'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(id)
            .bind(&input.urgency)
            .bind(&input.subject)
            .bind(&input.description)
            .bind(&input.purposes)
            .bind(&input.other_purpose)
            .bind(&input.location)
            .fetch_optional(pool)
            .await
    }

    /// Cancel a PENDING request. Returns `None` if it is no longer pending.
    pub async fn cancel(
        pool: &PgPool,
        id: DbId,
        actor_id: DbId,
        timeline_text: &str,
    ) -> Result<Option<ServiceRequest>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE service_requests SET status = 'CANCELLED', cancelled_at = NOW()
             WHERE id = $1 AND status = 'PENDING'
             RETURNING {COLUMNS}"
        );
        let Some(request) = sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        Self::insert_timeline(
            &mut *tx,
            id,
            &NewTimeline {
                action: TimelineAction::Cancelled.as_str(),
                description: timeline_text.to_string(),
                user_id: Some(actor_id),
            },
        )
        .await?;

        tx.commit().await?;
        Ok(Some(request))
    }

    /// Approve a PENDING request: create the linked task, mark the request
    /// APPROVED and record APPROVED and TASK_CREATED timeline entries, all in
    /// one transaction.
    ///
    /// Returns `None` (and writes nothing) if the request is no longer pending.
    pub async fn approve(
        pool: &PgPool,
        id: DbId,
        input: &ApproveRequest,
        approved_text: &str,
        task_created_text: &str,
    ) -> Result<Option<(ServiceRequest, Task)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let task = TaskRepo::insert(
            &mut *tx,
            &CreateTask {
                project_id: input.project_id,
                name: input.task_name.clone(),
                description: Some(input.task_description.clone()),
                status_id: input.status_id,
                priority: APPROVED_TASK_PRIORITY,
                difficulty: None,
                creator_user_id: input.approver_user_id,
                parent_task_id: None,
                phase_id: None,
                start_date: None,
                due_date: None,
                assignee_user_ids: input.assignee_user_ids.clone(),
            },
            &input.history_text,
        )
        .await?;

        let query = format!(
            "UPDATE service_requests SET
                status = 'APPROVED',
                approver_user_id = $2,
                approved_at = NOW(),
                task_id = $3
             WHERE id = $1 AND status = 'PENDING'
             RETURNING {COLUMNS}"
        );
        let Some(request) = sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(id)
            .bind(input.approver_user_id)
            .bind(task.id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        for (action, text) in [
            (TimelineAction::Approved, approved_text),
            (TimelineAction::TaskCreated, task_created_text),
        ] {
            Self::insert_timeline(
                &mut *tx,
                id,
                &NewTimeline {
                    action: action.as_str(),
                    description: text.to_string(),
                    user_id: Some(input.approver_user_id),
                },
            )
            .await?;
        }

        tx.commit().await?;
        Ok(Some((request, task)))
    }

    /// Reject a PENDING request. Returns `None` if it is no longer pending.
    pub async fn reject(
        pool: &PgPool,
        id: DbId,
        approver_id: DbId,
        reason: &str,
        timeline_text: &str,
    ) -> Result<Option<ServiceRequest>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE service_requests SET
                status = 'REJECTED',
                approver_user_id = $2,
                rejection_reason = $3
             WHERE id = $1 AND status = 'PENDING'
             RETURNING {COLUMNS}"
        );
        let Some(request) = sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(id)
            .bind(approver_id)
            .bind(reason)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        Self::insert_timeline(
            &mut *tx,
            id,
            &NewTimeline {
                action: TimelineAction::Rejected.as_str(),
                description: timeline_text.to_string(),
                user_id: Some(approver_id),
            },
        )
        .await?;

        tx.commit().await?;
        Ok(Some(request))
    }

    /// Finish the request linked to a closed task.
    ///
    /// Only APPROVED or IN_PROGRESS requests move; anything else is left as is.
    pub(crate) async fn finish_for_task(
        conn: &mut PgConnection,
        task_id: DbId,
        status: RequestStatus,
        timeline_text: &str,
        actor_id: DbId,
    ) -> Result<Option<ServiceRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE service_requests SET
                status = $2,
                completed_at = CASE WHEN $2 = 'COMPLETED' THEN NOW() ELSE completed_at END,
                cancelled_at = CASE WHEN $2 = 'CANCELLED' THEN NOW() ELSE cancelled_at END
             WHERE task_id = $1 AND status IN ('APPROVED', 'IN_PROGRESS')
             RETURNING {COLUMNS}"
        );
        let Some(request) = sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(task_id)
            .bind(status.as_str())
            .fetch_optional(&mut *conn)
            .await?
        else {
            return Ok(None);
        };

        let action = match status {
            RequestStatus::Completed => TimelineAction::Completed,
            _ => TimelineAction::Cancelled,
        };
        Self::insert_timeline(
            &mut *conn,
            request.id,
            &NewTimeline {
                action: action.as_str(),
                description: timeline_text.to_string(),
                user_id: Some(actor_id),
            },
        )
        .await?;

        Ok(Some(request))
    }

    /// Timeline of a request, oldest first.
    pub async fn timeline(
        pool: &PgPool,
        request_id: DbId,
    ) -> Result<Vec<RequestTimeline>, sqlx::Error> {
        let query = format!(
            "SELECT {TIMELINE_COLUMNS} FROM request_timelines
             WHERE request_id = $1
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, RequestTimeline>(&query)
            .bind(request_id)
            .fetch_all(pool)
            .await
    }

    /// Append a timeline entry outside any other write.
    pub async fn add_timeline(
        pool: &PgPool,
        request_id: DbId,
        entry: &NewTimeline,
    ) -> Result<(), sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::insert_timeline(&mut *conn, request_id, entry).await
    }

    async fn insert_timeline(
        conn: &mut PgConnection,
        request_id: DbId,
        entry: &NewTimeline,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO request_timelines (request_id, action, description, user_id)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(request_id)
        .bind(entry.action)
        .bind(&entry.description)
        .bind(entry.user_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}
