//! Outbox repository
//!
//! Events are saved inside the same database transaction as the ledger
//! writes that require compensation, so an enqueued event is exactly as
//! durable as the failure it compensates.

use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, Row};

use super::models::{EventStatus, OutboxEvent};
use crate::error::AppError;

pub struct OutboxRepo;

impl OutboxRepo {
    /// Save a new event
    pub async fn save(
        executor: impl PgExecutor<'_>,
        event: &OutboxEvent,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO outbox_events (id, event_type, data, status, retry_count, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            "#,
        )
        .bind(&event.id)
        .bind(&event.event_type)
        .bind(&event.data)
        .bind(event.status.as_str())
        .bind(event.retry_count)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Fetch pending events in creation order
    pub async fn get_pending(
        executor: impl PgExecutor<'_>,
        limit: i64,
    ) -> Result<Vec<OutboxEvent>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, data, status, retry_count, created_at, processed_at, error
            FROM outbox_events
            WHERE status = 'PENDING'
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(executor)
        .await?;

        rows.iter().map(row_to_event).collect()
    }

    /// Mark an event as processed
    pub async fn mark_processed(
        executor: impl PgExecutor<'_>,
        event_id: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE outbox_events SET status = 'PROCESSED', processed_at = NOW() WHERE id = $1",
        )
        .bind(event_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Mark an event as terminally failed
    pub async fn mark_failed(
        executor: impl PgExecutor<'_>,
        event_id: &str,
        err_msg: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE outbox_events SET status = 'FAILED', error = $1 WHERE id = $2")
            .bind(err_msg)
            .bind(event_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Increment the retry counter for an event
    pub async fn increment_retry(
        executor: impl PgExecutor<'_>,
        event_id: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE outbox_events SET retry_count = retry_count + 1 WHERE id = $1")
            .bind(event_id)
            .execute(executor)
            .await?;

        Ok(())
    }
}

fn row_to_event(row: &PgRow) -> Result<OutboxEvent, AppError> {
    let status_str: String = row.get("status");
    let status = EventStatus::from_str(&status_str)
        .ok_or_else(|| AppError::DatabaseQuery(format!("invalid event status: {}", status_str)))?;

    Ok(OutboxEvent {
        id: row.get("id"),
        event_type: row.get("event_type"),
        data: row.get("data"),
        status,
        retry_count: row.get("retry_count"),
        created_at: row.get("created_at"),
        processed_at: row.get("processed_at"),
        error: row.get("error"),
    })
}
