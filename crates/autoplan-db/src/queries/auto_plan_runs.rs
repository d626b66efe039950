//! Database query functions for the `auto_plan_runs` table.
//!
//! A row is the exclusive claim on generating one month's automatic plan.
//! Claiming is a single statement so two concurrent requests cannot both
//! obtain it.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::AutoPlanRun;

/// Minutes after which a `running` claim is treated as abandoned.
pub const STALE_RUN_MINUTES: i32 = 15;

/// Try to claim `(user_id, month)` for a generation run.
///
/// Succeeds when no claim exists, when the previous run failed, or when a
/// running claim is older than [`STALE_RUN_MINUTES`]. Returns `None` when
/// another run holds or completed the month. The returned `started_at`
/// identifies this claim to [`complete_run`] and [`fail_run`].
pub async fn claim_month(pool: &PgPool, user_id: Uuid, month: &str) -> Result<Option<AutoPlanRun>> {
    let run = sqlx::query_as::<_, AutoPlanRun>(
        "INSERT INTO auto_plan_runs (user_id, month) VALUES ($1, $2) \
         ON CONFLICT (user_id, month) DO UPDATE \
             SET status = 'running', item_count = 0, started_at = now(), finished_at = NULL \
             WHERE auto_plan_runs.status = 'failed' \
                OR (auto_plan_runs.status = 'running' \
                    AND auto_plan_runs.started_at < now() - make_interval(mins => $3)) \
         RETURNING *",
    )
    .bind(user_id)
    .bind(month)
    .bind(STALE_RUN_MINUTES)
    .fetch_optional(pool)
    .await
    .context("failed to claim auto-plan month")?;

    Ok(run)
}

/// Mark the claim started at `claimed_at` completed with the number of
/// items persisted.
///
/// Errors when that claim is no longer held, e.g. because it went stale and
/// another run took the month over. Inside a transaction this makes the
/// caller roll back its items.
pub async fn complete_run<'e, E>(
    executor: E,
    user_id: Uuid,
    month: &str,
    claimed_at: DateTime<Utc>,
    item_count: i32,
) -> Result<()>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE auto_plan_runs \
         SET status = 'completed', item_count = $4, finished_at = now() \
         WHERE user_id = $1 AND month = $2 AND status = 'running' AND started_at = $3",
    )
    .bind(user_id)
    .bind(month)
    .bind(claimed_at)
    .bind(item_count)
    .execute(executor)
    .await
    .context("failed to complete auto-plan run")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("auto-plan claim {user_id}/{month} started at {claimed_at} is no longer held");
    }
    Ok(())
}

/// Release the claim started at `claimed_at` so the month can be generated
/// again. A claim taken over by another run is left alone.
pub async fn fail_run(pool: &PgPool, user_id: Uuid, month: &str, claimed_at: DateTime<Utc>) -> Result<()> {
    sqlx::query(
        "UPDATE auto_plan_runs \
         SET status = 'failed', finished_at = now() \
         WHERE user_id = $1 AND month = $2 AND status = 'running' AND started_at = $3",
    )
    .bind(user_id)
    .bind(month)
    .bind(claimed_at)
    .execute(pool)
    .await
    .context("failed to release auto-plan run")?;

    Ok(())
}

/// Fetch the claim for a month, if any.
pub async fn get_run(pool: &PgPool, user_id: Uuid, month: &str) -> Result<Option<AutoPlanRun>> {
    let run = sqlx::query_as::<_, AutoPlanRun>(
        "SELECT * FROM auto_plan_runs WHERE user_id = $1 AND month = $2",
    )
    .bind(user_id)
    .bind(month)
    .fetch_optional(pool)
    .await
    .context("failed to fetch auto-plan run")?;

    Ok(run)
}

/// Remove the claim entirely (admin cleanup).
pub async fn delete_run<'e, E>(executor: E, user_id: Uuid, month: &str) -> Result<bool>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM auto_plan_runs WHERE user_id = $1 AND month = $2")
        .bind(user_id)
        .bind(month)
        .execute(executor)
        .await
        .context("failed to delete auto-plan run")?;

    Ok(result.rows_affected() > 0)
}
