//! Database query functions for the `calendar_items` table.
//!
//! Month-scoped queries take an inclusive `[from, to]` date range so callers
//! decide how a month maps to calendar days.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::{CalendarItem, CalendarItemStatus, ItemMetadata};

/// A calendar item ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCalendarItem {
    pub user_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: Option<NaiveTime>,
    pub topic: String,
    pub script: Option<String>,
    pub caption: Option<String>,
    pub hashtags: Option<String>,
    pub status: CalendarItemStatus,
    pub metadata: ItemMetadata,
}

/// Insert a calendar item and return the stored row.
pub async fn insert_calendar_item<'e, E>(executor: E, item: &NewCalendarItem) -> Result<CalendarItem>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, CalendarItem>(
        "INSERT INTO calendar_items \
             (user_id, scheduled_date, scheduled_time, topic, script, caption, hashtags, status, metadata) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING *",
    )
    .bind(item.user_id)
    .bind(item.scheduled_date)
    .bind(item.scheduled_time)
    .bind(&item.topic)
    .bind(&item.script)
    .bind(&item.caption)
    .bind(&item.hashtags)
    .bind(item.status)
    .bind(Json(&item.metadata))
    .fetch_one(executor)
    .await
    .with_context(|| format!("failed to insert calendar item for {}", item.scheduled_date))?;

    Ok(row)
}

/// Fetch a calendar item owned by `user_id`.
pub async fn get_calendar_item(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<CalendarItem>> {
    let item = sqlx::query_as::<_, CalendarItem>(
        "SELECT * FROM calendar_items WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch calendar item")?;

    Ok(item)
}

/// List a user's items between two dates (inclusive), in posting order.
pub async fn list_items_in_range(
    pool: &PgPool,
    user_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<CalendarItem>> {
    let items = sqlx::query_as::<_, CalendarItem>(
        "SELECT * FROM calendar_items \
         WHERE user_id = $1 AND scheduled_date BETWEEN $2 AND $3 \
         ORDER BY scheduled_date ASC, scheduled_time ASC NULLS LAST, created_at ASC",
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
    .context("failed to list calendar items")?;

    Ok(items)
}

/// Distinct dates between `from` and `to` that already hold an item.
pub async fn occupied_dates(
    pool: &PgPool,
    user_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<NaiveDate>> {
    let rows: Vec<(NaiveDate,)> = sqlx::query_as(
        "SELECT DISTINCT scheduled_date FROM calendar_items \
         WHERE user_id = $1 AND scheduled_date BETWEEN $2 AND $3 \
         ORDER BY scheduled_date",
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
    .context("failed to list occupied dates")?;

    Ok(rows.into_iter().map(|(d,)| d).collect())
}

/// Topics of the user's items between `from` and `to`.
pub async fn topics_in_range(
    pool: &PgPool,
    user_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT topic FROM calendar_items \
         WHERE user_id = $1 AND scheduled_date BETWEEN $2 AND $3 \
         ORDER BY scheduled_date, created_at",
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
    .context("failed to list existing topics")?;

    Ok(rows.into_iter().map(|(t,)| t).collect())
}

/// Whether an automatically generated item tagged with `month` exists in the
/// date range.
pub async fn auto_plan_item_exists(
    pool: &PgPool,
    user_id: Uuid,
    month: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS ( \
             SELECT 1 FROM calendar_items \
             WHERE user_id = $1 \
               AND scheduled_date BETWEEN $3 AND $4 \
               AND metadata ->> 'auto_generated' = 'true' \
               AND metadata ->> 'auto_plan_month' = $2 \
         )",
    )
    .bind(user_id)
    .bind(month)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await
    .context("failed to check for auto-generated items")?;

    Ok(exists)
}

/// Replace the generated content of an item (regeneration).
pub async fn update_item_content(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    script: Option<&str>,
    caption: Option<&str>,
    hashtags: Option<&str>,
    metadata: &ItemMetadata,
) -> Result<Option<CalendarItem>> {
    let item = sqlx::query_as::<_, CalendarItem>(
        "UPDATE calendar_items \
         SET script = $3, caption = $4, hashtags = $5, metadata = $6, updated_at = now() \
         WHERE id = $1 AND user_id = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(user_id)
    .bind(script)
    .bind(caption)
    .bind(hashtags)
    .bind(Json(metadata))
    .fetch_optional(pool)
    .await
    .context("failed to update calendar item content")?;

    Ok(item)
}

/// Delete one item owned by `user_id`. Returns `false` if nothing matched.
pub async fn delete_calendar_item(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM calendar_items WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("failed to delete calendar item")?;

    Ok(result.rows_affected() > 0)
}

/// Delete a user's items between two dates. With `auto_only`, manual items
/// are kept. Returns the number of deleted rows.
pub async fn delete_items_in_range<'e, E>(
    executor: E,
    user_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
    auto_only: bool,
) -> Result<u64>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "DELETE FROM calendar_items \
         WHERE user_id = $1 AND scheduled_date BETWEEN $2 AND $3 \
           AND (NOT $4 OR metadata ->> 'auto_generated' = 'true')",
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .bind(auto_only)
    .execute(executor)
    .await
    .context("failed to delete calendar items")?;

    Ok(result.rows_affected())
}
