//! Operator handlers for `autoplan calendar` subcommands.
//!
//! - `autoplan calendar list <user> [--month]`
//! - `autoplan calendar cleanup <user> --month [--auto-only]`

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use autoplan_core::schedule::Month;
use autoplan_db::queries::{auto_plan_runs, calendar_items, profiles};

use crate::CalendarCommands;
use crate::resolve::resolve_user;

pub async fn run_calendar_command(command: CalendarCommands, pool: &PgPool) -> Result<()> {
    match command {
        CalendarCommands::List { user, month } => cmd_list(pool, &user, month).await,
        CalendarCommands::Cleanup {
            user,
            month,
            auto_only,
        } => cmd_cleanup(pool, &user, month, auto_only).await,
    }
}

// -----------------------------------------------------------------------
// calendar list
// -----------------------------------------------------------------------

async fn cmd_list(pool: &PgPool, input: &str, month: Option<Month>) -> Result<()> {
    let user = resolve_user(pool, input).await?;
    let month = month.unwrap_or_else(|| Month::containing(Utc::now().date_naive()));
    let items =
        calendar_items::list_items_in_range(pool, user.id, month.first_day(), month.last_day())
            .await?;

    println!("Calendar of {} for {month}: {} item(s)", user.email, items.len());
    if items.is_empty() {
        return Ok(());
    }
    println!();
    println!("{:<12} {:<6} {:<5} {:<14} TOPIC", "DATE", "TIME", "AUTO", "STATUS");
    for item in &items {
        let time = item
            .scheduled_time
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let auto = if item.metadata.auto_generated { "yes" } else { "" };
        println!(
            "{:<12} {:<6} {:<5} {:<14} {}",
            item.scheduled_date.to_string(),
            time,
            auto,
            item.status.to_string(),
            item.topic
        );
    }
    Ok(())
}

// -----------------------------------------------------------------------
// calendar cleanup
// -----------------------------------------------------------------------

/// What a month cleanup removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupSummary {
    pub deleted_items: u64,
    pub run_cleared: bool,
    pub marker_cleared: bool,
}

/// Delete a month's items and forget that its automatic plan was generated,
/// so the user can generate it again.
pub async fn cleanup_month(
    pool: &PgPool,
    user_id: Uuid,
    month: Month,
    auto_only: bool,
) -> Result<CleanupSummary> {
    let key = month.to_string();
    let mut tx = pool.begin().await.context("failed to begin cleanup transaction")?;
    let deleted_items = calendar_items::delete_items_in_range(
        &mut *tx,
        user_id,
        month.first_day(),
        month.last_day(),
        auto_only,
    )
    .await?;
    let run_cleared = auto_plan_runs::delete_run(&mut *tx, user_id, &key).await?;
    let marker_cleared = profiles::clear_auto_plan_month(&mut *tx, user_id, &key).await?;
    tx.commit().await.context("failed to commit cleanup transaction")?;

    tracing::info!(
        user_id = %user_id,
        month = %month,
        deleted_items,
        run_cleared,
        marker_cleared,
        "cleaned up calendar month"
    );

    Ok(CleanupSummary {
        deleted_items,
        run_cleared,
        marker_cleared,
    })
}

async fn cmd_cleanup(pool: &PgPool, input: &str, month: Month, auto_only: bool) -> Result<()> {
    let user = resolve_user(pool, input).await?;
    let summary = cleanup_month(pool, user.id, month, auto_only).await?;

    let scope = if auto_only { "auto-generated " } else { "" };
    println!(
        "Deleted {} {scope}item(s) of {month} for {}",
        summary.deleted_items, user.email
    );
    if summary.run_cleared || summary.marker_cleared {
        println!("Auto-plan for {month} can be generated again.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use autoplan_db::models::{CalendarItemStatus, ItemMetadata};
    use autoplan_db::queries::calendar_items::NewCalendarItem;
    use autoplan_db::queries::profiles::ProfileFields;
    use autoplan_db::queries::users;
    use autoplan_test_utils::{create_test_db, drop_test_db};

    fn item(user_id: Uuid, day: u32, topic: &str, auto: bool) -> NewCalendarItem {
        NewCalendarItem {
            user_id,
            scheduled_date: NaiveDate::from_ymd_opt(2026, 11, day).unwrap(),
            scheduled_time: None,
            topic: topic.to_string(),
            script: None,
            caption: None,
            hashtags: None,
            status: CalendarItemStatus::Planned,
            metadata: ItemMetadata {
                auto_generated: auto,
                auto_plan_month: auto.then(|| "2026-11".to_string()),
                ..ItemMetadata::default()
            },
        }
    }

    #[tokio::test]
    async fn cleanup_auto_only_keeps_manual_items_and_reopens_month() {
        let (pool, db_name) = create_test_db().await;
        let user = users::insert_user(&pool, "cleanup@example.com").await.unwrap();
        let fields = ProfileFields {
            business_name: "Padaria Aurora".to_string(),
            weekly_frequency: 3,
            ..ProfileFields::default()
        };
        profiles::upsert_profile(&pool, user.id, &fields).await.unwrap();

        let month = Month::new(2026, 11).unwrap();
        calendar_items::insert_calendar_item(&pool, &item(user.id, 2, "Gerado", true))
            .await
            .unwrap();
        calendar_items::insert_calendar_item(&pool, &item(user.id, 3, "Manual", false))
            .await
            .unwrap();
        calendar_items::insert_calendar_item(&pool, &NewCalendarItem {
            scheduled_date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
            ..item(user.id, 1, "Outro mês", true)
        })
        .await
        .unwrap();
        let claim = auto_plan_runs::claim_month(&pool, user.id, "2026-11")
            .await
            .unwrap()
            .unwrap();
        auto_plan_runs::complete_run(&pool, user.id, "2026-11", claim.started_at, 1)
            .await
            .unwrap();
        profiles::set_auto_plan_month(&pool, user.id, "2026-11")
            .await
            .unwrap();

        let summary = cleanup_month(&pool, user.id, month, true).await.unwrap();
        assert_eq!(
            summary,
            CleanupSummary {
                deleted_items: 1,
                run_cleared: true,
                marker_cleared: true,
            }
        );

        let left = calendar_items::list_items_in_range(
            &pool,
            user.id,
            NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
        )
        .await
        .unwrap();
        let topics: Vec<&str> = left.iter().map(|i| i.topic.as_str()).collect();
        assert_eq!(topics, vec!["Manual", "Outro mês"]);

        assert!(auto_plan_runs::get_run(&pool, user.id, "2026-11").await.unwrap().is_none());
        let profile = profiles::get_profile(&pool, user.id).await.unwrap().unwrap();
        assert!(profile.preferences.auto_plan_last_month.is_none());

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn cleanup_of_untouched_month_is_a_no_op() {
        let (pool, db_name) = create_test_db().await;
        let user = users::insert_user(&pool, "noop@example.com").await.unwrap();

        let summary = cleanup_month(&pool, user.id, Month::new(2026, 11).unwrap(), false)
            .await
            .unwrap();
        assert_eq!(summary.deleted_items, 0);
        assert!(!summary.run_cleared);
        assert!(!summary.marker_cleared);

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
