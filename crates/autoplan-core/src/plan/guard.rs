//! "One automatic plan per month" check, run before any model call.

use sqlx::PgPool;
use tracing::{info, warn};

use autoplan_db::models::ContentProfile;
use autoplan_db::queries::{calendar_items, profiles};

use crate::plan::AutoPlanError;
use crate::schedule::Month;

/// Fail with [`AutoPlanError::AlreadyGenerated`] when `month` already has
/// an automatic plan.
///
/// The profile marker is checked first. When the marker is missing but
/// auto-generated items tagged with the month exist, the marker is written
/// back before failing so later checks short-circuit on the profile.
pub async fn ensure_month_available(
    pool: &PgPool,
    profile: &ContentProfile,
    month: Month,
) -> Result<(), AutoPlanError> {
    let month_key = month.to_string();

    if profile.preferences.auto_plan_last_month.as_deref() == Some(month_key.as_str()) {
        info!(user_id = %profile.user_id, month = %month, "auto-plan already recorded on profile");
        return Err(AutoPlanError::AlreadyGenerated(month));
    }

    let exists = calendar_items::auto_plan_item_exists(
        pool,
        profile.user_id,
        &month_key,
        month.first_day(),
        month.last_day(),
    )
    .await?;

    if exists {
        match profiles::set_auto_plan_month(pool, profile.user_id, &month_key).await {
            Ok(_) => info!(user_id = %profile.user_id, month = %month, "restored missing auto-plan marker"),
            Err(e) => warn!(user_id = %profile.user_id, month = %month, error = %e, "failed to restore auto-plan marker"),
        }
        return Err(AutoPlanError::AlreadyGenerated(month));
    }

    Ok(())
}
