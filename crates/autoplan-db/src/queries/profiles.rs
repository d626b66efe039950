//! Database query functions for the `content_profiles` table.

use anyhow::{Context, Result};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::{ContentProfile, ProfilePreferences};

/// Fields a user edits on their profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileFields {
    pub business_name: String,
    pub niche: String,
    pub audience: String,
    pub tone: String,
    pub goals: String,
    pub platforms: Vec<String>,
    pub weekly_frequency: i32,
    pub preferences: ProfilePreferences,
}

/// Fetch the profile of a user.
pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<ContentProfile>> {
    let profile =
        sqlx::query_as::<_, ContentProfile>("SELECT * FROM content_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch content profile")?;

    Ok(profile)
}

/// Create the profile on first save, replace its fields afterwards.
///
/// The stored `auto_plan_last_month` marker survives updates: clients cannot
/// clear or forge it through a profile save.
pub async fn upsert_profile(
    pool: &PgPool,
    user_id: Uuid,
    fields: &ProfileFields,
) -> Result<ContentProfile> {
    let mut preferences = fields.preferences.clone();
    preferences.auto_plan_last_month = None;

    let profile = sqlx::query_as::<_, ContentProfile>(
        "INSERT INTO content_profiles \
             (user_id, business_name, niche, audience, tone, goals, platforms, weekly_frequency, preferences) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (user_id) DO UPDATE SET \
             business_name = EXCLUDED.business_name, \
             niche = EXCLUDED.niche, \
             audience = EXCLUDED.audience, \
             tone = EXCLUDED.tone, \
             goals = EXCLUDED.goals, \
             platforms = EXCLUDED.platforms, \
             weekly_frequency = EXCLUDED.weekly_frequency, \
             preferences = EXCLUDED.preferences || jsonb_strip_nulls(jsonb_build_object( \
                 'auto_plan_last_month', content_profiles.preferences -> 'auto_plan_last_month')), \
             updated_at = now() \
         RETURNING *",
    )
    .bind(user_id)
    .bind(&fields.business_name)
    .bind(&fields.niche)
    .bind(&fields.audience)
    .bind(&fields.tone)
    .bind(&fields.goals)
    .bind(&fields.platforms)
    .bind(fields.weekly_frequency)
    .bind(Json(&preferences))
    .fetch_one(pool)
    .await
    .context("failed to upsert content profile")?;

    Ok(profile)
}

/// Record `month` as the last auto-planned month in the preference bag.
///
/// Returns `false` when the user has no profile.
pub async fn set_auto_plan_month<'e, E>(executor: E, user_id: Uuid, month: &str) -> Result<bool>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE content_profiles \
         SET preferences = jsonb_set(preferences, '{auto_plan_last_month}', to_jsonb($2::text), true), \
             updated_at = now() \
         WHERE user_id = $1",
    )
    .bind(user_id)
    .bind(month)
    .execute(executor)
    .await
    .context("failed to set auto-plan month marker")?;

    Ok(result.rows_affected() > 0)
}

/// Remove the auto-plan marker if it currently points at `month`.
pub async fn clear_auto_plan_month<'e, E>(executor: E, user_id: Uuid, month: &str) -> Result<bool>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE content_profiles \
         SET preferences = preferences - 'auto_plan_last_month', updated_at = now() \
         WHERE user_id = $1 AND preferences ->> 'auto_plan_last_month' = $2",
    )
    .bind(user_id)
    .bind(month)
    .execute(executor)
    .await
    .context("failed to clear auto-plan month marker")?;

    Ok(result.rows_affected() > 0)
}
