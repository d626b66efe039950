//! Single calendar item operations: manual creation and regeneration.

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use autoplan_db::models::{CalendarItem, CalendarItemStatus, ItemMetadata};
use autoplan_db::queries::calendar_items::{self, NewCalendarItem};
use autoplan_db::queries::profiles;

use crate::llm::{ChatRequest, LlmClient};
use crate::plan::AutoPlanError;
use crate::plan::prompt::{build_regenerate_system_prompt, build_regenerate_user_prompt};
use crate::plan::response::{clean_content, parse_regenerated};
use crate::plan::strategy::{self, ScriptStrategy, resolve_strategy};
use crate::text::strip_decorative;

/// Fields of a manually created item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualItem {
    pub scheduled_date: NaiveDate,
    #[serde(default)]
    pub scheduled_time: Option<NaiveTime>,
    pub topic: String,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub hashtags: Option<String>,
}

/// Create an item by hand. Script, caption and hashtags go through the same
/// cleaning as generated content.
pub async fn create_manual_item(
    pool: &PgPool,
    user_id: Uuid,
    input: &ManualItem,
) -> Result<CalendarItem, AutoPlanError> {
    let topic = strip_decorative(&input.topic);
    if topic.is_empty() {
        return Err(AutoPlanError::InvalidInput("topic must not be empty".to_string()));
    }

    let content = clean_content(
        input.script.as_deref(),
        input.caption.as_deref(),
        input.hashtags.as_deref(),
    );
    let item = NewCalendarItem {
        user_id,
        scheduled_date: input.scheduled_date,
        scheduled_time: input.scheduled_time,
        topic,
        script: content.script,
        caption: content.caption,
        hashtags: content.hashtags,
        status: CalendarItemStatus::Planned,
        metadata: ItemMetadata::default(),
    };

    let created = calendar_items::insert_calendar_item(pool, &item).await?;
    info!(user_id = %user_id, item_id = %created.id, date = %created.scheduled_date, "created calendar item");
    Ok(created)
}

/// Strategy for a regeneration: an explicit override must be valid, the
/// strategy stored on the item falls back to the default when unknown.
fn regeneration_strategy(
    item: &CalendarItem,
    override_key: Option<&str>,
) -> Result<&'static ScriptStrategy, AutoPlanError> {
    if override_key.is_some_and(|k| !k.trim().is_empty()) {
        return resolve_strategy(override_key);
    }
    let stored = item.metadata.strategy.as_deref();
    match stored.and_then(strategy::strategy) {
        Some(found) => Ok(found),
        None => {
            if let Some(key) = stored {
                warn!(item_id = %item.id, strategy = key, "stored strategy is unknown; using default");
            }
            resolve_strategy(None)
        }
    }
}

/// Ask the model for a fresh script, caption and hashtags for one item.
pub async fn regenerate_item(
    pool: &PgPool,
    llm: &dyn LlmClient,
    user_id: Uuid,
    item_id: Uuid,
    strategy_key: Option<&str>,
) -> Result<CalendarItem, AutoPlanError> {
    let item = calendar_items::get_calendar_item(pool, user_id, item_id)
        .await?
        .ok_or(AutoPlanError::ItemNotFound(item_id))?;
    let profile = profiles::get_profile(pool, user_id)
        .await?
        .ok_or(AutoPlanError::ProfileRequired)?;
    let strategy = regeneration_strategy(&item, strategy_key)?;

    let request = ChatRequest::json(
        build_regenerate_system_prompt(strategy),
        build_regenerate_user_prompt(&profile, &item),
    );
    let raw = llm.complete(&request).await.inspect_err(|e| {
        warn!(user_id = %user_id, item_id = %item_id, error = %e, "regeneration model call failed");
    })?;
    let content = parse_regenerated(&raw)?;

    let mut metadata = item.metadata.0.clone();
    metadata.strategy = Some(strategy.key.to_string());

    let updated = calendar_items::update_item_content(
        pool,
        user_id,
        item_id,
        content.script.as_deref(),
        content.caption.as_deref(),
        content.hashtags.as_deref(),
        &metadata,
    )
    .await?
    .ok_or(AutoPlanError::ItemNotFound(item_id))?;

    info!(user_id = %user_id, item_id = %item_id, strategy = strategy.key, "regenerated calendar item");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::types::Json;

    fn item_with_strategy(key: Option<&str>) -> CalendarItem {
        CalendarItem {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            scheduled_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            scheduled_time: None,
            topic: "Tema".to_string(),
            script: None,
            caption: None,
            hashtags: None,
            status: CalendarItemStatus::Planned,
            metadata: Json(ItemMetadata {
                strategy: key.map(str::to_string),
                ..ItemMetadata::default()
            }),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn override_wins_over_stored_strategy() {
        let item = item_with_strategy(Some("aida"));
        assert_eq!(regeneration_strategy(&item, Some("offer")).unwrap().key, "offer");
        assert_eq!(regeneration_strategy(&item, None).unwrap().key, "aida");
        assert_eq!(regeneration_strategy(&item, Some(" ")).unwrap().key, "aida");
    }

    #[test]
    fn unknown_override_is_rejected_but_unknown_stored_falls_back() {
        let item = item_with_strategy(Some("legacy"));
        assert_eq!(
            regeneration_strategy(&item, Some("viral")).unwrap_err().code(),
            "UNKNOWN_STRATEGY"
        );
        assert_eq!(
            regeneration_strategy(&item, None).unwrap().key,
            strategy::DEFAULT_STRATEGY
        );
        assert_eq!(
            regeneration_strategy(&item_with_strategy(None), None).unwrap().key,
            strategy::DEFAULT_STRATEGY
        );
    }

    #[test]
    fn manual_item_accepts_camel_case_json() {
        let input: ManualItem = serde_json::from_value(serde_json::json!({
            "scheduledDate": "2026-11-02",
            "scheduledTime": "18:30:00",
            "topic": "Receita"
        }))
        .unwrap();
        assert_eq!(input.scheduled_time, NaiveTime::from_hms_opt(18, 30, 0));
        assert!(input.caption.is_none());
    }
}
