use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Lifecycle status of a calendar item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CalendarItemStatus {
    Planned,
    InProduction,
    Published,
    Cancelled,
}

impl fmt::Display for CalendarItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Planned => "planned",
            Self::InProduction => "in_production",
            Self::Published => "published",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for CalendarItemStatus {
    type Err = CalendarItemStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planned" => Ok(Self::Planned),
            "in_production" => Ok(Self::InProduction),
            "published" => Ok(Self::Published),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(CalendarItemStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`CalendarItemStatus`] string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid calendar item status: {0:?}")]
pub struct CalendarItemStatusParseError(pub String);

// ---------------------------------------------------------------------------

/// Status of an auto-plan month claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// JSON bags
// ---------------------------------------------------------------------------

/// Preference bag stored in `content_profiles.preferences`.
///
/// Only the keys the planner reads are typed; everything else the client
/// stores is kept in `extra` and written back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfilePreferences {
    /// Weekday numbers (0 = Sunday .. 6 = Saturday) the user posts on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub availability_days: Vec<i64>,
    /// `YYYY-MM` of the last month an automatic plan was generated for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_plan_last_month: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Metadata bag stored in `calendar_items.metadata`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_time_reason: Option<String>,
    /// Script strategy key used to write the script.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default)]
    pub auto_generated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_plan_month: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// An account that owns a profile and calendar items.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Per-user marketing profile that drives content planning.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContentProfile {
    pub user_id: Uuid,
    pub business_name: String,
    pub niche: String,
    pub audience: String,
    pub tone: String,
    pub goals: String,
    pub platforms: Vec<String>,
    pub weekly_frequency: i32,
    pub preferences: Json<ProfilePreferences>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One planned content post.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CalendarItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: Option<NaiveTime>,
    pub topic: String,
    pub script: Option<String>,
    pub caption: Option<String>,
    pub hashtags: Option<String>,
    pub status: CalendarItemStatus,
    pub metadata: Json<ItemMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Exclusive claim on generating the automatic plan of one month.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AutoPlanRun {
    pub user_id: Uuid,
    pub month: String,
    pub status: RunStatus,
    pub item_count: i32,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_item_status_display_roundtrip() {
        let variants = [
            CalendarItemStatus::Planned,
            CalendarItemStatus::InProduction,
            CalendarItemStatus::Published,
            CalendarItemStatus::Cancelled,
        ];
        for v in &variants {
            let parsed: CalendarItemStatus = v.to_string().parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn calendar_item_status_invalid() {
        assert!("archived".parse::<CalendarItemStatus>().is_err());
    }

    #[test]
    fn preferences_keep_unknown_keys() {
        let raw = serde_json::json!({
            "availability_days": [1, 3, 5],
            "auto_plan_last_month": "2026-10",
            "theme": "dark"
        });
        let prefs: ProfilePreferences = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(prefs.availability_days, vec![1, 3, 5]);
        assert_eq!(prefs.auto_plan_last_month.as_deref(), Some("2026-10"));
        assert_eq!(prefs.extra.get("theme"), Some(&Value::from("dark")));

        let back = serde_json::to_value(&prefs).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn preferences_default_when_empty() {
        let prefs: ProfilePreferences = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(prefs.availability_days.is_empty());
        assert!(prefs.auto_plan_last_month.is_none());
    }

    #[test]
    fn metadata_auto_generated_defaults_false() {
        let meta: ItemMetadata =
            serde_json::from_value(serde_json::json!({ "strategy": "aida" })).unwrap();
        assert!(!meta.auto_generated);
        assert_eq!(meta.strategy.as_deref(), Some("aida"));
    }
}
