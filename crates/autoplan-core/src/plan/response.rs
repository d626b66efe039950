//! Validation of model output and mapping to calendar records.
//!
//! The model is asked for JSON but may wrap it in prose or code fences, so
//! the object is located by its outermost braces. Individual items that
//! fail validation are skipped and logged, never fatal.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use autoplan_db::models::{CalendarItemStatus, ItemMetadata};
use autoplan_db::queries::calendar_items::NewCalendarItem;

use crate::schedule::Month;
use crate::text::{extract_hashtags, format_caption, normalize_key, strip_decorative, structure_script};

/// Errors from reading the model's JSON answer.
#[derive(Debug, thiserror::Error)]
pub enum ResponseParseError {
    #[error("no JSON object found in model output")]
    NoJsonObject,

    #[error("model output is not valid JSON")]
    InvalidJson(#[from] serde_json::Error),

    #[error("model output has no `items` array")]
    MissingItems,
}

/// The slice from the first `{` to the last `}`.
pub fn extract_json_object(raw: &str) -> Result<&str, ResponseParseError> {
    let start = raw.find('{').ok_or(ResponseParseError::NoJsonObject)?;
    let end = raw.rfind('}').ok_or(ResponseParseError::NoJsonObject)?;
    if end < start {
        return Err(ResponseParseError::NoJsonObject);
    }
    Ok(&raw[start..=end])
}

// ---------------------------------------------------------------------------
// Raw shapes
// ---------------------------------------------------------------------------

/// First of `names` present on the object as a string.
fn str_field<'v>(obj: &'v Map<String, Value>, names: &[&str]) -> Option<&'v str> {
    names.iter().find_map(|name| obj.get(*name).and_then(Value::as_str))
}

/// `script` arrives as text, as a list of lines, or as an object keyed by
/// section label. Anything else is treated as absent.
fn script_field(obj: &Map<String, Value>) -> Option<String> {
    match obj.get("script")? {
        Value::String(text) => Some(text.clone()),
        Value::Array(lines) => {
            let lines: Vec<&str> = lines.iter().filter_map(Value::as_str).collect();
            Some(lines.join("\n"))
        }
        Value::Object(sections) => {
            let lines: Vec<String> = sections
                .iter()
                .filter_map(|(label, text)| text.as_str().map(|t| format!("{label}: {t}")))
                .collect();
            Some(lines.join("\n"))
        }
        _ => None,
    }
}

/// `hashtags` arrives as one string or as a list; non-string list entries
/// are ignored.
fn hashtags_field(obj: &Map<String, Value>) -> Option<String> {
    match obj.get("hashtags")? {
        Value::String(text) => Some(text.clone()),
        Value::Array(tags) => {
            let tags: Vec<&str> = tags.iter().filter_map(Value::as_str).collect();
            Some(tags.join(" "))
        }
        _ => None,
    }
}

/// Clean whatever content fields of `obj` have a usable shape.
fn clean_object_content(obj: &Map<String, Value>) -> CleanContent {
    let script = script_field(obj);
    let hashtags = hashtags_field(obj);
    clean_content(
        script.as_deref(),
        str_field(obj, &["caption"]),
        hashtags.as_deref(),
    )
}

// ---------------------------------------------------------------------------
// Content cleaning
// ---------------------------------------------------------------------------

/// Script, caption and hashtags after formatting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanContent {
    pub script: Option<String>,
    pub caption: Option<String>,
    pub hashtags: Option<String>,
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() { None } else { Some(text) }
}

/// Run raw text through the script structurer and caption formatter, and
/// collect hashtags from both the hashtag field and the raw caption.
pub fn clean_content(script: Option<&str>, caption: Option<&str>, hashtags: Option<&str>) -> CleanContent {
    let tag_source = format!("{} {}", hashtags.unwrap_or_default(), caption.unwrap_or_default());
    CleanContent {
        script: script.map(structure_script).and_then(non_empty),
        caption: caption.map(format_caption).and_then(non_empty),
        hashtags: non_empty(extract_hashtags(&tag_source).join(" ")),
    }
}

/// Parse `H:MM` / `HH:MM` into a valid clock time.
pub fn parse_clock_time(text: &str) -> Option<NaiveTime> {
    let (hours, minutes) = text.trim().split_once(':')?;
    let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !digits(hours) || hours.len() > 2 || !digits(minutes) || minutes.len() != 2 {
        return None;
    }
    NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0)
}

// ---------------------------------------------------------------------------
// Monthly plan mapping
// ---------------------------------------------------------------------------

/// Inputs for validating one run's items.
#[derive(Debug, Clone)]
pub struct PlanValidation<'a> {
    pub user_id: Uuid,
    pub month: Month,
    pub slots: &'a [NaiveDate],
    pub strategy_key: &'a str,
    /// Normalized topics already on the calendar this month.
    pub existing_topics: HashSet<String>,
}

/// Validated records plus how many raw items were dropped.
#[derive(Debug, Clone)]
pub struct PlanDraft {
    pub items: Vec<NewCalendarItem>,
    pub skipped: usize,
}

/// Why a raw item was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    NotAnObject,
    DateNotInSlots,
    DateAlreadyUsed,
    MissingTopic,
    DuplicateTopic,
}

/// Parse the model's answer and map every acceptable item to a record.
pub fn map_plan_response(raw: &str, ctx: PlanValidation<'_>) -> Result<PlanDraft, ResponseParseError> {
    let json = extract_json_object(raw)?;
    let value: Value = serde_json::from_str(json)?;
    let raw_items = value
        .get("items")
        .and_then(Value::as_array)
        .ok_or(ResponseParseError::MissingItems)?;

    let slots: HashSet<NaiveDate> = ctx.slots.iter().copied().collect();
    let mut seen_topics = ctx.existing_topics;
    let mut used_dates = HashSet::new();
    let mut items = Vec::with_capacity(raw_items.len());
    let mut skipped = 0;

    for (index, raw_item) in raw_items.iter().enumerate() {
        match map_item(raw_item, ctx.user_id, ctx.month, ctx.strategy_key, &slots, &mut used_dates, &mut seen_topics) {
            Ok(item) => items.push(item),
            Err(reason) => {
                skipped += 1;
                debug!(index, ?reason, "skipping model item");
            }
        }
    }

    Ok(PlanDraft { items, skipped })
}

fn map_item(
    raw: &Value,
    user_id: Uuid,
    month: Month,
    strategy_key: &str,
    slots: &HashSet<NaiveDate>,
    used_dates: &mut HashSet<NaiveDate>,
    seen_topics: &mut HashSet<String>,
) -> Result<NewCalendarItem, SkipReason> {
    let item = raw.as_object().ok_or(SkipReason::NotAnObject)?;

    let date = str_field(item, &["date"])
        .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
        .filter(|d| slots.contains(d))
        .ok_or(SkipReason::DateNotInSlots)?;
    if used_dates.contains(&date) {
        return Err(SkipReason::DateAlreadyUsed);
    }

    let topic = str_field(item, &["topic"])
        .map(strip_decorative)
        .filter(|t| !t.is_empty())
        .ok_or(SkipReason::MissingTopic)?;
    let key = normalize_key(&topic);
    if key.is_empty() {
        return Err(SkipReason::MissingTopic);
    }
    if seen_topics.contains(&key) {
        return Err(SkipReason::DuplicateTopic);
    }

    let time = str_field(item, &["recommended_time", "recommendedTime", "time"]).and_then(parse_clock_time);
    let reason = str_field(item, &["recommended_time_reason", "recommendedTimeReason"])
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);
    let content = clean_object_content(item);

    used_dates.insert(date);
    seen_topics.insert(key);

    Ok(NewCalendarItem {
        user_id,
        scheduled_date: date,
        scheduled_time: time,
        topic,
        script: content.script,
        caption: content.caption,
        hashtags: content.hashtags,
        status: CalendarItemStatus::Planned,
        metadata: ItemMetadata {
            recommended_time: time.map(|t| t.format("%H:%M").to_string()),
            recommended_time_reason: reason,
            strategy: Some(strategy_key.to_string()),
            auto_generated: true,
            auto_plan_month: Some(month.to_string()),
            ..ItemMetadata::default()
        },
    })
}

// ---------------------------------------------------------------------------
// Regeneration
// ---------------------------------------------------------------------------

/// Parse a single-item regeneration answer into cleaned content.
pub fn parse_regenerated(raw: &str) -> Result<CleanContent, ResponseParseError> {
    let json = extract_json_object(raw)?;
    let value: Value = serde_json::from_str(json)?;
    Ok(value
        .as_object()
        .map(clean_object_content)
        .unwrap_or_default())
}
