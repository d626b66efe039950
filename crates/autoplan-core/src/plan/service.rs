//! Monthly auto-plan generation.

use std::collections::HashSet;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use autoplan_db::models::{CalendarItem, ContentProfile};
use autoplan_db::queries::{auto_plan_runs, calendar_items, profiles};

use crate::llm::{ChatRequest, LlmClient};
use crate::plan::prompt::{PlanPromptContext, build_plan_system_prompt, build_plan_user_prompt};
use crate::plan::response::{PlanValidation, map_plan_response};
use crate::plan::strategy::{ScriptStrategy, resolve_strategy};
use crate::plan::{AutoPlanError, guard};
use crate::schedule::{Availability, Month, allocate_slots};
use crate::text::normalize_key;

/// Returned with an empty result when the month has no eligible date.
pub const NO_FREE_DATES_MESSAGE: &str =
    "Sem datas livres para este mês. Ajuste seus dias disponíveis ou libere datas no calendário.";

/// Returned with an empty result when no suggestion survived validation.
pub const NO_VALID_ITEMS_MESSAGE: &str =
    "A IA não retornou sugestões válidas para as datas livres. Tente novamente.";

/// A request to generate one month's plan.
#[derive(Debug, Clone)]
pub struct AutoPlanRequest {
    pub user_id: Uuid,
    /// Target month; `None` means the month containing `today`.
    pub month: Option<Month>,
    pub strategy_key: Option<String>,
    pub today: NaiveDate,
}

/// Result of a generation run that did not fail.
#[derive(Debug, Clone, Serialize)]
pub struct AutoPlanOutcome {
    pub month: Month,
    pub items: Vec<CalendarItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AutoPlanOutcome {
    fn empty(month: Month, message: &str) -> Self {
        Self {
            month,
            items: Vec::new(),
            message: Some(message.to_string()),
        }
    }
}

/// Generate the automatic plan of a month.
///
/// Order of work: strategy and month validation, profile lookup, the
/// per-month guard, slot allocation, the month claim, a single model call,
/// response validation, then one transaction that inserts the items,
/// completes the claim and records the month on the profile. A run that
/// fails or yields no items after the claim releases it.
pub async fn generate_auto_plan(
    pool: &PgPool,
    llm: &dyn LlmClient,
    request: &AutoPlanRequest,
) -> Result<AutoPlanOutcome, AutoPlanError> {
    let strategy = resolve_strategy(request.strategy_key.as_deref())?;

    let current = Month::containing(request.today);
    let month = request.month.unwrap_or(current);
    if month < current {
        return Err(AutoPlanError::InvalidMonth(format!(
            "{month} is before the current month {current}"
        )));
    }

    let profile = profiles::get_profile(pool, request.user_id)
        .await?
        .ok_or(AutoPlanError::ProfileRequired)?;

    guard::ensure_month_available(pool, &profile, month).await?;

    let (from, to) = (month.first_day(), month.last_day());
    let occupied: HashSet<NaiveDate> = calendar_items::occupied_dates(pool, request.user_id, from, to)
        .await?
        .into_iter()
        .collect();
    let availability = Availability::from_days(&profile.preferences.availability_days);
    let slots = allocate_slots(month, availability, &occupied, request.today);

    if slots.is_empty() {
        info!(user_id = %request.user_id, month = %month, "no free dates for auto-plan");
        return Ok(AutoPlanOutcome::empty(month, NO_FREE_DATES_MESSAGE));
    }

    let month_key = month.to_string();
    let Some(claim) = auto_plan_runs::claim_month(pool, request.user_id, &month_key).await? else {
        info!(user_id = %request.user_id, month = %month, "auto-plan month already claimed");
        return Err(AutoPlanError::AlreadyGenerated(month));
    };
    let claimed_at = claim.started_at;

    let run = ClaimedRun {
        pool,
        llm,
        profile: &profile,
        month,
        claimed_at,
        strategy,
        slots: &slots,
    };

    match run.execute().await {
        Ok(items) if items.is_empty() => {
            release_claim(pool, request.user_id, month, claimed_at).await;
            Ok(AutoPlanOutcome::empty(month, NO_VALID_ITEMS_MESSAGE))
        }
        Ok(items) => {
            info!(
                user_id = %request.user_id,
                month = %month,
                strategy = strategy.key,
                count = items.len(),
                "auto-plan generated"
            );
            Ok(AutoPlanOutcome {
                month,
                items,
                message: None,
            })
        }
        Err(e) => {
            error!(user_id = %request.user_id, month = %month, code = e.code(), error = %e, "auto-plan run failed");
            debug!(error = ?e, "auto-plan failure detail");
            release_claim(pool, request.user_id, month, claimed_at).await;
            Err(e)
        }
    }
}

async fn release_claim(pool: &PgPool, user_id: Uuid, month: Month, claimed_at: DateTime<Utc>) {
    if let Err(e) = auto_plan_runs::fail_run(pool, user_id, &month.to_string(), claimed_at).await {
        warn!(user_id = %user_id, month = %month, error = %e, "failed to release auto-plan claim");
    }
}

/// The part of a run that happens while holding the month claim.
struct ClaimedRun<'a> {
    pool: &'a PgPool,
    llm: &'a dyn LlmClient,
    profile: &'a ContentProfile,
    month: Month,
    /// Identifies the claim this run holds.
    claimed_at: DateTime<Utc>,
    strategy: &'static ScriptStrategy,
    slots: &'a [NaiveDate],
}

impl ClaimedRun<'_> {
    async fn execute(&self) -> Result<Vec<CalendarItem>, AutoPlanError> {
        let user_id = self.profile.user_id;
        let existing_topics = calendar_items::topics_in_range(
            self.pool,
            user_id,
            self.month.first_day(),
            self.month.last_day(),
        )
        .await?;

        let system = build_plan_system_prompt(self.strategy);
        let user = build_plan_user_prompt(&PlanPromptContext {
            profile: self.profile,
            month: self.month,
            slots: self.slots,
            existing_topics: &existing_topics,
            strategy: self.strategy,
        });

        debug!(user_id = %user_id, slots = self.slots.len(), model = self.llm.model(), "requesting plan from model");
        let raw = self.llm.complete(&ChatRequest::json(system, user)).await?;

        let draft = map_plan_response(
            &raw,
            PlanValidation {
                user_id,
                month: self.month,
                slots: self.slots,
                strategy_key: self.strategy.key,
                existing_topics: existing_topics.iter().map(|t| normalize_key(t)).collect(),
            },
        )?;
        if draft.skipped > 0 {
            info!(user_id = %user_id, month = %self.month, skipped = draft.skipped, "dropped invalid model items");
        }
        if draft.items.is_empty() {
            return Ok(Vec::new());
        }

        let month_key = self.month.to_string();
        let count = i32::try_from(draft.items.len())
            .map_err(|_| anyhow::anyhow!("too many items in one run"))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin auto-plan transaction")?;
        let mut items = Vec::with_capacity(draft.items.len());
        for new_item in &draft.items {
            items.push(calendar_items::insert_calendar_item(&mut *tx, new_item).await?);
        }
        auto_plan_runs::complete_run(&mut *tx, user_id, &month_key, self.claimed_at, count).await?;
        profiles::set_auto_plan_month(&mut *tx, user_id, &month_key).await?;
        tx.commit()
            .await
            .context("failed to commit auto-plan transaction")?;

        Ok(items)
    }
}
