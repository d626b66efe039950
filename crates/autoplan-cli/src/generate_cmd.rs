//! `autoplan generate <user> [--month] [--strategy]`
//!
//! Runs the same generation workflow as `POST /api/auto-plan`, on behalf of a
//! user, and prints the resulting items.

use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;

use autoplan_core::llm::{LlmClient, LlmConfig, OpenAiClient};
use autoplan_core::plan::{AutoPlanRequest, generate_auto_plan};
use autoplan_core::schedule::Month;

use crate::resolve::resolve_user;

pub async fn run_generate(
    pool: &PgPool,
    llm_config: &LlmConfig,
    input: &str,
    month: Option<Month>,
    strategy: Option<String>,
) -> Result<()> {
    let user = resolve_user(pool, input).await?;
    let client = OpenAiClient::new(llm_config)?;
    generate_for(pool, &client, &user.email, AutoPlanRequest {
        user_id: user.id,
        month,
        strategy_key: strategy,
        today: Utc::now().date_naive(),
    })
    .await
}

async fn generate_for(
    pool: &PgPool,
    llm: &dyn LlmClient,
    email: &str,
    request: AutoPlanRequest,
) -> Result<()> {
    println!("Generating auto-plan for {email} with model {}...", llm.model());

    let outcome = match generate_auto_plan(pool, llm, &request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            let code = e.code();
            let message = e.user_message();
            return Err(anyhow::Error::new(e).context(format!("{code}: {message}")));
        }
    };

    if let Some(message) = &outcome.message {
        println!("{}: {message}", outcome.month);
        return Ok(());
    }

    println!("Created {} item(s) for {}:", outcome.items.len(), outcome.month);
    for item in &outcome.items {
        let time = item
            .scheduled_time
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_else(|| "--:--".to_string());
        println!("  {} {time}  {}", item.scheduled_date, item.topic);
    }
    Ok(())
}
