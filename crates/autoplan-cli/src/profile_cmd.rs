//! `autoplan profile show <user>`

use anyhow::Result;
use sqlx::PgPool;

use autoplan_core::schedule::Availability;
use autoplan_db::queries::profiles;

use crate::resolve::resolve_user;

const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub async fn run_profile_show(pool: &PgPool, input: &str) -> Result<()> {
    let user = resolve_user(pool, input).await?;
    let Some(profile) = profiles::get_profile(pool, user.id).await? else {
        println!("User {} has no content profile.", user.email);
        return Ok(());
    };

    let availability = Availability::from_days(&profile.preferences.availability_days);
    let days: Vec<&str> = availability
        .days()
        .into_iter()
        .filter_map(|d| WEEKDAY_NAMES.get(d as usize).copied())
        .collect();

    println!("Profile of {} ({})", user.email, user.id);
    println!("  Business:   {}", profile.business_name);
    println!("  Niche:      {}", profile.niche);
    println!("  Audience:   {}", profile.audience);
    println!("  Tone:       {}", profile.tone);
    println!("  Goals:      {}", profile.goals);
    println!("  Platforms:  {}", profile.platforms.join(", "));
    println!("  Frequency:  {} posts/week", profile.weekly_frequency);
    println!("  Posts on:   {}", days.join(" "));
    println!(
        "  Auto-plan:  {}",
        profile
            .preferences
            .auto_plan_last_month
            .as_deref()
            .unwrap_or("never generated")
    );
    println!("  Updated:    {}", profile.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    Ok(())
}
