//! Operator handlers for `autoplan user` and `autoplan session`.

use anyhow::{Result, bail};
use chrono::{Duration, Utc};
use sqlx::PgPool;

use autoplan_core::session::{SESSION_COOKIE, SessionConfig, issue_session};
use autoplan_db::queries::users;

use crate::resolve::resolve_user;
use crate::{SessionCommands, UserCommands};

pub async fn run_user_command(command: UserCommands, pool: &PgPool) -> Result<()> {
    match command {
        UserCommands::Add { email } => cmd_add(pool, &email).await,
        UserCommands::Show { user } => cmd_show(pool, &user).await,
    }
}

pub async fn run_session_command(
    command: SessionCommands,
    pool: &PgPool,
    sessions: &SessionConfig,
) -> Result<()> {
    match command {
        SessionCommands::Issue { user, ttl_hours } => {
            cmd_issue(pool, sessions, &user, ttl_hours).await
        }
    }
}

async fn cmd_add(pool: &PgPool, email: &str) -> Result<()> {
    let email = email.trim();
    if !email.contains('@') {
        bail!("invalid email address: {email}");
    }
    if let Some(existing) = users::get_user_by_email(pool, email).await? {
        bail!("user {} already exists with ID {}", existing.email, existing.id);
    }

    let user = users::insert_user(pool, email).await?;
    println!("Created user {}", user.email);
    println!("  ID: {}", user.id);
    Ok(())
}

async fn cmd_show(pool: &PgPool, input: &str) -> Result<()> {
    let user = resolve_user(pool, input).await?;
    println!("User:    {}", user.email);
    println!("ID:      {}", user.id);
    println!("Created: {}", user.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    Ok(())
}

async fn cmd_issue(
    pool: &PgPool,
    sessions: &SessionConfig,
    input: &str,
    ttl_hours: i64,
) -> Result<()> {
    if ttl_hours <= 0 {
        bail!("--ttl-hours must be positive");
    }
    let user = resolve_user(pool, input).await?;
    let now = Utc::now();
    let token = issue_session(sessions, user.id, now, Duration::hours(ttl_hours))?;

    tracing::info!(user_id = %user.id, ttl_hours, "issued session token");
    println!("{token}");
    eprintln!(
        "Send it as `Cookie: {SESSION_COOKIE}=<token>`; valid until {}",
        (now + Duration::hours(ttl_hours)).format("%Y-%m-%d %H:%M UTC")
    );
    Ok(())
}
