//! User resolution for operator commands.
//!
//! Commands that act on a user accept either the user's UUID or their email
//! address.

use anyhow::{Context, Result, bail};
use sqlx::PgPool;
use uuid::Uuid;

use autoplan_db::models::User;
use autoplan_db::queries::users;

/// Look up the user named by `input`, a UUID or an email address.
pub async fn resolve_user(pool: &PgPool, input: &str) -> Result<User> {
    let input = input.trim();
    if input.contains('@') {
        return users::get_user_by_email(pool, input)
            .await?
            .with_context(|| format!("no user with email {input}"));
    }

    let id = Uuid::parse_str(input)
        .with_context(|| format!("invalid user: {input} (expected a UUID or an email address)"))?;
    match users::get_user(pool, id).await? {
        Some(user) => Ok(user),
        None => bail!("user {id} not found"),
    }
}
