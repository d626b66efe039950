mod account_cmds;
mod calendar_cmds;
mod config;
mod generate_cmd;
mod profile_cmd;
mod resolve;
mod serve_cmd;
#[cfg(test)]
mod test_util;

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use autoplan_core::llm::OpenAiClient;
use autoplan_core::schedule::Month;
use autoplan_core::session::DEFAULT_TTL_HOURS;
use autoplan_db::pool;

use config::AutoplanConfig;

#[derive(Parser)]
#[command(name = "autoplan", about = "Monthly content-calendar auto-generation service")]
struct Cli {
    /// Database URL (overrides AUTOPLAN_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write an autoplan config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/autoplan")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the autoplan database (requires config file or env vars)
    DbInit,
    /// Start the HTTP API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
    /// User accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Session tokens for the HTTP API
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Content profiles
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Calendar items
    Calendar {
        #[command(subcommand)]
        command: CalendarCommands,
    },
    /// Generate the automatic plan of a month for a user
    Generate {
        /// User ID or email
        user: String,
        /// Target month as YYYY-MM (defaults to the current month)
        #[arg(long)]
        month: Option<Month>,
        /// Script strategy key (see `GET /api/strategies`)
        #[arg(long)]
        strategy: Option<String>,
    },
    /// Print a shell completion script
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user
    Add {
        /// Email address
        email: String,
    },
    /// Show a user
    Show {
        /// User ID or email
        user: String,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Issue a session token for a user
    Issue {
        /// User ID or email
        user: String,
        /// Token lifetime in hours
        #[arg(long, default_value_t = DEFAULT_TTL_HOURS)]
        ttl_hours: i64,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Show a user's content profile
    Show {
        /// User ID or email
        user: String,
    },
}

#[derive(Subcommand)]
pub enum CalendarCommands {
    /// List a user's items of a month
    List {
        /// User ID or email
        user: String,
        /// Month as YYYY-MM (defaults to the current month)
        #[arg(long)]
        month: Option<Month>,
    },
    /// Delete a month's items and allow its auto-plan to be generated again
    Cleanup {
        /// User ID or email
        user: String,
        /// Month as YYYY-MM
        #[arg(long)]
        month: Month,
        /// Only delete auto-generated items
        #[arg(long)]
        auto_only: bool,
    },
}

/// Execute the `autoplan init` command: write a config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let session_secret = config::generate_session_secret();

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        auth: config::AuthSection {
            session_secret: session_secret.clone(),
        },
        llm: config::LlmSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!(
        "  auth.session_secret = {}...{}",
        &session_secret[..8],
        &session_secret[56..]
    );
    println!();
    println!("Set AUTOPLAN_LLM_API_KEY in the environment before running `autoplan serve`.");
    println!("Next: run `autoplan db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `autoplan db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = AutoplanConfig::resolve(cli_db_url)?;

    println!("Initializing autoplan database...");

    pool::ensure_database_exists(&resolved.db_config).await?;

    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;
    println!("Migrations applied.");

    let counts = pool::table_counts(&db_pool).await?;
    println!();
    println!("Tables:");
    for (table, count) in &counts {
        println!("  {table:<20} {count} rows");
    }

    db_pool.close().await;
    println!();
    println!("Database ready.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Serve { bind, port } => {
            let resolved = AutoplanConfig::resolve(cli.database_url.as_deref())?;
            let llm = OpenAiClient::new(&resolved.llm_config)?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let state = serve_cmd::AppState {
                pool: db_pool.clone(),
                llm: Arc::new(llm),
                sessions: resolved.session_config,
            };
            let result = serve_cmd::run_serve(state, &bind, port).await;
            db_pool.close().await;
            result?;
        }
        Commands::User { command } => {
            let resolved = AutoplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = account_cmds::run_user_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Session { command } => {
            let resolved = AutoplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result =
                account_cmds::run_session_command(command, &db_pool, &resolved.session_config)
                    .await;
            db_pool.close().await;
            result?;
        }
        Commands::Profile {
            command: ProfileCommands::Show { user },
        } => {
            let resolved = AutoplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = profile_cmd::run_profile_show(&db_pool, &user).await;
            db_pool.close().await;
            result?;
        }
        Commands::Calendar { command } => {
            let resolved = AutoplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = calendar_cmds::run_calendar_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Generate {
            user,
            month,
            strategy,
        } => {
            let resolved = AutoplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = generate_cmd::run_generate(
                &db_pool,
                &resolved.llm_config,
                &user,
                month,
                strategy,
            )
            .await;
            db_pool.close().await;
            result?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "autoplan", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_generate_with_month_and_strategy() {
        let cli = Cli::try_parse_from([
            "autoplan",
            "generate",
            "dona@example.com",
            "--month",
            "2026-11",
            "--strategy",
            "pas",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate {
                user,
                month,
                strategy,
            } => {
                assert_eq!(user, "dona@example.com");
                assert_eq!(month, Month::new(2026, 11));
                assert_eq!(strategy.as_deref(), Some("pas"));
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn rejects_malformed_month() {
        assert!(
            Cli::try_parse_from(["autoplan", "calendar", "cleanup", "x@y.z", "--month", "2026-13"])
                .is_err()
        );
    }

    #[test]
    fn session_ttl_defaults_to_a_week() {
        let cli = Cli::try_parse_from(["autoplan", "session", "issue", "x@y.z"]).unwrap();
        match cli.command {
            Commands::Session {
                command: SessionCommands::Issue { ttl_hours, .. },
            } => assert_eq!(ttl_hours, DEFAULT_TTL_HOURS),
            _ => panic!("expected session issue"),
        }
    }
}
