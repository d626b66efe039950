//! Configuration file management for autoplan.
//!
//! Provides a TOML-based config file at `~/.config/autoplan/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use autoplan_core::llm::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS, LlmConfig};
use autoplan_core::session::SessionConfig;
use autoplan_db::config::DbConfig;

const SESSION_SECRET_ENV: &str = "AUTOPLAN_SESSION_SECRET";
const LLM_BASE_URL_ENV: &str = "AUTOPLAN_LLM_BASE_URL";
const LLM_MODEL_ENV: &str = "AUTOPLAN_LLM_MODEL";
const LLM_API_KEY_ENV: &str = "AUTOPLAN_LLM_API_KEY";
const LLM_TIMEOUT_ENV: &str = "AUTOPLAN_LLM_TIMEOUT_SECS";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    pub auth: AuthSection,
    #[serde(default)]
    pub llm: LlmSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthSection {
    /// Hex-encoded session secret (64 hex chars = 32 bytes).
    pub session_secret: String,
}

/// Language model provider settings. The API key is never stored here.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LlmSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the autoplan config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/autoplan` or `~/.config/autoplan`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("autoplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("autoplan")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

/// Generate a random session secret: 32 random bytes, hex-encoded (64 chars).
pub fn generate_session_secret() -> String {
    use rand::Rng;
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct AutoplanConfig {
    pub db_config: DbConfig,
    pub session_config: SessionConfig,
    pub llm_config: LlmConfig,
}

impl AutoplanConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `AUTOPLAN_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - Session secret: `AUTOPLAN_SESSION_SECRET` > `auth.session_secret` > error
    /// - LLM: `AUTOPLAN_LLM_*` > `[llm]` > built-in defaults; the API key is env only
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var(DbConfig::URL_ENV) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };
        let db_config = DbConfig::new(db_url);

        let session_config = if let Ok(secret_hex) = std::env::var(SESSION_SECRET_ENV) {
            SessionConfig::from_hex(&secret_hex)
                .with_context(|| format!("{SESSION_SECRET_ENV} env var is not a valid secret"))?
        } else if let Some(ref cfg) = file_config {
            SessionConfig::from_hex(&cfg.auth.session_secret)
                .context("invalid session_secret in config file")?
        } else {
            bail!(
                "session secret not found; set {SESSION_SECRET_ENV} or run `autoplan init` to create a config file"
            );
        };

        let llm_section = file_config.as_ref().map(|cfg| &cfg.llm);
        let base_url = std::env::var(LLM_BASE_URL_ENV)
            .ok()
            .or_else(|| llm_section.and_then(|s| s.base_url.clone()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = std::env::var(LLM_MODEL_ENV)
            .ok()
            .or_else(|| llm_section.and_then(|s| s.model.clone()))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let timeout_secs = match std::env::var(LLM_TIMEOUT_ENV) {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{LLM_TIMEOUT_ENV} must be a number of seconds"))?,
            Err(_) => llm_section
                .and_then(|s| s.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        let api_key = std::env::var(LLM_API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty());

        Ok(Self {
            db_config,
            session_config,
            llm_config: LlmConfig {
                base_url,
                model,
                api_key,
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::lock_env;

    const SECRET: &str = "aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55";

    /// Point HOME and XDG_CONFIG_HOME at a temp dir for the duration of `f`.
    fn with_isolated_home<T>(f: impl FnOnce(&std::path::Path) -> T) -> T {
        let tmp = tempfile::TempDir::new().unwrap();
        let orig_home = std::env::var("HOME").ok();
        let orig_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe { std::env::set_var("HOME", tmp.path()) };
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };

        let result = f(tmp.path());

        match orig_home {
            Some(h) => unsafe { std::env::set_var("HOME", h) },
            None => unsafe { std::env::remove_var("HOME") },
        }
        match orig_xdg {
            Some(x) => unsafe { std::env::set_var("XDG_CONFIG_HOME", x) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }
        result
    }

    fn clear_autoplan_env() {
        for var in [
            DbConfig::URL_ENV,
            SESSION_SECRET_ENV,
            LLM_BASE_URL_ENV,
            LLM_MODEL_ENV,
            LLM_API_KEY_ENV,
            LLM_TIMEOUT_ENV,
        ] {
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    fn generated_secret_is_64_hex_chars_and_random() {
        let a = generate_session_secret();
        let b = generate_session_secret();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()), "got: {a}");
        assert_ne!(a, b);
    }

    #[test]
    fn save_and_load_roundtrip_with_llm_section() {
        let _lock = lock_env();
        clear_autoplan_env();

        with_isolated_home(|_| {
            let original = ConfigFile {
                database: DatabaseSection {
                    url: "postgresql://testhost:5432/testdb".to_string(),
                },
                auth: AuthSection {
                    session_secret: SECRET.to_string(),
                },
                llm: LlmSection {
                    base_url: Some("http://localhost:11434/v1".to_string()),
                    model: Some("llama3".to_string()),
                    timeout_secs: Some(30),
                },
            };
            save_config(&original).unwrap();

            let loaded = load_config().unwrap();
            assert_eq!(loaded.database.url, original.database.url);
            assert_eq!(loaded.auth.session_secret, SECRET);
            assert_eq!(loaded.llm.model.as_deref(), Some("llama3"));

            let resolved = AutoplanConfig::resolve(None).unwrap();
            assert_eq!(resolved.db_config.database_url, "postgresql://testhost:5432/testdb");
            assert_eq!(resolved.llm_config.base_url, "http://localhost:11434/v1");
            assert_eq!(resolved.llm_config.timeout, Duration::from_secs(30));
            assert!(resolved.llm_config.api_key.is_none());
        });
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = lock_env();
        with_isolated_home(|_| {
            let cfg = ConfigFile {
                database: DatabaseSection {
                    url: DbConfig::DEFAULT_URL.to_string(),
                },
                auth: AuthSection {
                    session_secret: SECRET.to_string(),
                },
                llm: LlmSection::default(),
            };
            save_config(&cfg).unwrap();
            let meta = std::fs::metadata(config_path()).unwrap();
            assert_eq!(meta.permissions().mode() & 0o777, 0o600);
        });
    }

    #[test]
    fn llm_section_is_optional() {
        let cfg: ConfigFile = toml::from_str(
            "[database]\nurl = \"postgresql://h/db\"\n\n[auth]\nsession_secret = \"ab\"\n",
        )
        .unwrap();
        assert!(cfg.llm.base_url.is_none());
        assert!(cfg.llm.timeout_secs.is_none());
    }

    #[test]
    fn cli_flag_overrides_env() {
        let _lock = lock_env();
        clear_autoplan_env();
        unsafe { std::env::set_var(DbConfig::URL_ENV, "postgresql://env:5432/envdb") };
        unsafe { std::env::set_var(SESSION_SECRET_ENV, SECRET) };

        let config = AutoplanConfig::resolve(Some("postgresql://cli:5432/clidb")).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://cli:5432/clidb");

        clear_autoplan_env();
    }

    #[test]
    fn env_overrides_defaults() {
        let _lock = lock_env();
        clear_autoplan_env();

        with_isolated_home(|_| {
            unsafe { std::env::set_var(SESSION_SECRET_ENV, SECRET) };
            unsafe { std::env::set_var(LLM_MODEL_ENV, "gpt-test") };
            unsafe { std::env::set_var(LLM_API_KEY_ENV, "sk-test") };
            unsafe { std::env::set_var(LLM_TIMEOUT_ENV, "45") };

            let config = AutoplanConfig::resolve(None).unwrap();
            assert_eq!(config.db_config.database_url, DbConfig::DEFAULT_URL);
            assert_eq!(config.llm_config.base_url, DEFAULT_BASE_URL);
            assert_eq!(config.llm_config.model, "gpt-test");
            assert_eq!(config.llm_config.api_key.as_deref(), Some("sk-test"));
            assert_eq!(config.llm_config.timeout, Duration::from_secs(45));
        });

        clear_autoplan_env();
    }

    #[test]
    fn invalid_timeout_is_an_error() {
        let _lock = lock_env();
        clear_autoplan_env();
        unsafe { std::env::set_var(SESSION_SECRET_ENV, SECRET) };
        unsafe { std::env::set_var(LLM_TIMEOUT_ENV, "soon") };

        let err = AutoplanConfig::resolve(Some("postgresql://x/y")).unwrap_err();
        assert!(format!("{err:#}").contains(LLM_TIMEOUT_ENV), "unexpected error: {err:#}");

        clear_autoplan_env();
    }

    #[test]
    fn missing_session_secret_is_an_error() {
        let _lock = lock_env();
        clear_autoplan_env();

        let result = with_isolated_home(|_| AutoplanConfig::resolve(Some("postgresql://x/y")));
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("session secret not found"), "unexpected error: {msg}");
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("autoplan/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
