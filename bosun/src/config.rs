//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides.
//! The configuration file path defaults to `config.yaml` but can be specified
//! via `-f` flag or `BOSUN_CONFIG` environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources
//! override earlier ones):
//!
//! 1. **YAML config file** - base configuration (default: `config.yaml`)
//! 2. **Environment variables** - variables prefixed with `BOSUN_` override
//!    YAML values; nested values use double underscores, e.g.
//!    `BOSUN_DATABASE__TYPE=file BOSUN_DATABASE__PATH=/var/lib/bosun/bosun.db`
//!
//! ## Example
//!
//! ```bash
//! BOSUN_PORT=8080
//! BOSUN_ADMIN_EMAIL=owner@example.com
//! BOSUN_AUTH__SECURITY__JWT_EXPIRY=12h
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use std::{path::PathBuf, time::Duration};

/// Simple CLI args - just for specifying the config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "BOSUN_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment
/// variables. All fields have sensible defaults defined in the `Default`
/// implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Database configuration - file-backed or in-memory SQLite
    pub database: DatabaseConfig,
    /// Email address for the initial admin user (created on first startup)
    pub admin_email: String,
    /// Password for the initial admin user (optional, can be set via environment)
    pub admin_password: Option<String>,
    /// Secret key for JWT signing (required when native auth is enabled)
    pub secret_key: Option<String>,
    /// Authentication configuration
    pub auth: AuthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3900,
            database: DatabaseConfig::default(),
            admin_email: "admin@localhost".to_string(),
            admin_password: None,
            secret_key: None,
            auth: AuthConfig::default(),
        }
    }
}

/// Database configuration.
///
/// The application embeds its database: either a file on disk (production)
/// or a purely in-memory instance (throwaway runs and tests).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatabaseConfig {
    /// File-backed SQLite database
    File {
        /// Path of the database file (created on first startup)
        path: PathBuf,
    },
    /// In-memory SQLite database; all data is lost on shutdown
    Memory,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig::File {
            path: PathBuf::from("bosun.db"),
        }
    }
}

impl DatabaseConfig {
    /// Build sqlx connect options for this database.
    ///
    /// Foreign key enforcement is opt-in per connection in SQLite, so it is
    /// enabled here rather than in the migrations.
    pub fn connect_options(&self) -> SqliteConnectOptions {
        let options = match self {
            DatabaseConfig::File { path } => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal),
            DatabaseConfig::Memory => SqliteConnectOptions::new().in_memory(true),
        };
        options.foreign_keys(true)
    }

    /// Whether this configuration holds data only in memory
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, DatabaseConfig::Memory)
    }
}

/// Authentication configuration for the native (email + password) method.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub native: NativeAuthConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct NativeAuthConfig {
    /// Whether email/password login is enabled
    pub enabled: bool,
    pub password: PasswordConfig,
    pub session: SessionConfig,
}

impl Default for NativeAuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            password: PasswordConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordConfig {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Name of the session cookie
    pub cookie_name: String,
    /// Whether the cookie is marked Secure (HTTPS only)
    pub cookie_secure: bool,
    /// SameSite attribute of the cookie
    pub cookie_same_site: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "bosun_session".to_string(),
            cookie_secure: true,
            cookie_same_site: "Strict".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    /// Lifetime of issued session tokens
    #[serde(with = "humantime_serde")]
    pub jwt_expiry: Duration,
    pub cors: CorsConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_expiry: Duration::from_secs(8 * 3600),
            cors: CorsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins; "*" allows any origin. Empty disables the CORS layer.
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

impl Config {
    /// Load configuration from the YAML file named in `args`, with `BOSUN_`
    /// environment overrides merged on top.
    pub fn load(args: &Args) -> anyhow::Result<Self> {
        let config: Config = Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("BOSUN_").split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Sanity checks that figment cannot express
    fn validate(&self) -> anyhow::Result<()> {
        if self.auth.native.enabled && self.secret_key.is_none() {
            anyhow::bail!("secret_key is required when native authentication is enabled");
        }
        if self.auth.native.password.min_length > self.auth.native.password.max_length {
            anyhow::bail!("password min_length must not exceed max_length");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 3900);
        assert!(config.auth.native.enabled);
        assert_eq!(config.auth.security.jwt_expiry, Duration::from_secs(28800));
        assert!(!config.database.is_ephemeral());
    }

    #[test]
    fn test_env_overrides() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
                port: 4000
                secret_key: file-secret
                "#,
            )?;
            jail.set_env("BOSUN_PORT", "5000");
            jail.set_env("BOSUN_AUTH__SECURITY__JWT_EXPIRY", "2h");

            let args = Args {
                config: "config.yaml".to_string(),
                validate: false,
            };
            let config = Config::load(&args).expect("config should load");

            // Env beats file, file beats default
            assert_eq!(config.port, 5000);
            assert_eq!(config.secret_key.as_deref(), Some("file-secret"));
            assert_eq!(config.auth.security.jwt_expiry, Duration::from_secs(7200));
            Ok(())
        });
    }

    #[test_log::test(tokio::test)]
    async fn test_file_database_is_created_and_migrates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bosun.db");
        let database = DatabaseConfig::File { path: path.clone() };

        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(database.connect_options())
            .await
            .expect("file database should be created on demand");
        crate::migrator().run(&pool).await.expect("migrations should apply");

        assert!(path.exists());
        assert!(!database.is_ephemeral());
    }

    #[test]
    fn test_secret_key_required_for_native_auth() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let config = Config {
            secret_key: Some("s3cret".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }
}
