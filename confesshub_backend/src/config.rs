use crate::{accounts_db_file, posts_db_file, AppSettings};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Cost bounds accepted by bcrypt.
const MIN_HASH_COST: u32 = 4;
const MAX_HASH_COST: u32 = 31;

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub web: WebConfig,
    // Populated from the .env file
    pub database_path: String,
    pub allowed_origins: String,
    pub log_level: String,
    pub session_secret_key: String,
    pub use_secure_cookies: bool,
    pub public_base_url: String,
    pub reset_token_ttl_hours: i64,
    pub password_hash_cost: u32,
}

fn required_var(name: &str) -> Result<String, config::ConfigError> {
    env::var(name).map_err(|_| {
        config::ConfigError::Message(format!(
            "FATAL: Environment variable '{}' is not set in your .env file.",
            name
        ))
    })
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, config::ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| {
            config::ConfigError::Message(format!("FATAL: '{}' has an invalid value ('{}').", name, raw))
        }),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env(env_path: &Path) -> Result<Self, config::ConfigError> {
        dotenvy::from_path(env_path).map_err(|e| {
            config::ConfigError::Message(format!(
                "FATAL: Failed to load .env file from '{}'. Error: {}",
                env_path.display(),
                e
            ))
        })?;

        let database_path = required_var("DATABASE_PATH")?;
        if Path::new(&database_path).is_relative() {
            return Err(config::ConfigError::Message(format!(
                "FATAL: The 'DATABASE_PATH' in your .env file is a relative path ('{}'). It MUST be an absolute path.",
                database_path
            )));
        }

        // 128 hex characters decode to the 64-byte cookie key.
        let session_secret_key = required_var("SESSION_SECRET_KEY")?;
        if session_secret_key.len() != 128 || !session_secret_key.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(config::ConfigError::Message(
                "FATAL: 'SESSION_SECRET_KEY' must be 128 hexadecimal characters long (64 bytes).".to_string(),
            ));
        }

        let allowed_origins = env::var("ALLOWED_ORIGINS").unwrap_or_default();
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let use_secure_cookies = env::var("USE_SECURE_COOKIES")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        let public_base_url = env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        if let Err(e) = url::Url::parse(&public_base_url) {
            return Err(config::ConfigError::Message(format!(
                "FATAL: 'PUBLIC_BASE_URL' is not a valid URL ('{}'): {}",
                public_base_url, e
            )));
        }

        let reset_token_ttl_hours: i64 = parsed_var("RESET_TOKEN_TTL_HOURS", 24)?;
        if reset_token_ttl_hours <= 0 {
            return Err(config::ConfigError::Message(
                "FATAL: 'RESET_TOKEN_TTL_HOURS' must be a positive number of hours.".to_string(),
            ));
        }

        let password_hash_cost: u32 = parsed_var("PASSWORD_HASH_COST", bcrypt::DEFAULT_COST)?;
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&password_hash_cost) {
            return Err(config::ConfigError::Message(format!(
                "FATAL: 'PASSWORD_HASH_COST' must be between {} and {}.",
                MIN_HASH_COST,
                MAX_HASH_COST
            )));
        }

        let builder = config::Config::builder()
            .set_default("web.host", "127.0.0.1")?
            .set_default("web.port", 8080)?
            // Web host/port overrides
            .add_source(config::File::new("config/default.toml", config::FileFormat::Toml).required(false))
            .set_override("database_path", database_path)?
            .set_override("session_secret_key", session_secret_key)?
            .set_override("allowed_origins", allowed_origins)?
            .set_override("log_level", log_level)?
            .set_override("use_secure_cookies", use_secure_cookies)?
            .set_override("public_base_url", public_base_url)?
            .set_override("reset_token_ttl_hours", reset_token_ttl_hours)?
            .set_override("password_hash_cost", password_hash_cost)?
            .build()?;

        builder.try_deserialize()
    }

    pub fn accounts_db_path(&self) -> PathBuf {
        accounts_db_file(Path::new(&self.database_path))
    }

    pub fn posts_db_path(&self) -> PathBuf {
        posts_db_file(Path::new(&self.database_path))
    }

    pub fn app_settings(&self) -> AppSettings {
        AppSettings {
            password_hash_cost: self.password_hash_cost,
            reset_token_ttl: chrono::Duration::hours(self.reset_token_ttl_hours),
            public_base_url: self.public_base_url.clone(),
        }
    }
}
