use std::path::PathBuf;

use anyhow::{bail, Context};

/// Runtime configuration, read from the environment.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub data_dir: PathBuf,
    pub database_url: Option<String>,
    pub frontend_url: String,
    pub enable_hsts: bool,
    /// Usernames granted Admin when they register.
    pub bootstrap_admins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        fn var_or(name: &str, default: &str) -> String {
            std::env::var(name).unwrap_or_else(|_| default.to_string())
        }

        let jwt_secret = std::env::var("JWT_SECRET")
            .context("JWT_SECRET must be set")?;
        if jwt_secret.len() < 32 {
            bail!("JWT_SECRET must be at least 32 characters long");
        }
        let jwt_ttl_hours = var_or("JWT_TTL_HOURS", "24")
            .parse::<i64>()
            .context("JWT_TTL_HOURS must be an integer")?;
        if jwt_ttl_hours <= 0 {
            bail!("JWT_TTL_HOURS must be positive");
        }

        Ok(Self {
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:8080"),
            jwt_secret,
            jwt_ttl_hours,
            data_dir: PathBuf::from(var_or("FORUM_DATA_DIR", "data")),
            database_url: std::env::var("DATABASE_URL").ok(),
            frontend_url: var_or("FRONTEND_URL", "http://localhost:5173"),
            enable_hsts: std::env::var("ENABLE_HSTS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            bootstrap_admins: parse_list(&var_or("BOOTSTRAP_ADMINS", "")),
        })
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("state.json")
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_list_ignores_blanks() {
        assert_eq!(parse_list(" alice, ,bob,"), vec!["alice".to_string(), "bob".to_string()]);
        assert!(parse_list("").is_empty());
    }

    fn clear_env() {
        for var in ["JWT_SECRET", "JWT_TTL_HOURS", "BIND_ADDR", "FORUM_DATA_DIR", "ENABLE_HSTS", "BOOTSTRAP_ADMINS"] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial_test::serial]
    fn secret_is_required_and_long() {
        clear_env();
        assert!(AppConfig::from_env().is_err());
        std::env::set_var("JWT_SECRET", "too-short");
        assert!(AppConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial_test::serial]
    fn defaults_and_overrides() {
        clear_env();
        std::env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
        let cfg = AppConfig::from_env().unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.jwt_ttl_hours, 24);
        assert!(!cfg.enable_hsts);
        assert_eq!(cfg.snapshot_path(), PathBuf::from("data/state.json"));

        std::env::set_var("ENABLE_HSTS", "TRUE");
        std::env::set_var("BOOTSTRAP_ADMINS", "root, ops");
        std::env::set_var("JWT_TTL_HOURS", "0");
        assert!(AppConfig::from_env().is_err());
        std::env::set_var("JWT_TTL_HOURS", "2");
        let cfg = AppConfig::from_env().unwrap();
        assert!(cfg.enable_hsts);
        assert_eq!(cfg.jwt_ttl_hours, 2);
        assert_eq!(cfg.bootstrap_admins, vec!["root".to_string(), "ops".to_string()]);
        clear_env();
    }
}
