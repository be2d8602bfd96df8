#![allow(dead_code)]

use std::env;

/// Configuration recognized by the core. Everything HTTP- or auth-shaped
/// (port, token secret/expiry) lives in the excluded outer layer and is
/// not modeled here.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_max_lifetime_seconds: u64,
    pub environment: String,
    pub scheduler_enabled: bool,
    pub scheduler_interval_hours: u64,
}

const DEFAULT_SCHEDULER_INTERVAL_HOURS: u64 = 24;

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: env_or("DATABASE_URL", "postgres://localhost/kitnet"),
            db_max_connections: env_parse_or("DB_MAX_CONNECTIONS", 10),
            db_min_connections: env_parse_or("DB_MIN_CONNECTIONS", 1),
            db_max_lifetime_seconds: env_parse_or("DB_MAX_LIFETIME_SECONDS", 1800),
            environment: env_or("ENVIRONMENT", "development"),
            scheduler_enabled: env_parse_bool_or("SCHEDULER_ENABLED", true),
            scheduler_interval_hours: scheduler_interval_hours_from_env(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.trim().eq_ignore_ascii_case("production")
    }
}

/// Minimum 1 hour; anything missing, zero, or unparseable falls back to
/// the 24h default.
fn scheduler_interval_hours_from_env() -> u64 {
    match env_opt("SCHEDULER_INTERVAL_HOURS").and_then(|raw| raw.parse::<u64>().ok()) {
        Some(hours) if hours >= 1 => hours,
        _ => DEFAULT_SCHEDULER_INTERVAL_HOURS,
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    env_opt(key)
        .and_then(|raw| raw.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_parse_bool_or(key: &str, default: bool) -> bool {
    match env_opt(key).as_deref().map(str::to_ascii_lowercase) {
        Some(value) if value == "1" || value == "true" || value == "yes" || value == "on" => true,
        Some(value) if value == "0" || value == "false" || value == "no" || value == "off" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn scheduler_interval_falls_back_to_24_when_invalid() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("SCHEDULER_INTERVAL_HOURS", "0");
        assert_eq!(scheduler_interval_hours_from_env(), 24);
        env::set_var("SCHEDULER_INTERVAL_HOURS", "not-a-number");
        assert_eq!(scheduler_interval_hours_from_env(), 24);
        env::remove_var("SCHEDULER_INTERVAL_HOURS");
        assert_eq!(scheduler_interval_hours_from_env(), 24);
    }

    #[test]
    fn scheduler_interval_accepts_valid_value() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("SCHEDULER_INTERVAL_HOURS", "6");
        assert_eq!(scheduler_interval_hours_from_env(), 6);
        env::remove_var("SCHEDULER_INTERVAL_HOURS");
    }

    #[test]
    fn is_production_is_case_insensitive() {
        let mut config = AppConfig::from_env();
        config.environment = "PRODUCTION".to_string();
        assert!(config.is_production());
    }
}
