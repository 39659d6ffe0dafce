use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(ConfigError::Invalid { key: "DRAFT_STORE", value: s.to_string() }),
        }
    }
}

/// Rules shared by every match served by this process.
#[derive(Debug, Clone)]
pub struct DraftSettings {
    pub max_sets: u32,
    /// `None` disables the server-side turn timer.
    pub turn_time: Option<Duration>,
}

impl Default for DraftSettings {
    fn default() -> Self {
        Self { max_sets: 5, turn_time: Some(Duration::from_secs(30)) }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub store: StoreBackend,
    pub database_url: String,
    pub tx_max_attempts: u32,
    pub catalog_base_url: String,
    pub catalog_locale: String,
    pub draft: DraftSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let turn_seconds: u64 = parsed("TURN_SECONDS", 30)?;
        let max_sets: u32 = parsed("MAX_SETS", 5)?;
        if max_sets == 0 {
            return Err(ConfigError::Invalid { key: "MAX_SETS", value: "0".to_string() });
        }
        let tx_max_attempts: u32 = parsed("TX_MAX_ATTEMPTS", 5)?;
        if tx_max_attempts == 0 {
            return Err(ConfigError::Invalid { key: "TX_MAX_ATTEMPTS", value: "0".to_string() });
        }

        Ok(Self {
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:3000"),
            store: var_or("DRAFT_STORE", "sqlite").parse()?,
            database_url: var_or("DATABASE_URL", "sqlite://banpick.db?mode=rwc"),
            tx_max_attempts,
            catalog_base_url: var_or("CATALOG_BASE_URL", "https://ddragon.leagueoflegends.com"),
            catalog_locale: var_or("CATALOG_LOCALE", "ko_KR"),
            draft: DraftSettings {
                max_sets,
                turn_time: (turn_seconds > 0).then(|| Duration::from_secs(turn_seconds)),
            },
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_backend_parses_case_insensitively() {
        assert_eq!("SQLite".parse::<StoreBackend>().unwrap(), StoreBackend::Sqlite);
        assert_eq!(" memory ".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("redis".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn default_settings_are_best_of_five() {
        let settings = DraftSettings::default();
        assert_eq!(settings.max_sets, 5);
        assert_eq!(settings.turn_time, Some(Duration::from_secs(30)));
    }
}
