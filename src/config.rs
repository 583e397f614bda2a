use std::str::FromStr;

use anyhow::{ensure, Context};

const DEFAULT_DATABASE_URL: &str = "sqlite://eventboard.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
// a year
const MAX_SESSION_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub session_minutes: i64,
    /// Upper bound on the instances one recurring submission expands to.
    pub max_series_instances: usize,
    /// Compare-and-set attempts after the first when joining an event.
    pub join_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            bind_addr: DEFAULT_BIND_ADDR.to_owned(),
            session_minutes: 30,
            max_series_instances: 52,
            join_retries: 5,
        }
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw.trim().parse().with_context(|| format!("{key}={raw:?}")),
        None => Ok(default),
    }
}

impl Config {
    /// Reads `.env` and the process environment; unset keys keep their
    /// defaults.
    pub fn from_env() -> anyhow::Result<Config> {
        let defaults = Config::default();
        let var = |key: &str| dotenv::var(key).ok();

        let config = Config {
            database_url: var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            session_minutes: parse_or("SESSION_MINUTES", var("SESSION_MINUTES"), defaults.session_minutes)?,
            max_series_instances: parse_or(
                "MAX_SERIES_INSTANCES",
                var("MAX_SERIES_INSTANCES"),
                defaults.max_series_instances,
            )?,
            join_retries: parse_or("JOIN_RETRIES", var("JOIN_RETRIES"), defaults.join_retries)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            (1..=MAX_SESSION_MINUTES).contains(&self.session_minutes),
            "SESSION_MINUTES must be between 1 and {MAX_SESSION_MINUTES}, got {}",
            self.session_minutes
        );
        ensure!(self.max_series_instances >= 1, "MAX_SERIES_INSTANCES must be at least 1");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_keys_fall_back() {
        assert_eq!(parse_or::<u32>("JOIN_RETRIES", None, 5).unwrap(), 5);
        assert_eq!(parse_or::<u32>("JOIN_RETRIES", Some(" 8 ".into()), 5).unwrap(), 8);
    }

    #[test]
    fn out_of_range_settings_are_rejected() {
        Config::default().validate().unwrap();

        let huge = Config { session_minutes: i64::MAX, ..Config::default() };
        assert!(huge.validate().unwrap_err().to_string().contains("SESSION_MINUTES"));
        let none = Config { session_minutes: 0, ..Config::default() };
        assert!(none.validate().is_err());

        let empty = Config { max_series_instances: 0, ..Config::default() };
        assert!(empty.validate().unwrap_err().to_string().contains("MAX_SERIES_INSTANCES"));
    }

    #[test]
    fn bad_numbers_name_the_key() {
        let err = parse_or::<usize>("MAX_SERIES_INSTANCES", Some("lots".into()), 52).unwrap_err();
        assert!(err.to_string().contains("MAX_SERIES_INSTANCES"));
    }
}
