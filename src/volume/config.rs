use std::{env, fs, path::Path, str::FromStr, time::Duration};

use rust_decimal::Decimal;
use serde::Deserialize;

use super::randomization::RandomizationLevel;
use crate::{
    backpack_client::{Error, Result},
    types::Symbol,
};

pub const TOKEN_ENV: &str = "BACKPACK_TOKEN";
pub const INITIAL_BALANCE_ENV: &str = "BACKPACK_INITIAL_BALANCE";
pub const RANDOMIZATION_LEVEL_ENV: &str = "BACKPACK_RANDOMIZATION_LEVEL";
pub const MAX_UNFILLED_RETRIES_ENV: &str = "BACKPACK_MAX_UNFILLED_RETRIES";
pub const MAX_ITERATIONS_ENV: &str = "BACKPACK_MAX_ITERATIONS";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: f64,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(8),
            multiplier: 2.0,
        }
    }
}

impl ExponentialBackoff {
    /// Delay before retry number `attempt` (1-based), capped at `max`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let mut delay = self.initial.min(self.max);
        for _ in 1..attempt {
            if delay >= self.max {
                break;
            }
            delay = delay.mul_f64(self.multiplier).min(self.max);
        }
        delay
    }
}

/// Partially filled loop settings as read from TOML and the environment.
///
/// Missing trading inputs are collected from the operator before
/// [`VolumeSettings::resolve`] turns them into a [`VolumeConfig`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VolumeSettings {
    pub token: Option<String>,
    pub initial_balance: Option<Decimal>,
    pub randomization_level: Option<i64>,
    pub api_url: Option<String>,
    pub max_unfilled_retries: u32,
    pub retry_initial_ms: u64,
    pub retry_max_ms: u64,
    pub retry_multiplier: f64,
    pub max_iterations: Option<u64>,
}

impl Default for VolumeSettings {
    fn default() -> Self {
        let backoff = ExponentialBackoff::default();
        Self {
            token: None,
            initial_balance: None,
            randomization_level: None,
            api_url: None,
            max_unfilled_retries: DEFAULT_MAX_UNFILLED_RETRIES,
            retry_initial_ms: backoff.initial.as_millis() as u64,
            retry_max_ms: backoff.max.as_millis() as u64,
            retry_multiplier: backoff.multiplier,
            max_iterations: None,
        }
    }
}

pub const DEFAULT_MAX_UNFILLED_RETRIES: u32 = 5;

impl VolumeSettings {
    /// Load settings from a TOML file, either top-level or under `[volume]`,
    /// then apply `BACKPACK_*` overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|err| {
            Error::invalid_config("config", format!("failed to read {}: {err}", path.display()))
        })?;
        let mut settings = Self::from_toml_str(&data)?;
        settings.apply_env_overrides();
        Ok(settings)
    }

    pub fn from_toml_str(data: &str) -> Result<Self> {
        let raw: toml::Value = toml::from_str(data)
            .map_err(|err| Error::invalid_config("config", format!("invalid TOML: {err}")))?;
        // Accept a nested [volume] table or top-level entries.
        let nested = raw.get("volume").and_then(toml::Value::as_table).cloned();
        let table = match nested {
            Some(table) => toml::Value::Table(table),
            None => raw,
        };
        table
            .try_into::<Self>()
            .map_err(|err| Error::invalid_config("config", format!("invalid volume config: {err}")))
    }

    /// Defaults plus `BACKPACK_*` overrides.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env_overrides();
        settings
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from any key lookup. Values that fail to parse are
    /// ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(TOKEN_ENV).filter(|value| !value.trim().is_empty()) {
            self.token = Some(token);
        }
        override_parsed(&lookup, INITIAL_BALANCE_ENV, &mut self.initial_balance);
        if let Some(level) = lookup(RANDOMIZATION_LEVEL_ENV) {
            self.randomization_level = Some(i64::from(RandomizationLevel::parse_lenient(&level).get()));
        }
        if let Some(url) = lookup(crate::backpack_client::API_URL_ENV) {
            self.api_url = Some(url);
        }
        if let Some(value) = lookup(MAX_UNFILLED_RETRIES_ENV).and_then(|v| v.trim().parse().ok()) {
            self.max_unfilled_retries = value;
        }
        override_parsed(&lookup, MAX_ITERATIONS_ENV, &mut self.max_iterations);
    }

    pub fn resolve(self) -> Result<VolumeConfig> {
        let token = self
            .token
            .ok_or_else(|| Error::invalid_config("token", "must be provided"))?;
        let symbol = Symbol::usdc_pair(&token)
            .map_err(|err| Error::invalid_config("token", err.to_string()))?;
        let initial_balance = self
            .initial_balance
            .ok_or_else(|| Error::invalid_config("initial_balance", "must be provided"))?;
        let level = self
            .randomization_level
            .map(RandomizationLevel::clamped)
            .unwrap_or_default();

        let config = VolumeConfig {
            symbol,
            initial_balance,
            level,
            max_unfilled_retries: self.max_unfilled_retries,
            backoff: ExponentialBackoff {
                initial: Duration::from_millis(self.retry_initial_ms),
                max: Duration::from_millis(self.retry_max_ms),
                multiplier: self.retry_multiplier,
            },
            max_iterations: self.max_iterations,
        };
        config.validate()?;
        Ok(config)
    }
}

fn override_parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    field: &mut Option<T>,
) {
    if let Some(parsed) = lookup(key).and_then(|value| value.trim().parse::<T>().ok()) {
        *field = Some(parsed);
    }
}

/// Fully resolved inputs of a [`VolumeLoop`](super::VolumeLoop).
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeConfig {
    pub symbol: Symbol,
    pub initial_balance: Decimal,
    pub level: RandomizationLevel,
    /// Non-fills tolerated per leg before the loop gives up.
    pub max_unfilled_retries: u32,
    pub backoff: ExponentialBackoff,
    /// Stop after this many attempts. `None` runs until shut down.
    pub max_iterations: Option<u64>,
}

impl VolumeConfig {
    pub fn new(symbol: Symbol, initial_balance: Decimal, level: RandomizationLevel) -> Self {
        Self {
            symbol,
            initial_balance,
            level,
            max_unfilled_retries: DEFAULT_MAX_UNFILLED_RETRIES,
            backoff: ExponentialBackoff::default(),
            max_iterations: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.initial_balance <= Decimal::ZERO {
            return Err(Error::invalid_config(
                "initial_balance",
                format!("must be positive, got {}", self.initial_balance),
            ));
        }
        if self.backoff.initial > self.backoff.max {
            return Err(Error::invalid_config(
                "retry_initial_ms",
                "must not exceed retry_max_ms",
            ));
        }
        if !(1.0..=10.0).contains(&self.backoff.multiplier) {
            return Err(Error::invalid_config(
                "retry_multiplier",
                "must be between 1.0 and 10.0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rust_decimal_macros::dec;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_toml_nested_and_top_level() {
        let nested = VolumeSettings::from_toml_str(
            r#"
            [volume]
            token = "sol"
            initial_balance = "1000"
            randomization_level = 3
            max_unfilled_retries = 2
            "#,
        )
        .unwrap();
        assert_eq!(nested.token.as_deref(), Some("sol"));
        assert_eq!(nested.initial_balance, Some(dec!(1000)));
        assert_eq!(nested.max_unfilled_retries, 2);
        assert_eq!(nested.retry_initial_ms, 500);

        let flat = VolumeSettings::from_toml_str("token = \"btc\"\ninitial_balance = 25.5\n").unwrap();
        assert_eq!(flat.initial_balance, Some(dec!(25.5)));
        assert_eq!(flat.max_unfilled_retries, DEFAULT_MAX_UNFILLED_RETRIES);

        assert!(VolumeSettings::from_toml_str("token = [").is_err());
    }

    #[test]
    fn test_overrides() {
        let mut settings = VolumeSettings::default();
        settings.apply_overrides(lookup(&[
            (TOKEN_ENV, "eth"),
            (INITIAL_BALANCE_ENV, "12.5"),
            (RANDOMIZATION_LEVEL_ENV, "42"),
            (MAX_UNFILLED_RETRIES_ENV, "not a number"),
            (MAX_ITERATIONS_ENV, "10"),
        ]));

        assert_eq!(settings.token.as_deref(), Some("eth"));
        assert_eq!(settings.initial_balance, Some(dec!(12.5)));
        assert_eq!(settings.randomization_level, Some(10));
        assert_eq!(settings.max_unfilled_retries, DEFAULT_MAX_UNFILLED_RETRIES);
        assert_eq!(settings.max_iterations, Some(10));
    }

    #[test]
    fn test_resolve_builds_usdc_pair() {
        let settings = VolumeSettings {
            token: Some("sol".to_string()),
            initial_balance: Some(dec!(1000)),
            randomization_level: Some(-3),
            ..VolumeSettings::default()
        };
        let config = settings.resolve().unwrap();
        assert_eq!(config.symbol.as_str(), "SOL_USDC");
        assert_eq!(config.level.get(), 0);
        assert_eq!(config.backoff, ExponentialBackoff::default());
    }

    #[test]
    fn test_resolve_rejects_missing_or_bad_inputs() {
        let missing = VolumeSettings::default().resolve().unwrap_err();
        assert!(matches!(missing, Error::InvalidConfig { field: "token", .. }));

        let bad_pair = VolumeSettings {
            token: Some("so l".to_string()),
            initial_balance: Some(dec!(1)),
            ..VolumeSettings::default()
        };
        assert!(bad_pair.resolve().is_err());

        let zero_balance = VolumeSettings {
            token: Some("sol".to_string()),
            initial_balance: Some(Decimal::ZERO),
            ..VolumeSettings::default()
        };
        assert!(matches!(
            zero_balance.resolve(),
            Err(Error::InvalidConfig {
                field: "initial_balance",
                ..
            })
        ));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let backoff = ExponentialBackoff {
            initial: Duration::from_millis(100),
            max: Duration::from_millis(500),
            multiplier: 2.0,
        };
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(400));
        assert_eq!(backoff.delay(4), Duration::from_millis(500));
        assert_eq!(backoff.delay(40), Duration::from_millis(500));
    }
}
