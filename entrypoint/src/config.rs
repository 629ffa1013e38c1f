use serde::{Serialize, Serializer};
use std::path::PathBuf;

pub const ENV_ENVIRONMENT: &str = "ENVIRONMENT";
pub const ENV_BROKER_URL: &str = "CELERY_BROKER_URL";
pub const ENV_ENABLE_ARIA2: &str = "ENABLE_ARIA2";
pub const ENV_ARIA2_SECRET: &str = "ARIA2_SECRET";
pub const ENV_ARIA2_MAX_CONNECTIONS: &str = "ARIA2_MAX_CONNECTIONS";
pub const ENV_ARIA2_SPLITS: &str = "ARIA2_SPLITS";
pub const ENV_ENABLE_MONITORING: &str = "ENABLE_PERFORMANCE_MONITORING";
pub const ENV_APP_ROOT: &str = "APP_ROOT";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_LOG_RETENTION_DAYS: &str = "LOG_RETENTION_DAYS";

/// Resolved settings for one supervisor run.
///
/// Built once before anything else happens and never mutated afterwards.
/// Values handed to downstream services are taken verbatim from the
/// environment; only the enable flags and the supervisor's own logging
/// settings are interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
  pub environment: String,
  pub broker_url: String,
  pub app_root: PathBuf,
  pub monitoring_enabled: bool,
  pub aria2: Aria2Config,
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aria2Config {
  pub enabled: bool,

  #[serde(serialize_with = "redact")]
  pub secret: String,

  pub max_connections_per_server: String,
  pub split: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggingConfig {
  pub level: String,
  pub retention_days: u64,
}

impl Default for Config {
  fn default() -> Self {
    Self::from_lookup(|_| None)
  }
}

fn default_environment() -> String {
  "development".to_string()
}

fn default_broker_url() -> String {
  "redis://localhost:6379/0".to_string()
}

fn default_app_root() -> PathBuf {
  PathBuf::from("/app")
}

fn default_aria2_secret() -> String {
  "turmola_secret".to_string()
}

fn default_aria2_max_connections() -> String {
  "10".to_string()
}

fn default_aria2_splits() -> String {
  "10".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_retention_days() -> u64 {
  14
}

impl Config {
  pub fn from_env() -> Self {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Resolves every setting through `lookup`, falling back to the default
  /// when a key is missing or empty.
  pub fn from_lookup<F>(lookup: F) -> Self
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

    let retention_days = match get(ENV_LOG_RETENTION_DAYS) {
      Some(raw) => raw.trim().parse().unwrap_or_else(|_| default_retention_days()),
      None => default_retention_days(),
    };

    Self {
      environment: get(ENV_ENVIRONMENT).unwrap_or_else(default_environment),
      broker_url: get(ENV_BROKER_URL).unwrap_or_else(default_broker_url),
      app_root: get(ENV_APP_ROOT)
        .map(PathBuf::from)
        .unwrap_or_else(default_app_root),
      monitoring_enabled: get(ENV_ENABLE_MONITORING).is_some_and(|v| parse_flag(&v)),
      aria2: Aria2Config {
        enabled: get(ENV_ENABLE_ARIA2).is_some_and(|v| parse_flag(&v)),
        secret: get(ENV_ARIA2_SECRET).unwrap_or_else(default_aria2_secret),
        max_connections_per_server: get(ENV_ARIA2_MAX_CONNECTIONS)
          .unwrap_or_else(default_aria2_max_connections),
        split: get(ENV_ARIA2_SPLITS).unwrap_or_else(default_aria2_splits),
      },
      logging: LoggingConfig {
        level: get(ENV_LOG_LEVEL)
          .map(|v| v.to_ascii_lowercase())
          .unwrap_or_else(default_log_level),
        retention_days,
      },
    }
  }

  pub fn to_toml(&self) -> anyhow::Result<String> {
    Ok(toml::to_string_pretty(self)?)
  }
}

/// Only the literal `true` (any case) enables a feature.
fn parse_flag(raw: &str) -> bool {
  raw.trim().eq_ignore_ascii_case("true")
}

fn redact<S>(_secret: &str, serializer: S) -> Result<S::Ok, S::Error>
where
  S: Serializer,
{
  serializer.serialize_str("<redacted>")
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn resolve(pairs: &[(&str, &str)]) -> Config {
    let env: HashMap<String, String> = pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    Config::from_lookup(|key| env.get(key).cloned())
  }

  #[test]
  fn no_overrides_yields_documented_defaults() {
    let cfg = resolve(&[]);
    assert_eq!(cfg.environment, "development");
    assert_eq!(cfg.broker_url, "redis://localhost:6379/0");
    assert!(!cfg.aria2.enabled);
    assert_eq!(cfg.aria2.secret, "turmola_secret");
    assert_eq!(cfg.aria2.max_connections_per_server, "10");
    assert_eq!(cfg.aria2.split, "10");
    assert!(!cfg.monitoring_enabled);
    assert_eq!(cfg.app_root, PathBuf::from("/app"));
    assert_eq!(cfg.logging.level, "info");
    assert_eq!(cfg.logging.retention_days, 14);
    assert_eq!(cfg, Config::default());
  }

  #[test]
  fn empty_values_fall_back_to_defaults() {
    let cfg = resolve(&[
      (ENV_ENVIRONMENT, ""),
      (ENV_BROKER_URL, ""),
      (ENV_ENABLE_ARIA2, ""),
      (ENV_ARIA2_SECRET, ""),
    ]);
    assert_eq!(cfg.environment, "development");
    assert_eq!(cfg.broker_url, "redis://localhost:6379/0");
    assert!(!cfg.aria2.enabled);
    assert_eq!(cfg.aria2.secret, "turmola_secret");
  }

  #[test]
  fn supplied_values_override_defaults() {
    let cfg = resolve(&[
      (ENV_ENVIRONMENT, "production"),
      (ENV_BROKER_URL, "redis://redis:6379/0"),
      (ENV_ENABLE_ARIA2, "TRUE"),
      (ENV_ARIA2_SECRET, "s3cret"),
      (ENV_ENABLE_MONITORING, "true"),
      (ENV_APP_ROOT, "/srv/app"),
      (ENV_LOG_LEVEL, "DEBUG"),
    ]);
    assert_eq!(cfg.environment, "production");
    assert_eq!(cfg.broker_url, "redis://redis:6379/0");
    assert!(cfg.aria2.enabled);
    assert_eq!(cfg.aria2.secret, "s3cret");
    assert!(cfg.monitoring_enabled);
    assert_eq!(cfg.app_root, PathBuf::from("/srv/app"));
    assert_eq!(cfg.logging.level, "debug");
  }

  #[test]
  fn malformed_tuning_values_pass_through() {
    let cfg = resolve(&[
      (ENV_ARIA2_MAX_CONNECTIONS, "lots"),
      (ENV_ARIA2_SPLITS, "-3"),
      (ENV_LOG_RETENTION_DAYS, "forever"),
    ]);
    assert_eq!(cfg.aria2.max_connections_per_server, "lots");
    assert_eq!(cfg.aria2.split, "-3");
    assert_eq!(cfg.logging.retention_days, 14);
  }

  #[test]
  fn only_literal_true_enables_flags() {
    for raw in ["1", "yes", "on", "enabled", "false"] {
      let cfg = resolve(&[(ENV_ENABLE_ARIA2, raw), (ENV_ENABLE_MONITORING, raw)]);
      assert!(!cfg.aria2.enabled, "{raw} should not enable aria2");
      assert!(!cfg.monitoring_enabled, "{raw} should not enable monitoring");
    }
  }

  #[test]
  fn toml_rendering_redacts_secret() {
    let cfg = resolve(&[(ENV_ARIA2_SECRET, "do-not-print")]);
    let raw = cfg.to_toml().unwrap();
    assert!(!raw.contains("do-not-print"));
    assert!(raw.contains("<redacted>"));
    assert!(raw.contains("broker_url = \"redis://localhost:6379/0\""));
  }
}
