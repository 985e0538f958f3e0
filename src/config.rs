//! Application-level configuration loading, including every timing knob of
//! the board engine.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "ENCORE_BOARD_CONFIG_PATH";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
///
/// All durations are stored as milliseconds and exposed through typed
/// accessors.
pub struct AppConfig {
    /// Per-(session, song) vote cool-down, in milliseconds.
    pub cooldown_ms: u64,
    /// Search input debounce window, in milliseconds.
    pub debounce_ms: u64,
    /// Lifetime of a moved-up / moved-down flag, in milliseconds.
    pub move_flag_ms: u64,
    /// Lifetime of the new-leader flag, in milliseconds.
    pub lead_flag_ms: u64,
    /// Lifetime of a vote toast, in milliseconds.
    pub toast_ms: u64,
    /// Quiet period after the last click before the meter starts to decay.
    pub click_quiet_ms: u64,
    /// Interval between click-meter decay steps, in milliseconds.
    pub click_step_ms: u64,
    /// First reconnect backoff delay, in milliseconds.
    pub backoff_base_ms: u64,
    /// Upper bound on any reconnect delay, in milliseconds.
    pub backoff_cap_ms: u64,
    /// Reconnect attempts before the live link gives up for good.
    pub max_reconnect_attempts: u32,
    /// How many songs the initial paint asks the store for.
    pub initial_top_n: usize,
    /// Fixed tie-break seed; omitted means a fresh one per process.
    pub session_seed: Option<u64>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the
    /// built-in defaults on any problem.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded board configuration");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Vote admission cool-down.
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Search debounce window.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Moved-up / moved-down flag lifetime.
    pub fn move_flag_ttl(&self) -> Duration {
        Duration::from_millis(self.move_flag_ms)
    }

    /// New-leader flag lifetime.
    pub fn lead_flag_ttl(&self) -> Duration {
        Duration::from_millis(self.lead_flag_ms)
    }

    /// Vote toast lifetime.
    pub fn toast_ttl(&self) -> Duration {
        Duration::from_millis(self.toast_ms)
    }

    /// Click-meter quiet period before decay starts.
    pub fn click_quiet(&self) -> Duration {
        Duration::from_millis(self.click_quiet_ms)
    }

    /// Click-meter decay step interval.
    pub fn click_step(&self) -> Duration {
        Duration::from_millis(self.click_step_ms)
    }

    /// Backoff policy for the live store link.
    pub fn backoff(&self) -> crate::state::link::BackoffPolicy {
        crate::state::link::BackoffPolicy {
            base: Duration::from_millis(self.backoff_base_ms),
            cap: Duration::from_millis(self.backoff_cap_ms),
            max_attempts: self.max_reconnect_attempts,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 300,
            debounce_ms: 300,
            move_flag_ms: 2_000,
            lead_flag_ms: 3_000,
            toast_ms: 1_500,
            click_quiet_ms: 1_200,
            click_step_ms: 250,
            backoff_base_ms: 1_000,
            backoff_cap_ms: 30_000,
            max_reconnect_attempts: 10,
            initial_top_n: 50,
            session_seed: None,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at
/// [`DEFAULT_CONFIG_PATH`]. Every field is optional; missing entries keep
/// their default.
struct RawConfig {
    cooldown_ms: Option<u64>,
    debounce_ms: Option<u64>,
    move_flag_ms: Option<u64>,
    lead_flag_ms: Option<u64>,
    toast_ms: Option<u64>,
    click_quiet_ms: Option<u64>,
    click_step_ms: Option<u64>,
    backoff_base_ms: Option<u64>,
    backoff_cap_ms: Option<u64>,
    max_reconnect_attempts: Option<u32>,
    initial_top_n: Option<usize>,
    session_seed: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            cooldown_ms: raw.cooldown_ms.unwrap_or(defaults.cooldown_ms),
            debounce_ms: raw.debounce_ms.unwrap_or(defaults.debounce_ms),
            move_flag_ms: raw.move_flag_ms.unwrap_or(defaults.move_flag_ms),
            lead_flag_ms: raw.lead_flag_ms.unwrap_or(defaults.lead_flag_ms),
            toast_ms: raw.toast_ms.unwrap_or(defaults.toast_ms),
            click_quiet_ms: raw.click_quiet_ms.unwrap_or(defaults.click_quiet_ms),
            click_step_ms: raw.click_step_ms.unwrap_or(defaults.click_step_ms),
            backoff_base_ms: raw.backoff_base_ms.unwrap_or(defaults.backoff_base_ms),
            backoff_cap_ms: raw.backoff_cap_ms.unwrap_or(defaults.backoff_cap_ms),
            max_reconnect_attempts: raw
                .max_reconnect_attempts
                .unwrap_or(defaults.max_reconnect_attempts),
            initial_top_n: raw.initial_top_n.unwrap_or(defaults.initial_top_n),
            session_seed: raw.session_seed,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_keep_defaults() {
        let raw: RawConfig = serde_json::from_str(r#"{ "cooldown_ms": 500 }"#).unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.cooldown(), Duration::from_millis(500));
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.initial_top_n, 50);
        assert!(config.session_seed.is_none());
    }

    #[test]
    fn backoff_policy_is_derived_from_millis() {
        let config = AppConfig::default();
        let policy = config.backoff();
        assert_eq!(policy.base, Duration::from_secs(1));
        assert_eq!(policy.cap, Duration::from_secs(30));
        assert_eq!(policy.max_attempts, 10);
    }
}
