use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

use crate::trust::DEFAULT_SEVERITY_SCALE;

/// Upper bound on the tilt recovery delay (one year)
pub const MAX_TILT_RECOVERY_DELAY_HOURS: i64 = 24 * 365;

/// Configuration for the fairness oracle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Trust ledger scoring
    pub trust: TrustConfig,
    /// Periodic tilt recovery
    pub recovery: RecoveryConfig,
    /// Snapshot persistence
    pub persistence: PersistenceConfig,
    /// In-process event bus
    pub bus: BusConfig,
    /// Session anomaly detection
    pub gameplay: GameplayConfig,
    /// Casino grading
    pub grading: GradingConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Aggregate score of a new casino record
    pub starting_casino_score: f64,
    /// Aggregate score of a new degen record
    pub starting_user_score: f64,
    /// Penalty per severity level 1..=5
    pub severity_scale: Vec<f64>,
    /// Tilt indicators recovered per hour since the last update
    pub recovery_rate_per_hour: f64,
    /// History entries kept per record
    pub history_limit: usize,
    /// Delay before a tilted user is due for recovery
    pub tilt_recovery_delay_hours: i64,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            starting_casino_score: 75.0,
            starting_user_score: 70.0,
            severity_scale: DEFAULT_SEVERITY_SCALE.to_vec(),
            recovery_rate_per_hour: 0.5,
            history_limit: 100,
            tilt_recovery_delay_hours: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Run the background recovery scheduler
    pub enabled: bool,
    /// Seconds between recovery passes
    pub interval_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Snapshot directory; `None` keeps all state in memory
    pub dir: Option<PathBuf>,
    /// Quiet period before a burst of updates is written
    pub debounce_ms: u64,
    pub casino_file: String,
    pub degen_file: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            dir: Some(PathBuf::from("./data")),
            debounce_ms: 250,
            casino_file: "casino-trust.json".to_string(),
            degen_file: "degen-trust.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Queued inbound events before publishers wait
    pub inbound_capacity: usize,
    /// Updates buffered per subscriber before it lags
    pub outbound_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            inbound_capacity: 1024,
            outbound_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameplayConfig {
    /// Expected RTP for games without a published figure
    pub default_rtp: f64,
    /// Published RTP per game id
    pub game_rtps: HashMap<String, f64>,
    /// Expected bonus trigger probability per spin
    pub expected_bonus_rate: f64,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        let game_rtps = [
            ("gates-of-olympus", 0.96),
            ("sugar-rush", 0.965),
            ("sweet-bonanza", 0.963),
            ("dog-house", 0.96),
            ("wanted-dead-or-alive", 0.96),
        ]
        .into_iter()
        .map(|(game, rtp)| (game.to_string(), rtp))
        .collect();

        Self {
            default_rtp: 0.96,
            game_rtps,
            expected_bonus_rate: 0.01,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingConfig {
    /// Mean net return per spin assumed when telemetry carries none
    pub theoretical_return: f64,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            theoretical_return: -0.02,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// Also write daily-rotated log files here
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            log_dir: None,
        }
    }
}

impl OracleConfig {
    /// Load configuration from `FAIRPLAY_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup, starting from defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string());

        // Trust scoring
        parse_into(&var, "FAIRPLAY_STARTING_CASINO_SCORE", &mut config.trust.starting_casino_score)?;
        parse_into(&var, "FAIRPLAY_STARTING_USER_SCORE", &mut config.trust.starting_user_score)?;
        parse_into(&var, "FAIRPLAY_RECOVERY_RATE_PER_HOUR", &mut config.trust.recovery_rate_per_hour)?;
        parse_into(&var, "FAIRPLAY_HISTORY_LIMIT", &mut config.trust.history_limit)?;
        parse_into(&var, "FAIRPLAY_TILT_RECOVERY_DELAY_HOURS", &mut config.trust.tilt_recovery_delay_hours)?;

        if let Some(scale) = var("FAIRPLAY_SEVERITY_SCALE") {
            config.trust.severity_scale = scale
                .split(',')
                .map(|s| s.trim().parse::<f64>())
                .collect::<std::result::Result<Vec<f64>, _>>()
                .context("Invalid FAIRPLAY_SEVERITY_SCALE value")?;
        }

        // Recovery scheduler
        parse_into(&var, "FAIRPLAY_RECOVERY_ENABLED", &mut config.recovery.enabled)?;
        parse_into(&var, "FAIRPLAY_RECOVERY_INTERVAL_SECS", &mut config.recovery.interval_secs)?;

        // Persistence
        if let Some(dir) = var("FAIRPLAY_PERSIST_DIR") {
            config.persistence.dir = if dir.is_empty() || dir.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(PathBuf::from(dir))
            };
        }
        parse_into(&var, "FAIRPLAY_PERSIST_DEBOUNCE_MS", &mut config.persistence.debounce_ms)?;

        // Event bus
        parse_into(&var, "FAIRPLAY_BUS_INBOUND_CAPACITY", &mut config.bus.inbound_capacity)?;
        parse_into(&var, "FAIRPLAY_BUS_OUTBOUND_CAPACITY", &mut config.bus.outbound_capacity)?;

        // Detection and grading
        parse_into(&var, "FAIRPLAY_DEFAULT_RTP", &mut config.gameplay.default_rtp)?;
        parse_into(&var, "FAIRPLAY_EXPECTED_BONUS_RATE", &mut config.gameplay.expected_bonus_rate)?;
        parse_into(&var, "FAIRPLAY_THEORETICAL_RETURN", &mut config.grading.theoretical_return)?;

        // Logging
        if let Some(level) = var("FAIRPLAY_LOG_LEVEL") {
            config.logging.level = level;
        }
        parse_into(&var, "FAIRPLAY_LOG_JSON", &mut config.logging.json)?;
        if let Some(dir) = var("FAIRPLAY_LOG_DIR").filter(|d| !d.is_empty()) {
            config.logging.log_dir = Some(PathBuf::from(dir));
        }

        config.validate()?;

        info!(
            persistence = ?config.persistence.dir,
            recovery_enabled = config.recovery.enabled,
            "Oracle configuration loaded"
        );
        Ok(config)
    }

    /// Validate configuration for consistency
    pub fn validate(&self) -> Result<()> {
        let trust = &self.trust;
        for (name, score) in [
            ("starting_casino_score", trust.starting_casino_score),
            ("starting_user_score", trust.starting_user_score),
        ] {
            if !(0.0..=100.0).contains(&score) {
                return Err(anyhow::anyhow!("{} must be within 0..=100, got {}", name, score));
            }
        }

        if trust.severity_scale.len() != 5
            || trust.severity_scale.iter().any(|p| !p.is_finite() || *p <= 0.0)
        {
            return Err(anyhow::anyhow!(
                "Severity scale must have 5 positive entries, got {:?}",
                trust.severity_scale
            ));
        }

        if !trust.recovery_rate_per_hour.is_finite() || trust.recovery_rate_per_hour < 0.0 {
            return Err(anyhow::anyhow!(
                "Recovery rate must be non-negative, got {}",
                trust.recovery_rate_per_hour
            ));
        }

        if trust.history_limit == 0 {
            return Err(anyhow::anyhow!("History limit must be non-zero"));
        }

        if !(0..=MAX_TILT_RECOVERY_DELAY_HOURS).contains(&trust.tilt_recovery_delay_hours) {
            return Err(anyhow::anyhow!(
                "Tilt recovery delay must be within 0..={} hours, got {}",
                MAX_TILT_RECOVERY_DELAY_HOURS,
                trust.tilt_recovery_delay_hours
            ));
        }

        if self.recovery.interval_secs == 0 {
            return Err(anyhow::anyhow!("Recovery interval must be non-zero"));
        }

        if self.persistence.dir.is_some() {
            if self.persistence.debounce_ms == 0 {
                return Err(anyhow::anyhow!("Persistence debounce must be non-zero"));
            }
            if self.persistence.casino_file.is_empty() || self.persistence.degen_file.is_empty() {
                return Err(anyhow::anyhow!("Snapshot file names cannot be empty"));
            }
        }

        if self.bus.inbound_capacity == 0 || self.bus.outbound_capacity == 0 {
            return Err(anyhow::anyhow!("Bus capacities must be non-zero"));
        }

        if !(self.gameplay.default_rtp > 0.0) {
            return Err(anyhow::anyhow!(
                "Default RTP must be positive, got {}",
                self.gameplay.default_rtp
            ));
        }

        for (game, rtp) in &self.gameplay.game_rtps {
            if !(*rtp > 0.0) {
                return Err(anyhow::anyhow!("RTP for game {} must be positive, got {}", game, rtp));
            }
        }

        if !(self.gameplay.expected_bonus_rate > 0.0 && self.gameplay.expected_bonus_rate <= 1.0) {
            return Err(anyhow::anyhow!(
                "Expected bonus rate must be within (0, 1], got {}",
                self.gameplay.expected_bonus_rate
            ));
        }

        if !self.grading.theoretical_return.is_finite() {
            return Err(anyhow::anyhow!("Theoretical return must be finite"));
        }

        Ok(())
    }
}

/// Overwrite `target` when `key` is set
fn parse_into<T>(var: &impl Fn(&str) -> Option<String>, key: &str, target: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Some(value) = var(key) {
        *target = value
            .parse()
            .with_context(|| format!("Invalid {} value", key))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = OracleConfig::default();
        config.validate().unwrap();
        assert_eq!(config.trust.severity_scale, vec![2.0, 4.0, 6.0, 8.0, 12.0]);
        assert_eq!(config.persistence.dir, Some(PathBuf::from("./data")));
    }

    #[test]
    fn test_overrides() {
        let config = OracleConfig::from_lookup(lookup(&[
            ("FAIRPLAY_RECOVERY_RATE_PER_HOUR", "1.5"),
            ("FAIRPLAY_SEVERITY_SCALE", "1, 2, 3, 4, 5"),
            ("FAIRPLAY_PERSIST_DEBOUNCE_MS", "500"),
            ("FAIRPLAY_LOG_JSON", "true"),
            ("FAIRPLAY_LOG_DIR", "/var/log/fairplay"),
        ]))
        .unwrap();
        assert_eq!(config.trust.recovery_rate_per_hour, 1.5);
        assert_eq!(config.trust.severity_scale, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(config.persistence.debounce_ms, 500);
        assert!(config.logging.json);
        assert_eq!(config.logging.log_dir, Some(PathBuf::from("/var/log/fairplay")));
    }

    #[test]
    fn test_persistence_can_be_disabled() {
        for value in ["", "none", "NONE"] {
            let config =
                OracleConfig::from_lookup(lookup(&[("FAIRPLAY_PERSIST_DIR", value)])).unwrap();
            assert!(config.persistence.dir.is_none());
        }
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = OracleConfig::from_lookup(lookup(&[("FAIRPLAY_HISTORY_LIMIT", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("FAIRPLAY_HISTORY_LIMIT"));
    }

    #[test]
    fn test_validation() {
        let mut config = OracleConfig::default();
        config.trust.severity_scale = vec![2.0, 4.0, 6.0, 8.0];
        assert!(config.validate().is_err());

        let mut config = OracleConfig::default();
        config.trust.recovery_rate_per_hour = -0.1;
        assert!(config.validate().is_err());

        let mut config = OracleConfig::default();
        config.gameplay.default_rtp = 0.0;
        assert!(config.validate().is_err());

        let mut config = OracleConfig::default();
        config.bus.inbound_capacity = 0;
        assert!(config.validate().is_err());

        // Debounce is irrelevant without persistence
        let mut config = OracleConfig::default();
        config.persistence.dir = None;
        config.persistence.debounce_ms = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tilt_recovery_delay_is_bounded() {
        let mut config = OracleConfig::default();
        config.trust.tilt_recovery_delay_hours = MAX_TILT_RECOVERY_DELAY_HOURS;
        assert!(config.validate().is_ok());

        config.trust.tilt_recovery_delay_hours = MAX_TILT_RECOVERY_DELAY_HOURS + 1;
        assert!(config.validate().is_err());

        config.trust.tilt_recovery_delay_hours = i64::MAX / 2;
        assert!(config.validate().is_err());

        config.trust.tilt_recovery_delay_hours = -1;
        assert!(config.validate().is_err());
    }
}
