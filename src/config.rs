use core::time::Duration;
use goolog::{info, warn};
use thiserror::Error;

const GOOLOG_TARGET: &str = "CONFIG";

/* Defaults (compile-time fallbacks) */
pub const DEFAULT_UNIT_TASK_PRIORITY: i8 = 5;
pub const DEFAULT_UNIT_STACK_BYTES: usize = 64 * 1024;
pub const DEFAULT_BUDGET: u32 = 32;
pub const DEFAULT_PERIODIC_TASK_MS: u64 = 200;
pub const DEFAULT_RX_COALESCE_USECS: u32 = 500;
pub const DEFAULT_RX_COALESCE_FRAMES: u32 = 10;
pub const DEFAULT_TX_COALESCE_FRAMES: u32 = 10;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Tunables sourced from the external settings store.
///
/// `budget` bounds every drain pass of the unit worker; `periodic_task_ms`
/// is the watchdog timer period. The coalescing parameters are passed
/// through to the DMA ring setup done by the external bring-up path and are
/// not enforced here. `unit_task_priority` is advisory: the hosted worker
/// records it but scheduling priority stays with the host scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub unit_task_priority: i8,
    pub unit_stack_bytes: usize,
    pub budget: u32,
    pub periodic_task_ms: u64,
    pub rx_coalesce_usecs: u32,
    pub rx_coalesce_frames: u32,
    pub tx_coalesce_frames: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            unit_task_priority: DEFAULT_UNIT_TASK_PRIORITY,
            unit_stack_bytes: DEFAULT_UNIT_STACK_BYTES,
            budget: DEFAULT_BUDGET,
            periodic_task_ms: DEFAULT_PERIODIC_TASK_MS,
            rx_coalesce_usecs: DEFAULT_RX_COALESCE_USECS,
            rx_coalesce_frames: DEFAULT_RX_COALESCE_FRAMES,
            tx_coalesce_frames: DEFAULT_TX_COALESCE_FRAMES,
        }
    }
}

impl RuntimeConfig {
    /// Apply one recognized `key=value` tunable. Unknown keys are not an
    /// error here so the settings store can carry entries for other
    /// components; they are reported by [`RuntimeConfig::parse`].
    pub fn apply(&mut self, key: &str, value: &str) -> Result<bool, ConfigError> {
        match key {
            "unit_task_priority" => self.unit_task_priority = parse_num("unit_task_priority", value)?,
            "unit_stack_bytes" => self.unit_stack_bytes = parse_nonzero("unit_stack_bytes", value)?,
            "budget" => self.budget = parse_nonzero("budget", value)?,
            "periodic_task_ms" => self.periodic_task_ms = parse_nonzero("periodic_task_ms", value)?,
            "rx_coalesce_usecs" => self.rx_coalesce_usecs = parse_num("rx_coalesce_usecs", value)?,
            "rx_coalesce_frames" => self.rx_coalesce_frames = parse_num("rx_coalesce_frames", value)?,
            "tx_coalesce_frames" => self.tx_coalesce_frames = parse_num("tx_coalesce_frames", value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Build a config from the settings store's `key=value` lines, starting
    /// from the defaults. Malformed lines and unrecognized keys are logged
    /// and skipped so one bad entry cannot take the whole config down.
    pub fn parse(text: &str) -> Self {
        let mut config = RuntimeConfig::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                warn!("Skipping malformed line {:?}", line);
                continue;
            };

            match config.apply(key.trim(), value.trim()) {
                Ok(true) => {}
                Ok(false) => warn!("Unknown tunable {:?}", key.trim()),
                Err(error) => warn!("Skipping tunable: {error}"),
            }
        }

        config
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.periodic_task_ms)
    }

    pub fn log_summary(&self) {
        info!("Unit task priority: {}", self.unit_task_priority);
        info!("Unit stack bytes: {}", self.unit_stack_bytes);
        info!("Budget: {}", self.budget);
        info!("Periodic task: {} ms", self.periodic_task_ms);
        info!(
            "Coalescing: rx {} us / {} frames, tx {} frames",
            self.rx_coalesce_usecs, self.rx_coalesce_frames, self.tx_coalesce_frames
        );
    }
}

fn parse_num<T: core::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn parse_nonzero<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: core::str::FromStr + PartialEq + From<u8>,
{
    let parsed: T = parse_num(key, value)?;
    if parsed == T::from(0u8) {
        return Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fallbacks() {
        let config = RuntimeConfig::default();
        assert_eq!(config.budget, DEFAULT_BUDGET);
        assert_eq!(config.unit_stack_bytes, DEFAULT_UNIT_STACK_BYTES);
        assert_eq!(config.period(), Duration::from_millis(DEFAULT_PERIODIC_TASK_MS));
    }

    #[test]
    fn parse_applies_recognized_keys() {
        let config = RuntimeConfig::parse(
            "budget = 8\nperiodic_task_ms=500\nunit_task_priority=-5\n\n# comment\n",
        );
        assert_eq!(config.budget, 8);
        assert_eq!(config.periodic_task_ms, 500);
        assert_eq!(config.unit_task_priority, -5);
        assert_eq!(config.unit_stack_bytes, DEFAULT_UNIT_STACK_BYTES);
    }

    #[test]
    fn parse_skips_bad_input() {
        let config = RuntimeConfig::parse("budget=zero\nnot a line\nwhatever=1\nbudget=0\n");
        assert_eq!(config.budget, DEFAULT_BUDGET);
    }

    #[test]
    fn apply_rejects_zero_budget() {
        let mut config = RuntimeConfig::default();
        assert!(config.apply("budget", "0").is_err());
        assert!(config.apply("budget", "16").unwrap());
        assert_eq!(config.budget, 16);
    }

    #[test]
    fn apply_reports_unknown_keys() {
        let mut config = RuntimeConfig::default();
        assert!(!config.apply("use_dma", "1").unwrap());
    }
}
