use std::time::Duration;

use crate::config::ConfigError;

const NANOS_PER_MINUTE: u64 = 60 * 1_000_000_000;

/// Fixed pacing derived from an events-per-minute target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    per_minute: u64,
}

impl Cadence {
    pub fn per_minute(rate: i64) -> Result<Self, ConfigError> {
        match u64::try_from(rate) {
            Ok(per_minute) if per_minute > 0 => Ok(Cadence { per_minute }),
            _ => Err(ConfigError::NonPositiveRate { rate }),
        }
    }

    pub fn rate(&self) -> u64 {
        self.per_minute
    }

    /// Pause between two ticks, `60s / rate`.
    pub fn delay(&self) -> Duration {
        Duration::from_nanos(NANOS_PER_MINUTE / self.per_minute)
    }
}
