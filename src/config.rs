use clap::ArgMatches;
use thiserror::Error;

use crate::cadence::Cadence;

pub const ENABLED_ENV: &str = "PRODUCER_ENABLED";
pub const BROKERS_ENV: &str = "KAFKA_BROKERS";
pub const RATE_ENV: &str = "PRODUCER_RPM";

/// All events go to this topic.
pub const TOPIC: &str = "user_events";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("PRODUCER_ENABLED is not set")]
    MissingEnabled,

    #[error("KAFKA_BROKERS is not set")]
    MissingBrokers,

    #[error("PRODUCER_RPM is not set")]
    MissingRate,

    #[error("PRODUCER_RPM must be an integer, got {value:?}")]
    InvalidRate { value: String },

    #[error("PRODUCER_RPM must be a positive number of events per minute, got {rate}")]
    NonPositiveRate { rate: i64 },
}

/// Settings exactly as they were supplied, before validation.
#[derive(Debug, Clone, Default)]
pub struct RawSettings {
    pub enabled: Option<String>,
    pub brokers: Option<String>,
    pub rate: Option<String>,
}

impl RawSettings {
    pub fn from_matches(matches: &ArgMatches<'_>) -> Self {
        RawSettings {
            enabled: matches.value_of("enabled").map(str::to_owned),
            brokers: matches.value_of("brokers").map(str::to_owned),
            rate: matches.value_of("rate").map(str::to_owned),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub brokers: String,
    pub topic: String,
    pub cadence: Cadence,
}

#[derive(Debug)]
pub enum Launch {
    Disabled,
    Run(Settings),
}

impl Settings {
    /// Validates in the order enabled, brokers, rate. A disabled producer
    /// needs nothing else to be set.
    pub fn resolve(raw: RawSettings) -> Result<Launch, ConfigError> {
        let enabled = present(raw.enabled).ok_or(ConfigError::MissingEnabled)?;
        if enabled != "true" {
            return Ok(Launch::Disabled);
        }

        let brokers = present(raw.brokers).ok_or(ConfigError::MissingBrokers)?;

        let rate = present(raw.rate).ok_or(ConfigError::MissingRate)?;
        let rate: i64 = rate
            .parse()
            .map_err(|_| ConfigError::InvalidRate { value: rate.clone() })?;

        Ok(Launch::Run(Settings {
            brokers,
            topic: TOPIC.to_owned(),
            cadence: Cadence::per_minute(rate)?,
        }))
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
