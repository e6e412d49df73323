//! Sampling cadence configuration.

use {canopy_dissemination::ReportInterval, std::time::Duration, thiserror::Error};

/// Period for interval code 1 ("short").
pub const DEFAULT_SHORT_PERIOD: Duration = Duration::from_secs(300);

/// Period for interval code 2 ("long").
pub const DEFAULT_LONG_PERIOD: Duration = Duration::from_secs(600);

/// Configuration for the sample collector.
///
/// The sample timer fires every half-period of whichever interval is
/// active, so the defaults sample every 150 s and 300 s respectively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    pub short_period: Duration,
    pub long_period: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            short_period: DEFAULT_SHORT_PERIOD,
            long_period: DEFAULT_LONG_PERIOD,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("short period must be non-zero")]
    ZeroShortPeriod,
    #[error("long period must be non-zero")]
    ZeroLongPeriod,
}

impl CollectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.short_period.is_zero() {
            return Err(ConfigError::ZeroShortPeriod);
        }
        if self.long_period.is_zero() {
            return Err(ConfigError::ZeroLongPeriod);
        }
        Ok(())
    }

    /// Concrete period for an interval code.
    pub fn period(&self, interval: ReportInterval) -> Duration {
        match interval {
            ReportInterval::Short => self.short_period,
            ReportInterval::Long => self.long_period,
        }
    }

    /// Sub-second periods for fast tests.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn dev_default() -> Self {
        Self {
            short_period: Duration::from_millis(200),
            long_period: Duration::from_millis(400),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CollectorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.period(ReportInterval::Short), Duration::from_secs(300));
        assert_eq!(config.period(ReportInterval::Long), Duration::from_secs(600));
    }

    #[test]
    fn test_zero_periods_rejected() {
        let config = CollectorConfig {
            short_period: Duration::ZERO,
            ..CollectorConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroShortPeriod));

        let config = CollectorConfig {
            long_period: Duration::ZERO,
            ..CollectorConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroLongPeriod));
    }

    #[test]
    fn test_dev_default_is_valid() {
        assert!(CollectorConfig::dev_default().validate().is_ok());
    }
}
