//! Trickle timer configuration.

use {std::time::Duration, thiserror::Error};

/// Smallest Trickle interval. The radio stack this protocol grew up on
/// ticked at 128 Hz and used 16 ticks, which is 125 ms.
pub const DEFAULT_IMIN: Duration = Duration::from_millis(125);

/// Default number of interval doublings: Imax = Imin << 10, about 128 s.
pub const DEFAULT_MAX_DOUBLINGS: u32 = 10;

/// Default redundancy constant k: a transmission is suppressed when at
/// least this many consistent packets were heard in the current interval.
pub const DEFAULT_REDUNDANCY: u32 = 2;

/// Configuration for the dissemination Trickle timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisseminationConfig {
    /// Smallest (and initial) interval.
    pub imin: Duration,
    /// How many times the interval may double before it pins at Imax.
    pub max_doublings: u32,
    /// Redundancy constant k. Must be at least 1.
    pub redundancy_constant: u32,
}

impl Default for DisseminationConfig {
    fn default() -> Self {
        Self {
            imin: DEFAULT_IMIN,
            max_doublings: DEFAULT_MAX_DOUBLINGS,
            redundancy_constant: DEFAULT_REDUNDANCY,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("imin must be non-zero")]
    ZeroImin,
    #[error("max_doublings {0} too large, interval arithmetic would overflow")]
    ExcessiveDoublings(u32),
    #[error("redundancy constant must be at least 1")]
    ZeroRedundancy,
}

impl DisseminationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.imin.is_zero() {
            return Err(ConfigError::ZeroImin);
        }
        if self.max_doublings > 24 {
            return Err(ConfigError::ExcessiveDoublings(self.max_doublings));
        }
        if self.redundancy_constant == 0 {
            return Err(ConfigError::ZeroRedundancy);
        }
        Ok(())
    }

    /// Largest interval this configuration allows.
    pub fn imax(&self) -> Duration {
        self.imin.saturating_mul(1u32 << self.max_doublings.min(24))
    }

    /// Small intervals for fast tests.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn dev_default() -> Self {
        Self {
            imin: Duration::from_millis(8),
            max_doublings: 4,
            redundancy_constant: 2,
        }
    }
}
