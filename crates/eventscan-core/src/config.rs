//! Scanner configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Configuration for a scan engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Base wait between poll iterations.
    pub tick_interval: Duration,
    /// Longer wait applied when a fetch finds no new data, to avoid
    /// hammering the node while caught up.
    pub idle_backoff: Duration,
    /// Position to start from when the store has no checkpoint.
    pub start_position: i64,
    /// Maximum heights fetched concurrently per ranged batch.
    pub max_batch_size: i64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            idle_backoff: Duration::from_secs(5),
            start_position: 0,
            max_batch_size: 50,
        }
    }
}

impl ScanConfig {
    /// Validate at engine construction; a bad config is the only fatal
    /// startup condition.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.tick_interval.is_zero() {
            return Err(ScanError::InvalidConfig(
                "tick_interval must be non-zero".into(),
            ));
        }
        if self.max_batch_size < 1 {
            return Err(ScanError::InvalidConfig(
                "max_batch_size must be at least 1".into(),
            ));
        }
        if self.start_position < 0 {
            return Err(ScanError::InvalidConfig(
                "start_position must not be negative".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(ScanConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_tick_rejected() {
        let config = ScanConfig {
            tick_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ScanError::InvalidConfig(_))
        ));
    }

    #[test]
    fn empty_batch_rejected() {
        let config = ScanConfig {
            max_batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
