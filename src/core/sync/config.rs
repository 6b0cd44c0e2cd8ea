/*!
 * Synchronizer Configuration
 *
 * Construction-time settings, validated eagerly so an invalid instance
 * never reaches concurrent use.
 */

use crate::core::errors::{SyncError, SyncResult};
use crate::core::limits::{BINARY_SEMAPHORE_UNITS, DEFAULT_SYNC_NAME};
use serde::{Deserialize, Serialize};

/// Counting semaphore configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemaphoreConfig {
    /// Units available at construction
    pub initial_units: usize,
    /// Upper bound on available units; releasing past it is an invariant violation
    pub max_units: Option<usize>,
    /// Name attached to tracing events
    pub name: String,
}

impl Default for SemaphoreConfig {
    fn default() -> Self {
        Self {
            initial_units: 0,
            max_units: None,
            name: DEFAULT_SYNC_NAME.to_string(),
        }
    }
}

impl SemaphoreConfig {
    /// Unbounded semaphore starting with `initial_units`
    pub fn new(initial_units: usize) -> Self {
        Self {
            initial_units,
            ..Default::default()
        }
    }

    /// Single unit, never more
    pub fn binary() -> Self {
        Self::bounded(BINARY_SEMAPHORE_UNITS)
    }

    /// Starts full with `units` and never holds more
    pub fn bounded(units: usize) -> Self {
        Self {
            initial_units: units,
            max_units: Some(units),
            ..Default::default()
        }
    }

    pub fn with_initial_units(mut self, units: usize) -> Self {
        self.initial_units = units;
        self
    }

    pub fn with_max_units(mut self, max: usize) -> Self {
        self.max_units = Some(max);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Reject configurations no semaphore can honor
    pub fn validate(&self) -> SyncResult<()> {
        if let Some(max) = self.max_units {
            if max == 0 {
                return Err(SyncError::invalid_argument("max_units must be greater than zero"));
            }
            if self.initial_units > max {
                return Err(SyncError::invalid_argument(format!(
                    "initial_units {} exceeds max_units {}",
                    self.initial_units, max
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let binary = SemaphoreConfig::binary();
        assert_eq!(binary.initial_units, 1);
        assert_eq!(binary.max_units, Some(1));
        assert!(binary.validate().is_ok());

        let unbounded = SemaphoreConfig::new(7).with_name("pool");
        assert_eq!(unbounded.max_units, None);
        assert_eq!(unbounded.name, "pool");
        assert!(unbounded.validate().is_ok());
    }

    #[test]
    fn test_initial_above_max_rejected() {
        let config = SemaphoreConfig::new(5).with_max_units(3);
        assert!(matches!(config.validate(), Err(SyncError::InvalidArgument(_))));
    }

    #[test]
    fn test_zero_max_rejected() {
        let config = SemaphoreConfig::default().with_max_units(0);
        assert!(matches!(config.validate(), Err(SyncError::InvalidArgument(_))));
    }
}
