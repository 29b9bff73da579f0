//! Vacuum Configuration

use std::time::Duration;

/// Configuration for the background vacuum task
#[derive(Debug, Clone)]
pub struct VacuumConfig {
    /// Spawn the background task at store construction
    pub enabled: bool,

    /// Sleep between two trigger evaluations
    pub nap_interval: Duration,

    /// Minimum dirty estimate before a vacuum is considered
    pub threshold: usize,

    /// Dirty estimate must also exceed this fraction of the store size
    pub scale_factor: f64,
}

impl Default for VacuumConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            nap_interval: Duration::from_secs(10 * 60),
            threshold: 1000,
            scale_factor: 0.2,
        }
    }
}

impl VacuumConfig {
    /// Default thresholds, but no background task
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_nap_interval(mut self, interval: Duration) -> Self {
        self.nap_interval = interval;
        self
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Whether a store with `dirty` expiring entries out of `len` total is
    /// worth a full scan.
    pub fn should_vacuum(&self, dirty: usize, len: usize) -> bool {
        dirty > self.threshold && dirty as f64 > self.scale_factor * len as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VacuumConfig::default();
        assert!(config.enabled);
        assert_eq!(config.nap_interval, Duration::from_secs(600));
        assert_eq!(config.threshold, 1000);
        assert!((config.scale_factor - 0.2).abs() < f64::EPSILON);
        assert!(!VacuumConfig::disabled().enabled);
    }

    #[test]
    fn test_trigger_condition() {
        let config = VacuumConfig::default();

        // Below the absolute threshold
        assert!(!config.should_vacuum(1000, 1000));
        // Above threshold and above 20% of the store
        assert!(config.should_vacuum(1001, 5000));
        // Above threshold but not above 20% of the store
        assert!(!config.should_vacuum(1001, 5005));
        assert!(!config.should_vacuum(2000, 10_000));
        assert!(config.should_vacuum(2001, 10_000));
    }

    #[test]
    fn test_builder_chaining() {
        let config = VacuumConfig::default()
            .with_threshold(0)
            .with_scale_factor(0.0)
            .with_nap_interval(Duration::from_millis(20));
        assert!(config.should_vacuum(1, 100));
        assert!(!config.should_vacuum(0, 0));
        assert_eq!(config.nap_interval, Duration::from_millis(20));
    }
}
