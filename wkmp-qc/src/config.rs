//! wkmp-qc specific configuration
//!
//! Tunables for debouncing, the progress updater and analytics thresholds.
//! Loaded from TOML (`qc.toml`) with compiled defaults for every key.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "WKMP_QC_CONFIG";

/// Config file name looked up in the platform config directories
pub const CONFIG_FILE_NAME: &str = "qc.toml";

/// Quality-control engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcConfig {
    /// Quiet period before a field edit is evaluated (default: 300ms)
    pub debounce_ms: u64,

    /// Elapsed-time updater period while tracking (default: 1000ms)
    pub tick_interval_ms: u64,

    /// Fix rate counted as 100% efficiency halved (default: 0.5 issues/min)
    pub velocity_baseline_per_min: f64,

    /// Milestones considered for trend classification (default: 5)
    pub trend_window: usize,

    /// Second-half/first-half rate ratio above which the trend accelerates
    pub accelerating_ratio: f64,

    /// Second-half/first-half rate ratio below which the trend slows
    pub slowing_ratio: f64,

    /// Time to first fix that triggers an "errors first" hint (default: 300s)
    pub slow_first_fix_secs: u64,

    /// Average time per fix that triggers a bulk-action hint (default: 120s)
    pub slow_fix_secs: u64,

    /// Event bus channel capacity (default: 100)
    pub event_capacity: usize,

    /// Report the registry's total to the progress tracker on every change
    pub auto_report_issue_count: bool,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            tick_interval_ms: 1000,
            velocity_baseline_per_min: 0.5,
            trend_window: 5,
            accelerating_ratio: 1.2,
            slowing_ratio: 0.8,
            slow_first_fix_secs: 300,
            slow_fix_secs: 120,
            event_capacity: 100,
            auto_report_issue_count: true,
        }
    }
}

impl QcConfig {
    /// Load configuration, then normalise it
    ///
    /// Resolution order: `explicit` path, `WKMP_QC_CONFIG`, platform config
    /// directory, compiled defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = wkmp_common::config::resolve_config_file(explicit, CONFIG_ENV_VAR, CONFIG_FILE_NAME);
        let config: QcConfig = wkmp_common::config::load_toml_or_default(path.as_deref())?;
        Ok(config.validate())
    }

    /// Parse configuration from TOML text, then normalise it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: QcConfig = wkmp_common::config::parse_toml(content)?;
        Ok(config.validate())
    }

    /// Replace nonsensical values with usable ones, logging each correction
    pub fn validate(mut self) -> Self {
        let defaults = Self::default();

        if self.debounce_ms == 0 {
            warn!("debounce_ms = 0 is not allowed, using 1ms");
            self.debounce_ms = 1;
        }
        if self.tick_interval_ms == 0 {
            warn!("tick_interval_ms = 0 is not allowed, using {}ms", defaults.tick_interval_ms);
            self.tick_interval_ms = defaults.tick_interval_ms;
        }
        if !(self.velocity_baseline_per_min.is_finite() && self.velocity_baseline_per_min > 0.0) {
            warn!(
                "velocity_baseline_per_min = {} is not positive, using {}",
                self.velocity_baseline_per_min, defaults.velocity_baseline_per_min
            );
            self.velocity_baseline_per_min = defaults.velocity_baseline_per_min;
        }
        if self.trend_window < 3 {
            warn!("trend_window = {} is below 3, using 3", self.trend_window);
            self.trend_window = 3;
        }
        if !(self.slowing_ratio.is_finite()
            && self.accelerating_ratio.is_finite()
            && self.slowing_ratio < self.accelerating_ratio)
        {
            warn!(
                "Trend ratios slowing={} accelerating={} are inconsistent, using defaults",
                self.slowing_ratio, self.accelerating_ratio
            );
            self.slowing_ratio = defaults.slowing_ratio;
            self.accelerating_ratio = defaults.accelerating_ratio;
        }
        if self.event_capacity == 0 {
            warn!("event_capacity = 0 is not allowed, using {}", defaults.event_capacity);
            self.event_capacity = defaults.event_capacity;
        }

        self
    }

    pub fn debounce_delay(&self) -> Duration {
        wkmp_common::time::millis_to_duration(self.debounce_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        wkmp_common::time::millis_to_duration(self.tick_interval_ms)
    }
}
