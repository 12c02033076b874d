// src/config.rs

use std::time::Duration;

use crate::constants::RAW_SNIPPET_MAX_SAMPLES;

/// Engine limits for one analysis call. Tuning heuristics live in `TuningPolicy`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Fewer valid samples than this is a parse error.
    pub min_samples: usize,
    /// Hard cap on parsed samples; larger logs are rejected instead of analysed.
    pub max_samples: usize,
    /// Fraction of data rows that may be skipped as unreadable.
    pub max_skipped_fraction: f64,
    /// Coefficient of variation of time deltas above which the time axis is corrupt.
    pub max_time_delta_cv: f64,
    /// Wall-clock budget for a whole call.
    pub time_budget: Duration,
    pub raw_snippet_len: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_samples: 200,
            max_samples: 5_000_000,
            max_skipped_fraction: 0.05,
            max_time_delta_cv: 1.0,
            time_budget: Duration::from_secs(60),
            raw_snippet_len: RAW_SNIPPET_MAX_SAMPLES,
        }
    }
}

impl AnalysisConfig {
    pub fn parse_limits(&self) -> ParseLimits {
        ParseLimits {
            min_samples: self.min_samples,
            max_samples: self.max_samples,
            max_skipped_fraction: self.max_skipped_fraction,
        }
    }
}

/// Subset of the config the log parser needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParseLimits {
    pub min_samples: usize,
    pub max_samples: usize,
    pub max_skipped_fraction: f64,
}

impl Default for ParseLimits {
    fn default() -> Self {
        AnalysisConfig::default().parse_limits()
    }
}
