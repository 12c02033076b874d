// src/data_analysis/sampling_rate.rs

use log::debug;
use serde::Serialize;

use crate::data_analysis::signal_stats::{mean, median, std_dev};
use crate::error::ComputeError;

/// Effective sample rate and log duration derived from the timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingInfo {
    pub rate_hz: f64,
    pub duration_sec: f64,
}

/// Estimates the sample rate from the median timestamp delta.
///
/// The median keeps the estimate stable when the logger drops the odd frame.
/// A coefficient of variation of the deltas above `max_cv` means the time
/// column is not a clock at all and the estimate is refused.
pub fn estimate(times_us: &[u64], max_cv: f64) -> Result<SamplingInfo, ComputeError> {
    if times_us.len() < 2 {
        return Err(ComputeError::SignalTooShort {
            len: times_us.len(),
            needed: 2,
        });
    }

    let deltas: Vec<f64> = times_us
        .windows(2)
        .map(|pair| pair[1] as f64 - pair[0] as f64)
        .collect();

    let median_delta = median(&deltas).unwrap_or(0.0);
    if median_delta <= 0.0 {
        return Err(ComputeError::NonPositiveTimeDelta(median_delta));
    }

    let mean_delta = mean(&deltas).unwrap_or(median_delta);
    let cv = if mean_delta > 0.0 {
        std_dev(&deltas) / mean_delta
    } else {
        f64::INFINITY
    };
    if cv > max_cv {
        return Err(ComputeError::IrregularTimeDeltas { cv, limit: max_cv });
    }

    let first = times_us[0];
    let last = times_us[times_us.len() - 1];
    let info = SamplingInfo {
        rate_hz: 1e6 / median_delta,
        duration_sec: last.saturating_sub(first) as f64 / 1e6,
    };
    debug!(
        "Sampling: median delta {:.2} us, cv {:.3}, rate {:.1} Hz, duration {:.2} s",
        median_delta, cv, info.rate_hz, info.duration_sec
    );
    Ok(info)
}
