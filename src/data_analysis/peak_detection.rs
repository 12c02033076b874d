// src/data_analysis/peak_detection.rs

use crate::constants::{
    PEAK_CORE_RADIUS_BINS, PEAK_MIN_PROMINENCE_RATIO, PEAK_NEIGHBORHOOD_RADIUS_BINS,
};
use crate::data_analysis::signal_stats::median;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub freq_hz: f64,
    pub amplitude: f64,
    /// False when no local maximum stood out and the global maximum was taken instead.
    pub prominent: bool,
}

/// Windowed local-maximum test: strictly above the `w` bins on the left and at
/// least as high as the `w` bins on the right, so a plateau reports its leftmost bin.
fn is_local_max(amps: &[f64], j: usize, w: usize) -> bool {
    if j < w || j + w >= amps.len() {
        return false;
    }
    let amp = amps[j];
    (1..=w).all(|k| amp > amps[j - k]) && (1..=w).all(|k| amp >= amps[j + k])
}

/// Median of the neighbourhood around `j`, leaving out the core bins of the peak itself.
fn neighbourhood_median(amps: &[f64], j: usize) -> Option<f64> {
    let lo = j.saturating_sub(PEAK_NEIGHBORHOOD_RADIUS_BINS);
    let hi = (j + PEAK_NEIGHBORHOOD_RADIUS_BINS).min(amps.len() - 1);
    let ring: Vec<f64> = (lo..=hi)
        .filter(|&k| k.abs_diff(j) > PEAK_CORE_RADIUS_BINS)
        .map(|k| amps[k])
        .collect();
    median(&ring)
}

/// Finds the dominant peak among bins strictly above `min_freq_hz`.
///
/// The highest local maximum that stands at least `PEAK_MIN_PROMINENCE_RATIO`
/// times above its neighbourhood median wins; ties go to the lower frequency.
/// Without any prominent candidate the global maximum above the floor is reported.
pub fn find_dominant_peak(freqs: &[f64], amps: &[f64], min_freq_hz: f64) -> Option<Peak> {
    if freqs.len() != amps.len() || amps.is_empty() {
        return None;
    }

    let mut best: Option<Peak> = None;
    let mut fallback: Option<Peak> = None;
    for (j, (&freq, &amp)) in freqs.iter().zip(amps).enumerate() {
        if freq <= min_freq_hz {
            continue;
        }
        if fallback.map_or(true, |f| amp > f.amplitude) {
            fallback = Some(Peak {
                freq_hz: freq,
                amplitude: amp,
                prominent: false,
            });
        }
        if !is_local_max(amps, j, PEAK_CORE_RADIUS_BINS) {
            continue;
        }
        let prominent = match neighbourhood_median(amps, j) {
            Some(m) if m > 0.0 => amp >= PEAK_MIN_PROMINENCE_RATIO * m,
            _ => amp > 0.0,
        };
        if prominent && best.map_or(true, |b| amp > b.amplitude) {
            best = Some(Peak {
                freq_hz: freq,
                amplitude: amp,
                prominent: true,
            });
        }
    }
    best.or(fallback)
}
