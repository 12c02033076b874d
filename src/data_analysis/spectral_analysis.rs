// src/data_analysis/spectral_analysis.rs

use ndarray::Array1;
use num_complex::Complex64;

use crate::constants::{MIN_SEGMENT_LENGTH, TARGET_FREQ_RESOLUTION_HZ, WELCH_OVERLAP};
use crate::data_analysis::fft_utils;
use crate::error::ComputeError;

/// Configuration for Welch's method spectral analysis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WelchConfig {
    /// Segment length in samples; a power of two, so no zero padding is needed.
    pub segment_length: usize,
    /// Fraction of each segment shared with the next one.
    pub overlap: f64,
}

impl WelchConfig {
    /// Picks the segment length for a signal of `signal_len` samples at `sample_rate`.
    ///
    /// Aims for `TARGET_FREQ_RESOLUTION_HZ` but never takes more than half the
    /// signal, so at least three overlapping segments get averaged.
    pub fn for_signal(signal_len: usize, sample_rate: f64) -> Result<Self, ComputeError> {
        let needed = 2 * MIN_SEGMENT_LENGTH;
        if signal_len < needed {
            return Err(ComputeError::SignalTooShort {
                len: signal_len,
                needed,
            });
        }
        let target = ((sample_rate / TARGET_FREQ_RESOLUTION_HZ).ceil().max(1.0) as usize).next_power_of_two();
        let half = signal_len / 2;
        let cap = 1usize << (usize::BITS - 1 - half.leading_zeros());
        Ok(Self {
            segment_length: target.min(cap).max(MIN_SEGMENT_LENGTH),
            overlap: WELCH_OVERLAP,
        })
    }

    pub fn hop_size(&self) -> usize {
        (((1.0 - self.overlap) * self.segment_length as f64) as usize).max(1)
    }

    pub fn segment_count(&self, signal_len: usize) -> usize {
        if signal_len < self.segment_length {
            0
        } else {
            (signal_len - self.segment_length) / self.hop_size() + 1
        }
    }
}

/// Symmetric Hann window.
pub fn hann_window(length: usize) -> Array1<f64> {
    if length < 2 {
        return Array1::ones(length);
    }
    Array1::from_shape_fn(length, |i| {
        0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / (length as f64 - 1.0)).cos())
    })
}

/// Calculates the frequency vector for FFT results
pub fn frequency_vector(nfft: usize, sample_rate: f64) -> Vec<f64> {
    (0..fft_utils::rfft_len(nfft))
        .map(|i| (i as f64 * sample_rate) / (nfft as f64))
        .collect()
}

/// Averaged auto spectrum of one signal.
#[derive(Debug, Clone)]
pub struct WelchPower {
    pub frequency_hz: Vec<f64>,
    /// Mean of |X(f)|² over the segments, unnormalised.
    pub mean_power: Vec<f64>,
    /// Sum of the window samples, for amplitude scaling.
    pub window_sum: f64,
    pub segments: usize,
}

impl WelchPower {
    /// Single-sided amplitude spectrum: a sinusoid of amplitude A reads ≈ A at its bin.
    pub fn amplitude(&self) -> Vec<f64> {
        self.mean_power
            .iter()
            .map(|&p| 2.0 * p.max(0.0).sqrt() / self.window_sum)
            .collect()
    }
}

/// Auto and cross spectra of an input/output pair over the same segments.
#[derive(Debug, Clone)]
pub struct WelchCross {
    pub frequency_hz: Vec<f64>,
    pub sxx: Vec<f64>,
    pub syy: Vec<f64>,
    /// conj(X)·Y averaged, so a delay in y shows up as negative phase.
    pub sxy: Vec<Complex64>,
    pub segments: usize,
}

fn windowed_segment(signal: &[f64], start: usize, window: &Array1<f64>) -> Vec<f64> {
    signal[start..start + window.len()]
        .iter()
        .zip(window.iter())
        .map(|(&x, &w)| x * w)
        .collect()
}

/// Welch power spectrum: Hann-windowed overlapping segments, |X|² averaged.
pub fn welch_psd(signal: &[f64], sample_rate: f64, config: WelchConfig) -> Result<WelchPower, ComputeError> {
    let segments = config.segment_count(signal.len());
    if segments == 0 {
        return Err(ComputeError::SignalTooShort {
            len: signal.len(),
            needed: config.segment_length,
        });
    }

    let window = hann_window(config.segment_length);
    let hop = config.hop_size();
    let mut power_sum = vec![0.0f64; fft_utils::rfft_len(config.segment_length)];

    for seg_idx in 0..segments {
        let segment = windowed_segment(signal, seg_idx * hop, &window);
        let spectrum = fft_utils::fft_forward(&segment)?;
        for (acc, x) in power_sum.iter_mut().zip(spectrum.iter()) {
            *acc += x.norm_sqr();
        }
    }

    let n = segments as f64;
    Ok(WelchPower {
        frequency_hz: frequency_vector(config.segment_length, sample_rate),
        mean_power: power_sum.into_iter().map(|p| p / n).collect(),
        window_sum: window.sum(),
        segments,
    })
}

/// Welch auto and cross spectra for `input` → `output`.
pub fn welch_cpsd(
    input: &[f64],
    output: &[f64],
    sample_rate: f64,
    config: WelchConfig,
) -> Result<WelchCross, ComputeError> {
    if input.len() != output.len() {
        return Err(ComputeError::IllConditioned(format!(
            "input and output lengths differ ({} vs {})",
            input.len(),
            output.len()
        )));
    }
    let segments = config.segment_count(input.len());
    if segments == 0 {
        return Err(ComputeError::SignalTooShort {
            len: input.len(),
            needed: config.segment_length,
        });
    }

    let window = hann_window(config.segment_length);
    let hop = config.hop_size();
    let bins = fft_utils::rfft_len(config.segment_length);
    let mut sxx = vec![0.0f64; bins];
    let mut syy = vec![0.0f64; bins];
    let mut sxy = vec![Complex64::new(0.0, 0.0); bins];

    for seg_idx in 0..segments {
        let start = seg_idx * hop;
        let x = fft_utils::fft_forward(&windowed_segment(input, start, &window))?;
        let y = fft_utils::fft_forward(&windowed_segment(output, start, &window))?;
        for i in 0..bins {
            sxx[i] += x[i].norm_sqr();
            syy[i] += y[i].norm_sqr();
            sxy[i] += x[i].conj() * y[i];
        }
    }

    let n = segments as f64;
    Ok(WelchCross {
        frequency_hz: frequency_vector(config.segment_length, sample_rate),
        sxx: sxx.into_iter().map(|v| v / n).collect(),
        syy: syy.into_iter().map(|v| v / n).collect(),
        sxy: sxy.into_iter().map(|v| v / n).collect(),
        segments,
    })
}

/// Calculates coherence: γ²(f) = |Sxy(f)|² / (Sxx(f) × Syy(f)), clamped to [0, 1].
pub fn coherence(cross: &WelchCross) -> Vec<f64> {
    cross
        .sxy
        .iter()
        .zip(cross.sxx.iter().zip(cross.syy.iter()))
        .map(|(sxy, (&sxx, &syy))| {
            let product = sxx * syy;
            if product > 1e-24 {
                (sxy.norm_sqr() / product).min(1.0)
            } else {
                0.0
            }
        })
        .collect()
}

/// Unwraps phase (radians) to remove 2π discontinuities.
pub fn unwrap_phase(phase_rad: &[f64]) -> Vec<f64> {
    use std::f64::consts::PI;
    let mut unwrapped = Vec::with_capacity(phase_rad.len());
    let mut offset = 0.0;
    for (i, &phase) in phase_rad.iter().enumerate() {
        if i > 0 {
            let diff = phase - phase_rad[i - 1];
            if diff > PI {
                offset -= 2.0 * PI * ((diff + PI) / (2.0 * PI)).floor();
            } else if diff < -PI {
                offset += 2.0 * PI * ((-diff + PI) / (2.0 * PI)).floor();
            }
        }
        unwrapped.push(phase + offset);
    }
    unwrapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_segment_length_selection() {
        // 2 kHz for 8 s: 1 Hz resolution wants 2048.
        assert_eq!(WelchConfig::for_signal(16_000, 2000.0).unwrap().segment_length, 2048);
        // Short log: capped to the largest power of two within half the signal.
        assert_eq!(WelchConfig::for_signal(1_000, 2000.0).unwrap().segment_length, 256);
        assert!(matches!(
            WelchConfig::for_signal(100, 2000.0),
            Err(ComputeError::SignalTooShort { .. })
        ));
    }

    #[test]
    fn test_amplitude_scaling_matches_sinusoid() {
        let rate = 1024.0;
        // 64 Hz lands exactly on a bin for a 1024-point segment.
        let signal: Vec<f64> = (0..8192)
            .map(|i| 30.0 * (2.0 * PI * 64.0 * i as f64 / rate).sin())
            .collect();
        let config = WelchConfig::for_signal(signal.len(), rate).unwrap();
        let power = welch_psd(&signal, rate, config).unwrap();
        let amps = power.amplitude();
        let bin = power.frequency_hz.iter().position(|&f| f == 64.0).unwrap();
        assert_abs_diff_eq!(amps[bin], 30.0, epsilon = 0.5);
    }

    #[test]
    fn test_identical_signals_are_fully_coherent() {
        let signal: Vec<f64> = (0..4096).map(|i| ((i * 7919) % 101) as f64 - 50.0).collect();
        let config = WelchConfig::for_signal(signal.len(), 1000.0).unwrap();
        let cross = welch_cpsd(&signal, &signal, 1000.0, config).unwrap();
        let coh = coherence(&cross);
        for (i, &c) in coh.iter().enumerate().skip(1) {
            assert_abs_diff_eq!(c, 1.0, epsilon = 1e-9);
            assert_abs_diff_eq!(cross.sxy[i].im, 0.0, epsilon = 1e-6 * cross.sxx[i].max(1.0));
        }
    }

    #[test]
    fn test_unwrap_phase() {
        let wrapped = [3.0, -3.0, -2.9, 3.1];
        let unwrapped = unwrap_phase(&wrapped);
        assert_abs_diff_eq!(unwrapped[1], -3.0 + 2.0 * PI, epsilon = 1e-12);
        assert_abs_diff_eq!(unwrapped[2], -2.9 + 2.0 * PI, epsilon = 1e-12);
        assert_abs_diff_eq!(unwrapped[3], 3.1, epsilon = 1e-12);
    }
}
