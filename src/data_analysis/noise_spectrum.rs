// src/data_analysis/noise_spectrum.rs

use log::debug;

use crate::constants::{MIN_SIGNAL_RMS, PEAK_MIN_FREQ_HZ, SPECTRUM_MAX_FREQ_HZ, SPECTRUM_TRANSPORT_BINS};
use crate::data_analysis::peak_detection::find_dominant_peak;
use crate::data_analysis::signal_stats::{remove_mean, std_dev};
use crate::data_analysis::spectral_analysis::{welch_psd, WelchConfig};
use crate::error::ComputeError;

/// Gyro noise spectrum of one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumResult {
    /// Transport grid: strictly increasing, within (0, min(nyquist, 1000)].
    pub freqs: Vec<f64>,
    /// Max amplitude of each transport chunk, same length as `freqs`.
    pub amps: Vec<f64>,
    pub peak_freq_hz: f64,
    pub peak_amplitude: f64,
    /// Full-resolution spectrum the peak was picked from.
    pub full_freqs: Vec<f64>,
    pub full_amps: Vec<f64>,
}

impl SpectrumResult {
    /// Transport bins at or above `min_freq_hz`.
    pub fn band(&self, min_freq_hz: f64) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.freqs
            .iter()
            .zip(&self.amps)
            .filter(move |&(&f, _)| f >= min_freq_hz)
            .map(|(&f, &a)| (f, a))
    }
}

/// Groups the bins in (0, max_freq] into at most `max_points` contiguous chunks.
/// Chunk frequency is the mean of its bins, amplitude the chunk maximum, so
/// narrow peaks survive the reduction.
pub fn transport_spectrum(freqs: &[f64], amps: &[f64], max_freq: f64, max_points: usize) -> (Vec<f64>, Vec<f64>) {
    let in_range: Vec<(f64, f64)> = freqs
        .iter()
        .zip(amps)
        .filter(|&(&f, _)| f > 0.0 && f <= max_freq)
        .map(|(&f, &a)| (f, a))
        .collect();
    if in_range.is_empty() || max_points == 0 {
        return (Vec::new(), Vec::new());
    }

    let chunk = in_range.len().div_ceil(max_points);
    in_range
        .chunks(chunk)
        .map(|bins| {
            let freq = bins.iter().map(|(f, _)| f).sum::<f64>() / bins.len() as f64;
            let amp = bins.iter().map(|&(_, a)| a).fold(0.0, f64::max);
            (freq, amp)
        })
        .unzip()
}

/// Amplitude spectrum and dominant noise peak of one gyro axis.
pub fn analyze(gyro: &[f64], sample_rate: f64) -> Result<SpectrumResult, ComputeError> {
    let (centered, _) = remove_mean(gyro);
    let rms = std_dev(gyro);
    if !(rms >= MIN_SIGNAL_RMS) {
        return Err(ComputeError::DegenerateSignal { rms });
    }

    let config = WelchConfig::for_signal(centered.len(), sample_rate)?;
    let power = welch_psd(&centered, sample_rate, config)?;
    let full_amps = power.amplitude();
    let full_freqs = power.frequency_hz;

    let peak = find_dominant_peak(&full_freqs, &full_amps, PEAK_MIN_FREQ_HZ).ok_or_else(|| {
        ComputeError::IllConditioned(format!("no spectrum bins above {PEAK_MIN_FREQ_HZ} Hz"))
    })?;

    let max_freq = (sample_rate / 2.0).min(SPECTRUM_MAX_FREQ_HZ);
    let (freqs, amps) = transport_spectrum(&full_freqs, &full_amps, max_freq, SPECTRUM_TRANSPORT_BINS);

    debug!(
        "Spectrum: {} segments of {}, peak {:.2} at {:.1} Hz{}",
        power.segments,
        config.segment_length,
        peak.amplitude,
        peak.freq_hz,
        if peak.prominent { "" } else { " (global max)" }
    );

    Ok(SpectrumResult {
        freqs,
        amps,
        peak_freq_hz: peak.freq_hz,
        peak_amplitude: peak.amplitude,
        full_freqs,
        full_amps,
    })
}
