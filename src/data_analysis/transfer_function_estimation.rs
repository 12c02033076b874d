// src/data_analysis/transfer_function_estimation.rs

use num_complex::Complex64;

use crate::constants::{
    H1_REGULARIZATION, LATENCY_BAND_MAX_HZ, LATENCY_BAND_MIN_HZ, LATENCY_MIN_BINS,
    LATENCY_MIN_COHERENCE, MIN_SETPOINT_RMS_DEG_S, MIN_SIGNAL_RMS,
};
use crate::data_analysis::signal_stats::{remove_mean, std_dev};
use crate::data_analysis::spectral_analysis::{
    coherence, unwrap_phase, welch_cpsd, WelchConfig,
};
use crate::error::ComputeError;

/// Setpoint → gyro frequency response with quality metrics.
#[derive(Debug, Clone)]
pub struct TransferFunctionResult {
    /// Frequency vector in Hz, one-sided from DC
    pub frequency_hz: Vec<f64>,
    /// Complex H1 estimate per bin
    pub response: Vec<Complex64>,
    /// Phase in radians (unwrapped from DC)
    pub phase_rad: Vec<f64>,
    /// Coherence (0-1 quality metric)
    pub coherence: Vec<f64>,
    pub sample_rate_hz: f64,
    /// FFT length the response was estimated with
    pub nfft: usize,
}

impl TransferFunctionResult {
    /// Group delay in ms from the least-squares slope of unwrapped phase against ω.
    ///
    /// Only bins inside the latency band whose coherence is high enough take
    /// part; too few such bins means the phase cannot be trusted and None is
    /// returned.
    pub fn group_delay_ms(&self) -> Option<f64> {
        let points: Vec<(f64, f64)> = self
            .frequency_hz
            .iter()
            .zip(&self.phase_rad)
            .zip(&self.coherence)
            .filter(|&((&f, _), &coh)| {
                (LATENCY_BAND_MIN_HZ..=LATENCY_BAND_MAX_HZ).contains(&f) && coh >= LATENCY_MIN_COHERENCE
            })
            .map(|((&f, &phase), _)| (2.0 * std::f64::consts::PI * f, phase))
            .collect();
        if points.len() < LATENCY_MIN_BINS {
            return None;
        }

        let n = points.len() as f64;
        let mean_w = points.iter().map(|(w, _)| w).sum::<f64>() / n;
        let mean_p = points.iter().map(|(_, p)| p).sum::<f64>() / n;
        let sxx: f64 = points.iter().map(|(w, _)| (w - mean_w).powi(2)).sum();
        let sxy: f64 = points.iter().map(|(w, p)| (w - mean_w) * (p - mean_p)).sum();
        if sxx <= 0.0 {
            return None;
        }
        let slope = sxy / sxx; // rad per rad/s
        Some(-slope * 1000.0)
    }
}

/// Estimates the closed-loop response with a regularised H1 estimator:
/// `H(f) = Sxy(f) / (Sxx(f) + ε·mean(Sxx))`.
///
/// The regularisation keeps bins where the pilot put almost no energy into
/// the sticks from blowing up.
pub fn estimate_transfer_function_h1(
    setpoint: &[f64],
    gyro: &[f64],
    sample_rate: f64,
) -> Result<TransferFunctionResult, ComputeError> {
    let setpoint_rms = std_dev(setpoint);
    if setpoint_rms < MIN_SETPOINT_RMS_DEG_S {
        return Err(ComputeError::InsufficientExcitation {
            rms: setpoint_rms,
            minimum: MIN_SETPOINT_RMS_DEG_S,
        });
    }
    let gyro_rms = std_dev(gyro);
    if !(gyro_rms >= MIN_SIGNAL_RMS) {
        return Err(ComputeError::DegenerateSignal { rms: gyro_rms });
    }

    let (input, _) = remove_mean(setpoint);
    let (output, _) = remove_mean(gyro);
    let config = WelchConfig::for_signal(input.len(), sample_rate)?;
    let cross = welch_cpsd(&input, &output, sample_rate, config)?;

    let mean_sxx = cross.sxx.iter().sum::<f64>() / cross.sxx.len() as f64;
    let floor = H1_REGULARIZATION * mean_sxx;
    if !(floor > 0.0 && floor.is_finite()) {
        return Err(ComputeError::IllConditioned("input spectrum is empty".to_string()));
    }

    let response: Vec<Complex64> = cross
        .sxy
        .iter()
        .zip(&cross.sxx)
        .map(|(&sxy, &sxx)| sxy / (sxx + floor))
        .collect();

    let phase: Vec<f64> = response.iter().map(|h| h.arg()).collect();

    Ok(TransferFunctionResult {
        coherence: coherence(&cross),
        frequency_hz: cross.frequency_hz,
        response,
        phase_rad: unwrap_phase(&phase),
        sample_rate_hz: sample_rate,
        nfft: config.segment_length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn noise(n: usize, seed: u64, amplitude: f64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| rng.gen_range(-amplitude..amplitude)).collect()
    }

    #[test]
    fn test_unity_system() {
        let setpoint = noise(8000, 7, 100.0);
        let tf = estimate_transfer_function_h1(&setpoint, &setpoint, 2000.0).unwrap();
        for (i, h) in tf.response.iter().enumerate().skip(1) {
            assert_abs_diff_eq!(h.re, 1.0, epsilon = 0.01);
            assert_abs_diff_eq!(tf.coherence[i], 1.0, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(tf.group_delay_ms().unwrap(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_pure_delay_group_delay() {
        let rate = 2000.0;
        let delay_samples = 8; // 4 ms
        let setpoint = noise(16_000, 11, 100.0);
        let mut gyro = vec![0.0; setpoint.len()];
        gyro[delay_samples..].copy_from_slice(&setpoint[..setpoint.len() - delay_samples]);
        let tf = estimate_transfer_function_h1(&setpoint, &gyro, rate).unwrap();
        assert_abs_diff_eq!(tf.group_delay_ms().unwrap(), 4.0, epsilon = 0.2);
    }

    #[test]
    fn test_insufficient_excitation() {
        let setpoint = noise(4000, 3, 2.0);
        let gyro = noise(4000, 4, 50.0);
        assert!(matches!(
            estimate_transfer_function_h1(&setpoint, &gyro, 1000.0),
            Err(ComputeError::InsufficientExcitation { .. })
        ));
    }
}
