// src/data_analysis/fft_utils.rs

use ndarray::Array1;
use num_complex::Complex64;
use realfft::RealFftPlanner;

use crate::error::ComputeError;

/// Number of bins in the one-sided spectrum of an `n`-point real signal.
pub fn rfft_len(n: usize) -> usize {
    n / 2 + 1
}

/// Forward real FFT. Output has `n / 2 + 1` bins.
pub fn fft_forward(data: &[f64]) -> Result<Array1<Complex64>, ComputeError> {
    if data.is_empty() {
        return Ok(Array1::zeros(0));
    }
    let mut input = data.to_vec();
    let plan = RealFftPlanner::<f64>::new().plan_fft_forward(data.len());
    let mut output = plan.make_output_vec();
    plan.process(&mut input, &mut output)
        .map_err(|e| ComputeError::Fft(e.to_string()))?;
    Ok(Array1::from(output))
}

/// Inverse real FFT of a one-sided spectrum back to `original_length_n` samples, scaled by 1/N.
pub fn fft_inverse(data: &[Complex64], original_length_n: usize) -> Result<Array1<f64>, ComputeError> {
    if data.is_empty() || original_length_n == 0 {
        return Ok(Array1::zeros(original_length_n));
    }
    let expected = rfft_len(original_length_n);
    if data.len() != expected {
        return Err(ComputeError::Fft(format!(
            "inverse length mismatch: expected {expected} bins, got {}",
            data.len()
        )));
    }

    let mut input = data.to_vec();
    // The inverse transform of a real signal needs purely real DC (and Nyquist) bins.
    input[0].im = 0.0;
    if original_length_n % 2 == 0 {
        input[expected - 1].im = 0.0;
    }
    let plan = RealFftPlanner::<f64>::new().plan_fft_inverse(original_length_n);
    let mut output = plan.make_output_vec();
    plan.process(&mut input, &mut output)
        .map_err(|e| ComputeError::Fft(e.to_string()))?;

    let scale = 1.0 / original_length_n as f64;
    let mut output = Array1::from(output);
    output.mapv_inplace(|x| x * scale);
    Ok(output)
}
