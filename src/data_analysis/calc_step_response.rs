// src/data_analysis/calc_step_response.rs

use log::debug;
use ndarray::{s, Array1};
use ndarray_stats::QuantileExt;

use crate::constants::{
    DELAY_TIME_LEVEL, MIN_STEADY_STATE_GAIN, RESPONSE_LENGTH_S, RISE_TIME_LEVEL,
    STEADY_STATE_END_S, STEADY_STATE_START_S,
};
use crate::data_analysis::fft_utils;
use crate::data_analysis::transfer_function_estimation::{
    estimate_transfer_function_h1, TransferFunctionResult,
};
use crate::error::ComputeError;

/// Closed-loop step response of one axis, normalised so perfect tracking settles at 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResponseResult {
    /// Seconds from the step, ascending from 0.
    pub time: Vec<f64>,
    pub response: Vec<f64>,
    /// `max(response) - 1`; negative when the response never reaches 1.
    pub overshoot: f64,
    /// First crossing of 90%.
    pub rise_time_ms: Option<f64>,
    /// First crossing of 50% (Td).
    pub delay_ms: Option<f64>,
    /// Mean of the raw step over the steady-state window, before normalisation.
    pub steady_state_gain: f64,
}

/// Cumulative sum, integrating an impulse response into a step response.
fn cumulative_sum(data: &Array1<f64>) -> Array1<f64> {
    let mut current_sum = 0.0;
    data.mapv(|val| {
        if val.is_finite() {
            current_sum += val;
        }
        current_sum
    })
}

fn first_crossing_ms(response: &Array1<f64>, level: f64, sample_rate: f64) -> Option<f64> {
    response
        .iter()
        .position(|&v| v >= level)
        .map(|i| i as f64 / sample_rate * 1000.0)
}

/// Integrates the impulse response of `tf` into a normalised step response.
pub fn step_from_transfer_function(tf: &TransferFunctionResult) -> Result<StepResponseResult, ComputeError> {
    let sample_rate = tf.sample_rate_hz;
    let impulse = fft_utils::fft_inverse(&tf.response, tf.nfft)?;
    let step = cumulative_sum(&impulse);

    let response_len = ((RESPONSE_LENGTH_S * sample_rate).round() as usize).min(step.len());
    let ss_start = ((STEADY_STATE_START_S * sample_rate).floor() as usize).min(response_len);
    let ss_end = ((STEADY_STATE_END_S * sample_rate).ceil() as usize).min(response_len);
    if ss_end <= ss_start {
        return Err(ComputeError::SignalTooShort {
            len: tf.nfft,
            needed: (STEADY_STATE_END_S * sample_rate).ceil() as usize,
        });
    }

    let truncated = step.slice(s![0..response_len]).to_owned();
    let steady_state_gain = truncated
        .slice(s![ss_start..ss_end])
        .mean()
        .unwrap_or(0.0);
    if !steady_state_gain.is_finite() || steady_state_gain.abs() < MIN_STEADY_STATE_GAIN {
        return Err(ComputeError::IllConditioned(format!(
            "steady-state gain {steady_state_gain:.3e} too small to normalise"
        )));
    }

    let response = truncated.mapv(|v| v / steady_state_gain);
    let peak = *response
        .max()
        .map_err(|e| ComputeError::IllConditioned(format!("step response has no maximum: {e}")))?;

    let result = StepResponseResult {
        time: (0..response_len).map(|i| i as f64 / sample_rate).collect(),
        overshoot: peak - 1.0,
        rise_time_ms: first_crossing_ms(&response, RISE_TIME_LEVEL, sample_rate),
        delay_ms: first_crossing_ms(&response, DELAY_TIME_LEVEL, sample_rate),
        steady_state_gain,
        response: response.to_vec(),
    };
    debug!(
        "Step response: gain {:.3}, overshoot {:.1}%, rise {:?} ms, Td {:?} ms",
        result.steady_state_gain,
        result.overshoot * 100.0,
        result.rise_time_ms,
        result.delay_ms
    );
    Ok(result)
}

/// Estimates the step response from setpoint and gyro of one axis.
/// Returns the transfer function too, since latency is read from its phase.
pub fn calculate_step_response(
    setpoint: &[f64],
    gyro: &[f64],
    sample_rate: f64,
) -> Result<(StepResponseResult, TransferFunctionResult), ComputeError> {
    let tf = estimate_transfer_function_h1(setpoint, gyro, sample_rate)?;
    let step = step_from_transfer_function(&tf)?;
    Ok((step, tf))
}
