// src/data_analysis/safety_metrics.rs

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::constants::RESPONSE_LENGTH_S;
use crate::data_analysis::calc_step_response::StepResponseResult;
use crate::data_analysis::noise_spectrum::SpectrumResult;
use crate::data_analysis::transfer_function_estimation::TransferFunctionResult;
use crate::data_input::pid_metadata::PidMetadata;
use crate::policy::TuningPolicy;
use crate::types::PerAxis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OscillationRisk {
    Low,
    Medium,
    High,
}

/// How latency was measured for a report. One method applies to every axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencyMethod {
    /// Group delay from the transfer-function phase slope.
    PhaseSlope,
    /// Time for the step response to reach 50%.
    StepDelay,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetyMetrics {
    pub latency_ms: f64,
    pub heat_risk: f64,
    pub oscillation_risk: OscillationRisk,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Motor heat risk 0–100 from noise energy above the heat band, weighted by D.
///
/// D amplifies high-frequency gyro noise straight into the motors, so the same
/// noise is worse on a build flying more D. Unknown D counts as the reference.
pub fn heat_risk(spectrum: &SpectrumResult, flown_d: Option<f64>, policy: &TuningPolicy) -> f64 {
    let heat = &policy.heat;
    let energy: f64 = spectrum
        .band(heat.band_min_hz)
        .map(|(_, amp)| (amp - policy.noise_floor_amplitude).max(0.0))
        .sum();
    let d_factor = match flown_d {
        Some(d) => 0.5 + 0.5 * d.max(0.0) / heat.d_reference,
        None => 1.0,
    };
    let score = 100.0 * (1.0 - (-(energy / heat.energy_reference) * d_factor).exp());
    round1(score.clamp(0.0, 100.0))
}

/// Oscillation tier from the noise peak and, when known, the step overshoot.
pub fn oscillation_risk(peak_amplitude: f64, overshoot: Option<f64>, policy: &TuningPolicy) -> OscillationRisk {
    let tiers = &policy.oscillation;
    let high_overshoot = overshoot.map_or(true, |o| o >= tiers.high_overshoot);
    let medium_overshoot = overshoot.map_or(true, |o| o >= tiers.medium_overshoot);
    if peak_amplitude >= tiers.high_amplitude && high_overshoot {
        OscillationRisk::High
    } else if peak_amplitude >= tiers.medium_amplitude && medium_overshoot {
        OscillationRisk::Medium
    } else {
        OscillationRisk::Low
    }
}

fn step_delay_ms(step: &StepResponseResult) -> f64 {
    // Never reaching 50% inside the window means at least the whole window.
    step.delay_ms.unwrap_or(RESPONSE_LENGTH_S * 1000.0)
}

/// Picks one latency method for the whole report and measures every axis with it.
///
/// Phase slope is used only when it is reliable on every axis that has a step
/// response; otherwise all axes fall back to Td so the numbers stay comparable.
pub fn latencies(
    steps: &PerAxis<StepResponseResult>,
    transfer_functions: &PerAxis<TransferFunctionResult>,
) -> (PerAxis<f64>, LatencyMethod) {
    let phase = steps.map(|axis, _| transfer_functions.get(axis).and_then(|tf| tf.group_delay_ms()));
    let phase_reliable = !steps.is_empty() && phase.iter().all(|(_, delay)| delay.is_some());

    let (measured, method) = if phase_reliable {
        (
            phase.map(|_, delay| delay.unwrap_or(0.0).max(0.0)),
            LatencyMethod::PhaseSlope,
        )
    } else {
        (steps.map(|_, step| step_delay_ms(step).max(0.0)), LatencyMethod::StepDelay)
    };
    (measured, method)
}

/// Computes safety metrics for every axis that has a spectrum.
pub fn compute(
    spectra: &PerAxis<SpectrumResult>,
    steps: &PerAxis<StepResponseResult>,
    transfer_functions: &PerAxis<TransferFunctionResult>,
    flown_pids: &PidMetadata,
    policy: &TuningPolicy,
) -> (PerAxis<SafetyMetrics>, LatencyMethod) {
    let (measured, method) = latencies(steps, transfer_functions);
    // Axes without a step response borrow the mean of the measured ones.
    let fallback_latency = {
        let values: Vec<f64> = measured.iter().map(|(_, &v)| v).collect();
        if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    };
    info!("Latency method: {method:?}");

    let metrics = spectra.map(|axis, spectrum| {
        let latency_ms = round1(measured.get(axis).copied().unwrap_or(fallback_latency));
        let overshoot = steps.get(axis).map(|s| s.overshoot);
        let metrics = SafetyMetrics {
            latency_ms,
            heat_risk: heat_risk(spectrum, flown_pids.flown_d(axis), policy),
            oscillation_risk: oscillation_risk(spectrum.peak_amplitude, overshoot, policy),
        };
        debug!("{axis} safety: {metrics:?}");
        metrics
    });
    (metrics, method)
}
