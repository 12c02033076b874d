// src/data_analysis/tuning_recommender.rs
//
// PID, notch and filter-slider suggestions.
//
// Baseline gains are scaled for the frame class, the all-up weight and the
// flying style, then nudged by what the measured step response shows.

use log::{debug, info};
use serde::Serialize;

use crate::axis_names::Axis;
use crate::data_analysis::calc_step_response::StepResponseResult;
use crate::data_analysis::noise_spectrum::SpectrumResult;
use crate::data_input::vehicle_params::VehicleParams;
use crate::policy::{FramePreset, StepAdjustmentPolicy, TuningPolicy};
use crate::types::{AxisPids, PerAxis, Pid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FilterType {
    #[serde(rename = "gyro_notch")]
    GyroNotch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterRecommendation {
    #[serde(rename = "type")]
    pub filter_type: FilterType,
    pub axis: Axis,
    pub center_hz: u32,
    /// Always in `1..center_hz`.
    pub cutoff_hz: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub pids: AxisPids,
    pub filters: Vec<FilterRecommendation>,
    /// Betaflight simplified gyro/D-term filter multiplier, within [0.5, 1.5].
    pub filter_slider: f64,
}

/// D scales down on builds heavier than the reference weight and up on lighter ones.
fn weight_factor(params: &VehicleParams, policy: &TuningPolicy) -> f64 {
    let scaling = &policy.weight;
    (scaling.reference_weight_g / params.weight_g)
        .powf(scaling.exponent)
        .clamp(scaling.min_factor, scaling.max_factor)
}

/// P and I correction factors from one axis' step response.
fn step_factors(step: &StepResponseResult, rise_target_ms: Option<f64>, policy: &StepAdjustmentPolicy) -> (f64, f64) {
    let mut p_factor = 1.0;
    if step.overshoot > policy.overshoot_limit {
        p_factor = 1.0 - (step.overshoot - policy.overshoot_limit) * policy.overshoot_sensitivity;
    } else if let (Some(rise), Some(target)) = (step.rise_time_ms, rise_target_ms) {
        let slow_limit = target * policy.rise_time_tolerance;
        if rise > slow_limit {
            p_factor = 1.0 + (rise / slow_limit - 1.0) * policy.rise_time_sensitivity;
        }
    }

    let mut i_factor = 1.0;
    let gain_error = (step.steady_state_gain - 1.0).abs();
    if gain_error > policy.steady_state_tolerance {
        i_factor = 1.0 + (gain_error - policy.steady_state_tolerance) * policy.steady_state_sensitivity;
    }

    (
        p_factor.clamp(policy.min_factor, policy.max_factor),
        i_factor.clamp(policy.min_factor, policy.max_factor),
    )
}

fn notch_for(axis: Axis, spectrum: &SpectrumResult, policy: &TuningPolicy) -> Option<FilterRecommendation> {
    if spectrum.peak_amplitude <= policy.noise_threshold {
        return None;
    }
    let center = spectrum.peak_freq_hz.round();
    if center < 2.0 {
        // No room for a cutoff strictly below the center.
        return None;
    }
    let center_hz = center as u32;
    let cutoff_hz = ((center * policy.notch_cutoff_fraction).round() as u32).clamp(1, center_hz - 1);
    Some(FilterRecommendation {
        filter_type: FilterType::GyroNotch,
        axis,
        center_hz,
        cutoff_hz,
    })
}

fn filter_slider(
    params: &VehicleParams,
    preset: Option<&FramePreset>,
    any_noisy: bool,
    policy: &TuningPolicy,
) -> f64 {
    let slider = &policy.slider;
    let style_offset = policy.styles.get(params.style).slider_offset;
    let frame_offset = preset.map_or(0.0, |p| p.slider_offset);
    let noise_offset = if any_noisy {
        slider.noisy_offset
    } else {
        slider.clean_offset
    };
    // Extra inertia calls for a slightly more conservative filter setting.
    let inertia_offset =
        -slider.max_inertia_offset * (params.weight_g / policy.weight.reference_weight_g - 1.0).clamp(0.0, 1.0);
    let value =
        (slider.base + style_offset + frame_offset + noise_offset + inertia_offset).clamp(slider.min, slider.max);
    (value * 100.0).round() / 100.0
}

/// Builds the recommendation for a craft from its measured spectra and step responses.
///
/// Axes without a step response keep the scaled baseline; axes without a
/// spectrum never get a notch. Deterministic for identical inputs.
pub fn recommend(
    params: &VehicleParams,
    spectra: &PerAxis<SpectrumResult>,
    steps: &PerAxis<StepResponseResult>,
    policy: &TuningPolicy,
) -> Recommendation {
    let preset = policy.frame_preset(params.frame_size);
    let frame_multiplier = preset.map_or(1.0, |p| p.pid_multiplier);
    let rise_target_ms = preset.map(|p| p.rise_time_target_ms);
    let style = policy.styles.get(params.style);
    let d_weight = weight_factor(params, policy);
    debug!(
        "Recommender: frame {} x{frame_multiplier:.2}, weight factor {d_weight:.3}, style {}",
        params.frame_size, params.style
    );

    let mut pids = policy.base_pids;
    for axis in Axis::ALL {
        let base = policy.base_pids.get(axis);
        let (p_factor, i_factor) = steps
            .get(axis)
            .map_or((1.0, 1.0), |step| step_factors(step, rise_target_ms, &policy.step));
        let raw = Pid::new(
            base.p * frame_multiplier * style.p_multiplier * p_factor,
            base.i * i_factor,
            base.d * frame_multiplier * d_weight * style.d_multiplier,
        );
        let gains = policy.gain_bounds.clamp(raw);
        debug!("{axis}: P x{p_factor:.3}, I x{i_factor:.3} -> {gains:?}");
        *pids.get_mut(axis) = gains;
    }

    let filters: Vec<FilterRecommendation> = spectra
        .iter()
        .filter_map(|(axis, spectrum)| notch_for(axis, spectrum, policy))
        .collect();
    let any_noisy = spectra
        .iter()
        .any(|(_, spectrum)| spectrum.peak_amplitude > policy.noise_threshold);
    let filter_slider = filter_slider(params, preset, any_noisy, policy);

    info!(
        "Recommended {} notch filter(s), filter slider {filter_slider:.2}",
        filters.len()
    );
    Recommendation {
        pids,
        filters,
        filter_slider,
    }
}
