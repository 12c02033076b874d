// src/policy.rs
//
// Versioned tuning heuristics. Everything the safety scoring and the
// recommender treat as a judgement call lives here so a policy file can
// override it without touching the signal processing.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data_input::vehicle_params::{FrameSize, TuningStyle};
use crate::types::{AxisPids, Pid};

pub const DEFAULT_POLICY_VERSION: &str = "1.0.0";

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy I/O error ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("policy parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("policy validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// Heat risk scoring: high-frequency noise energy weighted by the flown D gain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatRiskPolicy {
    /// Transport bins at or above this frequency count towards the energy.
    pub band_min_hz: f64,
    /// Energy that alone gives a score of ~63 at the neutral D factor.
    pub energy_reference: f64,
    /// D gain treated as "typical".
    pub d_reference: f64,
}

impl Default for HeatRiskPolicy {
    fn default() -> Self {
        Self {
            band_min_hz: 80.0,
            energy_reference: 150.0,
            d_reference: 30.0,
        }
    }
}

/// Amplitude/overshoot tier pairs for oscillation risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscillationPolicy {
    pub high_amplitude: f64,
    pub high_overshoot: f64,
    pub medium_amplitude: f64,
    pub medium_overshoot: f64,
}

impl Default for OscillationPolicy {
    fn default() -> Self {
        Self {
            high_amplitude: 50.0,
            high_overshoot: 0.30,
            medium_amplitude: 20.0,
            medium_overshoot: 0.15,
        }
    }
}

/// Per-frame scaling. Smaller craft carry less rotational inertia and run higher P and D.
///
/// Both `pid_multiplier` and `slider_offset` must not increase with frame size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramePreset {
    pub size: FrameSize,
    pub pid_multiplier: f64,
    /// Added to the filter slider; larger props need lower cutoffs.
    pub slider_offset: f64,
    /// Expected rise time to 90% for a well tuned craft of this class.
    pub rise_time_target_ms: f64,
}

impl FramePreset {
    const fn new(size: FrameSize, pid_multiplier: f64, slider_offset: f64, rise_time_target_ms: f64) -> Self {
        Self {
            size,
            pid_multiplier,
            slider_offset,
            rise_time_target_ms,
        }
    }
}

fn default_frames() -> Vec<FramePreset> {
    use FrameSize::*;
    vec![
        FramePreset::new(Whoop65, 1.8, 0.1, 30.0),
        FramePreset::new(Whoop75, 1.8, 0.1, 30.0),
        FramePreset::new(Whoop85, 1.6, 0.1, 32.0),
        FramePreset::new(TwoInch, 1.5, 0.05, 32.0),
        FramePreset::new(TwoHalfInch, 1.5, 0.05, 34.0),
        FramePreset::new(ThreeInch, 1.2, 0.05, 36.0),
        FramePreset::new(ThreeHalfInch, 1.2, 0.0, 38.0),
        FramePreset::new(FourInch, 1.1, 0.0, 40.0),
        FramePreset::new(FiveInch, 1.0, 0.0, 45.0),
        FramePreset::new(SixInch, 0.8, -0.05, 55.0),
        FramePreset::new(SevenInch, 0.75, -0.1, 65.0),
    ]
}

/// D scaling with all-up weight: `clamp((reference / weight)^exponent, min, max)`.
///
/// One reference for every frame class, so frame scaling stays in the presets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightScaling {
    /// All-up weight the baseline D was chosen for.
    pub reference_weight_g: f64,
    pub exponent: f64,
    pub min_factor: f64,
    pub max_factor: f64,
}

impl Default for WeightScaling {
    fn default() -> Self {
        Self {
            reference_weight_g: 650.0,
            exponent: 0.3,
            min_factor: 0.7,
            max_factor: 1.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StylePreset {
    pub p_multiplier: f64,
    pub d_multiplier: f64,
    pub slider_offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StylePresets {
    pub freestyle: StylePreset,
    pub cinematic: StylePreset,
    pub racing: StylePreset,
}

impl Default for StylePresets {
    fn default() -> Self {
        Self {
            freestyle: StylePreset {
                p_multiplier: 1.0,
                d_multiplier: 1.0,
                slider_offset: 0.0,
            },
            cinematic: StylePreset {
                p_multiplier: 0.85,
                d_multiplier: 0.85,
                slider_offset: -0.3,
            },
            racing: StylePreset {
                p_multiplier: 1.15,
                d_multiplier: 1.10,
                slider_offset: 0.3,
            },
        }
    }
}

impl StylePresets {
    pub fn get(&self, style: TuningStyle) -> &StylePreset {
        match style {
            TuningStyle::Freestyle => &self.freestyle,
            TuningStyle::Cinematic => &self.cinematic,
            TuningStyle::Racing => &self.racing,
        }
    }
}

/// Gain corrections driven by the measured step response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepAdjustmentPolicy {
    /// Overshoot above this reduces P.
    pub overshoot_limit: f64,
    /// P reduction per unit of overshoot above the limit.
    pub overshoot_sensitivity: f64,
    /// Rise time above `target * rise_time_tolerance` increases P.
    pub rise_time_tolerance: f64,
    /// P increase per unit of relative rise-time excess.
    pub rise_time_sensitivity: f64,
    /// |steady_state_gain - 1| above this increases I.
    pub steady_state_tolerance: f64,
    pub steady_state_sensitivity: f64,
    pub min_factor: f64,
    pub max_factor: f64,
}

impl Default for StepAdjustmentPolicy {
    fn default() -> Self {
        Self {
            overshoot_limit: 0.10,
            overshoot_sensitivity: 1.0,
            rise_time_tolerance: 1.2,
            rise_time_sensitivity: 0.5,
            steady_state_tolerance: 0.05,
            steady_state_sensitivity: 1.0,
            min_factor: 0.75,
            max_factor: 1.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GainBounds {
    pub p_min: f64,
    pub p_max: f64,
    pub i_min: f64,
    pub i_max: f64,
    pub d_min: f64,
    pub d_max: f64,
}

impl Default for GainBounds {
    fn default() -> Self {
        Self {
            p_min: 10.0,
            p_max: 200.0,
            i_min: 10.0,
            i_max: 200.0,
            d_min: 0.0,
            d_max: 150.0,
        }
    }
}

impl GainBounds {
    pub fn clamp(&self, pid: Pid) -> Pid {
        Pid::new(
            pid.p.clamp(self.p_min, self.p_max).round(),
            pid.i.clamp(self.i_min, self.i_max).round(),
            pid.d.clamp(self.d_min, self.d_max).round(),
        )
    }
}

/// Betaflight simplified filter slider heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliderPolicy {
    pub base: f64,
    /// Applied when any axis is above the noise threshold.
    pub noisy_offset: f64,
    /// Applied when every axis is below it.
    pub clean_offset: f64,
    /// Largest slider reduction for builds heavier than the weight reference.
    pub max_inertia_offset: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for SliderPolicy {
    fn default() -> Self {
        Self {
            base: 1.0,
            noisy_offset: -0.4,
            clean_offset: 0.2,
            max_inertia_offset: 0.1,
            min: 0.5,
            max: 1.5,
        }
    }
}

/// All tuning heuristics, loadable from TOML. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningPolicy {
    pub version: String,
    /// Peak amplitude above which an axis counts as noisy and gets a notch.
    pub noise_threshold: f64,
    /// Amplitude treated as the clean-gyro floor for heat energy.
    pub noise_floor_amplitude: f64,
    pub heat: HeatRiskPolicy,
    pub oscillation: OscillationPolicy,
    pub base_pids: AxisPids,
    pub frames: Vec<FramePreset>,
    pub weight: WeightScaling,
    pub styles: StylePresets,
    pub step: StepAdjustmentPolicy,
    pub gain_bounds: GainBounds,
    /// Notch cutoff as a fraction of its center.
    pub notch_cutoff_fraction: f64,
    pub slider: SliderPolicy,
}

impl Default for TuningPolicy {
    fn default() -> Self {
        Self {
            version: DEFAULT_POLICY_VERSION.to_string(),
            noise_threshold: 10.0,
            noise_floor_amplitude: 1.0,
            heat: HeatRiskPolicy::default(),
            oscillation: OscillationPolicy::default(),
            base_pids: AxisPids {
                roll: Pid::new(45.0, 85.0, 30.0),
                pitch: Pid::new(48.0, 90.0, 32.0),
                yaw: Pid::new(45.0, 90.0, 0.0),
            },
            frames: default_frames(),
            weight: WeightScaling::default(),
            styles: StylePresets::default(),
            step: StepAdjustmentPolicy::default(),
            gain_bounds: GainBounds::default(),
            notch_cutoff_fraction: 0.8,
            slider: SliderPolicy::default(),
        }
    }
}

impl TuningPolicy {
    /// Parses and validates a policy from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, PolicyError> {
        let policy: TuningPolicy = toml::from_str(text)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        let text = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn frame_preset(&self, size: FrameSize) -> Option<&FramePreset> {
        self.frames.iter().find(|preset| preset.size == size)
    }

    /// Checks internal consistency, collecting every problem rather than stopping at the first.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let mut errors = Vec::new();

        let mut positive = |name: &str, value: f64| {
            if !(value.is_finite() && value > 0.0) {
                errors.push(format!("{name} must be positive, got {value}"));
            }
        };
        positive("noise_threshold", self.noise_threshold);
        positive("heat.energy_reference", self.heat.energy_reference);
        positive("heat.d_reference", self.heat.d_reference);
        positive("oscillation.high_amplitude", self.oscillation.high_amplitude);
        positive("oscillation.medium_amplitude", self.oscillation.medium_amplitude);
        positive("step.rise_time_tolerance", self.step.rise_time_tolerance);
        positive("weight.reference_weight_g", self.weight.reference_weight_g);
        for preset in &self.frames {
            positive(&format!("frames[{}].pid_multiplier", preset.size), preset.pid_multiplier);
            positive(&format!("frames[{}].rise_time_target_ms", preset.size), preset.rise_time_target_ms);
        }
        for (name, style) in [
            ("freestyle", &self.styles.freestyle),
            ("cinematic", &self.styles.cinematic),
            ("racing", &self.styles.racing),
        ] {
            positive(&format!("styles.{name}.p_multiplier"), style.p_multiplier);
            positive(&format!("styles.{name}.d_multiplier"), style.d_multiplier);
        }

        if self.noise_floor_amplitude < 0.0 {
            errors.push("noise_floor_amplitude must not be negative".to_string());
        }
        if self.oscillation.medium_amplitude > self.oscillation.high_amplitude
            || self.oscillation.medium_overshoot > self.oscillation.high_overshoot
        {
            errors.push("oscillation medium tier must not exceed the high tier".to_string());
        }
        if !(self.notch_cutoff_fraction > 0.0 && self.notch_cutoff_fraction < 1.0) {
            errors.push(format!(
                "notch_cutoff_fraction must be in (0, 1), got {}",
                self.notch_cutoff_fraction
            ));
        }
        if self.weight.min_factor > self.weight.max_factor || self.weight.exponent < 0.0 {
            errors.push("weight scaling needs 0 <= exponent and min_factor <= max_factor".to_string());
        }
        if self.step.min_factor > self.step.max_factor {
            errors.push("step.min_factor must not exceed step.max_factor".to_string());
        }
        let bounds = &self.gain_bounds;
        if bounds.p_min > bounds.p_max || bounds.i_min > bounds.i_max || bounds.d_min > bounds.d_max {
            errors.push("gain_bounds minimums must not exceed maximums".to_string());
        }
        if bounds.d_min < 0.0 || bounds.p_min < 0.0 || bounds.i_min < 0.0 {
            errors.push("gain_bounds must not be negative".to_string());
        }
        if !(0.5..=1.5).contains(&self.slider.min)
            || !(0.5..=1.5).contains(&self.slider.max)
            || self.slider.min > self.slider.max
        {
            errors.push("slider.min and slider.max must lie within [0.5, 1.5]".to_string());
        }
        for size in FrameSize::ALL {
            if self.frame_preset(size).is_none() {
                errors.push(format!("frames has no preset for {size}"));
            }
        }
        let ordered: Vec<&FramePreset> = FrameSize::ALL
            .iter()
            .filter_map(|&size| self.frame_preset(size))
            .collect();
        for pair in ordered.windows(2) {
            let (smaller, larger) = (pair[0], pair[1]);
            if larger.pid_multiplier > smaller.pid_multiplier || larger.slider_offset > smaller.slider_offset {
                errors.push(format!(
                    "frames[{}] must not scale gains or the slider above frames[{}]",
                    larger.size, smaller.size
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PolicyError::Validation(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        assert!(TuningPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let policy = TuningPolicy::from_toml_str(
            r#"
            version = "site-2"
            noise_threshold = 12.5

            [oscillation]
            high_amplitude = 60.0
            "#,
        )
        .unwrap();
        assert_eq!(policy.version, "site-2");
        assert_eq!(policy.noise_threshold, 12.5);
        assert_eq!(policy.oscillation.high_amplitude, 60.0);
        assert_eq!(policy.oscillation.medium_amplitude, 20.0);
        assert_eq!(policy.frames.len(), FrameSize::ALL.len());
        assert_eq!(policy.base_pids.pitch, Pid::new(48.0, 90.0, 32.0));
    }

    #[test]
    fn test_validation_collects_all_problems() {
        let mut policy = TuningPolicy::default();
        policy.notch_cutoff_fraction = 1.2;
        policy.gain_bounds.p_min = 300.0;
        policy.frames.retain(|preset| preset.size != FrameSize::SevenInch);
        match policy.validate() {
            Err(PolicyError::Validation(errors)) => {
                assert_eq!(errors.len(), 3, "{errors:?}");
                assert!(errors.iter().any(|e| e.contains("7\"")));
            }
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn test_larger_frame_may_not_out_scale_smaller() {
        let mut policy = TuningPolicy::default();
        for preset in policy.frames.iter_mut() {
            if preset.size == FrameSize::SevenInch {
                preset.slider_offset = 0.2;
            }
        }
        match policy.validate() {
            Err(PolicyError::Validation(errors)) => {
                assert_eq!(errors.len(), 1, "{errors:?}");
                assert!(errors[0].starts_with("frames[7\"]"), "{errors:?}");
            }
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn test_round_trips_through_toml() {
        let policy = TuningPolicy::default();
        let text = toml::to_string(&policy).unwrap();
        assert_eq!(TuningPolicy::from_toml_str(&text).unwrap(), policy);
    }

    #[test]
    fn test_gain_bounds_clamp_and_round() {
        let clamped = GainBounds::default().clamp(Pid::new(250.4, 4.0, 33.6));
        assert_eq!(clamped, Pid::new(200.0, 10.0, 34.0));
    }
}
