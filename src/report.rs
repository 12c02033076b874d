// src/report.rs

use serde::Serialize;

use crate::axis_names::Axis;
use crate::data_analysis::calc_step_response::StepResponseResult;
use crate::data_analysis::noise_spectrum::SpectrumResult;
use crate::data_analysis::safety_metrics::{LatencyMethod, SafetyMetrics};
use crate::data_analysis::sampling_rate::SamplingInfo;
use crate::data_analysis::tuning_recommender::Recommendation;
use crate::data_input::log_data::LogSeries;
use crate::data_input::pid_metadata::PidMetadata;
use crate::data_input::vehicle_params::{FrameSize, TuningStyle, VehicleParams};
use crate::error::AnalysisError;
use crate::types::PerAxis;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoiseSummary {
    pub peak_freq_hz: f64,
    pub peak_amplitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectrumSeries {
    pub freqs: Vec<f64>,
    pub amps: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepSeries {
    /// Seconds from the step.
    pub time: Vec<f64>,
    pub response: Vec<f64>,
}

/// Short raw trace from the middle of the log for plotting.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawSnippet {
    /// Milliseconds from the first sample of the window.
    pub time: Vec<f64>,
    pub roll_gyro: Vec<f64>,
    pub roll_setpoint: Vec<f64>,
    pub pitch_gyro: Vec<f64>,
    pub pitch_setpoint: Vec<f64>,
}

impl RawSnippet {
    /// Takes up to `max_len` samples centred on the middle of the log.
    pub fn from_series(series: &LogSeries, max_len: usize) -> Self {
        let samples = series.samples();
        let len = max_len.min(samples.len());
        let start = (samples.len() / 2).saturating_sub(len / 2);
        let window = &samples[start..start + len];
        let Some(first) = window.first() else {
            return Self::default();
        };

        let roll = Axis::Roll.index();
        let pitch = Axis::Pitch.index();
        Self {
            time: window
                .iter()
                .map(|s| (s.time_us - first.time_us) as f64 / 1000.0)
                .collect(),
            roll_gyro: window.iter().map(|s| s.gyro[roll]).collect(),
            roll_setpoint: window.iter().map(|s| s.setpoint[roll]).collect(),
            pitch_gyro: window.iter().map(|s| s.gyro[pitch]).collect(),
            pitch_setpoint: window.iter().map(|s| s.setpoint[pitch]).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Echo of the vehicle parameters the report was computed for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroneConfig {
    pub size: FrameSize,
    pub weight: f64,
    pub style: TuningStyle,
}

impl From<&VehicleParams> for DroneConfig {
    fn from(params: &VehicleParams) -> Self {
        Self {
            size: params.frame_size,
            weight: params.weight_g,
            style: params.style,
        }
    }
}

/// Everything the pipeline produced, ready to be checked and assembled.
#[derive(Debug, Clone)]
pub struct ReportParts {
    pub sampling: SamplingInfo,
    pub spectra: PerAxis<SpectrumResult>,
    pub steps: PerAxis<StepResponseResult>,
    pub raw_snippet: RawSnippet,
    pub safety: PerAxis<SafetyMetrics>,
    pub latency_method: LatencyMethod,
    pub recommendation: Recommendation,
    pub policy_version: String,
    pub params: VehicleParams,
    pub flown_pids: PidMetadata,
}

/// Analysis result. Serialises to the JSON document consumed by the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    status: &'static str,
    #[serde(rename = "sampling_rate")]
    sampling_rate_hz: f64,
    log_duration_sec: f64,
    noise_analysis: PerAxis<NoiseSummary>,
    spectrum: PerAxis<SpectrumSeries>,
    step_response: PerAxis<StepSeries>,
    raw_snippet: RawSnippet,
    safety_metrics: PerAxis<SafetyMetrics>,
    recommendations: Recommendation,
    policy_version: String,
    drone_config: DroneConfig,
    #[serde(skip)]
    latency_method: LatencyMethod,
    #[serde(skip)]
    flown_pids: PidMetadata,
}

impl Report {
    pub fn sampling_rate_hz(&self) -> f64 {
        self.sampling_rate_hz
    }

    pub fn log_duration_sec(&self) -> f64 {
        self.log_duration_sec
    }

    pub fn noise_analysis(&self) -> &PerAxis<NoiseSummary> {
        &self.noise_analysis
    }

    pub fn spectrum(&self) -> &PerAxis<SpectrumSeries> {
        &self.spectrum
    }

    pub fn step_response(&self) -> &PerAxis<StepSeries> {
        &self.step_response
    }

    pub fn raw_snippet(&self) -> &RawSnippet {
        &self.raw_snippet
    }

    pub fn safety_metrics(&self) -> &PerAxis<SafetyMetrics> {
        &self.safety_metrics
    }

    pub fn recommendations(&self) -> &Recommendation {
        &self.recommendations
    }

    pub fn policy_version(&self) -> &str {
        &self.policy_version
    }

    pub fn drone_config(&self) -> &DroneConfig {
        &self.drone_config
    }

    pub fn latency_method(&self) -> LatencyMethod {
        self.latency_method
    }

    /// PID gains read from the log header, when the firmware wrote them.
    pub fn flown_pids(&self) -> &PidMetadata {
        &self.flown_pids
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, AnalysisError> {
        let json = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        json.map_err(|e| AnalysisError::Internal(format!("report serialisation failed: {e}")))
    }
}

fn internal(message: impl Into<String>) -> AnalysisError {
    AnalysisError::Internal(message.into())
}

fn check_parts(parts: &ReportParts) -> Result<(), AnalysisError> {
    let sampling = &parts.sampling;
    if !(sampling.rate_hz.is_finite() && sampling.rate_hz > 0.0) {
        return Err(internal(format!("sampling rate {} is not positive", sampling.rate_hz)));
    }
    if !(sampling.duration_sec.is_finite() && sampling.duration_sec >= 0.0) {
        return Err(internal(format!("log duration {} is invalid", sampling.duration_sec)));
    }
    if parts.spectra.is_empty() && parts.steps.is_empty() {
        return Err(internal("no axis produced a spectrum or a step response"));
    }
    for (axis, spectrum) in parts.spectra.iter() {
        if spectrum.freqs.len() != spectrum.amps.len() {
            return Err(internal(format!("{axis} spectrum has mismatched lengths")));
        }
        if spectrum.freqs.windows(2).any(|w| w[0] >= w[1]) {
            return Err(internal(format!("{axis} spectrum frequencies are not increasing")));
        }
        if spectrum.amps.iter().any(|a| !(a.is_finite() && *a >= 0.0)) {
            return Err(internal(format!("{axis} spectrum has invalid amplitudes")));
        }
    }
    for (axis, step) in parts.steps.iter() {
        if step.time.len() != step.response.len() {
            return Err(internal(format!("{axis} step response has mismatched lengths")));
        }
    }
    for (axis, metrics) in parts.safety.iter() {
        if !(metrics.latency_ms >= 0.0 && (0.0..=100.0).contains(&metrics.heat_risk)) {
            return Err(internal(format!("{axis} safety metrics out of range: {metrics:?}")));
        }
    }
    let rec = &parts.recommendation;
    if !(0.5..=1.5).contains(&rec.filter_slider) {
        return Err(internal(format!("filter slider {} outside [0.5, 1.5]", rec.filter_slider)));
    }
    for filter in &rec.filters {
        if filter.cutoff_hz == 0 || filter.cutoff_hz >= filter.center_hz {
            return Err(internal(format!("invalid notch {filter:?}")));
        }
    }
    Ok(())
}

/// Checks the parts and assembles the report. Nothing partial is ever returned.
pub fn assemble(parts: ReportParts) -> Result<Report, AnalysisError> {
    check_parts(&parts)?;

    Ok(Report {
        status: "success",
        sampling_rate_hz: parts.sampling.rate_hz,
        log_duration_sec: parts.sampling.duration_sec,
        noise_analysis: parts.spectra.map(|_, s| NoiseSummary {
            peak_freq_hz: s.peak_freq_hz,
            peak_amplitude: s.peak_amplitude,
        }),
        spectrum: parts.spectra.map(|_, s| SpectrumSeries {
            freqs: s.freqs.clone(),
            amps: s.amps.clone(),
        }),
        step_response: parts.steps.map(|_, s| StepSeries {
            time: s.time.clone(),
            response: s.response.clone(),
        }),
        raw_snippet: parts.raw_snippet,
        safety_metrics: parts.safety,
        recommendations: parts.recommendation,
        policy_version: parts.policy_version,
        drone_config: DroneConfig::from(&parts.params),
        latency_method: parts.latency_method,
        flown_pids: parts.flown_pids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_analysis::safety_metrics::OscillationRisk;
    use crate::data_analysis::tuning_recommender::{FilterRecommendation, FilterType};
    use crate::data_input::log_data::TelemetrySample;
    use crate::policy::TuningPolicy;

    fn parts() -> ReportParts {
        let mut spectra = PerAxis::default();
        spectra.set(
            Axis::Roll,
            Some(SpectrumResult {
                freqs: vec![10.0, 20.0],
                amps: vec![1.0, 2.0],
                peak_freq_hz: 20.0,
                peak_amplitude: 2.0,
                full_freqs: vec![0.0, 10.0, 20.0],
                full_amps: vec![0.0, 1.0, 2.0],
            }),
        );
        let mut safety = PerAxis::default();
        safety.set(
            Axis::Roll,
            Some(SafetyMetrics {
                latency_ms: 4.5,
                heat_risk: 0.0,
                oscillation_risk: OscillationRisk::Low,
            }),
        );
        ReportParts {
            sampling: SamplingInfo {
                rate_hz: 2000.0,
                duration_sec: 8.0,
            },
            spectra,
            steps: PerAxis::default(),
            raw_snippet: RawSnippet::default(),
            safety,
            latency_method: LatencyMethod::StepDelay,
            recommendation: Recommendation {
                pids: TuningPolicy::default().base_pids,
                filters: Vec::new(),
                filter_slider: 1.2,
            },
            policy_version: "1.0.0".to_string(),
            params: VehicleParams::default(),
            flown_pids: PidMetadata::default(),
        }
    }

    #[test]
    fn test_json_key_order_and_omitted_axes() {
        let report = assemble(parts()).unwrap();
        let json = report.to_json(false).unwrap();
        let keys = [
            "\"status\":\"success\"",
            "\"sampling_rate\":2000.0",
            "\"log_duration_sec\"",
            "\"noise_analysis\"",
            "\"spectrum\"",
            "\"step_response\":{}",
            "\"raw_snippet\"",
            "\"safety_metrics\"",
            "\"recommendations\"",
            "\"policy_version\":\"1.0.0\"",
            "\"drone_config\":{\"size\":\"5\\\"\",\"weight\":250.0,\"style\":\"freestyle\"}",
        ];
        let mut last = 0;
        for key in keys {
            let pos = json.find(key).unwrap_or_else(|| panic!("{key} missing from {json}"));
            assert!(pos >= last, "{key} out of order");
            last = pos;
        }
        assert!(!json.contains("\"pitch\":{\"peak"));
        assert!(!json.contains("latency_method"));
    }

    #[test]
    fn test_rejects_invalid_notch() {
        let mut bad = parts();
        bad.recommendation.filters.push(FilterRecommendation {
            filter_type: FilterType::GyroNotch,
            axis: Axis::Roll,
            center_hz: 100,
            cutoff_hz: 100,
        });
        assert!(matches!(assemble(bad), Err(AnalysisError::Internal(_))));
    }

    #[test]
    fn test_rejects_empty_analysis() {
        let mut bad = parts();
        bad.spectra = PerAxis::default();
        assert!(matches!(assemble(bad), Err(AnalysisError::Internal(_))));
    }

    #[test]
    fn test_raw_snippet_is_centred_window() {
        let samples: Vec<TelemetrySample> = (0..1000u64)
            .map(|i| TelemetrySample {
                time_us: i * 500,
                gyro: [i as f64, -(i as f64), 0.0],
                setpoint: [1.0, 2.0, 3.0],
                dterm: None,
                motor: None,
            })
            .collect();
        let series = LogSeries::new(samples, Vec::new());
        let snippet = RawSnippet::from_series(&series, 500);
        assert_eq!(snippet.len(), 500);
        assert_eq!(snippet.time[0], 0.0);
        assert_eq!(snippet.time[1], 0.5);
        assert_eq!(snippet.roll_gyro[0], 250.0);
        assert_eq!(snippet.pitch_gyro[0], -250.0);
        assert_eq!(snippet.pitch_setpoint[499], 2.0);

        let short = RawSnippet::from_series(&series, 5000);
        assert_eq!(short.len(), 1000);
    }
}
