// src/engine.rs
//
// Runs one analysis call: parse, sample-rate estimation, per-axis spectral and
// step-response work in parallel, then safety scoring, recommendations and
// report assembly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};
use rayon::prelude::*;

use crate::axis_names::Axis;
use crate::config::AnalysisConfig;
use crate::data_analysis::calc_step_response::{calculate_step_response, StepResponseResult};
use crate::data_analysis::noise_spectrum::{self, SpectrumResult};
use crate::data_analysis::transfer_function_estimation::TransferFunctionResult;
use crate::data_analysis::{safety_metrics, sampling_rate, tuning_recommender};
use crate::data_input::log_data::LogSeries;
use crate::data_input::log_parser;
use crate::data_input::pid_metadata::parse_pid_metadata;
use crate::data_input::vehicle_params::VehicleParams;
use crate::error::{AnalysisError, ComputeError, InputError, ParseError};
use crate::policy::TuningPolicy;
use crate::report::{self, RawSnippet, Report, ReportParts};
use crate::types::PerAxis;

/// Cooperative cancellation flag shared between the caller and a running analysis.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Wall-clock budget plus cancellation, checked between stages.
struct Deadline<'a> {
    started: Instant,
    budget: Duration,
    cancel: &'a CancelToken,
}

impl<'a> Deadline<'a> {
    fn start(budget: Duration, cancel: &'a CancelToken) -> Self {
        Self {
            started: Instant::now(),
            budget,
            cancel,
        }
    }

    fn check(&self, stage: &str) -> Result<(), AnalysisError> {
        if self.cancel.is_cancelled() {
            info!("Analysis cancelled before {stage}");
            return Err(AnalysisError::Cancelled);
        }
        if self.started.elapsed() >= self.budget {
            warn!("Time budget exhausted before {stage}");
            return Err(AnalysisError::BudgetExceeded {
                budget_secs: self.budget.as_secs_f64(),
            });
        }
        Ok(())
    }
}

/// What one axis produced. Each half may fail on its own.
struct AxisOutcome {
    axis: Axis,
    spectrum: Result<SpectrumResult, ComputeError>,
    step: Result<(StepResponseResult, TransferFunctionResult), ComputeError>,
}

fn analyze_axis(
    series: &LogSeries,
    axis: Axis,
    sample_rate: f64,
    deadline: &Deadline<'_>,
) -> Result<AxisOutcome, AnalysisError> {
    deadline.check(&format!("{axis} spectrum"))?;
    let gyro = series.gyro(axis).to_vec();
    let spectrum = noise_spectrum::analyze(&gyro, sample_rate);
    if let Err(e) = &spectrum {
        warn!("{axis}: noise spectrum unavailable: {e}");
    }

    deadline.check(&format!("{axis} step response"))?;
    let setpoint = series.setpoint(axis).to_vec();
    let step = calculate_step_response(&setpoint, &gyro, sample_rate);
    if let Err(e) = &step {
        warn!("{axis}: step response unavailable: {e}");
    }

    Ok(AxisOutcome { axis, spectrum, step })
}

/// Analysis engine holding the limits and tuning policy shared by every call.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: AnalysisConfig,
    policy: TuningPolicy,
}

impl Engine {
    pub fn new(config: AnalysisConfig, policy: TuningPolicy) -> Self {
        Self { config, policy }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn policy(&self) -> &TuningPolicy {
        &self.policy
    }

    /// Analyses one log. Per-axis estimation problems degrade that axis only;
    /// the call fails when the log is unusable, every axis fails, the budget
    /// runs out or `cancel` is set.
    pub fn analyze(&self, bytes: &[u8], params: &VehicleParams, cancel: &CancelToken) -> Result<Report, AnalysisError> {
        let deadline = Deadline::start(self.config.time_budget, cancel);
        if !(params.weight_g.is_finite() && params.weight_g > 0.0) {
            return Err(InputError::InvalidWeight(params.weight_g.to_string()).into());
        }

        deadline.check("parsing")?;
        let series = log_parser::parse(bytes, &self.config.parse_limits())?;

        deadline.check("sample rate estimation")?;
        let sampling = sampling_rate::estimate(&series.times_us(), self.config.max_time_delta_cv)
            .map_err(|e| ParseError::DegenerateTimeAxis(e.to_string()))?;
        info!(
            "Sample rate {:.1} Hz over {:.2} s",
            sampling.rate_hz, sampling.duration_sec
        );
        let flown_pids = parse_pid_metadata(series.metadata());

        deadline.check("per-axis analysis")?;
        let outcomes = Axis::ALL
            .par_iter()
            .map(|&axis| analyze_axis(&series, axis, sampling.rate_hz, &deadline))
            .collect::<Result<Vec<_>, _>>()?;

        let mut spectra = PerAxis::default();
        let mut steps = PerAxis::default();
        let mut transfer_functions = PerAxis::default();
        let mut failures = Vec::new();
        for outcome in outcomes {
            let axis = outcome.axis;
            match (outcome.spectrum, outcome.step) {
                (Err(spectrum_err), Err(_)) => failures.push((axis, spectrum_err)),
                (spectrum, step) => {
                    spectra.set(axis, spectrum.ok());
                    if let Ok((step, tf)) = step {
                        steps.set(axis, Some(step));
                        transfer_functions.set(axis, Some(tf));
                    }
                }
            }
        }
        if failures.len() == Axis::ALL.len() {
            return Err(AnalysisError::AllAxesFailed(failures));
        }
        for (axis, e) in &failures {
            warn!("{axis}: axis left out of the report ({e})");
        }

        deadline.check("safety metrics")?;
        let (safety, latency_method) =
            safety_metrics::compute(&spectra, &steps, &transfer_functions, &flown_pids, &self.policy);

        deadline.check("recommendations")?;
        let recommendation = tuning_recommender::recommend(params, &spectra, &steps, &self.policy);

        deadline.check("report assembly")?;
        report::assemble(ReportParts {
            sampling,
            raw_snippet: RawSnippet::from_series(&series, self.config.raw_snippet_len),
            spectra,
            steps,
            safety,
            latency_method,
            recommendation,
            policy_version: self.policy.version.clone(),
            params: *params,
            flown_pids,
        })
    }
}

/// Analyses one log with the default limits and tuning policy.
pub fn analyze(bytes: &[u8], params: &VehicleParams) -> Result<Report, AnalysisError> {
    Engine::default().analyze(bytes, params, &CancelToken::new())
}
