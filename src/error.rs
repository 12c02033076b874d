// src/error.rs

use thiserror::Error;

use crate::axis_names::Axis;

/// The upload itself is unusable. The caller is expected to avoid these.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    #[error("log is empty")]
    Empty,
    #[error("log has {count} samples, more than the limit of {limit}")]
    TooManySamples { count: usize, limit: usize },
    #[error("weight must be a positive number of grams, got '{0}'")]
    InvalidWeight(String),
    #[error("unknown frame size '{0}' (expected one of 65mm, 75mm, 85mm, 2\", 2.5\", 3\", 3.5\", 4\", 5\", 6\", 7\")")]
    UnknownFrameSize(String),
    #[error("unknown tuning style '{0}' (expected freestyle, cinematic or racing)")]
    UnknownStyle(String),
}

/// The log could be read but does not describe a usable flight.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("could not find a column header row (needs a time column and gyro columns)")]
    HeaderNotFound,
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("{skipped} of {total} data rows were unreadable, more than the {tolerance_percent:.1}% tolerance")]
    TooManyInvalidRows {
        skipped: usize,
        total: usize,
        tolerance_percent: f64,
    },
    #[error("only {count} valid samples after filtering, need at least {minimum}")]
    TooFewSamples { count: usize, minimum: usize },
    #[error("degenerate time axis: {0}")]
    DegenerateTimeAxis(String),
}

/// Per-axis estimation failure. Degrades that axis only.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ComputeError {
    #[error("signal is degenerate (rms {rms:.3e})")]
    DegenerateSignal { rms: f64 },
    #[error("signal too short: {len} samples, need {needed}")]
    SignalTooShort { len: usize, needed: usize },
    #[error("setpoint excitation too low (rms {rms:.2} deg/s, need {minimum:.1})")]
    InsufficientExcitation { rms: f64, minimum: f64 },
    #[error("transfer function is ill-conditioned: {0}")]
    IllConditioned(String),
    #[error("median time delta is not positive ({0})")]
    NonPositiveTimeDelta(f64),
    #[error("time deltas too irregular (coefficient of variation {cv:.2} > {limit:.2})")]
    IrregularTimeDeltas { cv: f64, limit: f64 },
    #[error("FFT failed: {0}")]
    Fft(String),
}

/// Errors that abort a whole analysis call.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("input error: {0}")]
    Input(#[from] InputError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("analysis failed on every axis ({})", .0.iter().map(|(a, e)| format!("{a}: {e}")).collect::<Vec<_>>().join("; "))]
    AllAxesFailed(Vec<(Axis, ComputeError)>),
    #[error("analysis exceeded its wall-clock budget of {budget_secs:.1}s")]
    BudgetExceeded { budget_secs: f64 },
    #[error("analysis was cancelled")]
    Cancelled,
    #[error("internal fault: {0}")]
    Internal(String),
}

impl AnalysisError {
    /// Short machine-readable category, used by the CLI's JSON error output.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Input(_) => "input_error",
            AnalysisError::Parse(_) => "parse_error",
            AnalysisError::AllAxesFailed(_) => "compute_error",
            AnalysisError::BudgetExceeded { .. } => "budget_exceeded",
            AnalysisError::Cancelled => "cancelled",
            AnalysisError::Internal(_) => "internal_fault",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_lists_names() {
        let err = AnalysisError::from(ParseError::MissingColumns(vec![
            "setpoint[1]".to_string(),
            "setpoint[2]".to_string(),
        ]));
        assert_eq!(err.kind(), "parse_error");
        assert!(err.to_string().contains("setpoint[1], setpoint[2]"));
    }

    #[test]
    fn test_all_axes_failed_message() {
        let err = AnalysisError::AllAxesFailed(vec![(
            Axis::Roll,
            ComputeError::DegenerateSignal { rms: 0.0 },
        )]);
        assert_eq!(err.kind(), "compute_error");
        assert!(err.to_string().starts_with("analysis failed on every axis (Roll: "));
    }
}
