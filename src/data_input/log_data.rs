// src/data_input/log_data.rs

use ndarray::Array1;

use crate::axis_names::{Axis, AXIS_COUNT};
use crate::data_input::field_registry::MOTOR_COUNT;

/// One validated row of the log.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    pub time_us: u64,                          // Relative to the first sample.
    pub gyro: [f64; AXIS_COUNT],               // Filtered gyro, deg/s [Roll, Pitch, Yaw].
    pub setpoint: [f64; AXIS_COUNT],           // Pilot setpoint, deg/s.
    pub dterm: Option<[f64; AXIS_COUNT]>,      // D term output; yaw reads 0 when not logged.
    pub motor: Option<[f64; MOTOR_COUNT]>,     // Motor outputs.
}

/// Parsed log: time-ordered samples and the `key,value` preamble the firmware
/// wrote above the header.
#[derive(Debug, Clone)]
pub struct LogSeries {
    samples: Vec<TelemetrySample>,
    metadata: Vec<(String, String)>,
}

impl LogSeries {
    pub fn new(samples: Vec<TelemetrySample>, metadata: Vec<(String, String)>) -> Self {
        Self { samples, metadata }
    }

    pub fn samples(&self) -> &[TelemetrySample] {
        &self.samples
    }

    pub fn metadata(&self) -> &[(String, String)] {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn times_us(&self) -> Vec<u64> {
        self.samples.iter().map(|s| s.time_us).collect()
    }

    pub fn gyro(&self, axis: Axis) -> Array1<f64> {
        self.samples.iter().map(|s| s.gyro[axis.index()]).collect()
    }

    pub fn setpoint(&self, axis: Axis) -> Array1<f64> {
        self.samples.iter().map(|s| s.setpoint[axis.index()]).collect()
    }
}
