// tests/common/mod.rs
// Deterministic synthetic blackbox logs for the integration tests.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Stick input per axis: (slow sweep amplitude deg/s, sweep frequency Hz).
const STICK_SWEEPS: [(f64, f64); 3] = [(150.0, 0.7), (120.0, 1.1), (80.0, 0.5)];
const STICK_JITTER: f64 = 40.0;

#[derive(Debug, Clone)]
pub struct SyntheticLog {
    pub rate_hz: f64,
    pub seconds: f64,
    pub seed: u64,
    /// Extra gyro-only tone on roll: (frequency Hz, amplitude deg/s).
    pub roll_tone: Option<(f64, f64)>,
    pub include_setpoint: bool,
    /// Log a constant zero yaw setpoint while the yaw gyro keeps moving.
    pub flat_yaw_setpoint: bool,
    /// Betaflight-style `key,value` lines above the header.
    pub preamble: Vec<(String, String)>,
    pub delimiter: char,
}

impl Default for SyntheticLog {
    fn default() -> Self {
        Self {
            rate_hz: 2000.0,
            seconds: 8.0,
            seed: 42,
            roll_tone: None,
            include_setpoint: true,
            flat_yaw_setpoint: false,
            preamble: Vec::new(),
            delimiter: ',',
        }
    }
}

impl SyntheticLog {
    pub fn sample_count(&self) -> usize {
        (self.rate_hz * self.seconds) as usize
    }

    /// Renders the log. Gyro tracks setpoint perfectly, plus the optional roll tone.
    pub fn render(&self) -> String {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let d = self.delimiter.to_string();
        let mut text = String::new();
        for (key, value) in &self.preamble {
            text.push_str(&format!("\"{key}\",\"{value}\"\n"));
        }

        let mut header = vec!["loopIteration", "time (us)"];
        if self.include_setpoint {
            header.extend(["setpoint[0]", "setpoint[1]", "setpoint[2]"]);
        }
        header.extend(["gyroADC[0]", "gyroADC[1]", "gyroADC[2]"]);
        text.push_str(&header.join(&d));
        text.push('\n');

        let dt_us = 1e6 / self.rate_hz;
        for i in 0..self.sample_count() {
            let t = i as f64 / self.rate_hz;
            let setpoint: Vec<f64> = STICK_SWEEPS
                .iter()
                .enumerate()
                .map(|(axis, &(amp, freq))| {
                    amp * (2.0 * PI * freq * t + axis as f64).sin() + rng.gen_range(-STICK_JITTER..STICK_JITTER)
                })
                .collect();
            let mut gyro = setpoint.clone();
            if let Some((freq, amp)) = self.roll_tone {
                gyro[0] += amp * (2.0 * PI * freq * t).sin();
            }

            let mut fields = vec![i.to_string(), format!("{:.0}", i as f64 * dt_us)];
            if self.include_setpoint {
                let mut logged = setpoint.clone();
                if self.flat_yaw_setpoint {
                    logged[2] = 0.0;
                }
                fields.extend(logged.iter().map(|v| format!("{v:.3}")));
            }
            fields.extend(gyro.iter().map(|v| format!("{v:.3}")));
            text.push_str(&fields.join(&d));
            text.push('\n');
        }
        text
    }
}
