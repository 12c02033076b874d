// src/constants.rs

// Algorithm constants. Tunable recommendation policy lives in policy.rs instead.

// --- Log parsing ---
// Raw median time delta at or above this is read as microseconds.
pub const TIME_DELTA_MICROSECONDS_MIN: f64 = 20.0;
// Raw median time delta at or above this (and below the above) is read as milliseconds.
pub const TIME_DELTA_MILLISECONDS_MIN: f64 = 0.02;
// Most accepted rows a later, in-order timestamp may discard as a forward time glitch.
pub const TIME_GLITCH_MAX_ROWS: usize = 3;

// --- Spectral analysis (Welch) ---
pub const WELCH_OVERLAP: f64 = 0.5; // 50% overlapping segments
pub const TARGET_FREQ_RESOLUTION_HZ: f64 = 1.0;
pub const MIN_SEGMENT_LENGTH: usize = 64;
pub const MIN_SIGNAL_RMS: f64 = 1e-6;

// Transport spectrum: range and maximum number of points reported per axis.
pub const SPECTRUM_MAX_FREQ_HZ: f64 = 1000.0;
pub const SPECTRUM_TRANSPORT_BINS: usize = 256;

// --- Peak detection ---
pub const PEAK_MIN_FREQ_HZ: f64 = 5.0; // Excludes flight-dynamics content
pub const PEAK_CORE_RADIUS_BINS: usize = 2;
pub const PEAK_NEIGHBORHOOD_RADIUS_BINS: usize = 8;
pub const PEAK_MIN_PROMINENCE_RATIO: f64 = 2.0;

// --- Step response ---
pub const RESPONSE_LENGTH_S: f64 = 0.5; // Length of the step response to keep
pub const STEADY_STATE_START_S: f64 = 0.2;
pub const STEADY_STATE_END_S: f64 = 0.5;
pub const MIN_SETPOINT_RMS_DEG_S: f64 = 5.0; // Below this the pilot gave almost no stick input
pub const H1_REGULARIZATION: f64 = 1e-4;
pub const MIN_STEADY_STATE_GAIN: f64 = 1e-6;
pub const RISE_TIME_LEVEL: f64 = 0.9;
pub const DELAY_TIME_LEVEL: f64 = 0.5;

// --- Latency from transfer-function phase ---
pub const LATENCY_BAND_MIN_HZ: f64 = 10.0;
pub const LATENCY_BAND_MAX_HZ: f64 = 60.0;
pub const LATENCY_MIN_COHERENCE: f64 = 0.5;
pub const LATENCY_MIN_BINS: usize = 4;

// --- Report ---
pub const RAW_SNIPPET_MAX_SAMPLES: usize = 500;
