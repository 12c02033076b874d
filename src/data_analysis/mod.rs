// src/data_analysis/mod.rs

pub mod calc_step_response;
pub mod fft_utils;
pub mod noise_spectrum;
pub mod peak_detection;
pub mod safety_metrics;
pub mod sampling_rate;
pub mod signal_stats;
pub mod spectral_analysis;
pub mod transfer_function_estimation;
pub mod tuning_recommender;
