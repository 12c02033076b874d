// src/lib.rs - Library interface for the analysis engine

pub mod axis_names;
pub mod cli_dump;
pub mod config;
pub mod constants;
pub mod data_analysis;
pub mod data_input;
pub mod engine;
pub mod error;
pub mod policy;
pub mod report;
pub mod types;

pub use config::AnalysisConfig;
pub use data_input::vehicle_params::{FrameSize, TuningStyle, VehicleParams};
pub use engine::{analyze, CancelToken, Engine};
pub use error::AnalysisError;
pub use policy::TuningPolicy;
pub use report::Report;

pub fn crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
