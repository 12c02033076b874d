// src/data_input/mod.rs

pub mod field_registry;
pub mod log_data;
pub mod log_parser;
pub mod pid_metadata;
pub mod vehicle_params;
