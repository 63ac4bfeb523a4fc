pub mod config;
pub mod error;
pub mod telemetry;
pub mod text;
pub mod workflows;
