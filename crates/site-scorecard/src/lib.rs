pub mod config;
pub mod error;
pub mod import;
pub mod scorecard;
pub mod telemetry;
