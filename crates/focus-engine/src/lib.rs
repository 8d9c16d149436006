pub mod config;
pub mod error;
pub mod focus_areas;
pub mod telemetry;
