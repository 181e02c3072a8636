pub mod api;
pub mod config;
pub mod error;
pub mod manager_factory;
pub mod telemetry;
