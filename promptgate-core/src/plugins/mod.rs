// promptgate-core/src/plugins/mod.rs
//! Simulated data providers exposed to the kernel as plugins.

pub mod weather;

pub use weather::WeatherPlugin;
