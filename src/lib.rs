//! Solar power forecasting
//!
//! Hourly output forecasts for a PV plant from weather observations and sun
//! geometry, daily energy roll-ups, and the fixed panel tilt that collects
//! the most clear-sky beam over a year.

pub mod config;
pub mod domain;
pub mod forecast;
pub mod geometry;
pub mod ml;
pub mod optimizer;
pub mod telemetry;

pub use domain::{
    DailyEnergy, ForecastError, ForecastPoint, ForecastRun, Location, PlantCapacity, TiltAngle,
    WeatherObservation,
};
pub use forecast::ForecastOrchestrator;
pub use optimizer::TiltAngleOptimizer;
