//! Forecast pipeline
//!
//! Weather acquisition, feature construction, orchestration of inference and
//! the daily/hourly aggregates built from the hourly output.

pub mod engine;
pub mod features;
pub mod rollup;
pub mod weather;

pub use engine::*;
pub use features::*;
pub use rollup::*;
pub use weather::*;
