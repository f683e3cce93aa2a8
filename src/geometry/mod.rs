//! Solar geometry
//!
//! Closed-form sun position for a site and instant, plus the clear-sky
//! attenuation model built on top of it.

pub mod clear_sky;
pub mod position;

pub use clear_sky::*;
pub use position::*;
