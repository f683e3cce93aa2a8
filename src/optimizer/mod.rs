pub mod tilt;

pub use tilt::*;
