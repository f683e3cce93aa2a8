pub mod error;
pub mod forecast;
pub mod types;
pub mod weather;

pub use error::*;
pub use forecast::*;
pub use types::*;
pub use weather::*;
