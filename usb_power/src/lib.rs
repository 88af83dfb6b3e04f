//! Suspend and resume USB devices selected by vendor/product id.

pub mod error;
pub mod host;
pub mod ids;
#[cfg(target_os = "macos")]
pub mod iokit;
pub mod power;

pub use error::Error;
pub use ids::{IdPair, PowerAction};
