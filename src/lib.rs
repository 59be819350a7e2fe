#[cfg(feature = "desktop")]
pub mod camera;
pub mod config;
pub mod error;
pub mod judge;
pub mod osc;
pub mod pose;
pub mod replay;
pub mod telemetry;

pub use error::{JudgeError, Result};
