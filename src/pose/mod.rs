#[cfg(feature = "desktop")]
pub mod detector;
pub mod landmark;
pub mod side;

#[cfg(feature = "desktop")]
pub use detector::PoseDetector;
pub use landmark::{Landmark, LandmarkFrame, LandmarkName};
pub use side::{Side, SideLandmarks, SideSelection, SideSelector};
