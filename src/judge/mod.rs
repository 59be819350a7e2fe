pub mod continuity;
pub mod geometry;
pub mod rep;
pub mod session;
pub mod smooth;
pub mod window;

pub use continuity::{Continuity, DetectionContinuityTracker};
pub use geometry::{GeometricEvaluation, GeometricEvaluator, SideGeometry};
pub use rep::{Phase, RepEvent, RepStateMachine, TopStatus};
pub use session::{JudgeSession, SessionStats};
pub use smooth::{Direction, SmoothedSignals, TemporalSmoother};
pub use window::SlidingWindow;
