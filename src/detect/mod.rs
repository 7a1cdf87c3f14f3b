mod backend;
mod backends;
mod classifier;
mod result;

pub use backend::{require_model_artifact, DetectorBackend, DetectorOutput};
pub use backends::{ReplayBackend, ScriptedBackend, StubBackend};
pub use classifier::{classify_frame, FrameFlags};
pub use result::{BoundingBox, DetectionEvent, FrameDetections, SeatClass};
