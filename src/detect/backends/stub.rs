use anyhow::Result;

use crate::detect::backend::{DetectorBackend, DetectorOutput};
use crate::detect::result::FrameDetections;

/// Stub backend for an idle camera. Every frame is empty.
///
/// With a frame limit it reports end of stream once the limit is reached.
pub struct StubBackend {
    remaining: Option<u64>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self { remaining: None }
    }

    pub fn with_frame_limit(frames: u64) -> Self {
        Self {
            remaining: Some(frames),
        }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self) -> Result<DetectorOutput> {
        match self.remaining.as_mut() {
            Some(0) => return Ok(DetectorOutput::EndOfStream),
            Some(n) => *n -= 1,
            None => {}
        }
        Ok(DetectorOutput::Frame(FrameDetections::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_backend_emits_empty_frames_until_limit() {
        let mut backend = StubBackend::with_frame_limit(2);
        for _ in 0..2 {
            match backend.detect().unwrap() {
                DetectorOutput::Frame(frame) => assert!(frame.is_empty()),
                DetectorOutput::EndOfStream => panic!("ended early"),
            }
        }
        assert!(matches!(
            backend.detect().unwrap(),
            DetectorOutput::EndOfStream
        ));
    }
}
