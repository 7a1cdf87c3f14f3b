use anyhow::{anyhow, Result};
use std::collections::VecDeque;

use crate::detect::backend::{DetectorBackend, DetectorOutput};
use crate::detect::result::FrameDetections;

/// Backend that plays back a fixed queue of per-frame results, then ends.
///
/// Failed frames are queued as error messages.
#[derive(Default)]
pub struct ScriptedBackend {
    frames: VecDeque<std::result::Result<FrameDetections, String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_frame(&mut self, frame: FrameDetections) -> &mut Self {
        self.frames.push_back(Ok(frame));
        self
    }

    pub fn push_failure(&mut self, message: impl Into<String>) -> &mut Self {
        self.frames.push_back(Err(message.into()));
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FromIterator<FrameDetections> for ScriptedBackend {
    fn from_iter<I: IntoIterator<Item = FrameDetections>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().map(Ok).collect(),
        }
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self) -> Result<DetectorOutput> {
        match self.frames.pop_front() {
            Some(Ok(frame)) => Ok(DetectorOutput::Frame(frame)),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(DetectorOutput::EndOfStream),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plays_frames_then_failures_in_order() {
        let mut backend = ScriptedBackend::new();
        backend
            .push_frame(FrameDetections::new())
            .push_failure("sensor timeout");

        assert!(matches!(backend.detect().unwrap(), DetectorOutput::Frame(_)));
        let err = backend.detect().unwrap_err();
        assert_eq!(err.to_string(), "sensor timeout");
        assert!(matches!(
            backend.detect().unwrap(),
            DetectorOutput::EndOfStream
        ));
        assert_eq!(backend.remaining(), 0);
    }
}
