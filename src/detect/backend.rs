use anyhow::{anyhow, Result};
use std::path::Path;

use crate::detect::result::FrameDetections;

/// What a detector produced for one capture.
#[derive(Debug)]
pub enum DetectorOutput {
    Frame(FrameDetections),
    /// The source has no more frames (replay finished, camera detached).
    EndOfStream,
}

/// Capture-and-infer collaborator.
///
/// Camera capture and model inference live behind this trait; the monitor
/// loop only consumes the grouped detections. An `Err` from `detect` is a
/// per-frame failure and never ends the loop.
pub trait DetectorBackend {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Capture one frame and run detection on it.
    fn detect(&mut self) -> Result<DetectorOutput>;

    /// Optional warm-up hook, run once at startup. Errors here are fatal.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: DetectorBackend + ?Sized> DetectorBackend for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&mut self) -> Result<DetectorOutput> {
        (**self).detect()
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}

/// Startup check that the model artifact is present.
pub fn require_model_artifact(path: &Path) -> Result<()> {
    let meta = std::fs::metadata(path)
        .map_err(|e| anyhow!("model artifact {} not found: {}", path.display(), e))?;
    if !meta.is_file() {
        return Err(anyhow!("model artifact {} is not a file", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_artifact_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = require_model_artifact(&dir.path().join("trained.tflite")).unwrap_err();
        assert!(err.to_string().contains("not found"));

        let err = require_model_artifact(dir.path()).unwrap_err();
        assert!(err.to_string().contains("not a file"));
    }

    #[test]
    fn present_model_artifact_passes() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(require_model_artifact(file.path()).is_ok());
    }
}
