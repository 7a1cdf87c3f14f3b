//! Replay backend: detections recorded as JSON lines.
//!
//! Each line is one frame, a JSON array of objects:
//!
//! ```text
//! [{"label":"person","confidence":0.91,"x":12,"y":40,"w":80,"h":160}]
//! ```
//!
//! Blank lines are empty frames. A line that does not parse (or is not UTF-8)
//! is a failed frame. A missing `confidence` is kept as NaN so the frame
//! classifier drops it. A source that keeps failing to read ends the stream.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::io::BufRead;

use crate::detect::backend::{DetectorBackend, DetectorOutput};
use crate::detect::result::{BoundingBox, DetectionEvent, FrameDetections, SeatClass};

/// Back-to-back read failures after which the source is treated as gone.
const MAX_CONSECUTIVE_READ_ERRORS: u32 = 8;

#[derive(Debug, Deserialize)]
struct ReplayObject {
    label: String,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    x: i32,
    #[serde(default)]
    y: i32,
    #[serde(default)]
    w: i32,
    #[serde(default)]
    h: i32,
}

pub struct ReplayBackend<R: BufRead> {
    reader: R,
    source: String,
    line_no: u64,
    read_errors: u32,
}

impl<R: BufRead> ReplayBackend<R> {
    pub fn new(reader: R, source: impl Into<String>) -> Self {
        Self {
            reader,
            source: source.into(),
            line_no: 0,
            read_errors: 0,
        }
    }
}

impl<R: BufRead> DetectorBackend for ReplayBackend<R> {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn detect(&mut self) -> Result<DetectorOutput> {
        if self.read_errors >= MAX_CONSECUTIVE_READ_ERRORS {
            return Ok(DetectorOutput::EndOfStream);
        }

        let mut line = String::new();
        let result = self.reader.read_line(&mut line);
        // counted before the result is checked: an unreadable line is still a line
        self.line_no += 1;
        let read = match result {
            Ok(read) => {
                self.read_errors = 0;
                read
            }
            Err(err) => {
                self.read_errors += 1;
                if self.read_errors == MAX_CONSECUTIVE_READ_ERRORS {
                    log::error!(
                        "giving up on {} after {} consecutive read errors",
                        self.source,
                        self.read_errors
                    );
                }
                return Err(err).with_context(|| {
                    format!("failed to read {}:{}", self.source, self.line_no)
                });
            }
        };
        if read == 0 {
            return Ok(DetectorOutput::EndOfStream);
        }
        parse_frame_line(line.trim())
            .map(DetectorOutput::Frame)
            .map_err(|e| anyhow!("{}:{}: {}", self.source, self.line_no, e))
    }
}

fn parse_frame_line(line: &str) -> Result<FrameDetections> {
    if line.is_empty() {
        return Ok(FrameDetections::new());
    }
    let objects: Vec<ReplayObject> =
        serde_json::from_str(line).map_err(|e| anyhow!("invalid frame json: {}", e))?;

    let mut frame = FrameDetections::new();
    for object in objects {
        let Some(class) = SeatClass::from_label(&object.label) else {
            log::debug!("ignoring detection with unknown label {:?}", object.label);
            continue;
        };
        let bbox = BoundingBox {
            x: object.x,
            y: object.y,
            w: object.w,
            h: object.h,
        };
        frame.push(
            DetectionEvent::new(class, object.confidence.unwrap_or(f32::NAN)).with_bbox(bbox),
        );
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn next_frame<R: BufRead>(backend: &mut ReplayBackend<R>) -> FrameDetections {
        match backend.detect().expect("frame") {
            DetectorOutput::Frame(frame) => frame,
            DetectorOutput::EndOfStream => panic!("unexpected end of stream"),
        }
    }

    #[test]
    fn replays_lines_as_frames() {
        let input = concat!(
            r#"[{"label":"person","confidence":0.91,"x":1,"y":2,"w":3,"h":4}]"#,
            "\n",
            "\n",
            r#"[{"label":"book","confidence":0.85},{"label":"lamp","confidence":0.99}]"#,
            "\n"
        );
        let mut backend = ReplayBackend::new(Cursor::new(input), "test");

        let first = next_frame(&mut backend);
        let person = &first.objects(SeatClass::Person.index())[0];
        assert_eq!(person.bbox, BoundingBox { x: 1, y: 2, w: 3, h: 4 });
        assert!((person.confidence - 0.91).abs() < 1e-6);

        assert!(next_frame(&mut backend).is_empty());

        let third = next_frame(&mut backend);
        assert_eq!(third.len(), 1);
        assert_eq!(third.objects(SeatClass::Book.index()).len(), 1);

        assert!(matches!(
            backend.detect().unwrap(),
            DetectorOutput::EndOfStream
        ));
    }

    #[test]
    fn bad_line_is_a_frame_error_and_replay_continues() {
        let input = "not json\n[{\"label\":\"table\",\"confidence\":0.9}]\n";
        let mut backend = ReplayBackend::new(Cursor::new(input), "test");

        let err = backend.detect().unwrap_err();
        assert!(err.to_string().contains("test:1"));

        let frame = next_frame(&mut backend);
        assert_eq!(frame.objects(SeatClass::Table.index()).len(), 1);
    }

    #[test]
    fn non_utf8_line_keeps_line_numbers_in_step() {
        let input: &[u8] = b"\xff\xfe\nbad\n[]\n";
        let mut backend = ReplayBackend::new(Cursor::new(input), "test");

        let err = backend.detect().unwrap_err();
        assert!(format!("{:#}", err).contains("test:1"), "{:#}", err);
        let err = backend.detect().unwrap_err();
        assert!(err.to_string().contains("test:2"), "{}", err);
        assert!(next_frame(&mut backend).is_empty());
    }

    #[test]
    fn persistent_read_errors_end_the_stream() {
        struct BrokenSource;
        impl std::io::Read for BrokenSource {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "device gone"))
            }
        }

        let mut backend =
            ReplayBackend::new(std::io::BufReader::new(BrokenSource), "test");
        for _ in 0..MAX_CONSECUTIVE_READ_ERRORS {
            assert!(backend.detect().is_err());
        }
        assert!(matches!(
            backend.detect().unwrap(),
            DetectorOutput::EndOfStream
        ));
    }

    #[test]
    fn missing_confidence_becomes_nan() {
        let input = "[{\"label\":\"person\"}]\n";
        let mut backend = ReplayBackend::new(Cursor::new(input), "test");
        let frame = next_frame(&mut backend);
        assert!(frame.objects(SeatClass::Person.index())[0].confidence.is_nan());
    }
}
