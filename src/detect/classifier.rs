//! Per-frame reduction of detector output to presence flags.

use super::result::{FrameDetections, SeatClass};

/// Which tracked classes were confidently present in one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameFlags {
    pub has_person: bool,
    pub has_book: bool,
    pub has_other: bool,
    pub has_table: bool,
}

impl FrameFlags {
    pub fn is_empty(&self) -> bool {
        !(self.has_person || self.has_book || self.has_other || self.has_table)
    }

    fn set(&mut self, class: SeatClass) {
        match class {
            SeatClass::Person => self.has_person = true,
            SeatClass::Book => self.has_book = true,
            SeatClass::Other => self.has_other = true,
            SeatClass::Table => self.has_table = true,
            SeatClass::Background => {}
        }
    }
}

/// A class flag is set when any of its objects scores at least
/// `confidence_threshold`. Background (index 0) is never inspected.
///
/// Objects with a malformed score are skipped with a warning; the rest of the
/// frame is still classified.
pub fn classify_frame(detections: &FrameDetections, confidence_threshold: f32) -> FrameFlags {
    let mut flags = FrameFlags::default();
    for class in SeatClass::TRACKED {
        for object in detections.objects(class.index()) {
            let Some(confidence) = valid_confidence(object.confidence) else {
                log::warn!(
                    "skipping {} detection with malformed confidence {}",
                    class.label(),
                    object.confidence
                );
                continue;
            };
            if confidence >= confidence_threshold {
                flags.set(class);
                break;
            }
        }
    }
    flags
}

fn valid_confidence(raw: f32) -> Option<f32> {
    (raw.is_finite() && (0.0..=1.0).contains(&raw)).then_some(raw)
}
