use serde::{Deserialize, Serialize};

/// Detector class labels, in model output order. Index 0 is background.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatClass {
    Background,
    Book,
    Other,
    Person,
    Table,
}

impl SeatClass {
    /// Classes that feed the aggregator, i.e. everything except background.
    pub const TRACKED: [SeatClass; 4] = [
        SeatClass::Book,
        SeatClass::Other,
        SeatClass::Person,
        SeatClass::Table,
    ];

    pub fn index(self) -> usize {
        match self {
            SeatClass::Background => 0,
            SeatClass::Book => 1,
            SeatClass::Other => 2,
            SeatClass::Person => 3,
            SeatClass::Table => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(SeatClass::Background),
            1 => Some(SeatClass::Book),
            2 => Some(SeatClass::Other),
            3 => Some(SeatClass::Person),
            4 => Some(SeatClass::Table),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SeatClass::Background => "background",
            SeatClass::Book => "book",
            SeatClass::Other => "other",
            SeatClass::Person => "person",
            SeatClass::Table => "table",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "background" => Some(SeatClass::Background),
            "book" => Some(SeatClass::Book),
            "other" => Some(SeatClass::Other),
            "person" => Some(SeatClass::Person),
            "table" => Some(SeatClass::Table),
            _ => None,
        }
    }
}

/// Bounding box in frame pixels. Only the overlay renderer looks at it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// One detected object.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionEvent {
    pub class: SeatClass,
    /// Detector score. Values that are not finite or fall outside 0..=1 are
    /// treated as malformed by the frame classifier.
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl DetectionEvent {
    pub fn new(class: SeatClass, confidence: f32) -> Self {
        Self {
            class,
            confidence,
            bbox: BoundingBox::default(),
        }
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = bbox;
        self
    }
}

/// Detector output for one frame: objects grouped by class index.
///
/// Dropped at the end of every monitor iteration.
#[derive(Clone, Debug, Default)]
pub struct FrameDetections {
    by_class: Vec<Vec<DetectionEvent>>,
}

impl FrameDetections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: DetectionEvent) {
        let index = event.class.index();
        if self.by_class.len() <= index {
            self.by_class.resize_with(index + 1, Vec::new);
        }
        self.by_class[index].push(event);
    }

    /// Objects reported for a class index. Indices the detector did not emit
    /// read as empty.
    pub fn objects(&self, class_index: usize) -> &[DetectionEvent] {
        self.by_class
            .get(class_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_class.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<DetectionEvent> for FrameDetections {
    fn from_iter<I: IntoIterator<Item = DetectionEvent>>(iter: I) -> Self {
        let mut frame = FrameDetections::new();
        for event in iter {
            frame.push(event);
        }
        frame
    }
}
