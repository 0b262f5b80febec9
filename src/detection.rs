//! Detector boundary
//!
//! The object detector itself is external. What crosses into the tracker is a
//! [`Detection`]: either one position for the tracked class or an explicit
//! "not detected". [`DetectionFilter`] turns a frame's raw boxes into that
//! value by keeping the first box of the wanted class above a confidence
//! threshold.

use nalgebra::Scalar;

use crate::types::spaces::Measurement;

/// Default confidence a box must exceed to count as a detection.
pub const DEFAULT_MIN_SCORE: f32 = 0.5;

/// Outcome of running the detector on one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Detection<T: Scalar = f64> {
    /// The tracked object was found at this position
    Detected(Measurement<T, 2>),
    /// No box of the tracked class passed the threshold
    NotDetected,
}

impl<T: Scalar + Copy> Detection<T> {
    /// Creates a detection at `(x, y)`.
    pub fn at(x: T, y: T) -> Self {
        Detection::Detected(Measurement::from_array([x, y]))
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, Detection::Detected(_))
    }

    /// The observed position, if any.
    pub fn measurement(&self) -> Option<&Measurement<T, 2>> {
        match self {
            Detection::Detected(z) => Some(z),
            Detection::NotDetected => None,
        }
    }

    /// The observed position as `[x, y]`, if any.
    pub fn position(&self) -> Option<[T; 2]> {
        self.measurement().map(|z| z.to_array())
    }
}

impl<T: Scalar + Copy> From<Option<[T; 2]>> for Detection<T> {
    fn from(position: Option<[T; 2]>) -> Self {
        match position {
            Some(p) => Detection::Detected(Measurement::from_array(p)),
            None => Detection::NotDetected,
        }
    }
}

/// One raw detector output row: corners, confidence and class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
    pub class_id: u32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, score: f32, class_id: u32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            score,
            class_id,
        }
    }

    /// Integer pixel centre of the box.
    ///
    /// Corners are truncated to whole pixels first; the midpoint rounds down.
    /// Non-finite corners have no meaningful centre, see [`Self::is_finite`].
    pub fn center(&self) -> [i64; 2] {
        let (x1, y1) = (self.x1 as i64, self.y1 as i64);
        let (x2, y2) = (self.x2 as i64, self.y2 as i64);
        [floor_midpoint(x1, x2), floor_midpoint(y1, y2)]
    }

    /// True when all four corners are finite.
    pub fn is_finite(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|c| c.is_finite())
    }
}

// floor((a + b) / 2) without overflowing
fn floor_midpoint(a: i64, b: i64) -> i64 {
    a.div_euclid(2) + b.div_euclid(2) + (a.rem_euclid(2) + b.rem_euclid(2)) / 2
}

/// Reduces a frame's boxes to at most one detection of a single class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionFilter {
    /// Class to track
    pub class_id: u32,
    /// A box counts only when its score is strictly greater than this
    pub min_score: f32,
}

impl DetectionFilter {
    /// Tracks `class_id` with the default 0.5 confidence cutoff.
    pub fn new(class_id: u32) -> Self {
        Self {
            class_id,
            min_score: DEFAULT_MIN_SCORE,
        }
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Matching class, score strictly above the cutoff and finite corners.
    pub fn accepts(&self, bbox: &BoundingBox) -> bool {
        bbox.class_id == self.class_id && bbox.score > self.min_score && bbox.is_finite()
    }

    /// Returns the centre of the first accepted box, in detector order.
    pub fn select(&self, boxes: &[BoundingBox]) -> Detection<f64> {
        boxes
            .iter()
            .find(|b| self.accepts(b))
            .map(|b| {
                let [cx, cy] = b.center();
                Detection::at(cx as f64, cy as f64)
            })
            .unwrap_or(Detection::NotDetected)
    }
}
