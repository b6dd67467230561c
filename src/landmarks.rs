// src/landmarks.rs - Hand observation types shared by the classifier and the trajectory gate
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

pub const LANDMARK_COUNT: usize = 21;

/// MediaPipe hand landmark roles, in detector output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum HandLandmark {
    Wrist = 0,
    ThumbCmc = 1,
    ThumbMcp = 2,
    ThumbIp = 3,
    ThumbTip = 4,
    IndexMcp = 5,
    IndexPip = 6,
    IndexDip = 7,
    IndexTip = 8,
    MiddleMcp = 9,
    MiddlePip = 10,
    MiddleDip = 11,
    MiddleTip = 12,
    RingMcp = 13,
    RingPip = 14,
    RingDip = 15,
    RingTip = 16,
    PinkyMcp = 17,
    PinkyPip = 18,
    PinkyDip = 19,
    PinkyTip = 20,
}

impl HandLandmark {
    pub const FINGER_MCPS: [HandLandmark; 4] = [
        HandLandmark::IndexMcp,
        HandLandmark::MiddleMcp,
        HandLandmark::RingMcp,
        HandLandmark::PinkyMcp,
    ];

    pub const FINGER_TIPS: [HandLandmark; 4] = [
        HandLandmark::IndexTip,
        HandLandmark::MiddleTip,
        HandLandmark::RingTip,
        HandLandmark::PinkyTip,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    Right,
}

/// One detected hand: 21 normalized landmarks (x, y in `[0,1]`, y grows downward).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandObservation {
    pub landmarks: [Vector3<f64>; LANDMARK_COUNT],
    pub handedness: Handedness,
}

impl HandObservation {
    pub fn new(landmarks: [Vector3<f64>; LANDMARK_COUNT], handedness: Handedness) -> Self {
        Self { landmarks, handedness }
    }

    /// Builds an observation from raw `[x, y, z]` rows, as the detector bridge emits them.
    /// Returns `None` unless exactly 21 rows are given.
    pub fn from_rows(rows: &[[f64; 3]], handedness: Handedness) -> Option<Self> {
        if rows.len() != LANDMARK_COUNT {
            return None;
        }
        let mut landmarks = [Vector3::zeros(); LANDMARK_COUNT];
        for (slot, row) in landmarks.iter_mut().zip(rows) {
            *slot = Vector3::new(row[0], row[1], row[2]);
        }
        Some(Self { landmarks, handedness })
    }

    pub fn get(&self, landmark: HandLandmark) -> &Vector3<f64> {
        &self.landmarks[landmark.index()]
    }

    pub fn x(&self, landmark: HandLandmark) -> f64 {
        self.get(landmark).x
    }

    pub fn y(&self, landmark: HandLandmark) -> f64 {
        self.get(landmark).y
    }

    /// Planar distance between two landmarks; depth is ignored.
    pub fn distance(&self, a: HandLandmark, b: HandLandmark) -> f64 {
        let a = self.get(a);
        let b = self.get(b);
        (a.x - b.x).hypot(a.y - b.y)
    }

    /// Height of the knuckle line: the topmost (smallest y) of the four finger MCPs.
    pub fn mcp_line(&self) -> f64 {
        HandLandmark::FINGER_MCPS
            .iter()
            .map(|lm| self.y(*lm))
            .fold(f64::INFINITY, f64::min)
    }

    /// Landmark position scaled to pixel coordinates of a `width` x `height` image.
    pub fn to_pixel(&self, landmark: HandLandmark, width: u32, height: u32) -> PixelPoint {
        let lm = self.get(landmark);
        PixelPoint::new(
            (lm.x * width as f64).round() as i32,
            (lm.y * height as f64).round() as i32,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &PixelPoint) -> f64 {
        ((self.x - other.x) as f64).hypot((self.y - other.y) as f64)
    }
}

/// One frame as delivered by the detector boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Seconds since the start of the stream.
    pub timestamp: f64,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub hand: Option<HandObservation>,
}

impl Frame {
    pub fn empty(timestamp: f64, width: u32, height: u32) -> Self {
        Self { timestamp, width, height, hand: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_hand() -> HandObservation {
        let rows: Vec<[f64; 3]> = (0..LANDMARK_COUNT)
            .map(|i| [0.01 * i as f64, 0.5 + 0.01 * i as f64, 0.0])
            .collect();
        HandObservation::from_rows(&rows, Handedness::Right).unwrap()
    }

    #[test]
    fn from_rows_requires_all_landmarks() {
        let rows = vec![[0.0; 3]; 20];
        assert!(HandObservation::from_rows(&rows, Handedness::Left).is_none());
    }

    #[test]
    fn mcp_line_is_topmost_knuckle() {
        let hand = flat_hand();
        assert!((hand.mcp_line() - hand.y(HandLandmark::IndexMcp)).abs() < 1e-12);
    }

    #[test]
    fn pixel_scaling_rounds_to_nearest() {
        let hand = flat_hand();
        let p = hand.to_pixel(HandLandmark::IndexTip, 640, 480);
        assert_eq!(p, PixelPoint::new(51, 278));
    }

    #[test]
    fn frame_without_hand_field_parses() {
        let frame: Frame =
            serde_json::from_str(r#"{"timestamp":0.5,"width":640,"height":480}"#).unwrap();
        assert!(frame.hand.is_none());
    }
}
