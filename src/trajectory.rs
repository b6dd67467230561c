// src/trajectory.rs - Index fingertip path tracking and circular gesture detection
use crate::landmarks::PixelPoint;
use crate::oracle::{CircleOracle, FitCircleOracle};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Per-axis jump between consecutive points that counts as a tracking jerk.
    pub jerk_threshold_px: i32,
    /// Radius around the first point the path must leave before it can close.
    pub exit_radius_px: f64,
    pub min_points: usize,
    pub revolution_cooldown_secs: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            jerk_threshold_px: 40,
            exit_radius_px: 35.0,
            min_points: 30,
            revolution_cooldown_secs: 5.0,
        }
    }
}

/// Winding of a closed loop as seen on screen (image y axis points down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationDirection {
    Clockwise,
    CounterClockwise,
    None,
}

impl RotationDirection {
    /// Positive signed area is clockwise because y grows downward in image space.
    pub fn from_signed_area(area: i64) -> Self {
        match area.signum() {
            1 => Self::Clockwise,
            -1 => Self::CounterClockwise,
            _ => Self::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clockwise => "clockwise",
            Self::CounterClockwise => "counter_clockwise",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevolutionEvent {
    pub direction: RotationDirection,
    /// Revolutions completed since the hand was last seen.
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerPhase {
    Idle,
    Tracing,
    Looping,
}

/// Path state for one session. Cleared whenever the gate drops, the finger
/// jerks, or a revolution is confirmed.
#[derive(Debug, Clone, Default)]
pub struct PatternState {
    points: Vec<PixelPoint>,
    last: Option<PixelPoint>,
    left_start: bool,
    // twice the signed area swept around the first point
    signed_area: i64,
    last_revolution_at: Option<f64>,
}

impl PatternState {
    pub fn points(&self) -> &[PixelPoint] {
        &self.points
    }

    pub fn signed_area(&self) -> i64 {
        self.signed_area
    }

    pub fn has_left_start(&self) -> bool {
        self.left_start
    }

    /// Clears the path. The cooldown stamp is kept.
    pub fn reset(&mut self) {
        self.points.clear();
        self.last = None;
        self.left_start = false;
        self.signed_area = 0;
    }

    pub fn phase(&self) -> TrackerPhase {
        match (self.points.is_empty(), self.left_start) {
            (true, _) => TrackerPhase::Idle,
            (false, false) => TrackerPhase::Tracing,
            (false, true) => TrackerPhase::Looping,
        }
    }
}

pub struct TrajectoryTracker {
    config: TrackerConfig,
    state: PatternState,
    oracle: Box<dyn CircleOracle>,
    revolutions: u32,
}

impl TrajectoryTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_oracle(config, Box::new(FitCircleOracle::default()))
    }

    pub fn with_oracle(config: TrackerConfig, oracle: Box<dyn CircleOracle>) -> Self {
        Self {
            config,
            state: PatternState::default(),
            oracle,
            revolutions: 0,
        }
    }

    pub fn state(&self) -> &PatternState {
        &self.state
    }

    pub fn phase(&self) -> TrackerPhase {
        self.state.phase()
    }

    pub fn revolutions(&self) -> u32 {
        self.revolutions
    }

    /// No hand in view: drop the path and restart the revolution count.
    pub fn hand_lost(&mut self) {
        self.state.reset();
        self.revolutions = 0;
    }

    /// Feed this frame's gated fingertip (`None` when the pointing gate failed).
    pub fn update(&mut self, point: Option<PixelPoint>, timestamp: f64) -> Option<RevolutionEvent> {
        let Some(point) = point else {
            self.state.reset();
            return None;
        };

        let Some(last) = self.state.last else {
            self.state.points.push(point);
            self.state.last = Some(point);
            return None;
        };

        let jerk = self.config.jerk_threshold_px;
        if (point.x - last.x).abs() > jerk || (point.y - last.y).abs() > jerk {
            debug!(
                "fingertip jumped from ({}, {}) to ({}, {}), restarting path",
                last.x, last.y, point.x, point.y
            );
            self.state.reset();
            return None;
        }

        if point == last {
            return None;
        }

        let origin = self.state.points[0];
        self.state.signed_area += cross_about(origin, last, point);
        self.state.points.push(point);
        self.state.last = Some(point);

        let dist0 = point.distance(&origin);
        if dist0 > self.config.exit_radius_px {
            self.state.left_start = true;
            return None;
        }

        if !self.state.left_start || self.state.points.len() < self.config.min_points {
            return None;
        }

        if let Some(at) = self.state.last_revolution_at {
            if timestamp - at < self.config.revolution_cooldown_secs {
                return None;
            }
        }

        let found = match self.oracle.contains_circle(&self.state.points) {
            Ok(found) => found,
            Err(e) => {
                debug!("circle check failed: {}", e);
                false
            }
        };
        if !found {
            return None;
        }

        let direction = RotationDirection::from_signed_area(self.state.signed_area);
        self.revolutions += 1;
        self.state.last_revolution_at = Some(timestamp);
        self.state.reset();

        Some(RevolutionEvent {
            direction,
            count: self.revolutions,
        })
    }
}

/// `(a - o) × (b - o)`; summed over a path this is the shoelace sum of the
/// polygon closed back to `o`.
fn cross_about(o: PixelPoint, a: PixelPoint, b: PixelPoint) -> i64 {
    let (ax, ay) = ((a.x - o.x) as i64, (a.y - o.y) as i64);
    let (bx, by) = ((b.x - o.x) as i64, (b.y - o.y) as i64);
    ax * by - bx * ay
}
