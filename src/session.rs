// src/session.rs - Per-user pipeline: classifier, vote engine and trajectory tracker
use crate::classifier::{classify, pointing_gate, GestureLabel};
use crate::config::GestureConfig;
use crate::landmarks::{Frame, HandLandmark};
use crate::oracle::{CircleOracle, FitCircleOracle};
use crate::trajectory::{RevolutionEvent, TrackerPhase, TrajectoryTracker};
use crate::voting::{ConfirmedEvent, VotingEngine};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

const METRICS_WINDOW: usize = 30;

#[derive(Debug, Clone)]
pub struct PerformanceMetrics {
    pub avg_fps: f32,
    pub avg_processing_time: f32,
    frame_times: VecDeque<f32>,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            avg_fps: 0.0,
            avg_processing_time: 0.0,
            frame_times: VecDeque::with_capacity(METRICS_WINDOW),
        }
    }

    fn record(&mut self, elapsed: f32) {
        self.frame_times.push_front(elapsed);
        if self.frame_times.len() > METRICS_WINDOW {
            self.frame_times.pop_back();
        }
        self.avg_processing_time =
            self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
        self.avg_fps = if self.avg_processing_time > 0.0 {
            1.0 / self.avg_processing_time
        } else {
            0.0
        };
    }
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// What one frame produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutput {
    pub raw: Option<GestureLabel>,
    pub confirmed: Option<ConfirmedEvent>,
    pub revolution: Option<RevolutionEvent>,
}

impl FrameOutput {
    pub fn is_empty(&self) -> bool {
        self.confirmed.is_none() && self.revolution.is_none()
    }
}

/// One independent recognition session. All state lives here and is only
/// touched through `&mut self`, one frame at a time.
pub struct GestureSession {
    id: Uuid,
    config: GestureConfig,
    engine: VotingEngine,
    tracker: TrajectoryTracker,
    metrics: PerformanceMetrics,
    frame_counter: u64,
    hand_present: bool,
}

impl GestureSession {
    pub fn new(config: GestureConfig) -> Self {
        let oracle = Box::new(FitCircleOracle::new(config.oracle.clone()));
        Self::with_oracle(config, oracle)
    }

    pub fn with_oracle(config: GestureConfig, oracle: Box<dyn CircleOracle>) -> Self {
        let id = Uuid::new_v4();
        info!("gesture session {} started", id);
        Self {
            id,
            engine: VotingEngine::new(config.voting.clone()),
            tracker: TrajectoryTracker::with_oracle(config.tracker.clone(), oracle),
            config,
            metrics: PerformanceMetrics::new(),
            frame_counter: 0,
            hand_present: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    pub fn tracker_phase(&self) -> TrackerPhase {
        self.tracker.phase()
    }

    pub fn engine(&self) -> &VotingEngine {
        &self.engine
    }

    /// Clears both the vote window and the traced path.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.tracker.hand_lost();
        self.hand_present = false;
    }

    pub fn process_frame(&mut self, frame: &Frame) -> FrameOutput {
        self.frame_counter += 1;
        let hand = frame.hand.as_ref();

        match (self.hand_present, hand.is_some()) {
            (true, false) => {
                debug!("hand lost at frame {}", self.frame_counter);
                self.tracker.hand_lost();
            }
            (false, true) => debug!("hand found at frame {}", self.frame_counter),
            _ => {}
        }
        self.hand_present = hand.is_some();

        let raw = classify(hand, &self.config.classifier);
        let confirmed = self.engine.vote(raw, frame.timestamp);

        let fingertip = hand
            .filter(|h| pointing_gate(h))
            .map(|h| h.to_pixel(HandLandmark::IndexTip, frame.width, frame.height));
        let revolution = self.tracker.update(fingertip, frame.timestamp);

        if let Some(event) = &revolution {
            info!(
                "revolution {} detected ({})",
                event.count,
                event.direction.as_str()
            );
        }

        FrameOutput {
            raw: hand.map(|_| raw),
            confirmed,
            revolution,
        }
    }

    pub fn process_frame_with_metrics(
        &mut self,
        frame: &Frame,
    ) -> (FrameOutput, PerformanceMetrics) {
        let start = Instant::now();
        let output = self.process_frame(frame);
        self.metrics.record(start.elapsed().as_secs_f32());
        (output, self.metrics.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::fixtures;
    use crate::landmarks::HandObservation;
    use crate::oracle::paths::arc;
    use crate::trajectory::RotationDirection;
    use nalgebra::Vector3;

    const W: u32 = 640;
    const H: u32 = 480;

    fn frame(i: usize, hand: Option<HandObservation>) -> Frame {
        Frame {
            timestamp: i as f64 / 30.0,
            width: W,
            height: H,
            hand,
        }
    }

    /// The pointing fixture translated so its index tip lands on `(px, py)`.
    fn pointing_at(px: i32, py: i32) -> HandObservation {
        let mut hand = fixtures::pointing();
        let tip = *hand.get(HandLandmark::IndexTip);
        let target = Vector3::new(px as f64 / W as f64, py as f64 / H as f64, 0.0);
        for landmark in hand.landmarks.iter_mut() {
            *landmark += target - tip;
        }
        hand
    }

    #[test]
    fn held_pose_confirms_once() {
        let mut session = GestureSession::new(GestureConfig::default());
        let outputs: Vec<FrameOutput> = (0..24)
            .map(|i| session.process_frame(&frame(i, Some(fixtures::thumbs_up()))))
            .collect();
        let confirmed: Vec<_> = outputs.iter().filter_map(|o| o.confirmed).collect();
        assert_eq!(confirmed.len(), 1);
        assert!(outputs.iter().all(|o| o.raw == Some(GestureLabel::Up)));
        assert!(outputs[7].confirmed.is_some());
    }

    #[test]
    fn empty_frames_produce_nothing() {
        let mut session = GestureSession::new(GestureConfig::default());
        for i in 0..50 {
            let out = session.process_frame(&frame(i, None));
            assert!(out.is_empty());
            assert_eq!(out.raw, None);
        }
        assert_eq!(session.tracker_phase(), TrackerPhase::Idle);
    }

    #[test]
    fn pointing_circle_emits_revolution() {
        let mut session = GestureSession::new(GestureConfig::default());
        let mut path = arc(320.0, 240.0, 80.0, 60, 1.0);
        path.push(path[0]);

        let revolutions: Vec<RevolutionEvent> = path
            .iter()
            .enumerate()
            .filter_map(|(i, p)| {
                session
                    .process_frame(&frame(i, Some(pointing_at(p.x, p.y))))
                    .revolution
            })
            .collect();

        assert_eq!(revolutions.len(), 1);
        assert_eq!(revolutions[0].direction, RotationDirection::Clockwise);
    }

    #[test]
    fn non_pointing_pose_clears_path() {
        let mut session = GestureSession::new(GestureConfig::default());
        for i in 0..10 {
            session.process_frame(&frame(i, Some(pointing_at(300 + i as i32 * 5, 200))));
        }
        assert_ne!(session.tracker_phase(), TrackerPhase::Idle);
        session.process_frame(&frame(10, Some(fixtures::fist())));
        assert_eq!(session.tracker_phase(), TrackerPhase::Idle);
    }

    #[test]
    fn metrics_track_processing_time() {
        let mut session = GestureSession::new(GestureConfig::default());
        let (_, metrics) = session.process_frame_with_metrics(&frame(0, None));
        assert!(metrics.avg_processing_time >= 0.0);
        assert_eq!(session.frame_count(), 1);
    }

    #[test]
    fn metrics_window_is_bounded() {
        let mut metrics = PerformanceMetrics::new();
        for _ in 0..METRICS_WINDOW {
            metrics.record(0.5);
        }
        assert_eq!(metrics.avg_fps, 2.0);
        for _ in 0..METRICS_WINDOW {
            metrics.record(0.25);
        }
        assert_eq!(metrics.frame_times.len(), METRICS_WINDOW);
        assert_eq!(metrics.avg_processing_time, 0.25);
        assert_eq!(metrics.avg_fps, 4.0);
    }

    #[test]
    fn reset_drops_partial_path_and_votes() {
        let mut session = GestureSession::new(GestureConfig::default());
        for i in 0..5 {
            session.process_frame(&frame(i, Some(pointing_at(300 + i as i32 * 5, 200))));
        }
        for i in 5..10 {
            session.process_frame(&frame(i, Some(fixtures::fist())));
        }
        assert!(!session.engine().window().history().is_empty());

        session.reset();
        assert_eq!(session.tracker_phase(), TrackerPhase::Idle);
        assert!(session.engine().window().history().is_empty());

        // the five fist frames before the reset no longer count toward K
        for i in 10..17 {
            assert!(session.process_frame(&frame(i, Some(fixtures::fist()))).confirmed.is_none());
        }
        assert!(session.process_frame(&frame(17, Some(fixtures::fist()))).confirmed.is_some());
    }

    #[test]
    fn sessions_are_independent() {
        let mut a = GestureSession::new(GestureConfig::default());
        let mut b = GestureSession::new(GestureConfig::default());
        for i in 0..7 {
            a.process_frame(&frame(i, Some(fixtures::fist())));
        }
        assert!(b.process_frame(&frame(0, Some(fixtures::fist()))).confirmed.is_none());
        assert!(a.process_frame(&frame(7, Some(fixtures::fist()))).confirmed.is_some());
        assert_ne!(a.id(), b.id());
    }
}
