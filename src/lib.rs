// src/lib.rs - Hand gesture and circular motion recognition over landmark streams
pub mod classifier;
pub mod config;
pub mod data;
pub mod detector;
pub mod dispatch;
pub mod landmarks;
pub mod oracle;
pub mod session;
pub mod trajectory;
pub mod voting;

pub use classifier::{classify, pointing_gate, ClassifierThresholds, GestureLabel};
pub use config::{ConfigError, GestureConfig};
pub use data::{EventExporter, EventRecord};
pub use detector::{DetectorError, HandDetector, ReplayDetector};
pub use dispatch::{
    Command, CommandSink, DispatchConfig, DispatchError, Dispatcher, LoggingSink, RevolutionTarget,
};
pub use landmarks::{Frame, HandLandmark, HandObservation, Handedness, PixelPoint};
pub use oracle::{CircleOracle, FitCircleOracle, OracleConfig};
pub use session::{FrameOutput, GestureSession, PerformanceMetrics};
pub use trajectory::{RevolutionEvent, RotationDirection, TrackerConfig, TrajectoryTracker};
pub use voting::{ConfirmedEvent, VoteConfig, VotingEngine};
