// src/dispatch.rs - Fire-and-forget delivery of recognized gestures to device services
use crate::classifier::GestureLabel;
use crate::trajectory::{RevolutionEvent, RotationDirection};
use crate::voting::ConfirmedEvent;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value", rename_all = "snake_case")]
pub enum Command {
    Play,
    Pause,
    NextTrack,
    PreviousTrack,
    TogglePlug,
    DeviceOn,
    DeviceOff,
    ThermostatOff,
    CycleThermostatMode,
    AnnounceStatus,
    /// A `call` was seen; the next up/down/fist is a device command.
    CallObserved,
    AdjustVolume(i32),
    /// Thermostat setpoint change in whole degrees.
    AdjustTemperature(i32),
}

impl Command {
    pub fn for_gesture(event: &ConfirmedEvent) -> Option<Command> {
        let command = match (event.label, event.modified_by_call) {
            (GestureLabel::Up, true) => Command::DeviceOn,
            (GestureLabel::Down, true) => Command::DeviceOff,
            (GestureLabel::Fist, true) => Command::ThermostatOff,
            (GestureLabel::Up, false) => Command::Play,
            (GestureLabel::Down, false) => Command::Pause,
            (GestureLabel::Right, _) => Command::NextTrack,
            (GestureLabel::Left, _) => Command::PreviousTrack,
            (GestureLabel::Fist, false) => Command::TogglePlug,
            (GestureLabel::Ok, _) => Command::CycleThermostatMode,
            (GestureLabel::Two, _) => Command::AnnounceStatus,
            (GestureLabel::Call, _) => Command::CallObserved,
            (GestureLabel::None, _) => return None,
        };
        Some(command)
    }

    /// Clockwise turns raise the configured target, counter-clockwise turns lower it.
    pub fn for_revolution(event: &RevolutionEvent, config: &DispatchConfig) -> Option<Command> {
        let sign = match event.direction {
            RotationDirection::Clockwise => 1,
            RotationDirection::CounterClockwise => -1,
            RotationDirection::None => return None,
        };
        Some(match config.revolution_target {
            RevolutionTarget::Volume => Command::AdjustVolume(sign * config.volume_step),
            RevolutionTarget::Temperature => {
                Command::AdjustTemperature(sign * config.temperature_step)
            }
        })
    }
}

/// Outcome of a service call. Replaces status strings with a tagged error.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("connection to {service} failed: {reason}")]
    Connection { service: String, reason: String },
    #[error("{service} answered with status {status}: {message}")]
    Service {
        service: String,
        status: u16,
        message: String,
    },
    #[error("no handler for {0:?}")]
    Unsupported(Command),
}

/// Executes commands against external services. Runs off the frame loop,
/// so implementations may block on I/O.
pub trait CommandSink: Send + 'static {
    fn execute(&mut self, command: &Command) -> Result<(), DispatchError>;
}

/// Sink that only records commands in the log.
#[derive(Debug, Default)]
pub struct LoggingSink;

impl CommandSink for LoggingSink {
    fn execute(&mut self, command: &Command) -> Result<(), DispatchError> {
        info!("dispatch: {:?}", command);
        Ok(())
    }
}

/// What a traced circle turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevolutionTarget {
    #[default]
    Volume,
    Temperature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub queue_capacity: usize,
    pub revolution_target: RevolutionTarget,
    /// Volume percent per revolution.
    pub volume_step: i32,
    /// Degrees per revolution.
    pub temperature_step: i32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 16,
            revolution_target: RevolutionTarget::Volume,
            volume_step: 10,
            temperature_step: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub submitted: u64,
    pub executed: u64,
    pub failed: u64,
    pub dropped: u64,
}

pub struct Dispatcher {
    tx: mpsc::Sender<Command>,
    worker: JoinHandle<DispatchStats>,
    submitted: u64,
    dropped: u64,
}

impl Dispatcher {
    /// Starts the worker on tokio's blocking pool. Must be called inside a runtime.
    pub fn spawn<S: CommandSink>(mut sink: S, config: &DispatchConfig) -> Self {
        let (tx, mut rx) = mpsc::channel::<Command>(config.queue_capacity.max(1));

        let worker = tokio::task::spawn_blocking(move || {
            let mut stats = DispatchStats::default();
            while let Some(command) = rx.blocking_recv() {
                match sink.execute(&command) {
                    Ok(()) => stats.executed += 1,
                    Err(e) => {
                        warn!("command {:?} failed: {}", command, e);
                        stats.failed += 1;
                    }
                }
            }
            stats
        });

        Self {
            tx,
            worker,
            submitted: 0,
            dropped: 0,
        }
    }

    /// Queues a command without waiting. Returns false if it was dropped.
    pub fn submit(&mut self, command: Command) -> bool {
        match self.tx.try_send(command) {
            Ok(()) => {
                self.submitted += 1;
                true
            }
            Err(TrySendError::Full(command)) => {
                warn!("dispatch queue full, dropping {:?}", command);
                self.dropped += 1;
                false
            }
            Err(TrySendError::Closed(command)) => {
                warn!("dispatcher stopped, dropping {:?}", command);
                self.dropped += 1;
                false
            }
        }
    }

    /// Closes the queue, waits for queued commands to finish and returns totals.
    pub async fn shutdown(self) -> DispatchStats {
        drop(self.tx);
        let mut stats = match self.worker.await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("dispatch worker ended abnormally: {}", e);
                DispatchStats::default()
            }
        };
        stats.submitted = self.submitted;
        stats.dropped = self.dropped;
        debug!("dispatcher shut down: {:?}", stats);
        stats
    }
}
