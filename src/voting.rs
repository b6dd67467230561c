// src/voting.rs - Temporal debouncing of per-frame gesture labels
use crate::classifier::GestureLabel;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteConfig {
    /// Consecutive identical frames needed to confirm a gesture.
    pub confirm_frames: usize,
    /// Minimum time between two confirmations of the same label. Zero disables it.
    pub repeat_cooldown_secs: f64,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            confirm_frames: 8,
            repeat_cooldown_secs: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedEvent {
    pub label: GestureLabel,
    /// Set when a confirmed `call` immediately preceded this gesture.
    pub modified_by_call: bool,
}

#[derive(Debug, Clone, Default)]
pub struct VoteWindow {
    history: VecDeque<GestureLabel>,
    last_confirmed: Option<GestureLabel>,
    // label that just completed a run; ignored until a different frame arrives
    latched: Option<GestureLabel>,
}

impl VoteWindow {
    pub fn history(&self) -> &VecDeque<GestureLabel> {
        &self.history
    }

    pub fn last_confirmed(&self) -> Option<GestureLabel> {
        self.last_confirmed
    }

    /// The gesture still being held after it confirmed, if any.
    pub fn latched(&self) -> Option<GestureLabel> {
        self.latched
    }

    /// Length of the run of identical labels at the newest end of the history.
    pub fn run_length(&self) -> usize {
        let Some(newest) = self.history.front() else {
            return 0;
        };
        self.history.iter().take_while(|l| *l == newest).count()
    }
}

pub struct VotingEngine {
    config: VoteConfig,
    window: VoteWindow,
    // (label, timestamp) of the previous confirmation, for repeat suppression
    previous: Option<(GestureLabel, f64)>,
}

impl VotingEngine {
    pub fn new(config: VoteConfig) -> Self {
        let capacity = config.confirm_frames.max(1);
        Self {
            config,
            window: VoteWindow {
                history: VecDeque::with_capacity(capacity),
                last_confirmed: None,
                latched: None,
            },
            previous: None,
        }
    }

    pub fn window(&self) -> &VoteWindow {
        &self.window
    }

    pub fn reset(&mut self) {
        self.window.history.clear();
        self.window.last_confirmed = None;
        self.window.latched = None;
    }

    pub fn vote(&mut self, raw: GestureLabel, timestamp: f64) -> Option<ConfirmedEvent> {
        let needed = self.config.confirm_frames.max(1);

        // A held gesture must be released (any other label, `none` included)
        // before it can confirm again
        match self.window.latched {
            Some(held) if held == raw => return None,
            Some(_) => self.window.latched = None,
            None => {}
        }

        let history = &mut self.window.history;
        history.push_front(raw);
        if history.len() > needed {
            history.pop_back();
        }

        if raw.is_none() || history.len() < needed || history.iter().any(|l| *l != raw) {
            return None;
        }

        history.clear();
        self.window.latched = Some(raw);

        if let Some((label, at)) = self.previous {
            if label == raw && timestamp - at < self.config.repeat_cooldown_secs {
                debug!("{} confirmed again within cooldown, ignoring", raw);
                return None;
            }
        }
        self.previous = Some((raw, timestamp));

        let modified_by_call = match raw {
            GestureLabel::Call => {
                self.window.last_confirmed = Some(GestureLabel::Call);
                false
            }
            GestureLabel::Up | GestureLabel::Down | GestureLabel::Fist
                if self.window.last_confirmed == Some(GestureLabel::Call) =>
            {
                self.window.last_confirmed = None;
                true
            }
            _ => {
                self.window.last_confirmed = None;
                false
            }
        };

        info!("gesture confirmed: {} (after call: {})", raw, modified_by_call);
        Some(ConfirmedEvent {
            label: raw,
            modified_by_call,
        })
    }
}
