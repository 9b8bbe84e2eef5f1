//! Interaction timing profiles.
//!
//! The humanization sampler produces these and the actuator replays them
//! while driving the browser. The engine never interprets them.

use serde::{Deserialize, Serialize};

/// One keystroke in a typing sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keystroke {
    /// The character typed, or `None` for a correcting backspace.
    pub key: Option<char>,
    /// Delay before this keystroke, in milliseconds.
    pub delay_ms: u64,
    /// True when this key is a deliberate typo that a later backspace fixes.
    pub is_typo: bool,
}

/// A pointer path from the current position to a click target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementProfile {
    /// Per-step durations, in milliseconds. Length equals the step count.
    pub step_durations_ms: Vec<u64>,
    /// Whether the path overshoots the target and corrects back.
    pub overshoot: bool,
    /// Hover dwell before clicking, in milliseconds.
    pub hover_ms: u64,
}

/// One scroll increment. Negative `delta_px` scrolls up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollStep {
    pub delta_px: i32,
    pub duration_ms: u64,
}

/// The full per-dispatch timing profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionProfile {
    /// Pause before the first interaction ("reading" the page).
    pub think_time_ms: u64,
    pub movement: Option<MovementProfile>,
    pub scroll: Vec<ScrollStep>,
    /// Keystrokes for the note or message body, if the action types text.
    pub typing: Vec<Keystroke>,
}
