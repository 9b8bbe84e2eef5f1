//! Rate-limit and stealth configuration documents.
//!
//! Both documents are owned by the store and read as immutable snapshots at
//! every scheduling decision. Defaults match the values the dashboard seeds
//! when no document has been saved yet.

use serde::{Deserialize, Serialize};

use crate::error::{CadenceError, CadenceResult};

/// Daily caps, per-action delay range, and the business-hours window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub daily_connection_limit: u32,
    pub daily_message_limit: u32,
    pub min_action_delay_ms: u64,
    pub max_action_delay_ms: u64,
    /// First business hour, inclusive (0–23).
    pub business_hours_start: u8,
    /// Last business hour, exclusive (1–24).
    pub business_hours_end: u8,
    pub skip_weekends: bool,
    /// Offset of the business-hours local time from UTC, in minutes.
    pub utc_offset_minutes: i32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            daily_connection_limit: 50,
            daily_message_limit: 100,
            min_action_delay_ms: 5_000,
            max_action_delay_ms: 15_000,
            business_hours_start: 9,
            business_hours_end: 18,
            skip_weekends: true,
            utc_offset_minutes: 0,
        }
    }
}

impl RateLimitConfig {
    /// Check the document's invariants.
    pub fn validate(&self) -> CadenceResult<()> {
        if self.daily_connection_limit == 0 || self.daily_message_limit == 0 {
            return Err(config_error("daily limits must be positive"));
        }
        if self.min_action_delay_ms > self.max_action_delay_ms {
            return Err(config_error(format!(
                "min_action_delay_ms ({}) exceeds max_action_delay_ms ({})",
                self.min_action_delay_ms, self.max_action_delay_ms
            )));
        }
        if self.business_hours_start > 23 || self.business_hours_end > 24 {
            return Err(config_error("business hours must fall within 0..=24"));
        }
        if self.business_hours_start >= self.business_hours_end {
            return Err(config_error(format!(
                "business_hours_start ({}) must be before business_hours_end ({})",
                self.business_hours_start, self.business_hours_end
            )));
        }
        if self.utc_offset_minutes.abs() > 14 * 60 {
            return Err(config_error("utc_offset_minutes must be within ±14 hours"));
        }
        Ok(())
    }

    /// Daily cap for the given action kind.
    pub fn limit_for(&self, kind: crate::action::ActionKind) -> u32 {
        match kind {
            crate::action::ActionKind::Connect => self.daily_connection_limit,
            crate::action::ActionKind::FollowUp => self.daily_message_limit,
        }
    }

    /// Length of the business-hours window in hours.
    pub fn business_hours_len(&self) -> u32 {
        u32::from(self.business_hours_end.saturating_sub(self.business_hours_start))
    }
}

/// Randomization and scheduling toggles that make the pacing look human.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StealthConfig {
    pub bezier_enabled: bool,
    pub bezier_overshoot_probability: f64,

    pub typing_min_delay_ms: u64,
    pub typing_max_delay_ms: u64,
    pub typo_probability: f64,

    pub rotate_user_agent: bool,
    pub randomize_viewport: bool,
    pub disable_webdriver_flag: bool,

    pub scroll_min_speed: u32,
    pub scroll_max_speed: u32,
    pub scroll_back_probability: f64,

    pub hover_before_click: bool,
    pub random_cursor_movement: bool,

    pub respect_business_hours: bool,
    pub include_break_patterns: bool,
    /// Local hour the lunch break starts, honoured with `include_break_patterns`.
    pub lunch_break_start: Option<u8>,
    /// Local hour the lunch break ends (exclusive).
    pub lunch_break_end: Option<u8>,

    pub enable_token_bucket: bool,
    pub cooldown_after_bulk: bool,

    pub randomize_headers: bool,
    pub simulate_network_latency: bool,
}

impl Default for StealthConfig {
    fn default() -> Self {
        Self {
            bezier_enabled: true,
            bezier_overshoot_probability: 0.15,
            typing_min_delay_ms: 50,
            typing_max_delay_ms: 150,
            typo_probability: 0.05,
            rotate_user_agent: true,
            randomize_viewport: true,
            disable_webdriver_flag: true,
            scroll_min_speed: 50,
            scroll_max_speed: 300,
            scroll_back_probability: 0.1,
            hover_before_click: true,
            random_cursor_movement: true,
            respect_business_hours: true,
            include_break_patterns: true,
            lunch_break_start: None,
            lunch_break_end: None,
            enable_token_bucket: true,
            cooldown_after_bulk: true,
            randomize_headers: true,
            simulate_network_latency: true,
        }
    }
}

impl StealthConfig {
    /// Check the document's invariants.
    pub fn validate(&self) -> CadenceResult<()> {
        for (name, p) in [
            ("bezier_overshoot_probability", self.bezier_overshoot_probability),
            ("typo_probability", self.typo_probability),
            ("scroll_back_probability", self.scroll_back_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(config_error(format!("{name} must be within [0, 1], got {p}")));
            }
        }
        if self.typing_min_delay_ms > self.typing_max_delay_ms {
            return Err(config_error("typing_min_delay_ms exceeds typing_max_delay_ms"));
        }
        if self.scroll_min_speed > self.scroll_max_speed {
            return Err(config_error("scroll_min_speed exceeds scroll_max_speed"));
        }
        match (self.lunch_break_start, self.lunch_break_end) {
            (None, None) => {}
            (Some(start), Some(end)) if start < end && end <= 24 => {}
            _ => {
                return Err(config_error(
                    "lunch_break_start and lunch_break_end must both be set with start < end <= 24",
                ))
            }
        }
        Ok(())
    }

    /// The lunch break window, when break patterns are enabled and one is set.
    pub fn lunch_break(&self) -> Option<(u8, u8)> {
        if !self.include_break_patterns {
            return None;
        }
        self.lunch_break_start.zip(self.lunch_break_end)
    }

    /// True when any of the fine-grained randomness features is switched on.
    pub fn randomness_enabled(&self) -> bool {
        self.bezier_enabled || self.typo_probability > 0.0 || self.scroll_back_probability > 0.0
    }
}

fn config_error(reason: impl Into<String>) -> CadenceError {
    CadenceError::ConfigError { reason: reason.into() }
}
