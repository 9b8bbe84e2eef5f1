//! Daily quota limiter with an optional burst bucket.
//!
//! Two layers gate every dispatch:
//!
//! 1. **Daily caps** (always on): one counter per action kind, reset at the
//!    UTC day boundary. `try_consume` only checks; `commit` increments after a
//!    successful dispatch.
//! 2. **Burst bucket** (with `enable_token_bucket`): a classic token bucket per
//!    kind that refills at `daily_limit / business_hours_len` tokens per hour
//!    so a day's quota is spread across the business window instead of being
//!    spent in the first hour.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use cadence_contracts::{
    action::ActionKind,
    config::{RateLimitConfig, StealthConfig},
};

#[derive(Debug, Clone)]
struct BurstBucket {
    tokens: f64,
    last_refill: DateTime<Utc>,
}

/// Per-kind daily counters plus burst buckets.
///
/// Owned by the engine actor; not shared.
#[derive(Debug, Clone)]
pub struct TokenBucketLimiter {
    day: Option<NaiveDate>,
    connections: u32,
    messages: u32,
    burst_capacity: u32,
    buckets: HashMap<ActionKind, BurstBucket>,
}

impl TokenBucketLimiter {
    pub fn new(burst_capacity: u32) -> Self {
        Self {
            day: None,
            connections: 0,
            messages: 0,
            burst_capacity: burst_capacity.max(1),
            buckets: HashMap::new(),
        }
    }

    /// Seed the counters from a persisted state so a restart resumes mid-day.
    ///
    /// The counters belong to the UTC day of `last_action_at`; the next
    /// `roll_over` discards them if that day has passed.
    pub fn restore(&mut self, connections: u32, messages: u32, last_action_at: Option<DateTime<Utc>>) {
        self.connections = connections;
        self.messages = messages;
        self.day = last_action_at.map(|t| t.date_naive());
    }

    /// Reset both counters if `now` falls on a later UTC day than the last
    /// recorded one. Returns `true` when a reset happened.
    pub fn roll_over(&mut self, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();
        match self.day {
            Some(day) if today > day => {
                info!(
                    previous_day = %day,
                    connections = self.connections,
                    messages = self.messages,
                    "day boundary crossed; resetting quota counters"
                );
                self.connections = 0;
                self.messages = 0;
                self.day = Some(today);
                true
            }
            Some(_) => false,
            None => {
                self.day = Some(today);
                false
            }
        }
    }

    /// Actions of `kind` committed today.
    pub fn count(&self, kind: ActionKind) -> u32 {
        match kind {
            ActionKind::Connect => self.connections,
            ActionKind::FollowUp => self.messages,
        }
    }

    /// Whether the daily cap admits one more action of `kind`. Does not
    /// increment.
    pub fn try_consume(&self, kind: ActionKind, limits: &RateLimitConfig) -> bool {
        self.count(kind) < limits.limit_for(kind)
    }

    /// Actions of `kind` still allowed today. Never negative, even when the
    /// limit was lowered below today's count.
    pub fn remaining(&self, kind: ActionKind, limits: &RateLimitConfig) -> u32 {
        limits.limit_for(kind).saturating_sub(self.count(kind))
    }

    /// Kinds whose daily cap is spent.
    pub fn exhausted_kinds(&self, limits: &RateLimitConfig) -> HashSet<ActionKind> {
        ActionKind::ALL
            .into_iter()
            .filter(|kind| !self.try_consume(*kind, limits))
            .collect()
    }

    /// Record one successful dispatch of `kind` at `now`.
    ///
    /// The success counts against the UTC day of `now`, not the day the
    /// quota check ran on: a dispatch admitted before midnight that lands
    /// after it opens the new day's counters. Returns `true` when that
    /// rolled the day over.
    pub fn commit(&mut self, kind: ActionKind, now: DateTime<Utc>) -> bool {
        let rolled = self.roll_over(now);
        match kind {
            ActionKind::Connect => self.connections = self.connections.saturating_add(1),
            ActionKind::FollowUp => self.messages = self.messages.saturating_add(1),
        }
        if let Some(bucket) = self.buckets.get_mut(&kind) {
            bucket.tokens = (bucket.tokens - 1.0).max(0.0);
        }
        debug!(kind = %kind, count = self.count(kind), "quota committed");
        rolled
    }

    /// How long until the burst bucket for `kind` holds a token.
    ///
    /// `None` means a token is available now (or the burst bucket is off).
    pub fn burst_wait(
        &mut self,
        kind: ActionKind,
        now: DateTime<Utc>,
        limits: &RateLimitConfig,
        stealth: &StealthConfig,
    ) -> Option<std::time::Duration> {
        if !stealth.enable_token_bucket {
            return None;
        }

        let capacity = f64::from(self.burst_capacity);
        let rate_per_sec = refill_rate_per_sec(kind, limits);
        let bucket = self.buckets.entry(kind).or_insert(BurstBucket {
            tokens: capacity,
            last_refill: now,
        });

        let elapsed = (now - bucket.last_refill).num_milliseconds().max(0) as f64 / 1000.0;
        bucket.tokens = (bucket.tokens + elapsed * rate_per_sec).min(capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 || rate_per_sec <= 0.0 {
            return None;
        }
        let secs = (1.0 - bucket.tokens) / rate_per_sec;
        Some(std::time::Duration::from_millis((secs * 1000.0).ceil() as u64))
    }
}

fn refill_rate_per_sec(kind: ActionKind, limits: &RateLimitConfig) -> f64 {
    let hours = limits.business_hours_len().max(1);
    f64::from(limits.limit_for(kind)) / f64::from(hours) / 3600.0
}
