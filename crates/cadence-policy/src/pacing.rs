//! Business-hours gating.
//!
//! Business hours are evaluated in the fixed local offset configured by
//! `RateLimitConfig::utc_offset_minutes`. Quota day boundaries are always
//! UTC midnight and live in [`crate::limiter`]; the two clocks are
//! deliberately independent.
//!
//! Every window edge falls on a local top-of-hour, so the next eligible
//! instant is either `now` or the start of some later local hour. The search
//! walks forward hour by hour over a bounded horizon.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Offset, TimeZone, Timelike, Utc, Weekday};
use tracing::warn;

use cadence_contracts::config::{RateLimitConfig, StealthConfig};

/// Eight days covers any weekend skip plus a full day of lunch/hour gaps.
const SEARCH_HORIZON_HOURS: i64 = 24 * 8;

/// The configured business-hours offset. Out-of-range offsets fall back to UTC.
pub fn business_offset(rate: &RateLimitConfig) -> FixedOffset {
    FixedOffset::east_opt(rate.utc_offset_minutes * 60)
        .unwrap_or_else(|| Utc.fix())
}

/// True iff the local hour is within `[start, end)` and, when weekends are
/// skipped, the local day is Monday to Friday.
pub fn within_business_hours(now: DateTime<Utc>, rate: &RateLimitConfig) -> bool {
    let local = now.with_timezone(&business_offset(rate));
    if rate.skip_weekends && matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    let hour = local.hour();
    hour >= u32::from(rate.business_hours_start) && hour < u32::from(rate.business_hours_end)
}

/// True when the local hour falls inside the configured lunch break.
pub fn in_lunch_break(now: DateTime<Utc>, rate: &RateLimitConfig, stealth: &StealthConfig) -> bool {
    match stealth.lunch_break() {
        Some((start, end)) => {
            let hour = now.with_timezone(&business_offset(rate)).hour();
            hour >= u32::from(start) && hour < u32::from(end)
        }
        None => false,
    }
}

/// Whether an action may be dispatched at `now`.
///
/// Always true when `respect_business_hours` is off.
pub fn is_eligible(now: DateTime<Utc>, rate: &RateLimitConfig, stealth: &StealthConfig) -> bool {
    if !stealth.respect_business_hours {
        return true;
    }
    within_business_hours(now, rate) && !in_lunch_break(now, rate, stealth)
}

/// The earliest instant at or after `now` at which an action may be dispatched.
///
/// Pure: the same inputs always give the same answer.
pub fn next_eligible_time(
    now: DateTime<Utc>,
    rate: &RateLimitConfig,
    stealth: &StealthConfig,
) -> DateTime<Utc> {
    if is_eligible(now, rate, stealth) {
        return now;
    }

    let offset = business_offset(rate);
    let local = now.with_timezone(&offset).naive_local();
    let Some(hour_start) = local.date().and_hms_opt(local.hour(), 0, 0) else {
        return now;
    };

    for step in 1..=SEARCH_HORIZON_HOURS {
        let candidate_local = hour_start + Duration::hours(step);
        let Some(candidate) = offset.from_local_datetime(&candidate_local).single() else {
            continue;
        };
        let candidate = candidate.with_timezone(&Utc);
        if is_eligible(candidate, rate, stealth) {
            return candidate;
        }
    }

    warn!(
        business_hours_start = rate.business_hours_start,
        business_hours_end = rate.business_hours_end,
        "no eligible business hour within search horizon"
    );
    now + Duration::hours(SEARCH_HORIZON_HOURS)
}

/// The next UTC midnight strictly after `now`.
pub fn next_day_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .succ_opt()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(now + Duration::days(1))
}

/// Non-negative wall-clock distance from `now` to `target`.
pub fn until(now: DateTime<Utc>, target: DateTime<Utc>) -> std::time::Duration {
    (target - now).to_std().unwrap_or(std::time::Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    // 2024-03-04 is a Monday.

    #[test]
    fn weekday_inside_window_is_business_hours() {
        let rate = RateLimitConfig::default();
        assert!(within_business_hours(at(2024, 3, 4, 9, 0), &rate));
        assert!(within_business_hours(at(2024, 3, 4, 17, 59), &rate));
        assert!(!within_business_hours(at(2024, 3, 4, 18, 0), &rate));
        assert!(!within_business_hours(at(2024, 3, 4, 8, 59), &rate));
    }

    #[test]
    fn weekend_is_excluded_only_when_skipping() {
        let mut rate = RateLimitConfig::default();
        let saturday_noon = at(2024, 3, 9, 12, 0);
        assert!(!within_business_hours(saturday_noon, &rate));
        rate.skip_weekends = false;
        assert!(within_business_hours(saturday_noon, &rate));
    }

    #[test]
    fn offset_shifts_the_window() {
        let rate = RateLimitConfig {
            utc_offset_minutes: -5 * 60,
            ..RateLimitConfig::default()
        };
        // 13:00 UTC is 08:00 at UTC-5.
        assert!(!within_business_hours(at(2024, 3, 4, 13, 0), &rate));
        assert!(within_business_hours(at(2024, 3, 4, 14, 0), &rate));
    }

    #[test]
    fn next_eligible_is_now_when_inside_window() {
        let rate = RateLimitConfig::default();
        let stealth = StealthConfig::default();
        let now = at(2024, 3, 4, 10, 17);
        assert_eq!(next_eligible_time(now, &rate, &stealth), now);
    }

    #[test]
    fn next_eligible_is_now_when_hours_not_respected() {
        let rate = RateLimitConfig::default();
        let stealth = StealthConfig {
            respect_business_hours: false,
            ..StealthConfig::default()
        };
        let now = at(2024, 3, 9, 3, 0);
        assert_eq!(next_eligible_time(now, &rate, &stealth), now);
    }

    #[test]
    fn next_eligible_same_day_before_opening() {
        let rate = RateLimitConfig::default();
        let stealth = StealthConfig::default();
        let now = at(2024, 3, 4, 6, 42);
        assert_eq!(next_eligible_time(now, &rate, &stealth), at(2024, 3, 4, 9, 0));
    }

    #[test]
    fn next_eligible_rolls_to_next_day_after_closing() {
        let rate = RateLimitConfig::default();
        let stealth = StealthConfig::default();
        let now = at(2024, 3, 4, 19, 5);
        assert_eq!(next_eligible_time(now, &rate, &stealth), at(2024, 3, 5, 9, 0));
    }

    #[test]
    fn next_eligible_skips_weekend() {
        let rate = RateLimitConfig::default();
        let stealth = StealthConfig::default();
        // Friday evening → Monday morning.
        let now = at(2024, 3, 8, 18, 30);
        assert_eq!(next_eligible_time(now, &rate, &stealth), at(2024, 3, 11, 9, 0));
    }

    #[test]
    fn next_eligible_skips_lunch_break() {
        let rate = RateLimitConfig::default();
        let stealth = StealthConfig {
            lunch_break_start: Some(12),
            lunch_break_end: Some(13),
            ..StealthConfig::default()
        };
        let now = at(2024, 3, 4, 12, 10);
        assert!(!is_eligible(now, &rate, &stealth));
        assert_eq!(next_eligible_time(now, &rate, &stealth), at(2024, 3, 4, 13, 0));
    }

    #[test]
    fn next_eligible_with_half_hour_offset() {
        let rate = RateLimitConfig {
            utc_offset_minutes: 330,
            ..RateLimitConfig::default()
        };
        let stealth = StealthConfig::default();
        // 02:00 UTC is 07:30 local; opening at 09:00 local is 03:30 UTC.
        let now = at(2024, 3, 4, 2, 0);
        assert_eq!(next_eligible_time(now, &rate, &stealth), at(2024, 3, 4, 3, 30));
    }

    #[test]
    fn next_eligible_is_idempotent() {
        let rate = RateLimitConfig::default();
        let stealth = StealthConfig::default();
        for hour in 0..24 {
            let now = at(2024, 3, 9, hour, 13);
            let first = next_eligible_time(now, &rate, &stealth);
            let second = next_eligible_time(now, &rate, &stealth);
            assert_eq!(first, second);
            assert!(first >= now);
            assert!(is_eligible(first, &rate, &stealth));
        }
    }

    #[test]
    fn day_boundary_is_next_utc_midnight() {
        assert_eq!(next_day_boundary(at(2024, 3, 4, 23, 59)), at(2024, 3, 5, 0, 0));
        assert_eq!(next_day_boundary(at(2024, 3, 5, 0, 0)), at(2024, 3, 6, 0, 0));
    }

    #[test]
    fn until_never_negative() {
        let now = at(2024, 3, 4, 10, 0);
        assert_eq!(until(now, at(2024, 3, 4, 9, 0)), std::time::Duration::ZERO);
        assert_eq!(until(now, at(2024, 3, 4, 10, 1)), std::time::Duration::from_secs(60));
    }
}
