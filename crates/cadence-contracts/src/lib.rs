//! # cadence-contracts
//!
//! Shared types, configuration documents, and error contracts for the Cadence
//! outreach engine.
//!
//! Every crate in the workspace imports from here. No scheduling logic lives
//! in this crate, only data definitions, their validation, and error types.

pub mod action;
pub mod activity;
pub mod config;
pub mod error;
pub mod profile;
pub mod records;
pub mod state;

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use action::{ActionErrorKind, ActionKind, ActionOutcome, PendingAction};
    use config::{RateLimitConfig, StealthConfig};
    use error::CadenceError;
    use records::{CandidateQuery, EngineSnapshot};
    use state::{AutomationState, AutomationStatus};

    // ── RateLimitConfig ──────────────────────────────────────────────────────

    #[test]
    fn rate_limit_defaults_are_valid() {
        let cfg = RateLimitConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.daily_connection_limit, 50);
        assert_eq!(cfg.daily_message_limit, 100);
        assert_eq!(cfg.business_hours_len(), 9);
    }

    #[test]
    fn rate_limit_rejects_inverted_delay_range() {
        let cfg = RateLimitConfig {
            min_action_delay_ms: 20_000,
            max_action_delay_ms: 10_000,
            ..RateLimitConfig::default()
        };
        match cfg.validate() {
            Err(CadenceError::ConfigError { reason }) => assert!(reason.contains("min_action_delay_ms")),
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn rate_limit_rejects_empty_business_window() {
        let cfg = RateLimitConfig {
            business_hours_start: 18,
            business_hours_end: 9,
            ..RateLimitConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rate_limit_rejects_zero_limits() {
        let cfg = RateLimitConfig {
            daily_message_limit: 0,
            ..RateLimitConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rate_limit_partial_toml_falls_back_to_defaults() {
        let cfg: RateLimitConfig = serde_json::from_str(r#"{ "daily_connection_limit": 7 }"#).unwrap();
        assert_eq!(cfg.daily_connection_limit, 7);
        assert_eq!(cfg.daily_message_limit, 100);
        assert_eq!(cfg.limit_for(ActionKind::Connect), 7);
        assert_eq!(cfg.limit_for(ActionKind::FollowUp), 100);
    }

    // ── StealthConfig ────────────────────────────────────────────────────────

    #[test]
    fn stealth_rejects_probability_out_of_range() {
        let cfg = StealthConfig {
            typo_probability: 1.5,
            ..StealthConfig::default()
        };
        match cfg.validate() {
            Err(CadenceError::ConfigError { reason }) => assert!(reason.contains("typo_probability")),
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn stealth_lunch_break_requires_both_ends() {
        let cfg = StealthConfig {
            lunch_break_start: Some(12),
            ..StealthConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn stealth_lunch_break_only_with_break_patterns() {
        let mut cfg = StealthConfig {
            lunch_break_start: Some(12),
            lunch_break_end: Some(13),
            ..StealthConfig::default()
        };
        assert_eq!(cfg.lunch_break(), Some((12, 13)));
        cfg.include_break_patterns = false;
        assert_eq!(cfg.lunch_break(), None);
    }

    #[test]
    fn snapshot_rejects_lunch_covering_business_hours() {
        let snapshot = EngineSnapshot {
            stealth: StealthConfig {
                lunch_break_start: Some(8),
                lunch_break_end: Some(19),
                ..StealthConfig::default()
            },
            ..EngineSnapshot::default()
        };
        assert!(snapshot.validate().is_err());
    }

    // ── Actions and outcomes ─────────────────────────────────────────────────

    #[test]
    fn error_kind_classification() {
        assert!(ActionErrorKind::TargetUnavailable.is_transient());
        assert!(ActionErrorKind::RateLimitedByPlatform.is_transient());
        assert!(ActionErrorKind::StoreUnavailable.is_transient());
        assert!(ActionErrorKind::Timeout.is_transient());
        assert!(ActionErrorKind::Unclassified.is_transient());
        assert!(!ActionErrorKind::AuthenticationRejected.is_transient());
        assert!(ActionErrorKind::AuthenticationRejected.is_fatal());
        assert!(!ActionErrorKind::Cancelled.is_fatal());
    }

    #[test]
    fn cadence_error_maps_to_action_error_kind() {
        let err = CadenceError::AuthenticationRejected { reason: "bad password".to_string() };
        assert_eq!(err.kind(), ActionErrorKind::AuthenticationRejected);

        let err = CadenceError::Timeout { operation: "dispatch".to_string(), after_ms: 500 };
        assert_eq!(err.kind(), ActionErrorKind::Timeout);

        let err = CadenceError::Actuator { reason: "selector vanished".to_string() };
        assert_eq!(err.kind(), ActionErrorKind::Unclassified);
    }

    #[test]
    fn pending_action_ids_are_unique() {
        let a = PendingAction::new(ActionKind::Connect, "https://linkedin.example/in/a", None);
        let b = PendingAction::new(ActionKind::Connect, "https://linkedin.example/in/a", None);
        assert_ne!(a.id, b.id);
        assert_eq!(a.attempt, 0);
    }

    #[test]
    fn outcome_constructors() {
        let now = Utc::now();
        let ok = ActionOutcome::succeeded(now);
        assert!(ok.success);
        assert!(ok.error_kind.is_none());

        let failed = ActionOutcome::failed(ActionErrorKind::TargetUnavailable, "profile hidden", now);
        assert!(!failed.success);
        assert_eq!(failed.error_kind, Some(ActionErrorKind::TargetUnavailable));
        assert_eq!(failed.error_message.as_deref(), Some("profile hidden"));
    }

    #[test]
    fn candidate_query_excludes_kinds() {
        let mut query = CandidateQuery::default();
        assert!(query.allows(ActionKind::Connect));
        query.exclude_kinds.insert(ActionKind::Connect);
        assert!(!query.allows(ActionKind::Connect));
        assert!(query.allows(ActionKind::FollowUp));
    }

    // ── AutomationState ──────────────────────────────────────────────────────

    #[test]
    fn automation_state_defaults_to_idle() {
        let state = AutomationState::default();
        assert_eq!(state.status, AutomationStatus::Idle);
        assert_eq!(state.connections_today, 0);
        assert!(state.error_message.is_none());
    }

    #[test]
    fn automation_status_serializes_snake_case() {
        let json = serde_json::to_string(&AutomationStatus::Running).unwrap();
        assert_eq!(json, "\"running\"");
    }

    // ── CadenceError display messages ────────────────────────────────────────

    #[test]
    fn error_invalid_transition_display() {
        let err = CadenceError::InvalidTransition {
            from: "idle".to_string(),
            command: "pause".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("cannot pause"));
        assert!(msg.contains("idle"));
    }

    #[test]
    fn error_timeout_display() {
        let err = CadenceError::Timeout {
            operation: "store.load_config".to_string(),
            after_ms: 10_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("store.load_config"));
        assert!(msg.contains("10000ms"));
    }

    #[test]
    fn error_configuration_missing_display() {
        let msg = CadenceError::ConfigurationMissing.to_string();
        assert!(msg.contains("credentials"));
    }
}
