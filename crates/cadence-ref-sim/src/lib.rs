//! # cadence-ref-sim
//!
//! Reference runtime for the Cadence outreach engine.
//!
//! Runs the real engine against stand-ins for the outside world:
//!
//! - [`InMemoryStore`]: configuration documents, a work queue built from
//!   fictional search results and accepted connections, and the records the
//!   engine writes back.
//! - [`ScriptedActuator`]: renders templates and samples keystrokes like a
//!   browser driver would, then returns scripted results.
//! - [`ManualClock`]: lets scenarios jump between weekdays and hours.
//!
//! Four scenarios exercise the daily quota, authentication failures,
//! business hours, and pause/stop during a dispatch. All data is fictional.
//! Nothing here touches the network.

pub mod actuator;
pub mod clock;
pub mod error;
pub mod harness;
pub mod mock_data;
pub mod scenarios;
pub mod simulation;
pub mod store;

pub use actuator::{DispatchRecord, ScriptedActuator};
pub use clock::ManualClock;
pub use error::{ScenarioError, ScenarioResult};
pub use harness::Simulation;
pub use simulation::{run_simulation, SimulationReport};
pub use store::{InMemoryStore, StoreConfig};

/// Compressed timings used by every scenario.
pub const SCENARIO_CONFIG: &str = include_str!("../config/scenario.toml");

/// Configuration for `demo simulate` when no file is given.
pub const DEFAULT_CONFIG: &str = include_str!("../config/cadence.toml");

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use cadence_policy::settings::EngineSettings;

    use super::*;

    #[test]
    fn bundled_configs_parse() {
        for doc in [SCENARIO_CONFIG, DEFAULT_CONFIG] {
            EngineSettings::from_toml_str(doc).unwrap();
            StoreConfig::from_toml_str(doc).unwrap();
        }
        let settings = EngineSettings::from_toml_str(SCENARIO_CONFIG).unwrap();
        assert_eq!(settings.humanize.seed, Some(7));
        assert_eq!(settings.engine.max_wait_chunk_ms, 50);
    }

    #[test]
    fn active_searches_match_five_prospects() {
        let criteria = mock_data::search_criteria();
        let matched: Vec<_> = mock_data::prospects()
            .into_iter()
            .filter(|p| criteria.iter().any(|c| c.is_active && p.matches(c)))
            .map(|p| p.first_name)
            .collect();
        assert_eq!(matched, vec!["Ines", "Tobias", "Amara", "Lena", "Rafael"]);
    }

    #[test]
    fn bundled_templates_are_valid() {
        let library = cadence_templates::TemplateLibrary::new(mock_data::templates()).unwrap();
        assert_eq!(library.len(), 3);
    }
}
