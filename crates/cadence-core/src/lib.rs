//! # cadence-core
//!
//! The scheduling runtime for Cadence.
//!
//! This crate provides:
//! - The collaborator traits (`Store`, `Actuator`, `ActivityRecorder`, `Clock`)
//! - The pure lifecycle transition function
//! - The [`Engine`] handle and the action loop actor behind it
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cadence_core::{Engine, EngineDeps};
//!
//! let engine = Engine::spawn(deps, EngineSettings::default());
//! engine.start().await?;
//! let snapshot = engine.get_state();
//! ```

pub mod engine;
pub mod lifecycle;
pub mod traits;

pub use engine::{Engine, EngineDeps};
pub use traits::{ActivityRecorder, Actuator, Clock, Store, SystemClock};
