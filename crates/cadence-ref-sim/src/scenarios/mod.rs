//! End-to-end scenarios for the Cadence engine.
//!
//! Each scenario wires the real engine, limiter, sampler and activity chain
//! to the in-memory store and scripted actuator, drives it through one
//! situation, prints a walkthrough and fails if the engine misbehaves.

pub mod auth_rejected;
pub mod business_hours;
pub mod daily_quota;
pub mod pause_resume;
