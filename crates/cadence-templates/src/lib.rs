//! # cadence-templates
//!
//! Connection-note and follow-up message templates.
//!
//! [`render_template`] validates a template's placeholders, substitutes the
//! prospect's details, and for connection notes enforces LinkedIn's
//! 300-character limit. [`TemplateLibrary`] holds the saved templates and
//! picks the one an action refers to.

pub mod library;
pub mod render;

pub use library::TemplateLibrary;
pub use render::{render, render_template, truncate, validate, TemplateIssue, TemplateVars, CONNECTION_NOTE_LIMIT};

// ── Tests ─────────────────────────────────────────────────────────────────────
