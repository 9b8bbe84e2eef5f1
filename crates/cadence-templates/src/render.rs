//! Placeholder validation and rendering.
//!
//! Templates use `{{name}}` placeholders drawn from a fixed vocabulary:
//! `firstName`, `lastName`, `jobTitle`, `company`, `location`. Missing values
//! render as empty strings; runs of spaces left behind are collapsed and the
//! result is trimmed.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use cadence_contracts::{
    error::{CadenceError, CadenceResult},
    records::{MessageTemplate, TemplateType},
};

/// LinkedIn's limit on connection-request notes, in characters.
pub const CONNECTION_NOTE_LIMIT: usize = 300;

const ELLIPSIS: &str = "...";

/// Values substituted into a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateVars {
    pub first_name: String,
    pub last_name: String,
    pub job_title: String,
    pub company: String,
    pub location: String,
}

impl TemplateVars {
    fn lookup(&self, name: &str) -> Option<&str> {
        match name {
            "firstName" => Some(&self.first_name),
            "lastName" => Some(&self.last_name),
            "jobTitle" => Some(&self.job_title),
            "company" => Some(&self.company),
            "location" => Some(&self.location),
            _ => None,
        }
    }
}

/// A problem found by [`validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateIssue {
    /// `{{…}}` names a variable outside the vocabulary.
    UnknownVariable { placeholder: String },
    /// `{{` with no matching `}}`; `position` is a character offset.
    Unclosed { position: usize },
}

impl fmt::Display for TemplateIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateIssue::UnknownVariable { placeholder } => write!(f, "unknown variable: {placeholder}"),
            TemplateIssue::Unclosed { position } => {
                write!(f, "unclosed placeholder starting at position {position}")
            }
        }
    }
}

/// List every placeholder problem in `content`. Empty means valid.
pub fn validate(content: &str) -> Vec<TemplateIssue> {
    let vars = TemplateVars::default();
    let mut issues = Vec::new();
    let mut rest = content;
    let mut offset = 0;

    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start..].find("}}") else {
            issues.push(TemplateIssue::Unclosed {
                position: content[..offset + start].chars().count(),
            });
            break;
        };
        let placeholder = &rest[start..start + len + 2];
        if vars.lookup(&placeholder[2..placeholder.len() - 2]).is_none() {
            issues.push(TemplateIssue::UnknownVariable {
                placeholder: placeholder.to_string(),
            });
        }
        offset += start + len + 2;
        rest = &rest[start + len + 2..];
    }

    issues
}

/// Substitute `vars` into `content`.
///
/// Unknown placeholders are left untouched; call [`validate`] first to
/// reject them.
pub fn render(content: &str, vars: &TemplateVars) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        match rest[start..].find("}}") {
            Some(len) => {
                let placeholder = &rest[start..start + len + 2];
                match vars.lookup(&placeholder[2..placeholder.len() - 2]) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(placeholder),
                }
                rest = &rest[start + len + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    while out.contains("  ") {
        out = out.replace("  ", " ");
    }
    out.trim().to_string()
}

/// Cut `text` to at most `max_chars` characters, ending in `...` when cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= ELLIPSIS.len() {
        return text.chars().take(max_chars).collect();
    }
    let mut cut: String = text.chars().take(max_chars - ELLIPSIS.len()).collect();
    cut.push_str(ELLIPSIS);
    cut
}

/// Validate and render `template`, enforcing the note limit for connection
/// templates.
pub fn render_template(template: &MessageTemplate, vars: &TemplateVars) -> CadenceResult<String> {
    let issues = validate(&template.content);
    if !issues.is_empty() {
        let reasons: Vec<String> = issues.iter().map(ToString::to_string).collect();
        return Err(CadenceError::TemplateError {
            reason: format!("template '{}': {}", template.id, reasons.join("; ")),
        });
    }

    let rendered = render(&template.content, vars);
    let text = match template.template_type {
        TemplateType::Connection => truncate(&rendered, CONNECTION_NOTE_LIMIT),
        TemplateType::FollowUp => rendered,
    };
    debug!(template_id = %template.id, chars = text.chars().count(), "template rendered");
    Ok(text)
}
