//! A set of saved templates the actuator picks from.

use cadence_contracts::{
    error::{CadenceError, CadenceResult},
    records::{MessageTemplate, TemplateType},
};

use crate::render::validate;

#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: Vec<MessageTemplate>,
}

impl TemplateLibrary {
    /// Build a library, rejecting any template with placeholder problems.
    pub fn new(templates: Vec<MessageTemplate>) -> CadenceResult<Self> {
        for template in &templates {
            if let Some(issue) = validate(&template.content).first() {
                return Err(CadenceError::TemplateError {
                    reason: format!("template '{}': {}", template.id, issue),
                });
            }
        }
        Ok(Self { templates })
    }

    pub fn get(&self, id: &str) -> Option<&MessageTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// The template to use for an action: `id` when given and active, else the
    /// first active template of `template_type`.
    pub fn select(&self, id: Option<&str>, template_type: TemplateType) -> Option<&MessageTemplate> {
        id.and_then(|id| self.get(id))
            .filter(|t| t.is_active && t.template_type == template_type)
            .or_else(|| {
                self.templates
                    .iter()
                    .find(|t| t.is_active && t.template_type == template_type)
            })
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
