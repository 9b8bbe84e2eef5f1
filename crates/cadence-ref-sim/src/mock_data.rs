//! Simulated prospect data for the Cadence reference runtime.
//!
//! All people, companies and profile URLs in this module are fictional. The
//! data stands in for the search results and connection records a real
//! deployment would scrape and persist.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use cadence_contracts::records::{MessageTemplate, SearchCriteria, TemplateType};
use cadence_templates::TemplateVars;

// ── Prospects ─────────────────────────────────────────────────────────────────

/// A profile found by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prospect {
    pub profile_url: String,
    pub first_name: String,
    pub last_name: String,
    pub job_title: String,
    pub company: String,
    pub location: String,
    pub headline: String,
}

impl Prospect {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Placeholder values for rendering a template addressed to this person.
    pub fn template_vars(&self) -> TemplateVars {
        TemplateVars {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            job_title: self.job_title.clone(),
            company: self.company.clone(),
            location: self.location.clone(),
        }
    }

    /// True if `criteria` selects this profile.
    ///
    /// Each non-empty list must have at least one case-insensitive substring
    /// match; keywords are searched across title, company and headline.
    pub fn matches(&self, criteria: &SearchCriteria) -> bool {
        let hit = |needles: &[String], haystacks: &[&str]| {
            needles.is_empty()
                || needles.iter().any(|needle| {
                    let needle = needle.to_lowercase();
                    haystacks.iter().any(|h| h.to_lowercase().contains(&needle))
                })
        };
        hit(&criteria.job_titles, &[&self.job_title])
            && hit(&criteria.companies, &[&self.company])
            && hit(&criteria.locations, &[&self.location])
            && hit(&criteria.keywords, &[&self.job_title, &self.company, &self.headline])
    }
}

fn prospect(slug: &str, first: &str, last: &str, title: &str, company: &str, location: &str, headline: &str) -> Prospect {
    Prospect {
        profile_url: format!("https://www.linkedin.com/in/{slug}"),
        first_name: first.to_string(),
        last_name: last.to_string(),
        job_title: title.to_string(),
        company: company.to_string(),
        location: location.to_string(),
        headline: headline.to_string(),
    }
}

/// Search results, in the order a search would return them.
pub fn prospects() -> Vec<Prospect> {
    vec![
        prospect(
            "ines-moraes-sim",
            "Ines",
            "Moraes",
            "Engineering Manager",
            "Harborlight Analytics",
            "Lisbon, Portugal",
            "Building data platforms that stay boring",
        ),
        prospect(
            "tobias-renner-sim",
            "Tobias",
            "Renner",
            "Staff Engineer",
            "Kettle & Forge",
            "Berlin, Germany",
            "Distributed systems, Rust, coffee",
        ),
        prospect(
            "amara-okafor-sim",
            "Amara",
            "Okafor",
            "Head of Platform",
            "Northwind Freight",
            "Lisbon, Portugal",
            "Platform teams and developer experience",
        ),
        prospect(
            "lena-vogt-sim",
            "Lena",
            "Vogt",
            "Engineering Manager",
            "Quietwave",
            "Berlin, Germany",
            "Hiring backend engineers in Berlin",
        ),
        prospect(
            "rafael-serrano-sim",
            "Rafael",
            "Serrano",
            "Staff Engineer",
            "Bluepine Health",
            "Porto, Portugal",
            "Observability and incident response",
        ),
        prospect(
            "mei-tanaka-sim",
            "Mei",
            "Tanaka",
            "Product Designer",
            "Quietwave",
            "Berlin, Germany",
            "Design systems",
        ),
        prospect(
            "owen-price-sim",
            "Owen",
            "Price",
            "Recruiter",
            "Talentbridge",
            "London, United Kingdom",
            "Connecting engineers with platform roles",
        ),
    ]
}

// ── Search criteria ───────────────────────────────────────────────────────────

/// Saved searches: two active, one switched off.
pub fn search_criteria() -> Vec<SearchCriteria> {
    vec![
        SearchCriteria {
            id: "crit-eng-leads".to_string(),
            name: "Engineering leads in Lisbon and Berlin".to_string(),
            job_titles: vec!["engineering manager".to_string(), "head of platform".to_string()],
            locations: vec!["lisbon".to_string(), "berlin".to_string()],
            is_active: true,
            ..SearchCriteria::default()
        },
        SearchCriteria {
            id: "crit-staff".to_string(),
            name: "Staff engineers".to_string(),
            job_titles: vec!["staff engineer".to_string()],
            is_active: true,
            ..SearchCriteria::default()
        },
        SearchCriteria {
            id: "crit-recruiters".to_string(),
            name: "Recruiters".to_string(),
            job_titles: vec!["recruiter".to_string()],
            is_active: false,
            ..SearchCriteria::default()
        },
    ]
}

// ── Templates ─────────────────────────────────────────────────────────────────

pub fn templates() -> Vec<MessageTemplate> {
    let template = |id: &str, name: &str, template_type, content: &str| MessageTemplate {
        id: id.to_string(),
        name: name.to_string(),
        template_type,
        content: content.to_string(),
        is_active: true,
    };
    vec![
        template(
            "tpl-connect-peer",
            "Peer intro",
            TemplateType::Connection,
            "Hi {{firstName}}, I noticed your work as {{jobTitle}} at {{company}}. \
             I'm building platform tooling and would love to connect.",
        ),
        template(
            "tpl-connect-local",
            "Local intro",
            TemplateType::Connection,
            "Hi {{firstName}}! Always good to meet other engineering folks in {{location}}. Let's connect.",
        ),
        template(
            "tpl-follow-up",
            "Thanks for connecting",
            TemplateType::FollowUp,
            "Thanks for accepting, {{firstName}}. If {{company}} is ever looking at deploy \
             pipelines I'd be happy to compare notes.",
        ),
    ]
}

// ── Existing connections ──────────────────────────────────────────────────────

/// Connections accepted before the run starts and still owed a follow-up.
///
/// Returns `(connection_id, prospect, accepted_at)`.
pub fn accepted_connections() -> Vec<(String, Prospect, DateTime<Utc>)> {
    let accepted_at = Utc.with_ymd_and_hms(2026, 10, 12, 14, 5, 0).single().unwrap_or_default();
    vec![
        (
            "conn-sim-001".to_string(),
            prospect(
                "joana-pires-sim",
                "Joana",
                "Pires",
                "Engineering Manager",
                "Saltmarsh Labs",
                "Lisbon, Portugal",
                "Teams that ship weekly",
            ),
            accepted_at,
        ),
        (
            "conn-sim-002".to_string(),
            prospect(
                "daniel-kraus-sim",
                "Daniel",
                "Kraus",
                "Staff Engineer",
                "Lindqvist Robotics",
                "Berlin, Germany",
                "Embedded Rust",
            ),
            accepted_at,
        ),
    ]
}
