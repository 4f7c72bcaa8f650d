//! Template validation.
//!
//! A candidate page's [`FieldMapping`] is compared against the template
//! page's mapping in two steps: key-set equality first, then per-field rules
//! from the static table in [`rules`]. Field checks short-circuit on the
//! first failure. A failed validation is a verdict, never an error; one
//! page's failure does not disturb sibling pages.

mod rules;

pub use rules::{rule_for, FieldRule, Rule, DATE_FORMATS, DATE_HORIZON_YEARS, FIELD_RULES};

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::fields::FieldMapping;
use crate::processor::{page_label, DocumentFields};

/// Outcome of validating one candidate mapping against a template mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    /// Whether the candidate passed.
    pub passed: bool,
    /// Diagnostics, in the order they were produced. Empty on pass.
    pub diagnostics: Vec<String>,
}

impl Verdict {
    /// A passing verdict.
    pub fn pass() -> Self {
        Self {
            passed: true,
            diagnostics: Vec::new(),
        }
    }

    /// A failing verdict with diagnostics.
    pub fn fail(diagnostics: Vec<String>) -> Self {
        Self {
            passed: false,
            diagnostics,
        }
    }
}

/// Validate a candidate mapping against a template mapping.
///
/// Date rules are anchored to the current local date.
pub fn validate(template: &FieldMapping, candidate: &FieldMapping) -> Verdict {
    validate_with_today(template, candidate, Local::now().date_naive())
}

/// Validate with an explicit evaluation date for the forward horizon of
/// date rules.
pub fn validate_with_today(
    template: &FieldMapping,
    candidate: &FieldMapping,
    today: NaiveDate,
) -> Verdict {
    // Step 1: key sets must match exactly. No field checks run otherwise.
    let missing: Vec<&str> = template
        .keys()
        .filter(|k| !candidate.contains_key(k))
        .collect();
    let extra: Vec<&str> = candidate
        .keys()
        .filter(|k| !template.contains_key(k))
        .collect();
    if !missing.is_empty() || !extra.is_empty() {
        let mut diagnostics = Vec::new();
        if !missing.is_empty() {
            diagnostics.push(format!("missing keys: {}", missing.join(", ")));
        }
        if !extra.is_empty() {
            diagnostics.push(format!("extra keys: {}", extra.join(", ")));
        }
        return Verdict::fail(diagnostics);
    }

    // Step 2: per-field rules, template key order, first failure wins.
    for key in template.keys() {
        let Some(field_rule) = rule_for(key) else {
            continue;
        };
        let value = candidate.get(key).unwrap_or("");
        if !field_rule.rule.check(value, today) {
            return Verdict::fail(vec![format!("field {}: {}", key, field_rule.message)]);
        }
    }

    Verdict::pass()
}

/// Verdict for one page of a document comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageVerdict {
    /// Page label, e.g. `Page_1`.
    pub label: String,
    /// The page's verdict.
    pub verdict: Verdict,
}

/// Validate a candidate document against a template document, page by page.
///
/// The template's page set drives the comparison; a template page with no
/// candidate counterpart is validated against an empty mapping. One page's
/// failure never aborts the remaining pages.
pub fn validate_pages(template: &DocumentFields, candidate: &DocumentFields) -> Vec<PageVerdict> {
    validate_pages_with_today(template, candidate, Local::now().date_naive())
}

/// Page-by-page validation with an explicit evaluation date.
pub fn validate_pages_with_today(
    template: &DocumentFields,
    candidate: &DocumentFields,
    today: NaiveDate,
) -> Vec<PageVerdict> {
    let empty = FieldMapping::new();
    (1..=template.page_count())
        .map(|number| {
            let template_page = template.page(number).unwrap_or(&empty);
            let candidate_page = candidate.page(number).unwrap_or(&empty);
            PageVerdict {
                label: page_label(number - 1),
                verdict: validate_with_today(template_page, candidate_page, today),
            }
        })
        .collect()
}
