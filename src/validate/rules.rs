//! Field validation rules.
//!
//! The recognized field semantics form a closed, explicit enumeration mapped
//! to field names in a static table, so the rule set can be checked
//! exhaustively and tested in isolation from field names. Fields without an
//! entry in the table are accepted unconditionally.

use chrono::{Months, NaiveDate};

/// Date formats accepted by date-bearing fields, tried in order; the first
/// successful parse wins.
pub const DATE_FORMATS: &[&str] = &["%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y", "%d %m %Y"];

/// How far into the future a date may lie, in years.
pub const DATE_HORIZON_YEARS: u32 = 10;

/// A field validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// The trimmed value must not consist purely of digits.
    NotPurelyNumeric,
    /// The value must consist purely of digits.
    DigitsOnly,
    /// The value must consist purely of digits and have at least this many.
    DigitsMinLen(usize),
    /// The trimmed value must be non-empty and at least `min_len` long.
    NonEmptyText {
        /// Minimum trimmed length in characters.
        min_len: usize,
    },
    /// The value must parse under one of `formats` and lie no further than
    /// `years` years past the evaluation date.
    DateWithinYears {
        /// Formats tried in order.
        formats: &'static [&'static str],
        /// Forward horizon in years.
        years: u32,
    },
}

impl Rule {
    /// Evaluate the rule against a candidate value. `today` anchors the
    /// forward horizon of date rules.
    pub fn check(&self, value: &str, today: NaiveDate) -> bool {
        match *self {
            Rule::NotPurelyNumeric => !is_purely_numeric(value.trim()),
            Rule::DigitsOnly => is_purely_numeric(value),
            Rule::DigitsMinLen(min) => is_purely_numeric(value) && value.chars().count() >= min,
            Rule::NonEmptyText { min_len } => {
                let trimmed = value.trim();
                !trimmed.is_empty() && trimmed.chars().count() >= min_len
            }
            Rule::DateWithinYears { formats, years } => match parse_date(value, formats) {
                Some(date) => date <= horizon(today, years),
                None => false,
            },
        }
    }
}

/// A rule bound to a field name, with its diagnostic message.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    /// Field label the rule applies to.
    pub field: &'static str,
    /// The rule.
    pub rule: Rule,
    /// Diagnostic message on failure.
    pub message: &'static str,
}

const DATE_RULE: Rule = Rule::DateWithinYears {
    formats: DATE_FORMATS,
    years: DATE_HORIZON_YEARS,
};

/// Static rule table. Fields absent from this table bypass validation.
pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        field: "PN",
        rule: Rule::NotPurelyNumeric,
        message: "PN must be text, not digits only",
    },
    FieldRule {
        field: "SN",
        rule: Rule::DigitsMinLen(6),
        message: "SN must contain 6 or more digits",
    },
    FieldRule {
        field: "DESCRIPTION",
        rule: Rule::NonEmptyText { min_len: 1 },
        message: "DESCRIPTION must not be empty",
    },
    FieldRule {
        field: "LOCATION",
        rule: Rule::DigitsOnly,
        message: "LOCATION must contain digits only",
    },
    FieldRule {
        field: "CONDITION",
        rule: Rule::NonEmptyText { min_len: 2 },
        message: "CONDITION must contain at least 2 characters",
    },
    FieldRule {
        field: "RECEIVER#",
        rule: Rule::DigitsOnly,
        message: "RECEIVER# must contain digits only",
    },
    FieldRule {
        field: "UOM",
        rule: Rule::NonEmptyText { min_len: 2 },
        message: "UOM must contain at least 2 characters",
    },
    FieldRule {
        field: "EXP DATE",
        rule: DATE_RULE,
        message: "EXP DATE has an invalid format or lies more than 10 years ahead",
    },
    FieldRule {
        field: "PO",
        rule: Rule::NonEmptyText { min_len: 4 },
        message: "PO must contain at least 4 characters",
    },
    FieldRule {
        field: "CERT SOURCE",
        rule: Rule::NonEmptyText { min_len: 1 },
        message: "CERT SOURCE must not be empty",
    },
    FieldRule {
        field: "REC.DATE",
        rule: DATE_RULE,
        message: "REC.DATE has an invalid format or lies more than 10 years ahead",
    },
    FieldRule {
        field: "MFG",
        rule: Rule::NonEmptyText { min_len: 1 },
        message: "MFG must not be empty",
    },
    FieldRule {
        field: "BATCH#",
        rule: Rule::DigitsOnly,
        message: "BATCH# must contain digits only",
    },
    FieldRule {
        field: "DOM",
        rule: DATE_RULE,
        message: "DOM has an invalid format or lies more than 10 years ahead",
    },
    FieldRule {
        field: "LOT#",
        rule: Rule::DigitsOnly,
        message: "LOT# must contain digits only",
    },
    FieldRule {
        field: "Qty",
        rule: Rule::DigitsOnly,
        message: "Qty must contain digits only",
    },
    FieldRule {
        field: "NOTES",
        rule: Rule::NonEmptyText { min_len: 1 },
        message: "NOTES must not be empty",
    },
];

/// Look up the rule registered for a field, if any.
pub fn rule_for(field: &str) -> Option<&'static FieldRule> {
    FIELD_RULES.iter().find(|r| r.field == field)
}

/// Non-empty and ASCII digits only.
fn is_purely_numeric(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// Try each format in order; first successful parse wins.
pub(crate) fn parse_date(value: &str, formats: &[&str]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

fn horizon(today: NaiveDate, years: u32) -> NaiveDate {
    today
        .checked_add_months(Months::new(years * 12))
        .unwrap_or(NaiveDate::MAX)
}
