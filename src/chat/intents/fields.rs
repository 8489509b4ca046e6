//! Field-phrase mapping for natural-language profile updates.
//!
//! Parses "set/update/change <field-phrase> to <value>" fragments (and the
//! `<field>: <value>` shorthand) against three phrase lookup tables. The
//! first table containing a matching phrase wins per fragment, so one line
//! can fan out across the account, freelancer-profile, and client-profile
//! entities. No business validation happens here; ranges and formats are
//! the backend's concern.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::ProfileEntity;

/// One table row: spoken phrase, canonical field name, numeric coercion.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub phrase: &'static str,
    pub field: &'static str,
    pub numeric: bool,
}

const fn text(phrase: &'static str, field: &'static str) -> FieldSpec {
    FieldSpec {
        phrase,
        field,
        numeric: false,
    }
}

const fn numeric(phrase: &'static str, field: &'static str) -> FieldSpec {
    FieldSpec {
        phrase,
        field,
        numeric: true,
    }
}

/// Account fields; checked first.
pub const ACCOUNT_FIELDS: &[FieldSpec] = &[
    text("display name", "display_name"),
    text("full name", "full_name"),
    text("email", "email"),
    text("phone", "phone"),
    text("country", "country"),
    text("city", "city"),
    text("language", "language"),
    text("timezone", "timezone"),
];

/// Freelancer-profile fields; checked second. Longer phrases come first so
/// "hourly rate" wins over the bare "rate" fallback.
pub const FREELANCER_FIELDS: &[FieldSpec] = &[
    numeric("hourly rate", "hourly_rate"),
    numeric("rate", "hourly_rate"),
    numeric("years of experience", "experience_years"),
    numeric("experience", "experience_years"),
    text("skills", "skills"),
    text("headline", "headline"),
    text("bio", "bio"),
    text("about", "bio"),
    text("availability", "availability"),
    text("portfolio", "portfolio_url"),
    text("specialty", "specialty"),
];

/// Client-profile fields; checked last.
pub const CLIENT_FIELDS: &[FieldSpec] = &[
    text("company name", "company_name"),
    text("company", "company_name"),
    text("website", "website"),
    text("industry", "industry"),
    text("budget", "typical_budget"),
];

/// A resolved field assignment, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub entity: ProfileEntity,
    pub field_name: String,
    pub raw_value: String,
    pub coerced: Value,
}

pub struct FieldMapper;

impl FieldMapper {
    /// Extracts every field assignment found in the line. Fragments that
    /// name no known field phrase are ignored; duplicates of the same
    /// entity/field pair keep the first occurrence.
    pub fn map_line(input: &str) -> Vec<FieldUpdate> {
        let mut updates: Vec<FieldUpdate> = Vec::new();
        for fragment in split_fragments(input) {
            if let Some((phrase, value)) = split_assignment(&fragment) {
                if let Some(update) = lookup(&phrase, &value) {
                    let duplicate = updates.iter().any(|existing| {
                        existing.entity == update.entity
                            && existing.field_name == update.field_name
                    });
                    if !duplicate {
                        updates.push(update);
                    }
                }
            }
        }
        updates
    }
}

fn split_fragments(input: &str) -> Vec<String> {
    input
        .split([',', ';'])
        .flat_map(|chunk| chunk.split(" and "))
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits a fragment into (lowercased field phrase, raw value). ASCII
/// lowercasing preserves byte offsets, so value slices come from the
/// original fragment with casing intact.
fn split_assignment(fragment: &str) -> Option<(String, String)> {
    let lower = fragment.to_ascii_lowercase();
    for verb in ["set ", "update ", "change "] {
        if let Some(start) = lower.find(verb) {
            let after = start + verb.len();
            if let Some(to_pos) = lower[after..].find(" to ") {
                let phrase = lower[after..after + to_pos].trim().to_string();
                let value = strip_quotes(fragment[after + to_pos + 4..].trim());
                if !phrase.is_empty() && !value.is_empty() {
                    return Some((phrase, value));
                }
            }
        }
    }
    if let Some(pos) = fragment.find(':') {
        let phrase = lower[..pos].trim().to_string();
        let value = strip_quotes(fragment[pos + 1..].trim());
        if !phrase.is_empty() && !value.is_empty() {
            return Some((phrase, value));
        }
    }
    None
}

fn lookup(phrase: &str, raw_value: &str) -> Option<FieldUpdate> {
    let tables: [(ProfileEntity, &[FieldSpec]); 3] = [
        (ProfileEntity::Account, ACCOUNT_FIELDS),
        (ProfileEntity::FreelancerProfile, FREELANCER_FIELDS),
        (ProfileEntity::ClientProfile, CLIENT_FIELDS),
    ];
    for (entity, table) in tables {
        for spec in table {
            if phrase.contains(spec.phrase) {
                return Some(FieldUpdate {
                    entity,
                    field_name: spec.field.to_string(),
                    raw_value: raw_value.to_string(),
                    coerced: coerce(raw_value, spec.numeric),
                });
            }
        }
    }
    None
}

fn coerce(raw: &str, numeric: bool) -> Value {
    if numeric {
        let cleaned = raw.trim_matches(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'));
        if let Ok(integer) = cleaned.parse::<i64>() {
            return Value::from(integer);
        }
        if let Ok(float) = cleaned.parse::<f64>() {
            if let Some(number) = serde_json::Number::from_f64(float) {
                return Value::Number(number);
            }
        }
    }
    Value::String(raw.to_string())
}

fn strip_quotes(value: &str) -> String {
    value
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string()
}
