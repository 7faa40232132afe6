//! Heuristic field extraction from application source text.
//!
//! Each [`ExtractionRule`] recognises one usage pattern of a query-builder
//! style client (`.select('a, b')`, `.eq('col', v)`, `.insert({ col: v })`).
//! Rules scan the whole text independently and their results are unioned;
//! none of them depends on the output of another.
//!
//! Type declaration files go through [`extract_type_keys`] instead, which
//! keeps every `key:` at the start of a line regardless of its shape.

use std::{collections::BTreeSet, sync::OnceLock};

use regex::Regex;

/// Operation names whose first quoted argument is a column name.
pub const PREDICATE_OPERATIONS: &[&str] =
    &["eq", "neq", "gt", "gte", "lt", "lte", "order", "not", "in"];

/// Operation names that take an object literal of column values.
pub const WRITE_OPERATIONS: &[&str] = &["insert", "update"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionRule {
    /// Multi-segment snake_case tokens inside a quoted `.select(...)` argument.
    Projection,
    /// The quoted first argument of a comparison or ordering call, verbatim.
    Predicate,
    /// snake_case keys of the object literal passed to `.insert`/`.update`.
    WritePayload,
}

impl ExtractionRule {
    pub const ALL: [ExtractionRule; 3] = [
        ExtractionRule::Projection,
        ExtractionRule::Predicate,
        ExtractionRule::WritePayload,
    ];

    /// Adds every field this rule finds in `text` to `fields`.
    pub fn apply(&self, text: &str, fields: &mut BTreeSet<String>) {
        match self {
            ExtractionRule::Projection => {
                for captures in projection_regex().captures_iter(text) {
                    let query = (1..=3)
                        .find_map(|group| captures.get(group))
                        .map_or("", |m| m.as_str());
                    fields.extend(snake_tokens(query));
                }
            }
            ExtractionRule::Predicate => {
                for captures in predicate_regex().captures_iter(text) {
                    fields.insert(captures[1].to_string());
                }
            }
            ExtractionRule::WritePayload => {
                for captures in write_payload_regex().captures_iter(text) {
                    for key in payload_key_regex().captures_iter(&captures[1]) {
                        fields.insert(key[1].to_string());
                    }
                }
            }
        }
    }
}

/// Union of every [`ExtractionRule`] applied to `text`.
pub fn extract_query_fields(text: &str) -> BTreeSet<String> {
    let mut fields = BTreeSet::new();
    for rule in ExtractionRule::ALL {
        rule.apply(text, &mut fields);
    }
    fields
}

/// Every identifier that starts a line and is directly followed by `:`.
/// camelCase and single-word keys are kept; the non-DB allow-list sorts
/// them out later.
pub fn extract_type_keys(text: &str) -> BTreeSet<String> {
    type_key_regex()
        .captures_iter(text)
        .map(|captures| captures[1].to_string())
        .collect()
}

fn snake_tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    snake_token_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
}

fn snake_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[a-z]+(?:_[a-z0-9]+)+\b").expect("snake token pattern"))
}

fn projection_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)\.select\((?:`(.*?)`|'(.*?)'|"(.*?)")\)"#).expect("projection pattern")
    })
}

fn predicate_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(
            r"\.(?:{})\('([a-z_]+)'",
            PREDICATE_OPERATIONS.join("|")
        );
        Regex::new(&pattern).expect("predicate pattern")
    })
}

fn write_payload_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(r"(?s)\.(?:{})\(\{{(.*?)\}}\)", WRITE_OPERATIONS.join("|"));
        Regex::new(&pattern).expect("write payload pattern")
    })
}

fn payload_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b([a-z]+(?:_[a-z0-9]+)+)\s*:").expect("payload key pattern"))
}

fn type_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*([A-Za-z_][A-Za-z0-9_]*)\s*:\s*").expect("type key pattern")
    })
}
