//! Declarative field rules for form payloads.
//!
//! Each submission kind owns a static table of [`FieldRule`]s. [`normalize`]
//! walks the table once per request: it drops unknown fields, coerces and
//! trims values, applies lowercase/default/enumeration rules and reports
//! every missing required field in one message.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::core::{SiteError, SiteResult};

use super::FormType;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldShape {
    Text,
    List,
}

#[derive(Clone, Copy, Debug)]
pub struct FieldRule {
    pub name: &'static str,
    pub shape: FieldShape,
    pub required: bool,
    pub lowercase: bool,
    pub default: &'static str,
    pub one_of: &'static [&'static str],
}

impl FieldRule {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            shape: FieldShape::Text,
            required: false,
            lowercase: false,
            default: "",
            one_of: &[],
        }
    }

    pub const fn list(name: &'static str) -> Self {
        Self {
            shape: FieldShape::List,
            ..Self::text(name)
        }
    }

    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    pub const fn lowercase(self) -> Self {
        Self {
            lowercase: true,
            ..self
        }
    }

    pub const fn default_to(self, default: &'static str) -> Self {
        Self { default, ..self }
    }

    pub const fn one_of(self, one_of: &'static [&'static str]) -> Self {
        Self { one_of, ..self }
    }
}

pub const CONTACT_RULES: &[FieldRule] = &[
    FieldRule::text("name").required(),
    FieldRule::text("email").required().lowercase(),
    FieldRule::text("company"),
    FieldRule::text("phone"),
    FieldRule::text("service"),
    FieldRule::text("subject").default_to("No Subject"),
    FieldRule::text("message").required(),
];

pub const PRICING_RULES: &[FieldRule] = &[
    FieldRule::text("name").required(),
    FieldRule::text("email").required().lowercase(),
    FieldRule::text("company"),
    FieldRule::text("phone"),
    FieldRule::text("service"),
    FieldRule::text("subject").default_to("Pricing Request"),
    FieldRule::text("message").required(),
    FieldRule::text("jobTitle"),
    FieldRule::text("industry"),
    FieldRule::text("employees"),
    FieldRule::list("services"),
    FieldRule::text("challenges"),
    FieldRule::text("timeline"),
    FieldRule::text("budget"),
    FieldRule::text("additionalInfo"),
    FieldRule::text("infrastructureType"),
    FieldRule::text("currentCloud"),
    FieldRule::text("projectType"),
    FieldRule::text("formType")
        .default_to("general")
        .one_of(FormType::NAMES),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

/// Payload after the rule table has been applied. Holds exactly one value
/// per rule, so lookups for a field the table names never miss.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NormalizedFields {
    values: BTreeMap<&'static str, FieldValue>,
}

impl NormalizedFields {
    pub fn text(&self, name: &str) -> String {
        match self.values.get(name) {
            Some(FieldValue::Text(value)) => value.clone(),
            Some(FieldValue::List(values)) => values.join(", "),
            None => String::new(),
        }
    }

    pub fn list(&self, name: &str) -> Vec<String> {
        match self.values.get(name) {
            Some(FieldValue::List(values)) => values.clone(),
            Some(FieldValue::Text(value)) if !value.is_empty() => vec![value.clone()],
            _ => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Applies `rules` to a raw JSON payload.
pub fn normalize(rules: &[FieldRule], payload: &Map<String, Value>) -> SiteResult<NormalizedFields> {
    let mut fields = NormalizedFields::default();
    let mut missing = Vec::new();

    for rule in rules {
        let raw = payload.get(rule.name);
        let value = match rule.shape {
            FieldShape::Text => {
                let text = coerce_text(rule.name, raw)?;
                let text = match text {
                    Some(t) if rule.lowercase => Some(t.to_lowercase()),
                    other => other,
                };

                match text {
                    Some(t) => {
                        if !rule.one_of.is_empty() && !rule.one_of.contains(&t.as_str()) {
                            return Err(SiteError::Validation(format!(
                                "Invalid {}: expected one of {}",
                                rule.name,
                                rule.one_of.join(", ")
                            )));
                        }
                        FieldValue::Text(t)
                    }
                    None => {
                        if rule.required {
                            missing.push(rule.name);
                        }
                        FieldValue::Text(rule.default.to_string())
                    }
                }
            }
            FieldShape::List => {
                let items = coerce_list(rule.name, raw)?;
                if items.is_empty() && rule.required {
                    missing.push(rule.name);
                }
                FieldValue::List(items)
            }
        };
        fields.values.insert(rule.name, value);
    }

    if !missing.is_empty() {
        return Err(SiteError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    Ok(fields)
}

fn coerce_text(name: &str, raw: Option<&Value>) -> SiteResult<Option<String>> {
    let text = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(_) => return Err(SiteError::Validation(format!("{name} must be text"))),
    };
    Ok(if text.is_empty() { None } else { Some(text) })
}

fn coerce_list(name: &str, raw: Option<&Value>) -> SiteResult<Vec<String>> {
    match raw {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if let Some(text) = coerce_text(name, Some(item))? {
                    out.push(text);
                }
            }
            Ok(out)
        }
        single => Ok(coerce_text(name, single)?.into_iter().collect()),
    }
}
