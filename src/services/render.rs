//! Placeholder handling for email templates.
//!
//! Templates use literal `{{name}}` markers. The set of markers is derived
//! from the subject and body on every save, and each keeps a per-template
//! default used when the send context omits it.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use crate::entities::email_templates;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("placeholder pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    pub name: String,
    #[serde(default)]
    pub default_value: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredPlaceholder {
    Full(Placeholder),
    NameOnly(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rendered {
    pub subject: String,
    pub html: String,
}

/// Sorted, de-duplicated placeholder names found in subject and body.
#[must_use]
pub fn extract_placeholder_names(subject: &str, html: &str) -> Vec<String> {
    let names: BTreeSet<String> = [subject, html]
        .into_iter()
        .flat_map(|text| PLACEHOLDER.captures_iter(text))
        .map(|caps| caps[1].to_string())
        .collect();

    names.into_iter().collect()
}

/// Recomputes the placeholder list for new content. Names no longer used are
/// dropped, new names get an empty default, surviving names keep theirs.
#[must_use]
pub fn sync_placeholders(subject: &str, html: &str, existing: &[Placeholder]) -> Vec<Placeholder> {
    let defaults: HashMap<&str, &str> = existing
        .iter()
        .map(|p| (p.name.as_str(), p.default_value.as_str()))
        .collect();

    extract_placeholder_names(subject, html)
        .into_iter()
        .map(|name| {
            let default_value = defaults.get(name.as_str()).copied().unwrap_or("").to_string();
            Placeholder {
                name,
                default_value,
            }
        })
        .collect()
}

/// Reads the stored JSON column. Bare strings are accepted as names with an
/// empty default; anything unreadable yields an empty list.
#[must_use]
pub fn parse_placeholders(stored: &str) -> Vec<Placeholder> {
    serde_json::from_str::<Vec<StoredPlaceholder>>(stored)
        .map(|entries| {
            entries
                .into_iter()
                .map(|entry| match entry {
                    StoredPlaceholder::Full(p) => p,
                    StoredPlaceholder::NameOnly(name) => Placeholder {
                        name,
                        default_value: String::new(),
                    },
                })
                .collect()
        })
        .unwrap_or_default()
}

#[must_use]
pub fn placeholders_to_json(placeholders: &[Placeholder]) -> String {
    serde_json::to_string(placeholders).unwrap_or_else(|_| "[]".to_string())
}

/// Substitutes placeholders in subject and body. Context values win over
/// defaults; markers with neither are left untouched.
#[must_use]
pub fn render(
    subject: &str,
    html: &str,
    placeholders: &[Placeholder],
    context: &Map<String, Value>,
) -> Rendered {
    let mut values: HashMap<String, String> = placeholders
        .iter()
        .map(|p| (p.name.clone(), p.default_value.clone()))
        .collect();

    for (key, value) in context {
        values.insert(key.clone(), value_to_text(value));
    }

    let fill = |text: &str| {
        PLACEHOLDER
            .replace_all(text, |caps: &Captures<'_>| {
                values
                    .get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    };

    Rendered {
        subject: fill(subject),
        html: fill(html),
    }
}

#[must_use]
pub fn render_template(template: &email_templates::Model, context: &Map<String, Value>) -> Rendered {
    render(
        &template.subject,
        &template.html_content,
        &parse_placeholders(&template.placeholders),
        context,
    )
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
