use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One remote content entry (a story), kept as the raw document the API returned.
///
/// The document is never re-shaped: what was fetched is what a rollback pushes back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentEntry(pub Value);

impl ContentEntry {
    pub fn new(doc: Value) -> Self {
        Self(doc)
    }

    /// Identifier used when pushing the entry back and in error context.
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    /// Identifier or a placeholder, for logs and error messages.
    pub fn display_id(&self) -> String {
        self.id().unwrap_or_else(|| "<unknown>".to_string())
    }

    pub fn content(&self) -> Option<&Value> {
        self.0.get("content")
    }

    pub fn content_mut(&mut self) -> Option<&mut Value> {
        self.0.get_mut("content")
    }

    /// True when a blok of `component` appears anywhere inside `content`.
    pub fn contains_component(&self, component: &str) -> bool {
        self.content().is_some_and(|c| has_blok(c, component))
    }

    /// Call `f` on every blok of `component` inside `content`, depth first.
    ///
    /// Returns the number of bloks visited.
    pub fn visit_bloks_mut<F>(&mut self, component: &str, mut f: F) -> usize
    where
        F: FnMut(&mut Map<String, Value>),
    {
        match self.content_mut() {
            Some(content) => visit_bloks(content, component, &mut f),
            None => 0,
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

fn is_blok_of(map: &Map<String, Value>, component: &str) -> bool {
    map.get("component").and_then(Value::as_str) == Some(component)
}

fn has_blok(value: &Value, component: &str) -> bool {
    match value {
        Value::Object(map) => is_blok_of(map, component) || map.values().any(|v| has_blok(v, component)),
        Value::Array(items) => items.iter().any(|v| has_blok(v, component)),
        _ => false,
    }
}

fn visit_bloks<F>(value: &mut Value, component: &str, f: &mut F) -> usize
where
    F: FnMut(&mut Map<String, Value>),
{
    match value {
        Value::Object(map) => {
            let mut visited = 0;
            if is_blok_of(map, component) {
                f(map);
                visited += 1;
            }
            for child in map.values_mut() {
                visited += visit_bloks(child, component, f);
            }
            visited
        }
        Value::Array(items) => items.iter_mut().map(|v| visit_bloks(v, component, f)).sum(),
        _ => 0,
    }
}

/// The component + field pair a migration batch operates on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MigrationTarget {
    pub component: String,
    pub field: String,
}

impl MigrationTarget {
    pub fn new(component: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            field: field.into(),
        }
    }

    pub fn rollback_file_name(&self) -> String {
        crate::rollback::rollback_file_name(&self.component, &self.field)
    }
}

impl fmt::Display for MigrationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_accepts_numbers_and_strings() {
        assert_eq!(ContentEntry::new(json!({"id": 42})).id().as_deref(), Some("42"));
        assert_eq!(ContentEntry::new(json!({"id": "abc"})).id().as_deref(), Some("abc"));
        assert_eq!(ContentEntry::new(json!({"id": ""})).id(), None);
        assert_eq!(ContentEntry::new(json!({"name": "x"})).display_id(), "<unknown>");
    }

    #[test]
    fn bloks_are_found_at_any_depth() {
        let mut entry = ContentEntry::new(json!({
            "id": 1,
            "content": {
                "component": "page",
                "body": [
                    { "component": "hero", "title": "a" },
                    { "component": "grid", "items": [{ "component": "hero", "title": "b" }] }
                ]
            }
        }));
        assert!(entry.contains_component("hero"));
        assert!(!entry.contains_component("teaser"));

        let visited = entry.visit_bloks_mut("hero", |blok| {
            blok.insert("seen".into(), json!(true));
        });
        assert_eq!(visited, 2);
        assert_eq!(entry.0["content"]["body"][1]["items"][0]["seen"], json!(true));
    }

    #[test]
    fn entries_without_content_have_no_bloks() {
        let mut entry = ContentEntry::new(json!({ "id": 1 }));
        assert!(!entry.contains_component("page"));
        assert_eq!(entry.visit_bloks_mut("page", |_| {}), 0);
    }

    #[test]
    fn target_display_and_file_name() {
        let target = MigrationTarget::new("page", "body");
        assert_eq!(target.to_string(), "page.body");
        assert_eq!(target.rollback_file_name(), "rollback_page_body.json");
    }
}
