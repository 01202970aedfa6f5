//! Declarative migration scripts.
//!
//! A script is a TOML file of ordered ops, applied to every blok of the target component found
//! anywhere in an entry's content. Ops default to the target field when `field` is omitted.
//!
//! ```toml
//! [[ops]]
//! op = "rename"
//! to = "headline"
//!
//! [[ops]]
//! op = "default"
//! field = "size"
//! value = "medium"
//! ```

use anyhow::Context;
use blokgen_migrate::EntryTransform;
use blokgen_types::{ContentEntry, MigrationTarget};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use serde_json::{Map, Value};

pub const MIGRATIONS_DIR: &str = "migrations";

pub fn script_file_name(target: &MigrationTarget) -> String {
    format!("change_{}_{}.toml", target.component, target.field)
}

/// Conventional script location for `target` under `root`.
pub fn default_script_path(root: &Utf8Path, target: &MigrationTarget) -> Utf8PathBuf {
    root.join(MIGRATIONS_DIR).join(script_file_name(target))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum ScriptOp {
    Set {
        field: Option<String>,
        value: Value,
    },
    Remove {
        field: Option<String>,
    },
    Rename {
        field: Option<String>,
        to: String,
    },
    /// Only when the field is missing or null.
    Default {
        field: Option<String>,
        value: Value,
    },
    /// A scalar or object becomes a one-element array; arrays and missing fields are left alone.
    WrapInArray {
        field: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct ScriptFile {
    #[serde(default)]
    ops: Vec<ScriptOp>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MigrationScript {
    target: MigrationTarget,
    ops: Vec<ScriptOp>,
}

impl MigrationScript {
    pub fn new(target: MigrationTarget, ops: Vec<ScriptOp>) -> Self {
        Self { target, ops }
    }

    pub fn from_toml_str(target: MigrationTarget, text: &str) -> anyhow::Result<Self> {
        let file: ScriptFile = toml::from_str(text).context("parse migration script")?;
        Ok(Self::new(target, file.ops))
    }

    pub fn load(target: MigrationTarget, path: &Utf8Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("read {}", path))?;
        Self::from_toml_str(target, &text).with_context(|| format!("load {}", path))
    }

    pub fn ops(&self) -> &[ScriptOp] {
        &self.ops
    }

    fn apply_to_blok(&self, blok: &mut Map<String, Value>) {
        for op in &self.ops {
            match op {
                ScriptOp::Set { field, value } => {
                    blok.insert(self.field_name(field), value.clone());
                }
                ScriptOp::Remove { field } => {
                    blok.shift_remove(&self.field_name(field));
                }
                ScriptOp::Rename { field, to } => {
                    if let Some(value) = blok.shift_remove(&self.field_name(field)) {
                        blok.insert(to.clone(), value);
                    }
                }
                ScriptOp::Default { field, value } => {
                    let slot = blok.entry(self.field_name(field)).or_insert(Value::Null);
                    if slot.is_null() {
                        *slot = value.clone();
                    }
                }
                ScriptOp::WrapInArray { field } => {
                    if let Some(slot) = blok.get_mut(&self.field_name(field)) {
                        if !slot.is_array() && !slot.is_null() {
                            let inner = slot.take();
                            *slot = Value::Array(vec![inner]);
                        }
                    }
                }
            }
        }
    }

    fn field_name(&self, field: &Option<String>) -> String {
        field.clone().unwrap_or_else(|| self.target.field.clone())
    }
}

impl EntryTransform for MigrationScript {
    fn transform(&self, entry: &mut ContentEntry) -> anyhow::Result<()> {
        entry.visit_bloks_mut(&self.target.component, |blok| self.apply_to_blok(blok));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn entry() -> ContentEntry {
        ContentEntry::new(json!({
            "id": 1,
            "content": {
                "component": "page",
                "body": [
                    { "component": "hero", "title": "Hi", "tags": "news" },
                    { "component": "teaser", "title": "untouched" }
                ]
            }
        }))
    }

    #[test]
    fn ops_apply_in_order_to_matching_bloks_only() {
        let script = MigrationScript::from_toml_str(
            MigrationTarget::new("hero", "title"),
            r#"
[[ops]]
op = "rename"
to = "headline"

[[ops]]
op = "default"
field = "size"
value = "medium"

[[ops]]
op = "wrap_in_array"
field = "tags"

[[ops]]
op = "set"
field = "version"
value = 2
"#,
        )
        .unwrap();

        let mut entry = entry();
        script.transform(&mut entry).unwrap();
        assert_eq!(
            entry.as_value()["content"]["body"],
            json!([
                { "component": "hero", "tags": ["news"], "headline": "Hi", "size": "medium", "version": 2 },
                { "component": "teaser", "title": "untouched" }
            ])
        );
    }

    #[test]
    fn default_keeps_existing_values_and_remove_drops_fields() {
        let script = MigrationScript::new(
            MigrationTarget::new("hero", "title"),
            vec![
                ScriptOp::Default { field: None, value: json!("fallback") },
                ScriptOp::Remove { field: Some("tags".into()) },
            ],
        );
        let mut entry = entry();
        script.transform(&mut entry).unwrap();
        assert_eq!(
            entry.as_value()["content"]["body"][0],
            json!({ "component": "hero", "title": "Hi" })
        );
    }

    #[test]
    fn unknown_ops_are_rejected() {
        let err = MigrationScript::from_toml_str(
            MigrationTarget::new("hero", "title"),
            "[[ops]]\nop = \"explode\"\n",
        );
        assert!(err.is_err());
    }

    #[test]
    fn conventional_path() {
        let target = MigrationTarget::new("hero", "title");
        assert_eq!(
            default_script_path(Utf8Path::new("site"), &target),
            Utf8PathBuf::from("site/migrations/change_hero_title.toml")
        );
    }
}
