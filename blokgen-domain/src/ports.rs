use anyhow::bail;
use blokgen_types::FieldDescriptor;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Late-bound type resolution for `custom` fields.
///
/// Resolved once when a run starts and consulted for every custom field. The returned
/// map (property name -> JSON-schema fragment) is merged into the component's properties;
/// `None` drops the field from the generated type.
pub trait CustomFieldTypeParser {
    fn parse(&self, field_name: &str, field: &FieldDescriptor) -> Option<Map<String, Value>>;
}

impl<F> CustomFieldTypeParser for F
where
    F: Fn(&str, &FieldDescriptor) -> Option<Map<String, Value>>,
{
    fn parse(&self, field_name: &str, field: &FieldDescriptor) -> Option<Map<String, Value>> {
        self(field_name, field)
    }
}

/// Plugin id (`field_type`) -> schema fragment.
///
/// The key `"*"` is used for custom fields whose plugin has no entry of its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTypeTable {
    fragments: IndexMap<String, Value>,
}

pub const FALLBACK_PLUGIN: &str = "*";

impl FieldTypeTable {
    pub fn new(fragments: IndexMap<String, Value>) -> Self {
        Self { fragments }
    }

    /// Build from a JSON object of `{ "<plugin id>": <schema fragment> }`.
    pub fn from_json(value: Value) -> anyhow::Result<Self> {
        let Value::Object(map) = value else {
            bail!("custom field types must be a JSON object keyed by plugin id");
        };
        let mut fragments = IndexMap::with_capacity(map.len());
        for (plugin, fragment) in map {
            if !fragment.is_object() {
                bail!("custom field type `{plugin}` must map to a JSON schema object");
            }
            fragments.insert(plugin, fragment);
        }
        Ok(Self { fragments })
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

impl CustomFieldTypeParser for FieldTypeTable {
    fn parse(&self, field_name: &str, field: &FieldDescriptor) -> Option<Map<String, Value>> {
        let fragment = field
            .field_type
            .as_deref()
            .and_then(|plugin| self.fragments.get(plugin))
            .or_else(|| self.fragments.get(FALLBACK_PLUGIN))?;
        let mut out = Map::new();
        out.insert(field_name.to_string(), fragment.clone());
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blokgen_types::FieldKind;
    use serde_json::json;

    fn custom(plugin: &str) -> FieldDescriptor {
        let mut field = FieldDescriptor::new(FieldKind::Custom);
        field.field_type = Some(plugin.to_string());
        field
    }

    #[test]
    fn table_resolves_by_plugin_id() {
        let table = FieldTypeTable::from_json(json!({
            "native-color-picker": { "type": "object", "properties": { "color": { "type": "string" } } }
        }))
        .unwrap();

        let out = table.parse("brand", &custom("native-color-picker")).unwrap();
        assert_eq!(out["brand"]["properties"]["color"]["type"], "string");
        assert!(table.parse("brand", &custom("seo-metatags")).is_none());
    }

    #[test]
    fn fallback_entry_catches_unknown_plugins() {
        let table = FieldTypeTable::from_json(json!({ "*": { "tsType": "unknown" } })).unwrap();
        let out = table.parse("meta", &custom("seo-metatags")).unwrap();
        assert_eq!(out["meta"], json!({ "tsType": "unknown" }));
    }

    #[test]
    fn non_object_input_is_rejected() {
        assert!(FieldTypeTable::from_json(json!(["a"])).is_err());
        assert!(FieldTypeTable::from_json(json!({ "x": "string" })).is_err());
    }

    #[test]
    fn closures_are_parsers() {
        let parser = |name: &str, _: &FieldDescriptor| {
            let mut m = Map::new();
            m.insert(name.to_string(), json!({ "type": "number" }));
            Some(m)
        };
        let out = parser.parse("rating", &custom("stars")).unwrap();
        assert_eq!(out["rating"]["type"], "number");
    }
}
