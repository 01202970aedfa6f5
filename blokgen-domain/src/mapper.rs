//! Field descriptor -> property-schema fragment.
//!
//! Rules apply in priority order; later rules overwrite the `tsType` set by earlier ones:
//! 1. `custom` fields are delegated to the configured [`CustomFieldTypeParser`] (or dropped).
//! 2. Plain kinds get a base JSON-schema type; structural and unknown kinds get nothing.
//! 3. Shared kinds reference a helper type, queued for emission the first time it is seen.
//! 4. `multilink` excludes the email / asset variants the field does not allow.
//! 5. `bloks` resolves its allowed components through the resolver tables.

use crate::naming::TypeNamer;
use crate::ports::CustomFieldTypeParser;
use crate::resolver::ResolverTables;
use crate::shared;
use blokgen_types::{FieldDescriptor, FieldKind};
use indexmap::IndexSet;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

const EMAIL_VARIANT: &str = r#"{ linktype?: "email" }"#;
const ASSET_VARIANT: &str = r#"{ linktype?: "asset" }"#;

/// Maps fields for one generation run and tracks which shared helper types it referenced.
pub struct FieldTypeMapper<'a> {
    tables: &'a ResolverTables,
    namer: &'a TypeNamer,
    custom: Option<&'a dyn CustomFieldTypeParser>,
    seen_shared: IndexSet<FieldKind>,
    pending_shared: Vec<FieldKind>,
}

impl<'a> FieldTypeMapper<'a> {
    pub fn new(
        tables: &'a ResolverTables,
        namer: &'a TypeNamer,
        custom: Option<&'a dyn CustomFieldTypeParser>,
    ) -> Self {
        Self {
            tables,
            namer,
            custom,
            seen_shared: IndexSet::new(),
            pending_shared: Vec::new(),
        }
    }

    pub fn namer(&self) -> &TypeNamer {
        self.namer
    }

    /// Property fragments for one field, `None` when the field produces no property.
    ///
    /// Callers filter tab markers before calling.
    pub fn map_field(&mut self, name: &str, field: &FieldDescriptor) -> Option<Map<String, Value>> {
        if field.kind == FieldKind::Custom {
            return match self.custom {
                Some(parser) => {
                    let fragment = parser.parse(name, field);
                    if fragment.is_none() {
                        debug!(field = name, plugin = ?field.field_type, "custom field parser returned nothing");
                    }
                    fragment
                }
                None => {
                    debug!(field = name, "no custom field parser configured; dropping field");
                    None
                }
            };
        }

        let Some(mut schema) = base_schema(field) else {
            debug!(field = name, kind = %field.kind, "field kind carries no type");
            return None;
        };

        if field.kind.is_shared() {
            let type_name = self.reference_shared(&field.kind);
            schema.insert("tsType".to_string(), Value::String(type_name));
        }

        match field.kind {
            FieldKind::Multilink => {
                let ts = self.multilink_type(field);
                schema.insert("tsType".to_string(), Value::String(ts));
            }
            FieldKind::Bloks => {
                if let Some(ts) = self.bloks_type(name, field) {
                    schema.insert("tsType".to_string(), Value::String(ts));
                }
            }
            _ => {}
        }

        if let Some(desc) = &field.description {
            schema.insert("description".to_string(), Value::String(desc.clone()));
        }

        let mut out = Map::new();
        out.insert(name.to_string(), Value::Object(schema));
        Some(out)
    }

    /// Shared kinds referenced since the last call, dependencies first.
    pub fn take_pending_shared(&mut self) -> Vec<FieldKind> {
        std::mem::take(&mut self.pending_shared)
    }

    fn reference_shared(&mut self, kind: &FieldKind) -> String {
        for dep in shared::dependencies(kind) {
            self.queue_shared(dep);
        }
        self.queue_shared(kind);
        self.namer.type_name(kind.as_str())
    }

    fn queue_shared(&mut self, kind: &FieldKind) {
        if self.seen_shared.insert(kind.clone()) {
            self.pending_shared.push(kind.clone());
        }
    }

    fn multilink_type(&self, field: &FieldDescriptor) -> String {
        let base = self.namer.type_name(FieldKind::Multilink.as_str());
        let mut excluded = Vec::new();
        if !field.email_link_type {
            excluded.push(EMAIL_VARIANT);
        }
        if !field.asset_link_type {
            excluded.push(ASSET_VARIANT);
        }
        if excluded.is_empty() {
            base
        } else {
            format!("Exclude<{base}, {}>", excluded.join(" | "))
        }
    }

    fn bloks_type(&self, name: &str, field: &FieldDescriptor) -> Option<String> {
        if !field.restrict_components {
            let all: Vec<&str> = self.tables.names.iter().map(String::as_str).collect();
            return Some(self.array_of(&all));
        }

        if field.restrict_to_groups() {
            if field.component_group_whitelist.is_empty() {
                return None;
            }
            let mut members: IndexSet<&str> = IndexSet::new();
            for group in &field.component_group_whitelist {
                match self.tables.groups.members(group) {
                    Some(found) if !found.is_empty() => {
                        members.extend(found.iter().map(String::as_str));
                    }
                    _ => warn!(field = name, group = %group, "component group resolves to no components"),
                }
            }
            let members: Vec<&str> = members.into_iter().collect();
            return Some(self.array_of(&members));
        }

        if field.component_whitelist.is_empty() {
            return None;
        }
        let mut members = Vec::with_capacity(field.component_whitelist.len());
        for component in &field.component_whitelist {
            if self.tables.names.contains(component) {
                members.push(component.as_str());
            } else {
                warn!(field = name, component = %component, "whitelisted component is not defined");
            }
        }
        Some(self.array_of(&members))
    }

    fn array_of(&self, components: &[&str]) -> String {
        match components {
            [] => "never[]".to_string(),
            [only] => format!("{}[]", self.namer.type_name(only)),
            many => {
                let names: Vec<String> = many.iter().map(|c| self.namer.type_name(c)).collect();
                format!("({})[]", names.join(" | "))
            }
        }
    }
}

fn base_schema(field: &FieldDescriptor) -> Option<Map<String, Value>> {
    let value = match &field.kind {
        FieldKind::Text | FieldKind::Textarea | FieldKind::Markdown | FieldKind::Datetime => {
            json!({ "type": "string" })
        }
        FieldKind::Number => json!({ "type": "number" }),
        FieldKind::Boolean => json!({ "type": "boolean" }),
        FieldKind::SingleOption => option_schema(field),
        FieldKind::MultiOption => json!({ "type": "array", "items": option_schema(field) }),
        FieldKind::Bloks | FieldKind::Multiasset => json!({ "type": "array" }),
        FieldKind::Asset | FieldKind::Multilink | FieldKind::Table | FieldKind::Richtext => {
            json!({ "type": "object" })
        }
        FieldKind::Custom | FieldKind::Section | FieldKind::Tab | FieldKind::Other(_) => {
            return None;
        }
    };
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn option_schema(field: &FieldDescriptor) -> Value {
    let Some(values) = field.static_option_values() else {
        return json!({ "type": "string" });
    };
    let exclude_empty = field
        .extra
        .get("exclude_empty_option")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let mut choices: Vec<Value> = Vec::with_capacity(values.len() + 1);
    if !exclude_empty && field.kind == FieldKind::SingleOption {
        choices.push(Value::String(String::new()));
    }
    choices.extend(values.into_iter().map(|v| Value::String(v.to_string())));
    json!({ "type": "string", "enum": choices })
}

#[cfg(test)]
mod tests {
    use super::*;
    use blokgen_types::{ComponentSchema, FieldOption};

    fn tables(components: &[ComponentSchema]) -> ResolverTables {
        ResolverTables::build(components)
    }

    fn map_one(
        tables: &ResolverTables,
        field: &FieldDescriptor,
    ) -> (Option<Map<String, Value>>, Vec<FieldKind>) {
        let namer = TypeNamer::default();
        let mut mapper = FieldTypeMapper::new(tables, &namer, None);
        let out = mapper.map_field("f", field);
        (out, mapper.take_pending_shared())
    }

    fn ts_type(out: &Option<Map<String, Value>>) -> Option<&str> {
        out.as_ref()?.get("f")?.get("tsType")?.as_str()
    }

    #[test]
    fn plain_text_maps_to_string() {
        let (out, pending) = map_one(&tables(&[]), &FieldDescriptor::new(FieldKind::Textarea));
        assert_eq!(out.unwrap()["f"], json!({ "type": "string" }));
        assert!(pending.is_empty());
    }

    #[test]
    fn custom_without_parser_is_dropped() {
        let (out, _) = map_one(&tables(&[]), &FieldDescriptor::new(FieldKind::Custom));
        assert!(out.is_none());
    }

    #[test]
    fn custom_with_parser_is_delegated_entirely() {
        let t = tables(&[]);
        let namer = TypeNamer::default();
        let parser = |name: &str, _: &FieldDescriptor| {
            let mut m = Map::new();
            m.insert(name.to_string(), json!({ "tsType": "Color" }));
            m.insert(format!("{name}_meta"), json!({ "type": "string" }));
            Some(m)
        };
        let mut mapper = FieldTypeMapper::new(&t, &namer, Some(&parser));
        let out = mapper.map_field("brand", &FieldDescriptor::new(FieldKind::Custom)).unwrap();
        let keys: Vec<&str> = out.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["brand", "brand_meta"]);
    }

    #[test]
    fn structural_and_unknown_kinds_produce_nothing() {
        let t = tables(&[]);
        assert!(map_one(&t, &FieldDescriptor::new(FieldKind::Section)).0.is_none());
        assert!(
            map_one(&t, &FieldDescriptor::new(FieldKind::Other("image".into())))
                .0
                .is_none()
        );
    }

    #[test]
    fn shared_kind_is_queued_once() {
        let t = tables(&[]);
        let namer = TypeNamer::default();
        let mut mapper = FieldTypeMapper::new(&t, &namer, None);
        let a = mapper.map_field("a", &FieldDescriptor::new(FieldKind::Asset)).unwrap();
        let b = mapper.map_field("b", &FieldDescriptor::new(FieldKind::Asset)).unwrap();
        assert_eq!(a["a"]["tsType"], "AssetStoryblok");
        assert_eq!(b["b"]["tsType"], "AssetStoryblok");
        assert_eq!(mapper.take_pending_shared(), vec![FieldKind::Asset]);
        assert!(mapper.take_pending_shared().is_empty());
    }

    #[test]
    fn multiasset_queues_asset_first() {
        let (out, pending) = map_one(&tables(&[]), &FieldDescriptor::new(FieldKind::Multiasset));
        assert_eq!(ts_type(&out), Some("MultiassetStoryblok"));
        assert_eq!(pending, vec![FieldKind::Asset, FieldKind::Multiasset]);
    }

    #[test]
    fn multilink_excludes_both_variants_by_default() {
        let (out, pending) = map_one(&tables(&[]), &FieldDescriptor::new(FieldKind::Multilink));
        assert_eq!(
            ts_type(&out),
            Some(r#"Exclude<MultilinkStoryblok, { linktype?: "email" } | { linktype?: "asset" }>"#)
        );
        assert_eq!(pending, vec![FieldKind::Multilink]);
    }

    #[test]
    fn multilink_with_both_variants_allowed_is_the_base_type() {
        let mut field = FieldDescriptor::new(FieldKind::Multilink);
        field.email_link_type = true;
        field.asset_link_type = true;
        let (out, _) = map_one(&tables(&[]), &field);
        assert_eq!(ts_type(&out), Some("MultilinkStoryblok"));

        field.asset_link_type = false;
        let (out, _) = map_one(&tables(&[]), &field);
        assert_eq!(
            ts_type(&out),
            Some(r#"Exclude<MultilinkStoryblok, { linktype?: "asset" }>"#)
        );
    }

    #[test]
    fn unrestricted_bloks_allow_every_component() {
        let t = tables(&[ComponentSchema::new("page"), ComponentSchema::new("hero")]);
        let (out, _) = map_one(&t, &FieldDescriptor::new(FieldKind::Bloks));
        assert_eq!(ts_type(&out), Some("(PageStoryblok | HeroStoryblok)[]"));
    }

    #[test]
    fn whitelisted_bloks_keep_whitelist_order() {
        let t = tables(&[
            ComponentSchema::new("hero"),
            ComponentSchema::new("teaser"),
            ComponentSchema::new("grid"),
        ]);
        let mut field = FieldDescriptor::new(FieldKind::Bloks);
        field.restrict_components = true;
        field.component_whitelist = vec!["grid".into(), "hero".into()];
        let (out, _) = map_one(&t, &field);
        assert_eq!(ts_type(&out), Some("(GridStoryblok | HeroStoryblok)[]"));
    }

    #[test]
    fn whitelist_entries_without_definition_contribute_nothing() {
        let t = tables(&[ComponentSchema::new("hero")]);
        let mut field = FieldDescriptor::new(FieldKind::Bloks);
        field.restrict_components = true;
        field.component_whitelist = vec!["ghost".into(), "hero".into()];
        let (out, _) = map_one(&t, &field);
        assert_eq!(ts_type(&out), Some("HeroStoryblok[]"));
    }

    #[test]
    fn group_bloks_union_all_members() {
        let t = tables(&[
            ComponentSchema::new("hero").with_group("sections"),
            ComponentSchema::new("teaser").with_group("sections"),
            ComponentSchema::new("button").with_group("atoms"),
            ComponentSchema::new("page"),
        ]);
        let mut field = FieldDescriptor::new(FieldKind::Bloks);
        field.restrict_components = true;
        field.restrict_type = Some("groups".into());
        field.component_group_whitelist = vec!["atoms".into(), "sections".into(), "atoms".into()];
        let (out, _) = map_one(&t, &field);
        assert_eq!(
            ts_type(&out),
            Some("(ButtonStoryblok | HeroStoryblok | TeaserStoryblok)[]")
        );
    }

    #[test]
    fn unknown_group_yields_empty_array_type() {
        let t = tables(&[ComponentSchema::new("page")]);
        let mut field = FieldDescriptor::new(FieldKind::Bloks);
        field.restrict_components = true;
        field.restrict_type = Some("groups".into());
        field.component_group_whitelist = vec!["does-not-exist".into()];
        let (out, _) = map_one(&t, &field);
        assert_eq!(ts_type(&out), Some("never[]"));
    }

    #[test]
    fn restricted_bloks_without_lists_stay_plain_arrays() {
        let t = tables(&[ComponentSchema::new("page")]);
        let mut field = FieldDescriptor::new(FieldKind::Bloks);
        field.restrict_components = true;
        let (out, _) = map_one(&t, &field);
        assert_eq!(out.unwrap()["f"], json!({ "type": "array" }));

        field.restrict_type = Some("groups".into());
        let (out, _) = map_one(&t, &field);
        assert_eq!(out.unwrap()["f"], json!({ "type": "array" }));
    }

    #[test]
    fn option_with_static_choices_becomes_enum() {
        let mut field = FieldDescriptor::new(FieldKind::SingleOption);
        field.options = vec![
            FieldOption { name: "Left".into(), value: "left".into() },
            FieldOption { name: "Right".into(), value: "right".into() },
        ];
        let (out, _) = map_one(&tables(&[]), &field);
        assert_eq!(
            out.unwrap()["f"],
            json!({ "type": "string", "enum": ["", "left", "right"] })
        );

        field.extra.insert("exclude_empty_option".into(), json!(true));
        let (out, _) = map_one(&tables(&[]), &field);
        assert_eq!(
            out.unwrap()["f"],
            json!({ "type": "string", "enum": ["left", "right"] })
        );
    }

    #[test]
    fn options_map_to_string_arrays() {
        let mut field = FieldDescriptor::new(FieldKind::MultiOption);
        field.options = vec![FieldOption { name: "A".into(), value: "a".into() }];
        let (out, _) = map_one(&tables(&[]), &field);
        assert_eq!(
            out.unwrap()["f"],
            json!({ "type": "array", "items": { "type": "string", "enum": ["a"] } })
        );
    }

    #[test]
    fn description_is_carried_into_the_fragment() {
        let mut field = FieldDescriptor::new(FieldKind::Number);
        field.description = Some("Sort weight".into());
        let (out, _) = map_one(&tables(&[]), &field);
        assert_eq!(
            out.unwrap()["f"],
            json!({ "type": "number", "description": "Sort weight" })
        );
    }
}
