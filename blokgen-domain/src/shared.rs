//! Helper types referenced by asset, link, table and richtext fields.
//!
//! Each is emitted at most once per run, the first time a field of that kind is mapped.

use crate::naming::TypeNamer;
use blokgen_types::FieldKind;
use serde_json::{Value, json};

const MULTIASSET_DEPS: &[FieldKind] = &[FieldKind::Asset];

/// Kinds that must be emitted before `kind` because its definition references them.
pub(crate) fn dependencies(kind: &FieldKind) -> &'static [FieldKind] {
    match kind {
        FieldKind::Multiasset => MULTIASSET_DEPS,
        _ => &[],
    }
}

/// JSON-schema definition of a shared helper type, `None` for non-shared kinds.
pub fn shared_type_schema(kind: &FieldKind, namer: &TypeNamer) -> Option<Value> {
    let schema = match kind {
        FieldKind::Asset => asset(),
        FieldKind::Multiasset => json!({
            "type": "array",
            "items": { "tsType": namer.type_name(FieldKind::Asset.as_str()) }
        }),
        FieldKind::Multilink => multilink(),
        FieldKind::Table => table(),
        FieldKind::Richtext => richtext(&namer.type_name(FieldKind::Richtext.as_str())),
        _ => return None,
    };
    Some(schema)
}

fn asset() -> Value {
    json!({
        "type": "object",
        "required": ["id", "filename", "name"],
        "properties": {
            "alt": { "type": ["string", "null"] },
            "copyright": { "type": ["string", "null"] },
            "fieldtype": { "enum": ["asset"] },
            "id": { "type": "number" },
            "filename": { "type": ["string", "null"] },
            "name": { "type": "string" },
            "title": { "type": ["string", "null"] },
            "focus": { "type": ["string", "null"] },
            "meta_data": { "type": "object" },
            "source": { "type": ["string", "null"] },
            "is_external_url": { "type": "boolean" },
            "is_private": { "type": "boolean" },
            "src": { "type": "string" },
            "updated_at": { "type": "string" },
            "width": { "type": ["number", "null"] },
            "height": { "type": ["number", "null"] },
            "aspect_ratio": { "type": ["number", "null"] },
            "public_id": { "type": ["string", "null"] },
            "content_type": { "type": "string" }
        }
    })
}

fn link_target() -> Value {
    json!({ "enum": ["_self", "_blank"] })
}

// `linktype` stays optional on every variant so `Exclude<_, {linktype?: "email"}>`
// removes exactly one member.
fn multilink() -> Value {
    json!({
        "oneOf": [
            {
                "type": "object",
                "properties": {
                    "fieldtype": { "enum": ["multilink"] },
                    "id": { "type": "string" },
                    "url": { "type": "string" },
                    "cached_url": { "type": "string" },
                    "target": link_target(),
                    "anchor": { "type": "string" },
                    "rel": { "type": "string" },
                    "title": { "type": "string" },
                    "prep": { "type": "string" },
                    "linktype": { "enum": ["story"] },
                    "story": { "tsType": "StoryblokStory<any>" }
                }
            },
            {
                "type": "object",
                "properties": {
                    "fieldtype": { "enum": ["multilink"] },
                    "id": { "type": "string" },
                    "url": { "type": "string" },
                    "cached_url": { "type": "string" },
                    "target": link_target(),
                    "rel": { "type": "string" },
                    "title": { "type": "string" },
                    "linktype": { "enum": ["url"] }
                }
            },
            {
                "type": "object",
                "properties": {
                    "fieldtype": { "enum": ["multilink"] },
                    "email": { "type": "string" },
                    "target": link_target(),
                    "linktype": { "enum": ["email"] }
                }
            },
            {
                "type": "object",
                "properties": {
                    "fieldtype": { "enum": ["multilink"] },
                    "id": { "type": "string" },
                    "url": { "type": "string" },
                    "cached_url": { "type": "string" },
                    "target": link_target(),
                    "linktype": { "enum": ["asset"] }
                }
            }
        ]
    })
}

fn table() -> Value {
    json!({
        "type": "object",
        "required": ["thead", "tbody"],
        "properties": {
            "fieldtype": { "enum": ["table"] },
            "thead": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["_uid", "component"],
                    "properties": {
                        "_uid": { "type": "string" },
                        "value": { "type": "string" },
                        "component": { "enum": ["_table_head"] }
                    }
                }
            },
            "tbody": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["_uid", "component", "body"],
                    "properties": {
                        "_uid": { "type": "string" },
                        "component": { "enum": ["_table_row"] },
                        "body": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["_uid", "component"],
                                "properties": {
                                    "_uid": { "type": "string" },
                                    "value": { "type": "string" },
                                    "component": { "enum": ["_table_col"] }
                                }
                            }
                        }
                    }
                }
            }
        }
    })
}

fn richtext(self_name: &str) -> Value {
    json!({
        "type": "object",
        "required": ["type"],
        "properties": {
            "type": { "type": "string" },
            "content": { "type": "array", "items": { "tsType": self_name } },
            "marks": { "type": "array", "items": { "tsType": self_name } },
            "attrs": { "tsType": "any" },
            "text": { "type": "string" }
        }
    })
}
