use crate::mapper::FieldTypeMapper;
use blokgen_render::{CompileError, CompileOptions, compile};
use blokgen_types::{ComponentSchema, FieldKind};
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Instance identifier injected into every component.
pub const UID_PROPERTY: &str = "_uid";
/// Discriminator injected into every component.
pub const COMPONENT_PROPERTY: &str = "component";

/// Where a generated declaration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeOrigin {
    Component(String),
    SharedField(FieldKind),
}

/// One emittable declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedType {
    pub type_name: String,
    pub origin: TypeOrigin,
    pub declaration: String,
}

/// One component failed to compile; the rest of the run is unaffected.
#[derive(Debug, Error)]
#[error("component `{component}` failed to compile")]
pub struct SchemaCompilationError {
    pub component: String,
    #[source]
    pub source: CompileError,
}

/// Assemble the object schema for a component.
///
/// Fields are mapped in declared order and merged last-write-wins; the identifier and
/// discriminator are written afterwards so no user field can shadow them.
pub fn component_object_schema(component: &ComponentSchema, mapper: &mut FieldTypeMapper<'_>) -> Value {
    let mut required: Vec<String> = vec![UID_PROPERTY.to_string(), COMPONENT_PROPERTY.to_string()];
    let mut properties = Map::new();

    for (name, field) in component.data_fields() {
        if field.required && !required.iter().any(|r| r == name) {
            required.push(name.clone());
        }
        if let Some(fragments) = mapper.map_field(name, field) {
            for (key, fragment) in fragments {
                properties.insert(key, fragment);
            }
        }
    }

    properties.insert(UID_PROPERTY.to_string(), json!({ "type": "string" }));
    properties.insert(
        COMPONENT_PROPERTY.to_string(),
        json!({ "type": "string", "enum": [component.name] }),
    );

    json!({
        "$id": format!("#/{}", component.name),
        "title": component.name,
        "type": "object",
        "required": required,
        "properties": properties,
    })
}

pub fn compile_component(
    component: &ComponentSchema,
    mapper: &mut FieldTypeMapper<'_>,
    opts: &CompileOptions,
) -> Result<GeneratedType, SchemaCompilationError> {
    let schema = component_object_schema(component, mapper);
    let type_name = mapper.namer().type_name(&component.name);
    let declaration = compile(&schema, &type_name, opts).map_err(|source| SchemaCompilationError {
        component: component.name.clone(),
        source,
    })?;
    Ok(GeneratedType {
        type_name,
        origin: TypeOrigin::Component(component.name.clone()),
        declaration,
    })
}
