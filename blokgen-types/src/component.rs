use crate::nullable;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Field names starting with this prefix are editor tabs, not data.
pub const TAB_MARKER: &str = "tab-";

/// One component (blok) definition as exported from the CMS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSchema {
    pub name: String,

    #[serde(
        default,
        deserialize_with = "nullable::non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub component_group_uuid: Option<String>,

    /// Field name -> descriptor, in the order the schema declares them.
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub schema: IndexMap<String, FieldDescriptor>,
}

impl ComponentSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            component_group_uuid: None,
            schema: IndexMap::new(),
        }
    }

    pub fn with_group(mut self, group_uuid: impl Into<String>) -> Self {
        self.component_group_uuid = Some(group_uuid.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, field: FieldDescriptor) -> Self {
        self.schema.insert(name.into(), field);
        self
    }

    /// Fields that carry a data contract, i.e. everything except tab markers.
    pub fn data_fields(&self) -> impl Iterator<Item = (&String, &FieldDescriptor)> {
        self.schema
            .iter()
            .filter(|(name, _)| !name.starts_with(TAB_MARKER))
    }
}

/// A single field of a component schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    #[serde(rename = "type")]
    pub kind: FieldKind,

    #[serde(default, deserialize_with = "nullable::or_default")]
    pub required: bool,

    #[serde(default, deserialize_with = "nullable::or_default")]
    pub restrict_components: bool,

    /// `"groups"` restricts bloks by component group; anything else by component name.
    #[serde(
        default,
        deserialize_with = "nullable::non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub restrict_type: Option<String>,

    #[serde(
        default,
        deserialize_with = "nullable::or_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub component_whitelist: Vec<String>,

    #[serde(
        default,
        deserialize_with = "nullable::or_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub component_group_whitelist: Vec<String>,

    #[serde(default, deserialize_with = "nullable::or_default")]
    pub email_link_type: bool,

    #[serde(default, deserialize_with = "nullable::or_default")]
    pub asset_link_type: bool,

    /// Static choices for `option` / `options` fields.
    #[serde(
        default,
        deserialize_with = "nullable::or_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub options: Vec<FieldOption>,

    /// Datasource for `option` / `options`; absent means the static `options` list.
    #[serde(
        default,
        deserialize_with = "nullable::non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub source: Option<String>,

    /// Plugin id of a `custom` field.
    #[serde(
        default,
        deserialize_with = "nullable::non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub field_type: Option<String>,

    #[serde(
        default,
        deserialize_with = "nullable::non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,

    /// Attributes blokgen does not interpret; custom field parsers still see them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldDescriptor {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            restrict_components: false,
            restrict_type: None,
            component_whitelist: Vec::new(),
            component_group_whitelist: Vec::new(),
            email_link_type: false,
            asset_link_type: false,
            options: Vec::new(),
            source: None,
            field_type: None,
            description: None,
            extra: Map::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn restrict_to_groups(&self) -> bool {
        self.restrict_type.as_deref() == Some("groups")
    }

    /// Static option values, when the field is not backed by a datasource.
    pub fn static_option_values(&self) -> Option<Vec<&str>> {
        if self.source.is_some() || self.options.is_empty() {
            return None;
        }
        Some(self.options.iter().map(|o| o.value.as_str()).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    #[serde(default, deserialize_with = "nullable::scalar_string")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable::scalar_string")]
    pub value: String,
}

/// Closed set of field kinds blokgen understands.
///
/// Anything else lands in [`FieldKind::Other`] and is skipped by the mapper.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldKind {
    Text,
    Textarea,
    Markdown,
    Datetime,
    Number,
    Boolean,
    SingleOption,
    MultiOption,
    Bloks,
    Asset,
    Multiasset,
    Multilink,
    Table,
    Richtext,
    Custom,
    Section,
    Tab,
    Other(String),
}

impl FieldKind {
    /// Kinds that reference a shared helper type emitted once per run.
    pub const SHARED: [FieldKind; 5] = [
        FieldKind::Asset,
        FieldKind::Multiasset,
        FieldKind::Multilink,
        FieldKind::Table,
        FieldKind::Richtext,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Markdown => "markdown",
            FieldKind::Datetime => "datetime",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::SingleOption => "option",
            FieldKind::MultiOption => "options",
            FieldKind::Bloks => "bloks",
            FieldKind::Asset => "asset",
            FieldKind::Multiasset => "multiasset",
            FieldKind::Multilink => "multilink",
            FieldKind::Table => "table",
            FieldKind::Richtext => "richtext",
            FieldKind::Custom => "custom",
            FieldKind::Section => "section",
            FieldKind::Tab => "tab",
            FieldKind::Other(s) => s.as_str(),
        }
    }

    pub fn is_shared(&self) -> bool {
        Self::SHARED.contains(self)
    }
}

impl From<String> for FieldKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "text" => FieldKind::Text,
            "textarea" => FieldKind::Textarea,
            "markdown" => FieldKind::Markdown,
            "datetime" => FieldKind::Datetime,
            "number" => FieldKind::Number,
            "boolean" => FieldKind::Boolean,
            "option" => FieldKind::SingleOption,
            "options" => FieldKind::MultiOption,
            "bloks" => FieldKind::Bloks,
            "asset" => FieldKind::Asset,
            "multiasset" => FieldKind::Multiasset,
            "multilink" => FieldKind::Multilink,
            "table" => FieldKind::Table,
            "richtext" => FieldKind::Richtext,
            "custom" => FieldKind::Custom,
            "section" => FieldKind::Section,
            "tab" => FieldKind::Tab,
            _ => FieldKind::Other(s),
        }
    }
}

impl From<&str> for FieldKind {
    fn from(s: &str) -> Self {
        FieldKind::from(s.to_string())
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
