//! TypeScript rendering for JSON-schema fragments.
//!
//! Understands the subset of JSON Schema the blokgen mapper produces plus what custom field
//! parsers commonly return: `type`, `properties`, `required`, `items`, `enum`, `const`,
//! `anyOf`/`oneOf`, `allOf`, `additionalProperties`, `description`, and the `tsType`
//! escape hatch, which is emitted verbatim.
//!
//! Output is a single `export interface` (object schemas) or `export type` (everything
//! else) declaration terminated by a newline.

mod error;

pub use error::{CompileError, CompileResult};

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Options handed through verbatim from the generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Emit `[k: string]: any` on objects that do not set `additionalProperties`.
    pub additional_properties: bool,

    /// Text placed above every declaration.
    pub banner_comment: Option<String>,

    /// Spaces per nesting level.
    pub indent: usize,

    /// Render untyped nodes as `any` instead of `unknown`.
    pub unknown_any: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            additional_properties: true,
            banner_comment: None,
            indent: 2,
            unknown_any: false,
        }
    }
}

/// Compile one schema fragment into a named TypeScript declaration.
pub fn compile(schema: &Value, name: &str, opts: &CompileOptions) -> CompileResult<String> {
    if !is_identifier(name) {
        return Err(CompileError::InvalidName {
            name: name.to_string(),
        });
    }

    let node = schema
        .as_object()
        .ok_or_else(|| CompileError::malformed("#", "schema must be an object"))?;
    let renderer = Renderer { opts };

    let mut out = String::new();
    if let Some(banner) = opts
        .banner_comment
        .as_deref()
        .filter(|b| !b.trim().is_empty())
    {
        out.push_str(banner.trim_end());
        out.push('\n');
    }
    if let Some(desc) = description(node) {
        out.push_str(&doc_comment(desc, ""));
    }

    if is_object_node(node) {
        let body = renderer.object_body(node, "#", 0)?;
        out.push_str(&format!("export interface {name} {body}\n"));
    } else {
        let expr = renderer.render(schema, "#", 0)?;
        out.push_str(&format!("export type {name} = {expr};\n"));
    }

    debug!(name, bytes = out.len(), "compiled declaration");
    Ok(out)
}

/// True for names usable as a TypeScript type identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

struct Renderer<'a> {
    opts: &'a CompileOptions,
}

impl Renderer<'_> {
    fn render(&self, value: &Value, path: &str, depth: usize) -> CompileResult<String> {
        match value {
            Value::Bool(true) => Ok(self.untyped().to_string()),
            Value::Bool(false) => Ok("never".to_string()),
            Value::Object(node) => self.render_node(node, path, depth),
            other => Err(CompileError::malformed(
                path,
                format!("expected a schema object, found {}", json_kind(other)),
            )),
        }
    }

    fn render_node(&self, node: &Map<String, Value>, path: &str, depth: usize) -> CompileResult<String> {
        if let Some(ts) = node.get("tsType") {
            return ts.as_str().map(str::to_string).ok_or_else(|| {
                CompileError::malformed(&format!("{path}/tsType"), "tsType must be a string")
            });
        }
        if let Some(value) = node.get("const") {
            return Ok(literal(value));
        }
        if let Some(values) = node.get("enum") {
            let values = values.as_array().ok_or_else(|| {
                CompileError::malformed(&format!("{path}/enum"), "enum must be an array")
            })?;
            if values.is_empty() {
                return Ok("never".to_string());
            }
            return Ok(values.iter().map(literal).collect::<Vec<_>>().join(" | "));
        }
        for key in ["anyOf", "oneOf"] {
            if let Some(members) = node.get(key) {
                return self.combine(members, &format!("{path}/{key}"), depth, " | ");
            }
        }
        if let Some(members) = node.get("allOf") {
            return self.combine(members, &format!("{path}/allOf"), depth, " & ");
        }

        match node.get("type") {
            None if node.contains_key("properties") => self.object_body(node, path, depth),
            None if node.contains_key("items") => self.array(node, path, depth),
            None => Ok(self.untyped().to_string()),
            Some(Value::String(ty)) => self.render_typed(ty, node, path, depth),
            Some(Value::Array(types)) => {
                let mut parts = Vec::with_capacity(types.len());
                for (i, ty) in types.iter().enumerate() {
                    let ty = ty.as_str().ok_or_else(|| {
                        CompileError::malformed(&format!("{path}/type/{i}"), "type must be a string")
                    })?;
                    parts.push(self.render_typed(ty, node, path, depth)?);
                }
                Ok(parts.join(" | "))
            }
            Some(_) => Err(CompileError::malformed(
                &format!("{path}/type"),
                "type must be a string or an array of strings",
            )),
        }
    }

    fn render_typed(
        &self,
        ty: &str,
        node: &Map<String, Value>,
        path: &str,
        depth: usize,
    ) -> CompileResult<String> {
        match ty {
            "string" => Ok("string".to_string()),
            "number" | "integer" => Ok("number".to_string()),
            "boolean" => Ok("boolean".to_string()),
            "null" => Ok("null".to_string()),
            "any" => Ok("any".to_string()),
            "array" => self.array(node, path, depth),
            "object" => self.object_body(node, path, depth),
            other => Err(CompileError::UnsupportedType {
                path: format!("{path}/type"),
                ty: other.to_string(),
            }),
        }
    }

    fn combine(&self, members: &Value, path: &str, depth: usize, sep: &str) -> CompileResult<String> {
        let members = members
            .as_array()
            .ok_or_else(|| CompileError::malformed(path, "expected an array of schemas"))?;
        if members.is_empty() {
            return Ok("never".to_string());
        }
        let mut parts = Vec::with_capacity(members.len());
        for (i, member) in members.iter().enumerate() {
            let rendered = self.render(member, &format!("{path}/{i}"), depth)?;
            if sep == " & " && rendered.contains(" | ") {
                parts.push(format!("({rendered})"));
            } else {
                parts.push(rendered);
            }
        }
        Ok(parts.join(sep))
    }

    fn array(&self, node: &Map<String, Value>, path: &str, depth: usize) -> CompileResult<String> {
        match node.get("items") {
            None => Ok(format!("{}[]", self.untyped())),
            Some(Value::Array(tuple)) => {
                let mut parts = Vec::with_capacity(tuple.len());
                for (i, item) in tuple.iter().enumerate() {
                    parts.push(self.render(item, &format!("{path}/items/{i}"), depth)?);
                }
                Ok(format!("[{}]", parts.join(", ")))
            }
            Some(items) => {
                let item = self.render(items, &format!("{path}/items"), depth)?;
                if item.contains(" | ") || item.contains(" & ") {
                    Ok(format!("({item})[]"))
                } else {
                    Ok(format!("{item}[]"))
                }
            }
        }
    }

    fn object_body(&self, node: &Map<String, Value>, path: &str, depth: usize) -> CompileResult<String> {
        let empty = Map::new();
        let props = match node.get("properties") {
            None => &empty,
            Some(Value::Object(props)) => props,
            Some(_) => {
                return Err(CompileError::malformed(
                    &format!("{path}/properties"),
                    "properties must be an object",
                ));
            }
        };

        let required: Vec<&str> = match node.get("required") {
            None => Vec::new(),
            Some(Value::Array(names)) => names
                .iter()
                .map(|n| {
                    n.as_str().ok_or_else(|| {
                        CompileError::malformed(
                            &format!("{path}/required"),
                            "required must list property names",
                        )
                    })
                })
                .collect::<CompileResult<_>>()?,
            Some(_) => {
                return Err(CompileError::malformed(
                    &format!("{path}/required"),
                    "required must be an array",
                ));
            }
        };

        let pad = " ".repeat(self.opts.indent * (depth + 1));
        let mut lines = String::new();
        for (key, prop) in props {
            let prop_path = format!("{path}/properties/{key}");
            if let Some(desc) = prop.as_object().and_then(description) {
                lines.push_str(&doc_comment(desc, &pad));
            }
            let ty = self.render(prop, &prop_path, depth + 1)?;
            let optional = if required.contains(&key.as_str()) { "" } else { "?" };
            lines.push_str(&format!("{pad}{}{optional}: {ty};\n", property_key(key)));
        }

        let index = match node.get("additionalProperties") {
            None if self.opts.additional_properties => Some("any".to_string()),
            None | Some(Value::Bool(false)) => None,
            Some(Value::Bool(true)) => Some("any".to_string()),
            Some(schema @ Value::Object(_)) => Some(self.render(
                schema,
                &format!("{path}/additionalProperties"),
                depth + 1,
            )?),
            Some(_) => {
                return Err(CompileError::malformed(
                    &format!("{path}/additionalProperties"),
                    "additionalProperties must be a boolean or a schema",
                ));
            }
        };
        if let Some(index) = index {
            lines.push_str(&format!("{pad}[k: string]: {index};\n"));
        }

        if lines.is_empty() {
            return Ok("{}".to_string());
        }
        let closing = " ".repeat(self.opts.indent * depth);
        Ok(format!("{{\n{lines}{closing}}}"))
    }

    fn untyped(&self) -> &'static str {
        if self.opts.unknown_any { "any" } else { "unknown" }
    }
}

fn is_object_node(node: &Map<String, Value>) -> bool {
    let combinator = ["tsType", "enum", "const", "anyOf", "oneOf", "allOf"]
        .iter()
        .any(|k| node.contains_key(*k));
    if combinator {
        return false;
    }
    match node.get("type") {
        Some(Value::String(ty)) => ty == "object",
        None => node.contains_key("properties"),
        Some(_) => false,
    }
}

fn description(node: &Map<String, Value>) -> Option<&str> {
    node.get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())
}

fn doc_comment(text: &str, pad: &str) -> String {
    let mut out = format!("{pad}/**\n");
    for line in text.lines() {
        let line = line.replace("*/", "*\\/");
        if line.trim().is_empty() {
            out.push_str(&format!("{pad} *\n"));
        } else {
            out.push_str(&format!("{pad} * {line}\n"));
        }
    }
    out.push_str(&format!("{pad} */\n"));
    out
}

fn property_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        literal(&Value::String(key.to_string()))
    }
}

fn literal(value: &Value) -> String {
    // serde_json output is a valid TypeScript literal for scalars.
    serde_json::to_string(value).unwrap_or_else(|_| "never".to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
