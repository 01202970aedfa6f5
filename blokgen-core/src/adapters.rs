//! Default implementations of the port traits.

use crate::ports::{LoadedComponents, RejectedComponent, RollbackStore, SchemaSource, WritePort};
use anyhow::{Context, bail};
use blokgen_domain::FieldTypeTable;
use blokgen_types::ComponentSchema;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde_json::Value;
use std::io::{ErrorKind, Write};
use tracing::{debug, error, warn};

pub use blokgen_migrate::{InMemoryContentApi, InMemoryRollbackStore};

/// Reads component schemas from a JSON file or a directory of JSON files.
///
/// A file may hold a CMS export (`{ "components": [...] }`), a bare array of components, or a
/// single component object. Directory entries are read in path order.
#[derive(Debug, Clone)]
pub struct FsSchemaSource {
    path: Utf8PathBuf,
}

impl FsSchemaSource {
    pub fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }
}

impl SchemaSource for FsSchemaSource {
    fn load_components(&self) -> anyhow::Result<LoadedComponents> {
        if !self.path.is_dir() {
            return load_schema_file(&self.path);
        }

        let pattern = self.path.join("*.json");
        let mut files: Vec<Utf8PathBuf> = Vec::new();
        for entry in glob::glob(pattern.as_str()).with_context(|| format!("glob {}", pattern))? {
            let path = entry.with_context(|| format!("read entry under {}", self.path))?;
            let path = Utf8PathBuf::from_path_buf(path)
                .map_err(|p| anyhow::anyhow!("non UTF-8 path: {}", p.display()))?;
            files.push(path);
        }
        files.sort();

        let mut loaded = LoadedComponents::default();
        for file in &files {
            loaded.extend(load_schema_file(file)?);
        }
        debug!(
            dir = %self.path,
            files = files.len(),
            components = loaded.components.len(),
            rejected = loaded.rejected.len(),
            "loaded schema directory"
        );
        Ok(loaded)
    }
}

fn load_schema_file(path: &Utf8Path) -> anyhow::Result<LoadedComponents> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path))?;
    let value: Value = serde_json::from_str(&text).with_context(|| format!("parse {}", path))?;
    parse_components(value).with_context(|| format!("load components from {}", path))
}

/// Accepts an export object, a bare array, or a single component.
///
/// Each component is read on its own; one that does not deserialize is logged and rejected
/// without affecting the others.
pub fn parse_components(value: Value) -> anyhow::Result<LoadedComponents> {
    let list = match value {
        Value::Object(mut map) if map.contains_key("components") => match map.remove("components") {
            Some(Value::Array(list)) => list,
            _ => bail!("`components` must be an array"),
        },
        Value::Array(list) => list,
        single @ Value::Object(_) => vec![single],
        _ => bail!("expected a component export object, an array, or a single component"),
    };

    let mut loaded = LoadedComponents::default();
    for (index, item) in list.into_iter().enumerate() {
        let label = item
            .get("name")
            .and_then(Value::as_str)
            .map_or_else(|| format!("#{index}"), str::to_string);
        match serde_json::from_value::<ComponentSchema>(item) {
            Ok(component) => loaded.components.push(component),
            Err(err) => {
                error!(component = %label, error = %err, "invalid component schema; skipping component");
                loaded.rejected.push(RejectedComponent {
                    component: label,
                    reason: err.to_string(),
                });
            }
        }
    }
    Ok(loaded)
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySchemaSource {
    components: Vec<ComponentSchema>,
}

impl InMemorySchemaSource {
    pub fn new(components: Vec<ComponentSchema>) -> Self {
        Self { components }
    }
}

impl SchemaSource for InMemorySchemaSource {
    fn load_components(&self) -> anyhow::Result<LoadedComponents> {
        Ok(LoadedComponents {
            components: self.components.clone(),
            rejected: Vec::new(),
        })
    }
}

/// Filesystem write operations.
#[derive(Debug, Clone, Default)]
pub struct FsWritePort;

impl WritePort for FsWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("create parent dir for {}", path))?;
        }
        fs::write(path, contents).with_context(|| format!("write {}", path))
    }

    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()> {
        fs::create_dir_all(path).with_context(|| format!("create_dir_all {}", path))
    }
}

/// Rollback snapshots as files in one directory.
#[derive(Debug, Clone)]
pub struct FsRollbackStore {
    dir: Utf8PathBuf,
}

impl FsRollbackStore {
    pub fn new(dir: Utf8PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }
}

impl RollbackStore for FsRollbackStore {
    fn list(&self) -> anyhow::Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn read(&self, file_name: &str) -> anyhow::Result<Vec<u8>> {
        let path = self.dir.join(file_name);
        fs::read(&path).with_context(|| format!("read {}", path))
    }

    fn create_new(&self, file_name: &str, contents: &[u8]) -> anyhow::Result<bool> {
        fs::create_dir_all(&self.dir).with_context(|| format!("create_dir_all {}", self.dir))?;
        let path = self.dir.join(file_name);
        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(err) => return Err(err).with_context(|| format!("create {}", path)),
        };
        write_or_discard(&path, move || {
            file.write_all(contents)?;
            file.sync_all()
        })?;
        Ok(true)
    }

    fn exists(&self, file_name: &str) -> anyhow::Result<bool> {
        Ok(self.dir.join(file_name).is_file())
    }

    fn remove(&self, file_name: &str) -> anyhow::Result<()> {
        let path = self.dir.join(file_name);
        fs::remove_file(&path).with_context(|| format!("remove {}", path))
    }
}

/// Run `write` against a file just created at `path`, removing the file if it fails.
///
/// A partial snapshot would otherwise block every later apply and fail every rollback.
fn write_or_discard(path: &Utf8Path, write: impl FnOnce() -> std::io::Result<()>) -> anyhow::Result<()> {
    let Err(err) = write() else {
        return Ok(());
    };
    if let Err(cleanup) = fs::remove_file(path) {
        warn!(path = %path, error = %cleanup, "could not remove partially written file");
    }
    Err(err).with_context(|| format!("write {}", path))
}

/// Load the plugin-id -> fragment table a `customFieldTypesParserPath` points at.
pub fn load_custom_field_types(path: &Utf8Path) -> anyhow::Result<FieldTypeTable> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path))?;
    let value: Value = serde_json::from_str(&text).with_context(|| format!("parse {}", path))?;
    let table = FieldTypeTable::from_json(value).with_context(|| format!("load {}", path))?;
    debug!(path = %path, plugins = table.len(), "custom field types loaded");
    Ok(table)
}
