use crate::compiler::{GeneratedType, SchemaCompilationError, TypeOrigin, compile_component};
use crate::mapper::FieldTypeMapper;
use crate::naming::TypeNamer;
use crate::ports::CustomFieldTypeParser;
use crate::resolver::ResolverTables;
use crate::shared::shared_type_schema;
use blokgen_render::{CompileOptions, compile};
use blokgen_types::{ComponentSchema, FieldKind};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub namer: TypeNamer,
    pub compile: CompileOptions,
}

/// Result of one generation run: declarations in emission order plus per-component failures.
#[derive(Debug, Default)]
pub struct Generation {
    pub types: Vec<GeneratedType>,
    pub failures: Vec<SchemaCompilationError>,
}

impl Generation {
    pub fn declarations(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|t| t.declaration.as_str())
    }
}

pub struct Generator {
    config: GeneratorConfig,
    custom: Option<Box<dyn CustomFieldTypeParser + Send + Sync>>,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            custom: None,
        }
    }

    pub fn with_custom_field_types(mut self, parser: Box<dyn CustomFieldTypeParser + Send + Sync>) -> Self {
        self.custom = Some(parser);
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate declarations for every component.
    ///
    /// Resolver tables are built from the full input before the first component is compiled.
    /// Shared helper types are placed ahead of the first component that references them.
    pub fn generate(&self, components: &[ComponentSchema]) -> Generation {
        let tables = ResolverTables::build(components);
        for (type_name, sources) in self.config.namer.collisions(tables.names.iter().map(String::as_str)) {
            warn!(
                type_name = %type_name,
                components = ?sources,
                "components share a type name; their interfaces will merge"
            );
        }
        let custom = self
            .custom
            .as_deref()
            .map(|p| p as &dyn CustomFieldTypeParser);
        let mut mapper = FieldTypeMapper::new(&tables, &self.config.namer, custom);
        let mut generation = Generation::default();

        for component in components {
            let compiled = compile_component(component, &mut mapper, &self.config.compile);
            for kind in mapper.take_pending_shared() {
                match self.shared_type(&kind) {
                    Ok(Some(generated)) => generation.types.push(generated),
                    Ok(None) => {}
                    Err(err) => {
                        error!(kind = %kind, error = %err, "shared field type failed to compile");
                    }
                }
            }
            match compiled {
                Ok(generated) => {
                    debug!(component = %component.name, type_name = %generated.type_name, "component compiled");
                    generation.types.push(generated);
                }
                Err(err) => {
                    error!(
                        component = %err.component,
                        error = %err.source,
                        "schema compilation failed; skipping component, bloks unions naming it will not resolve"
                    );
                    generation.failures.push(err);
                }
            }
        }

        info!(
            components = components.len(),
            types = generation.types.len(),
            failures = generation.failures.len(),
            "generation finished"
        );
        generation
    }

    fn shared_type(&self, kind: &FieldKind) -> Result<Option<GeneratedType>, blokgen_render::CompileError> {
        let namer = &self.config.namer;
        let Some(schema) = shared_type_schema(kind, namer) else {
            return Ok(None);
        };
        let type_name = namer.type_name(kind.as_str());
        let declaration = compile(&schema, &type_name, &self.config.compile)?;
        Ok(Some(GeneratedType {
            type_name,
            origin: TypeOrigin::SharedField(kind.clone()),
            declaration,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blokgen_types::FieldDescriptor;

    fn names(generation: &Generation) -> Vec<&str> {
        generation.types.iter().map(|t| t.type_name.as_str()).collect()
    }

    #[test]
    fn shared_types_precede_their_first_user() {
        let components = vec![
            ComponentSchema::new("page"),
            ComponentSchema::new("gallery")
                .with_field("images", FieldDescriptor::new(FieldKind::Multiasset))
                .with_field("cover", FieldDescriptor::new(FieldKind::Asset)),
            ComponentSchema::new("teaser").with_field("image", FieldDescriptor::new(FieldKind::Asset)),
        ];
        let generation = Generator::new(GeneratorConfig::default()).generate(&components);
        assert!(generation.failures.is_empty());
        assert_eq!(
            names(&generation),
            vec![
                "PageStoryblok",
                "AssetStoryblok",
                "MultiassetStoryblok",
                "GalleryStoryblok",
                "TeaserStoryblok"
            ]
        );
    }

    #[test]
    fn failing_component_does_not_abort_the_batch() {
        let components = vec![
            ComponentSchema::new("broken").with_field("c", FieldDescriptor::new(FieldKind::Custom)),
            ComponentSchema::new("fine"),
        ];
        let generator = Generator::new(GeneratorConfig::default()).with_custom_field_types(Box::new(
            |name: &str, _: &FieldDescriptor| {
                let mut m = serde_json::Map::new();
                m.insert(name.to_string(), serde_json::json!({ "type": 7 }));
                Some(m)
            },
        ));
        let generation = generator.generate(&components);
        assert_eq!(names(&generation), vec!["FineStoryblok"]);
        assert_eq!(generation.failures.len(), 1);
        assert_eq!(generation.failures[0].component, "broken");
    }

    #[test]
    fn failed_component_stays_in_unrestricted_unions() {
        let components = vec![
            ComponentSchema::new("broken").with_field("c", FieldDescriptor::new(FieldKind::Custom)),
            ComponentSchema::new("page").with_field("body", FieldDescriptor::new(FieldKind::Bloks)),
        ];
        let generator = Generator::new(GeneratorConfig::default()).with_custom_field_types(Box::new(
            |name: &str, _: &FieldDescriptor| {
                let mut m = serde_json::Map::new();
                m.insert(name.to_string(), serde_json::json!({ "enum": "x" }));
                Some(m)
            },
        ));
        let generation = generator.generate(&components);
        assert_eq!(names(&generation), vec!["PageStoryblok"]);
        assert_eq!(generation.failures.len(), 1);
        assert!(generation.types[0].declaration.contains("BrokenStoryblok"));
    }

    #[test]
    fn prefix_and_suffix_reach_every_type_name() {
        let config = GeneratorConfig {
            namer: TypeNamer::new("Sb", "Block"),
            ..GeneratorConfig::default()
        };
        let components = vec![
            ComponentSchema::new("page").with_field("link", FieldDescriptor::new(FieldKind::Multilink)),
        ];
        let generation = Generator::new(config).generate(&components);
        assert_eq!(names(&generation), vec!["SbMultilinkBlock", "SbPageBlock"]);
        assert!(generation.types[1].declaration.contains("Exclude<SbMultilinkBlock,"));
    }
}
