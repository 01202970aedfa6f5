//! Domain logic: turn component schemas into a deterministic set of TypeScript declarations.
//!
//! This crate owns *what* gets generated and in which order. It does not own where the
//! artifact goes; that's `blokgen-core`.

mod compiler;
mod generator;
mod mapper;
mod naming;
mod ports;
mod resolver;
mod shared;

pub use compiler::{
    COMPONENT_PROPERTY, GeneratedType, SchemaCompilationError, TypeOrigin, UID_PROPERTY,
    compile_component, component_object_schema,
};
pub use generator::{Generation, Generator, GeneratorConfig};
pub use mapper::FieldTypeMapper;
pub use naming::TypeNamer;
pub use ports::{CustomFieldTypeParser, FALLBACK_PLUGIN, FieldTypeTable};
pub use resolver::{ComponentGroupIndex, ComponentNameUniverse, ResolverTables};
pub use shared::shared_type_schema;
