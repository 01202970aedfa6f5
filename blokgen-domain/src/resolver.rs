//! Cross-component lookup tables, built in one pass before any compilation starts.

use blokgen_types::ComponentSchema;
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

/// Group uuid -> names of the components declaring that group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentGroupIndex {
    groups: IndexMap<String, IndexSet<String>>,
}

impl ComponentGroupIndex {
    pub fn members(&self, group_uuid: &str) -> Option<&IndexSet<String>> {
        self.groups.get(group_uuid)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Every component name seen in the run, in first-encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentNameUniverse {
    names: IndexSet<String>,
}

impl ComponentNameUniverse {
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.names.iter()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Read-only tables shared by every component compilation of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverTables {
    pub groups: ComponentGroupIndex,
    pub names: ComponentNameUniverse,
}

impl ResolverTables {
    pub fn build(components: &[ComponentSchema]) -> Self {
        let mut tables = ResolverTables::default();
        for component in components {
            if let Some(group) = &component.component_group_uuid {
                tables
                    .groups
                    .groups
                    .entry(group.clone())
                    .or_default()
                    .insert(component.name.clone());
            }
            if !tables.names.names.insert(component.name.clone()) {
                warn!(component = %component.name, "duplicate component name in input");
            }
        }
        debug!(
            components = tables.names.len(),
            groups = tables.groups.len(),
            "resolver tables built"
        );
        tables
    }
}
