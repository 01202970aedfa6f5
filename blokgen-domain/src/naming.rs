use indexmap::IndexMap;

/// Component / field-kind name -> TypeScript type name.
///
/// `prefix + PascalCase(name) + suffix`, each part split on non-alphanumeric characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNamer {
    pub prefix: String,
    pub suffix: String,
}

impl Default for TypeNamer {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            suffix: "Storyblok".to_string(),
        }
    }
}

impl TypeNamer {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn type_name(&self, name: &str) -> String {
        let mut out = String::new();
        for part in [self.prefix.as_str(), name, self.suffix.as_str()] {
            push_pascal(&mut out, part);
        }
        if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
            out.insert(0, '_');
        }
        out
    }

    /// Type names produced by more than one of `names`, with the names that produce them.
    pub fn collisions<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> IndexMap<String, Vec<&'a str>> {
        let mut by_type: IndexMap<String, Vec<&'a str>> = IndexMap::new();
        for name in names {
            by_type.entry(self.type_name(name)).or_default().push(name);
        }
        by_type.retain(|_, sources| sources.len() > 1);
        by_type
    }
}

fn push_pascal(out: &mut String, part: &str) {
    for word in part
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
        }
    }
}
