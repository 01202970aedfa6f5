//! BDD harness (cucumber-rs).
//!
//! This crate exists to keep scenario tests isolated from the production crates. The helpers
//! below read generated artifacts the way the scenarios phrase their expectations.

/// Body lines of `export interface <name> { ... }`, trimmed. `None` when the interface is absent.
pub fn interface_members<'a>(artifact: &'a str, name: &str) -> Option<Vec<&'a str>> {
    let header = format!("export interface {name} {{\n");
    let start = artifact.find(&header)? + header.len();
    let body = &artifact[start..];
    let end = body.find("\n}\n")?;
    Some(body[..end].lines().map(str::trim).collect())
}

/// Number of top-level declarations named `name`.
pub fn declaration_count(artifact: &str, name: &str) -> usize {
    let interface = format!("export interface {name} ");
    let alias = format!("export type {name} ");
    artifact
        .lines()
        .filter(|line| line.starts_with(&interface) || line.starts_with(&alias))
        .count()
}
