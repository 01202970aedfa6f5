#![allow(deprecated)]

use assert_cmd::Command;
use blokgen_bdd::{declaration_count, interface_members};
use blokgen_core::adapters::FsRollbackStore;
use blokgen_core::pipeline::{ToolError, run_migration, run_rollback};
use blokgen_core::script::{MigrationScript, ScriptOp};
use blokgen_core::settings::{MigrateSettings, RollbackSettings};
use blokgen_migrate::{InMemoryContentApi, MigrateError, create_rollback_file, existing_rollback_files};
use blokgen_types::{ContentEntry, MigrationTarget, ROLLBACK_DIR};
use camino::Utf8PathBuf;
use cucumber::{World, given, then, when};
use fs_err as fs;
use serde_json::{Value, json};
use tempfile::TempDir;

#[derive(Debug, Default, World)]
pub struct BlokgenWorld {
    temp: Option<TempDir>,
    root: Option<Utf8PathBuf>,
    components: Vec<Value>,
    artifacts: Vec<String>,
    api: Option<InMemoryContentApi>,
    originals: Vec<ContentEntry>,
    found: Vec<String>,
    last_error: Option<ToolError>,
}

fn root(world: &mut BlokgenWorld) -> Utf8PathBuf {
    if world.root.is_none() {
        let td = tempfile::tempdir().expect("tempdir");
        world.root = Some(Utf8PathBuf::from_path_buf(td.path().to_path_buf()).expect("utf8 tempdir"));
        world.temp = Some(td);
    }
    world.root.clone().expect("root set")
}

fn rollback_dir(world: &mut BlokgenWorld) -> Utf8PathBuf {
    root(world).join(ROLLBACK_DIR)
}

fn store(world: &mut BlokgenWorld) -> FsRollbackStore {
    FsRollbackStore::new(rollback_dir(world))
}

fn api(world: &BlokgenWorld) -> &InMemoryContentApi {
    world.api.as_ref().expect("space set up")
}

fn artifact(world: &BlokgenWorld) -> &str {
    world.artifacts.last().expect("generate ran")
}

fn add_field(world: &mut BlokgenWorld, component: &str, field: &str, descriptor: Value) {
    let existing = world
        .components
        .iter_mut()
        .find(|c| c["name"] == component);
    match existing {
        Some(c) => {
            c["schema"][field] = descriptor;
        }
        None => world.components.push(json!({
            "name": component,
            "schema": { field: descriptor }
        })),
    }
}

// Generation

#[given(expr = "a component {string} with a required unrestricted bloks field {string}")]
async fn component_with_bloks(world: &mut BlokgenWorld, component: String, field: String) {
    add_field(
        world,
        &component,
        &field,
        json!({ "type": "bloks", "required": true, "restrict_components": false }),
    );
}

#[given(expr = "a component {string} with a text field {string}")]
async fn component_with_text(world: &mut BlokgenWorld, component: String, field: String) {
    add_field(world, &component, &field, json!({ "type": "text" }));
}

#[given(expr = "the component {string} has a tab field {string}")]
async fn component_with_tab(world: &mut BlokgenWorld, component: String, field: String) {
    add_field(world, &component, &field, json!({ "type": "tab", "keys": [] }));
}

#[given(expr = "a component {string} whose bloks field {string} is restricted to group {string}")]
async fn component_with_group_bloks(
    world: &mut BlokgenWorld,
    component: String,
    field: String,
    group: String,
) {
    add_field(
        world,
        &component,
        &field,
        json!({
            "type": "bloks",
            "restrict_components": true,
            "restrict_type": "groups",
            "component_group_whitelist": [group]
        }),
    );
}

#[given(expr = "a component {string} with a multilink field {string}")]
async fn component_with_multilink(world: &mut BlokgenWorld, component: String, field: String) {
    add_field(world, &component, &field, json!({ "type": "multilink" }));
}

fn generate(world: &mut BlokgenWorld) {
    let root = root(world);
    let export = json!({ "components": world.components });
    fs::write(
        root.join("components.json"),
        serde_json::to_string_pretty(&export).expect("serialize components"),
    )
    .expect("write components.json");

    let output = Command::cargo_bin("blokgen")
        .expect("blokgen binary")
        .current_dir(root.as_str())
        .env_remove("RUST_LOG")
        .arg("generate")
        .output()
        .expect("run blokgen generate");
    assert!(
        output.status.success(),
        "generate failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    world
        .artifacts
        .push(String::from_utf8(output.stdout).expect("utf8 artifact"));
}

#[when("I run blokgen generate")]
async fn run_generate(world: &mut BlokgenWorld) {
    generate(world);
}

#[when("I run blokgen generate again")]
async fn run_generate_again(world: &mut BlokgenWorld) {
    generate(world);
}

#[then(expr = "the {string} type has the member {string}")]
async fn assert_member(world: &mut BlokgenWorld, type_name: String, member: String) {
    let members = interface_members(artifact(world), &type_name)
        .unwrap_or_else(|| panic!("no interface {type_name} in:\n{}", artifact(world)));
    assert!(
        members.contains(&member.as_str()),
        "expected `{member}` in {type_name}, got {members:?}"
    );
}

#[then(expr = "the {string} type requires the instance id and component discriminator")]
async fn assert_required_identity(world: &mut BlokgenWorld, type_name: String) {
    let members = interface_members(artifact(world), &type_name).expect("interface present");
    assert!(members.contains(&"_uid: string;"), "got {members:?}");
    assert!(
        members.iter().any(|m| m.starts_with("component: \"")),
        "got {members:?}"
    );
}

#[then(expr = "the artifact does not mention {string}")]
async fn assert_not_mentioned(world: &mut BlokgenWorld, needle: String) {
    assert!(!artifact(world).contains(&needle), "found {needle}");
}

#[then(expr = "the {string} member of {string} excludes the {string} and {string} link types")]
async fn assert_multilink_exclusions(
    world: &mut BlokgenWorld,
    field: String,
    type_name: String,
    first: String,
    second: String,
) {
    let members = interface_members(artifact(world), &type_name).expect("interface present");
    let prefix = format!("{field}?: Exclude<");
    let member = members
        .iter()
        .find(|m| m.starts_with(&prefix))
        .unwrap_or_else(|| panic!("no `{field}` member in {members:?}"));
    for linktype in [first, second] {
        let variant = format!("{{ linktype?: \"{linktype}\" }}");
        assert!(member.contains(&variant), "{member} does not exclude {linktype}");
    }
}

#[then(expr = "the artifact declares {string} exactly once")]
async fn assert_declared_once(world: &mut BlokgenWorld, type_name: String) {
    assert_eq!(declaration_count(artifact(world), &type_name), 1);
}

#[then("both artifacts are byte-identical")]
async fn assert_identical(world: &mut BlokgenWorld) {
    assert_eq!(world.artifacts.len(), 2);
    assert_eq!(world.artifacts[0], world.artifacts[1]);
}

// Migration

#[given(expr = "a rollback directory containing {string}")]
async fn rollback_dir_with(world: &mut BlokgenWorld, file: String) {
    let dir = rollback_dir(world);
    fs::create_dir_all(&dir).expect("create rollback dir");
    fs::write(
        dir.join(&file),
        r#"{"component":"page","created":true,"entries":[]}"#,
    )
    .expect("write snapshot");
    // A neighbour for another field must not match.
    fs::write(dir.join("rollback_page_title.json"), "{}").expect("write neighbour");
}

#[given("an empty rollback directory")]
async fn empty_rollback_dir(world: &mut BlokgenWorld) {
    let dir = rollback_dir(world);
    fs::create_dir_all(&dir).expect("create rollback dir");
}

#[given(expr = "a space with {int} stories using {string}")]
async fn space_with_stories(world: &mut BlokgenWorld, count: u32, component: String) {
    let entries: Vec<ContentEntry> = (1..=count)
        .map(|id| {
            ContentEntry::new(json!({
                "id": id,
                "name": format!("Story {id}"),
                "content": {
                    "_uid": format!("root-{id}"),
                    "component": component,
                    "body": [{ "_uid": format!("hero-{id}"), "component": "hero", "headline": "Hi" }]
                }
            }))
        })
        .collect();
    world.originals = entries.clone();
    world.api = Some(InMemoryContentApi::new(entries));
}

#[when(expr = "I check the rollback directory for {string} and {string}")]
async fn check_rollback_dir(world: &mut BlokgenWorld, component: String, field: String) {
    let target = MigrationTarget::new(component, field);
    world.found = existing_rollback_files(&store(world), &target).expect("existence check");
}

#[when(expr = "I create a rollback file for {string} and {string} with {int} entry")]
async fn create_snapshot(world: &mut BlokgenWorld, component: String, field: String, count: u32) {
    let target = MigrationTarget::new(component, field);
    let entries = (1..=count)
        .map(|id| ContentEntry::new(json!({ "id": id, "content": { "component": "page" } })))
        .collect();
    create_rollback_file(&store(world), &target, entries).expect("create rollback file");
}

#[when(expr = "I migrate {string} and {string} by removing the field")]
async fn migrate_remove(world: &mut BlokgenWorld, component: String, field: String) {
    let target = MigrationTarget::new(component, field);
    let script = MigrationScript::new(target.clone(), vec![ScriptOp::Remove { field: None }]);
    let settings = MigrateSettings {
        rollback_dir: rollback_dir(world),
        dry_run: false,
    };
    let store = store(world);
    let result = run_migration(&settings, &target, api(world), &store, &script).await;
    world.last_error = result.err();
}

#[when(expr = "I roll back {string} and {string}")]
async fn roll_back(world: &mut BlokgenWorld, component: String, field: String) {
    let target = MigrationTarget::new(component, field);
    let settings = RollbackSettings {
        rollback_dir: rollback_dir(world),
        ..RollbackSettings::default()
    };
    let store = store(world);
    let result = run_rollback(&settings, &target, api(world), &store).await;
    world.last_error = result.err();
}

#[then(expr = "the existing rollback files are {string}")]
async fn assert_found(world: &mut BlokgenWorld, file: String) {
    assert_eq!(world.found, vec![file]);
}

#[then("there are no existing rollback files")]
async fn assert_none_found(world: &mut BlokgenWorld) {
    assert!(world.found.is_empty(), "found {:?}", world.found);
}

#[then(expr = "the rollback file {string} has component {string} and is marked created")]
async fn assert_snapshot_file(world: &mut BlokgenWorld, file: String, component: String) {
    let path = rollback_dir(world).join(&file);
    let doc: Value = serde_json::from_str(&fs::read_to_string(&path).expect("read snapshot"))
        .expect("parse snapshot");
    assert_eq!(doc["component"], json!(component));
    assert_eq!(doc["created"], json!(true));
}

#[then("the rollback fails because no snapshot exists")]
async fn assert_not_found(world: &mut BlokgenWorld) {
    match &world.last_error {
        Some(ToolError::Migration(MigrateError::RollbackNotFound { .. })) => {}
        other => panic!("expected RollbackNotFound, got {other:?}"),
    }
}

#[then("the migration fails with a rollback conflict")]
async fn assert_conflict(world: &mut BlokgenWorld) {
    match &world.last_error {
        Some(err @ ToolError::Migration(MigrateError::RollbackConflict { .. })) => {
            assert_eq!(err.exit_code(), 2);
        }
        other => panic!("expected RollbackConflict, got {other:?}"),
    }
}

#[then(expr = "{int} stories were pushed")]
async fn assert_pushed(world: &mut BlokgenWorld, count: usize) {
    let pushed = api(world).put_log().expect("put log");
    assert_eq!(pushed.len(), count, "pushes: {pushed:?}");
}

#[then("every story matches its original content byte for byte")]
async fn assert_restored(world: &mut BlokgenWorld) {
    assert!(world.last_error.is_none(), "rollback failed: {:?}", world.last_error);
    let current = api(world).entries().expect("entries");
    assert_eq!(current.len(), world.originals.len());
    for (now, before) in current.iter().zip(&world.originals) {
        assert_eq!(
            serde_json::to_vec(now).expect("serialize"),
            serde_json::to_vec(before).expect("serialize")
        );
    }
}

#[tokio::main]
async fn main() {
    let features_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("features");
    BlokgenWorld::cucumber().run(features_path).await;
}
