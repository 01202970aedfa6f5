use crate::error::{MigrateError, MigrateResult, TransportError, TransportOp};
use crate::ports::{ContentApi, EntryTransform, RollbackStore};
use blokgen_types::{ContentEntry, MigrationTarget, RollbackSnapshot, is_rollback_file_for};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Lifecycle of one migration batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Pending,
    Snapshotted,
    Applied,
    RolledBack,
}

/// What happens to the snapshot after a successful rollback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackRetention {
    #[default]
    Keep,
    Delete,
}

#[derive(Debug, Clone, Default)]
pub struct MigrationOptions {
    /// Transform in memory and report, without snapshotting or pushing.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub target: MigrationTarget,
    pub state: BatchState,
    pub fetched: usize,
    /// Ids of the entries the transform changed, in fetch order.
    pub changed: Vec<String>,
    pub snapshot_file: Option<String>,
    pub pushed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackReport {
    pub target: MigrationTarget,
    pub state: BatchState,
    pub files: Vec<String>,
    pub restored: usize,
    pub removed: bool,
}

/// Snapshot files in the store for exactly this component + field pair.
pub fn existing_rollback_files(
    store: &dyn RollbackStore,
    target: &MigrationTarget,
) -> MigrateResult<Vec<String>> {
    let mut files: Vec<String> = store
        .list()
        .map_err(MigrateError::Store)?
        .into_iter()
        .filter(|name| is_rollback_file_for(name, &target.component, &target.field))
        .collect();
    files.sort();
    Ok(files)
}

/// Persist the pre-image of `entries` for `target`. Fails with a conflict if a snapshot exists.
pub fn create_rollback_file(
    store: &dyn RollbackStore,
    target: &MigrationTarget,
    entries: Vec<ContentEntry>,
) -> MigrateResult<String> {
    let file = target.rollback_file_name();
    let snapshot = RollbackSnapshot::new(target, entries);
    let bytes = serde_json::to_vec_pretty(&snapshot).map_err(|e| MigrateError::Store(e.into()))?;

    if !store.create_new(&file, &bytes).map_err(MigrateError::Store)? {
        return Err(MigrateError::RollbackConflict {
            target: target.clone(),
            file,
        });
    }
    debug!(migration = %target, file = %file, entries = snapshot.entries.len(), "rollback snapshot written");
    Ok(file)
}

/// Apply `transform` to every entry containing `target.component`.
///
/// Order: conflict check, fetch, transform in memory, snapshot the entries that changed,
/// push them one at a time. A push failure stops the batch; entries pushed before it stay
/// pushed and the snapshot stays on disk for [`rollback_migration`].
pub async fn apply_migration(
    api: &dyn ContentApi,
    store: &dyn RollbackStore,
    target: &MigrationTarget,
    transform: &dyn EntryTransform,
    opts: &MigrationOptions,
) -> MigrateResult<MigrationReport> {
    if !opts.dry_run {
        if let Some(file) = existing_rollback_files(store, target)?.into_iter().next() {
            return Err(MigrateError::RollbackConflict {
                target: target.clone(),
                file,
            });
        }
    }

    let space = api.credentials().space_id;
    let fetched = api
        .get_entries(&target.component)
        .await
        .map_err(|e| TransportError::new(TransportOp::Fetch, target, None, &e))?;
    info!(migration = %target, space = %space, entries = fetched.len(), "fetched entries");

    let mut originals = Vec::new();
    let mut updated = Vec::new();
    for entry in &fetched {
        let mut candidate = entry.clone();
        transform
            .transform(&mut candidate)
            .map_err(|source| MigrateError::Transform {
                entry_id: entry.display_id(),
                source,
            })?;
        if candidate != *entry {
            originals.push(entry.clone());
            updated.push(candidate);
        }
    }
    let changed: Vec<String> = updated.iter().map(ContentEntry::display_id).collect();

    let mut report = MigrationReport {
        target: target.clone(),
        state: BatchState::Pending,
        fetched: fetched.len(),
        changed,
        snapshot_file: None,
        pushed: 0,
    };

    if opts.dry_run {
        info!(migration = %target, changed = report.changed.len(), "dry run; nothing written");
        return Ok(report);
    }
    if updated.is_empty() {
        info!(migration = %target, "transform changed no entries; nothing to snapshot");
        report.state = BatchState::Applied;
        return Ok(report);
    }

    report.snapshot_file = Some(create_rollback_file(store, target, originals)?);
    report.state = BatchState::Snapshotted;

    for entry in &updated {
        if let Err(e) = api.put_entry(entry).await {
            error!(
                migration = %target,
                entry_id = %entry.display_id(),
                pushed = report.pushed,
                remaining = updated.len() - report.pushed,
                "push failed; batch left snapshotted"
            );
            return Err(TransportError::new(TransportOp::Push, target, entry.id(), &e).into());
        }
        report.pushed += 1;
        debug!(migration = %target, entry_id = %entry.display_id(), "entry pushed");
    }

    report.state = BatchState::Applied;
    info!(migration = %target, pushed = report.pushed, "migration applied");
    Ok(report)
}

/// Push every stored pre-image for `target` back verbatim.
pub async fn rollback_migration(
    api: &dyn ContentApi,
    store: &dyn RollbackStore,
    target: &MigrationTarget,
    retention: RollbackRetention,
) -> MigrateResult<RollbackReport> {
    let files = existing_rollback_files(store, target)?;
    if files.is_empty() {
        return Err(MigrateError::RollbackNotFound {
            target: target.clone(),
        });
    }

    let mut restored = 0;
    for file in &files {
        let bytes = store.read(file).map_err(MigrateError::Store)?;
        let snapshot: RollbackSnapshot =
            serde_json::from_slice(&bytes).map_err(|source| MigrateError::Snapshot {
                file: file.clone(),
                source,
            })?;
        if snapshot.component != target.component {
            warn!(file = %file, component = %snapshot.component, "snapshot records a different component");
        }

        for entry in &snapshot.entries {
            api.put_entry(entry)
                .await
                .map_err(|e| TransportError::new(TransportOp::Push, target, entry.id(), &e))?;
            restored += 1;
            debug!(migration = %target, entry_id = %entry.display_id(), "entry restored");
        }
    }

    let removed = retention == RollbackRetention::Delete;
    if removed {
        for file in &files {
            store.remove(file).map_err(MigrateError::Store)?;
        }
    }

    info!(migration = %target, restored, removed, "migration rolled back");
    Ok(RollbackReport {
        target: target.clone(),
        state: BatchState::RolledBack,
        files,
        restored,
        removed,
    })
}
