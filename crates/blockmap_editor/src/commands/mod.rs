//! Undo/redo command log
//!
//! Records are plain values: each one stores the cell values (or whole
//! store snapshots) from before and after the edit, and undo/redo replay
//! those recorded values instead of re-running the edit.

use blockmap_core::{BlockChange, BlockStore, GridRegion};
use blockmap_core::{MapError, Result};

/// What a record changes, with enough state to restore either side
#[derive(Debug, Clone, PartialEq)]
pub enum EditAction {
    /// Cell edits that left both grids' dimensions alone
    Blocks {
        interior: Vec<BlockChange>,
        border: Vec<BlockChange>,
    },
    /// Structural edits (resize, shift, border resize)
    Snapshot {
        before: BlockStore,
        after: BlockStore,
    },
}

/// One user-visible or scripted edit
#[derive(Debug, Clone, PartialEq)]
pub struct EditRecord {
    pub description: String,
    pub action: EditAction,
}

impl EditRecord {
    /// Build a record from the difference between two stores
    ///
    /// Returns `None` when the stores are identical. Forced snapshots are
    /// used for structural edits even when dimensions did not change.
    pub fn from_diff(
        description: impl Into<String>,
        before: &BlockStore,
        after: &BlockStore,
        force_snapshot: bool,
    ) -> Option<Self> {
        if before == after {
            return None;
        }
        let cell_changes = if force_snapshot {
            None
        } else {
            before
                .blocks()
                .diff(after.blocks())
                .zip(before.border().diff(after.border()))
        };
        let action = match cell_changes {
            Some((interior, border)) => EditAction::Blocks { interior, border },
            None => EditAction::Snapshot {
                before: before.clone(),
                after: after.clone(),
            },
        };
        Some(Self {
            description: description.into(),
            action,
        })
    }

    /// Number of cells written by this record
    pub fn changed_cells(&self) -> usize {
        match &self.action {
            EditAction::Blocks { interior, border } => interior.len() + border.len(),
            EditAction::Snapshot { after, .. } => after.blocks().len() + after.border().len(),
        }
    }
}

/// Which side of a record to restore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayDirection {
    Undo,
    Redo,
}

/// Summary of a replayed record, for notifications
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayOutcome {
    /// Regions whose contents changed, with the number of cells written
    pub regions: Vec<(GridRegion, usize)>,
    /// `(old, new)` interior dimensions when they changed
    pub resized: Option<((i32, i32), (i32, i32))>,
    /// `(old, new)` border dimensions when they changed
    pub border_resized: Option<((i32, i32), (i32, i32))>,
}

/// Restore one side of a record into a store
pub fn replay(
    store: &mut BlockStore,
    record: &EditRecord,
    direction: ReplayDirection,
) -> ReplayOutcome {
    let mut outcome = ReplayOutcome::default();
    match &record.action {
        EditAction::Blocks { interior, border } => {
            let regions = [(GridRegion::Interior, interior), (GridRegion::Border, border)];
            for (region, changes) in regions {
                if changes.is_empty() {
                    continue;
                }
                let grid = store.grid_mut(region);
                let mut written = 0;
                for change in changes {
                    let value = match direction {
                        ReplayDirection::Undo => change.before,
                        ReplayDirection::Redo => change.after,
                    };
                    match grid.set(change.x, change.y, value) {
                        Ok(_) => written += 1,
                        Err(e) => tracing::warn!("Skipping stale history cell: {}", e),
                    }
                }
                outcome.regions.push((region, written));
            }
        }
        EditAction::Snapshot { before, after } => {
            let target = match direction {
                ReplayDirection::Undo => before,
                ReplayDirection::Redo => after,
            };
            let old_dims = (store.width(), store.height());
            let old_border = (store.border_width(), store.border_height());
            *store = target.clone();
            let new_dims = (store.width(), store.height());
            let new_border = (store.border_width(), store.border_height());
            if old_dims != new_dims {
                outcome.resized = Some((old_dims, new_dims));
            }
            if old_border != new_border {
                outcome.border_resized = Some((old_border, new_border));
            }
            outcome.regions.push((GridRegion::Interior, store.blocks().len()));
            outcome.regions.push((GridRegion::Border, store.border().len()));
        }
    }
    outcome
}

/// Linear undo/redo history
///
/// `cursor` counts the records currently applied. Pushing after an undo
/// drops every record past the cursor.
#[derive(Debug, Clone)]
pub struct EditHistory {
    records: Vec<EditRecord>,
    cursor: usize,
    /// Cursor position that matches the saved state, if still reachable
    clean: Option<usize>,
    limit: Option<usize>,
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl EditHistory {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            cursor: 0,
            clean: Some(0),
            limit: None,
        }
    }

    /// A history that keeps at most `limit` records
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit: limit.filter(|l| *l > 0),
            ..Self::new()
        }
    }

    /// Append a record, discarding anything that was undone
    pub fn push(&mut self, record: EditRecord) {
        self.records.truncate(self.cursor);
        if self.clean.is_some_and(|clean| clean > self.cursor) {
            self.clean = None;
        }
        tracing::debug!(
            "History push '{}' ({} cells)",
            record.description,
            record.changed_cells()
        );
        self.records.push(record);
        self.cursor += 1;

        if let Some(limit) = self.limit {
            while self.records.len() > limit {
                self.records.remove(0);
                self.cursor -= 1;
                self.clean = match self.clean {
                    Some(0) | None => None,
                    Some(clean) => Some(clean - 1),
                };
            }
        }
    }

    /// Step back, returning the record whose `before` side to restore
    pub fn undo(&mut self) -> Result<&EditRecord> {
        if self.cursor == 0 {
            return Err(MapError::UndoHistoryEmpty);
        }
        self.cursor -= 1;
        Ok(&self.records[self.cursor])
    }

    /// Step forward, returning the record whose `after` side to restore
    pub fn redo(&mut self) -> Result<&EditRecord> {
        let record = self
            .records
            .get(self.cursor)
            .ok_or(MapError::RedoUnavailable)?;
        self.cursor += 1;
        Ok(record)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.records.len()
    }

    /// Get description of next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.records.get(i))
            .map(|r| r.description.as_str())
    }

    /// Get description of next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.records
            .get(self.cursor)
            .map(|r| r.description.as_str())
    }

    /// Number of records, applied or undone
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records currently applied
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether the applied records match the last saved state
    pub fn is_clean(&self) -> bool {
        self.clean == Some(self.cursor)
    }

    /// Mark the current position as the saved state
    pub fn set_clean(&mut self) {
        self.clean = Some(self.cursor);
    }

    /// Drop every record, treating the current state as saved
    pub fn clear(&mut self) {
        self.records.clear();
        self.cursor = 0;
        self.clean = Some(0);
    }
}
