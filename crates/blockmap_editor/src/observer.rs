//! Change notification for map listeners
//!
//! Listeners are called synchronously, in registration order, after the
//! map has finished the mutation they describe.

use blockmap_core::{Block, GridRegion};

/// Handle returned by [`ObserverRegistry::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// A bulk edit that was applied without per-cell notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkChange {
    pub region: GridRegion,
    /// Number of cells whose value changed
    pub changed: usize,
}

/// Map-level changes that are not plain cell writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapChange {
    Resized {
        old: (i32, i32),
        new: (i32, i32),
    },
    BorderResized {
        old: (i32, i32),
        new: (i32, i32),
    },
    Shifted {
        dx: i32,
        dy: i32,
    },
    /// An explicit redraw was requested
    NeedsRedraw,
    /// Name, header, connections, events or layer settings changed
    Metadata,
    TilesetsChanged,
}

/// Listener for map changes; every method defaults to doing nothing
pub trait MapObserver {
    /// A single notified cell write
    fn on_block_changed(&mut self, _x: i32, _y: i32, _prev: Block, _new: Block) {}

    fn on_bulk_changed(&mut self, _change: BulkChange) {}

    fn on_map_changed(&mut self, _change: MapChange) {}
}

/// Ordered set of listeners
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<(ObserverId, Box<dyn MapObserver>)>,
    next_id: u64,
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: Box<dyn MapObserver>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    /// Remove a listener, returning it if it was registered
    pub fn unsubscribe(&mut self, id: ObserverId) -> Option<Box<dyn MapObserver>> {
        let index = self.observers.iter().position(|(oid, _)| *oid == id)?;
        Some(self.observers.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn block_changed(&mut self, x: i32, y: i32, prev: Block, new: Block) {
        for (_, observer) in &mut self.observers {
            observer.on_block_changed(x, y, prev, new);
        }
    }

    pub fn bulk_changed(&mut self, change: BulkChange) {
        for (_, observer) in &mut self.observers {
            observer.on_bulk_changed(change);
        }
    }

    pub fn map_changed(&mut self, change: MapChange) {
        for (_, observer) in &mut self.observers {
            observer.on_map_changed(change);
        }
    }
}
