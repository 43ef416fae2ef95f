//! Queued map events and their script callbacks

use blockmap_core::Block;
use blockmap_editor::{MapChange, MapObserver};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// A map change waiting to be handed to the script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptEvent {
    BlockChanged {
        x: i32,
        y: i32,
        prev: Block,
        new: Block,
    },
    MapResized {
        old: (i32, i32),
        new: (i32, i32),
    },
    MapShifted {
        dx: i32,
        dy: i32,
    },
    BorderResized {
        old: (i32, i32),
        new: (i32, i32),
    },
}

impl ScriptEvent {
    /// Name of the script function that handles this event
    pub fn callback_name(&self) -> &'static str {
        match self {
            ScriptEvent::BlockChanged { .. } => "onBlockChanged",
            ScriptEvent::MapResized { .. } => "onMapResized",
            ScriptEvent::MapShifted { .. } => "onMapShifted",
            ScriptEvent::BorderResized { .. } => "onBorderResized",
        }
    }
}

pub(crate) type EventQueue = Rc<RefCell<VecDeque<ScriptEvent>>>;

/// Map observer that queues events for later dispatch
///
/// Callbacks cannot run while the map is mid-mutation, so the relay only
/// records what happened.
pub(crate) struct EventRelay {
    queue: EventQueue,
}

impl EventRelay {
    pub(crate) fn new(queue: EventQueue) -> Self {
        Self { queue }
    }
}

impl MapObserver for EventRelay {
    fn on_block_changed(&mut self, x: i32, y: i32, prev: Block, new: Block) {
        self.queue
            .borrow_mut()
            .push_back(ScriptEvent::BlockChanged { x, y, prev, new });
    }

    fn on_map_changed(&mut self, change: MapChange) {
        let event = match change {
            MapChange::Resized { old, new } => ScriptEvent::MapResized { old, new },
            MapChange::Shifted { dx, dy } => ScriptEvent::MapShifted { dx, dy },
            MapChange::BorderResized { old, new } => ScriptEvent::BorderResized { old, new },
            _ => return,
        };
        self.queue.borrow_mut().push_back(event);
    }
}
