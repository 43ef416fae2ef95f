//! Map events, owned by an arena and indexed by category

use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category an event is listed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventGroup {
    Object,
    Warp,
    Coord,
    Bg,
    Heal,
}

impl EventGroup {
    /// Suffix of the label generated for this group, if it has one
    pub fn label_suffix(&self) -> Option<&'static str> {
        match self {
            EventGroup::Object => Some("ObjectEvents"),
            EventGroup::Warp => Some("MapWarps"),
            EventGroup::Coord => Some("MapCoordEvents"),
            EventGroup::Bg => Some("MapBGEvents"),
            EventGroup::Heal => None,
        }
    }
}

/// Concrete event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Object,
    CloneObject,
    Warp,
    HealLocation,
    Trigger,
    WeatherTrigger,
    Sign,
    HiddenItem,
    SecretBase,
}

impl EventKind {
    /// The category this kind is always listed under
    pub fn group(&self) -> EventGroup {
        match self {
            EventKind::Object | EventKind::CloneObject => EventGroup::Object,
            EventKind::Warp => EventGroup::Warp,
            EventKind::Trigger | EventKind::WeatherTrigger => EventGroup::Coord,
            EventKind::Sign | EventKind::HiddenItem | EventKind::SecretBase => EventGroup::Bg,
            EventKind::HealLocation => EventGroup::Heal,
        }
    }
}

/// A placed event
///
/// The kind is fixed at construction: moving an event to another category
/// means removing it and adding a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    kind: EventKind,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub elevation: i32,
    /// Kind-specific fields (script label, flag, destination warp, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl Event {
    pub fn new(kind: EventKind, x: i32, y: i32) -> Self {
        Self {
            kind,
            x,
            y,
            elevation: 0,
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style property setter
    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn group(&self) -> EventGroup {
        self.kind.group()
    }
}

/// Handle to an event in an [`EventStore`]
///
/// Handles carry a generation so a handle to a removed event never aliases
/// an event added later in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId {
    index: usize,
    generation: u32,
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    generation: u32,
    event: Option<Event>,
}

/// Owning collection of a map's events plus the per-category ordering
///
/// Every id listed under a category refers to exactly one live slot, and
/// every live slot is listed exactly once, under its event's group.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "EventGroups", into = "EventGroups")]
pub struct EventStore {
    slots: Vec<Slot>,
    free: Vec<usize>,
    groups: BTreeMap<EventGroup, Vec<EventId>>,
}

/// Serialized shape: events listed by category
type EventGroups = BTreeMap<EventGroup, Vec<Event>>;

impl From<EventGroups> for EventStore {
    fn from(groups: EventGroups) -> Self {
        let mut store = EventStore::default();
        for (_, events) in groups {
            for event in events {
                store.add(event);
            }
        }
        store
    }
}

impl From<EventStore> for EventGroups {
    fn from(store: EventStore) -> Self {
        let mut groups = EventGroups::new();
        for (group, ids) in &store.groups {
            let events: Vec<Event> = ids
                .iter()
                .filter_map(|id| store.get(*id).cloned())
                .collect();
            if !events.is_empty() {
                groups.insert(*group, events);
            }
        }
        groups
    }
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of an event and list it under its group
    pub fn add(&mut self, event: Event) -> EventId {
        let group = event.group();
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.event = Some(event);
                EventId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    event: Some(event),
                });
                EventId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        };
        self.groups.entry(group).or_default().push(id);
        id
    }

    /// Remove an event from both its category and the owning collection
    pub fn remove(&mut self, id: EventId) -> Result<Event> {
        let event = self
            .slot_mut(id)
            .and_then(|slot| {
                let event = slot.event.take()?;
                slot.generation = slot.generation.wrapping_add(1);
                Some(event)
            })
            .ok_or_else(|| MapError::UnknownEvent(id.to_string()))?;
        self.free.push(id.index);
        if let Some(ids) = self.groups.get_mut(&event.group()) {
            ids.retain(|listed| *listed != id);
            if ids.is_empty() {
                self.groups.remove(&event.group());
            }
        }
        Ok(event)
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.event.as_ref())
    }

    /// Mutable access to an event's position and properties
    pub fn get_mut(&mut self, id: EventId) -> Option<&mut Event> {
        self.slot_mut(id).and_then(|slot| slot.event.as_mut())
    }

    fn slot_mut(&mut self, id: EventId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
    }

    /// Ids listed under one category, in insertion order
    pub fn group(&self, group: EventGroup) -> &[EventId] {
        self.groups.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every event, category by category
    pub fn all_events(&self) -> Vec<(EventId, &Event)> {
        self.groups
            .values()
            .flatten()
            .filter_map(|id| self.get(*id).map(|event| (*id, event)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events whose position is `(x, y)`
    pub fn events_at(&self, x: i32, y: i32) -> Vec<EventId> {
        self.all_events()
            .into_iter()
            .filter(|(_, event)| event.x == x && event.y == y)
            .map(|(id, _)| id)
            .collect()
    }
}
