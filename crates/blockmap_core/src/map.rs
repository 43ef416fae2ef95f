//! A map: block storage plus header metadata, connections and events

use crate::{
    BlockStore, ConnectionDirection, EventGroup, EventStore, MapConnection,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use uuid::Uuid;

static CAMEL_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").expect("static regex"));
static REPEATED_UNDERSCORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_+").expect("static regex"));

/// Header fields carried with a map but not interpreted by the editor
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MapHeader {
    pub song: String,
    pub location: String,
    pub requires_flash: bool,
    pub is_flyable: bool,
    pub weather: String,
    pub map_type: String,
    pub show_location: bool,
    pub allow_running: bool,
    pub allow_biking: bool,
    pub allow_escape_rope: bool,
    pub floor_number: i32,
    pub battle_scene: String,
    /// Map whose events this map reuses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_events_map: Option<String>,
    /// Map whose scripts this map reuses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_scripts_map: Option<String>,
    /// Project-specific header fields
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_headers: BTreeMap<String, serde_json::Value>,
}

/// A complete map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Map {
    name: String,
    constant_name: String,
    pub layout_id: String,
    #[serde(default)]
    pub header: MapHeader,
    /// Label of the primary tileset
    pub primary_tileset: String,
    /// Label of the secondary tileset
    pub secondary_tileset: String,
    pub store: BlockStore,
    #[serde(default)]
    pub connections: Vec<MapConnection>,
    #[serde(default)]
    pub events: EventStore,
    /// Metatile layer indices, drawn first to last
    pub metatile_layer_order: Vec<usize>,
    /// Opacity per entry of `metatile_layer_order`
    pub metatile_layer_opacity: Vec<f32>,
}

impl Map {
    /// Create a map around existing block storage
    pub fn new(name: impl Into<String>, store: BlockStore) -> Self {
        let name = name.into();
        Self {
            constant_name: Self::map_constant_from_name(&name),
            layout_id: format!("LAYOUT_{}", Self::screaming_name(&name)),
            name,
            header: MapHeader::default(),
            primary_tileset: String::new(),
            secondary_tileset: String::new(),
            store,
            connections: Vec::new(),
            events: EventStore::new(),
            metatile_layer_order: vec![0, 1, 2],
            metatile_layer_opacity: vec![1.0, 1.0, 1.0],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constant_name(&self) -> &str {
        &self.constant_name
    }

    /// Rename the map, recomputing its constant
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.constant_name = Self::map_constant_from_name(&self.name);
    }

    fn screaming_name(name: &str) -> String {
        let split = CAMEL_BOUNDARY.replace_all(name, "${1}_${2}");
        let upper = split.to_uppercase();
        REPEATED_UNDERSCORES.replace_all(&upper, "_").into_owned()
    }

    /// Transform a name like `GraniteCave_B1F` into `MAP_GRANITE_CAVE_B1F`
    pub fn map_constant_from_name(name: &str) -> String {
        let constant = format!("MAP_{}", Self::screaming_name(name));
        let constant = REPEATED_UNDERSCORES.replace_all(&constant, "_");
        // SSTidal splits as SSTIDAL rather than SS_TIDAL
        constant.replace("SSTIDAL", "SS_TIDAL")
    }

    /// Label of an event group's table, e.g. `PetalburgCity_MapWarps`
    pub fn events_label_from_name(name: &str, group: EventGroup) -> Option<String> {
        group
            .label_suffix()
            .map(|suffix| format!("{}_{}", name, suffix))
    }

    pub fn object_events_label_from_name(name: &str) -> String {
        format!("{}_ObjectEvents", name)
    }

    pub fn warp_events_label_from_name(name: &str) -> String {
        format!("{}_MapWarps", name)
    }

    pub fn coord_events_label_from_name(name: &str) -> String {
        format!("{}_MapCoordEvents", name)
    }

    pub fn bg_events_label_from_name(name: &str) -> String {
        format!("{}_MapBGEvents", name)
    }

    pub fn width(&self) -> i32 {
        self.store.width()
    }

    pub fn height(&self) -> i32 {
        self.store.height()
    }

    pub fn border_width(&self) -> i32 {
        self.store.border_width()
    }

    pub fn border_height(&self) -> i32 {
        self.store.border_height()
    }

    /// Add a connection to a neighbouring map
    pub fn add_connection(&mut self, connection: MapConnection) {
        self.connections.push(connection);
    }

    /// Remove a connection by ID
    pub fn remove_connection(&mut self, id: Uuid) -> Option<MapConnection> {
        self.connections
            .iter()
            .position(|c| c.id == id)
            .map(|idx| self.connections.remove(idx))
    }

    /// Connections attached to one edge
    pub fn connections_in(&self, direction: ConnectionDirection) -> Vec<&MapConnection> {
        self.connections
            .iter()
            .filter(|c| c.direction == direction)
            .collect()
    }

    /// Layer order paired with opacity; missing opacities count as opaque
    pub fn layer_passes(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.metatile_layer_order
            .iter()
            .enumerate()
            .map(|(i, layer)| {
                let opacity = self
                    .metatile_layer_opacity
                    .get(i)
                    .copied()
                    .unwrap_or(1.0)
                    .clamp(0.0, 1.0);
                (*layer, opacity)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Block, Event, EventKind};

    fn store() -> BlockStore {
        BlockStore::new(4, 4, 2, 2, Block::default()).unwrap()
    }

    #[test]
    fn test_map_constant_from_name() {
        assert_eq!(
            Map::map_constant_from_name("GraniteCave_B1F"),
            "MAP_GRANITE_CAVE_B1F"
        );
        assert_eq!(
            Map::map_constant_from_name("PetalburgCity"),
            "MAP_PETALBURG_CITY"
        );
        assert_eq!(
            Map::map_constant_from_name("SSTidalCorridor"),
            "MAP_SS_TIDAL_CORRIDOR"
        );
        assert_eq!(Map::map_constant_from_name("Route101__x"), "MAP_ROUTE101_X");
    }

    #[test]
    fn test_set_name_updates_constant() {
        let mut map = Map::new("LittlerootTown", store());
        assert_eq!(map.constant_name(), "MAP_LITTLEROOT_TOWN");
        assert_eq!(map.layout_id, "LAYOUT_LITTLEROOT_TOWN");
        map.set_name("OldaleTown");
        assert_eq!(map.name(), "OldaleTown");
        assert_eq!(map.constant_name(), "MAP_OLDALE_TOWN");
    }

    #[test]
    fn test_event_labels() {
        assert_eq!(
            Map::object_events_label_from_name("PetalburgCity"),
            "PetalburgCity_ObjectEvents"
        );
        assert_eq!(
            Map::warp_events_label_from_name("PetalburgCity"),
            "PetalburgCity_MapWarps"
        );
        assert_eq!(
            Map::coord_events_label_from_name("PetalburgCity"),
            "PetalburgCity_MapCoordEvents"
        );
        assert_eq!(
            Map::bg_events_label_from_name("PetalburgCity"),
            "PetalburgCity_MapBGEvents"
        );
        assert_eq!(
            Map::events_label_from_name("Route104", EventGroup::Coord).as_deref(),
            Some("Route104_MapCoordEvents")
        );
        assert_eq!(Map::events_label_from_name("Route104", EventGroup::Heal), None);
    }

    #[test]
    fn test_connection_management() {
        let mut map = Map::new("OldaleTown", store());
        let north = MapConnection::new(ConnectionDirection::Up, 0, "Route103");
        let north_id = north.id;
        map.add_connection(north);
        map.add_connection(MapConnection::new(ConnectionDirection::Left, 0, "Route102"));

        assert_eq!(map.connections_in(ConnectionDirection::Up).len(), 1);
        assert!(map.remove_connection(north_id).is_some());
        assert!(map.connections_in(ConnectionDirection::Up).is_empty());
        assert_eq!(map.connections.len(), 1);
    }

    #[test]
    fn test_layer_passes_default_opacity() {
        let mut map = Map::new("Test", store());
        map.metatile_layer_order = vec![2, 0];
        map.metatile_layer_opacity = vec![0.5];
        let passes: Vec<_> = map.layer_passes().collect();
        assert_eq!(passes, vec![(2, 0.5), (0, 1.0)]);
    }

    #[test]
    fn test_persisted_fields_round_trip() {
        let mut map = Map::new("Route101", store());
        map.store.set(1, 2, Block::from_raw(0x3005)).unwrap();
        map.store.set_border(0, 1, Block::from_raw(0x01D4)).unwrap();
        map.events.add(Event::new(EventKind::Warp, 1, 1));
        map.add_connection(MapConnection::new(ConnectionDirection::Down, 3, "OldaleTown"));
        map.metatile_layer_opacity = vec![1.0, 0.5, 0.25];

        let json = serde_json::to_string(&map).unwrap();
        let back: Map = serde_json::from_str(&json).unwrap();
        assert_eq!(back.store, map.store);
        assert_eq!(back.connections, map.connections);
        assert_eq!(back.events.len(), 1);
        assert_eq!(back.metatile_layer_opacity, map.metatile_layer_opacity);
        assert_eq!(back.constant_name(), "MAP_ROUTE101");
    }
}
