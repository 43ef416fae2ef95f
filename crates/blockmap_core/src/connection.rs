//! Connections from one map's edge to a neighbouring map

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Edge (or vertical transition) a connection is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionDirection {
    /// Top edge
    #[default]
    Up,
    /// Bottom edge
    Down,
    /// Left edge
    Left,
    /// Right edge
    Right,
    /// Diving underwater
    Dive,
    /// Surfacing from underwater
    Emerge,
}

impl ConnectionDirection {
    /// Whether the connection joins two map edges side by side
    pub fn is_cardinal(&self) -> bool {
        matches!(
            self,
            ConnectionDirection::Up
                | ConnectionDirection::Down
                | ConnectionDirection::Left
                | ConnectionDirection::Right
        )
    }

    /// Get the opposite direction
    pub fn opposite(&self) -> ConnectionDirection {
        match self {
            ConnectionDirection::Up => ConnectionDirection::Down,
            ConnectionDirection::Down => ConnectionDirection::Up,
            ConnectionDirection::Left => ConnectionDirection::Right,
            ConnectionDirection::Right => ConnectionDirection::Left,
            ConnectionDirection::Dive => ConnectionDirection::Emerge,
            ConnectionDirection::Emerge => ConnectionDirection::Dive,
        }
    }
}

/// A link from this map to a neighbour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapConnection {
    /// Unique ID for this connection
    pub id: Uuid,
    pub direction: ConnectionDirection,
    /// Offset of the neighbour along the shared edge, in blocks
    pub offset: i32,
    /// Name of the connected map
    pub map_name: String,
}

impl MapConnection {
    pub fn new(direction: ConnectionDirection, offset: i32, map_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            direction,
            offset,
            map_name: map_name.into(),
        }
    }

    /// The connection the neighbour needs for the link to be symmetric
    pub fn mirrored(&self, this_map_name: impl Into<String>) -> Self {
        Self::new(self.direction.opposite(), -self.offset, this_map_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinal_directions() {
        assert!(ConnectionDirection::Up.is_cardinal());
        assert!(ConnectionDirection::Right.is_cardinal());
        assert!(!ConnectionDirection::Dive.is_cardinal());
        assert!(!ConnectionDirection::Emerge.is_cardinal());
    }

    #[test]
    fn test_mirrored_connection() {
        let connection = MapConnection::new(ConnectionDirection::Left, 4, "Route101");
        let mirror = connection.mirrored("OldaleTown");
        assert_eq!(mirror.direction, ConnectionDirection::Right);
        assert_eq!(mirror.offset, -4);
        assert_eq!(mirror.map_name, "OldaleTown");
        assert_ne!(mirror.id, connection.id);
    }

    #[test]
    fn test_direction_serializes_lowercase() {
        let json = serde_json::to_string(&ConnectionDirection::Emerge).unwrap();
        assert_eq!(json, "\"emerge\"");
    }
}
