//! Error taxonomy shared by the block grid, fills and edit history

use thiserror::Error;

/// Errors raised by block, grid and history operations.
///
/// Every operation that returns one of these leaves the map untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// Coordinate outside the current grid bounds
    #[error("coordinate ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfRange {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },

    /// Resize or allocation requested with unusable dimensions
    #[error("invalid dimensions {width}x{height}: {reason}")]
    InvalidDimension {
        width: i32,
        height: i32,
        reason: &'static str,
    },

    /// Decoded block fields that cannot be packed into a raw value
    #[error("block {field} value {value} exceeds the maximum of {max}")]
    InconsistentBlockEncoding {
        field: &'static str,
        value: i64,
        max: u16,
    },

    /// Undo requested with nothing to undo
    #[error("nothing to undo")]
    UndoHistoryEmpty,

    /// Redo requested with nothing to redo
    #[error("nothing to redo")]
    RedoUnavailable,

    /// Event handle that no longer refers to a live event
    #[error("unknown event handle {0}")]
    UnknownEvent(String),

    /// A selection-based operation was requested without a selection
    #[error("no metatile selection is active")]
    MissingSelection,

    /// A selection whose size does not match its contents
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, MapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = MapError::OutOfRange {
            x: 10,
            y: -1,
            width: 8,
            height: 8,
        };
        assert_eq!(
            err.to_string(),
            "coordinate (10, -1) is outside the 8x8 grid"
        );

        let err = MapError::InconsistentBlockEncoding {
            field: "elevation",
            value: 16,
            max: 15,
        };
        assert_eq!(
            err.to_string(),
            "block elevation value 16 exceeds the maximum of 15"
        );
    }
}
