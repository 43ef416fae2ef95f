//! Project-level editing configuration
//!
//! This module holds the settings that shape map editing (border size,
//! the block used for grown cells, value limits, render defaults) and
//! their JSON save/load.

mod file;

pub use file::*;

use blockmap_core::{
    validate_dimensions, Block, BlockLimits, MapError, Tileset, TilesetPair,
    DEFAULT_BORDER_HEIGHT, DEFAULT_BORDER_WIDTH,
};
use serde::{Deserialize, Serialize};

/// Number of blocks drawn out from each edge of the map when previewing
/// the border
pub const DEFAULT_BORDER_DISTANCE: i32 = 7;

/// Number of metatile ids owned by the primary tileset
pub const DEFAULT_PRIMARY_METATILES: u16 = 512;

/// Editing configuration for one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub border_width: i32,
    pub border_height: i32,
    /// Band of border blocks drawn around the map interior
    pub border_distance: i32,
    /// Block written into cells created by a resize
    pub new_block: Block,
    /// Allowed ranges for block fields set through the editor
    pub block_limits: BlockLimits,
    pub num_metatiles_in_primary: u16,
    pub default_layer_order: Vec<usize>,
    pub default_layer_opacity: Vec<f32>,
    /// Limit on `(width + 15) * (height + 14)`, for targets with a fixed
    /// map buffer
    pub max_map_data_size: Option<u32>,
    /// Oldest records are dropped once the history holds this many
    pub undo_limit: Option<usize>,
    /// Default opacity of the collision overlay
    pub collision_opacity: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            border_width: DEFAULT_BORDER_WIDTH,
            border_height: DEFAULT_BORDER_HEIGHT,
            border_distance: DEFAULT_BORDER_DISTANCE,
            new_block: Block::default(),
            block_limits: BlockLimits::default(),
            num_metatiles_in_primary: DEFAULT_PRIMARY_METATILES,
            default_layer_order: vec![0, 1, 2],
            default_layer_opacity: vec![1.0, 1.0, 1.0],
            max_map_data_size: None,
            undo_limit: None,
            collision_opacity: 0.5,
        }
    }
}

impl EditorConfig {
    /// Check map dimensions against the grid limits and the optional
    /// map buffer limit
    pub fn validate_map_dimensions(&self, width: i32, height: i32) -> Result<(), MapError> {
        validate_dimensions(width, height)?;
        if let Some(max) = self.max_map_data_size {
            let size = (i64::from(width) + 15) * (i64::from(height) + 14);
            if size > i64::from(max) {
                return Err(MapError::InvalidDimension {
                    width,
                    height,
                    reason: "map data size exceeds the project limit",
                });
            }
        }
        Ok(())
    }

    /// Check border dimensions against the grid limits
    pub fn validate_border_dimensions(&self, width: i32, height: i32) -> Result<(), MapError> {
        validate_dimensions(width, height)
    }

    /// Pair two tilesets using the project's primary metatile count
    pub fn tileset_pair(&self, primary: Tileset, secondary: Tileset) -> TilesetPair {
        TilesetPair::new(primary, secondary, self.num_metatiles_in_primary)
    }

    /// Narrow block limits that exceed the bit layout
    pub(crate) fn clamp_block_limits(&mut self) {
        let clamped = self.block_limits.clamped();
        if clamped != self.block_limits {
            tracing::warn!(
                "Block limits {:?} exceed the block layout, using {:?}",
                self.block_limits,
                clamped
            );
            self.block_limits = clamped;
        }
    }
}
