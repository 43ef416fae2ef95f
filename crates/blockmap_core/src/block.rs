//! Packed block values
//!
//! A block is one grid cell, stored as a 16-bit raw value:
//!
//! | bits  | field       | range  |
//! |-------|-------------|--------|
//! | 0-9   | metatile id | 0-1023 |
//! | 10-11 | collision   | 0-3    |
//! | 12-15 | elevation   | 0-15   |
//!
//! The raw value is the only stored state, so the decoded fields can never
//! drift from it. Constructors and `with_*` setters validate before packing.

use crate::{MapError, Result};
use serde::{Deserialize, Serialize};

/// Mask for the metatile id bits
pub const METATILE_ID_MASK: u16 = 0x03FF;
/// Mask for the collision bits
pub const COLLISION_MASK: u16 = 0x0C00;
/// Mask for the elevation bits
pub const ELEVATION_MASK: u16 = 0xF000;

/// Bit offset of the collision field
pub const COLLISION_SHIFT: u16 = 10;
/// Bit offset of the elevation field
pub const ELEVATION_SHIFT: u16 = 12;

/// Largest metatile id the bit layout can hold
pub const MAX_METATILE_ID: u16 = METATILE_ID_MASK;
/// Largest collision value the bit layout can hold
pub const MAX_COLLISION: u16 = COLLISION_MASK >> COLLISION_SHIFT;
/// Largest elevation value the bit layout can hold
pub const MAX_ELEVATION: u16 = ELEVATION_MASK >> ELEVATION_SHIFT;

/// One grid cell: metatile reference, collision flag and elevation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub struct Block {
    raw: u16,
}

impl Block {
    /// Pack the three fields, failing if any does not fit its bits
    pub fn new(metatile_id: u16, collision: u16, elevation: u16) -> Result<Self> {
        check_field("metatileId", metatile_id.into(), MAX_METATILE_ID)?;
        check_field("collision", collision.into(), MAX_COLLISION)?;
        check_field("elevation", elevation.into(), MAX_ELEVATION)?;
        Ok(Self::pack(metatile_id, collision, elevation))
    }

    /// Decode a raw value (every 16-bit value is a valid block)
    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    /// A block that only references a metatile
    pub fn from_metatile(metatile_id: u16) -> Result<Self> {
        Self::new(metatile_id, 0, 0)
    }

    #[inline]
    const fn pack(metatile_id: u16, collision: u16, elevation: u16) -> Self {
        Self {
            raw: (metatile_id & METATILE_ID_MASK)
                | ((collision << COLLISION_SHIFT) & COLLISION_MASK)
                | ((elevation << ELEVATION_SHIFT) & ELEVATION_MASK),
        }
    }

    /// The packed 16-bit value
    #[inline]
    pub const fn raw(self) -> u16 {
        self.raw
    }

    #[inline]
    pub const fn metatile_id(self) -> u16 {
        self.raw & METATILE_ID_MASK
    }

    #[inline]
    pub const fn collision(self) -> u16 {
        (self.raw & COLLISION_MASK) >> COLLISION_SHIFT
    }

    #[inline]
    pub const fn elevation(self) -> u16 {
        (self.raw & ELEVATION_MASK) >> ELEVATION_SHIFT
    }

    /// Copy of this block with a different metatile id
    pub fn with_metatile_id(self, metatile_id: u16) -> Result<Self> {
        Self::new(metatile_id, self.collision(), self.elevation())
    }

    /// Copy of this block with a different collision value
    pub fn with_collision(self, collision: u16) -> Result<Self> {
        Self::new(self.metatile_id(), collision, self.elevation())
    }

    /// Copy of this block with a different elevation
    pub fn with_elevation(self, elevation: u16) -> Result<Self> {
        Self::new(self.metatile_id(), self.collision(), elevation)
    }

    /// Copy of this block with both collision and elevation replaced
    pub fn with_collision_elevation(self, collision: u16, elevation: u16) -> Result<Self> {
        Self::new(self.metatile_id(), collision, elevation)
    }

    /// The `(collision, elevation)` pair used by collision fills
    #[inline]
    pub const fn collision_elevation(self) -> (u16, u16) {
        (self.collision(), self.elevation())
    }
}

impl From<u16> for Block {
    fn from(raw: u16) -> Self {
        Self::from_raw(raw)
    }
}

impl From<Block> for u16 {
    fn from(block: Block) -> Self {
        block.raw
    }
}

fn check_field(field: &'static str, value: i64, max: u16) -> Result<()> {
    if value < 0 || value > i64::from(max) {
        return Err(MapError::InconsistentBlockEncoding { field, value, max });
    }
    Ok(())
}

/// Project-specific value ranges, at most as wide as the bit layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLimits {
    pub max_metatile_id: u16,
    pub max_collision: u16,
    pub max_elevation: u16,
}

impl Default for BlockLimits {
    fn default() -> Self {
        Self {
            max_metatile_id: MAX_METATILE_ID,
            max_collision: MAX_COLLISION,
            max_elevation: MAX_ELEVATION,
        }
    }
}

impl BlockLimits {
    /// These limits narrowed to what the bit layout can hold
    pub fn clamped(self) -> Self {
        Self {
            max_metatile_id: self.max_metatile_id.min(MAX_METATILE_ID),
            max_collision: self.max_collision.min(MAX_COLLISION),
            max_elevation: self.max_elevation.min(MAX_ELEVATION),
        }
    }

    /// Validate a block's decoded fields against these limits
    pub fn check(&self, block: Block) -> Result<()> {
        let limits = self.clamped();
        check_field(
            "metatileId",
            block.metatile_id().into(),
            limits.max_metatile_id,
        )?;
        check_field("collision", block.collision().into(), limits.max_collision)?;
        check_field("elevation", block.elevation().into(), limits.max_elevation)
    }

    /// Validate a collision/elevation pair before any fill writes
    pub fn check_collision_elevation(&self, collision: u16, elevation: u16) -> Result<()> {
        let limits = self.clamped();
        check_field("collision", collision.into(), limits.max_collision)?;
        check_field("elevation", elevation.into(), limits.max_elevation)
    }
}

/// Block as seen across the scripting boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    pub metatile_id: u16,
    pub collision: u16,
    pub elevation: u16,
    pub raw_value: u16,
}

impl From<Block> for BlockInfo {
    fn from(block: Block) -> Self {
        Self {
            metatile_id: block.metatile_id(),
            collision: block.collision(),
            elevation: block.elevation(),
            raw_value: block.raw(),
        }
    }
}

/// A block provided by an external caller, possibly with fields missing
///
/// Resolution starts from `raw_value` when present (otherwise from the block
/// being replaced), then applies any decoded fields on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialBlock {
    pub metatile_id: Option<i64>,
    pub collision: Option<i64>,
    pub elevation: Option<i64>,
    pub raw_value: Option<i64>,
}

impl PartialBlock {
    /// Fill in the missing fields from `base` and repack
    pub fn resolve(&self, base: Block) -> Result<Block> {
        let start = match self.raw_value {
            Some(raw) => {
                check_field("rawValue", raw, u16::MAX)?;
                Block::from_raw(raw as u16)
            }
            None => base,
        };
        let metatile_id = self.field("metatileId", self.metatile_id, MAX_METATILE_ID)?;
        let collision = self.field("collision", self.collision, MAX_COLLISION)?;
        let elevation = self.field("elevation", self.elevation, MAX_ELEVATION)?;
        Block::new(
            metatile_id.unwrap_or(start.metatile_id()),
            collision.unwrap_or(start.collision()),
            elevation.unwrap_or(start.elevation()),
        )
    }

    fn field(&self, name: &'static str, value: Option<i64>, max: u16) -> Result<Option<u16>> {
        match value {
            Some(v) => {
                check_field(name, v, max)?;
                Ok(Some(v as u16))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_and_decode() {
        let block = Block::new(0x1D4, 1, 3).unwrap();
        assert_eq!(block.metatile_id(), 0x1D4);
        assert_eq!(block.collision(), 1);
        assert_eq!(block.elevation(), 3);
        assert_eq!(block.raw(), 0x1D4 | (1 << 10) | (3 << 12));
        assert_eq!(Block::from_raw(block.raw()), block);
    }

    #[test]
    fn test_with_setters_recompute_raw() {
        let block = Block::new(5, 0, 0).unwrap();
        let raised = block.with_elevation(4).unwrap();
        assert_eq!(raised.metatile_id(), 5);
        assert_eq!(raised.elevation(), 4);
        assert_eq!(raised.raw(), 5 | (4 << 12));

        let blocked = raised.with_collision_elevation(1, 0).unwrap();
        assert_eq!(blocked.collision_elevation(), (1, 0));
        assert_eq!(blocked.metatile_id(), 5);
    }

    #[test]
    fn test_out_of_range_fields_rejected() {
        assert!(matches!(
            Block::new(0x400, 0, 0),
            Err(MapError::InconsistentBlockEncoding {
                field: "metatileId",
                ..
            })
        ));
        assert!(Block::new(0, 4, 0).is_err());
        assert!(Block::new(0, 0, 16).is_err());
    }

    #[test]
    fn test_limits_narrower_than_bits() {
        let limits = BlockLimits {
            max_collision: 1,
            ..Default::default()
        };
        assert!(limits.check(Block::new(0, 1, 0).unwrap()).is_ok());
        assert!(limits.check(Block::new(0, 2, 0).unwrap()).is_err());
        assert!(limits.check_collision_elevation(0, 15).is_ok());
    }

    #[test]
    fn test_limits_wider_than_bits_are_clamped() {
        let limits = BlockLimits {
            max_metatile_id: 0xFFFF,
            max_collision: 7,
            max_elevation: 16,
        };
        assert_eq!(limits.clamped(), BlockLimits::default());
        assert!(matches!(
            limits.check_collision_elevation(7, 0),
            Err(MapError::InconsistentBlockEncoding {
                field: "collision",
                max: 3,
                ..
            })
        ));
        assert!(matches!(
            limits.check_collision_elevation(0, 16),
            Err(MapError::InconsistentBlockEncoding {
                field: "elevation",
                max: 15,
                ..
            })
        ));
        assert!(limits.check_collision_elevation(3, 15).is_ok());
    }

    #[test]
    fn test_partial_block_resolution() {
        let base = Block::new(10, 1, 2).unwrap();

        let only_elevation = PartialBlock {
            elevation: Some(7),
            ..Default::default()
        };
        let resolved = only_elevation.resolve(base).unwrap();
        assert_eq!(resolved, Block::new(10, 1, 7).unwrap());

        let raw_then_field = PartialBlock {
            raw_value: Some(i64::from(Block::new(3, 0, 0).unwrap().raw())),
            collision: Some(1),
            ..Default::default()
        };
        assert_eq!(
            raw_then_field.resolve(base).unwrap(),
            Block::new(3, 1, 0).unwrap()
        );

        let bad = PartialBlock {
            metatile_id: Some(-1),
            ..Default::default()
        };
        assert!(bad.resolve(base).is_err());
    }

    #[test]
    fn test_block_info_wire_shape() {
        let info = BlockInfo::from(Block::new(2, 1, 3).unwrap());
        let json = serde_json::to_value(info).unwrap();
        assert_eq!(json["metatileId"], 2);
        assert_eq!(json["collision"], 1);
        assert_eq!(json["elevation"], 3);
        assert_eq!(json["rawValue"], 2 | (1 << 10) | (3 << 12));
    }

    #[test]
    fn test_block_serializes_as_raw() {
        let block = Block::from_raw(0x3001);
        assert_eq!(serde_json::to_string(&block).unwrap(), "12289");
        let back: Block = serde_json::from_str("12289").unwrap();
        assert_eq!(back, block);
    }
}
