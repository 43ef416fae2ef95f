//! Interior and border block storage for one map

use crate::{Block, Blockdata, Result};
use serde::{Deserialize, Serialize};

/// Default border width in blocks
pub const DEFAULT_BORDER_WIDTH: i32 = 2;
/// Default border height in blocks
pub const DEFAULT_BORDER_HEIGHT: i32 = 2;

/// Which of a map's two grids an operation touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridRegion {
    Interior,
    Border,
}

/// The two independent grids owned by a map
///
/// A `BlockStore` is also the full snapshot recorded by structural edits
/// (resize, shift), so it is cheap to clone and compare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStore {
    blocks: Blockdata,
    border: Blockdata,
}

impl BlockStore {
    /// Create a store with every interior and border cell set to `fill`
    pub fn new(
        width: i32,
        height: i32,
        border_width: i32,
        border_height: i32,
        fill: Block,
    ) -> Result<Self> {
        Ok(Self {
            blocks: Blockdata::new(width, height, fill)?,
            border: Blockdata::new(border_width, border_height, fill)?,
        })
    }

    /// Assemble a store from existing grids
    pub fn from_grids(blocks: Blockdata, border: Blockdata) -> Self {
        Self { blocks, border }
    }

    pub fn blocks(&self) -> &Blockdata {
        &self.blocks
    }

    pub fn border(&self) -> &Blockdata {
        &self.border
    }

    /// The grid for a region
    pub fn grid(&self, region: GridRegion) -> &Blockdata {
        match region {
            GridRegion::Interior => &self.blocks,
            GridRegion::Border => &self.border,
        }
    }

    /// Mutable grid for a region, for bulk algorithms that write cell by cell
    pub fn grid_mut(&mut self, region: GridRegion) -> &mut Blockdata {
        match region {
            GridRegion::Interior => &mut self.blocks,
            GridRegion::Border => &mut self.border,
        }
    }

    pub fn width(&self) -> i32 {
        self.blocks.width()
    }

    pub fn height(&self) -> i32 {
        self.blocks.height()
    }

    pub fn border_width(&self) -> i32 {
        self.border.width()
    }

    pub fn border_height(&self) -> i32 {
        self.border.height()
    }

    pub fn get(&self, x: i32, y: i32) -> Result<Block> {
        self.blocks.get(x, y)
    }

    /// Overwrite an interior cell, returning the previous block
    pub fn set(&mut self, x: i32, y: i32, block: Block) -> Result<Block> {
        self.blocks.set(x, y, block)
    }

    pub fn get_border(&self, x: i32, y: i32) -> Result<Block> {
        self.border.get(x, y)
    }

    /// Overwrite a border cell, returning the previous block
    pub fn set_border(&mut self, x: i32, y: i32, block: Block) -> Result<Block> {
        self.border.set(x, y, block)
    }

    /// Reallocate the interior, keeping overlapping cells
    ///
    /// Validation happens before anything is replaced.
    pub fn resize(&mut self, width: i32, height: i32, fill: Block) -> Result<()> {
        self.blocks = self.blocks.resized(width, height, fill)?;
        Ok(())
    }

    /// Reallocate the border, keeping overlapping cells
    pub fn resize_border(&mut self, width: i32, height: i32, fill: Block) -> Result<()> {
        self.border = self.border.resized(width, height, fill)?;
        Ok(())
    }

    /// Move every interior cell by `(dx, dy)`, wrapping around the edges
    pub fn shift(&mut self, dx: i32, dy: i32) {
        self.blocks = self.blocks.shifted(dx, dy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MapError;

    #[test]
    fn test_new_store() {
        let store = BlockStore::new(
            10,
            8,
            DEFAULT_BORDER_WIDTH,
            DEFAULT_BORDER_HEIGHT,
            Block::default(),
        )
        .unwrap();
        assert_eq!(store.width(), 10);
        assert_eq!(store.height(), 8);
        assert_eq!(store.blocks().len(), 80);
        assert_eq!(store.border().len(), 4);
    }

    #[test]
    fn test_border_has_own_bounds() {
        let mut store = BlockStore::new(10, 10, 2, 2, Block::default()).unwrap();
        assert!(store.set(5, 5, Block::from_raw(1)).is_ok());
        assert!(matches!(
            store.set_border(5, 5, Block::from_raw(1)),
            Err(MapError::OutOfRange {
                width: 2,
                height: 2,
                ..
            })
        ));
        store.set_border(1, 1, Block::from_raw(9)).unwrap();
        assert_eq!(store.get_border(1, 1).unwrap(), Block::from_raw(9));
        assert_eq!(store.get(1, 1).unwrap(), Block::default());
    }

    #[test]
    fn test_failed_resize_leaves_store() {
        let mut store = BlockStore::new(4, 4, 2, 2, Block::from_raw(3)).unwrap();
        let before = store.clone();
        assert!(store.resize(0, 4, Block::default()).is_err());
        assert!(store.resize_border(4, -1, Block::default()).is_err());
        assert_eq!(store, before);
    }

    #[test]
    fn test_resize_border() {
        let mut store = BlockStore::new(4, 4, 2, 2, Block::from_raw(3)).unwrap();
        store.resize_border(3, 1, Block::from_raw(8)).unwrap();
        assert_eq!(store.border_width(), 3);
        assert_eq!(store.border_height(), 1);
        assert_eq!(store.get_border(1, 0).unwrap(), Block::from_raw(3));
        assert_eq!(store.get_border(2, 0).unwrap(), Block::from_raw(8));
    }
}
