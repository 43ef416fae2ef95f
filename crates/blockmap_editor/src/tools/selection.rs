//! Metatile selections used as paint sources

use blockmap_core::{Block, MapError, Result, METATILE_ID_MASK};

/// A rectangular selection of blocks to paint with
///
/// When `include_collision` is false only metatile ids are painted and the
/// target cells keep their collision and elevation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaintSelection {
    width: i32,
    height: i32,
    blocks: Vec<Block>,
    include_collision: bool,
}

impl PaintSelection {
    pub fn new(width: i32, height: i32, blocks: Vec<Block>, include_collision: bool) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(MapError::InvalidSelection(format!(
                "selection must not be empty (got {}x{})",
                width, height
            )));
        }
        if blocks.len() != (width as usize) * (height as usize) {
            return Err(MapError::InvalidSelection(format!(
                "{}x{} selection holds {} blocks",
                width,
                height,
                blocks.len()
            )));
        }
        Ok(Self {
            width,
            height,
            blocks,
            include_collision,
        })
    }

    /// A 1x1 selection
    pub fn single(block: Block, include_collision: bool) -> Self {
        Self {
            width: 1,
            height: 1,
            blocks: vec![block],
            include_collision,
        }
    }

    /// A 1x1 selection of a bare metatile id
    pub fn metatile(metatile_id: u16) -> Result<Self> {
        Ok(Self::single(Block::from_metatile(metatile_id)?, false))
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn include_collision(&self) -> bool {
        self.include_collision
    }

    pub fn is_single(&self) -> bool {
        self.blocks.len() == 1
    }

    /// Selection cell for an offset from the paint origin, tiling the
    /// selection in every direction
    pub fn block_at(&self, dx: i32, dy: i32) -> Block {
        let sx = dx.rem_euclid(self.width);
        let sy = dy.rem_euclid(self.height);
        self.blocks[(sy * self.width + sx) as usize]
    }

    /// What painting `selected` onto `existing` produces
    pub fn paint_onto(&self, existing: Block, selected: Block) -> Block {
        if self.include_collision {
            selected
        } else {
            Block::from_raw((existing.raw() & !METATILE_ID_MASK) | selected.metatile_id())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_size() {
        assert!(PaintSelection::new(0, 1, vec![], false).is_err());
        assert!(matches!(
            PaintSelection::new(2, 2, vec![Block::default(); 3], false),
            Err(MapError::InvalidSelection(_))
        ));
        assert!(PaintSelection::new(2, 1, vec![Block::default(); 2], false).is_ok());
    }

    #[test]
    fn test_block_at_tiles_with_negative_offsets() {
        let blocks = (0..6).map(Block::from_raw).collect();
        let selection = PaintSelection::new(3, 2, blocks, true).unwrap();
        assert_eq!(selection.block_at(0, 0).raw(), 0);
        assert_eq!(selection.block_at(2, 1).raw(), 5);
        assert_eq!(selection.block_at(3, 2).raw(), 0);
        assert_eq!(selection.block_at(-1, 0).raw(), 2);
        assert_eq!(selection.block_at(-1, -1).raw(), 5);
    }

    #[test]
    fn test_paint_onto_keeps_collision_when_excluded() {
        let existing = Block::new(1, 1, 3).unwrap();
        let selected = Block::new(42, 0, 0).unwrap();

        let metatile_only = PaintSelection::single(selected, false);
        assert_eq!(
            metatile_only.paint_onto(existing, selected),
            Block::new(42, 1, 3).unwrap()
        );

        let with_collision = PaintSelection::single(selected, true);
        assert_eq!(with_collision.paint_onto(existing, selected), selected);
    }
}
