//! Flat row-major grid of blocks

use crate::{Block, MapError, Result};
use serde::{Deserialize, Serialize};

/// Largest width or height accepted for any grid
pub const MAX_DIMENSION: i32 = 4096;

/// Reject dimensions that are non-positive or would overflow the cell count
pub fn validate_dimensions(width: i32, height: i32) -> Result<()> {
    if width <= 0 || height <= 0 {
        return Err(MapError::InvalidDimension {
            width,
            height,
            reason: "dimensions must be positive",
        });
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(MapError::InvalidDimension {
            width,
            height,
            reason: "dimensions exceed the maximum grid size",
        });
    }
    Ok(())
}

/// One cell written by an edit, with its value before and after
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockChange {
    pub x: i32,
    pub y: i32,
    pub before: Block,
    pub after: Block,
}

/// A `width * height` grid of blocks
///
/// The length of `blocks` always equals `width * height`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBlockdata")]
pub struct Blockdata {
    width: i32,
    height: i32,
    blocks: Vec<Block>,
}

#[derive(Deserialize)]
struct RawBlockdata {
    width: i32,
    height: i32,
    blocks: Vec<Block>,
}

impl TryFrom<RawBlockdata> for Blockdata {
    type Error = MapError;

    fn try_from(raw: RawBlockdata) -> Result<Self> {
        Self::from_blocks(raw.width, raw.height, raw.blocks)
    }
}

impl Blockdata {
    /// Create a grid with every cell set to `fill`
    pub fn new(width: i32, height: i32, fill: Block) -> Result<Self> {
        validate_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            blocks: vec![fill; (width * height) as usize],
        })
    }

    /// Wrap existing row-major block data
    pub fn from_blocks(width: i32, height: i32, blocks: Vec<Block>) -> Result<Self> {
        validate_dimensions(width, height)?;
        if blocks.len() != (width * height) as usize {
            return Err(MapError::InvalidDimension {
                width,
                height,
                reason: "block count does not match dimensions",
            });
        }
        Ok(Self {
            width,
            height,
            blocks,
        })
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// `(width, height)`
    #[inline]
    pub fn dimensions(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// All blocks in row-major order
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Mutable access to the cells; the grid's size cannot change through it
    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    /// Row-major index of a cell, if in bounds
    #[inline]
    pub fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.contains(x, y)
            .then(|| (y * self.width + x) as usize)
    }

    /// Error for a coordinate that failed the bounds check
    pub fn out_of_range(&self, x: i32, y: i32) -> MapError {
        MapError::OutOfRange {
            x,
            y,
            width: self.width,
            height: self.height,
        }
    }

    /// Fail with `OutOfRange` unless `(x, y)` is inside the grid
    pub fn check_bounds(&self, x: i32, y: i32) -> Result<usize> {
        self.index(x, y).ok_or_else(|| self.out_of_range(x, y))
    }

    pub fn get(&self, x: i32, y: i32) -> Result<Block> {
        let index = self.check_bounds(x, y)?;
        Ok(self.blocks[index])
    }

    /// Overwrite a cell, returning its previous value
    pub fn set(&mut self, x: i32, y: i32, block: Block) -> Result<Block> {
        let index = self.check_bounds(x, y)?;
        Ok(std::mem::replace(&mut self.blocks[index], block))
    }

    /// Iterate `(x, y, block)` in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32, Block)> + '_ {
        let width = self.width;
        self.blocks
            .iter()
            .enumerate()
            .map(move |(i, block)| ((i as i32) % width, (i as i32) / width, *block))
    }

    /// A copy at new dimensions; overlapping cells keep their value, new
    /// cells get `fill`
    pub fn resized(&self, width: i32, height: i32, fill: Block) -> Result<Self> {
        validate_dimensions(width, height)?;
        let mut blocks = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let block = self
                    .index(x, y)
                    .map(|i| self.blocks[i])
                    .unwrap_or(fill);
                blocks.push(block);
            }
        }
        Ok(Self {
            width,
            height,
            blocks,
        })
    }

    /// A copy with every cell moved by `(dx, dy)`, wrapping around the edges
    pub fn shifted(&self, dx: i32, dy: i32) -> Self {
        let dx = dx.rem_euclid(self.width);
        let dy = dy.rem_euclid(self.height);
        let mut blocks = self.blocks.clone();
        for (x, y, block) in self.cells() {
            let nx = (x + dx) % self.width;
            let ny = (y + dy) % self.height;
            blocks[(ny * self.width + nx) as usize] = block;
        }
        Self {
            width: self.width,
            height: self.height,
            blocks,
        }
    }

    /// Cells that differ between two grids of equal dimensions
    ///
    /// Returns `None` when the dimensions differ.
    pub fn diff(&self, newer: &Blockdata) -> Option<Vec<BlockChange>> {
        if self.dimensions() != newer.dimensions() {
            return None;
        }
        let changes = self
            .cells()
            .zip(newer.blocks.iter())
            .filter(|((_, _, before), after)| before != *after)
            .map(|((x, y, before), after)| BlockChange {
                x,
                y,
                before,
                after: *after,
            })
            .collect();
        Some(changes)
    }
}
