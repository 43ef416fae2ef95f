//! Flood fill and magic fill over a block grid
//!
//! Both fills capture the seed block before writing anything. Flood fill
//! replaces the 4-connected region of cells matching the seed; magic fill
//! replaces every matching cell on the grid.

use super::PaintSelection;
use blockmap_core::{
    Block, BlockChange, BlockLimits, Blockdata, Result, COLLISION_MASK, COLLISION_SHIFT,
    ELEVATION_MASK, ELEVATION_SHIFT, METATILE_ID_MASK,
};
use std::collections::VecDeque;

/// What a fill writes, which also decides what "matching the seed" means
#[derive(Debug, Clone, Copy)]
pub enum FillPattern<'a> {
    /// Replace collision and elevation; cells match on collision + elevation
    CollisionElevation { collision: u16, elevation: u16 },
    /// Replace the metatile id; cells match on metatile id
    Metatile(u16),
    /// Paint a selection tiled from the seed; cells match on metatile id
    Selection(&'a PaintSelection),
}

impl FillPattern<'_> {
    fn matches(&self, block: Block, seed: Block) -> bool {
        match self {
            FillPattern::CollisionElevation { .. } => {
                block.collision_elevation() == seed.collision_elevation()
            }
            FillPattern::Metatile(_) | FillPattern::Selection(_) => {
                block.metatile_id() == seed.metatile_id()
            }
        }
    }

    /// Value written at offset `(dx, dy)` from the seed over `current`
    fn paint(&self, current: Block, dx: i32, dy: i32) -> Block {
        match self {
            FillPattern::CollisionElevation {
                collision,
                elevation,
            } => Block::from_raw(
                (current.raw() & METATILE_ID_MASK)
                    | ((collision << COLLISION_SHIFT) & COLLISION_MASK)
                    | ((elevation << ELEVATION_SHIFT) & ELEVATION_MASK),
            ),
            FillPattern::Metatile(metatile_id) => {
                Block::from_raw((current.raw() & !METATILE_ID_MASK) | metatile_id)
            }
            FillPattern::Selection(selection) => {
                selection.paint_onto(current, selection.block_at(dx, dy))
            }
        }
    }

    /// Whether every matching cell receives the same write
    fn is_uniform(&self) -> bool {
        match self {
            FillPattern::Selection(selection) => selection.is_single(),
            _ => true,
        }
    }
}

/// Fill algorithms bound to a project's value limits
#[derive(Debug, Clone, Copy, Default)]
pub struct FillEngine {
    limits: BlockLimits,
}

impl FillEngine {
    pub fn new(limits: BlockLimits) -> Self {
        Self {
            limits: limits.clamped(),
        }
    }

    /// Reject pattern values outside the project's limits
    fn check_pattern(&self, pattern: &FillPattern<'_>) -> Result<()> {
        match pattern {
            FillPattern::CollisionElevation {
                collision,
                elevation,
            } => {
                Block::default().with_collision_elevation(*collision, *elevation)?;
                self.limits.check_collision_elevation(*collision, *elevation)
            }
            FillPattern::Metatile(metatile_id) => {
                self.limits.check(Block::from_metatile(*metatile_id)?)
            }
            FillPattern::Selection(selection) => selection
                .blocks()
                .iter()
                .try_for_each(|block| self.limits.check(*block)),
        }
    }

    /// Validate inputs and capture the seed, or report that the fill
    /// would write nothing
    fn prepare(
        &self,
        grid: &Blockdata,
        x0: i32,
        y0: i32,
        pattern: &FillPattern<'_>,
    ) -> Result<Option<(usize, Block)>> {
        let seed_index = grid.check_bounds(x0, y0)?;
        self.check_pattern(pattern)?;
        let seed = grid.blocks()[seed_index];
        if pattern.is_uniform() && pattern.paint(seed, 0, 0) == seed {
            return Ok(None);
        }
        Ok(Some((seed_index, seed)))
    }

    /// Replace the 4-connected region around `(x0, y0)` that matches the
    /// seed, returning the cells whose value changed
    ///
    /// Runs in O(width * height) with an explicit queue; each cell is
    /// examined and written at most once.
    pub fn flood_fill(
        &self,
        grid: &mut Blockdata,
        x0: i32,
        y0: i32,
        pattern: &FillPattern<'_>,
    ) -> Result<Vec<BlockChange>> {
        let Some((seed_index, seed)) = self.prepare(grid, x0, y0, pattern)? else {
            tracing::debug!("Flood fill at ({}, {}) changes nothing", x0, y0);
            return Ok(Vec::new());
        };

        let (width, height) = grid.dimensions();
        let mut visited = vec![false; grid.len()];
        let mut queue = VecDeque::new();
        visited[seed_index] = true;
        queue.push_back((x0, y0));

        let mut changes = Vec::new();
        let blocks = grid.blocks_mut();
        while let Some((x, y)) = queue.pop_front() {
            let index = (y * width + x) as usize;
            let block = blocks[index];
            if !pattern.matches(block, seed) {
                continue;
            }

            let painted = pattern.paint(block, x - x0, y - y0);
            if painted != block {
                blocks[index] = painted;
                changes.push(BlockChange {
                    x,
                    y,
                    before: block,
                    after: painted,
                });
            }

            for (nx, ny) in [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)] {
                if nx < 0 || ny < 0 || nx >= width || ny >= height {
                    continue;
                }
                let neighbor = (ny * width + nx) as usize;
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    queue.push_back((nx, ny));
                }
            }
        }

        tracing::debug!(
            "Flood fill at ({}, {}) changed {} cells",
            x0,
            y0,
            changes.len()
        );
        Ok(changes)
    }

    /// Replace every cell on the grid that matches the seed, connected or
    /// not, returning the cells whose value changed
    pub fn magic_fill(
        &self,
        grid: &mut Blockdata,
        x0: i32,
        y0: i32,
        pattern: &FillPattern<'_>,
    ) -> Result<Vec<BlockChange>> {
        let Some((_, seed)) = self.prepare(grid, x0, y0, pattern)? else {
            tracing::debug!("Magic fill at ({}, {}) changes nothing", x0, y0);
            return Ok(Vec::new());
        };

        let width = grid.width();
        let mut changes = Vec::new();
        for (index, cell) in grid.blocks_mut().iter_mut().enumerate() {
            let block = *cell;
            if !pattern.matches(block, seed) {
                continue;
            }
            let x = index as i32 % width;
            let y = index as i32 / width;
            let painted = pattern.paint(block, x - x0, y - y0);
            if painted != block {
                *cell = painted;
                changes.push(BlockChange {
                    x,
                    y,
                    before: block,
                    after: painted,
                });
            }
        }

        tracing::debug!(
            "Magic fill at ({}, {}) changed {} cells",
            x0,
            y0,
            changes.len()
        );
        Ok(changes)
    }

    /// Stamp a selection with its top-left cell at `(x, y)`
    ///
    /// The anchor must be inside the grid; parts of the selection hanging
    /// past the right or bottom edge are dropped.
    pub fn paint_selection(
        &self,
        grid: &mut Blockdata,
        x: i32,
        y: i32,
        selection: &PaintSelection,
    ) -> Result<Vec<BlockChange>> {
        grid.check_bounds(x, y)?;
        self.check_pattern(&FillPattern::Selection(selection))?;

        let mut changes = Vec::new();
        for sy in 0..selection.height() {
            for sx in 0..selection.width() {
                let (tx, ty) = (x + sx, y + sy);
                let Some(index) = grid.index(tx, ty) else {
                    continue;
                };
                let blocks = grid.blocks_mut();
                let block = blocks[index];
                let painted = selection.paint_onto(block, selection.block_at(sx, sy));
                if painted != block {
                    blocks[index] = painted;
                    changes.push(BlockChange {
                        x: tx,
                        y: ty,
                        before: block,
                        after: painted,
                    });
                }
            }
        }
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockmap_core::MapError;

    fn grid(width: i32, height: i32) -> Blockdata {
        Blockdata::new(width, height, Block::default()).unwrap()
    }

    fn collision_elevation(collision: u16, elevation: u16) -> FillPattern<'static> {
        FillPattern::CollisionElevation {
            collision,
            elevation,
        }
    }

    fn count_pairs(grid: &Blockdata, pair: (u16, u16)) -> usize {
        grid.blocks()
            .iter()
            .filter(|b| b.collision_elevation() == pair)
            .count()
    }

    #[test]
    fn test_flood_fill_example_scenario() {
        let engine = FillEngine::default();
        let mut map = grid(10, 10);
        map.set(5, 5, Block::new(0, 0, 3).unwrap()).unwrap();

        // Raise everything but (5, 5), then flood it back from (0, 0)
        let raised = engine
            .flood_fill(&mut map, 0, 0, &collision_elevation(1, 2))
            .unwrap();
        assert_eq!(raised.len(), 99);
        let restored = engine
            .flood_fill(&mut map, 0, 0, &collision_elevation(0, 0))
            .unwrap();
        assert_eq!(restored.len(), 99);
        assert_eq!(count_pairs(&map, (0, 0)), 99);
        assert_eq!(map.get(5, 5).unwrap().elevation(), 3);

        let magic = engine
            .magic_fill(&mut map, 0, 0, &collision_elevation(3, 9))
            .unwrap();
        assert_eq!(magic.len(), 99);
        assert_eq!(count_pairs(&map, (3, 9)), 99);
        assert_eq!(map.get(5, 5).unwrap().collision_elevation(), (0, 3));
    }

    #[test]
    fn test_flood_fill_respects_connectivity() {
        let engine = FillEngine::default();
        let mut map = grid(7, 5);
        // A wall at x = 3 splits the grid in two
        for y in 0..5 {
            map.set(3, y, Block::new(0, 1, 0).unwrap()).unwrap();
        }
        let changes = engine
            .flood_fill(&mut map, 0, 0, &collision_elevation(0, 4))
            .unwrap();
        assert_eq!(changes.len(), 15);
        for y in 0..5 {
            for x in 0..7 {
                let pair = map.get(x, y).unwrap().collision_elevation();
                let expected = match x {
                    0..=2 => (0, 4),
                    3 => (1, 0),
                    _ => (0, 0),
                };
                assert_eq!(pair, expected, "cell ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_flood_fill_idempotent() {
        let engine = FillEngine::default();
        let mut map = grid(6, 6);
        map.set(2, 2, Block::new(0, 1, 1).unwrap()).unwrap();
        engine
            .flood_fill(&mut map, 0, 0, &collision_elevation(0, 5))
            .unwrap();
        let once = map.clone();
        let second = engine
            .flood_fill(&mut map, 0, 0, &collision_elevation(0, 5))
            .unwrap();
        assert!(second.is_empty());
        assert_eq!(map, once);
    }

    #[test]
    fn test_flood_fill_same_value_is_noop() {
        let engine = FillEngine::default();
        let mut map = grid(4, 4);
        let before = map.clone();
        let changes = engine
            .flood_fill(&mut map, 1, 1, &collision_elevation(0, 0))
            .unwrap();
        assert!(changes.is_empty());
        assert_eq!(map, before);
    }

    #[test]
    fn test_fill_preserves_metatile_ids() {
        let engine = FillEngine::default();
        let mut map = grid(3, 1);
        map.set(1, 0, Block::new(77, 0, 0).unwrap()).unwrap();
        engine
            .flood_fill(&mut map, 0, 0, &collision_elevation(1, 3))
            .unwrap();
        assert_eq!(map.get(1, 0).unwrap(), Block::new(77, 1, 3).unwrap());
    }

    #[test]
    fn test_invalid_seed_rejected_before_writes() {
        let engine = FillEngine::default();
        let mut map = grid(4, 4);
        let before = map.clone();
        assert!(matches!(
            engine.flood_fill(&mut map, 4, 0, &collision_elevation(1, 1)),
            Err(MapError::OutOfRange { .. })
        ));
        assert!(engine
            .magic_fill(&mut map, 0, -1, &collision_elevation(1, 1))
            .is_err());
        assert!(matches!(
            engine.flood_fill(&mut map, 0, 0, &collision_elevation(4, 0)),
            Err(MapError::InconsistentBlockEncoding { .. })
        ));
        assert_eq!(map, before);
    }

    #[test]
    fn test_limits_narrower_than_bits() {
        let engine = FillEngine::new(BlockLimits {
            max_elevation: 3,
            ..Default::default()
        });
        let mut map = grid(2, 2);
        assert!(engine
            .magic_fill(&mut map, 0, 0, &collision_elevation(0, 4))
            .is_err());
        assert!(engine
            .magic_fill(&mut map, 0, 0, &collision_elevation(0, 3))
            .is_ok());
    }

    #[test]
    fn test_limits_wider_than_bits_rejected() {
        let wide = BlockLimits {
            max_metatile_id: 0x3FF,
            max_collision: 7,
            max_elevation: 16,
        };
        for engine in [FillEngine::new(wide), FillEngine { limits: wide }] {
            let mut map = grid(2, 2);
            assert!(matches!(
                engine.flood_fill(&mut map, 0, 0, &collision_elevation(7, 0)),
                Err(MapError::InconsistentBlockEncoding {
                    field: "collision",
                    ..
                })
            ));
            assert!(matches!(
                engine.flood_fill(&mut map, 0, 0, &collision_elevation(0, 16)),
                Err(MapError::InconsistentBlockEncoding {
                    field: "elevation",
                    ..
                })
            ));
            assert_eq!(map, grid(2, 2));
        }
    }

    #[test]
    fn test_magic_fill_is_global() {
        let engine = FillEngine::default();
        let mut map = grid(5, 5);
        let wall = Block::new(0, 1, 0).unwrap();
        for i in 0..5 {
            map.set(2, i, wall).unwrap();
        }
        let original = map.clone();
        let changes = engine
            .magic_fill(&mut map, 0, 0, &collision_elevation(0, 7))
            .unwrap();
        assert_eq!(changes.len(), 20);
        for ((_, _, before), after) in original.cells().zip(map.blocks()) {
            if before.collision_elevation() == (0, 0) {
                assert_eq!(after.collision_elevation(), (0, 7));
            } else {
                assert_eq!(*after, before);
            }
        }
    }

    #[test]
    fn test_bucket_fill_metatile() {
        let engine = FillEngine::default();
        let mut map = grid(4, 4);
        let island = Block::new(9, 1, 2).unwrap();
        map.set(3, 3, island).unwrap();
        map.set(2, 3, Block::from_metatile(5).unwrap()).unwrap();
        map.set(3, 2, Block::from_metatile(5).unwrap()).unwrap();

        let changes = engine
            .flood_fill(&mut map, 0, 0, &FillPattern::Metatile(9))
            .unwrap();
        assert_eq!(changes.len(), 13);
        // The isolated metatile-9 cell keeps its collision and stays put
        assert_eq!(map.get(3, 3).unwrap(), island);
        assert_eq!(map.get(0, 0).unwrap().metatile_id(), 9);
    }

    #[test]
    fn test_bucket_fill_selection_containing_seed_terminates() {
        let engine = FillEngine::default();
        let mut map = grid(6, 4);
        // Pattern alternates the seed's own metatile with another one
        let selection = PaintSelection::new(
            2,
            1,
            vec![Block::from_metatile(0).unwrap(), Block::from_metatile(3).unwrap()],
            false,
        )
        .unwrap();
        let changes = engine
            .flood_fill(&mut map, 1, 0, &FillPattern::Selection(&selection))
            .unwrap();
        assert_eq!(changes.len(), 12);
        // Offsets are relative to the seed at x = 1
        assert_eq!(map.get(1, 0).unwrap().metatile_id(), 0);
        assert_eq!(map.get(2, 0).unwrap().metatile_id(), 3);
        assert_eq!(map.get(0, 0).unwrap().metatile_id(), 3);
        assert_eq!(map.get(0, 3).unwrap().metatile_id(), 3);
    }

    #[test]
    fn test_magic_fill_selection_tiles_from_seed() {
        let engine = FillEngine::default();
        let mut map = grid(4, 4);
        let blocks = [1, 2, 3, 4]
            .into_iter()
            .map(|id| Block::new(id, 1, 1).unwrap())
            .collect();
        let selection = PaintSelection::new(2, 2, blocks, true).unwrap();
        engine
            .magic_fill(&mut map, 1, 1, &FillPattern::Selection(&selection))
            .unwrap();
        assert_eq!(map.get(1, 1).unwrap(), Block::new(1, 1, 1).unwrap());
        assert_eq!(map.get(2, 1).unwrap(), Block::new(2, 1, 1).unwrap());
        assert_eq!(map.get(0, 0).unwrap(), Block::new(4, 1, 1).unwrap());
        assert_eq!(map.get(3, 3).unwrap(), Block::new(1, 1, 1).unwrap());
        assert_eq!(map.get(0, 3).unwrap(), Block::new(2, 1, 1).unwrap());
    }

    #[test]
    fn test_paint_selection_clips_at_edges() {
        let engine = FillEngine::default();
        let mut map = grid(3, 3);
        let blocks = (1..=4).map(|id| Block::from_metatile(id).unwrap()).collect();
        let selection = PaintSelection::new(2, 2, blocks, false).unwrap();

        let changes = engine.paint_selection(&mut map, 2, 2, &selection).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(map.get(2, 2).unwrap().metatile_id(), 1);

        assert!(engine.paint_selection(&mut map, 3, 0, &selection).is_err());
    }

    #[test]
    fn test_large_grid_flood_fill() {
        let engine = FillEngine::default();
        let mut map = grid(512, 512);
        let changes = engine
            .flood_fill(&mut map, 256, 256, &collision_elevation(1, 1))
            .unwrap();
        assert_eq!(changes.len(), 512 * 512);
    }
}
