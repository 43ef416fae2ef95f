//! Cached rendering of map, collision and border images
//!
//! Every image is kept together with a snapshot of the grid it was drawn
//! from. A render with an unchanged grid returns the cached image as is;
//! a render after a few edits only redraws the cells that differ from the
//! snapshot.

use blockmap_core::{
    Block, Blockdata, ConnectionDirection, Map, TilesetPair, METATILE_SIZE,
};
use image::{imageops, Pixel, Rgba, RgbaImage};
use std::collections::HashMap;

/// Drawn in place of metatile ids neither tileset defines
pub const MISSING_METATILE_COLOR: Rgba<u8> = Rgba([0xFF, 0x00, 0xFF, 0xFF]);

/// Overlay colour per elevation for passable cells
const ELEVATION_COLORS: [[u8; 3]; 16] = [
    [0x40, 0x80, 0xFF],
    [0x20, 0xC0, 0xC0],
    [0x40, 0xC0, 0x40],
    [0x80, 0xD0, 0x20],
    [0xC0, 0xD0, 0x20],
    [0xF0, 0xC0, 0x20],
    [0xF0, 0x90, 0x20],
    [0xF0, 0x60, 0x40],
    [0xE0, 0x40, 0x80],
    [0xC0, 0x40, 0xC0],
    [0x90, 0x50, 0xE0],
    [0x60, 0x60, 0xF0],
    [0x60, 0xA0, 0xE0],
    [0xA0, 0xC0, 0xE0],
    [0xD0, 0xD0, 0xD0],
    [0x80, 0x80, 0x80],
];

/// Overlay colour for impassable cells, darkened per collision value
const IMPASSABLE_COLORS: [[u8; 3]; 3] = [[0xE0, 0x20, 0x20], [0xB0, 0x10, 0x40], [0x80, 0x10, 0x10]];

/// Compose one metatile by drawing its layers bottom to top
///
/// `passes` lists the layers to draw in order, each with its opacity.
pub fn compose_metatile(
    tilesets: &TilesetPair,
    metatile_id: u16,
    passes: &[(usize, f32)],
) -> RgbaImage {
    let Some(metatile) = tilesets.metatile(metatile_id) else {
        return RgbaImage::from_pixel(METATILE_SIZE, METATILE_SIZE, MISSING_METATILE_COLOR);
    };

    let mut tile = RgbaImage::new(METATILE_SIZE, METATILE_SIZE);
    for &(layer, opacity) in passes {
        let Some(layer_image) = metatile.layers.get(layer) else {
            continue;
        };
        if opacity <= 0.0 {
            continue;
        }
        for (dst, src) in tile.pixels_mut().zip(layer_image.pixels()) {
            let mut src = *src;
            src[3] = (f32::from(src[3]) * opacity).round() as u8;
            dst.blend(&src);
        }
    }
    tile
}

/// Overlay colour for a collision/elevation pair
pub fn collision_color(collision: u16, elevation: u16, opacity: f32) -> Rgba<u8> {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    let [r, g, b] = if collision == 0 {
        ELEVATION_COLORS[usize::from(elevation) % ELEVATION_COLORS.len()]
    } else {
        IMPASSABLE_COLORS[(usize::from(collision) - 1) % IMPASSABLE_COLORS.len()]
    };
    Rgba([r, g, b, alpha])
}

/// Pixel size of a grid image
fn image_size(width: i32, height: i32) -> (u32, u32) {
    (
        width.max(0) as u32 * METATILE_SIZE,
        height.max(0) as u32 * METATILE_SIZE,
    )
}

fn place_tile(image: &mut RgbaImage, tile: &RgbaImage, x: i32, y: i32) {
    let size = i64::from(METATILE_SIZE);
    imageops::replace(image, tile, i64::from(x) * size, i64::from(y) * size);
}

/// Render a grid with no caching at all
pub fn render_grid(grid: &Blockdata, mut draw: impl FnMut(Block) -> RgbaImage) -> RgbaImage {
    let (width, height) = image_size(grid.width(), grid.height());
    let mut image = RgbaImage::new(width, height);
    let mut tiles: HashMap<Block, RgbaImage> = HashMap::new();
    for (x, y, block) in grid.cells() {
        let tile = tiles.entry(block).or_insert_with(|| draw(block));
        place_tile(&mut image, tile, x, y);
    }
    image
}

/// A rendered image and the grid snapshot it was drawn from
#[derive(Debug, Clone, Default)]
pub struct RenderCache {
    snapshot: Option<Blockdata>,
    image: RgbaImage,
    stale: bool,
    last_drawn: usize,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the next update to redraw every cell
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Whether the cached image already shows `grid`
    pub fn is_valid_for(&self, grid: &Blockdata) -> bool {
        !self.stale && self.snapshot.as_ref() == Some(grid)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Number of cells drawn by the most recent update
    pub fn last_drawn(&self) -> usize {
        self.last_drawn
    }

    /// Bring the image up to date with `grid`
    ///
    /// Cells equal to the snapshot are left alone unless `force` is set,
    /// the cache was invalidated, or the dimensions changed.
    pub fn update(
        &mut self,
        grid: &Blockdata,
        force: bool,
        mut draw: impl FnMut(Block) -> RgbaImage,
    ) -> &RgbaImage {
        if !force && self.is_valid_for(grid) {
            self.last_drawn = 0;
            tracing::debug!("Render cache hit for {}x{} grid", grid.width(), grid.height());
            return &self.image;
        }

        let full = force
            || self.stale
            || self.snapshot.as_ref().map(Blockdata::dimensions) != Some(grid.dimensions());
        let previous = if full {
            let (width, height) = image_size(grid.width(), grid.height());
            self.image = RgbaImage::new(width, height);
            None
        } else {
            self.snapshot.take()
        };

        let mut tiles: HashMap<Block, RgbaImage> = HashMap::new();
        let mut drawn = 0;
        for (index, (x, y, block)) in grid.cells().enumerate() {
            if let Some(previous) = &previous {
                if previous.blocks()[index] == block {
                    continue;
                }
            }
            let tile = tiles.entry(block).or_insert_with(|| draw(block));
            place_tile(&mut self.image, tile, x, y);
            drawn += 1;
        }

        tracing::debug!(
            "Redrew {} of {} cells ({})",
            drawn,
            grid.len(),
            if full { "full" } else { "partial" }
        );
        self.snapshot = Some(grid.clone());
        self.stale = false;
        self.last_drawn = drawn;
        &self.image
    }
}

/// The three cached images of one map
///
/// Layer order and opacity are remembered per image so a change to either
/// redraws the whole image on its next render.
#[derive(Debug, Clone, Default)]
pub struct MapRenderer {
    interior: RenderCache,
    collision: RenderCache,
    border: RenderCache,
    interior_passes: Vec<(usize, f32)>,
    border_passes: Vec<(usize, f32)>,
    collision_opacity: Option<f32>,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force every image to redraw, e.g. after a tileset change
    pub fn invalidate_all(&mut self) {
        self.interior.invalidate();
        self.collision.invalidate();
        self.border.invalidate();
    }

    pub fn interior_cache(&self) -> &RenderCache {
        &self.interior
    }

    pub fn collision_cache(&self) -> &RenderCache {
        &self.collision
    }

    pub fn border_cache(&self) -> &RenderCache {
        &self.border
    }

    /// The interior image
    pub fn render(&mut self, map: &Map, tilesets: &TilesetPair, ignore_cache: bool) -> &RgbaImage {
        let passes: Vec<_> = map.layer_passes().collect();
        let force = ignore_cache || passes != self.interior_passes;
        self.interior_passes = passes;
        let passes = &self.interior_passes;
        self.interior.update(map.store.blocks(), force, |block| {
            compose_metatile(tilesets, block.metatile_id(), passes)
        })
    }

    /// The collision overlay for the interior
    pub fn render_collision(&mut self, map: &Map, opacity: f32, ignore_cache: bool) -> &RgbaImage {
        let force = ignore_cache || self.collision_opacity != Some(opacity);
        self.collision_opacity = Some(opacity);
        self.collision.update(map.store.blocks(), force, |block| {
            let (collision, elevation) = block.collision_elevation();
            RgbaImage::from_pixel(
                METATILE_SIZE,
                METATILE_SIZE,
                collision_color(collision, elevation, opacity),
            )
        })
    }

    /// The border grid on its own
    pub fn render_border(
        &mut self,
        map: &Map,
        tilesets: &TilesetPair,
        ignore_cache: bool,
    ) -> &RgbaImage {
        let passes: Vec<_> = map.layer_passes().collect();
        let force = ignore_cache || passes != self.border_passes;
        self.border_passes = passes;
        let passes = &self.border_passes;
        self.border.update(map.store.border(), force, |block| {
            compose_metatile(tilesets, block.metatile_id(), passes)
        })
    }

    /// The interior surrounded by `distance` blocks of tiled border on
    /// every side
    pub fn render_with_border(
        &mut self,
        map: &Map,
        tilesets: &TilesetPair,
        distance: i32,
    ) -> RgbaImage {
        let distance = distance.max(0);
        let border = map.store.border();
        let (bw, bh) = border.dimensions();
        let (width, height) = (map.width() + 2 * distance, map.height() + 2 * distance);
        let (pixel_width, pixel_height) = image_size(width, height);
        let mut canvas = RgbaImage::new(pixel_width, pixel_height);

        let passes: Vec<_> = map.layer_passes().collect();
        let mut tiles: HashMap<u16, RgbaImage> = HashMap::new();
        for y in 0..height {
            for x in 0..width {
                let inside = (distance..distance + map.width()).contains(&x)
                    && (distance..distance + map.height()).contains(&y);
                if inside {
                    continue;
                }
                let index = (y.rem_euclid(bh) * bw + x.rem_euclid(bw)) as usize;
                let metatile_id = border.blocks()[index].metatile_id();
                let tile = tiles
                    .entry(metatile_id)
                    .or_insert_with(|| compose_metatile(tilesets, metatile_id, &passes));
                place_tile(&mut canvas, tile, x, y);
            }
        }

        let interior = self.render(map, tilesets, false);
        place_tile(&mut canvas, interior, distance, distance);
        canvas
    }
}

/// Render any grid with a map's tilesets and layer settings, bypassing
/// every cache
pub fn render_from(source: &Blockdata, map: &Map, tilesets: &TilesetPair) -> RgbaImage {
    let passes: Vec<_> = map.layer_passes().collect();
    render_grid(source, |block| {
        compose_metatile(tilesets, block.metatile_id(), &passes)
    })
}

/// The strip of a neighbouring map's image that faces a connection
///
/// A connection going up shows the neighbour's bottom rows, down its top
/// rows, left its rightmost columns and right its leftmost columns. Dive
/// and emerge connections have no strip.
pub fn connection_strip(
    neighbor: &RgbaImage,
    direction: ConnectionDirection,
    distance: i32,
) -> Option<RgbaImage> {
    let depth = distance.max(0) as u32 * METATILE_SIZE;
    let (width, height) = neighbor.dimensions();
    let (x, y, w, h) = match direction {
        ConnectionDirection::Up => {
            let h = depth.min(height);
            (0, height - h, width, h)
        }
        ConnectionDirection::Down => (0, 0, width, depth.min(height)),
        ConnectionDirection::Left => {
            let w = depth.min(width);
            (width - w, 0, w, height)
        }
        ConnectionDirection::Right => (0, 0, depth.min(width), height),
        ConnectionDirection::Dive | ConnectionDirection::Emerge => return None,
    };
    Some(imageops::crop_imm(neighbor, x, y, w, h).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockmap_core::{BlockStore, Metatile, Tileset};

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn tilesets() -> TilesetPair {
        TilesetPair::new(
            Tileset::primary(
                "gTileset_General",
                vec![Metatile::solid(RED, 3), Metatile::solid(GREEN, 3)],
            ),
            Tileset::secondary("gTileset_Town", vec![Metatile::solid(BLUE, 3)]),
            2,
        )
    }

    fn map(width: i32, height: i32) -> Map {
        Map::new(
            "TestTown",
            BlockStore::new(width, height, 2, 2, Block::default()).unwrap(),
        )
    }

    fn cell_pixel(image: &RgbaImage, x: u32, y: u32) -> Rgba<u8> {
        *image.get_pixel(x * METATILE_SIZE + 3, y * METATILE_SIZE + 3)
    }

    #[test]
    fn test_compose_missing_metatile() {
        let tile = compose_metatile(&tilesets(), 700, &[(0, 1.0)]);
        assert!(tile.pixels().all(|p| *p == MISSING_METATILE_COLOR));
    }

    #[test]
    fn test_compose_layers_with_opacity() {
        let top = Metatile::new(vec![
            RgbaImage::from_pixel(METATILE_SIZE, METATILE_SIZE, RED),
            RgbaImage::from_pixel(METATILE_SIZE, METATILE_SIZE, BLUE),
        ]);
        let pair = TilesetPair::new(
            Tileset::primary("gTileset_General", vec![top]),
            Tileset::secondary("gTileset_Town", vec![]),
            1,
        );

        let opaque = compose_metatile(&pair, 0, &[(0, 1.0), (1, 1.0)]);
        assert_eq!(*opaque.get_pixel(0, 0), BLUE);

        let reversed = compose_metatile(&pair, 0, &[(1, 1.0), (0, 1.0)]);
        assert_eq!(*reversed.get_pixel(0, 0), RED);

        let faded = compose_metatile(&pair, 0, &[(0, 1.0), (1, 0.0)]);
        assert_eq!(*faded.get_pixel(0, 0), RED);

        let half = compose_metatile(&pair, 0, &[(0, 1.0), (1, 0.5)]);
        let pixel = half.get_pixel(0, 0);
        assert!(pixel[0] > 100 && pixel[0] < 155);
        assert!(pixel[2] > 100 && pixel[2] < 155);
    }

    #[test]
    fn test_render_cache_hit() {
        let map = map(4, 3);
        let tilesets = tilesets();
        let mut renderer = MapRenderer::new();

        let first = renderer.render(&map, &tilesets, false).clone();
        assert_eq!(renderer.interior_cache().last_drawn(), 12);
        assert_eq!(first.dimensions(), (4 * METATILE_SIZE, 3 * METATILE_SIZE));

        let second = renderer.render(&map, &tilesets, false).clone();
        assert_eq!(renderer.interior_cache().last_drawn(), 0);
        assert_eq!(first, second);

        renderer.render(&map, &tilesets, true);
        assert_eq!(renderer.interior_cache().last_drawn(), 12);
    }

    #[test]
    fn test_single_cell_change_redraws_one_cell() {
        let mut map = map(4, 4);
        let tilesets = tilesets();
        let mut renderer = MapRenderer::new();
        let before = renderer.render(&map, &tilesets, false).clone();

        map.store.set(2, 1, Block::from_metatile(2).unwrap()).unwrap();
        let after = renderer.render(&map, &tilesets, false).clone();
        assert_eq!(renderer.interior_cache().last_drawn(), 1);

        for (x, y, pixel) in after.enumerate_pixels() {
            let in_cell = x / METATILE_SIZE == 2 && y / METATILE_SIZE == 1;
            if in_cell {
                assert_eq!(*pixel, BLUE);
            } else {
                assert_eq!(pixel, before.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn test_layer_change_forces_full_redraw() {
        let mut map = map(3, 3);
        let tilesets = tilesets();
        let mut renderer = MapRenderer::new();
        renderer.render(&map, &tilesets, false);

        map.metatile_layer_opacity[1] = 0.25;
        renderer.render(&map, &tilesets, false);
        assert_eq!(renderer.interior_cache().last_drawn(), 9);
    }

    #[test]
    fn test_resize_and_invalidate_redraw_everything() {
        let mut map = map(3, 3);
        let tilesets = tilesets();
        let mut renderer = MapRenderer::new();
        renderer.render(&map, &tilesets, false);

        map.store.resize(5, 2, Block::from_metatile(1).unwrap()).unwrap();
        let image = renderer.render(&map, &tilesets, false).clone();
        assert_eq!(renderer.interior_cache().last_drawn(), 10);
        assert_eq!(image.dimensions(), (5 * METATILE_SIZE, 2 * METATILE_SIZE));
        assert_eq!(cell_pixel(&image, 4, 0), GREEN);

        renderer.invalidate_all();
        renderer.render(&map, &tilesets, false);
        assert_eq!(renderer.interior_cache().last_drawn(), 10);
    }

    #[test]
    fn test_collision_overlay() {
        let mut map = map(2, 1);
        map.store.set(1, 0, Block::new(0, 1, 3).unwrap()).unwrap();
        let mut renderer = MapRenderer::new();

        let image = renderer.render_collision(&map, 0.5, false).clone();
        assert_eq!(cell_pixel(&image, 0, 0), collision_color(0, 0, 0.5));
        assert_eq!(cell_pixel(&image, 1, 0), collision_color(1, 3, 0.5));
        assert_eq!(cell_pixel(&image, 0, 0)[3], 128);

        renderer.render_collision(&map, 0.5, false);
        assert_eq!(renderer.collision_cache().last_drawn(), 0);

        let image = renderer.render_collision(&map, 1.0, false).clone();
        assert_eq!(renderer.collision_cache().last_drawn(), 2);
        assert_eq!(cell_pixel(&image, 0, 0)[3], 255);
    }

    #[test]
    fn test_render_border_uses_own_cache() {
        let mut map = map(4, 4);
        let tilesets = tilesets();
        let mut renderer = MapRenderer::new();
        renderer.render(&map, &tilesets, false);
        let border = renderer.render_border(&map, &tilesets, false).clone();
        assert_eq!(border.dimensions(), (2 * METATILE_SIZE, 2 * METATILE_SIZE));

        map.store.set_border(1, 1, Block::from_metatile(1).unwrap()).unwrap();
        let border = renderer.render_border(&map, &tilesets, false).clone();
        assert_eq!(renderer.border_cache().last_drawn(), 1);
        assert_eq!(cell_pixel(&border, 1, 1), GREEN);

        renderer.render(&map, &tilesets, false);
        assert_eq!(renderer.interior_cache().last_drawn(), 0);
    }

    #[test]
    fn test_render_with_border_band() {
        let mut map = map(2, 2);
        map.store.set_border(1, 0, Block::from_metatile(1).unwrap()).unwrap();
        map.store.set(0, 0, Block::from_metatile(2).unwrap()).unwrap();
        let tilesets = tilesets();
        let mut renderer = MapRenderer::new();

        let image = renderer.render_with_border(&map, &tilesets, 3);
        assert_eq!(image.dimensions(), (8 * METATILE_SIZE, 8 * METATILE_SIZE));
        // Band cells tile the border from the top-left corner
        assert_eq!(cell_pixel(&image, 0, 0), RED);
        assert_eq!(cell_pixel(&image, 1, 0), GREEN);
        assert_eq!(cell_pixel(&image, 7, 2), GREEN);
        // Interior sits at the band's inner corner
        assert_eq!(cell_pixel(&image, 3, 3), BLUE);
        assert_eq!(cell_pixel(&image, 4, 4), RED);
    }

    #[test]
    fn test_render_from_leaves_cache_untouched() {
        let map = map(3, 3);
        let tilesets = tilesets();
        let mut renderer = MapRenderer::new();
        renderer.render(&map, &tilesets, false);

        let other = Blockdata::new(2, 2, Block::from_metatile(1).unwrap()).unwrap();
        let image = render_from(&other, &map, &tilesets);
        assert_eq!(image.dimensions(), (2 * METATILE_SIZE, 2 * METATILE_SIZE));
        assert_eq!(cell_pixel(&image, 1, 1), GREEN);

        renderer.render(&map, &tilesets, false);
        assert_eq!(renderer.interior_cache().last_drawn(), 0);
    }

    #[test]
    fn test_connection_strip_edges() {
        let mut neighbor = RgbaImage::new(4 * METATILE_SIZE, 10 * METATILE_SIZE);
        neighbor.put_pixel(0, 10 * METATILE_SIZE - 1, RED);
        neighbor.put_pixel(4 * METATILE_SIZE - 1, 0, BLUE);

        let up = connection_strip(&neighbor, ConnectionDirection::Up, 7).unwrap();
        assert_eq!(up.dimensions(), (4 * METATILE_SIZE, 7 * METATILE_SIZE));
        assert_eq!(*up.get_pixel(0, 7 * METATILE_SIZE - 1), RED);

        let down = connection_strip(&neighbor, ConnectionDirection::Down, 7).unwrap();
        assert_eq!(*down.get_pixel(4 * METATILE_SIZE - 1, 0), BLUE);

        let left = connection_strip(&neighbor, ConnectionDirection::Left, 7).unwrap();
        // Narrower than the distance, so the whole width is used
        assert_eq!(left.dimensions(), neighbor.dimensions());

        assert!(connection_strip(&neighbor, ConnectionDirection::Dive, 7).is_none());
    }
}
