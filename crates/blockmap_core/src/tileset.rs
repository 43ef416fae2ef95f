//! Tilesets of pre-rasterised metatiles
//!
//! Asset decoding lives outside this crate; a tileset here is the already
//! rendered image of each layer of each metatile.

use image::{Rgba, RgbaImage};

/// Width and height of one metatile in pixels
pub const METATILE_SIZE: u32 = 16;

/// A reusable multi-layer tile unit
#[derive(Debug, Clone, PartialEq)]
pub struct Metatile {
    /// One `METATILE_SIZE` square image per layer, bottom layer first
    pub layers: Vec<RgbaImage>,
}

impl Metatile {
    /// Create a metatile from its layer images
    ///
    /// Layers of the wrong size are replaced with transparent ones so
    /// compositing never reads past a layer's edge.
    pub fn new(layers: Vec<RgbaImage>) -> Self {
        let layers = layers
            .into_iter()
            .map(|layer| {
                if layer.dimensions() == (METATILE_SIZE, METATILE_SIZE) {
                    layer
                } else {
                    RgbaImage::new(METATILE_SIZE, METATILE_SIZE)
                }
            })
            .collect();
        Self { layers }
    }

    /// A metatile whose bottom layer is a single opaque colour and whose
    /// remaining layers are transparent
    pub fn solid(color: Rgba<u8>, layer_count: usize) -> Self {
        let mut layers = Vec::with_capacity(layer_count.max(1));
        layers.push(RgbaImage::from_pixel(METATILE_SIZE, METATILE_SIZE, color));
        for _ in 1..layer_count {
            layers.push(RgbaImage::new(METATILE_SIZE, METATILE_SIZE));
        }
        Self { layers }
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

/// A named set of metatiles
#[derive(Debug, Clone, PartialEq)]
pub struct Tileset {
    pub name: String,
    pub is_secondary: bool,
    pub metatiles: Vec<Metatile>,
}

impl Tileset {
    /// Create a primary tileset
    pub fn primary(name: impl Into<String>, metatiles: Vec<Metatile>) -> Self {
        Self {
            name: name.into(),
            is_secondary: false,
            metatiles,
        }
    }

    /// Create a secondary tileset
    pub fn secondary(name: impl Into<String>, metatiles: Vec<Metatile>) -> Self {
        Self {
            name: name.into(),
            is_secondary: true,
            metatiles,
        }
    }

    pub fn get(&self, index: usize) -> Option<&Metatile> {
        self.metatiles.get(index)
    }

    pub fn len(&self) -> usize {
        self.metatiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metatiles.is_empty()
    }
}

/// The primary/secondary tileset pair a map renders with
///
/// Metatile ids below `primary_count` index the primary tileset; the rest
/// index the secondary one starting at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct TilesetPair {
    pub primary: Tileset,
    pub secondary: Tileset,
    pub primary_count: u16,
}

impl TilesetPair {
    pub fn new(primary: Tileset, secondary: Tileset, primary_count: u16) -> Self {
        Self {
            primary,
            secondary,
            primary_count,
        }
    }

    /// Resolve a metatile id, if either tileset defines it
    pub fn metatile(&self, metatile_id: u16) -> Option<&Metatile> {
        if metatile_id < self.primary_count {
            self.primary.get(usize::from(metatile_id))
        } else {
            self.secondary
                .get(usize::from(metatile_id - self.primary_count))
        }
    }

    /// Total number of metatile ids that resolve
    pub fn metatile_count(&self) -> usize {
        self.primary.len().min(usize::from(self.primary_count)) + self.secondary.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_metatile() {
        let metatile = Metatile::solid(Rgba([10, 20, 30, 255]), 3);
        assert_eq!(metatile.layer_count(), 3);
        assert_eq!(metatile.layers[0].get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
        assert_eq!(metatile.layers[1].get_pixel(15, 15)[3], 0);
    }

    #[test]
    fn test_wrong_sized_layer_replaced() {
        let metatile = Metatile::new(vec![RgbaImage::new(8, 8)]);
        assert_eq!(metatile.layers[0].dimensions(), (METATILE_SIZE, METATILE_SIZE));
    }

    #[test]
    fn test_pair_resolution() {
        let red = Metatile::solid(Rgba([255, 0, 0, 255]), 1);
        let blue = Metatile::solid(Rgba([0, 0, 255, 255]), 1);
        let pair = TilesetPair::new(
            Tileset::primary("gTileset_General", vec![red.clone(), red.clone()]),
            Tileset::secondary("gTileset_Town", vec![blue.clone()]),
            4,
        );
        assert_eq!(pair.metatile(1), Some(&red));
        // Gap between the primary's real length and primary_count
        assert_eq!(pair.metatile(2), None);
        assert_eq!(pair.metatile(4), Some(&blue));
        assert_eq!(pair.metatile(5), None);
        assert_eq!(pair.metatile_count(), 3);
    }
}
