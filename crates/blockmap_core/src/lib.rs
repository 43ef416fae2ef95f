//! Core data structures for blockmap
//!
//! This crate provides the fundamental types for representing metatile maps:
//! - `Block` - One packed grid cell (metatile id, collision, elevation)
//! - `Blockdata` - A flat row-major grid of blocks
//! - `BlockStore` - A map's interior and border grids
//! - `Map` - Block storage plus header, connections, events and layer order
//! - `EventStore` - Arena-owned events indexed by category
//! - `Tileset` - Pre-rasterised metatiles referenced by block metatile ids

mod block;
mod blockdata;
mod connection;
mod error;
mod event;
mod map;
mod store;
mod tileset;

pub use block::{
    Block, BlockInfo, BlockLimits, PartialBlock, COLLISION_MASK, COLLISION_SHIFT,
    ELEVATION_MASK, ELEVATION_SHIFT, MAX_COLLISION, MAX_ELEVATION, MAX_METATILE_ID,
    METATILE_ID_MASK,
};
pub use blockdata::{validate_dimensions, BlockChange, Blockdata, MAX_DIMENSION};
pub use connection::{ConnectionDirection, MapConnection};
pub use error::{MapError, Result};
pub use event::{Event, EventGroup, EventId, EventKind, EventStore};
pub use map::{Map, MapHeader};
pub use store::{BlockStore, GridRegion, DEFAULT_BORDER_HEIGHT, DEFAULT_BORDER_WIDTH};
pub use tileset::{Metatile, Tileset, TilesetPair, METATILE_SIZE};
