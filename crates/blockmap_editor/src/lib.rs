//! blockmap_editor - Editing engine for metatile maps
//!
//! This crate provides everything between raw map data and a UI:
//! - `MapModel` - The map under edit, owning history, caches and listeners
//! - Collision flood fill and magic fill, metatile and selection fills
//! - Undo/redo with batched commits
//! - Cached, incrementally redrawn map, collision and border images
//! - Project editing configuration (save/load)
//!
//! # Usage
//!
//! ```rust,ignore
//! use blockmap_editor::{EditOptions, EditorConfig, MapModel};
//!
//! let mut model = MapModel::create("PetalburgCity", 20, 20, tilesets, EditorConfig::load())?;
//! model.flood_fill(0, 0, 1, 3, EditOptions::default())?;
//! let image = model.render(false);
//! model.undo()?;
//! ```

pub mod commands;
pub mod config;
pub mod model;
pub mod observer;
pub mod render;
pub mod tools;

pub use blockmap_core;

pub use commands::{EditAction, EditHistory, EditRecord};
pub use config::{ConfigError, EditorConfig};
pub use model::{EditOptions, MapModel};
pub use observer::{BulkChange, MapChange, MapObserver, ObserverId};
pub use render::{MapRenderer, RenderCache};
pub use tools::{FillEngine, FillPattern, PaintSelection};
