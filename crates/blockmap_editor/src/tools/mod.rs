//! Editing tools - bucket fill, magic fill, selection painting
//!
//! The tools work on a single [`Blockdata`](blockmap_core::Blockdata) grid
//! and return the cells they changed; recording history and notifying
//! observers is left to the map model.

mod fill;
mod selection;

pub use fill::{FillEngine, FillPattern};
pub use selection::PaintSelection;
