//! The map model: one map plus its history, caches and listeners
//!
//! Every edit goes through [`MapModel`]. Mutators take [`EditOptions`] so
//! callers can batch many writes with notification, redraw and commit
//! suppressed, then flush once with [`MapModel::commit`] and
//! [`MapModel::redraw`].

use crate::commands::{replay, EditHistory, EditRecord, ReplayDirection, ReplayOutcome};
use crate::config::EditorConfig;
use crate::observer::{BulkChange, MapChange, MapObserver, ObserverId, ObserverRegistry};
use crate::render::{self, MapRenderer};
use crate::tools::{FillEngine, FillPattern, PaintSelection};
use blockmap_core::{
    Block, BlockChange, BlockStore, Blockdata, Event, EventGroup, EventId, EventStore,
    GridRegion, Map, MapConnection, MapHeader, PartialBlock, Result, TilesetPair,
};
use image::RgbaImage;
use uuid::Uuid;

/// What happens after a mutator has written its cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOptions {
    /// Report single-cell writes to `on_block_changed`
    pub notify: bool,
    /// Ask listeners to redraw
    pub redraw: bool,
    /// Record the pending changes as one history entry
    pub commit: bool,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            notify: true,
            redraw: true,
            commit: true,
        }
    }
}

impl EditOptions {
    /// No notification, redraw or commit; flush later
    pub fn batched() -> Self {
        Self {
            notify: false,
            redraw: false,
            commit: false,
        }
    }

    /// Options for an edit made by a script, which never re-notifies
    /// single-cell writes
    pub fn scripted(redraw: bool, commit: bool) -> Self {
        Self {
            notify: false,
            redraw,
            commit,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum FillMode {
    Flood,
    Magic,
}

/// A map under edit
#[derive(Debug)]
pub struct MapModel {
    map: Map,
    tilesets: TilesetPair,
    config: EditorConfig,
    fill: FillEngine,
    history: EditHistory,
    /// Store contents as of the last commit
    committed: BlockStore,
    pending_structural: bool,
    pending_description: Option<String>,
    renderer: MapRenderer,
    observers: ObserverRegistry,
}

impl MapModel {
    pub fn new(map: Map, tilesets: TilesetPair, mut config: EditorConfig) -> Self {
        config.clamp_block_limits();
        if tilesets.primary_count != config.num_metatiles_in_primary {
            tracing::warn!(
                "Map '{}' tilesets split at {} metatiles, project expects {}",
                map.name(),
                tilesets.primary_count,
                config.num_metatiles_in_primary
            );
        }
        Self {
            committed: map.store.clone(),
            fill: FillEngine::new(config.block_limits),
            history: EditHistory::with_limit(config.undo_limit),
            map,
            tilesets,
            config,
            pending_structural: false,
            pending_description: None,
            renderer: MapRenderer::new(),
            observers: ObserverRegistry::new(),
        }
    }

    /// Create a blank map filled with the configured new block
    pub fn create(
        name: impl Into<String>,
        width: i32,
        height: i32,
        tilesets: TilesetPair,
        config: EditorConfig,
    ) -> Result<Self> {
        config.validate_map_dimensions(width, height)?;
        config.validate_border_dimensions(config.border_width, config.border_height)?;
        let store = BlockStore::new(
            width,
            height,
            config.border_width,
            config.border_height,
            config.new_block,
        )?;
        let mut map = Map::new(name, store);
        map.metatile_layer_order = config.default_layer_order.clone();
        map.metatile_layer_opacity = config.default_layer_opacity.clone();
        tracing::info!("Created map '{}' ({}x{})", map.name(), width, height);
        Ok(Self::new(map, tilesets, config))
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    /// Give up the model, keeping only the map data
    pub fn into_map(self) -> Map {
        self.map
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn tilesets(&self) -> &TilesetPair {
        &self.tilesets
    }

    pub fn history(&self) -> &EditHistory {
        &self.history
    }

    pub fn renderer(&self) -> &MapRenderer {
        &self.renderer
    }

    pub fn name(&self) -> &str {
        self.map.name()
    }

    pub fn constant_name(&self) -> &str {
        self.map.constant_name()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.map.set_name(name);
        self.observers.map_changed(MapChange::Metadata);
    }

    /// Label of an event group's table, derived from the map name
    pub fn events_label(&self, group: EventGroup) -> Option<String> {
        Map::events_label_from_name(self.map.name(), group)
    }

    pub fn header(&self) -> &MapHeader {
        &self.map.header
    }

    pub fn set_header(&mut self, header: MapHeader) {
        self.map.header = header;
        self.observers.map_changed(MapChange::Metadata);
    }

    pub fn width(&self) -> i32 {
        self.map.width()
    }

    pub fn height(&self) -> i32 {
        self.map.height()
    }

    pub fn dimensions(&self) -> (i32, i32) {
        (self.map.width(), self.map.height())
    }

    pub fn border_width(&self) -> i32 {
        self.map.border_width()
    }

    pub fn border_height(&self) -> i32 {
        self.map.border_height()
    }

    pub fn border_dimensions(&self) -> (i32, i32) {
        (self.map.border_width(), self.map.border_height())
    }

    // Observers

    pub fn subscribe(&mut self, observer: Box<dyn MapObserver>) -> ObserverId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> Option<Box<dyn MapObserver>> {
        self.observers.unsubscribe(id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    // Single blocks

    pub fn get_block(&self, x: i32, y: i32) -> Result<Block> {
        self.map.store.get(x, y)
    }

    pub fn get_border_block(&self, x: i32, y: i32) -> Result<Block> {
        self.map.store.get_border(x, y)
    }

    /// Write one interior cell, returning the previous block
    pub fn set_block(&mut self, x: i32, y: i32, block: Block, options: EditOptions) -> Result<Block> {
        self.map.store.blocks().check_bounds(x, y)?;
        self.config.block_limits.check(block)?;
        let prev = self.map.store.set(x, y, block)?;
        if options.notify && prev != block {
            self.observers.block_changed(x, y, prev, block);
        }
        self.finish_edit("Paint blocks", options, false);
        Ok(prev)
    }

    /// Write one interior cell from a possibly partial description
    pub fn set_block_from_partial(
        &mut self,
        x: i32,
        y: i32,
        partial: &PartialBlock,
        options: EditOptions,
    ) -> Result<Block> {
        let block = partial.resolve(self.get_block(x, y)?)?;
        self.set_block(x, y, block, options)
    }

    pub fn set_metatile_id(
        &mut self,
        x: i32,
        y: i32,
        metatile_id: u16,
        options: EditOptions,
    ) -> Result<Block> {
        let block = self.get_block(x, y)?.with_metatile_id(metatile_id)?;
        self.set_block(x, y, block, options)
    }

    pub fn set_collision(
        &mut self,
        x: i32,
        y: i32,
        collision: u16,
        options: EditOptions,
    ) -> Result<Block> {
        let block = self.get_block(x, y)?.with_collision(collision)?;
        self.set_block(x, y, block, options)
    }

    pub fn set_elevation(
        &mut self,
        x: i32,
        y: i32,
        elevation: u16,
        options: EditOptions,
    ) -> Result<Block> {
        let block = self.get_block(x, y)?.with_elevation(elevation)?;
        self.set_block(x, y, block, options)
    }

    /// Write one border cell, returning the previous block
    pub fn set_border_block(
        &mut self,
        x: i32,
        y: i32,
        block: Block,
        options: EditOptions,
    ) -> Result<Block> {
        self.map.store.border().check_bounds(x, y)?;
        self.config.block_limits.check(block)?;
        let prev = self.map.store.set_border(x, y, block)?;
        if prev != block {
            self.observers.bulk_changed(BulkChange {
                region: GridRegion::Border,
                changed: 1,
            });
        }
        self.finish_edit("Paint border", options, false);
        Ok(prev)
    }

    pub fn set_border_metatile_id(
        &mut self,
        x: i32,
        y: i32,
        metatile_id: u16,
        options: EditOptions,
    ) -> Result<Block> {
        let block = self.get_border_block(x, y)?.with_metatile_id(metatile_id)?;
        self.set_border_block(x, y, block, options)
    }

    // Bulk edits

    /// Stamp a selection with its top-left cell at `(x, y)`, returning the
    /// number of cells changed
    pub fn set_blocks_from_selection(
        &mut self,
        x: i32,
        y: i32,
        selection: &PaintSelection,
        options: EditOptions,
    ) -> Result<usize> {
        let grid = self.map.store.grid_mut(GridRegion::Interior);
        let changes = self.fill.paint_selection(grid, x, y, selection)?;
        Ok(self.finish_bulk(changes, "Paint selection", options))
    }

    /// Flood fill collision and elevation from a seed
    pub fn flood_fill(
        &mut self,
        x: i32,
        y: i32,
        collision: u16,
        elevation: u16,
        options: EditOptions,
    ) -> Result<usize> {
        let pattern = FillPattern::CollisionElevation {
            collision,
            elevation,
        };
        self.apply_fill(FillMode::Flood, x, y, &pattern, "Flood fill collision", options)
    }

    /// Replace collision and elevation on every cell matching the seed
    pub fn magic_fill(
        &mut self,
        x: i32,
        y: i32,
        collision: u16,
        elevation: u16,
        options: EditOptions,
    ) -> Result<usize> {
        let pattern = FillPattern::CollisionElevation {
            collision,
            elevation,
        };
        self.apply_fill(FillMode::Magic, x, y, &pattern, "Magic fill collision", options)
    }

    /// Flood fill a metatile id from a seed
    pub fn bucket_fill(
        &mut self,
        x: i32,
        y: i32,
        metatile_id: u16,
        options: EditOptions,
    ) -> Result<usize> {
        let pattern = FillPattern::Metatile(metatile_id);
        self.apply_fill(FillMode::Flood, x, y, &pattern, "Bucket fill", options)
    }

    /// Flood fill a selection tiled from the seed
    pub fn bucket_fill_from_selection(
        &mut self,
        x: i32,
        y: i32,
        selection: &PaintSelection,
        options: EditOptions,
    ) -> Result<usize> {
        let pattern = FillPattern::Selection(selection);
        self.apply_fill(FillMode::Flood, x, y, &pattern, "Bucket fill", options)
    }

    /// Replace the metatile id of every cell sharing the seed's
    pub fn magic_fill_metatile(
        &mut self,
        x: i32,
        y: i32,
        metatile_id: u16,
        options: EditOptions,
    ) -> Result<usize> {
        let pattern = FillPattern::Metatile(metatile_id);
        self.apply_fill(FillMode::Magic, x, y, &pattern, "Magic fill", options)
    }

    pub fn magic_fill_from_selection(
        &mut self,
        x: i32,
        y: i32,
        selection: &PaintSelection,
        options: EditOptions,
    ) -> Result<usize> {
        let pattern = FillPattern::Selection(selection);
        self.apply_fill(FillMode::Magic, x, y, &pattern, "Magic fill", options)
    }

    fn apply_fill(
        &mut self,
        mode: FillMode,
        x: i32,
        y: i32,
        pattern: &FillPattern<'_>,
        description: &str,
        options: EditOptions,
    ) -> Result<usize> {
        let grid = self.map.store.grid_mut(GridRegion::Interior);
        let changes = match mode {
            FillMode::Flood => self.fill.flood_fill(grid, x, y, pattern)?,
            FillMode::Magic => self.fill.magic_fill(grid, x, y, pattern)?,
        };
        Ok(self.finish_bulk(changes, description, options))
    }

    fn finish_bulk(
        &mut self,
        changes: Vec<BlockChange>,
        description: &str,
        options: EditOptions,
    ) -> usize {
        let changed = changes.len();
        if changed > 0 {
            self.observers.bulk_changed(BulkChange {
                region: GridRegion::Interior,
                changed,
            });
        }
        self.finish_edit(description, options, false);
        changed
    }

    // Structural edits

    /// Resize the interior, keeping overlapping cells
    pub fn resize(&mut self, width: i32, height: i32, options: EditOptions) -> Result<()> {
        self.config.validate_map_dimensions(width, height)?;
        let old = self.dimensions();
        if old == (width, height) {
            return Ok(());
        }
        self.map.store.resize(width, height, self.config.new_block)?;
        self.renderer.invalidate_all();
        tracing::debug!("Resized map '{}' from {:?} to {:?}", self.map.name(), old, (width, height));
        self.observers.map_changed(MapChange::Resized {
            old,
            new: (width, height),
        });
        self.finish_edit("Resize map", options, true);
        Ok(())
    }

    pub fn set_width(&mut self, width: i32, options: EditOptions) -> Result<()> {
        self.resize(width, self.height(), options)
    }

    pub fn set_height(&mut self, height: i32, options: EditOptions) -> Result<()> {
        self.resize(self.width(), height, options)
    }

    /// Resize the border grid, keeping overlapping cells
    pub fn resize_border(&mut self, width: i32, height: i32, options: EditOptions) -> Result<()> {
        self.config.validate_border_dimensions(width, height)?;
        let old = self.border_dimensions();
        if old == (width, height) {
            return Ok(());
        }
        self.map
            .store
            .resize_border(width, height, self.config.new_block)?;
        self.observers.map_changed(MapChange::BorderResized {
            old,
            new: (width, height),
        });
        self.finish_edit("Resize border", options, true);
        Ok(())
    }

    /// Move every interior cell, wrapping around the edges
    pub fn shift(&mut self, dx: i32, dy: i32, options: EditOptions) -> Result<()> {
        let (width, height) = self.dimensions();
        if dx.rem_euclid(width) == 0 && dy.rem_euclid(height) == 0 {
            return Ok(());
        }
        self.map.store.shift(dx, dy);
        self.observers.map_changed(MapChange::Shifted { dx, dy });
        self.finish_edit("Shift map", options, true);
        Ok(())
    }

    fn finish_edit(&mut self, description: &str, options: EditOptions, structural: bool) {
        self.pending_structural |= structural;
        if self.pending_description.is_none() {
            self.pending_description = Some(description.to_string());
        }
        if options.commit {
            self.commit();
        }
        if options.redraw {
            self.redraw();
        }
    }

    // History

    /// Whether edits made with `commit = false` are waiting for a commit
    pub fn has_pending_changes(&self) -> bool {
        self.map.store != self.committed
    }

    /// Record every change since the last commit as one history entry
    ///
    /// Returns false when nothing changed.
    pub fn commit(&mut self) -> bool {
        let description = self
            .pending_description
            .take()
            .unwrap_or_else(|| "Edit map".to_string());
        let structural = std::mem::take(&mut self.pending_structural);
        let Some(record) =
            EditRecord::from_diff(description, &self.committed, &self.map.store, structural)
        else {
            return false;
        };
        self.history.push(record);
        self.committed = self.map.store.clone();
        true
    }

    /// Ask listeners to redraw the map
    pub fn redraw(&mut self) {
        self.observers.map_changed(MapChange::NeedsRedraw);
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo() || self.has_pending_changes()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo() && !self.has_pending_changes()
    }

    /// Restore the state before the most recent edit
    ///
    /// Uncommitted changes are committed first, so they are what gets undone.
    pub fn undo(&mut self) -> Result<()> {
        self.commit();
        let record = self.history.undo()?;
        tracing::info!("Undo '{}'", record.description);
        let outcome = replay(&mut self.map.store, record, ReplayDirection::Undo);
        self.finish_replay(outcome);
        Ok(())
    }

    /// Reapply the most recently undone edit
    pub fn redo(&mut self) -> Result<()> {
        self.commit();
        let record = self.history.redo()?;
        tracing::info!("Redo '{}'", record.description);
        let outcome = replay(&mut self.map.store, record, ReplayDirection::Redo);
        self.finish_replay(outcome);
        Ok(())
    }

    fn finish_replay(&mut self, outcome: ReplayOutcome) {
        self.committed = self.map.store.clone();
        if let Some((old, new)) = outcome.resized {
            self.renderer.invalidate_all();
            self.observers.map_changed(MapChange::Resized { old, new });
        }
        if let Some((old, new)) = outcome.border_resized {
            self.observers
                .map_changed(MapChange::BorderResized { old, new });
        }
        for (region, changed) in outcome.regions {
            self.observers.bulk_changed(BulkChange { region, changed });
        }
        self.redraw();
    }

    /// Whether there are edits since the last save
    pub fn has_unsaved_changes(&self) -> bool {
        self.has_pending_changes() || !self.history.is_clean()
    }

    /// Treat the current state as saved
    pub fn mark_saved(&mut self) {
        self.commit();
        self.history.set_clean();
        tracing::info!("Marked map '{}' as saved", self.map.name());
    }

    // Rendering

    pub fn render(&mut self, ignore_cache: bool) -> &RgbaImage {
        self.renderer.render(&self.map, &self.tilesets, ignore_cache)
    }

    pub fn render_collision(&mut self, opacity: f32, ignore_cache: bool) -> &RgbaImage {
        self.renderer
            .render_collision(&self.map, opacity, ignore_cache)
    }

    /// Collision overlay at the configured opacity
    pub fn render_collision_overlay(&mut self, ignore_cache: bool) -> &RgbaImage {
        self.renderer
            .render_collision(&self.map, self.config.collision_opacity, ignore_cache)
    }

    pub fn render_border(&mut self, ignore_cache: bool) -> &RgbaImage {
        self.renderer
            .render_border(&self.map, &self.tilesets, ignore_cache)
    }

    /// The interior inside a band of `border_distance` border blocks
    pub fn render_with_border(&mut self) -> RgbaImage {
        self.renderer
            .render_with_border(&self.map, &self.tilesets, self.config.border_distance)
    }

    /// Render another grid with this map's tilesets, leaving the caches alone
    pub fn render_from(&self, source: &Blockdata) -> RgbaImage {
        render::render_from(source, &self.map, &self.tilesets)
    }

    /// The strip of `neighbor` visible across one of this map's connections
    ///
    /// Returns `None` for dive and emerge connections.
    pub fn render_connection(
        &self,
        connection: &MapConnection,
        neighbor: &mut MapModel,
    ) -> Option<RgbaImage> {
        if !connection.direction.is_cardinal() {
            return None;
        }
        let image = neighbor.render(false);
        render::connection_strip(image, connection.direction, self.config.border_distance)
    }

    /// Swap the tilesets, redrawing every image on the next render
    pub fn set_tilesets(&mut self, tilesets: TilesetPair) {
        self.tilesets = tilesets;
        self.renderer.invalidate_all();
        self.observers.map_changed(MapChange::TilesetsChanged);
    }

    /// Replace the metatile layer order and opacities
    pub fn set_layer_settings(&mut self, order: Vec<usize>, opacity: Vec<f32>) {
        self.map.metatile_layer_order = order;
        self.map.metatile_layer_opacity = opacity;
        self.observers.map_changed(MapChange::Metadata);
    }

    // Connections and events

    pub fn connections(&self) -> &[MapConnection] {
        &self.map.connections
    }

    pub fn add_connection(&mut self, connection: MapConnection) -> Uuid {
        let id = connection.id;
        self.map.add_connection(connection);
        self.observers.map_changed(MapChange::Metadata);
        id
    }

    pub fn remove_connection(&mut self, id: Uuid) -> Option<MapConnection> {
        let removed = self.map.remove_connection(id);
        if removed.is_some() {
            self.observers.map_changed(MapChange::Metadata);
        }
        removed
    }

    pub fn events(&self) -> &EventStore {
        &self.map.events
    }

    pub fn add_event(&mut self, event: Event) -> EventId {
        let id = self.map.events.add(event);
        self.observers.map_changed(MapChange::Metadata);
        id
    }

    pub fn remove_event(&mut self, id: EventId) -> Result<Event> {
        let event = self.map.events.remove(id)?;
        self.observers.map_changed(MapChange::Metadata);
        Ok(event)
    }

    /// Move an event to a new position
    pub fn move_event(&mut self, id: EventId, x: i32, y: i32) -> Result<()> {
        let event = self
            .map
            .events
            .get_mut(id)
            .ok_or_else(|| blockmap_core::MapError::UnknownEvent(id.to_string()))?;
        event.x = x;
        event.y = y;
        self.observers.map_changed(MapChange::Metadata);
        Ok(())
    }
}
