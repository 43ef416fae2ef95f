//! blockmap_script - Rhai scripting for blockmap maps
//!
//! A [`ScriptHost`] binds one Rhai engine to one shared [`MapModel`]:
//! - camelCase map functions (`getBlock`, `setBlock`, `bucketFill`, ...)
//! - optional `forceRedraw` / `commitChanges` flags on every mutator
//! - callbacks (`onBlockChanged`, `onMapResized`, `onMapShifted`,
//!   `onBorderResized`) run after the map is released
//!
//! # Example
//!
//! ```ignore
//! let map = Rc::new(RefCell::new(model));
//! let mut host = ScriptHost::new(map.clone())?;
//! host.load(r#"
//!     fn onBlockChanged(x, y, prevBlock, newBlock) {
//!         log("info", `painted ${x},${y} with ${newBlock.metatileId}`);
//!     }
//! "#)?;
//! host.eval("bucketFill(0, 0, 5)")?;
//! ```

mod api;
mod callbacks;

pub use callbacks::ScriptEvent;

use api::ApiContext;
use blockmap_core::MapError;
use blockmap_editor::{MapModel, ObserverId, PaintSelection};
use callbacks::{EventQueue, EventRelay};
use rhai::{CallFnOptions, Dynamic, Engine, EvalAltResult, ParseError, Scope, AST, INT};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, warn};

/// The map a script edits, shared with the host application
pub type SharedMap = Rc<RefCell<MapModel>>;

/// The metatile selection used by the `...FromSelection` functions
pub type SharedSelection = Rc<RefCell<Option<PaintSelection>>>;

/// Upper bound on callbacks run by one dispatch, since callbacks can
/// queue further events
const MAX_DISPATCHED_EVENTS: usize = 10_000;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Compile error: {0}")]
    Compile(#[from] ParseError),
    #[error("Runtime error: {0}")]
    Runtime(#[from] Box<EvalAltResult>),
    #[error("{0}")]
    Map(#[from] MapError),
    #[error("map is busy")]
    MapBusy,
}

/// A Rhai engine bound to one map
pub struct ScriptHost {
    engine: Engine,
    map: SharedMap,
    selection: SharedSelection,
    events: EventQueue,
    relay: ObserverId,
    ast: Option<AST>,
    scope: Scope<'static>,
}

impl ScriptHost {
    /// Create a host and start listening for map changes
    ///
    /// Fails with [`ScriptError::MapBusy`] if the map is already borrowed.
    pub fn new(map: SharedMap) -> Result<Self, ScriptError> {
        let selection = SharedSelection::default();
        let events = EventQueue::default();
        let relay = map
            .try_borrow_mut()
            .map_err(|_| ScriptError::MapBusy)?
            .subscribe(Box::new(EventRelay::new(events.clone())));
        let ctx = ApiContext {
            map: map.clone(),
            selection: selection.clone(),
        };

        Ok(Self {
            engine: Self::create_engine(&ctx),
            map,
            selection,
            events,
            relay,
            ast: None,
            scope: Scope::new(),
        })
    }

    fn create_engine(ctx: &ApiContext) -> Engine {
        let mut engine = Engine::new();

        // Configure safety limits
        engine.set_max_expr_depths(64, 64);
        engine.set_max_operations(10_000_000);
        engine.set_max_string_size(1_000_000);
        engine.set_max_array_size(1_000_000);
        engine.set_max_map_size(10_000);

        api::register_map_api(&mut engine, ctx);
        api::register_utility_functions(&mut engine);
        engine
    }

    pub fn map(&self) -> &SharedMap {
        &self.map
    }

    /// Set or clear the selection painted by the selection functions
    pub fn set_selection(&mut self, selection: Option<PaintSelection>) {
        *self.selection.borrow_mut() = selection;
    }

    pub fn selection(&self) -> Option<PaintSelection> {
        self.selection.borrow().clone()
    }

    /// Compile and run a script, keeping its functions as callbacks
    pub fn load(&mut self, source: &str) -> Result<(), ScriptError> {
        let ast = self.engine.compile(source)?;
        self.scope = Scope::new();
        let result = self.engine.run_ast_with_scope(&mut self.scope, &ast);
        let defined = ast.iter_functions().count();
        self.ast = Some(ast);
        if let Err(e) = result {
            warn!("[script] load failed: {}", e);
            return Err(e.into());
        }
        debug!("[script] loaded script with {} functions", defined);
        self.dispatch_callbacks();
        Ok(())
    }

    /// Evaluate a snippet with access to the loaded script's functions
    pub fn eval(&mut self, source: &str) -> Result<Dynamic, ScriptError> {
        let snippet = self.engine.compile(source)?;
        let ast = match &self.ast {
            Some(loaded) => loaded.clone_functions_only().merge(&snippet),
            None => snippet,
        };
        let result = self.engine.eval_ast_with_scope::<Dynamic>(&mut self.scope, &ast);
        self.dispatch_callbacks();
        result.map_err(|e| {
            warn!("[script] eval failed: {}", e);
            e.into()
        })
    }

    /// Events waiting for dispatch
    pub fn pending_events(&self) -> usize {
        self.events.borrow().len()
    }

    /// Run the script callback for every queued event, returning how many
    /// were called
    ///
    /// Events without a matching script function are dropped. Callback
    /// errors are logged and do not stop the remaining events.
    pub fn dispatch_callbacks(&mut self) -> usize {
        let Some(ast) = &self.ast else {
            self.events.borrow_mut().clear();
            return 0;
        };

        let mut called = 0;
        let mut seen = 0;
        loop {
            let Some(event) = self.events.borrow_mut().pop_front() else {
                break;
            };
            seen += 1;
            if seen > MAX_DISPATCHED_EVENTS {
                warn!(
                    "[script] callback limit reached, dropping {} events",
                    self.events.borrow().len() + 1
                );
                self.events.borrow_mut().clear();
                break;
            }

            let name = event.callback_name();
            if !ast.iter_functions().any(|f| f.name == name) {
                continue;
            }
            let options = CallFnOptions::new().eval_ast(false).rewind_scope(true);
            let result = match event {
                ScriptEvent::BlockChanged { x, y, prev, new } => {
                    match (api::block_to_dynamic(prev), api::block_to_dynamic(new)) {
                        (Ok(prev), Ok(new)) => self.engine.call_fn_with_options::<Dynamic>(
                            options,
                            &mut self.scope,
                            ast,
                            name,
                            (INT::from(x), INT::from(y), prev, new),
                        ),
                        (Err(e), _) | (_, Err(e)) => Err(e.to_string().into()),
                    }
                }
                ScriptEvent::MapResized { old, new } | ScriptEvent::BorderResized { old, new } => {
                    self.engine.call_fn_with_options::<Dynamic>(
                        options,
                        &mut self.scope,
                        ast,
                        name,
                        (
                            INT::from(old.0),
                            INT::from(old.1),
                            INT::from(new.0),
                            INT::from(new.1),
                        ),
                    )
                }
                ScriptEvent::MapShifted { dx, dy } => self.engine.call_fn_with_options::<Dynamic>(
                    options,
                    &mut self.scope,
                    ast,
                    name,
                    (INT::from(dx), INT::from(dy)),
                ),
            };
            match result {
                Ok(_) => called += 1,
                Err(e) => warn!("[script] {} failed: {}", name, e),
            }
        }
        called
    }
}

impl Drop for ScriptHost {
    fn drop(&mut self) {
        match self.map.try_borrow_mut() {
            Ok(mut model) => {
                model.unsubscribe(self.relay);
            }
            Err(_) => warn!(
                "[script] map busy while dropping host, relay {:?} stays subscribed",
                self.relay
            ),
        }
    }
}

impl std::fmt::Debug for ScriptHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptHost")
            .field("loaded", &self.ast.is_some())
            .field("pending_events", &self.pending_events())
            .finish()
    }
}
