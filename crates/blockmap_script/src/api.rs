//! Script functions bound to one map
//!
//! Names follow the camelCase scripting API. Every mutator has three
//! overloads: without flags, with `forceRedraw`, and with `forceRedraw`
//! and `commitChanges`; both flags default to true.

use crate::{ScriptError, SharedMap, SharedSelection};
use blockmap_core::{
    Block, BlockInfo, MapError, PartialBlock, MAX_COLLISION, MAX_ELEVATION, MAX_METATILE_ID,
};
use blockmap_editor::{EditOptions, MapModel, PaintSelection};
use rhai::{Dynamic, Engine, EvalAltResult, INT};
use tracing::{debug, info, warn};

type ApiResult<T> = Result<T, Box<EvalAltResult>>;

/// Shared state captured by every registered function
#[derive(Clone)]
pub(crate) struct ApiContext {
    pub(crate) map: SharedMap,
    pub(crate) selection: SharedSelection,
}

fn into_script_error(error: ScriptError) -> Box<EvalAltResult> {
    warn!("[script] rejected call: {}", error);
    match error {
        ScriptError::Runtime(e) => e,
        other => other.to_string().into(),
    }
}

fn read<T>(
    ctx: &ApiContext,
    f: impl FnOnce(&MapModel) -> Result<T, ScriptError>,
) -> ApiResult<T> {
    let model = ctx
        .map
        .try_borrow()
        .map_err(|_| into_script_error(ScriptError::MapBusy))?;
    f(&model).map_err(into_script_error)
}

fn edit<T>(
    ctx: &ApiContext,
    redraw: bool,
    commit: bool,
    f: impl FnOnce(&mut MapModel, EditOptions, Option<&PaintSelection>) -> Result<T, ScriptError>,
) -> ApiResult<T> {
    let selection = ctx.selection.borrow();
    let mut model = ctx
        .map
        .try_borrow_mut()
        .map_err(|_| into_script_error(ScriptError::MapBusy))?;
    f(&mut model, EditOptions::scripted(redraw, commit), selection.as_ref())
        .map_err(into_script_error)
}

/// Script integers saturate so out-of-range values stay out of range
fn coord(value: INT) -> i32 {
    value.clamp(INT::from(i32::MIN), INT::from(i32::MAX)) as i32
}

fn field(name: &'static str, value: INT, max: u16) -> blockmap_core::Result<u16> {
    u16::try_from(value)
        .ok()
        .filter(|v| *v <= max)
        .ok_or(MapError::InconsistentBlockEncoding {
            field: name,
            value,
            max,
        })
}

pub(crate) fn block_to_dynamic(block: Block) -> Result<Dynamic, ScriptError> {
    Ok(rhai::serde::to_dynamic(BlockInfo::from(block))?)
}

fn dimensions_map(width: i32, height: i32) -> rhai::Map {
    let mut map = rhai::Map::new();
    map.insert("width".into(), Dynamic::from_int(INT::from(width)));
    map.insert("height".into(), Dynamic::from_int(INT::from(height)));
    map
}

fn selection_or_missing(selection: Option<&PaintSelection>) -> Result<&PaintSelection, MapError> {
    selection.ok_or(MapError::MissingSelection)
}

/// Register a mutator with its optional `forceRedraw` and `commitChanges`
/// overloads
macro_rules! register_edit {
    ($engine:expr, $ctx:expr, $name:literal,
     |$model:ident, $opts:ident, $sel:ident $(, $arg:ident : $ty:ty)*| $body:expr) => {{
        let ctx = $ctx.clone();
        $engine.register_fn($name, move |$($arg: $ty),*| {
            edit(&ctx, true, true, |$model, $opts, $sel| $body)
        });
        let ctx = $ctx.clone();
        $engine.register_fn($name, move |$($arg: $ty,)* redraw: bool| {
            edit(&ctx, redraw, true, |$model, $opts, $sel| $body)
        });
        let ctx = $ctx.clone();
        $engine.register_fn($name, move |$($arg: $ty,)* redraw: bool, commit: bool| {
            edit(&ctx, redraw, commit, |$model, $opts, $sel| $body)
        });
    }};
}

/// Register every map function
pub(crate) fn register_map_api(engine: &mut Engine, ctx: &ApiContext) {
    register_block_functions(engine, ctx);
    register_fill_functions(engine, ctx);
    register_dimension_functions(engine, ctx);
    register_border_functions(engine, ctx);
    register_flush_functions(engine, ctx);
}

fn register_block_functions(engine: &mut Engine, ctx: &ApiContext) {
    // getBlock(x, y) -> #{metatileId, collision, elevation, rawValue}
    let c = ctx.clone();
    engine.register_fn("getBlock", move |x: INT, y: INT| -> ApiResult<Dynamic> {
        read(&c, |model| block_to_dynamic(model.get_block(coord(x), coord(y))?))
    });

    let c = ctx.clone();
    engine.register_fn("getMetatileId", move |x: INT, y: INT| -> ApiResult<INT> {
        read(&c, |model| {
            Ok(INT::from(model.get_block(coord(x), coord(y))?.metatile_id()))
        })
    });

    let c = ctx.clone();
    engine.register_fn("getCollision", move |x: INT, y: INT| -> ApiResult<INT> {
        read(&c, |model| {
            Ok(INT::from(model.get_block(coord(x), coord(y))?.collision()))
        })
    });

    let c = ctx.clone();
    engine.register_fn("getElevation", move |x: INT, y: INT| -> ApiResult<INT> {
        read(&c, |model| {
            Ok(INT::from(model.get_block(coord(x), coord(y))?.elevation()))
        })
    });

    // setBlock(x, y, metatileId, collision, elevation)
    register_edit!(engine, ctx, "setBlock",
        |model, opts, _sel, x: INT, y: INT, metatile_id: INT, collision: INT, elevation: INT| {
            let block = Block::new(
                field("metatileId", metatile_id, MAX_METATILE_ID)?,
                field("collision", collision, MAX_COLLISION)?,
                field("elevation", elevation, MAX_ELEVATION)?,
            )?;
            model.set_block(coord(x), coord(y), block, opts)?;
            Ok(())
        });

    // setBlock(x, y, rawValue)
    register_edit!(engine, ctx, "setBlock", |model, opts, _sel, x: INT, y: INT, raw: INT| {
        let block = Block::from_raw(field("rawValue", raw, u16::MAX)?);
        model.set_block(coord(x), coord(y), block, opts)?;
        Ok(())
    });

    // setBlock(x, y, #{...}) with missing fields taken from the current block
    register_edit!(engine, ctx, "setBlock",
        |model, opts, _sel, x: INT, y: INT, block: rhai::Map| {
            let partial: PartialBlock =
                rhai::serde::from_dynamic(&Dynamic::from_map(block.clone()))?;
            model.set_block_from_partial(coord(x), coord(y), &partial, opts)?;
            Ok(())
        });

    register_edit!(engine, ctx, "setMetatileId",
        |model, opts, _sel, x: INT, y: INT, metatile_id: INT| {
            let id = field("metatileId", metatile_id, MAX_METATILE_ID)?;
            model.set_metatile_id(coord(x), coord(y), id, opts)?;
            Ok(())
        });

    register_edit!(engine, ctx, "setCollision",
        |model, opts, _sel, x: INT, y: INT, collision: INT| {
            let collision = field("collision", collision, MAX_COLLISION)?;
            model.set_collision(coord(x), coord(y), collision, opts)?;
            Ok(())
        });

    register_edit!(engine, ctx, "setElevation",
        |model, opts, _sel, x: INT, y: INT, elevation: INT| {
            let elevation = field("elevation", elevation, MAX_ELEVATION)?;
            model.set_elevation(coord(x), coord(y), elevation, opts)?;
            Ok(())
        });

    register_edit!(engine, ctx, "setBlocksFromSelection", |model, opts, sel, x: INT, y: INT| {
        let selection = selection_or_missing(sel)?;
        Ok(model.set_blocks_from_selection(coord(x), coord(y), selection, opts)? as INT)
    });
}

fn register_fill_functions(engine: &mut Engine, ctx: &ApiContext) {
    // Fills return the number of cells they changed

    register_edit!(engine, ctx, "bucketFill",
        |model, opts, _sel, x: INT, y: INT, metatile_id: INT| {
            let id = field("metatileId", metatile_id, MAX_METATILE_ID)?;
            Ok(model.bucket_fill(coord(x), coord(y), id, opts)? as INT)
        });

    register_edit!(engine, ctx, "bucketFillFromSelection", |model, opts, sel, x: INT, y: INT| {
        let selection = selection_or_missing(sel)?;
        Ok(model.bucket_fill_from_selection(coord(x), coord(y), selection, opts)? as INT)
    });

    register_edit!(engine, ctx, "magicFill",
        |model, opts, _sel, x: INT, y: INT, metatile_id: INT| {
            let id = field("metatileId", metatile_id, MAX_METATILE_ID)?;
            Ok(model.magic_fill_metatile(coord(x), coord(y), id, opts)? as INT)
        });

    register_edit!(engine, ctx, "magicFillFromSelection", |model, opts, sel, x: INT, y: INT| {
        let selection = selection_or_missing(sel)?;
        Ok(model.magic_fill_from_selection(coord(x), coord(y), selection, opts)? as INT)
    });

    register_edit!(engine, ctx, "floodFillCollision",
        |model, opts, _sel, x: INT, y: INT, collision: INT, elevation: INT| {
            let collision = field("collision", collision, MAX_COLLISION)?;
            let elevation = field("elevation", elevation, MAX_ELEVATION)?;
            Ok(model.flood_fill(coord(x), coord(y), collision, elevation, opts)? as INT)
        });

    register_edit!(engine, ctx, "magicFillCollision",
        |model, opts, _sel, x: INT, y: INT, collision: INT, elevation: INT| {
            let collision = field("collision", collision, MAX_COLLISION)?;
            let elevation = field("elevation", elevation, MAX_ELEVATION)?;
            Ok(model.magic_fill(coord(x), coord(y), collision, elevation, opts)? as INT)
        });

    register_edit!(engine, ctx, "shift", |model, opts, _sel, dx: INT, dy: INT| {
        model.shift(coord(dx), coord(dy), opts)?;
        Ok(())
    });
}

fn register_dimension_functions(engine: &mut Engine, ctx: &ApiContext) {
    let c = ctx.clone();
    engine.register_fn("getDimensions", move || -> ApiResult<rhai::Map> {
        read(&c, |model| {
            let (width, height) = model.dimensions();
            Ok(dimensions_map(width, height))
        })
    });

    let c = ctx.clone();
    engine.register_fn("getWidth", move || -> ApiResult<INT> {
        read(&c, |model| Ok(INT::from(model.width())))
    });

    let c = ctx.clone();
    engine.register_fn("getHeight", move || -> ApiResult<INT> {
        read(&c, |model| Ok(INT::from(model.height())))
    });

    let c = ctx.clone();
    engine.register_fn("getMapName", move || -> ApiResult<String> {
        read(&c, |model| Ok(model.name().to_string()))
    });

    register_edit!(engine, ctx, "setDimensions", |model, opts, _sel, width: INT, height: INT| {
        model.resize(coord(width), coord(height), opts)?;
        Ok(())
    });

    register_edit!(engine, ctx, "setWidth", |model, opts, _sel, width: INT| {
        model.set_width(coord(width), opts)?;
        Ok(())
    });

    register_edit!(engine, ctx, "setHeight", |model, opts, _sel, height: INT| {
        model.set_height(coord(height), opts)?;
        Ok(())
    });
}

fn register_border_functions(engine: &mut Engine, ctx: &ApiContext) {
    let c = ctx.clone();
    engine.register_fn("getBorderDimensions", move || -> ApiResult<rhai::Map> {
        read(&c, |model| {
            let (width, height) = model.border_dimensions();
            Ok(dimensions_map(width, height))
        })
    });

    let c = ctx.clone();
    engine.register_fn("getBorderWidth", move || -> ApiResult<INT> {
        read(&c, |model| Ok(INT::from(model.border_width())))
    });

    let c = ctx.clone();
    engine.register_fn("getBorderHeight", move || -> ApiResult<INT> {
        read(&c, |model| Ok(INT::from(model.border_height())))
    });

    let c = ctx.clone();
    engine.register_fn("getBorderMetatileId", move |x: INT, y: INT| -> ApiResult<INT> {
        read(&c, |model| {
            Ok(INT::from(model.get_border_block(coord(x), coord(y))?.metatile_id()))
        })
    });

    register_edit!(engine, ctx, "setBorderMetatileId",
        |model, opts, _sel, x: INT, y: INT, metatile_id: INT| {
            let id = field("metatileId", metatile_id, MAX_METATILE_ID)?;
            model.set_border_metatile_id(coord(x), coord(y), id, opts)?;
            Ok(())
        });

    register_edit!(engine, ctx, "setBorderDimensions",
        |model, opts, _sel, width: INT, height: INT| {
            model.resize_border(coord(width), coord(height), opts)?;
            Ok(())
        });
}

fn register_flush_functions(engine: &mut Engine, ctx: &ApiContext) {
    let c = ctx.clone();
    engine.register_fn("redraw", move || -> ApiResult<()> {
        edit(&c, false, false, |model, _, _| {
            model.redraw();
            Ok(())
        })
    });

    // commit() -> bool, false when nothing was pending
    let c = ctx.clone();
    engine.register_fn("commit", move || -> ApiResult<bool> {
        edit(&c, false, false, |model, _, _| Ok(model.commit()))
    });
}

/// Register `println` and `log`, forwarding to tracing
pub(crate) fn register_utility_functions(engine: &mut Engine) {
    engine.on_print(|msg| info!("[script] {}", msg));
    engine.on_debug(|msg, _, pos| debug!("[script] {} @ {:?}", msg, pos));

    engine.register_fn("println", |msg: &str| {
        info!("[script] {}", msg);
    });

    engine.register_fn("log", |level: &str, msg: &str| match level {
        "debug" => debug!("[script] {}", msg),
        "info" => info!("[script] {}", msg),
        "warn" => warn!("[script] {}", msg),
        "error" => tracing::error!("[script] {}", msg),
        _ => info!("[script] {}", msg),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coord_saturates() {
        assert_eq!(coord(5), 5);
        assert_eq!(coord(-3), -3);
        assert_eq!(coord(INT::MAX), i32::MAX);
        assert_eq!(coord(INT::MIN), i32::MIN);
    }

    #[test]
    fn test_field_range() {
        assert_eq!(field("collision", 3, MAX_COLLISION).unwrap(), 3);
        assert!(matches!(
            field("collision", 4, MAX_COLLISION),
            Err(MapError::InconsistentBlockEncoding {
                field: "collision",
                value: 4,
                ..
            })
        ));
        assert!(field("elevation", -1, MAX_ELEVATION).is_err());
        assert!(field("rawValue", 70_000, u16::MAX).is_err());
    }

    #[test]
    fn test_block_wire_shape() {
        let value = block_to_dynamic(Block::new(4, 1, 2).unwrap()).unwrap();
        let map = value.cast::<rhai::Map>();
        assert_eq!(map["metatileId"].as_int().unwrap(), 4);
        assert_eq!(map["collision"].as_int().unwrap(), 1);
        assert_eq!(map["elevation"].as_int().unwrap(), 2);
        assert_eq!(
            map["rawValue"].as_int().unwrap(),
            INT::from(Block::new(4, 1, 2).unwrap().raw())
        );
    }
}
