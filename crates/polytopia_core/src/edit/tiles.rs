use tracing::info;

use super::builders::{build_city, build_city_header, build_empty_tile};
use super::replace_tile;
use crate::decoder::Decoded;
use crate::encoder::encode_map;
use crate::error::{Error, Result, ensure_range};
use crate::layout::OffsetKey;
use crate::model::{TILE_OWNER_OFFSET, altitude_for_terrain};
use crate::patch::PatchWriter;

/// Sets a tile's terrain and the altitude the game pairs with it.
pub fn modify_tile_terrain(writer: &mut PatchWriter, x: u32, y: u32, terrain: u16) -> Result<()> {
    let Decoded { mut model, index } = writer.decode()?;
    let tile = model.tile_mut(x, y)?;
    tile.terrain = terrain;
    tile.altitude = altitude_for_terrain(terrain);
    replace_tile(writer, &index, tile)?;
    info!(x, y, terrain, "modified tile terrain");
    Ok(())
}

/// Changes a tile's owner. A city tile cannot be given away to owner 0 and a
/// plain type-1 improvement cannot gain an owner, since either would change
/// how the improvement record is read back.
pub fn modify_tile_owner(writer: &mut PatchWriter, x: u32, y: u32, owner: u8) -> Result<()> {
    let Decoded { mut model, index } = writer.decode()?;
    let tile = model.tile_mut(x, y)?;
    tile.owner = owner;
    replace_tile(writer, &index, tile)?;
    info!(x, y, owner, "modified tile owner");
    Ok(())
}

pub fn modify_tile_capital(writer: &mut PatchWriter, x: u32, y: u32, capital: u8) -> Result<()> {
    ensure_range("capital", i64::from(capital), 0, 254)?;
    let Decoded { mut model, index } = writer.decode()?;
    let tile = model.tile_mut(x, y)?;
    tile.capital = capital;
    replace_tile(writer, &index, tile)?;
    info!(x, y, capital, "modified tile capital");
    Ok(())
}

pub fn modify_tile_road(writer: &mut PatchWriter, x: u32, y: u32, has_road: bool) -> Result<()> {
    let Decoded { mut model, index } = writer.decode()?;
    let tile = model.tile_mut(x, y)?;
    tile.has_road = has_road.into();
    replace_tile(writer, &index, tile)?;
    info!(x, y, has_road, "modified tile road");
    Ok(())
}

/// Replaces a tile with a flat, unowned, unexplored one.
pub fn reset_tile(writer: &mut PatchWriter, x: u32, y: u32) -> Result<()> {
    let Decoded { model, index } = writer.decode()?;
    model.tile(x, y)?;
    let bytes = build_empty_tile(x, y)?;
    writer.replace_range(
        &index,
        OffsetKey::TileStart { x, y },
        OffsetKey::TileEnd { x, y },
        &bytes,
    )?;
    info!(x, y, "reset tile");
    Ok(())
}

/// Founds a level 1 city for player `tribe` on the tile, replacing whatever
/// improvement was there.
pub fn add_city(writer: &mut PatchWriter, x: u32, y: u32, name: &str, tribe: u8) -> Result<()> {
    ensure_range("city owner", i64::from(tribe), 1, i64::from(u8::MAX))?;
    let Decoded { model, index } = writer.decode()?;
    if model.current.player(tribe).is_none() {
        return Err(Error::UnknownPlayer(tribe));
    }
    let tile = model.tile(x, y)?;
    if tile.resource.is_some() {
        return Err(Error::UnsupportedVariant(format!(
            "tile ({x}, {y}) has a resource; a city there would read back as a plain improvement"
        )));
    }
    let city = build_city(name)?;

    let header_at = writer.resolve(&index, OffsetKey::TileStart { x, y })? + TILE_OWNER_OFFSET;
    writer.overwrite_at(header_at, &build_city_header(x, y, tribe))?;
    writer.replace_range(
        &index,
        OffsetKey::TileImprovementStart { x, y },
        OffsetKey::TileImprovementEnd { x, y },
        &city,
    )?;
    info!(x, y, name, tribe, "added city");
    Ok(())
}

/// Makes a tile visible to `tribe`. Returns `false` when it already was.
pub fn reveal_tile(writer: &mut PatchWriter, x: u32, y: u32, tribe: u8) -> Result<bool> {
    let Decoded { mut model, index } = writer.decode()?;
    let tile = model.tile_mut(x, y)?;
    if tile.visibility.contains(&tribe) {
        return Ok(false);
    }
    tile.visibility.push(tribe);
    ensure_range(
        "visibility count",
        tile.visibility.len() as i64,
        0,
        i64::from(u8::MAX),
    )?;

    let mut bytes = Vec::with_capacity(tile.visibility.len() + 1);
    bytes.push(tile.visibility.len() as u8);
    bytes.extend_from_slice(&tile.visibility);
    writer.replace_range(
        &index,
        OffsetKey::TileVisibility { x, y },
        OffsetKey::TileRoad { x, y },
        &bytes,
    )?;
    info!(x, y, tribe, "revealed tile");
    Ok(true)
}

/// Makes every tile visible to `tribe` with a single rewrite of the map
/// block. Returns how many tiles were newly revealed.
pub fn reveal_all_tiles(writer: &mut PatchWriter, tribe: u8) -> Result<usize> {
    let Decoded { mut model, index } = writer.decode()?;
    let mut revealed = 0;
    for tile in model.current.iter_tiles_mut() {
        if !tile.visibility.contains(&tribe) {
            tile.visibility.push(tribe);
            revealed += 1;
        }
    }
    if revealed == 0 {
        return Ok(0);
    }

    let bytes = encode_map(&model.current.tiles)?;
    writer.replace_range(&index, OffsetKey::MapStart, OffsetKey::MapEnd, &bytes)?;
    info!(tribe, revealed, "revealed all tiles");
    Ok(revealed)
}
