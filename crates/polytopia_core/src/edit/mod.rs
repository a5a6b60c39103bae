//! Named save edits.
//!
//! Every operation takes the [`PatchWriter`] holding the save, decodes it
//! first, and expresses its change as byte patches against the offsets that
//! decode recorded. Operations that need several length-changing patches
//! either order them back to front on one index or decode again between
//! steps.

pub mod builders;
mod game;
mod map;
mod players;
mod tiles;
mod units;
mod views;

pub use builders::{
    build_city, build_city_header, build_empty_player, build_empty_tile, splice_known_player,
};
pub use game::{reset_game, rewrite_current};
pub use map::{expand_columns, expand_map, expand_rows, modify_map_dimensions};
pub use players::{
    add_player, default_player_name, modify_player_color, modify_player_name,
    modify_player_tribe, swap_players,
};
pub use tiles::{
    add_city, modify_tile_capital, modify_tile_owner, modify_tile_road, modify_tile_terrain,
    reset_tile, reveal_all_tiles, reveal_tile,
};
pub use units::{convert_all_units, convert_tribe_units, modify_unit_tribe, modify_unit_type};
pub use views::{PlayerSummary, list_cities, list_players, list_units};

use crate::encoder::{encode_players, encode_tile};
use crate::error::Result;
use crate::layout::{OffsetIndex, OffsetKey};
use crate::model::{Player, Tile};
use crate::patch::PatchWriter;

/// Re-encodes one tile and swaps it in for the recorded tile range.
fn replace_tile(writer: &mut PatchWriter, index: &OffsetIndex, tile: &Tile) -> Result<()> {
    let bytes = encode_tile(tile)?;
    let (x, y) = (tile.x, tile.y);
    writer.replace_range(
        index,
        OffsetKey::TileStart { x, y },
        OffsetKey::TileEnd { x, y },
        &bytes,
    )?;
    Ok(())
}

/// Re-encodes the whole players section of the current snapshot.
fn replace_players(writer: &mut PatchWriter, index: &OffsetIndex, players: &[Player]) -> Result<()> {
    let bytes = encode_players(players)?;
    writer.replace_range(
        index,
        OffsetKey::AllPlayersStart,
        OffsetKey::AllPlayersEnd,
        &bytes,
    )?;
    Ok(())
}
