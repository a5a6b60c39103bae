use tracing::{debug, info};

use super::builders::{build_empty_player, splice_known_player};
use super::replace_players;
use crate::decoder::Decoded;
use crate::encoder::{emit_known_players, encode_map};
use crate::error::{Error, Result, ensure_range};
use crate::layout::{OffsetIndex, OffsetKey};
use crate::model::{
    KNOWN_PLAYER_ENTRY_LEN, NATURE_PLAYER_ID, Player, SWAP_SENTINEL_ID, Tile, UnitTrail,
};
use crate::patch::{PatchWriter, ScalarWidth};

/// Name given to an added player when none is supplied.
pub fn default_player_name(id: u8) -> String {
    format!("Player{id}")
}

/// Inserts a bot player ahead of nature and teaches every player about it.
/// Returns the new player's id, which is the old player count. Without a
/// name the player is called [`default_player_name`] of that id.
pub fn add_player(writer: &mut PatchWriter, name: Option<&str>, rgb: [u8; 3]) -> Result<u8> {
    let Decoded { model, index } = writer.decode()?;
    let players = &model.current.players;
    let count = players.len();
    match players.last() {
        Some(last) if last.id == NATURE_PLAYER_ID => {}
        Some(last) => {
            return Err(Error::corrupt(format!(
                "last player has id {}, expected nature ({NATURE_PLAYER_ID})",
                last.id
            )));
        }
        None => return Err(Error::corrupt("save has no players")),
    }
    ensure_range(
        "player count",
        count as i64,
        1,
        i64::from(SWAP_SENTINEL_ID) - 1,
    )?;
    let new_id = count as u8;
    let name = name.map_or_else(|| default_player_name(new_id), str::to_string);
    let record = build_empty_player(new_id, &name, rgb)?;

    let count_at = writer.resolve(&index, OffsetKey::AllPlayersStart)?;
    writer.write_scalar_at(count_at, ScalarWidth::U16, (count + 1) as i64)?;
    let nature_start = OffsetKey::PlayerStart(count - 1);
    writer.replace_range(&index, nature_start, nature_start, &record)?;

    // Each splice moves every later player, so decode again per player.
    for position in 0..=count {
        let Decoded { model, index } = writer.decode()?;
        let player = model.current.players.get(position).ok_or_else(|| {
            Error::corrupt(format!("player {position} missing after insertion"))
        })?;
        splice_into_known_players(writer, &index, player, new_id)?;
    }

    info!(id = new_id, name = %name, "added player");
    Ok(new_id)
}

fn splice_into_known_players(
    writer: &mut PatchWriter,
    index: &OffsetIndex,
    player: &Player,
    new_id: u8,
) -> Result<()> {
    let mut flat = Vec::with_capacity(player.known_players.len() * KNOWN_PLAYER_ENTRY_LEN);
    emit_known_players(&player.known_players, &mut flat);
    let spliced = splice_known_player(&flat, new_id)?;
    if spliced == flat {
        return Ok(());
    }

    let entries = spliced.len() / KNOWN_PLAYER_ENTRY_LEN;
    ensure_range("known player count", entries as i64, 0, i64::from(u16::MAX))?;
    let mut bytes = Vec::with_capacity(spliced.len() + 2);
    bytes.extend_from_slice(&(entries as u16).to_le_bytes());
    bytes.extend_from_slice(&spliced);
    writer.replace_range(
        index,
        OffsetKey::PlayerKnownPlayers { id: player.id },
        OffsetKey::PlayerCurrency { id: player.id },
        &bytes,
    )?;
    debug!(player = player.id, new_id, entries, "spliced known player");
    Ok(())
}

/// Sets the colour override; stored blue, green, red.
pub fn modify_player_color(writer: &mut PatchWriter, id: u8, rgb: [u8; 3]) -> Result<()> {
    update_player(writer, id, |player| {
        player.override_color = [rgb[2], rgb[1], rgb[0], 0];
    })?;
    info!(id, r = rgb[0], g = rgb[1], b = rgb[2], "modified player color");
    Ok(())
}

pub fn modify_player_tribe(writer: &mut PatchWriter, id: u8, tribe: u16) -> Result<()> {
    update_player(writer, id, |player| player.tribe = tribe)?;
    info!(id, tribe, "modified player tribe");
    Ok(())
}

pub fn modify_player_name(writer: &mut PatchWriter, id: u8, name: &str) -> Result<()> {
    update_player(writer, id, |player| player.name = name.into())?;
    info!(id, name, "modified player name");
    Ok(())
}

fn update_player<F>(writer: &mut PatchWriter, id: u8, update: F) -> Result<()>
where
    F: FnOnce(&mut Player),
{
    let Decoded { mut model, index } = writer.decode()?;
    let player = model
        .current
        .player_mut(id)
        .ok_or(Error::UnknownPlayer(id))?;
    update(player);
    replace_players(writer, &index, &model.current.players)
}

/// Exchanges two players' ownership of tiles and units on the current map.
///
/// Relabels `a` to the sentinel 254 first so the two sets never merge, then
/// `b` to `a`, then the sentinel to `b`. Player records are left alone.
pub fn swap_players(writer: &mut PatchWriter, a: u8, b: u8) -> Result<()> {
    for id in [a, b] {
        ensure_range(
            "swap player id",
            i64::from(id),
            1,
            i64::from(SWAP_SENTINEL_ID) - 1,
        )?;
    }
    let Decoded { mut model, index } = writer.decode()?;
    if map_uses_owner(&model.current.tiles, SWAP_SENTINEL_ID) {
        return Err(Error::corrupt(format!(
            "map already uses owner id {SWAP_SENTINEL_ID}"
        )));
    }

    for (from, to) in [(a, SWAP_SENTINEL_ID), (b, a), (SWAP_SENTINEL_ID, b)] {
        relabel_owners(model.current.iter_tiles_mut(), from, to);
    }

    let bytes = encode_map(&model.current.tiles)?;
    writer.replace_range(&index, OffsetKey::MapStart, OffsetKey::MapEnd, &bytes)?;
    info!(a, b, "swapped players");
    Ok(())
}

fn map_uses_owner(tiles: &[Vec<Tile>], owner: u8) -> bool {
    tiles.iter().flatten().any(|tile| {
        tile.owner == owner
            || tile.unit.as_ref().is_some_and(|tile_unit| {
                tile_unit.unit.owner == owner
                    || matches!(&tile_unit.trail, UnitTrail::Embarked(p) if p.previous.owner == owner)
            })
    })
}

fn relabel_owners<'a>(tiles: impl Iterator<Item = &'a mut Tile>, from: u8, to: u8) {
    for tile in tiles {
        if tile.owner == from {
            tile.owner = to;
        }
        if let Some(tile_unit) = tile.unit.as_mut() {
            if tile_unit.unit.owner == from {
                tile_unit.unit.owner = to;
            }
            if let UnitTrail::Embarked(passenger) = &mut tile_unit.trail {
                if passenger.previous.owner == from {
                    passenger.previous.owner = to;
                }
            }
        }
    }
}
