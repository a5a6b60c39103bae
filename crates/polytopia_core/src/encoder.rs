//! Byte-exact serialization of the save model.
//!
//! Each `emit_*` function is the structural inverse of the matching reader in
//! the decoder. Count prefixes are always recomputed from the
//! live collections, and the city/plain improvement layout is re-derived from
//! the tile rather than trusted from the stored variant.

use crate::error::{Error, Result, ensure_range};
use crate::model::{
    City, Improvement, KnownPlayer, MapHeader, PassengerUnit, PlainImprovement, Player,
    SaveModel, SaveString, Snapshot, Task, Tile, TileUnit, Unit, UnitTrail, is_city_layout,
};

pub fn encode_save(model: &SaveModel) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    emit_snapshot(&model.initial, &mut out)?;
    out.extend_from_slice(&model.separator);
    emit_snapshot(&model.current, &mut out)?;
    out.extend_from_slice(&model.trailer);
    Ok(out)
}

pub fn encode_snapshot(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    emit_snapshot(snapshot, &mut out)?;
    Ok(out)
}

pub fn emit_snapshot(snapshot: &Snapshot, out: &mut Vec<u8>) -> Result<()> {
    let header = &snapshot.header;
    if snapshot.tiles.len() != header.height as usize {
        return Err(Error::corrupt(format!(
            "map header says {} rows, grid has {}",
            header.height,
            snapshot.tiles.len()
        )));
    }
    if let Some(row) = snapshot
        .tiles
        .iter()
        .find(|row| row.len() != header.width as usize)
    {
        return Err(Error::corrupt(format!(
            "map header says {} columns, a grid row has {}",
            header.width,
            row.len()
        )));
    }

    emit_map_header(header, out)?;
    emit_map(&snapshot.tiles, out)?;
    emit_players(&snapshot.players, out)
}

// --- Map header ---

pub fn encode_map_header(header: &MapHeader) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    emit_map_header(header, &mut out)?;
    Ok(out)
}

pub fn emit_map_header(header: &MapHeader, out: &mut Vec<u8>) -> Result<()> {
    out.extend_from_slice(&header.version1.to_le_bytes());
    out.extend_from_slice(&header.version2.to_le_bytes());
    out.extend_from_slice(&header.total_actions.to_le_bytes());
    out.extend_from_slice(&header.current_turn.to_le_bytes());
    out.push(header.current_player_index);
    out.extend_from_slice(&header.max_unit_id.to_le_bytes());
    out.push(header.unknown_byte);
    out.extend_from_slice(&header.seed.to_le_bytes());
    out.extend_from_slice(&header.turn_limit.to_le_bytes());
    out.extend_from_slice(&header.unknown);
    out.push(header.game_mode);
    out.push(header.game_mode_extra);
    put_var_string(out, "map name length", &header.map_name)?;
    out.extend_from_slice(&header.square_size.to_le_bytes());

    put_len_u16(out, "disabled tribe count", header.disabled_tribes.len())?;
    put_u16_slice(out, &header.disabled_tribes);
    put_len_u16(out, "unlocked tribe count", header.unlocked_tribes.len())?;
    put_u16_slice(out, &header.unlocked_tribes);

    out.extend_from_slice(&header.difficulty.to_le_bytes());
    out.extend_from_slice(&header.opponent_count.to_le_bytes());

    let expected_tail = 5 + header.unlocked_tribes.len();
    if header.unknown_tail.len() != expected_tail {
        return Err(Error::corrupt(format!(
            "map header tail has {} bytes, expected {expected_tail} for {} unlocked tribes",
            header.unknown_tail.len(),
            header.unlocked_tribes.len()
        )));
    }
    out.extend_from_slice(&header.unknown_tail);

    ensure_range(
        "tribe skin count",
        header.tribe_skins.len() as i64,
        0,
        i64::from(u32::MAX),
    )?;
    out.extend_from_slice(&(header.tribe_skins.len() as u32).to_le_bytes());
    for skin in &header.tribe_skins {
        out.extend_from_slice(&skin.tribe.to_le_bytes());
        out.extend_from_slice(&skin.skin.to_le_bytes());
    }

    if header.zero_dimension_prefix {
        out.extend_from_slice(&[0, 0, 0, 0]);
    }
    out.extend_from_slice(&header.width.to_le_bytes());
    out.extend_from_slice(&header.height.to_le_bytes());
    Ok(())
}

// --- Tiles ---

/// Encodes the tile records of a grid, without the map header.
pub fn encode_map(tiles: &[Vec<Tile>]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    emit_map(tiles, &mut out)?;
    Ok(out)
}

pub fn emit_map(tiles: &[Vec<Tile>], out: &mut Vec<u8>) -> Result<()> {
    for (y, row) in tiles.iter().enumerate() {
        for (x, tile) in row.iter().enumerate() {
            if tile.x as usize != x || tile.y as usize != y {
                return Err(Error::corrupt(format!(
                    "tile at grid position ({x}, {y}) claims coordinates ({}, {})",
                    tile.x, tile.y
                )));
            }
            emit_tile(tile, out)?;
        }
    }
    Ok(())
}

pub fn encode_tile(tile: &Tile) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    emit_tile(tile, &mut out)?;
    Ok(out)
}

pub fn emit_tile(tile: &Tile, out: &mut Vec<u8>) -> Result<()> {
    out.extend_from_slice(&tile.x.to_le_bytes());
    out.extend_from_slice(&tile.y.to_le_bytes());
    out.extend_from_slice(&tile.terrain.to_le_bytes());
    out.extend_from_slice(&tile.climate.to_le_bytes());
    out.extend_from_slice(&tile.altitude.to_le_bytes());
    out.push(tile.owner);
    out.push(tile.capital);
    out.extend_from_slice(&tile.capital_x.to_le_bytes());
    out.extend_from_slice(&tile.capital_y.to_le_bytes());

    match tile.resource {
        Some(resource) => {
            out.push(1);
            out.extend_from_slice(&resource.kind.to_le_bytes());
        }
        None => out.push(0),
    }

    check_improvement_layout(tile)?;
    emit_improvement(tile.improvement.as_ref(), out)?;

    match &tile.unit {
        Some(tile_unit) => {
            out.push(1);
            emit_tile_unit(tile_unit, out)?;
        }
        None => out.push(0),
    }

    put_len_u8(out, "visibility count", tile.visibility.len())?;
    out.extend_from_slice(&tile.visibility);
    out.push(tile.has_road.0);
    out.push(tile.has_water_route.0);
    out.extend_from_slice(&tile.unknown);
    Ok(())
}

/// The stored variant must be the one a decoder would derive from the tile's
/// owner, resource and improvement type, or the written bytes would not read
/// back.
fn check_improvement_layout(tile: &Tile) -> Result<()> {
    let Some(improvement) = &tile.improvement else {
        return Ok(());
    };
    let derived_city = is_city_layout(tile.owner, tile.resource.is_some(), improvement.kind());
    match (improvement, derived_city) {
        (Improvement::City(_), true) | (Improvement::Plain(_), false) => Ok(()),
        (Improvement::City(_), false) => Err(Error::UnsupportedVariant(format!(
            "tile ({}, {}) stores a city but owner {} with resource {:?} reads as a plain improvement",
            tile.x, tile.y, tile.owner, tile.resource
        ))),
        (Improvement::Plain(_), true) => Err(Error::UnsupportedVariant(format!(
            "tile ({}, {}) stores a plain type-1 improvement but owner {} without a resource reads as a city",
            tile.x, tile.y, tile.owner
        ))),
    }
}

/// Emits the improvement section: exists flag, type, then the record body.
pub fn emit_improvement(improvement: Option<&Improvement>, out: &mut Vec<u8>) -> Result<()> {
    let Some(improvement) = improvement else {
        out.push(0);
        return Ok(());
    };
    out.push(1);
    out.extend_from_slice(&improvement.kind().to_le_bytes());
    match improvement {
        Improvement::Plain(plain) => {
            emit_plain_improvement(plain, out);
            Ok(())
        }
        Improvement::City(city) => emit_city(city, out),
    }
}

fn emit_plain_improvement(plain: &PlainImprovement, out: &mut Vec<u8>) {
    out.extend_from_slice(&plain.level.to_le_bytes());
    out.extend_from_slice(&plain.founded.to_le_bytes());
    out.extend_from_slice(&plain.unknown_a);
    out.extend_from_slice(&plain.score.to_le_bytes());
    out.extend_from_slice(&plain.unknown_b);
    out.extend_from_slice(&plain.unknown_c.to_le_bytes());
    out.extend_from_slice(&plain.unknown_d);
}

fn emit_city(city: &City, out: &mut Vec<u8>) -> Result<()> {
    if (city.rebellion_flag != 0) != city.rebellion_extra.is_some() {
        return Err(Error::corrupt(format!(
            "city {:?}: rebellion flag {} disagrees with rebellion data {:?}",
            city.name, city.rebellion_flag, city.rebellion_extra
        )));
    }

    out.extend_from_slice(&city.level.to_le_bytes());
    out.extend_from_slice(&city.founded.to_le_bytes());
    out.extend_from_slice(&city.population.to_le_bytes());
    out.extend_from_slice(&city.total_population.to_le_bytes());
    out.extend_from_slice(&city.unknown_short.to_le_bytes());
    out.extend_from_slice(&city.score.to_le_bytes());
    out.extend_from_slice(&city.unknown_pair[0].to_le_bytes());
    out.extend_from_slice(&city.unknown_pair[1].to_le_bytes());
    out.push(city.capital_link);
    // has-name
    out.push(1);
    put_var_string(out, "city name length", &city.name)?;
    // founded-tribe
    out.push(0);
    put_len_u16(out, "city reward count", city.rewards.len())?;
    put_u16_slice(out, &city.rewards);
    out.extend_from_slice(&city.rebellion_flag.to_le_bytes());
    if let Some(extra) = city.rebellion_extra {
        out.extend_from_slice(&extra);
    }
    Ok(())
}

fn emit_tile_unit(tile_unit: &TileUnit, out: &mut Vec<u8>) -> Result<()> {
    emit_unit(&tile_unit.unit, out);
    match &tile_unit.trail {
        UnitTrail::Settled { flag, buffer } => {
            let expected = UnitTrail::settled_buffer_len(*flag);
            if buffer.len() != expected {
                return Err(Error::corrupt(format!(
                    "unit {} trailing buffer has {} bytes, flag {flag} expects {expected}",
                    tile_unit.unit.id,
                    buffer.len()
                )));
            }
            out.push(0);
            out.push(*flag);
            out.extend_from_slice(buffer);
        }
        UnitTrail::Embarked(passenger) => {
            let expected = PassengerUnit::buffer_b_len(&passenger.buffer_a);
            if passenger.buffer_b.len() != expected {
                return Err(Error::corrupt(format!(
                    "unit {} passenger buffer has {} bytes, expected {expected}",
                    tile_unit.unit.id,
                    passenger.buffer_b.len()
                )));
            }
            out.push(1);
            emit_unit(&passenger.previous, out);
            out.push(passenger.pad);
            out.extend_from_slice(&passenger.buffer_a);
            out.extend_from_slice(&passenger.buffer_b);
        }
    }
    Ok(())
}

pub fn encode_unit(unit: &Unit) -> Vec<u8> {
    let mut out = Vec::new();
    emit_unit(unit, &mut out);
    out
}

pub fn emit_unit(unit: &Unit, out: &mut Vec<u8>) {
    out.extend_from_slice(&unit.id.to_le_bytes());
    out.push(unit.owner);
    out.extend_from_slice(&unit.kind.to_le_bytes());
    out.extend_from_slice(&unit.unknown);
    out.extend_from_slice(&unit.x.to_le_bytes());
    out.extend_from_slice(&unit.y.to_le_bytes());
    out.extend_from_slice(&unit.home_x.to_le_bytes());
    out.extend_from_slice(&unit.home_y.to_le_bytes());
    out.extend_from_slice(&unit.health.to_le_bytes());
    out.extend_from_slice(&unit.promotion_level.to_le_bytes());
    out.extend_from_slice(&unit.experience.to_le_bytes());
    out.push(unit.moved.0);
    out.push(unit.attacked.0);
    out.push(unit.flipped.0);
    out.extend_from_slice(&unit.created_turn.to_le_bytes());
}

// --- Players ---

/// Encodes the whole players section: count prefix and every record.
pub fn encode_players(players: &[Player]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    emit_players(players, &mut out)?;
    Ok(out)
}

pub fn emit_players(players: &[Player], out: &mut Vec<u8>) -> Result<()> {
    put_len_u16(out, "player count", players.len())?;
    for player in players {
        emit_player(player, out)?;
    }
    Ok(())
}

pub fn encode_player(player: &Player) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    emit_player(player, &mut out)?;
    Ok(out)
}

pub fn emit_player(player: &Player, out: &mut Vec<u8>) -> Result<()> {
    out.push(player.id);
    put_var_string(out, "player name length", &player.name)?;
    put_var_string(out, "account id length", &player.account_id)?;
    out.push(player.autoplay.0);
    out.extend_from_slice(&player.start_x.to_le_bytes());
    out.extend_from_slice(&player.start_y.to_le_bytes());
    out.extend_from_slice(&player.tribe.to_le_bytes());
    out.push(player.unknown_byte);
    out.extend_from_slice(&player.unknown_int.to_le_bytes());

    put_len_u16(out, "known player count", player.known_players.len())?;
    emit_known_players(&player.known_players, out);

    out.extend_from_slice(&player.currency.to_le_bytes());
    out.extend_from_slice(&player.score.to_le_bytes());
    out.extend_from_slice(&player.unknown_int2.to_le_bytes());
    out.extend_from_slice(&player.city_count.to_le_bytes());

    put_len_u16(out, "tech count", player.techs.len())?;
    put_u16_slice(out, &player.techs);

    put_len_u16(out, "encountered player count", player.encountered_players.len())?;
    out.extend_from_slice(&player.encountered_players);

    ensure_range(
        "task count",
        player.tasks.len() as i64,
        0,
        i64::from(i16::MAX),
    )?;
    out.extend_from_slice(&(player.tasks.len() as i16).to_le_bytes());
    for task in &player.tasks {
        emit_task(task, out)?;
    }

    out.extend_from_slice(&player.units_killed.to_le_bytes());
    out.extend_from_slice(&player.units_lost.to_le_bytes());
    out.extend_from_slice(&player.tribes_destroyed.to_le_bytes());
    out.extend_from_slice(&player.override_color);
    out.push(player.unknown_byte2);

    put_len_u16(out, "unique improvement count", player.unique_improvements.len())?;
    put_u16_slice(out, &player.unique_improvements);

    put_len_u16(out, "diplomacy count", player.diplomacy.len())?;
    for entry in &player.diplomacy {
        out.push(entry.player_id);
        out.push(entry.relation);
        out.extend_from_slice(&entry.last_attack_turn.to_le_bytes());
        out.push(entry.embassy_level);
        out.extend_from_slice(&entry.last_peace_broken_turn.to_le_bytes());
        out.extend_from_slice(&entry.first_meet.to_le_bytes());
        out.extend_from_slice(&entry.embassy_build_turn.to_le_bytes());
        out.extend_from_slice(&entry.previous_attack_turn.to_le_bytes());
    }

    put_len_u16(out, "diplomacy message count", player.diplomacy_messages.len())?;
    for message in &player.diplomacy_messages {
        out.push(message.kind);
        out.push(message.sender);
    }

    out.push(player.destroyed_by);
    out.extend_from_slice(&player.destroyed_turn.to_le_bytes());
    out.extend_from_slice(&player.unknown_tail);
    Ok(())
}

/// Flat quintuples (id + four opaque bytes) without the count prefix.
pub fn emit_known_players(known_players: &[KnownPlayer], out: &mut Vec<u8>) {
    for known in known_players {
        out.push(known.id);
        out.extend_from_slice(&known.data);
    }
}

fn emit_task(task: &Task, out: &mut Vec<u8>) -> Result<()> {
    let Some(expected) = Task::payload_len(task.kind) else {
        return Err(Error::UnsupportedVariant(format!(
            "task type {} has no known payload layout",
            task.kind
        )));
    };
    if task.payload.len() != expected {
        return Err(Error::corrupt(format!(
            "task type {} payload has {} bytes, expected {expected}",
            task.kind,
            task.payload.len()
        )));
    }
    out.extend_from_slice(&task.kind.to_le_bytes());
    out.extend_from_slice(&task.payload);
    Ok(())
}

// --- Primitives ---

fn put_len_u8(out: &mut Vec<u8>, field: &'static str, len: usize) -> Result<()> {
    ensure_range(field, len as i64, 0, i64::from(u8::MAX))?;
    out.push(len as u8);
    Ok(())
}

fn put_len_u16(out: &mut Vec<u8>, field: &'static str, len: usize) -> Result<()> {
    ensure_range(field, len as i64, 0, i64::from(u16::MAX))?;
    out.extend_from_slice(&(len as u16).to_le_bytes());
    Ok(())
}

fn put_u16_slice(out: &mut Vec<u8>, values: &[u16]) {
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
}

pub(crate) fn put_var_string(
    out: &mut Vec<u8>,
    field: &'static str,
    value: &SaveString,
) -> Result<()> {
    put_len_u8(out, field, value.len())?;
    out.extend_from_slice(value.as_bytes());
    Ok(())
}
