use crate::error::{Error, Result};
use crate::layout::{OffsetIndex, OffsetKey};
use crate::model::{
    City, Diplomacy, DiplomacyMessage, Flag, Improvement, KnownPlayer, MapHeader, PassengerUnit,
    PlainImprovement, Player, Resource, Snapshot, Task, Tile, TileUnit, TribeSkin, Unit,
    UnitTrail, DIPLOMACY_ENTRY_LEN, is_city_layout,
};
use crate::reader::ByteCursor;

/// Collects offsets for the snapshot being indexed; a disabled recorder
/// ignores marks so that only one snapshot's keys end up in the index.
pub(crate) struct Recorder {
    pub(crate) index: OffsetIndex,
    pub(crate) enabled: bool,
}

impl Recorder {
    pub(crate) fn new(generation: u64) -> Self {
        Self {
            index: OffsetIndex::new(generation),
            enabled: false,
        }
    }

    fn mark(&mut self, key: OffsetKey, cursor: &ByteCursor<'_>) {
        if self.enabled {
            self.index.record(key, cursor.tell());
        }
    }
}

pub(crate) fn read_snapshot(c: &mut ByteCursor<'_>, rec: &mut Recorder) -> Result<Snapshot> {
    let header = read_map_header(c, rec)?;
    let tiles = read_tiles(c, rec, header.width, header.height)?;
    let players = read_players(c, rec)?;
    Ok(Snapshot {
        header,
        tiles,
        players,
    })
}

// --- Map header ---

pub(crate) fn read_map_header(c: &mut ByteCursor<'_>, rec: &mut Recorder) -> Result<MapHeader> {
    let version1 = c.read_u32()?;
    let version2 = c.read_u32()?;
    let total_actions = c.read_u16()?;
    let current_turn = c.read_u32()?;
    let current_player_index = c.read_u8()?;
    let max_unit_id = c.read_u32()?;
    let unknown_byte = c.read_u8()?;
    let seed = c.read_u32()?;
    let turn_limit = c.read_u32()?;
    let unknown = c.read_array::<11>()?;
    let game_mode = c.read_u8()?;
    let game_mode_extra = c.read_u8()?;
    let map_name = c.read_var_string()?;

    rec.mark(OffsetKey::SquareSize, c);
    let square_size = c.read_u32()?;

    let disabled_count = c.read_u16()? as usize;
    let disabled_tribes = c.read_u16_vec(disabled_count)?;
    let unlocked_count = c.read_u16()? as usize;
    let unlocked_tribes = c.read_u16_vec(unlocked_count)?;

    let difficulty = c.read_u16()?;
    let opponent_count = c.read_u32()?;
    let unknown_tail = c.read_fixed(5 + unlocked_count)?.to_vec();

    let skin_count = c.read_u32()? as usize;
    let mut tribe_skins = Vec::with_capacity(skin_count.min(c.remaining() / 4));
    for _ in 0..skin_count {
        tribe_skins.push(TribeSkin {
            tribe: c.read_u16()?,
            skin: c.read_u16()?,
        });
    }

    let mut zero_dimension_prefix = false;
    let mut width_pos = c.tell();
    let mut width = c.read_u16()?;
    let mut height = c.read_u16()?;
    if width == 0 && height == 0 {
        zero_dimension_prefix = true;
        width_pos = c.tell();
        width = c.read_u16()?;
        height = c.read_u16()?;
    }
    if rec.enabled {
        rec.index.record(OffsetKey::MapWidth, width_pos);
        rec.index.record(OffsetKey::MapHeight, width_pos + 2);
    }

    Ok(MapHeader {
        version1,
        version2,
        total_actions,
        current_turn,
        current_player_index,
        max_unit_id,
        unknown_byte,
        seed,
        turn_limit,
        unknown,
        game_mode,
        game_mode_extra,
        map_name,
        square_size,
        disabled_tribes,
        unlocked_tribes,
        difficulty,
        opponent_count,
        unknown_tail,
        tribe_skins,
        zero_dimension_prefix,
        width,
        height,
    })
}

// --- Tiles ---

/// Reads `height` rows of `width` tiles. Row-major order matters: each tile
/// header repeats its coordinates and must match the position being read.
pub(crate) fn read_tiles(
    c: &mut ByteCursor<'_>,
    rec: &mut Recorder,
    width: u16,
    height: u16,
) -> Result<Vec<Vec<Tile>>> {
    rec.mark(OffsetKey::MapStart, c);
    let mut rows = Vec::with_capacity(height as usize);
    for y in 0..u32::from(height) {
        let mut row = Vec::with_capacity(width as usize);
        for x in 0..u32::from(width) {
            row.push(read_tile(c, rec, x, y)?);
        }
        rows.push(row);
    }
    rec.mark(OffsetKey::MapEnd, c);
    Ok(rows)
}

pub(crate) fn read_tile(
    c: &mut ByteCursor<'_>,
    rec: &mut Recorder,
    x: u32,
    y: u32,
) -> Result<Tile> {
    rec.mark(OffsetKey::TileStart { x, y }, c);
    let header_pos = c.tell();
    let header_x = c.read_u32()?;
    let header_y = c.read_u32()?;
    if header_x != x || header_y != y {
        return Err(Error::corrupt(format!(
            "tile header at offset {header_pos} claims ({header_x}, {header_y}) while reading ({x}, {y})"
        )));
    }

    let terrain = c.read_u16()?;
    let climate = c.read_u16()?;
    let altitude = c.read_i16()?;
    let owner = c.read_u8()?;
    let capital = c.read_u8()?;
    let capital_x = c.read_i32()?;
    let capital_y = c.read_i32()?;

    let resource = if c.read_flag()? {
        Some(Resource {
            kind: c.read_u16()?,
        })
    } else {
        None
    };

    rec.mark(OffsetKey::TileImprovementStart { x, y }, c);
    let improvement = if c.read_flag()? {
        let kind = c.read_u16()?;
        if is_city_layout(owner, resource.is_some(), kind) {
            Some(Improvement::City(read_city(c)?))
        } else {
            Some(Improvement::Plain(read_plain_improvement(c, kind)?))
        }
    } else {
        None
    };
    rec.mark(OffsetKey::TileImprovementEnd { x, y }, c);

    let unit = if c.read_flag()? {
        rec.mark(OffsetKey::UnitLocation { x, y }, c);
        let unit = read_unit(c)?;
        let trail = if c.read_flag()? {
            rec.mark(OffsetKey::PreviousUnitLocation { x, y }, c);
            let previous = read_unit(c)?;
            let pad = c.read_u8()?;
            let buffer_a = c.read_array::<7>()?;
            let buffer_b = c.read_fixed(PassengerUnit::buffer_b_len(&buffer_a))?.to_vec();
            UnitTrail::Embarked(PassengerUnit {
                previous,
                pad,
                buffer_a,
                buffer_b,
            })
        } else {
            let flag = c.read_u8()?;
            let buffer = c.read_fixed(UnitTrail::settled_buffer_len(flag))?.to_vec();
            UnitTrail::Settled { flag, buffer }
        };
        Some(TileUnit { unit, trail })
    } else {
        None
    };

    rec.mark(OffsetKey::TileVisibility { x, y }, c);
    let visible_count = c.read_u8()? as usize;
    let visibility = c.read_fixed(visible_count)?.to_vec();

    rec.mark(OffsetKey::TileRoad { x, y }, c);
    let has_road = Flag(c.read_u8()?);
    let has_water_route = Flag(c.read_u8()?);
    let unknown = c.read_array::<4>()?;
    rec.mark(OffsetKey::TileEnd { x, y }, c);

    Ok(Tile {
        x,
        y,
        terrain,
        climate,
        altitude,
        owner,
        capital,
        capital_x,
        capital_y,
        resource,
        improvement,
        unit,
        visibility,
        has_road,
        has_water_route,
        unknown,
    })
}

fn read_plain_improvement(c: &mut ByteCursor<'_>, kind: u16) -> Result<PlainImprovement> {
    Ok(PlainImprovement {
        kind,
        level: c.read_u16()?,
        founded: c.read_u16()?,
        unknown_a: c.read_array()?,
        score: c.read_u16()?,
        unknown_b: c.read_array()?,
        unknown_c: c.read_u16()?,
        unknown_d: c.read_array()?,
    })
}

fn read_city(c: &mut ByteCursor<'_>) -> Result<City> {
    let level = c.read_u16()?;
    let founded = c.read_u16()?;
    let population = c.read_i16()?;
    let total_population = c.read_u16()?;
    let unknown_short = c.read_i16()?;
    let score = c.read_i16()?;
    let unknown_pair = [c.read_i16()?, c.read_i16()?];
    let capital_link = c.read_u8()?;

    let has_name_pos = c.tell();
    let has_name = c.read_u8()?;
    if has_name != 1 {
        return Err(Error::corrupt(format!(
            "city has-name byte at offset {has_name_pos} is {has_name}, expected 1"
        )));
    }
    let name = c.read_var_string()?;

    let founded_tribe_pos = c.tell();
    let founded_tribe = c.read_u8()?;
    if founded_tribe != 0 {
        return Err(Error::corrupt(format!(
            "city founded-tribe byte at offset {founded_tribe_pos} is {founded_tribe}, expected 0"
        )));
    }

    let reward_count = c.read_u16()? as usize;
    let rewards = c.read_u16_vec(reward_count)?;

    let rebellion_flag = c.read_u16()?;
    let rebellion_extra = if rebellion_flag != 0 {
        Some(c.read_array::<2>()?)
    } else {
        None
    };

    Ok(City {
        level,
        founded,
        population,
        total_population,
        unknown_short,
        score,
        unknown_pair,
        capital_link,
        name,
        rewards,
        rebellion_flag,
        rebellion_extra,
    })
}

pub(crate) fn read_unit(c: &mut ByteCursor<'_>) -> Result<Unit> {
    Ok(Unit {
        id: c.read_u32()?,
        owner: c.read_u8()?,
        kind: c.read_u16()?,
        unknown: c.read_array()?,
        x: c.read_i32()?,
        y: c.read_i32()?,
        home_x: c.read_i32()?,
        home_y: c.read_i32()?,
        health: c.read_u16()?,
        promotion_level: c.read_u16()?,
        experience: c.read_u16()?,
        moved: Flag(c.read_u8()?),
        attacked: Flag(c.read_u8()?),
        flipped: Flag(c.read_u8()?),
        created_turn: c.read_u16()?,
    })
}

// --- Players ---

pub(crate) fn read_players(c: &mut ByteCursor<'_>, rec: &mut Recorder) -> Result<Vec<Player>> {
    rec.mark(OffsetKey::AllPlayersStart, c);
    let count = c.read_u16()? as usize;
    let mut players = Vec::with_capacity(count);
    for index in 0..count {
        rec.mark(OffsetKey::PlayerStart(index), c);
        players.push(read_player(c, rec)?);
        rec.mark(OffsetKey::PlayerEnd(index), c);
    }
    rec.mark(OffsetKey::AllPlayersEnd, c);
    Ok(players)
}

pub(crate) fn read_player(c: &mut ByteCursor<'_>, rec: &mut Recorder) -> Result<Player> {
    let id = c.read_u8()?;
    let name = c.read_var_string()?;
    let account_id = c.read_var_string()?;
    let autoplay = Flag(c.read_u8()?);
    let start_x = c.read_i32()?;
    let start_y = c.read_i32()?;
    let tribe = c.read_u16()?;
    let unknown_byte = c.read_u8()?;
    let unknown_int = c.read_u32()?;

    rec.mark(OffsetKey::PlayerKnownPlayers { id }, c);
    let known_count = c.read_u16()? as usize;
    let mut known_players = Vec::with_capacity(known_count.min(c.remaining() / 5));
    for _ in 0..known_count {
        known_players.push(KnownPlayer {
            id: c.read_u8()?,
            data: c.read_array()?,
        });
    }

    rec.mark(OffsetKey::PlayerCurrency { id }, c);
    let currency = c.read_u32()?;
    let score = c.read_u32()?;
    let unknown_int2 = c.read_u32()?;
    let city_count = c.read_u16()?;

    let tech_count = c.read_u16()? as usize;
    let techs = c.read_u16_vec(tech_count)?;

    let encountered_count = c.read_u16()? as usize;
    let encountered_players = c.read_fixed(encountered_count)?.to_vec();

    let task_count_pos = c.tell();
    let task_count = c.read_i16()?;
    if task_count < 0 {
        return Err(Error::corrupt(format!(
            "negative task count {task_count} at offset {task_count_pos}"
        )));
    }
    let mut tasks = Vec::with_capacity(task_count as usize);
    for _ in 0..task_count {
        let kind_pos = c.tell();
        let kind = c.read_i16()?;
        let width = Task::payload_len(kind).ok_or(Error::UnsupportedTaskType {
            kind,
            offset: kind_pos,
        })?;
        tasks.push(Task {
            kind,
            payload: c.read_fixed(width)?.to_vec(),
        });
    }

    let units_killed = c.read_i32()?;
    let units_lost = c.read_i32()?;
    let tribes_destroyed = c.read_i32()?;
    let override_color = c.read_array::<4>()?;
    let unknown_byte2 = c.read_u8()?;

    let unique_count = c.read_u16()? as usize;
    let unique_improvements = c.read_u16_vec(unique_count)?;

    let diplomacy_count = c.read_u16()? as usize;
    let mut diplomacy = Vec::with_capacity(diplomacy_count.min(c.remaining() / DIPLOMACY_ENTRY_LEN));
    for _ in 0..diplomacy_count {
        diplomacy.push(Diplomacy {
            player_id: c.read_u8()?,
            relation: c.read_u8()?,
            last_attack_turn: c.read_i32()?,
            embassy_level: c.read_u8()?,
            last_peace_broken_turn: c.read_i32()?,
            first_meet: c.read_i32()?,
            embassy_build_turn: c.read_i32()?,
            previous_attack_turn: c.read_i32()?,
        });
    }

    let message_count = c.read_u16()? as usize;
    let mut diplomacy_messages = Vec::with_capacity(message_count.min(c.remaining() / 2));
    for _ in 0..message_count {
        diplomacy_messages.push(DiplomacyMessage {
            kind: c.read_u8()?,
            sender: c.read_u8()?,
        });
    }

    let destroyed_by = c.read_u8()?;
    let destroyed_turn = c.read_u32()?;
    let unknown_tail = c.read_array::<14>()?;

    Ok(Player {
        id,
        name,
        account_id,
        autoplay,
        start_x,
        start_y,
        tribe,
        unknown_byte,
        unknown_int,
        known_players,
        currency,
        score,
        unknown_int2,
        city_count,
        techs,
        encountered_players,
        tasks,
        units_killed,
        units_lost,
        tribes_destroyed,
        override_color,
        unknown_byte2,
        unique_improvements,
        diplomacy,
        diplomacy_messages,
        destroyed_by,
        destroyed_turn,
        unknown_tail,
    })
}
