use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
pub use crate::text::SaveString;

pub const NATURE_PLAYER_ID: u8 = 255;
pub const SWAP_SENTINEL_ID: u8 = 254;
pub const CITY_IMPROVEMENT_TYPE: u16 = 1;

pub const TILE_HEADER_LEN: usize = 24;
pub const TILE_TERRAIN_OFFSET: u64 = 8;
pub const TILE_ALTITUDE_OFFSET: u64 = 12;
pub const TILE_OWNER_OFFSET: u64 = 14;

pub const UNIT_RECORD_LEN: usize = 42;
pub const UNIT_OWNER_OFFSET: u64 = 4;
pub const UNIT_TYPE_OFFSET: u64 = 5;

pub const DIPLOMACY_ENTRY_LEN: usize = 23;
pub const KNOWN_PLAYER_ENTRY_LEN: usize = 5;

/// Terrain codes the editor needs to reason about.
pub mod terrain {
    pub const WATER: u16 = 1;
    pub const OCEAN: u16 = 2;
    pub const FIELD: u16 = 3;
    pub const MOUNTAIN: u16 = 4;
    pub const FOREST: u16 = 5;
}

/// Altitude the game stores alongside a terrain code.
pub fn altitude_for_terrain(terrain: u16) -> i16 {
    match terrain {
        terrain::WATER => -1,
        terrain::OCEAN => -2,
        terrain::FIELD | terrain::FOREST => 1,
        terrain::MOUNTAIN => 2,
        _ => 0,
    }
}

/// A one-byte boolean. The game only tests it against zero, so any nonzero
/// byte reads as set and the stored byte is written back as it was.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flag(pub u8);

impl Flag {
    pub fn is_set(self) -> bool {
        self.0 != 0
    }
}

impl From<bool> for Flag {
    fn from(value: bool) -> Self {
        Self(u8::from(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotKind {
    Initial,
    Current,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveModel {
    pub initial: Snapshot,
    pub current: Snapshot,
    pub separator: [u8; 3],
    pub trailer: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub header: MapHeader,
    /// Rows of tiles, indexed `tiles[y][x]`.
    pub tiles: Vec<Vec<Tile>>,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapHeader {
    pub version1: u32,
    pub version2: u32,
    pub total_actions: u16,
    pub current_turn: u32,
    pub current_player_index: u8,
    pub max_unit_id: u32,
    pub unknown_byte: u8,
    pub seed: u32,
    pub turn_limit: u32,
    pub unknown: [u8; 11],
    pub game_mode: u8,
    pub game_mode_extra: u8,
    pub map_name: SaveString,
    pub square_size: u32,
    pub disabled_tribes: Vec<u16>,
    pub unlocked_tribes: Vec<u16>,
    pub difficulty: u16,
    pub opponent_count: u32,
    /// Always `5 + unlocked_tribes.len()` bytes.
    pub unknown_tail: Vec<u8>,
    pub tribe_skins: Vec<TribeSkin>,
    /// Older saves write a zero width/height pair before the real one.
    pub zero_dimension_prefix: bool,
    pub width: u16,
    pub height: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TribeSkin {
    pub tribe: u16,
    pub skin: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub terrain: u16,
    pub climate: u16,
    pub altitude: i16,
    pub owner: u8,
    pub capital: u8,
    pub capital_x: i32,
    pub capital_y: i32,
    pub resource: Option<Resource>,
    pub improvement: Option<Improvement>,
    pub unit: Option<TileUnit>,
    /// Tribes that have seen this tile, in the order the game recorded them.
    pub visibility: Vec<u8>,
    pub has_road: Flag,
    pub has_water_route: Flag,
    pub unknown: [u8; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Improvement {
    Plain(PlainImprovement),
    City(City),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainImprovement {
    pub kind: u16,
    pub level: u16,
    pub founded: u16,
    pub unknown_a: [u8; 6],
    pub score: u16,
    pub unknown_b: [u8; 6],
    pub unknown_c: u16,
    pub unknown_d: [u8; 3],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub level: u16,
    pub founded: u16,
    pub population: i16,
    pub total_population: u16,
    pub unknown_short: i16,
    pub score: i16,
    pub unknown_pair: [i16; 2],
    pub capital_link: u8,
    pub name: SaveString,
    pub rewards: Vec<u16>,
    pub rebellion_flag: u16,
    /// Present exactly when `rebellion_flag != 0`.
    pub rebellion_extra: Option<[u8; 2]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: u32,
    pub owner: u8,
    pub kind: u16,
    pub unknown: [u8; 8],
    pub x: i32,
    pub y: i32,
    pub home_x: i32,
    pub home_y: i32,
    /// Ten times the health shown in game.
    pub health: u16,
    pub promotion_level: u16,
    pub experience: u16,
    pub moved: Flag,
    pub attacked: Flag,
    pub flipped: Flag,
    pub created_turn: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileUnit {
    pub unit: Unit,
    pub trail: UnitTrail,
}

/// What the game writes after a tile's unit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitTrail {
    /// `buffer` is 8 bytes when `flag == 1`, otherwise 6.
    Settled { flag: u8, buffer: Vec<u8> },
    /// The unit has just embarked or disembarked and the game kept a shadow
    /// of the unit it replaced.
    Embarked(PassengerUnit),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassengerUnit {
    pub previous: Unit,
    pub pad: u8,
    pub buffer_a: [u8; 7],
    /// 11 bytes when `buffer_a[0] == 1`, otherwise 7.
    pub buffer_b: Vec<u8>,
}

impl UnitTrail {
    pub fn settled_buffer_len(flag: u8) -> usize {
        if flag == 1 { 8 } else { 6 }
    }
}

impl PassengerUnit {
    pub fn buffer_b_len(buffer_a: &[u8; 7]) -> usize {
        if buffer_a[0] == 1 { 11 } else { 7 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: u8,
    pub name: SaveString,
    pub account_id: SaveString,
    pub autoplay: Flag,
    pub start_x: i32,
    pub start_y: i32,
    pub tribe: u16,
    pub unknown_byte: u8,
    pub unknown_int: u32,
    pub known_players: Vec<KnownPlayer>,
    pub currency: u32,
    pub score: u32,
    pub unknown_int2: u32,
    pub city_count: u16,
    pub techs: Vec<u16>,
    pub encountered_players: Vec<u8>,
    pub tasks: Vec<Task>,
    pub units_killed: i32,
    pub units_lost: i32,
    pub tribes_destroyed: i32,
    /// Stored as blue, green, red, 0.
    pub override_color: [u8; 4],
    pub unknown_byte2: u8,
    pub unique_improvements: Vec<u16>,
    pub diplomacy: Vec<Diplomacy>,
    pub diplomacy_messages: Vec<DiplomacyMessage>,
    pub destroyed_by: u8,
    pub destroyed_turn: u32,
    pub unknown_tail: [u8; 14],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownPlayer {
    pub id: u8,
    pub data: [u8; 4],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub kind: i16,
    pub payload: Vec<u8>,
}

impl Task {
    /// Payload width for a task kind, or `None` for kinds the format does not
    /// define.
    pub fn payload_len(kind: i16) -> Option<usize> {
        match kind {
            1 | 5 => Some(6),
            2 | 3 | 4 | 6 | 7 | 8 => Some(2),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diplomacy {
    pub player_id: u8,
    pub relation: u8,
    pub last_attack_turn: i32,
    pub embassy_level: u8,
    pub last_peace_broken_turn: i32,
    pub first_meet: i32,
    pub embassy_build_turn: i32,
    pub previous_attack_turn: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiplomacyMessage {
    pub kind: u8,
    pub sender: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityLocation {
    pub x: u32,
    pub y: u32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitLocation {
    pub x: u32,
    pub y: u32,
    pub kind: u16,
}

/// Whether an improvement on a tile with these fields is written as a city.
///
/// There is no tag on disk: an owned tile without a resource whose
/// improvement type is 1 carries the extended city record.
pub fn is_city_layout(owner: u8, has_resource: bool, improvement_type: u16) -> bool {
    owner > 0 && !has_resource && improvement_type == CITY_IMPROVEMENT_TYPE
}

impl Improvement {
    pub fn kind(&self) -> u16 {
        match self {
            Improvement::Plain(plain) => plain.kind,
            Improvement::City(_) => CITY_IMPROVEMENT_TYPE,
        }
    }
}

impl City {
    /// A level 1 city as the game writes it when founded.
    pub fn founded(name: impl Into<SaveString>) -> Self {
        Self {
            level: 1,
            founded: 0,
            population: 0,
            total_population: 0,
            unknown_short: 1,
            score: 0,
            unknown_pair: [1, 0],
            capital_link: 0,
            name: name.into(),
            rewards: Vec::new(),
            rebellion_flag: 0,
            rebellion_extra: None,
        }
    }
}

impl Tile {
    /// Flat, unowned, unexplored tile used when growing the map.
    pub fn empty(x: u32, y: u32) -> Self {
        Self {
            x,
            y,
            terrain: terrain::FIELD,
            climate: 1,
            altitude: altitude_for_terrain(terrain::FIELD),
            owner: 0,
            capital: 0,
            capital_x: -1,
            capital_y: -1,
            resource: None,
            improvement: None,
            unit: None,
            visibility: Vec::new(),
            has_road: Flag(0),
            has_water_route: Flag(0),
            unknown: [0; 4],
        }
    }

    pub fn is_city(&self) -> bool {
        self.improvement
            .as_ref()
            .is_some_and(|improvement| improvement.kind() == CITY_IMPROVEMENT_TYPE)
    }

    pub fn city_name(&self) -> Cow<'_, str> {
        match &self.improvement {
            Some(Improvement::City(city)) => city.name.to_string_lossy(),
            _ => Cow::Borrowed(""),
        }
    }
}

impl Player {
    /// A bot-controlled player record as the editor inserts it.
    ///
    /// `id` doubles as the player's position: its known-players array lists
    /// ids `1..=id` followed by nature.
    pub fn new_bot(id: u8, name: impl Into<SaveString>, rgb: [u8; 3]) -> Self {
        let mut known_players: Vec<KnownPlayer> = (1..=id)
            .map(|known| KnownPlayer {
                id: known,
                data: [0; 4],
            })
            .collect();
        known_players.push(KnownPlayer {
            id: NATURE_PLAYER_ID,
            data: [0; 4],
        });

        Self {
            id,
            name: name.into(),
            account_id: "00000000-0000-0000-0000-000000000000".into(),
            autoplay: Flag(1),
            start_x: 0,
            start_y: 0,
            tribe: 2,
            unknown_byte: 1,
            unknown_int: 2,
            known_players,
            currency: 5,
            score: 0,
            unknown_int2: 0,
            city_count: 1,
            techs: Vec::new(),
            encountered_players: Vec::new(),
            tasks: Vec::new(),
            units_killed: 0,
            units_lost: 0,
            tribes_destroyed: 0,
            override_color: [rgb[2], rgb[1], rgb[0], 0],
            unknown_byte2: 0,
            unique_improvements: Vec::new(),
            diplomacy: Vec::new(),
            diplomacy_messages: Vec::new(),
            destroyed_by: 0,
            destroyed_turn: 0,
            unknown_tail: [255, 255, 255, 255, 255, 255, 255, 255, 0, 0, 255, 255, 255, 255],
        }
    }
}

impl Snapshot {
    pub fn width(&self) -> u16 {
        self.header.width
    }

    pub fn height(&self) -> u16 {
        self.header.height
    }

    pub fn tile(&self, x: u32, y: u32) -> Option<&Tile> {
        self.tiles.get(y as usize)?.get(x as usize)
    }

    pub fn tile_mut(&mut self, x: u32, y: u32) -> Option<&mut Tile> {
        self.tiles.get_mut(y as usize)?.get_mut(x as usize)
    }

    pub fn iter_tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().flatten()
    }

    pub fn iter_tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.iter_mut().flatten()
    }

    pub fn player(&self, id: u8) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }

    pub fn player_mut(&mut self, id: u8) -> Option<&mut Player> {
        self.players.iter_mut().find(|player| player.id == id)
    }
}

impl SaveModel {
    pub fn snapshot(&self, kind: SnapshotKind) -> &Snapshot {
        match kind {
            SnapshotKind::Initial => &self.initial,
            SnapshotKind::Current => &self.current,
        }
    }

    pub fn players(&self) -> &[Player] {
        &self.current.players
    }

    /// Current-map tile at `(x, y)`.
    pub fn tile(&self, x: u32, y: u32) -> Result<&Tile> {
        check_coordinates(&self.current, x, y)?;
        self.current
            .tile(x, y)
            .ok_or_else(|| Error::corrupt(format!("tile grid has no entry for ({x}, {y})")))
    }

    pub fn tile_mut(&mut self, x: u32, y: u32) -> Result<&mut Tile> {
        check_coordinates(&self.current, x, y)?;
        self.current
            .tile_mut(x, y)
            .ok_or_else(|| Error::corrupt(format!("tile grid has no entry for ({x}, {y})")))
    }

    pub fn tribe_to_cities(&self) -> BTreeMap<u8, Vec<CityLocation>> {
        let mut out: BTreeMap<u8, Vec<CityLocation>> = BTreeMap::new();
        for tile in self.current.iter_tiles().filter(|tile| tile.is_city()) {
            out.entry(tile.owner).or_default().push(CityLocation {
                x: tile.x,
                y: tile.y,
                name: tile.city_name().into_owned(),
            });
        }
        out
    }

    pub fn tribe_to_units(&self) -> BTreeMap<u8, Vec<UnitLocation>> {
        let mut out: BTreeMap<u8, Vec<UnitLocation>> = BTreeMap::new();
        for tile in self.current.iter_tiles() {
            if let Some(tile_unit) = &tile.unit {
                out.entry(tile_unit.unit.owner)
                    .or_default()
                    .push(UnitLocation {
                        x: tile.x,
                        y: tile.y,
                        kind: tile_unit.unit.kind,
                    });
            }
        }
        out
    }

    pub fn owner_to_tribe(&self) -> Result<BTreeMap<u8, u16>> {
        owner_to_tribe(&self.current.players)
    }
}

fn check_coordinates(snapshot: &Snapshot, x: u32, y: u32) -> Result<()> {
    let width = i64::from(snapshot.width());
    let height = i64::from(snapshot.height());
    if i64::from(x) >= width {
        return Err(Error::ValueOutOfRange {
            field: "x",
            value: i64::from(x),
            min: 0,
            max: width - 1,
        });
    }
    if i64::from(y) >= height {
        return Err(Error::ValueOutOfRange {
            field: "y",
            value: i64::from(y),
            min: 0,
            max: height - 1,
        });
    }
    Ok(())
}

pub(crate) fn owner_to_tribe(players: &[Player]) -> Result<BTreeMap<u8, u16>> {
    let mut out = BTreeMap::new();
    for player in players {
        if let Some(existing) = out.insert(player.id, player.tribe) {
            return Err(Error::corrupt(format!(
                "duplicate player id {} (already mapped to tribe {existing})",
                player.id
            )));
        }
    }
    Ok(out)
}
