#![allow(dead_code)]

use polytopia_core::model::{
    City, Diplomacy, DiplomacyMessage, Flag, Improvement, KnownPlayer, MapHeader, PassengerUnit,
    PlainImprovement, Player, Resource, SaveModel, Snapshot, Task, Tile, TileUnit, TribeSkin,
    Unit, UnitTrail,
};

pub const CURRENT_WIDTH: u16 = 4;
pub const CURRENT_HEIGHT: u16 = 3;

pub fn header(width: u16, height: u16) -> MapHeader {
    MapHeader {
        version1: 104,
        version2: 104,
        total_actions: 57,
        current_turn: 6,
        current_player_index: 1,
        max_unit_id: 12,
        unknown_byte: 0,
        seed: 0x0bad_cafe,
        turn_limit: 30,
        unknown: [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10],
        game_mode: 1,
        game_mode_extra: 0,
        map_name: "Archipelago".into(),
        square_size: u32::from(width.min(height)),
        disabled_tribes: vec![7],
        unlocked_tribes: vec![2, 3],
        difficulty: 2,
        opponent_count: 1,
        unknown_tail: vec![1, 0, 0, 0, 0, 0, 0],
        tribe_skins: vec![TribeSkin { tribe: 3, skin: 1 }],
        zero_dimension_prefix: false,
        width,
        height,
    }
}

pub fn unit(id: u32, owner: u8, kind: u16, x: i32, y: i32) -> Unit {
    Unit {
        id,
        owner,
        kind,
        unknown: [0, 0, 1, 0, 0, 0, 0, 0],
        x,
        y,
        home_x: x,
        home_y: y,
        health: 100,
        promotion_level: 0,
        experience: 2,
        moved: Flag(0),
        attacked: Flag(1),
        flipped: Flag(0),
        created_turn: 3,
    }
}

pub fn plain(kind: u16) -> PlainImprovement {
    PlainImprovement {
        kind,
        level: 1,
        founded: 2,
        unknown_a: [0, 0, 0, 0, 1, 0],
        score: 5,
        unknown_b: [0; 6],
        unknown_c: 0,
        unknown_d: [0, 0, 1],
    }
}

pub fn city(name: &str) -> City {
    City {
        level: 2,
        founded: 1,
        population: 1,
        total_population: 3,
        unknown_short: 1,
        score: 0,
        unknown_pair: [1, 0],
        capital_link: 1,
        name: name.into(),
        rewards: vec![5],
        rebellion_flag: 0,
        rebellion_extra: None,
    }
}

fn player(id: u8, name: &str, tribe: u16, ids: &[u8]) -> Player {
    let mut player = Player::new_bot(1, name, [10, 20, 30]);
    player.id = id;
    player.tribe = tribe;
    player.autoplay = Flag(0);
    player.account_id = format!("account-{id}").into();
    player.known_players = ids
        .iter()
        .map(|&known| KnownPlayer {
            id: known,
            data: [known, 7, 0, 0],
        })
        .collect();
    player.techs = vec![0, 4, 9];
    player
}

/// Players 1 and 2 plus nature, each knowing ids 1, 2 and 255.
pub fn players() -> Vec<Player> {
    let ids = [1, 2, 255];

    let mut first = player(1, "Kiera", 2, &ids);
    first.tasks = vec![
        Task {
            kind: 1,
            payload: vec![1, 0, 0, 0, 2, 0],
        },
        Task {
            kind: 3,
            payload: vec![4, 0],
        },
    ];
    first.encountered_players = vec![2];
    first.unique_improvements = vec![30];
    first.diplomacy = vec![Diplomacy {
        player_id: 2,
        relation: 1,
        last_attack_turn: -1,
        embassy_level: 0,
        last_peace_broken_turn: -1,
        first_meet: 2,
        embassy_build_turn: -1,
        previous_attack_turn: -1,
    }];
    first.diplomacy_messages = vec![DiplomacyMessage { kind: 2, sender: 2 }];

    let second = player(2, "Bot", 3, &ids);
    let mut nature = player(255, "Nature", 1, &ids);
    nature.techs = Vec::new();

    vec![first, second, nature]
}

/// A `width` x `height` field map. When it is large enough the first two rows
/// carry one of each tile variant the format knows:
///
/// * (0,0) city of player 1 in rebellion, with a settled unit (flag 1)
/// * (1,0) unowned village (plain improvement of type 1)
/// * (2,0) owned farm on a resource
/// * (0,1) unit that embarked with an 11-byte passenger buffer
/// * (1,1) unit that embarked with a 7-byte passenger buffer
/// * (2,1) city of player 2 with a settled unit (flag 0)
pub fn snapshot(width: u16, height: u16, with_units: bool) -> Snapshot {
    let mut tiles: Vec<Vec<Tile>> = (0..u32::from(height))
        .map(|y| {
            (0..u32::from(width))
                .map(|x| {
                    let mut tile = Tile::empty(x, y);
                    tile.visibility = vec![1];
                    tile
                })
                .collect()
        })
        .collect();

    if width >= 3 && height >= 2 {
        {
            let t = &mut tiles[0][0];
            t.owner = 1;
            t.capital = 1;
            t.capital_x = 0;
            t.capital_y = 0;
            let mut capital = city("Alpha");
            capital.rebellion_flag = 1;
            capital.rebellion_extra = Some([3, 4]);
            t.improvement = Some(Improvement::City(capital));
            t.visibility = vec![1, 2];
            t.has_road = Flag(1);
            if with_units {
                t.unit = Some(TileUnit {
                    unit: unit(1, 1, 2, 0, 0),
                    trail: UnitTrail::Settled {
                        flag: 1,
                        buffer: vec![1, 2, 3, 4, 5, 6, 7, 8],
                    },
                });
            }
        }
        tiles[0][1].improvement = Some(Improvement::Plain(plain(1)));
        {
            let t = &mut tiles[0][2];
            t.owner = 1;
            t.resource = Some(Resource { kind: 2 });
            t.improvement = Some(Improvement::Plain(plain(5)));
            t.has_water_route = Flag(1);
        }
        if with_units {
            tiles[1][0].terrain = 1;
            tiles[1][0].altitude = -1;
            tiles[1][0].unit = Some(TileUnit {
                unit: unit(2, 2, 5, 0, 1),
                trail: UnitTrail::Embarked(PassengerUnit {
                    previous: unit(2, 2, 1, 0, 1),
                    pad: 0,
                    buffer_a: [1, 0, 0, 0, 0, 0, 0],
                    buffer_b: vec![0; 11],
                }),
            });
            tiles[1][1].unit = Some(TileUnit {
                unit: unit(3, 2, 1, 1, 1),
                trail: UnitTrail::Embarked(PassengerUnit {
                    previous: unit(3, 2, 5, 1, 1),
                    pad: 0,
                    buffer_a: [0; 7],
                    buffer_b: vec![9; 7],
                }),
            });
        }
        {
            let t = &mut tiles[1][2];
            t.owner = 2;
            t.capital = 2;
            t.capital_x = 2;
            t.capital_y = 1;
            t.improvement = Some(Improvement::City(city("Beta")));
            if with_units {
                t.unit = Some(TileUnit {
                    unit: unit(4, 2, 1, 2, 1),
                    trail: UnitTrail::Settled {
                        flag: 0,
                        buffer: vec![0; 6],
                    },
                });
            }
        }
    }

    Snapshot {
        header: header(width, height),
        tiles,
        players: players(),
    }
}

pub fn model_sized(width: u16, height: u16) -> SaveModel {
    let mut initial = snapshot(width, height, false);
    for player in &mut initial.players {
        player.techs = vec![0, 1];
    }
    SaveModel {
        initial,
        current: snapshot(width, height, true),
        separator: [0, 0, 0],
        trailer: vec![0xde, 0xad, 0xbe, 0xef],
    }
}

pub fn sample_model() -> SaveModel {
    model_sized(CURRENT_WIDTH, CURRENT_HEIGHT)
}

pub fn sample_bytes() -> Vec<u8> {
    polytopia_core::encode_save(&sample_model()).expect("sample model encodes")
}

pub fn bytes_sized(width: u16, height: u16) -> Vec<u8> {
    polytopia_core::encode_save(&model_sized(width, height)).expect("sized model encodes")
}
