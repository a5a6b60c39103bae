mod common;

use polytopia_core::model::{Flag, Improvement, SnapshotKind, TILE_HEADER_LEN, UnitTrail};
use polytopia_core::{
    Error, OffsetKey, decode, decode_snapshot_index, encode_map, encode_map_header, encode_player,
    encode_players, encode_save, encode_snapshot, encode_tile,
};

#[test]
fn whole_save_round_trips_byte_for_byte() {
    let bytes = common::sample_bytes();
    let decoded = decode(&bytes).expect("sample decodes");
    assert_eq!(decoded.model, common::sample_model());

    let encoded = encode_save(&decoded.model).expect("model encodes");
    assert_eq!(encoded, bytes);
}

#[test]
fn decoded_variants_are_derived_from_tile_fields() {
    let decoded = decode(&common::sample_bytes()).expect("sample decodes");
    let current = &decoded.model.current;

    let capital = current.tile(0, 0).expect("tile (0,0)");
    match &capital.improvement {
        Some(Improvement::City(city)) => {
            assert_eq!(city.name, "Alpha");
            assert_eq!(city.rebellion_extra, Some([3, 4]));
        }
        other => panic!("expected a city at (0,0), got {other:?}"),
    }
    assert!(matches!(
        capital.unit.as_ref().map(|u| &u.trail),
        Some(UnitTrail::Settled { flag: 1, buffer }) if buffer.len() == 8
    ));

    let village = current.tile(1, 0).expect("tile (1,0)");
    assert!(matches!(
        &village.improvement,
        Some(Improvement::Plain(plain)) if plain.kind == 1
    ));
    assert!(village.is_city());

    let farm = current.tile(2, 0).expect("tile (2,0)");
    assert!(matches!(&farm.improvement, Some(Improvement::Plain(_))));

    for (x, expected) in [(0u32, 11usize), (1, 7)] {
        let tile = current.tile(x, 1).expect("embarked tile");
        match tile.unit.as_ref().map(|u| &u.trail) {
            Some(UnitTrail::Embarked(passenger)) => assert_eq!(passenger.buffer_b.len(), expected),
            other => panic!("expected an embarked unit at ({x},1), got {other:?}"),
        }
    }
}

#[test]
fn sections_round_trip_individually() {
    let bytes = common::sample_bytes();
    let decoded = decode(&bytes).expect("sample decodes");
    let index = &decoded.index;
    let current = &decoded.model.current;
    let slice = |start: OffsetKey, end: OffsetKey| {
        let range = index.range(start, end).expect("recorded range");
        &bytes[range.start as usize..range.end as usize]
    };

    for tile in current.iter_tiles() {
        let (x, y) = (tile.x, tile.y);
        assert_eq!(
            encode_tile(tile).expect("tile encodes"),
            slice(OffsetKey::TileStart { x, y }, OffsetKey::TileEnd { x, y }),
            "tile ({x},{y})"
        );
    }

    assert_eq!(
        encode_map(&current.tiles).expect("map encodes"),
        slice(OffsetKey::MapStart, OffsetKey::MapEnd)
    );
    assert_eq!(
        encode_players(&current.players).expect("players encode"),
        slice(OffsetKey::AllPlayersStart, OffsetKey::AllPlayersEnd)
    );
    for (position, player) in current.players.iter().enumerate() {
        assert_eq!(
            encode_player(player).expect("player encodes"),
            slice(
                OffsetKey::PlayerStart(position),
                OffsetKey::PlayerEnd(position)
            )
        );
    }

    let header = encode_map_header(&current.header).expect("header encodes");
    let map_start = index.offset(OffsetKey::MapStart).expect("map start") as usize;
    assert_eq!(header.as_slice(), &bytes[map_start - header.len()..map_start]);

    let snapshot = encode_snapshot(current).expect("snapshot encodes");
    let all_players_end = index.offset(OffsetKey::AllPlayersEnd).expect("players end") as usize;
    assert_eq!(
        snapshot.as_slice(),
        &bytes[all_players_end - snapshot.len()..all_players_end]
    );
}

#[test]
fn decoding_twice_is_deterministic() {
    let bytes = common::sample_bytes();
    let first = decode(&bytes).expect("first decode");
    let second = decode(&bytes).expect("second decode");

    assert_eq!(first.model, second.model);
    let first_keys: Vec<_> = first.index.keys().copied().collect();
    let second_keys: Vec<_> = second.index.keys().copied().collect();
    assert_eq!(first_keys, second_keys);
    assert_eq!(first.index, second.index);
}

#[test]
fn default_index_covers_only_the_current_snapshot() {
    let bytes = common::sample_bytes();
    let current = decode(&bytes).expect("decode").index;
    let initial = decode_snapshot_index(&bytes, SnapshotKind::Initial).expect("initial pass");

    let current_start = current.offset(OffsetKey::MapStart).expect("current map");
    let initial_start = initial.offset(OffsetKey::MapStart).expect("initial map");
    assert!(initial_start < current_start);
    assert!(current.contains(OffsetKey::UnitLocation { x: 0, y: 0 }));
    assert!(!initial.contains(OffsetKey::UnitLocation { x: 0, y: 0 }));
    assert!(current.contains(OffsetKey::PreviousUnitLocation { x: 0, y: 1 }));
    assert!(current.contains(OffsetKey::PlayerCurrency { id: 255 }));
}

#[test]
fn zero_dimension_prefix_is_preserved_and_skipped_by_keys() {
    let mut model = common::sample_model();
    model.current.header.zero_dimension_prefix = true;
    let bytes = encode_save(&model).expect("encodes");

    let decoded = decode(&bytes).expect("decodes");
    assert!(decoded.model.current.header.zero_dimension_prefix);
    assert_eq!(decoded.model.current.width(), common::CURRENT_WIDTH);

    let width_at = decoded.index.offset(OffsetKey::MapWidth).expect("width key") as usize;
    assert_eq!(&bytes[width_at - 4..width_at], &[0, 0, 0, 0]);
    assert_eq!(
        u16::from_le_bytes([bytes[width_at], bytes[width_at + 1]]),
        common::CURRENT_WIDTH
    );
    assert_eq!(encode_save(&decoded.model).expect("re-encodes"), bytes);
}

#[test]
fn model_survives_json_round_trip() {
    let bytes = common::sample_bytes();
    let model = decode(&bytes).expect("decode").model;

    let json = serde_json::to_string(&model).expect("serialize model");
    let restored = serde_json::from_str(&json).expect("deserialize model");
    assert_eq!(model, restored);
    assert_eq!(encode_save(&restored).expect("encode restored"), bytes);
}

#[test]
fn truncated_save_reports_offset() {
    let bytes = common::sample_bytes();
    let cut = &bytes[..bytes.len() / 2];
    assert!(matches!(
        decode(cut),
        Err(Error::TruncatedInput { .. })
    ));
}

#[test]
fn tile_coordinate_mismatch_is_corrupt() {
    let bytes = common::sample_bytes();
    let decoded = decode(&bytes).expect("decode");
    let at = decoded
        .index
        .offset(OffsetKey::TileStart { x: 3, y: 2 })
        .expect("last tile") as usize;

    let mut broken = bytes.clone();
    broken[at] = 9;
    assert!(matches!(decode(&broken), Err(Error::CorruptSave(_))));
}

#[test]
fn unknown_task_type_is_reported() {
    let bytes = common::sample_bytes();
    let decoded = decode(&bytes).expect("decodes");

    // second task of player 1: kind 3, payload [4, 0]
    let player_start = decoded
        .index
        .offset(OffsetKey::PlayerStart(0))
        .expect("player 0") as usize;
    let player = encode_player(&decoded.model.current.players[0]).expect("player encodes");
    let task_kind_at = player
        .windows(4)
        .position(|w| w == [3, 0, 4, 0])
        .expect("second task in record");

    let mut broken = bytes.clone();
    broken[player_start + task_kind_at] = 9;
    assert!(matches!(
        decode(&broken),
        Err(Error::UnsupportedTaskType { kind: 9, .. })
    ));
}

#[test]
fn duplicate_player_ids_are_corrupt() {
    let mut model = common::sample_model();
    model.current.players[1].id = 1;
    let bytes = encode_save(&model).expect("encoder does not check ids");
    assert!(matches!(decode(&bytes), Err(Error::CorruptSave(_))));
}

/// The sample save with `bytes` written at `offset`.
fn corrupted(offset: usize, bytes: &[u8]) -> Vec<u8> {
    let mut out = common::sample_bytes();
    out[offset..offset + bytes.len()].copy_from_slice(bytes);
    out
}

fn offset_of(key: OffsetKey) -> usize {
    decode(&common::sample_bytes())
        .expect("sample decodes")
        .index
        .offset(key)
        .expect("key recorded") as usize
}

// City body before the has-name byte: eight u16/i16 fields and the capital link.
const CITY_HAS_NAME_AT: usize = 1 + 2 + 17;

#[test]
fn city_without_has_name_byte_is_corrupt() {
    let at = offset_of(OffsetKey::TileImprovementStart { x: 0, y: 0 }) + CITY_HAS_NAME_AT;
    let bytes = common::sample_bytes();
    assert_eq!(&bytes[at..at + 7], &[1, 5, b'A', b'l', b'p', b'h', b'a']);

    match decode(&corrupted(at, &[0])) {
        Err(Error::CorruptSave(message)) => assert!(message.contains("has-name"), "{message}"),
        other => panic!("expected CorruptSave, got {other:?}"),
    }
}

#[test]
fn city_with_founding_tribe_is_corrupt() {
    // has-name, length, "Alpha"
    let at = offset_of(OffsetKey::TileImprovementStart { x: 0, y: 0 }) + CITY_HAS_NAME_AT + 7;
    assert_eq!(common::sample_bytes()[at], 0);

    match decode(&corrupted(at, &[3])) {
        Err(Error::CorruptSave(message)) => {
            assert!(message.contains("founded-tribe"), "{message}")
        }
        other => panic!("expected CorruptSave, got {other:?}"),
    }
}

#[test]
fn negative_task_count_is_corrupt() {
    // currency, score, unknown int, city count; three techs; one encountered id
    let at = offset_of(OffsetKey::PlayerCurrency { id: 1 }) + 14 + (2 + 3 * 2) + (2 + 1);
    assert_eq!(&common::sample_bytes()[at..at + 2], &[2, 0]);

    match decode(&corrupted(at, &(-1i16).to_le_bytes())) {
        Err(Error::CorruptSave(message)) => {
            assert!(message.contains("negative task count -1"), "{message}")
        }
        other => panic!("expected CorruptSave, got {other:?}"),
    }
}

#[test]
fn presence_flag_of_two_is_unsupported() {
    let resource_flag = offset_of(OffsetKey::TileStart { x: 3, y: 2 }) + TILE_HEADER_LEN;
    let unit_flag = offset_of(OffsetKey::TileImprovementEnd { x: 1, y: 0 });
    let bytes = common::sample_bytes();
    assert_eq!(bytes[resource_flag], 0);
    assert_eq!(bytes[unit_flag], 0);

    for at in [resource_flag, unit_flag] {
        assert!(
            matches!(decode(&corrupted(at, &[2])), Err(Error::UnsupportedVariant(_))),
            "flag at {at}"
        );
    }
}

#[test]
fn nonzero_data_flags_and_raw_names_survive_a_round_trip() {
    let road_at = offset_of(OffsetKey::TileRoad { x: 3, y: 2 });
    let mut bytes = corrupted(road_at, &[2]);
    // "Kiera" -> "Ki\xe9ra"
    let name_at = offset_of(OffsetKey::PlayerStart(0)) + 2;
    assert_eq!(&bytes[name_at..name_at + 5], b"Kiera");
    bytes[name_at + 2] = 0xe9;

    let decoded = decode(&bytes).expect("lenient bytes decode");
    let current = &decoded.model.current;
    assert_eq!(current.tile(3, 2).expect("tile").has_road, Flag(2));
    let name = &current.players[0].name;
    assert_eq!(name.as_bytes(), &[b'K', b'i', 0xe9, b'r', b'a']);
    assert_eq!(name.as_str(), None);

    assert_eq!(encode_save(&decoded.model).expect("re-encodes"), bytes);

    let json = serde_json::to_string(&decoded.model).expect("serialize model");
    let restored = serde_json::from_str(&json).expect("deserialize model");
    assert_eq!(encode_save(&restored).expect("encode restored"), bytes);
}
