//! Raw byte blocks the edit operations splice into a save.

use crate::encoder::{emit_improvement, encode_player, encode_tile};
use crate::error::{Error, Result, ensure_range};
use crate::model::{
    City, Improvement, KNOWN_PLAYER_ENTRY_LEN, NATURE_PLAYER_ID, Player, SWAP_SENTINEL_ID, Tile,
};

/// A flat, unowned, unexplored tile record.
pub fn build_empty_tile(x: u32, y: u32) -> Result<Vec<u8>> {
    encode_tile(&Tile::empty(x, y))
}

/// Tile header bytes from the owner field on: owner, capital 0, then the
/// city coordinates as the capital position.
pub fn build_city_header(x: u32, y: u32, tribe: u8) -> [u8; 10] {
    let mut out = [0u8; 10];
    out[0] = tribe;
    out[2..6].copy_from_slice(&x.to_le_bytes());
    out[6..10].copy_from_slice(&y.to_le_bytes());
    out
}

/// Improvement section for a freshly founded level 1 city.
pub fn build_city(name: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    emit_improvement(
        Some(&Improvement::City(City::founded(name))),
        &mut out,
    )?;
    Ok(out)
}

/// Player record for a new bot player.
pub fn build_empty_player(id: u8, name: &str, rgb: [u8; 3]) -> Result<Vec<u8>> {
    ensure_range(
        "new player id",
        i64::from(id),
        1,
        i64::from(SWAP_SENTINEL_ID) - 1,
    )?;
    encode_player(&Player::new_bot(id, name, rgb))
}

/// Inserts `[new_id, 0, 0, 0, 0]` before the trailing nature quintuple of a
/// flat known-players array.
///
/// Ids are assumed to run `1..n` before nature, so an array of `n + 1`
/// quintuples already covers every id up to `n` and is returned unchanged.
pub fn splice_known_player(flat: &[u8], new_id: u8) -> Result<Vec<u8>> {
    if flat.len() % KNOWN_PLAYER_ENTRY_LEN != 0 {
        return Err(Error::corrupt(format!(
            "known players array is {} bytes, not a multiple of {KNOWN_PLAYER_ENTRY_LEN}",
            flat.len()
        )));
    }
    let Some(nature_at) = flat.len().checked_sub(KNOWN_PLAYER_ENTRY_LEN) else {
        return Err(Error::corrupt("known players array is empty"));
    };
    if flat[nature_at] != NATURE_PLAYER_ID {
        return Err(Error::corrupt(format!(
            "known players array ends with id {}, expected {NATURE_PLAYER_ID}",
            flat[nature_at]
        )));
    }

    let max_known_id = flat.len() / KNOWN_PLAYER_ENTRY_LEN - 1;
    if max_known_id >= usize::from(new_id) {
        return Ok(flat.to_vec());
    }

    let mut out = Vec::with_capacity(flat.len() + KNOWN_PLAYER_ENTRY_LEN);
    out.extend_from_slice(&flat[..nature_at]);
    out.extend_from_slice(&[new_id, 0, 0, 0, 0]);
    out.extend_from_slice(&flat[nature_at..]);
    Ok(out)
}
