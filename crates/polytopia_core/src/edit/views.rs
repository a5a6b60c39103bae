use std::collections::BTreeMap;

use serde::Serialize;

use crate::decoder::decode;
use crate::error::Result;
use crate::model::{CityLocation, UnitLocation};

/// One line of the player listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerSummary {
    pub id: u8,
    pub name: String,
    pub tribe: u16,
    /// Override colour as red, green, blue.
    pub color: [u8; 3],
}

/// Cities on the current map keyed by owner; unowned villages are under 0.
pub fn list_cities(bytes: &[u8]) -> Result<BTreeMap<u8, Vec<CityLocation>>> {
    Ok(decode(bytes)?.model.tribe_to_cities())
}

pub fn list_units(bytes: &[u8]) -> Result<BTreeMap<u8, Vec<UnitLocation>>> {
    Ok(decode(bytes)?.model.tribe_to_units())
}

pub fn list_players(bytes: &[u8]) -> Result<Vec<PlayerSummary>> {
    let decoded = decode(bytes)?;
    Ok(decoded
        .model
        .players()
        .iter()
        .map(|player| {
            let [b, g, r, _] = player.override_color;
            PlayerSummary {
                id: player.id,
                name: player.name.to_string_lossy().into_owned(),
                tribe: player.tribe,
                color: [r, g, b],
            }
        })
        .collect())
}
