use tracing::info;

use super::map::write_dimensions;
use crate::decoder::Decoded;
use crate::encoder::{emit_map, emit_players};
use crate::error::{Error, Result};
use crate::layout::OffsetKey;
use crate::model::Snapshot;
use crate::patch::PatchWriter;

/// Rolls the current map and players back to the initial snapshot. Players
/// keep only the starting tech.
pub fn reset_game(writer: &mut PatchWriter) -> Result<()> {
    let Decoded { model, index } = writer.decode()?;
    let mut initial = model.initial;
    for player in &mut initial.players {
        player.techs = vec![0];
    }

    let bytes = map_and_players(&initial)?;
    writer.replace_range(
        &index,
        OffsetKey::MapStart,
        OffsetKey::AllPlayersEnd,
        &bytes,
    )?;
    write_dimensions(writer, &index, initial.width(), initial.height())?;
    info!(
        width = initial.width(),
        height = initial.height(),
        players = initial.players.len(),
        "reset game to initial state"
    );
    Ok(())
}

/// Re-encodes the current map and players over themselves. The result must
/// match the existing bytes exactly; a difference means the encoder does not
/// reproduce this save and nothing is written.
pub fn rewrite_current(writer: &mut PatchWriter) -> Result<()> {
    let Decoded { model, index } = writer.decode()?;
    let range = index.range(OffsetKey::MapStart, OffsetKey::AllPlayersEnd)?;
    let bytes = map_and_players(&model.current)?;

    let existing = writer
        .bytes()
        .get(range.start as usize..range.end as usize)
        .ok_or_else(|| Error::corrupt("map and player range lies outside the save"))?;
    if existing != bytes.as_slice() {
        let first_diff = existing
            .iter()
            .zip(&bytes)
            .position(|(old, new)| old != new)
            .unwrap_or(existing.len().min(bytes.len()));
        return Err(Error::corrupt(format!(
            "re-encoded current snapshot differs at offset {} ({} bytes vs {} bytes)",
            range.start + first_diff as u64,
            bytes.len(),
            existing.len()
        )));
    }

    writer.replace_range(
        &index,
        OffsetKey::MapStart,
        OffsetKey::AllPlayersEnd,
        &bytes,
    )?;
    info!(len = bytes.len(), "rewrote current snapshot");
    Ok(())
}

fn map_and_players(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    emit_map(&snapshot.tiles, &mut out)?;
    emit_players(&snapshot.players, &mut out)?;
    Ok(out)
}
