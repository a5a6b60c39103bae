use tracing::info;

use super::builders::build_empty_tile;
use crate::decoder::Decoded;
use crate::error::{Error, Result, ensure_range};
use crate::layout::{OffsetIndex, OffsetKey};
use crate::patch::{PatchWriter, ScalarWidth};

const MAX_DIMENSION: i64 = 255;

/// Writes new map dimensions into the current header. The square size
/// becomes the smaller of the two.
pub fn modify_map_dimensions(writer: &mut PatchWriter, width: u16, height: u16) -> Result<()> {
    let Decoded { index, .. } = writer.decode()?;
    write_dimensions(writer, &index, width, height)?;
    info!(width, height, "modified map dimensions");
    Ok(())
}

/// Appends empty rows below the map until it is `new_height` rows tall.
pub fn expand_rows(writer: &mut PatchWriter, new_height: u16) -> Result<()> {
    let Decoded { model, index } = writer.decode()?;
    let width = model.current.width();
    let height = model.current.height();
    check_growth("height", height, new_height)?;

    let mut bytes = Vec::new();
    for y in u32::from(height)..u32::from(new_height) {
        for x in 0..u32::from(width) {
            bytes.extend_from_slice(&build_empty_tile(x, y)?);
        }
    }
    writer.replace_range(&index, OffsetKey::MapEnd, OffsetKey::MapEnd, &bytes)?;
    write_dimensions(writer, &index, width, new_height)?;
    info!(width, height = new_height, "expanded map rows");
    Ok(())
}

/// Appends empty columns to the right of every row until the map is
/// `new_width` columns wide.
pub fn expand_columns(writer: &mut PatchWriter, new_width: u16) -> Result<()> {
    let Decoded { model, index } = writer.decode()?;
    let width = model.current.width();
    let height = model.current.height();
    check_growth("width", width, new_width)?;
    let Some(last_x) = u32::from(width).checked_sub(1) else {
        return Err(Error::corrupt("map has no columns to extend"));
    };

    // Bottom row first so every insertion point above is still where the
    // index recorded it.
    for y in (0..u32::from(height)).rev() {
        let mut bytes = Vec::new();
        for x in u32::from(width)..u32::from(new_width) {
            bytes.extend_from_slice(&build_empty_tile(x, y)?);
        }
        let row_end = OffsetKey::TileEnd { x: last_x, y };
        writer.replace_range(&index, row_end, row_end, &bytes)?;
    }
    write_dimensions(writer, &index, new_width, height)?;
    info!(width = new_width, height, "expanded map columns");
    Ok(())
}

/// Grows the map to `size` x `size`: columns first, then rows.
pub fn expand_map(writer: &mut PatchWriter, size: u16) -> Result<()> {
    let Decoded { model, .. } = writer.decode()?;
    check_growth("width", model.current.width(), size)?;
    check_growth("height", model.current.height(), size)?;

    expand_columns(writer, size)?;
    expand_rows(writer, size)
}

fn check_growth(field: &'static str, current: u16, requested: u16) -> Result<()> {
    ensure_range(
        field,
        i64::from(requested),
        i64::from(current) + 1,
        MAX_DIMENSION,
    )
}

/// The dimension keys sit in the header, ahead of every tile, so an index
/// taken before tiles were inserted still resolves them.
pub(super) fn write_dimensions(
    writer: &mut PatchWriter,
    index: &OffsetIndex,
    width: u16,
    height: u16,
) -> Result<()> {
    let square = width.min(height);
    let square_at = writer.resolve(index, OffsetKey::SquareSize)?;
    let width_at = writer.resolve(index, OffsetKey::MapWidth)?;
    let height_at = writer.resolve(index, OffsetKey::MapHeight)?;
    writer.write_scalar_at(square_at, ScalarWidth::U32, i64::from(square))?;
    writer.write_scalar_at(width_at, ScalarWidth::U16, i64::from(width))?;
    writer.write_scalar_at(height_at, ScalarWidth::U16, i64::from(height))?;
    Ok(())
}
