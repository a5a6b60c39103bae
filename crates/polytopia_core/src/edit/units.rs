use tracing::info;

use crate::decoder::Decoded;
use crate::error::{Error, Result};
use crate::layout::{OffsetIndex, OffsetKey};
use crate::model::{UNIT_OWNER_OFFSET, UNIT_TYPE_OFFSET, UnitLocation};
use crate::patch::{PatchWriter, ScalarWidth};

/// Gives the unit on a tile to another tribe, along with the shadow record
/// of the unit it replaced when there is one.
pub fn modify_unit_tribe(writer: &mut PatchWriter, x: u32, y: u32, tribe: u8) -> Result<()> {
    let Decoded { model, index } = writer.decode()?;
    model.tile(x, y)?;
    write_unit_owner(writer, &index, x, y, tribe)?;
    info!(x, y, tribe, "modified unit tribe");
    Ok(())
}

pub fn modify_unit_type(writer: &mut PatchWriter, x: u32, y: u32, kind: u16) -> Result<()> {
    let Decoded { model, index } = writer.decode()?;
    model.tile(x, y)?;
    let at = writer.resolve(&index, OffsetKey::UnitLocation { x, y })?;
    writer.write_scalar_at(at + UNIT_TYPE_OFFSET, ScalarWidth::U16, i64::from(kind))?;
    info!(x, y, kind, "modified unit type");
    Ok(())
}

/// Moves every unit owned by `old` to `new`. Returns the number of units
/// converted.
pub fn convert_tribe_units(writer: &mut PatchWriter, old: u8, new: u8) -> Result<usize> {
    let Decoded { model, index } = writer.decode()?;
    let by_owner = model.tribe_to_units();
    let units = by_owner.get(&old).ok_or(Error::UnknownPlayer(old))?;
    relabel(writer, &index, units, new)?;
    info!(old, new, converted = units.len(), "converted tribe units");
    Ok(units.len())
}

/// Moves every unit on the map to `new`. Returns the number of units whose
/// owner changed.
pub fn convert_all_units(writer: &mut PatchWriter, new: u8) -> Result<usize> {
    let Decoded { model, index } = writer.decode()?;
    let mut converted = 0;
    for (owner, units) in model.tribe_to_units() {
        if owner == new {
            continue;
        }
        relabel(writer, &index, &units, new)?;
        converted += units.len();
    }
    info!(new, converted, "converted all units");
    Ok(converted)
}

fn relabel(
    writer: &mut PatchWriter,
    index: &OffsetIndex,
    units: &[UnitLocation],
    tribe: u8,
) -> Result<()> {
    for unit in units {
        write_unit_owner(writer, index, unit.x, unit.y, tribe)?;
    }
    Ok(())
}

fn write_unit_owner(
    writer: &mut PatchWriter,
    index: &OffsetIndex,
    x: u32,
    y: u32,
    tribe: u8,
) -> Result<()> {
    let at = writer.resolve(index, OffsetKey::UnitLocation { x, y })?;
    writer.write_scalar_at(at + UNIT_OWNER_OFFSET, ScalarWidth::U8, i64::from(tribe))?;

    let previous = OffsetKey::PreviousUnitLocation { x, y };
    if index.contains(previous) {
        let at = writer.resolve(index, previous)?;
        writer.write_scalar_at(at + UNIT_OWNER_OFFSET, ScalarWidth::U8, i64::from(tribe))?;
    }
    Ok(())
}
