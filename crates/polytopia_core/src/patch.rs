use tracing::debug;

use crate::decoder::{Decoded, decode_at_generation};
use crate::error::{Error, Result, ensure_range};
use crate::layout::{ByteRange, OffsetIndex, OffsetKey};
use crate::model::SnapshotKind;

/// Width of an in-place scalar patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarWidth {
    U8,
    U16,
    I16,
    U32,
    I32,
}

impl ScalarWidth {
    fn label(self) -> &'static str {
        match self {
            ScalarWidth::U8 => "u8 field",
            ScalarWidth::U16 => "u16 field",
            ScalarWidth::I16 => "i16 field",
            ScalarWidth::U32 => "u32 field",
            ScalarWidth::I32 => "i32 field",
        }
    }

    fn bounds(self) -> (i64, i64) {
        match self {
            ScalarWidth::U8 => (0, i64::from(u8::MAX)),
            ScalarWidth::U16 => (0, i64::from(u16::MAX)),
            ScalarWidth::I16 => (i64::from(i16::MIN), i64::from(i16::MAX)),
            ScalarWidth::U32 => (0, i64::from(u32::MAX)),
            ScalarWidth::I32 => (i64::from(i32::MIN), i64::from(i32::MAX)),
        }
    }

    fn encode(self, value: i64) -> Result<Vec<u8>> {
        let (min, max) = self.bounds();
        ensure_range(self.label(), value, min, max)?;
        Ok(match self {
            ScalarWidth::U8 => vec![value as u8],
            ScalarWidth::U16 => (value as u16).to_le_bytes().to_vec(),
            ScalarWidth::I16 => (value as i16).to_le_bytes().to_vec(),
            ScalarWidth::U32 => (value as u32).to_le_bytes().to_vec(),
            ScalarWidth::I32 => (value as i32).to_le_bytes().to_vec(),
        })
    }
}

/// Owns a save buffer and applies byte patches to it.
///
/// Offsets come from an [`OffsetIndex`]. Each length-changing replacement is
/// remembered as a shift of the old `[start, end)` range; keys from an index
/// built before a shift are only honoured if they sit at or before the
/// start of every later shift, since everything else may have moved.
#[derive(Debug, Clone)]
pub struct PatchWriter {
    bytes: Vec<u8>,
    shifts: Vec<ByteRange>,
}

impl PatchWriter {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            shifts: Vec::new(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of length-changing patches applied so far.
    pub fn generation(&self) -> u64 {
        self.shifts.len() as u64
    }

    /// Decodes the current buffer; the index is tagged with the current
    /// generation. Edits after a shift must use this rather than the free
    /// [`crate::decode`], whose index this writer would report as stale.
    pub fn decode(&self) -> Result<Decoded> {
        decode_at_generation(&self.bytes, self.generation(), SnapshotKind::Current)
    }

    pub fn decode_snapshot_index(&self, kind: SnapshotKind) -> Result<OffsetIndex> {
        decode_at_generation(&self.bytes, self.generation(), kind).map(|decoded| decoded.index)
    }

    /// Looks up `key` and checks that no later replacement moved it.
    pub fn resolve(&self, index: &OffsetIndex, key: OffsetKey) -> Result<u64> {
        let offset = index.offset(key)?;
        let generation = usize::try_from(index.generation()).unwrap_or(usize::MAX);
        let Some(later) = self.shifts.get(generation..) else {
            // Index from a newer buffer than this one.
            return Err(Error::StaleOffsetKey(key));
        };
        if later
            .iter()
            .all(|shift| offset < shift.end && offset <= shift.start)
        {
            Ok(offset)
        } else {
            Err(Error::StaleOffsetKey(key))
        }
    }

    /// Replaces `[start_key, end_key)` with `new_bytes`, moving everything
    /// after it. Returns the resolved range that was replaced.
    pub fn replace_range(
        &mut self,
        index: &OffsetIndex,
        start_key: OffsetKey,
        end_key: OffsetKey,
        new_bytes: &[u8],
    ) -> Result<ByteRange> {
        let start = self.resolve(index, start_key)?;
        let end = self.resolve(index, end_key)?;
        let range = ByteRange { start, end };
        if end < start {
            return Err(Error::corrupt(format!(
                "range {start_key}..{end_key} is inverted: {start}..{end}"
            )));
        }
        let (lo, hi) = self.slice_bounds(range)?;

        self.bytes.splice(lo..hi, new_bytes.iter().copied());
        if new_bytes.len() as u64 != range.len() {
            self.shifts.push(range);
        }

        debug!(
            start = %start_key,
            end = %end_key,
            old_len = range.len(),
            new_len = new_bytes.len(),
            generation = self.generation(),
            "replaced byte range"
        );
        Ok(range)
    }

    /// Overwrites a fixed-width scalar in place. The buffer length is unchanged.
    pub fn write_scalar_at(&mut self, offset: u64, width: ScalarWidth, value: i64) -> Result<()> {
        let encoded = width.encode(value)?;
        self.overwrite_at(offset, &encoded)
    }

    /// Overwrites `bytes.len()` bytes at `offset` in place.
    pub fn overwrite_at(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        let range = ByteRange {
            start: offset,
            end: offset.saturating_add(bytes.len() as u64),
        };
        let (lo, hi) = self.slice_bounds(range)?;
        self.bytes[lo..hi].copy_from_slice(bytes);
        Ok(())
    }

    fn slice_bounds(&self, range: ByteRange) -> Result<(usize, usize)> {
        let available = self.bytes.len();
        let truncated = || Error::TruncatedInput {
            offset: range.start,
            needed: usize::try_from(range.len()).unwrap_or(usize::MAX),
            available: available.saturating_sub(usize::try_from(range.start).unwrap_or(usize::MAX)),
        };
        let lo = usize::try_from(range.start).map_err(|_| truncated())?;
        let hi = usize::try_from(range.end).map_err(|_| truncated())?;
        if hi > available {
            return Err(truncated());
        }
        Ok((lo, hi))
    }
}

#[cfg(test)]
mod tests {
    use super::{PatchWriter, ScalarWidth};
    use crate::error::Error;
    use crate::layout::{OffsetIndex, OffsetKey};

    fn index_with(entries: &[(OffsetKey, u64)]) -> OffsetIndex {
        let mut index = OffsetIndex::new(0);
        for (key, offset) in entries {
            index.record(*key, *offset);
        }
        index
    }

    #[test]
    fn replace_range_grows_and_shrinks_the_buffer() {
        let index = index_with(&[(OffsetKey::MapStart, 2), (OffsetKey::MapEnd, 4)]);
        let mut writer = PatchWriter::new(vec![0, 1, 2, 3, 4, 5]);

        writer
            .replace_range(&index, OffsetKey::MapStart, OffsetKey::MapEnd, &[9, 9, 9, 9])
            .expect("grow");
        assert_eq!(writer.bytes(), &[0, 1, 9, 9, 9, 9, 4, 5]);
        assert_eq!(writer.generation(), 1);
    }

    #[test]
    fn same_length_replace_keeps_generation() {
        let index = index_with(&[(OffsetKey::MapStart, 1), (OffsetKey::MapEnd, 3)]);
        let mut writer = PatchWriter::new(vec![0, 1, 2, 3]);
        writer
            .replace_range(&index, OffsetKey::MapStart, OffsetKey::MapEnd, &[7, 8])
            .expect("same length");
        assert_eq!(writer.bytes(), &[0, 7, 8, 3]);
        assert_eq!(writer.generation(), 0);

        writer
            .replace_range(&index, OffsetKey::MapStart, OffsetKey::MapEnd, &[5, 6])
            .expect("index still valid");
    }

    #[test]
    fn keys_after_a_shift_are_stale() {
        let index = index_with(&[
            (OffsetKey::SquareSize, 0),
            (OffsetKey::MapStart, 2),
            (OffsetKey::MapEnd, 4),
            (OffsetKey::AllPlayersStart, 5),
        ]);
        let mut writer = PatchWriter::new(vec![0; 8]);
        writer
            .replace_range(&index, OffsetKey::MapStart, OffsetKey::MapEnd, &[1])
            .expect("shrink");

        assert_eq!(
            writer
                .resolve(&index, OffsetKey::SquareSize)
                .expect("before the shift"),
            0
        );
        assert_eq!(
            writer
                .resolve(&index, OffsetKey::MapStart)
                .expect("start of the replaced block"),
            2
        );
        assert!(matches!(
            writer.resolve(&index, OffsetKey::MapEnd),
            Err(Error::StaleOffsetKey(OffsetKey::MapEnd))
        ));
        assert!(matches!(
            writer.resolve(&index, OffsetKey::AllPlayersStart),
            Err(Error::StaleOffsetKey(_))
        ));
    }

    #[test]
    fn insertions_back_to_front_share_one_index() {
        let index = index_with(&[
            (OffsetKey::TileEnd { x: 0, y: 0 }, 2),
            (OffsetKey::TileEnd { x: 0, y: 1 }, 4),
        ]);
        let mut writer = PatchWriter::new(vec![0, 0, 1, 1]);
        let bottom = OffsetKey::TileEnd { x: 0, y: 1 };
        let top = OffsetKey::TileEnd { x: 0, y: 0 };

        writer
            .replace_range(&index, bottom, bottom, &[7])
            .expect("bottom row");
        writer
            .replace_range(&index, top, top, &[6])
            .expect("upper row sits before the first insertion");
        assert_eq!(writer.bytes(), &[0, 0, 6, 1, 1, 7]);

        assert!(matches!(
            writer.replace_range(&index, bottom, bottom, &[8]),
            Err(Error::StaleOffsetKey(_))
        ));
    }

    #[test]
    fn scalar_writes_are_range_checked() {
        let mut writer = PatchWriter::new(vec![0; 4]);
        writer
            .write_scalar_at(1, ScalarWidth::U16, 0x0102)
            .expect("fits");
        assert_eq!(writer.bytes(), &[0, 2, 1, 0]);

        writer
            .write_scalar_at(0, ScalarWidth::I16, -2)
            .expect("negative i16");
        assert_eq!(&writer.bytes()[..2], &[0xfe, 0xff]);

        assert!(matches!(
            writer.write_scalar_at(0, ScalarWidth::U8, 256),
            Err(Error::ValueOutOfRange { max: 255, .. })
        ));
        assert!(matches!(
            writer.write_scalar_at(2, ScalarWidth::U32, 1),
            Err(Error::TruncatedInput { .. })
        ));
        assert_eq!(writer.generation(), 0);
    }

    #[test]
    fn missing_key_is_unknown_not_stale() {
        let index = OffsetIndex::new(0);
        let mut writer = PatchWriter::new(vec![0; 4]);
        assert!(matches!(
            writer.replace_range(&index, OffsetKey::MapStart, OffsetKey::MapEnd, &[]),
            Err(Error::UnknownOffsetKey(OffsetKey::MapStart))
        ));
    }
}
