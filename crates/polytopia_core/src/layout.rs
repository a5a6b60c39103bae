use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Semantic name for a byte offset recorded while decoding.
///
/// Tile keys use world coordinates; `PlayerStart`/`PlayerEnd` use the
/// player's position in the player list, the other player keys use its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OffsetKey {
    SquareSize,
    MapWidth,
    MapHeight,
    MapStart,
    MapEnd,
    TileStart { x: u32, y: u32 },
    TileImprovementStart { x: u32, y: u32 },
    TileImprovementEnd { x: u32, y: u32 },
    UnitLocation { x: u32, y: u32 },
    PreviousUnitLocation { x: u32, y: u32 },
    TileVisibility { x: u32, y: u32 },
    TileRoad { x: u32, y: u32 },
    TileEnd { x: u32, y: u32 },
    AllPlayersStart,
    AllPlayersEnd,
    PlayerStart(usize),
    PlayerEnd(usize),
    PlayerKnownPlayers { id: u8 },
    PlayerCurrency { id: u8 },
}

impl fmt::Display for OffsetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OffsetKey::SquareSize => write!(f, "SquareSize"),
            OffsetKey::MapWidth => write!(f, "MapWidth"),
            OffsetKey::MapHeight => write!(f, "MapHeight"),
            OffsetKey::MapStart => write!(f, "MapStart"),
            OffsetKey::MapEnd => write!(f, "MapEnd"),
            OffsetKey::TileStart { x, y } => write!(f, "TileStart({x},{y})"),
            OffsetKey::TileImprovementStart { x, y } => {
                write!(f, "TileImprovementStart({x},{y})")
            }
            OffsetKey::TileImprovementEnd { x, y } => write!(f, "TileImprovementEnd({x},{y})"),
            OffsetKey::UnitLocation { x, y } => write!(f, "UnitLocation({x},{y})"),
            OffsetKey::PreviousUnitLocation { x, y } => {
                write!(f, "PreviousUnitLocation({x},{y})")
            }
            OffsetKey::TileVisibility { x, y } => write!(f, "TileVisibility({x},{y})"),
            OffsetKey::TileRoad { x, y } => write!(f, "TileRoad({x},{y})"),
            OffsetKey::TileEnd { x, y } => write!(f, "TileEnd({x},{y})"),
            OffsetKey::AllPlayersStart => write!(f, "AllPlayersStart"),
            OffsetKey::AllPlayersEnd => write!(f, "AllPlayersEnd"),
            OffsetKey::PlayerStart(index) => write!(f, "PlayerStart({index})"),
            OffsetKey::PlayerEnd(index) => write!(f, "PlayerEnd({index})"),
            OffsetKey::PlayerKnownPlayers { id } => write!(f, "PlayerKnownPlayers(id={id})"),
            OffsetKey::PlayerCurrency { id } => write!(f, "PlayerCurrency(id={id})"),
        }
    }
}

/// Offsets recorded by one decode pass over one exact byte layout.
///
/// `generation` is the patch generation of the buffer the index was built
/// from; the patch writer uses it to reject keys that a later length-changing
/// patch has moved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetIndex {
    entries: BTreeMap<OffsetKey, u64>,
    generation: u64,
}

impl OffsetIndex {
    pub fn new(generation: u64) -> Self {
        Self {
            entries: BTreeMap::new(),
            generation,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn record(&mut self, key: OffsetKey, offset: u64) {
        self.entries.insert(key, offset);
    }

    pub fn get(&self, key: OffsetKey) -> Option<u64> {
        self.entries.get(&key).copied()
    }

    pub fn contains(&self, key: OffsetKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn offset(&self, key: OffsetKey) -> Result<u64> {
        self.get(key).ok_or(Error::UnknownOffsetKey(key))
    }

    /// Resolves a `[start, end)` pair of keys into a byte range.
    pub fn range(&self, start: OffsetKey, end: OffsetKey) -> Result<ByteRange> {
        let range = ByteRange {
            start: self.offset(start)?,
            end: self.offset(end)?,
        };
        if range.end < range.start {
            return Err(Error::corrupt(format!(
                "range {start}..{end} is inverted: {}..{}",
                range.start, range.end
            )));
        }
        Ok(range)
    }

    pub fn keys(&self) -> impl Iterator<Item = &OffsetKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OffsetKey, &u64)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{OffsetIndex, OffsetKey};
    use crate::error::Error;

    #[test]
    fn keys_render_as_readable_names() {
        assert_eq!(
            OffsetKey::TileStart { x: 3, y: 1 }.to_string(),
            "TileStart(3,1)"
        );
        assert_eq!(OffsetKey::PlayerStart(2).to_string(), "PlayerStart(2)");
        assert_eq!(
            OffsetKey::PlayerCurrency { id: 255 }.to_string(),
            "PlayerCurrency(id=255)"
        );
    }

    #[test]
    fn missing_key_is_reported_by_name() {
        let mut index = OffsetIndex::new(0);
        index.record(OffsetKey::MapStart, 10);
        index.record(OffsetKey::MapEnd, 40);

        let range = index
            .range(OffsetKey::MapStart, OffsetKey::MapEnd)
            .expect("both keys recorded");
        assert_eq!(range.len(), 30);

        let err = index
            .offset(OffsetKey::UnitLocation { x: 0, y: 0 })
            .expect_err("no unit recorded");
        assert!(matches!(
            err,
            Error::UnknownOffsetKey(OffsetKey::UnitLocation { x: 0, y: 0 })
        ));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut index = OffsetIndex::new(0);
        index.record(OffsetKey::MapStart, 40);
        index.record(OffsetKey::MapEnd, 10);
        assert!(matches!(
            index.range(OffsetKey::MapStart, OffsetKey::MapEnd),
            Err(Error::CorruptSave(_))
        ));
    }
}
