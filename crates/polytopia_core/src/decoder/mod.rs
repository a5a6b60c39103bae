mod sections;

use tracing::debug;

use crate::error::Result;
use crate::layout::OffsetIndex;
use crate::model::{SaveModel, SnapshotKind, owner_to_tribe};
use crate::reader::ByteCursor;
use sections::{Recorder, read_snapshot};

const SNAPSHOT_SEPARATOR_LEN: usize = 3;

/// A decoded save together with the offsets of its current snapshot.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub model: SaveModel,
    pub index: OffsetIndex,
}

/// Decodes a raw save, indexing the current snapshot.
///
/// The index is tagged generation 0, so a [`crate::PatchWriter`] only accepts
/// it while it has applied no length-changing patch. Once a writer has
/// shifted its buffer, decode through [`crate::PatchWriter::decode`] instead.
pub fn decode(bytes: &[u8]) -> Result<Decoded> {
    decode_at_generation(bytes, 0, SnapshotKind::Current)
}

/// Runs a separate decode pass that indexes the given snapshot instead of
/// the current one. Edits aimed at the initial map need this: the default
/// index only knows where the current snapshot's records live. Like
/// [`decode`], the index is tagged generation 0.
pub fn decode_snapshot_index(bytes: &[u8], kind: SnapshotKind) -> Result<OffsetIndex> {
    decode_at_generation(bytes, 0, kind).map(|decoded| decoded.index)
}

pub(crate) fn decode_at_generation(
    bytes: &[u8],
    generation: u64,
    indexed: SnapshotKind,
) -> Result<Decoded> {
    let mut c = ByteCursor::new(bytes);
    let mut rec = Recorder::new(generation);

    rec.enabled = indexed == SnapshotKind::Initial;
    let initial = read_snapshot(&mut c, &mut rec)?;
    let separator = c.read_array::<SNAPSHOT_SEPARATOR_LEN>()?;

    rec.enabled = indexed == SnapshotKind::Current;
    let current = read_snapshot(&mut c, &mut rec)?;
    let trailer = c.read_fixed(c.remaining())?.to_vec();

    owner_to_tribe(&initial.players)?;
    owner_to_tribe(&current.players)?;

    debug!(
        width = current.header.width,
        height = current.header.height,
        players = current.players.len(),
        trailer = trailer.len(),
        keys = rec.index.len(),
        "decoded save"
    );

    Ok(Decoded {
        model: SaveModel {
            initial,
            current,
            separator,
            trailer,
        },
        index: rec.index,
    })
}
