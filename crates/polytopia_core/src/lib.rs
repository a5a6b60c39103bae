pub mod decoder;
pub mod edit;
pub mod encoder;
pub mod error;
pub mod layout;
pub mod model;
pub mod patch;
pub mod reader;
pub mod storage;
pub mod text;

pub use decoder::{Decoded, decode, decode_snapshot_index};
pub use encoder::{
    encode_map, encode_map_header, encode_player, encode_players, encode_save, encode_snapshot,
    encode_tile, encode_unit,
};
pub use error::{Error, Result};
pub use layout::{ByteRange, OffsetIndex, OffsetKey};
pub use model::{SaveModel, Snapshot, SnapshotKind};
pub use patch::{PatchWriter, ScalarWidth};
pub use storage::{edit_file, read_save, write_save_atomic};
pub use text::SaveString;
