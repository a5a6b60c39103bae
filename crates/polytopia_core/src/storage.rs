use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::patch::PatchWriter;

/// Reads a whole, already decompressed save into memory.
pub fn read_save(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path)?;
    debug!(path = %path.display(), len = bytes.len(), "read save");
    Ok(bytes)
}

/// Writes `bytes` next to `path` and renames it into place, so readers see
/// either the old file or the complete new one.
pub fn write_save_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = temp_path_for(path);
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        let written = writer.write_all(bytes).and_then(|()| writer.flush());
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(err.into());
        }
        let file = writer.into_inner().map_err(|err| err.into_error())?;
        file.sync_all()?;
    }
    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }
    debug!(path = %path.display(), len = bytes.len(), "wrote save");
    Ok(())
}

/// Runs one edit against the save at `path`.
///
/// The edit works on an in-memory buffer; the result is written once, to
/// `output` when given or back over `path`, and only if the edit succeeded.
pub fn edit_file<T, F>(path: &Path, output: Option<&Path>, edit: F) -> Result<T>
where
    F: FnOnce(&mut PatchWriter) -> Result<T>,
{
    let mut writer = PatchWriter::new(read_save(path)?);
    let value = edit(&mut writer)?;
    write_save_atomic(output.unwrap_or(path), writer.bytes())?;
    Ok(value)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("save"));
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}
