use crate::error::{Error, Result};
use crate::text::SaveString;

/// Forward reader over a little-endian save buffer.
///
/// Every read is bounds checked; a short buffer is reported as
/// [`Error::TruncatedInput`] carrying the offset where the read started.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Absolute offset of the next unread byte.
    pub fn tell(&self) -> u64 {
        self.pos as u64
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_eof(&self) -> bool {
        self.remaining() == 0
    }

    pub fn seek_to(&mut self, pos: u64) -> Result<()> {
        let pos = usize::try_from(pos).map_err(|_| Error::TruncatedInput {
            offset: pos,
            needed: 0,
            available: self.data.len(),
        })?;
        if pos > self.data.len() {
            return Err(Error::TruncatedInput {
                offset: pos as u64,
                needed: 0,
                available: self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn read_fixed(&mut self, n: usize) -> Result<&'a [u8]> {
        let available = self.remaining();
        if n > available {
            return Err(Error::TruncatedInput {
                offset: self.tell(),
                needed: n,
                available,
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_fixed(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Reads a presence byte that decides what follows it. Only 0 and 1 are
    /// accepted; plain data booleans are read as [`crate::model::Flag`].
    pub fn read_flag(&mut self) -> Result<bool> {
        let offset = self.tell();
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::UnsupportedVariant(format!(
                "flag byte {other} at offset {offset}, expected 0 or 1"
            ))),
        }
    }

    /// Reads a string prefixed with a one-byte length. The bytes are kept as
    /// stored, valid UTF-8 or not.
    pub fn read_var_string(&mut self) -> Result<SaveString> {
        let len = self.read_u8()? as usize;
        Ok(SaveString::from_bytes(self.read_fixed(len)?))
    }

    pub fn read_u16_vec(&mut self, n: usize) -> Result<Vec<u16>> {
        let mut out = Vec::with_capacity(n.min(self.remaining() / 2));
        for _ in 0..n {
            out.push(self.read_u16()?);
        }
        Ok(out)
    }
}
