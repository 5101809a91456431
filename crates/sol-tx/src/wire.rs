//! Low-level pieces of the Solana wire format: compact-u16 length prefixes
//! and a bounds-checked reader used when decoding transactions.

use crate::error::TxError;

/// Encode a `u16` value in Solana's compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16 value from the front of `data`.
///
/// Returns `(value, bytes_consumed)`.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), TxError> {
    let mut value: u32 = 0;
    let mut shift = 0u32;
    let mut consumed = 0usize;

    loop {
        let Some(&byte) = data.get(consumed) else {
            return Err(TxError::Serialization(
                "unexpected end of data while decoding compact-u16".into(),
            ));
        };
        consumed += 1;

        value |= ((byte & 0x7f) as u32) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            break;
        }
        if consumed >= 3 {
            return Err(TxError::Serialization(
                "compact-u16 longer than 3 bytes".into(),
            ));
        }
    }

    if value > u16::MAX as u32 {
        return Err(TxError::Serialization("compact-u16 value overflow".into()));
    }

    Ok((value as u16, consumed))
}

/// Append a length prefix, refusing lengths that do not fit a compact-u16.
pub(crate) fn push_len(buf: &mut Vec<u8>, len: usize, what: &str) -> Result<(), TxError> {
    let len = u16::try_from(len)
        .map_err(|_| TxError::Serialization(format!("too many {what}: {len}")))?;
    buf.extend_from_slice(&encode_compact_u16(len));
    Ok(())
}

/// Cursor over an encoded transaction.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub(crate) fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, TxError> {
        let byte = self.peek_u8().ok_or_else(|| truncated("u8"))?;
        self.pos += 1;
        Ok(byte)
    }

    pub(crate) fn read_compact_u16(&mut self) -> Result<u16, TxError> {
        let (value, consumed) = decode_compact_u16(&self.data[self.pos.min(self.data.len())..])?;
        self.pos += consumed;
        Ok(value)
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], TxError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| truncated(&format!("{len} bytes")))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn read_array<const N: usize>(&mut self) -> Result<[u8; N], TxError> {
        let slice = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }
}

fn truncated(what: &str) -> TxError {
    TxError::Serialization(format!("unexpected end of data while reading {what}"))
}
