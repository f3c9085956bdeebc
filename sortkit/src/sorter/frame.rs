//! Spill file record framing.
//!
//! A spill file is a plain sequence of frames:
//!
//! ```text
//! [len: u32 LE][payload: len bytes][crc32: u32 LE]
//! ```
//!
//! The checksum covers the length and the payload. A file that ends exactly
//! on a frame boundary is complete; anything else is a torn frame.

use std::io::{ErrorKind, Read, Write};

use crate::sorter::SorterError;

/// Size of the length prefix.
pub const LEN_SIZE: usize = 4;

/// Size of the trailing checksum.
pub const CHECKSUM_SIZE: usize = 4;

fn checksum(header: &[u8; LEN_SIZE], payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(header);
    hasher.update(payload);
    hasher.finalize()
}

/// Append one frame holding `payload`.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), SorterError> {
    let len =
        u32::try_from(payload.len()).map_err(|_| SorterError::RecordTooLarge(payload.len()))?;
    let header = len.to_le_bytes();
    writer.write_all(&header)?;
    writer.write_all(payload)?;
    writer.write_all(&checksum(&header, payload).to_le_bytes())?;
    Ok(())
}

/// Read the next frame's payload, or `None` at a clean end of file.
pub fn read_frame<Rd: Read>(reader: &mut Rd) -> Result<Option<Vec<u8>>, SorterError> {
    let mut header = [0u8; LEN_SIZE];
    if !fill_or_eof(reader, &mut header)? {
        return Ok(None);
    }
    let len = u32::from_le_bytes(header);

    // Bounded by what the file actually holds, not by the claimed length.
    let mut payload = Vec::new();
    reader
        .by_ref()
        .take(u64::from(len))
        .read_to_end(&mut payload)?;
    if payload.len() != len as usize {
        return Err(SorterError::CorruptFrame);
    }

    let mut trailer = [0u8; CHECKSUM_SIZE];
    reader.read_exact(&mut trailer).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            SorterError::CorruptFrame
        } else {
            SorterError::Io(e)
        }
    })?;

    let expected = u32::from_le_bytes(trailer);
    let actual = checksum(&header, &payload);
    if expected != actual {
        return Err(SorterError::ChecksumMismatch { expected, actual });
    }
    Ok(Some(payload))
}

/// Fill `buf` completely. Returns `false` if the reader was already at end
/// of file, and an error if it ended part way.
fn fill_or_eof<Rd: Read>(reader: &mut Rd, buf: &mut [u8]) -> Result<bool, SorterError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    match filled {
        0 => Ok(false),
        n if n == buf.len() => Ok(true),
        _ => Err(SorterError::CorruptFrame),
    }
}
