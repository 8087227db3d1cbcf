//! PNG chunk records.
//!
//! On disk every chunk is laid out as
//!
//! ```text
//! length (u32 BE) | type (4 B) | data (length B) | crc (u32 BE)
//! ```
//!
//! where `crc` is CRC-32 (IEEE) over `type ++ data`.  All integers are
//! big-endian; there is no negotiation.

use byteorder::{BigEndian, WriteBytesExt};
use crc32fast::Hasher;
use std::fmt;
use std::io::{self, Write};

/// Bytes before a chunk's data: length + type.
pub const CHUNK_HEADER_SIZE: usize = 8;
/// Bytes after a chunk's data: the CRC.
pub const CHUNK_CRC_SIZE: usize = 4;

/// Four-byte chunk type tag (`IHDR`, `IDAT`, `tEXt`, ...).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkType(pub [u8; 4]);

impl ChunkType {
    pub const IHDR: ChunkType = ChunkType(*b"IHDR");
    pub const IDAT: ChunkType = ChunkType(*b"IDAT");
    pub const IEND: ChunkType = ChunkType(*b"IEND");
    pub const TEXT: ChunkType = ChunkType(*b"tEXt");
    pub const ZTXT: ChunkType = ChunkType(*b"zTXt");
    pub const ITXT: ChunkType = ChunkType(*b"iTXt");

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// `IEND` closes the stream.
    #[inline]
    pub fn is_terminal(self) -> bool {
        self == Self::IEND
    }

    /// One of the three human-readable metadata tags.
    #[inline]
    pub fn is_text(self) -> bool {
        matches!(self, Self::TEXT | Self::ZTXT | Self::ITXT)
    }

    /// Tag rendered as text; non-ASCII bytes are escaped.
    pub fn name(&self) -> String {
        self.0.escape_ascii().to_string()
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl fmt::Debug for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkType({})", self.name())
    }
}

/// CRC-32 over `type ++ data`.
pub fn chunk_crc(kind: ChunkType, data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(kind.as_bytes());
    hasher.update(data);
    hasher.finalize()
}

/// One parsed chunk.  `data` borrows from the buffer the stream was parsed
/// from, so a record is a fixed-size value regardless of payload length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Byte offset of the length field in the source buffer.
    pub offset: usize,
    pub length: u32,
    pub kind:   ChunkType,
    pub data:   &'a [u8],
    /// CRC as stored (or as rewritten by repair).
    pub crc:    u32,
}

impl<'a> Chunk<'a> {
    /// Recompute the checksum from `kind` and `data`.  Never looks at `crc`.
    #[inline]
    pub fn computed_crc(&self) -> u32 {
        chunk_crc(self.kind, self.data)
    }

    #[inline]
    pub fn crc_matches(&self) -> bool {
        self.crc == self.computed_crc()
    }

    /// Total bytes this chunk occupies on disk.
    #[inline]
    pub fn encoded_len(&self) -> usize {
        CHUNK_HEADER_SIZE + self.data.len() + CHUNK_CRC_SIZE
    }

    /// Write length, type, data and the *recomputed* CRC.
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<BigEndian>(self.length)?;
        writer.write_all(self.kind.as_bytes())?;
        writer.write_all(self.data)?;
        writer.write_u32::<BigEndian>(self.computed_crc())?;
        Ok(())
    }

    /// Same bytes as [`Chunk::write`], appended to an in-memory buffer.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.reserve(self.encoded_len());
        out.extend_from_slice(&self.length.to_be_bytes());
        out.extend_from_slice(self.kind.as_bytes());
        out.extend_from_slice(self.data);
        out.extend_from_slice(&self.computed_crc().to_be_bytes());
    }
}
