//! PNG chunk stream: parse, repair, serialize.
//!
//! # Parsing
//! [`ChunkStream::parse`] requires the 8-byte PNG signature and then reads
//! chunk records front to back.  It never fails on damaged data: a header
//! or payload that runs past the end of the buffer ends the stream early and
//! is recorded as [`StreamEnd::Truncated`].  Parsing also stops right after
//! `IEND`; anything following it is counted in [`ChunkStream::trailing_len`]
//! but not parsed.
//!
//! # Repair
//! [`ChunkStream::repair`] recomputes the CRC of every chunk, whether or not
//! the stored one already matches, and reports whether anything changed.
//! Repairing a repaired stream always reports `changed == false`.
//!
//! # Serialization
//! [`ChunkStream::serialize`] writes the signature followed by every chunk
//! with its recomputed CRC, in parse order.  For a well-formed input with
//! valid checksums this reproduces the input up to and including `IEND`.

use byteorder::{BigEndian, ByteOrder};
use std::io::{self, Write};
use thiserror::Error;

use crate::chunk::{Chunk, ChunkType, CHUNK_CRC_SIZE, CHUNK_HEADER_SIZE};

/// `\x89PNG\r\n\x1a\n`
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Not a PNG stream: signature missing")]
    NotContainer,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// How parsing ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// An `IEND` chunk was read.
    Terminal,
    /// Input ran out exactly on a chunk boundary without `IEND`.
    Exhausted,
    /// A chunk header or payload at `offset` ran past the end of the input.
    Truncated { offset: usize },
}

/// Parsed chunk sequence.  Chunks are kept in a flat vector in file order
/// and addressed by position; they are never reordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkStream<'a> {
    chunks:   Vec<Chunk<'a>>,
    end:      StreamEnd,
    trailing: usize,
}

/// Outcome of [`ChunkStream::repair`].
#[derive(Debug, Clone)]
pub struct Repair<'a> {
    /// Stream with every stored CRC replaced by the recomputed one.
    pub stream:  ChunkStream<'a>,
    /// True iff at least one stored CRC differed.
    pub changed: bool,
    /// Positions of the chunks whose CRC was rewritten.
    pub fixed:   Vec<usize>,
}

/// Quick check for the PNG signature.
#[inline]
pub fn has_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_SIGNATURE)
}

impl<'a> ChunkStream<'a> {
    /// Parse `bytes` into a chunk stream.
    ///
    /// Returns `Err(StreamError::NotContainer)` only when the signature is
    /// missing.  Truncation is reported through [`ChunkStream::end`].
    pub fn parse(bytes: &'a [u8]) -> Result<Self, StreamError> {
        if !has_signature(bytes) {
            return Err(StreamError::NotContainer);
        }

        let mut chunks = Vec::new();
        let mut pos = PNG_SIGNATURE.len();

        let end = loop {
            if pos >= bytes.len() {
                break StreamEnd::Exhausted;
            }
            if bytes.len() - pos < CHUNK_HEADER_SIZE {
                break StreamEnd::Truncated { offset: pos };
            }

            let length = BigEndian::read_u32(&bytes[pos..pos + 4]);
            let mut tag = [0u8; 4];
            tag.copy_from_slice(&bytes[pos + 4..pos + CHUNK_HEADER_SIZE]);
            let kind = ChunkType(tag);

            let data_start = pos + CHUNK_HEADER_SIZE;
            let available = bytes.len() - data_start;
            let needed = (length as usize).checked_add(CHUNK_CRC_SIZE);
            if needed.map_or(true, |n| n > available) {
                break StreamEnd::Truncated { offset: pos };
            }

            let data_end = data_start + length as usize;
            let crc = BigEndian::read_u32(&bytes[data_end..data_end + CHUNK_CRC_SIZE]);
            chunks.push(Chunk {
                offset: pos,
                length,
                kind,
                data: &bytes[data_start..data_end],
                crc,
            });
            pos = data_end + CHUNK_CRC_SIZE;

            if kind.is_terminal() {
                break StreamEnd::Terminal;
            }
        };

        let trailing = match end {
            StreamEnd::Terminal => bytes.len() - pos,
            _ => 0,
        };

        Ok(Self { chunks, end, trailing })
    }

    #[inline]
    pub fn chunks(&self) -> &[Chunk<'a>] {
        &self.chunks
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Chunk<'a>> {
        self.chunks.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[inline]
    pub fn end(&self) -> StreamEnd {
        self.end
    }

    #[inline]
    pub fn is_truncated(&self) -> bool {
        matches!(self.end, StreamEnd::Truncated { .. })
    }

    /// Bytes left over after `IEND`.  Always 0 unless the stream ended
    /// on `IEND`.
    #[inline]
    pub fn trailing_len(&self) -> usize {
        self.trailing
    }

    /// Chunks whose stored CRC does not match their content.
    pub fn mismatched(&self) -> impl Iterator<Item = (usize, &Chunk<'a>)> {
        self.chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.crc_matches())
    }

    /// Recompute every chunk's CRC.
    pub fn repair(&self) -> Repair<'a> {
        let mut fixed = Vec::new();
        let chunks = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let crc = chunk.computed_crc();
                if crc != chunk.crc {
                    fixed.push(i);
                }
                Chunk { crc, ..*chunk }
            })
            .collect();

        Repair {
            stream: ChunkStream {
                chunks,
                end:      self.end,
                trailing: self.trailing,
            },
            changed: !fixed.is_empty(),
            fixed,
        }
    }

    /// Exact size of [`ChunkStream::serialize`]'s output.
    pub fn encoded_len(&self) -> usize {
        PNG_SIGNATURE.len() + self.chunks.iter().map(Chunk::encoded_len).sum::<usize>()
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&PNG_SIGNATURE)?;
        for chunk in &self.chunks {
            chunk.write(&mut writer)?;
        }
        Ok(())
    }

    /// Signature followed by every chunk with a recomputed CRC.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&PNG_SIGNATURE);
        for chunk in &self.chunks {
            chunk.encode_into(&mut out);
        }
        out
    }
}

/// `crc32(type ++ data)` for a parsed chunk.
#[inline]
pub fn recompute_checksum(chunk: &Chunk<'_>) -> u32 {
    chunk.computed_crc()
}

/// Parse and repair `bytes` in one step, returning the rewritten bytes and
/// whether any checksum changed.
pub fn repair_bytes(bytes: &[u8]) -> Result<(Vec<u8>, bool), StreamError> {
    let stream = ChunkStream::parse(bytes)?;
    let repair = stream.repair();
    Ok((repair.stream.serialize(), repair.changed))
}
