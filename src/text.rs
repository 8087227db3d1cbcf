//! Human-readable metadata chunks (`tEXt`, `zTXt`, `iTXt`).

use std::fmt;

use crate::chunk::ChunkType;
use crate::stream::ChunkStream;

/// Shown in place of a payload that is not valid UTF-8.
pub const BINARY_PLACEHOLDER: &str = "<binary>";

/// Decoded payload of a text chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextValue<'a> {
    Utf8(&'a str),
    /// Not valid UTF-8 (e.g. a compressed `zTXt` body).
    Binary,
}

impl<'a> TextValue<'a> {
    pub fn as_str(&self) -> Option<&'a str> {
        match *self {
            TextValue::Utf8(s) => Some(s),
            TextValue::Binary => None,
        }
    }
}

impl fmt::Display for TextValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Keyword and text are NUL-separated; keep the separator visible.
            TextValue::Utf8(s) => write!(f, "{}", s.escape_debug()),
            TextValue::Binary => f.write_str(BINARY_PLACEHOLDER),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunk<'a> {
    pub kind:  ChunkType,
    pub value: TextValue<'a>,
}

impl fmt::Display for TextChunk<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.value)
    }
}

/// Text chunks in stream order.  Decoding failures become
/// [`TextValue::Binary`]; nothing past `IEND` is considered.
pub fn extract_text<'a>(stream: &ChunkStream<'a>) -> Vec<TextChunk<'a>> {
    let mut out = Vec::new();
    for chunk in stream.chunks() {
        if chunk.kind.is_text() {
            let value = match std::str::from_utf8(chunk.data) {
                Ok(s) => TextValue::Utf8(s),
                Err(_) => TextValue::Binary,
            };
            out.push(TextChunk { kind: chunk.kind, value });
        }
        if chunk.kind.is_terminal() {
            break;
        }
    }
    out
}
