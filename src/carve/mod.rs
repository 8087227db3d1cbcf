//! LSB stream extraction and file-signature carving.
//!
//! The pipeline is `values -> bit string -> hex string -> signature hits`:
//!
//! 1. [`extract_low_bits`] takes the `n` lowest bits of every value, least
//!    significant first, and concatenates them into a `'0'`/`'1'` string.
//! 2. [`to_hex`] reads that whole string as one big unsigned integer (first
//!    character = most significant bit) and prints it in lowercase hex with
//!    no padding.  Leading zero bits disappear, so hex positions are not
//!    byte-aligned with the bit stream.  Existing reports depend on these
//!    offsets, so the behaviour is kept as-is.
//! 3. [`carve`] looks for each entry of [`SIGNATURES`], in table order, and
//!    reports the hex-character index of its first occurrence.

use std::fmt;
use std::iter;
use thiserror::Error;

/// A known file header, as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub name:        &'static str,
    pub hex_pattern: &'static str,
}

/// Signatures searched by [`carve`], in reporting order.
pub const SIGNATURES: [Signature; 5] = [
    Signature { name: "PNG", hex_pattern: "89504e470d0a1a0a" },
    Signature { name: "JPG", hex_pattern: "ffd8ff" },
    Signature { name: "ZIP", hex_pattern: "504b0304" },
    Signature { name: "GIF", hex_pattern: "47494638" },
    Signature { name: "PDF", hex_pattern: "25504446" },
];

/// One signature hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarveResult {
    pub signature_name: &'static str,
    /// Index into the hex string, not a byte offset.
    pub hex_offset:     usize,
}

impl fmt::Display for CarveResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Found {} signature at offset hex index {}",
            self.signature_name, self.hex_offset
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid bit character {found:?} at position {position}")]
pub struct BitStringError {
    pub position: usize,
    pub found:    char,
}

/// A string made only of `'0'` and `'1'`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitString(String);

impl BitString {
    pub fn parse(s: &str) -> Result<Self, BitStringError> {
        match s.char_indices().find(|&(_, c)| c != '0' && c != '1') {
            Some((position, found)) => Err(BitStringError { position, found }),
            None => Ok(BitString(s.to_string())),
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Emit bits `0..bits` of every value, in that order.  `bits` is clamped
/// to 8.  The result has exactly `values.len() * bits` characters.
pub fn extract_low_bits(values: &[u8], bits: u8) -> BitString {
    let bits = bits.min(8);
    let mut out = String::with_capacity(values.len() * bits as usize);
    for &v in values {
        for b in 0..bits {
            out.push(if (v >> b) & 1 == 1 { '1' } else { '0' });
        }
    }
    BitString(out)
}

/// Render the bit string as one unpadded hex number.  An empty or all-zero
/// string renders as `"0"`.
pub fn to_hex(bits: &BitString) -> String {
    let significant = bits.as_str().trim_start_matches('0');
    if significant.is_empty() {
        return "0".to_string();
    }

    // Left-pad to a whole number of bytes so the hex crate can do the rest.
    let pad = (8 - significant.len() % 8) % 8;
    let mut bytes = Vec::with_capacity((significant.len() + pad) / 8);
    let mut acc = 0u8;
    let mut filled = 0;
    for c in iter::repeat(b'0').take(pad).chain(significant.bytes()) {
        acc = (acc << 1) | (c == b'1') as u8;
        filled += 1;
        if filled == 8 {
            bytes.push(acc);
            acc = 0;
            filled = 0;
        }
    }

    // The first byte holds the leading 1 bit, so at most its high nibble
    // is zero.
    let encoded = hex::encode(bytes);
    match encoded.strip_prefix('0') {
        Some(rest) => rest.to_string(),
        None => encoded,
    }
}

/// First occurrence of every known signature in `hex`, in table order.
/// Signatures that do not occur are left out.
pub fn carve(hex: &str) -> Vec<CarveResult> {
    SIGNATURES
        .iter()
        .filter_map(|sig| {
            hex.find(sig.hex_pattern).map(|hex_offset| CarveResult {
                signature_name: sig.name,
                hex_offset,
            })
        })
        .collect()
}

/// Low bits of `values` straight through to carve results.
pub fn carve_values(values: &[u8], bits: u8) -> Vec<CarveResult> {
    carve(&to_hex(&extract_low_bits(values, bits)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(s: &str) -> BitString {
        BitString::parse(s).unwrap()
    }

    #[test]
    fn hex_drops_leading_zero_bits() {
        assert_eq!(to_hex(&bits("00001111")), "f");
        assert_eq!(to_hex(&bits("000100000000")), "100");
        assert_eq!(to_hex(&bits("11111111")), "ff");
        assert_eq!(to_hex(&bits("1")), "1");
    }

    #[test]
    fn hex_of_nothing_is_zero() {
        assert_eq!(to_hex(&BitString::default()), "0");
        assert_eq!(to_hex(&bits("0000")), "0");
    }

    #[test]
    fn parse_rejects_other_characters() {
        assert_eq!(
            BitString::parse("01a1"),
            Err(BitStringError { position: 2, found: 'a' })
        );
    }
}
