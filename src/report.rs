//! Per-file metadata report.
//!
//! Written as `metadata.txt` (`key: value` blocks separated by blank lines)
//! and optionally as `metadata.json`.  PNG-only fields are `None` for other
//! formats, as is `exif` when the file has no EXIF block; `None` fields are
//! left out of both renderings.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::carve::CarveResult;
use crate::detect::ImageKind;
use crate::text::TextChunk;

#[derive(Debug, Clone, Serialize)]
pub struct MetadataReport {
    pub format:              ImageKind,
    /// Decoded colour type, e.g. `Rgba8`.
    pub mode:                String,
    pub size:                (u32, u32),
    pub file_size:           u64,
    /// BLAKE3 of the file as analysed (after repair).
    pub blake3:              String,
    /// Codec header fields (gamma, dpi, text keywords, ...).
    pub info:                BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub png_repair:          Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub png_chunks:          Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub png_trailing_bytes:  Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exif:                Option<BTreeMap<String, String>>,
    pub pixel_anomaly_count: usize,
    pub carving:             Vec<String>,
    pub analyzed_at:         DateTime<Utc>,
}

impl MetadataReport {
    pub fn new(format: ImageKind, mode: String, size: (u32, u32), file_bytes: &[u8]) -> Self {
        Self {
            format,
            mode,
            size,
            file_size:           file_bytes.len() as u64,
            blake3:              blake3::hash(file_bytes).to_hex().to_string(),
            info:                BTreeMap::new(),
            png_repair:          None,
            png_chunks:          None,
            png_trailing_bytes:  None,
            exif:                None,
            pixel_anomaly_count: 0,
            carving:             Vec::new(),
            analyzed_at:         Utc::now(),
        }
    }

    pub fn with_png_text(mut self, chunks: &[TextChunk<'_>]) -> Self {
        self.png_chunks = Some(chunks.iter().map(ToString::to_string).collect());
        self
    }

    pub fn with_carving(mut self, hits: &[CarveResult]) -> Self {
        self.carving = hits.iter().map(ToString::to_string).collect();
        self
    }

    /// `key: value` blocks, each followed by a blank line.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let mut field = |key: &str, value: String| {
            let _ = write!(out, "{key}: {value}\n\n");
        };

        field("format", self.format.label().to_string());
        field("mode", self.mode.clone());
        field("size", format!("({}, {})", self.size.0, self.size.1));
        field("file_size", self.file_size.to_string());
        field("blake3", self.blake3.clone());
        field("info", format!("{:?}", self.info));
        if let Some(repaired) = self.png_repair {
            field("png_repair", repaired.to_string());
        }
        if let Some(chunks) = &self.png_chunks {
            field("png_chunks", format!("{chunks:?}"));
        }
        if let Some(trailing) = self.png_trailing_bytes {
            field("png_trailing_bytes", trailing.to_string());
        }
        if let Some(exif) = &self.exif {
            field("exif", format!("{exif:?}"));
        }
        field("pixel_anomaly_count", self.pixel_anomaly_count.to_string());
        field("carving", format!("{:?}", self.carving));
        field("analyzed_at", self.analyzed_at.to_rfc3339());
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
