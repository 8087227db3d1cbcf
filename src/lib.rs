//! # stegsift
//!
//! Triage of image files for hidden or damaged data:
//!
//! - [`stream`]: parse a PNG chunk stream, recompute every CRC, write it back.
//! - [`text`]: pull `tEXt` / `zTXt` / `iTXt` payloads out of a parsed stream.
//! - [`decompose`]: turn a decoded image into 27 fixed channel, XOR and
//!   bit-plane views.
//! - [`carve`]: read the low bits of channel values and look for embedded
//!   file signatures.
//! - [`anomaly`]: count pure black and pure white pixels.
//! - [`metadata`]: EXIF tags and codec header fields.
//!
//! [`batch`] ties these together over a directory of files; the core modules
//! above work purely on in-memory buffers.
//!
//! ```no_run
//! use stegsift::ChunkStream;
//!
//! let bytes = std::fs::read("photo.png")?;
//! let stream = ChunkStream::parse(&bytes)?;
//! let repair = stream.repair();
//! if repair.changed {
//!     std::fs::write("photo.png", repair.stream.serialize())?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod anomaly;
pub mod batch;
pub mod carve;
pub mod chunk;
pub mod config;
pub mod decompose;
pub mod detect;
pub mod metadata;
pub mod report;
pub mod stream;
pub mod text;

pub use anomaly::{count_anomalies, count_image_anomalies};
pub use carve::{carve, extract_low_bits, to_hex, BitString, CarveResult, Signature, SIGNATURES};
pub use chunk::{Chunk, ChunkType};
pub use config::ScanOptions;
pub use decompose::{decompose, Channel, DerivedImage, DerivedPixels, Mode, MODES};
pub use detect::{detect_format, ImageKind};
pub use metadata::{codec_info, read_exif};
pub use stream::{ChunkStream, Repair, StreamEnd, StreamError};
pub use text::{extract_text, TextChunk, TextValue};
