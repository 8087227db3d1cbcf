//! Batch driver: walks a directory and produces per-file result folders.
//!
//! For every regular file directly inside the input directory:
//!
//! 1. Sniff the format; skip (or, if asked, delete) anything that is not a
//!    supported raster image.
//! 2. Fix the extension if it disagrees with the content.
//! 3. PNG only: keep a one-time `.bak`, repair chunk CRCs, and replace the
//!    file only if something changed.
//! 4. Decode, then write `original.<ext>`, the 27 derived views,
//!    `metadata.txt` (including EXIF and codec header fields) and optionally `metadata.json` into
//!    `<output>/<stem>_output/`.
//!
//! A failure on one file is logged and counted; the batch moves on.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::anomaly::count_image_anomalies;
use crate::carve::carve_values;
use crate::config::ScanOptions;
use crate::decompose::{decompose_each, DerivedImage, DerivedPixels};
use crate::detect::{detect_format, ImageKind};
use crate::metadata::{codec_info, read_exif};
use crate::report::MetadataReport;
use crate::stream::{self, ChunkStream, StreamError};
use crate::text::extract_text;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Report encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Not a supported image: {0}")]
    Unsupported(PathBuf),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// What happened to one processed file.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    /// Path of the input after any rename.
    pub path:       PathBuf,
    pub kind:       ImageKind,
    pub output_dir: PathBuf,
    /// `Some(changed)` for PNG inputs.
    pub repaired:   Option<bool>,
    pub carve_hits: usize,
}

/// Counters for a whole batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed:    usize,
    pub skipped:   usize,
    pub removed:   usize,
}

// ── Directory scan ───────────────────────────────────────────────────────────

/// Process every regular file directly inside `dir`, in file-name order.
pub fn scan_dir(dir: &Path, opts: &ScanOptions) -> Result<BatchSummary, BatchError> {
    if !dir.is_dir() {
        return Err(BatchError::NotADirectory(dir.to_path_buf()));
    }
    let out_root = opts.output_root(dir);
    fs::create_dir_all(&out_root)?;

    let mut summary = BatchSummary::default();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            // The input directory itself could not be read.
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                error!("failed to read directory entry: {e}");
                summary.failed += 1;
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || is_backup(path) {
            continue;
        }

        let head = match read_head(path) {
            Ok(head) => head,
            Err(e) => {
                error!(file = %path.display(), "failed to read: {e}");
                summary.failed += 1;
                continue;
            }
        };
        if detect_format(&head).is_none() {
            if opts.remove_unsupported {
                match fs::remove_file(path) {
                    Ok(()) => {
                        warn!(file = %path.display(), "removed: not a supported image");
                        summary.removed += 1;
                    }
                    Err(e) => {
                        warn!(file = %path.display(), "could not remove unsupported file: {e}");
                        summary.skipped += 1;
                    }
                }
            } else {
                warn!(file = %path.display(), "skipped: not a supported image");
                summary.skipped += 1;
            }
            continue;
        }

        match process_file(path, &out_root, opts) {
            Ok(outcome) => {
                info!(
                    file = %outcome.path.display(),
                    kind = outcome.kind.label(),
                    repaired = ?outcome.repaired,
                    carve_hits = outcome.carve_hits,
                    "done"
                );
                summary.processed += 1;
            }
            Err(e) => {
                error!(file = %path.display(), "failed: {e}");
                summary.failed += 1;
            }
        }
    }

    info!(
        processed = summary.processed,
        failed = summary.failed,
        skipped = summary.skipped,
        removed = summary.removed,
        "batch finished"
    );
    Ok(summary)
}

// ── Single file ──────────────────────────────────────────────────────────────

/// Analyse one image and write its results under `out_root`.
pub fn process_file(
    path:     &Path,
    out_root: &Path,
    opts:     &ScanOptions,
) -> Result<FileOutcome, BatchError> {
    let mut bytes = fs::read(path)?;
    let kind = detect_format(&bytes).ok_or_else(|| BatchError::Unsupported(path.to_path_buf()))?;
    info!(file = %path.display(), kind = kind.label(), "processing");

    let path = if opts.rename_mismatched {
        fix_extension(path, kind)?
    } else {
        path.to_path_buf()
    };

    let mut repaired = None;
    if kind == ImageKind::Png {
        backup_once(&path)?;
        if let Some((fixed, changed)) = repair_png(&path, &bytes)? {
            if changed {
                info!(file = %path.display(), "chunk checksums repaired");
                bytes = fixed;
            }
            repaired = Some(changed);
        }
    }

    let decoded = image::load_from_memory_with_format(&bytes, kind.image_format())?;
    let mode = format!("{:?}", decoded.color());
    let rgba: RgbaImage = decoded.to_rgba8();
    drop(decoded);

    let output_dir = out_root.join(format!("{}_output", file_stem(&path)));
    fs::create_dir_all(&output_dir)?;
    fs::copy(&path, output_dir.join(format!("original.{}", kind.extension())))?;

    decompose_each(&rgba, |view| write_view(&output_dir, &view))?;
    debug!(dir = %output_dir.display(), "derived views written");

    let mut report = MetadataReport::new(kind, mode, rgba.dimensions(), &bytes);
    report.png_repair = repaired;
    report.info = codec_info(kind, &bytes);

    // Capability query: only a PNG has a chunk stream to read text from.
    if let Ok(stream) = ChunkStream::parse(&bytes) {
        if stream.is_truncated() {
            warn!(file = %path.display(), end = ?stream.end(), "chunk stream truncated");
        }
        if stream.trailing_len() > 0 {
            warn!(file = %path.display(), bytes = stream.trailing_len(), "data after IEND");
        }
        report.png_trailing_bytes = Some(stream.trailing_len());
        report = report.with_png_text(&extract_text(&stream));
    }

    report.exif = read_exif(&bytes);
    report.pixel_anomaly_count = count_image_anomalies(&rgba);

    let hits = carve_values(&opts.carve_channel.values(&rgba), opts.lsb_bits);
    for hit in &hits {
        info!(file = %path.display(), "{hit}");
    }
    report = report.with_carving(&hits);

    fs::write(output_dir.join("metadata.txt"), report.to_text())?;
    if opts.write_json {
        fs::write(output_dir.join("metadata.json"), report.to_json()?)?;
    }

    Ok(FileOutcome {
        path,
        kind,
        output_dir,
        repaired,
        carve_hits: hits.len(),
    })
}

// ── PNG repair on disk ───────────────────────────────────────────────────────

/// Write the repaired stream to `<stem>_fixed.<ext>`, then either move it
/// over `path` (something changed) or delete it.
///
/// Returns `None` when `bytes` is not a PNG stream.
pub fn repair_png(path: &Path, bytes: &[u8]) -> Result<Option<(Vec<u8>, bool)>, BatchError> {
    let (fixed, changed) = match stream::repair_bytes(bytes) {
        Ok(r) => r,
        Err(StreamError::NotContainer) => return Ok(None),
        Err(StreamError::Io(e)) => return Err(e.into()),
    };

    let fixed_path = sibling_with_suffix(path, "_fixed");
    fs::write(&fixed_path, &fixed)?;
    if changed {
        fs::rename(&fixed_path, path)?;
    } else {
        fs::remove_file(&fixed_path)?;
    }
    Ok(Some((fixed, changed)))
}

/// Copy `path` to `<name>.bak` unless that backup already exists.
pub fn backup_once(path: &Path) -> io::Result<PathBuf> {
    let bak = backup_path(path);
    if !bak.exists() {
        fs::copy(path, &bak)?;
        debug!(backup = %bak.display(), "backup written");
    }
    Ok(bak)
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}

fn is_backup(path: &Path) -> bool {
    path.extension().map_or(false, |e| e == "bak")
}

// ── Renaming ─────────────────────────────────────────────────────────────────

/// Rename `path` to carry `kind`'s canonical extension.  Collisions get a
/// `_1`, `_2`, ... suffix on the stem.  Returns the (possibly new) path.
pub fn fix_extension(path: &Path, kind: ImageKind) -> io::Result<PathBuf> {
    let current = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if kind.matches_extension(current) {
        return Ok(path.to_path_buf());
    }

    let target = path.with_extension(kind.extension());
    let stem = file_stem(&target);
    let mut candidate = target.clone();
    let mut i = 1;
    while candidate.exists() {
        candidate = target.with_file_name(format!("{stem}_{i}.{}", kind.extension()));
        i += 1;
    }
    fs::rename(path, &candidate)?;
    info!(from = %path.display(), to = %candidate.display(), "extension corrected");
    Ok(candidate)
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let name = match path.extension() {
        Some(ext) => format!("{}{suffix}.{}", file_stem(path), ext.to_string_lossy()),
        None => format!("{}{suffix}", file_stem(path)),
    };
    path.with_file_name(name)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ── Output helpers ───────────────────────────────────────────────────────────

fn write_view(dir: &Path, view: &DerivedImage) -> Result<(), BatchError> {
    let path = dir.join(view.file_name());
    match &view.pixels {
        DerivedPixels::Rgba(img) => img.save_with_format(&path, ImageFormat::Png)?,
        DerivedPixels::Rgb(img)  => img.save_with_format(&path, ImageFormat::Png)?,
        DerivedPixels::Luma(img) => img.save_with_format(&path, ImageFormat::Png)?,
    }
    Ok(())
}

/// Enough bytes to sniff the format.
fn read_head(path: &Path) -> io::Result<Vec<u8>> {
    use std::io::Read;

    let mut head = Vec::with_capacity(16);
    fs::File::open(path)?.take(16).read_to_end(&mut head)?;
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_and_fixed_names() {
        let p = Path::new("/tmp/x/pic.png");
        assert_eq!(backup_path(p), Path::new("/tmp/x/pic.png.bak"));
        assert_eq!(sibling_with_suffix(p, "_fixed"), Path::new("/tmp/x/pic_fixed.png"));
        assert!(is_backup(Path::new("pic.png.bak")));
        assert!(!is_backup(Path::new("pic.png")));
    }
}
