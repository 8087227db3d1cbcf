//! Batch scan configuration.

use std::path::PathBuf;

use crate::decompose::Channel;

/// Default bits taken from each channel value for carving.
pub const DEFAULT_LSB_BITS: u8 = 1;
/// Name of the output directory created inside the input directory.
pub const DEFAULT_OUTPUT_DIR: &str = "stego_output";

// ── ScanOptions ───────────────────────────────────────────────────────────────

/// Configuration for [`crate::batch::scan_dir`] and
/// [`crate::batch::process_file`].
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Where `<stem>_output/` directories go.  `None` means
    /// `<input>/stego_output`.
    pub output_dir:         Option<PathBuf>,
    /// Low bits per channel value fed to the carver (1..=8).
    pub lsb_bits:           u8,
    /// Channel whose values are carved.
    pub carve_channel:      Channel,
    /// Rename files whose extension disagrees with their content.
    pub rename_mismatched:  bool,
    /// Delete files that are not a supported image.  Off by default.
    pub remove_unsupported: bool,
    /// Also write `metadata.json`.
    pub write_json:         bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            output_dir:         None,
            lsb_bits:           DEFAULT_LSB_BITS,
            carve_channel:      Channel::Red,
            rename_mismatched:  true,
            remove_unsupported: false,
            write_json:         false,
        }
    }
}

impl ScanOptions {
    /// Output root for a given input directory.
    pub fn output_root(&self, input_dir: &std::path::Path) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| input_dir.join(DEFAULT_OUTPUT_DIR))
    }
}
