//! Image format detection by magic bytes.

use image::ImageFormat;
use serde::Serialize;

use crate::stream::has_signature;

/// Raster formats the batch scanner accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Webp,
}

impl ImageKind {
    /// Canonical file extension.
    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Png  => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Gif  => "gif",
            ImageKind::Bmp  => "bmp",
            ImageKind::Webp => "webp",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ImageKind::Png  => "PNG",
            ImageKind::Jpeg => "JPEG",
            ImageKind::Gif  => "GIF",
            ImageKind::Bmp  => "BMP",
            ImageKind::Webp => "WEBP",
        }
    }

    /// Codec format to decode with.
    pub fn image_format(self) -> ImageFormat {
        match self {
            ImageKind::Png  => ImageFormat::Png,
            ImageKind::Jpeg => ImageFormat::Jpeg,
            ImageKind::Gif  => ImageFormat::Gif,
            ImageKind::Bmp  => ImageFormat::Bmp,
            ImageKind::Webp => ImageFormat::WebP,
        }
    }

    /// Whether `ext` (without the dot, any case) is already the canonical
    /// extension.  `.jpeg` is not: it gets renamed to `.jpg`.
    pub fn matches_extension(self, ext: &str) -> bool {
        ext.eq_ignore_ascii_case(self.extension())
    }
}

/// Sniff the format from the first bytes of a file.  `None` for anything
/// that is not one of the supported raster formats.
pub fn detect_format(data: &[u8]) -> Option<ImageKind> {
    if has_signature(data) {
        return Some(ImageKind::Png);
    }
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(ImageKind::Jpeg);
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some(ImageKind::Gif);
    }
    if data.len() >= 14 && data.starts_with(b"BM") {
        return Some(ImageKind::Bmp);
    }
    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return Some(ImageKind::Webp);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_known_headers() {
        assert_eq!(detect_format(b"\x89PNG\r\n\x1a\n...."), Some(ImageKind::Png));
        assert_eq!(detect_format(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageKind::Jpeg));
        assert_eq!(detect_format(b"GIF89a\x01\x00"), Some(ImageKind::Gif));
        assert_eq!(detect_format(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageKind::Webp));
        assert_eq!(detect_format(b"BM\0\0\0\0\0\0\0\0\0\0\0\0"), Some(ImageKind::Bmp));
        assert_eq!(detect_format(b"%PDF-1.7"), None);
        assert_eq!(detect_format(b""), None);
    }

    #[test]
    fn only_the_canonical_extension_matches() {
        assert!(ImageKind::Jpeg.matches_extension("jpg"));
        assert!(ImageKind::Jpeg.matches_extension("JPG"));
        assert!(!ImageKind::Jpeg.matches_extension("jpeg"));
        assert!(!ImageKind::Jpeg.matches_extension("JPEG"));
        assert!(!ImageKind::Png.matches_extension("jpg"));
        assert!(!ImageKind::Png.matches_extension(""));
    }
}
