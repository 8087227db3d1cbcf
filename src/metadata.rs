//! Container-level metadata: EXIF tags and codec header fields.

use std::collections::BTreeMap;
use std::io::Cursor;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use exif::{In, Reader};
use tracing::debug;

use crate::chunk::ChunkType;
use crate::detect::ImageKind;
use crate::stream::ChunkStream;

const GAMA: ChunkType = ChunkType(*b"gAMA");
const PHYS: ChunkType = ChunkType(*b"pHYs");
const SRGB: ChunkType = ChunkType(*b"sRGB");
const ICCP: ChunkType = ChunkType(*b"iCCP");

const INCH_PER_METRE: f64 = 0.0254;

/// EXIF fields keyed by tag name, values rendered with their units.
///
/// Tags outside the primary IFD are prefixed with their IFD number
/// (`ifd1.XResolution`).  `None` when the container carries no EXIF block
/// or the block cannot be parsed.
pub fn read_exif(bytes: &[u8]) -> Option<BTreeMap<String, String>> {
    let exif = match Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return None,
        Err(e) => {
            debug!("no usable EXIF: {e}");
            return None;
        }
    };

    let mut out = BTreeMap::new();
    for field in exif.fields() {
        let key = if field.ifd_num == In::PRIMARY {
            field.tag.to_string()
        } else {
            format!("ifd{}.{}", field.ifd_num.index(), field.tag)
        };
        out.insert(key, field.display_value().with_unit(&exif).to_string());
    }
    Some(out)
}

/// Header fields the codec exposes for `kind`: gamma, resolution, colour
/// space hints and, for PNG, uncompressed text keywords.
pub fn codec_info(kind: ImageKind, bytes: &[u8]) -> BTreeMap<String, String> {
    let mut info = BTreeMap::new();
    match kind {
        ImageKind::Png  => png_info(bytes, &mut info),
        ImageKind::Jpeg => jpeg_info(bytes, &mut info),
        ImageKind::Gif  => {
            if let Some(version) = bytes.get(..6).and_then(|v| std::str::from_utf8(v).ok()) {
                info.insert("version".into(), version.to_string());
            }
        }
        ImageKind::Bmp  => bmp_info(bytes, &mut info),
        ImageKind::Webp => {}
    }
    info
}

fn png_info(bytes: &[u8], info: &mut BTreeMap<String, String>) {
    let Ok(stream) = ChunkStream::parse(bytes) else {
        return;
    };
    for chunk in stream.chunks() {
        let data = chunk.data;
        match chunk.kind {
            GAMA if data.len() == 4 => {
                let gamma = BigEndian::read_u32(data) as f64 / 100_000.0;
                info.insert("gamma".into(), gamma.to_string());
            }
            PHYS if data.len() == 9 => {
                let (x, y) = (BigEndian::read_u32(&data[0..4]), BigEndian::read_u32(&data[4..8]));
                if data[8] == 1 {
                    let (dx, dy) = (x as f64 * INCH_PER_METRE, y as f64 * INCH_PER_METRE);
                    info.insert("dpi".into(), format!("({dx:.2}, {dy:.2})"));
                } else {
                    info.insert("aspect".into(), format!("({x}, {y})"));
                }
            }
            SRGB if data.len() == 1 => {
                info.insert("srgb".into(), data[0].to_string());
            }
            ICCP => {
                let name = data.split(|&b| b == 0).next().unwrap_or_default();
                info.insert("icc_profile".into(), String::from_utf8_lossy(name).into_owned());
            }
            ChunkType::TEXT => {
                if let Some((key, text)) = split_keyword(data) {
                    info.insert(key, String::from_utf8_lossy(text).into_owned());
                }
            }
            ChunkType::ITXT => {
                // keyword \0 flag method language \0 translated \0 text
                if let Some((key, rest)) = split_keyword(data) {
                    if rest.first() == Some(&0) {
                        if let Some(text) = rest.get(2..).and_then(|r| r.splitn(3, |&b| b == 0).nth(2)) {
                            info.insert(key, String::from_utf8_lossy(text).into_owned());
                        }
                    }
                }
            }
            _ => {}
        }
        if chunk.kind.is_terminal() {
            break;
        }
    }
}

fn split_keyword(data: &[u8]) -> Option<(String, &[u8])> {
    let nul = data.iter().position(|&b| b == 0)?;
    let key = String::from_utf8_lossy(&data[..nul]).into_owned();
    Some((key, &data[nul + 1..]))
}

/// Walk marker segments up to start-of-scan.
fn jpeg_info(bytes: &[u8], info: &mut BTreeMap<String, String>) {
    let mut i = 2;
    while i + 4 <= bytes.len() && bytes[i] == 0xFF {
        let marker = bytes[i + 1];
        if marker == 0xFF {
            i += 1;
            continue;
        }
        if marker == 0xD9 || marker == 0xDA {
            break;
        }
        let len = BigEndian::read_u16(&bytes[i + 2..i + 4]) as usize;
        let Some(segment) = bytes.get(i + 4..i + 2 + len) else {
            break;
        };
        match marker {
            0xE0 if segment.len() >= 12 && segment.starts_with(b"JFIF\0") => {
                let (x, y) = (BigEndian::read_u16(&segment[8..10]), BigEndian::read_u16(&segment[10..12]));
                info.insert("jfif_version".into(), format!("({}, {})", segment[5], segment[6]));
                info.insert("jfif_unit".into(), segment[7].to_string());
                info.insert("jfif_density".into(), format!("({x}, {y})"));
                match segment[7] {
                    1 => {
                        info.insert("dpi".into(), format!("({x}, {y})"));
                    }
                    2 => {
                        let (dx, dy) = (x as f64 * 2.54, y as f64 * 2.54);
                        info.insert("dpi".into(), format!("({dx:.2}, {dy:.2})"));
                    }
                    _ => {}
                }
            }
            0xE1 if segment.starts_with(b"Exif\0\0") => {
                info.insert("exif".into(), format!("<{} bytes>", segment.len() - 6));
            }
            0xEE if segment.starts_with(b"Adobe") => {
                info.insert("adobe".into(), "true".into());
            }
            0xC2 => {
                info.insert("progressive".into(), "true".into());
            }
            _ => {}
        }
        i += 2 + len;
    }
}

/// `BITMAPINFOHEADER` and later carry pixels-per-metre at offsets 38 and 42.
fn bmp_info(bytes: &[u8], info: &mut BTreeMap<String, String>) {
    if bytes.len() < 46 || LittleEndian::read_u32(&bytes[14..18]) < 40 {
        return;
    }
    let x = LittleEndian::read_i32(&bytes[38..42]);
    let y = LittleEndian::read_i32(&bytes[42..46]);
    if x > 0 && y > 0 {
        let (dx, dy) = (x as f64 * INCH_PER_METRE, y as f64 * INCH_PER_METRE);
        info.insert("dpi".into(), format!("({dx:.2}, {dy:.2})"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::chunk_crc;
    use crate::stream::PNG_SIGNATURE;

    fn chunk(tag: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut v = (data.len() as u32).to_be_bytes().to_vec();
        v.extend_from_slice(tag);
        v.extend_from_slice(data);
        v.extend_from_slice(&chunk_crc(ChunkType(*tag), data).to_be_bytes());
        v
    }

    #[test]
    fn png_gamma_dpi_and_text() {
        let mut phys = 2835u32.to_be_bytes().to_vec();
        phys.extend_from_slice(&2835u32.to_be_bytes());
        phys.push(1);

        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend(chunk(b"gAMA", &45455u32.to_be_bytes()));
        bytes.extend(chunk(b"pHYs", &phys));
        bytes.extend(chunk(b"tEXt", b"Author\0someone"));
        bytes.extend(chunk(b"iTXt", b"Title\0\0\0en\0\0hi"));
        bytes.extend(chunk(b"IEND", &[]));
        bytes.extend(chunk(b"tEXt", b"After\0ignored"));

        let info = codec_info(ImageKind::Png, &bytes);
        assert_eq!(info["gamma"], "0.45455");
        assert_eq!(info["dpi"], "(72.01, 72.01)");
        assert_eq!(info["Author"], "someone");
        assert_eq!(info["Title"], "hi");
        assert!(!info.contains_key("After"));
    }

    #[test]
    fn jfif_density_in_dots_per_inch() {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        bytes.extend_from_slice(b"JFIF\0");
        bytes.extend_from_slice(&[1, 2, 1, 0, 96, 0, 96, 0, 0]);
        bytes.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]);

        let info = codec_info(ImageKind::Jpeg, &bytes);
        assert_eq!(info["jfif_version"], "(1, 2)");
        assert_eq!(info["dpi"], "(96, 96)");
        assert!(!info.contains_key("progressive"));
    }

    #[test]
    fn truncated_jpeg_segment_is_ignored() {
        let bytes = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x40, b'J'];
        assert!(codec_info(ImageKind::Jpeg, &bytes).is_empty());
    }

    #[test]
    fn no_exif_is_none() {
        assert_eq!(read_exif(b"GIF89a\x01\x00\x01\x00"), None);
        assert_eq!(read_exif(&[0xFF, 0xD8, 0xFF, 0xD9]), None);
    }
}
