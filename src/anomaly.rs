//! Pure black / pure white pixel counter.

use image::RgbaImage;

/// Count `(0,0,0)` and `(255,255,255)` entries.
pub fn count_anomalies<I>(pixels: I) -> usize
where
    I: IntoIterator<Item = [u8; 3]>,
{
    pixels
        .into_iter()
        .filter(|p| matches!(p, [0, 0, 0] | [255, 255, 255]))
        .count()
}

/// [`count_anomalies`] over the colour channels of an RGBA image; alpha is
/// ignored.
pub fn count_image_anomalies(img: &RgbaImage) -> usize {
    count_anomalies(img.pixels().map(|p| [p[0], p[1], p[2]]))
}
