//! Channel and bit-plane decomposition.
//!
//! A decoded RGBA image is turned into a fixed sequence of 27 diagnostic
//! views.  The sequence index and name of every view are stable, since
//! output files are named `NN_<name>.png` from them:
//!
//! | #     | Views |
//! |-------|-------|
//! | 1     | `RGB` (composite, unchanged) |
//! | 2     | `Grayscale` (ITU-R 601-2 luma) |
//! | 3-6   | `Red`, `Green`, `Blue`, `Alpha` |
//! | 7     | `Negative` |
//! | 8-12  | `Shuffle_BGR`, `Shuffle_GRB`, `Shuffle_GBR`, `Shuffle_BRG`, `Shuffle_RBG` |
//! | 13-15 | `XOR_RB`, `XOR_RG`, `XOR_GB` |
//! | 16-27 | `LSB{1..4}_{R,G,B}`, bit-major |
//!
//! Every view depends only on the shared source buffer, which is never
//! written to, so the views can be rendered independently and in any order.
//! [`decompose_each`] renders one view at a time so a caller can persist
//! and drop it before the next is produced.

use image::{GrayImage, Luma, Rgb, RgbImage, RgbaImage};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of views produced for every image.
pub const MODE_COUNT: usize = 27;

/// One colour channel of an RGBA pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
    Alpha,
}

impl Channel {
    /// Position within an RGBA pixel.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Channel::Red   => 0,
            Channel::Green => 1,
            Channel::Blue  => 2,
            Channel::Alpha => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Red   => "Red",
            Channel::Green => "Green",
            Channel::Blue  => "Blue",
            Channel::Alpha => "Alpha",
        }
    }

    pub fn letter(self) -> char {
        match self {
            Channel::Red   => 'R',
            Channel::Green => 'G',
            Channel::Blue  => 'B',
            Channel::Alpha => 'A',
        }
    }

    /// Every value of this channel in row-major order.
    pub fn values(self, src: &RgbaImage) -> Vec<u8> {
        let i = self.index();
        src.pixels().map(|p| p.0[i]).collect()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown channel '{0}' (expected r, g, b or a)")]
pub struct ParseChannelError(pub String);

impl FromStr for Channel {
    type Err = ParseChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "r" | "red"   => Ok(Channel::Red),
            "g" | "green" => Ok(Channel::Green),
            "b" | "blue"  => Ok(Channel::Blue),
            "a" | "alpha" => Ok(Channel::Alpha),
            _             => Err(ParseChannelError(s.to_string())),
        }
    }
}

use Channel::{Blue as B, Green as G, Red as R};

/// One of the 27 fixed views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The source image as-is.
    Composite,
    Grayscale,
    /// A single channel as a grayscale image.
    Isolate(Channel),
    /// `255 - v` on each colour channel; alpha dropped.
    Negative,
    /// Colour channels reordered: output channel `i` takes source `order[i]`.
    Shuffle([Channel; 3]),
    Xor(Channel, Channel),
    /// Bit `bit` of `channel`, as a 0/255 mask.  `bit` counts from 1 (least
    /// significant) to 8; values outside that range are clamped into it.
    BitPlane { bit: u8, channel: Channel },
}

/// All views in output order.
pub const MODES: [Mode; MODE_COUNT] = [
    Mode::Composite,
    Mode::Grayscale,
    Mode::Isolate(Channel::Red),
    Mode::Isolate(Channel::Green),
    Mode::Isolate(Channel::Blue),
    Mode::Isolate(Channel::Alpha),
    Mode::Negative,
    Mode::Shuffle([B, G, R]),
    Mode::Shuffle([G, R, B]),
    Mode::Shuffle([G, B, R]),
    Mode::Shuffle([B, R, G]),
    Mode::Shuffle([R, B, G]),
    Mode::Xor(R, B),
    Mode::Xor(R, G),
    Mode::Xor(G, B),
    Mode::BitPlane { bit: 1, channel: R },
    Mode::BitPlane { bit: 1, channel: G },
    Mode::BitPlane { bit: 1, channel: B },
    Mode::BitPlane { bit: 2, channel: R },
    Mode::BitPlane { bit: 2, channel: G },
    Mode::BitPlane { bit: 2, channel: B },
    Mode::BitPlane { bit: 3, channel: R },
    Mode::BitPlane { bit: 3, channel: G },
    Mode::BitPlane { bit: 3, channel: B },
    Mode::BitPlane { bit: 4, channel: R },
    Mode::BitPlane { bit: 4, channel: G },
    Mode::BitPlane { bit: 4, channel: B },
];

impl Mode {
    pub fn name(&self) -> String {
        match self {
            Mode::Composite   => "RGB".to_string(),
            Mode::Grayscale   => "Grayscale".to_string(),
            Mode::Isolate(c)  => c.name().to_string(),
            Mode::Negative    => "Negative".to_string(),
            Mode::Shuffle(o)  => format!("Shuffle_{}{}{}", o[0].letter(), o[1].letter(), o[2].letter()),
            Mode::Xor(a, b)   => format!("XOR_{}{}", a.letter(), b.letter()),
            Mode::BitPlane { bit, channel } => format!("LSB{}_{}", bit, channel.letter()),
        }
    }

    /// Render this view from `src`.  `src` is only read.
    pub fn render(&self, src: &RgbaImage) -> DerivedPixels {
        match *self {
            Mode::Composite => DerivedPixels::Rgba(src.clone()),
            Mode::Grayscale => DerivedPixels::Luma(map_luma(src, |[r, g, b, _]| luma(r, g, b))),
            Mode::Isolate(c) => {
                let i = c.index();
                DerivedPixels::Luma(map_luma(src, |p| p[i]))
            }
            Mode::Negative => {
                DerivedPixels::Rgb(map_rgb(src, |[r, g, b, _]| [255 - r, 255 - g, 255 - b]))
            }
            Mode::Shuffle(order) => {
                let [x, y, z] = order.map(Channel::index);
                DerivedPixels::Rgb(map_rgb(src, |p| [p[x], p[y], p[z]]))
            }
            Mode::Xor(a, b) => {
                let (a, b) = (a.index(), b.index());
                DerivedPixels::Luma(map_luma(src, |p| p[a] ^ p[b]))
            }
            Mode::BitPlane { bit, channel } => {
                let (i, shift) = (channel.index(), bit.clamp(1, 8) - 1);
                DerivedPixels::Luma(map_luma(src, |p| ((p[i] >> shift) & 1) * 255))
            }
        }
    }
}

/// ITU-R 601-2 luma in 16.16 fixed point, rounded.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16) as u8
}

fn map_luma(src: &RgbaImage, f: impl Fn([u8; 4]) -> u8) -> GrayImage {
    let mut out = GrayImage::new(src.width(), src.height());
    for (dst, p) in out.pixels_mut().zip(src.pixels()) {
        *dst = Luma([f(p.0)]);
    }
    out
}

fn map_rgb(src: &RgbaImage, f: impl Fn([u8; 4]) -> [u8; 3]) -> RgbImage {
    let mut out = RgbImage::new(src.width(), src.height());
    for (dst, p) in out.pixels_mut().zip(src.pixels()) {
        *dst = Rgb(f(p.0));
    }
    out
}

/// Pixel buffer of a derived view.
#[derive(Debug, Clone, PartialEq)]
pub enum DerivedPixels {
    Rgba(RgbaImage),
    Rgb(RgbImage),
    Luma(GrayImage),
}

impl DerivedPixels {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            DerivedPixels::Rgba(img) => img.dimensions(),
            DerivedPixels::Rgb(img)  => img.dimensions(),
            DerivedPixels::Luma(img) => img.dimensions(),
        }
    }

    pub fn channel_count(&self) -> usize {
        match self {
            DerivedPixels::Rgba(_) => 4,
            DerivedPixels::Rgb(_)  => 3,
            DerivedPixels::Luma(_) => 1,
        }
    }

    pub fn as_raw(&self) -> &[u8] {
        match self {
            DerivedPixels::Rgba(img) => img.as_raw(),
            DerivedPixels::Rgb(img)  => img.as_raw(),
            DerivedPixels::Luma(img) => img.as_raw(),
        }
    }
}

/// A rendered view with its stable position and name.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedImage {
    /// 1-based position in [`MODES`].
    pub index:  u32,
    pub name:   String,
    pub pixels: DerivedPixels,
}

impl DerivedImage {
    /// `NN_<name>.png`
    pub fn file_name(&self) -> String {
        file_name(self.index, &self.name)
    }
}

pub fn file_name(index: u32, name: &str) -> String {
    format!("{index:02}_{name}.png")
}

fn render_at(src: &RgbaImage, position: usize, mode: &Mode) -> DerivedImage {
    DerivedImage {
        index:  position as u32 + 1,
        name:   mode.name(),
        pixels: mode.render(src),
    }
}

/// Render all 27 views in order.
pub fn decompose(src: &RgbaImage) -> Vec<DerivedImage> {
    MODES
        .iter()
        .enumerate()
        .map(|(i, mode)| render_at(src, i, mode))
        .collect()
}

/// Render the views one at a time and hand each to `sink`, stopping at the
/// first error.  At most one view is alive at a time.
pub fn decompose_each<F, E>(src: &RgbaImage, mut sink: F) -> Result<(), E>
where
    F: FnMut(DerivedImage) -> Result<(), E>,
{
    for (i, mode) in MODES.iter().enumerate() {
        sink(render_at(src, i, mode))?;
    }
    Ok(())
}

/// Render all 27 views, in parallel when the `parallel` feature is on.
/// Output order is the same as [`decompose`].
pub fn decompose_parallel(src: &RgbaImage) -> Vec<DerivedImage> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        MODES[..]
            .par_iter()
            .enumerate()
            .map(|(i, mode)| render_at(src, i, mode))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        decompose(src)
    }
}
