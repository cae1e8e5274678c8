//! Six-color Spectra 6 palette
//!
//! Palette indices are what a [`FrameBuffer`](crate::FrameBuffer) stores in
//! each nibble and what the panel protocol accepts for a clear color.
//!
//! RGB conversion is an exact match against the six reference triples; any
//! other input maps to [`Color::White`]. There is no nearest-color search
//! and no dithering.

use core::fmt;
use core::str::FromStr;

use embedded_graphics::pixelcolor::raw::RawU4;
use embedded_graphics::pixelcolor::{PixelColor, Rgb888, RgbColor};

use crate::error::EpdError;

/// Palette entry.
///
/// The discriminant is the palette index.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Index 0
    Black = 0,
    /// Index 1
    #[default]
    White = 1,
    /// Index 2
    Yellow = 2,
    /// Index 3
    Red = 3,
    /// Index 4
    Blue = 4,
    /// Index 5
    Green = 5,
}

impl Color {
    /// Every palette entry, in index order.
    pub const ALL: [Color; 6] = [
        Color::Black,
        Color::White,
        Color::Yellow,
        Color::Red,
        Color::Blue,
        Color::Green,
    ];

    /// Palette index.
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Reference RGB triple.
    pub const fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Black => (0, 0, 0),
            Self::White => (255, 255, 255),
            Self::Yellow => (255, 255, 0),
            Self::Red => (255, 0, 0),
            Self::Blue => (0, 0, 255),
            Self::Green => (0, 255, 0),
        }
    }

    /// Lower-case name, as accepted by [`FromStr`].
    pub const fn name(self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::White => "white",
            Self::Yellow => "yellow",
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
        }
    }

    /// Exact RGB match; anything that is not a reference triple is white.
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self::ALL
            .into_iter()
            .find(|color| color.rgb() == (r, g, b))
            .unwrap_or(Self::White)
    }

    /// [`Color::from_rgb`] for callers holding wider channel values.
    ///
    /// A channel outside `0..=255` maps to white.
    pub fn from_rgb_channels(r: i32, g: i32, b: i32) -> Self {
        match (u8::try_from(r), u8::try_from(g), u8::try_from(b)) {
            (Ok(r), Ok(g), Ok(b)) => Self::from_rgb(r, g, b),
            _ => Self::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Color {
    type Err = EpdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|color| color.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| EpdError::UnknownColor { name: s.into() })
    }
}

impl TryFrom<u8> for Color {
    type Error = EpdError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(index))
            .copied()
            .ok_or(EpdError::InvalidColorIndex { index })
    }
}

impl From<Color> for u8 {
    fn from(color: Color) -> Self {
        color.index()
    }
}

impl PixelColor for Color {
    type Raw = RawU4;
}

impl From<Rgb888> for Color {
    fn from(color: Rgb888) -> Self {
        Self::from_rgb(color.r(), color.g(), color.b())
    }
}

impl From<Color> for Rgb888 {
    fn from(color: Color) -> Self {
        let (r, g, b) = color.rgb();
        Rgb888::new(r, g, b)
    }
}
