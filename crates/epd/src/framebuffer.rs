//! Packed 4bpp frame buffer
//!
//! Two horizontally adjacent pixels share one byte, row-major, in panel scan
//! order:
//!
//! ```text
//! byte = y * ceil(width / 2) + x / 2
//! bits 7..4 -> even x (left pixel)
//! bits 3..0 -> odd x  (right pixel)
//! ```
//!
//! For odd widths the low nibble of the last byte in each row is padding.
//!
//! A nibble holds a palette index (`0..=5`). Values `6..=15` have no color
//! but are stored and read back unchanged.

// Coordinates are u32 and widen losslessly to usize on the 32/64-bit hosts
// this driver targets.
#![allow(clippy::cast_possible_truncation)]

use core::convert::Infallible;

use embedded_graphics::draw_target::DrawTarget;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::Pixel;

use crate::error::EpdError;
use crate::palette::Color;

/// Bytes needed for a `width` x `height` frame: `ceil(width / 2) * height`.
pub fn buffer_size(width: u32, height: u32) -> usize {
    // u32 always fits in usize on the hosts this driver runs on.
    (width.div_ceil(2) as usize).saturating_mul(height as usize)
}

/// Require `buffer.len() == expected`.
///
/// A buffer of any other length is rejected, never truncated or padded.
pub fn validate_for_display(buffer: &[u8], expected: usize) -> Result<(), EpdError> {
    if buffer.len() == expected {
        Ok(())
    } else {
        Err(EpdError::BufferSizeMismatch {
            expected,
            actual: buffer.len(),
        })
    }
}

/// Both nibbles set to `index`.
const fn fill_byte(index: u8) -> u8 {
    let nibble = index & 0x0F;
    (nibble << 4) | nibble
}

/// Owned packed frame.
///
/// The length is fixed at creation to [`buffer_size`]`(width, height)`.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl core::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl FrameBuffer {
    /// Allocate a frame filled with `fill`.
    pub fn new(width: u32, height: u32, fill: Color) -> Result<Self, EpdError> {
        Self::filled(width, height, fill.index())
    }

    /// Allocate a frame with every nibble set to the low 4 bits of `index`.
    pub fn filled(width: u32, height: u32, index: u8) -> Result<Self, EpdError> {
        check_dimensions(width, height)?;
        let bytes = buffer_size(width, height);
        let mut data = Vec::new();
        data.try_reserve_exact(bytes)
            .map_err(|_| EpdError::AllocationFailure { bytes })?;
        data.resize(bytes, fill_byte(index));
        tracing::trace!(width, height, bytes, "frame buffer allocated");
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Wrap packed bytes produced elsewhere.
    pub fn from_bytes(width: u32, height: u32, data: Vec<u8>) -> Result<Self, EpdError> {
        check_dimensions(width, height)?;
        validate_for_display(&data, buffer_size(width, height))?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Convert a row-major RGB888 image (`width * height * 3` bytes).
    ///
    /// Each pixel goes through [`Color::from_rgb`].
    pub fn from_rgb888(rgb: &[u8], width: u32, height: u32) -> Result<Self, EpdError> {
        let expected = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(3);
        validate_for_display(rgb, expected)?;

        let mut frame = Self::new(width, height, Color::White)?;
        let coords = (0..height).flat_map(|y| (0..width).map(move |x| (x, y)));
        for ((x, y), px) in coords.zip(rgb.chunks_exact(3)) {
            if let [r, g, b] = *px {
                frame.set_color(x, y, Color::from_rgb(r, g, b))?;
            }
        }
        Ok(frame)
    }

    /// Six vertical stripes, one per palette entry in index order.
    ///
    /// Leftover columns (when `width` is not a multiple of six) belong to
    /// the last stripe.
    pub fn full_color_test_pattern(width: u32, height: u32) -> Result<Self, EpdError> {
        let mut frame = Self::new(width, height, Color::White)?;
        let stripe = (width / 6).max(1);
        for x in 0..width {
            // stripe >= 1
            #[allow(clippy::arithmetic_side_effects)]
            let slot = (x / stripe).min(5) as usize;
            let color = Color::ALL.get(slot).copied().unwrap_or(Color::Green);
            for y in 0..height {
                frame.set_color(x, y, color)?;
            }
        }
        Ok(frame)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable packed bytes; the length cannot change.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Give up the packed bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Byte offset of `(x, y)` and whether it is the high nibble.
    fn locate(&self, x: u32, y: u32) -> Result<(usize, bool), EpdError> {
        if x >= self.width || y >= self.height {
            return Err(EpdError::OutOfRange {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        let row_bytes = self.width.div_ceil(2) as usize;
        // y < height and x < width: index < row_bytes * height = data.len().
        #[allow(clippy::arithmetic_side_effects)]
        let index = y as usize * row_bytes + (x / 2) as usize;
        Ok((index, x % 2 == 0))
    }

    /// Store the low 4 bits of `index` at `(x, y)`.
    ///
    /// The neighbouring pixel in the same byte is left untouched.
    pub fn set_pixel(&mut self, x: u32, y: u32, index: u8) -> Result<(), EpdError> {
        let (offset, high) = self.locate(x, y)?;
        let nibble = index & 0x0F;
        let byte = self.byte_mut(offset)?;
        *byte = if high {
            (*byte & 0x0F) | (nibble << 4)
        } else {
            (*byte & 0xF0) | nibble
        };
        Ok(())
    }

    /// Nibble stored at `(x, y)`.
    pub fn get_pixel(&self, x: u32, y: u32) -> Result<u8, EpdError> {
        let (offset, high) = self.locate(x, y)?;
        let byte = self
            .data
            .get(offset)
            .copied()
            .ok_or(EpdError::InvalidOperation("frame buffer shorter than its geometry"))?;
        Ok(if high { byte >> 4 } else { byte & 0x0F })
    }

    /// [`FrameBuffer::set_pixel`] with a palette entry.
    pub fn set_color(&mut self, x: u32, y: u32, color: Color) -> Result<(), EpdError> {
        self.set_pixel(x, y, color.index())
    }

    /// Palette entry at `(x, y)`; fails for nibbles outside the palette.
    pub fn get_color(&self, x: u32, y: u32) -> Result<Color, EpdError> {
        Color::try_from(self.get_pixel(x, y)?)
    }

    /// [`FrameBuffer::set_pixel`] through the exact-match RGB mapping.
    pub fn set_pixel_rgb(&mut self, x: u32, y: u32, r: u8, g: u8, b: u8) -> Result<(), EpdError> {
        self.set_color(x, y, Color::from_rgb(r, g, b))
    }

    /// Overwrite every pixel with the low 4 bits of `index`.
    pub fn fill(&mut self, index: u8) {
        self.data.fill(fill_byte(index));
    }

    /// Count pixels per nibble value, ignoring row padding.
    pub fn color_distribution(&self) -> ColorDistribution {
        let mut distribution = ColorDistribution::default();
        for y in 0..self.height {
            for x in 0..self.width {
                if let Ok(index) = self.get_pixel(x, y) {
                    distribution.record(index);
                }
            }
        }
        distribution
    }

    fn byte_mut(&mut self, offset: usize) -> Result<&mut u8, EpdError> {
        self.data
            .get_mut(offset)
            .ok_or(EpdError::InvalidOperation("frame buffer shorter than its geometry"))
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), EpdError> {
    if width == 0 || height == 0 {
        return Err(EpdError::InvalidOperation(
            "frame width and height must be non-zero",
        ));
    }
    Ok(())
}

/// Pixel counts of a [`FrameBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorDistribution {
    counts: [u64; 16],
    total: u64,
}

impl ColorDistribution {
    fn record(&mut self, index: u8) {
        if let Some(count) = self.counts.get_mut(usize::from(index & 0x0F)) {
            *count = count.saturating_add(1);
        }
        self.total = self.total.saturating_add(1);
    }

    /// Pixels holding nibble `index`.
    pub fn count(&self, index: u8) -> u64 {
        self.counts.get(usize::from(index)).copied().unwrap_or(0)
    }

    /// Pixels holding `color`.
    pub fn count_of(&self, color: Color) -> u64 {
        self.count(color.index())
    }

    /// `width * height`.
    pub fn total_pixels(&self) -> u64 {
        self.total
    }

    /// Number of distinct nibble values present.
    pub fn unique_colors(&self) -> usize {
        self.counts.iter().filter(|&&n| n > 0).count()
    }

    /// `(index, count)` for every value present, in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        (0u8..16)
            .zip(self.counts.iter().copied())
            .filter(|&(_, n)| n > 0)
    }
}

// ---------------------------------------------------------------------------
// embedded-graphics
// ---------------------------------------------------------------------------

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = Color;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            if let Ok((x, y)) = coord.try_into() {
                // Off-frame pixels are clipped.
                let _ = self.set_color(x, y, color);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color.index());
        Ok(())
    }
}
