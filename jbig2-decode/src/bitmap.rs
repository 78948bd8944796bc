//! Packed bitonal bitmaps.
//!
//! "The variable whose value is the result of this decoding procedure is shown
//! in Table 3." (6.2.3)

use alloc::vec;
use alloc::vec::Vec;

use crate::error::{RegionError, Result, bail, err};

/// The largest number of pixels a single bitmap may have.
pub(crate) const MAX_PIXELS: u64 = 1 << 32;

/// The largest number of pixels a region may claim per byte of segment data.
///
/// Arithmetic coding with typical prediction can describe large empty areas
/// with very few bytes, but not arbitrarily large ones.
pub(crate) const MAX_PIXELS_PER_BYTE: u64 = 1 << 24;

/// The largest number of symbols (or patterns) a dictionary may declare per
/// byte of segment data.
pub(crate) const MAX_SYMBOLS_PER_BYTE: u64 = 1 << 10;

/// Reject a region of `width` x `height` pixels that is decoded from
/// `data_len` bytes if its size is out of proportion, before anything is
/// allocated for it.
pub(crate) fn check_region_size(width: u32, height: u32, data_len: usize) -> Result<()> {
    PixelBudget::for_data(data_len).charge(width, height)
}

/// The number of pixels that may still be decoded from a segment.
///
/// Segments that decode many bitmaps, like symbol dictionaries, charge each
/// one against a single budget, so the total stays in proportion to the
/// segment data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PixelBudget {
    remaining: u64,
}

impl PixelBudget {
    pub(crate) fn new(pixels: u64) -> Self {
        Self { remaining: pixels }
    }

    /// The budget for `data_len` bytes of segment data.
    pub(crate) fn for_data(data_len: usize) -> Self {
        let pixels = (data_len.max(1) as u64).saturating_mul(MAX_PIXELS_PER_BYTE);

        Self::new(pixels.min(MAX_PIXELS))
    }

    /// Take the pixels of a `width` x `height` bitmap from the budget, or
    /// fail with [`RegionError::TooLarge`] if not enough are left.
    pub(crate) fn charge(&mut self, width: u32, height: u32) -> Result<()> {
        let area = width as u64 * height as u64;

        let Some(remaining) = self.remaining.checked_sub(area) else {
            bail!(RegionError::TooLarge);
        };
        self.remaining = remaining;

        Ok(())
    }
}

/// "These operators describe how the segment's bitmap is to be combined with
/// the page bitmap." (7.4.1.5)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinationOperator {
    /// 0 OR
    Or,
    /// 1 AND
    And,
    /// 2 XOR
    Xor,
    /// 3 XNOR
    Xnor,
    /// 4 REPLACE
    Replace,
}

impl CombinationOperator {
    pub(crate) fn from_value(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Or),
            1 => Ok(Self::And),
            2 => Ok(Self::Xor),
            3 => Ok(Self::Xnor),
            4 => Ok(Self::Replace),
            _ => err!(RegionError::InvalidCombinationOperator),
        }
    }

    #[inline(always)]
    fn apply(self, dst: bool, src: bool) -> bool {
        match self {
            Self::Or => dst | src,
            Self::And => dst & src,
            Self::Xor => dst ^ src,
            Self::Xnor => !(dst ^ src),
            Self::Replace => src,
        }
    }
}

/// A bitonal image with one bit per pixel.
///
/// Rows are stored top to bottom, each padded to a whole number of bytes, with
/// the leftmost pixel in the most significant bit. A set bit is a black pixel.
/// Padding bits are always 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    stride: u32,
    data: Vec<u8>,
}

impl Bitmap {
    /// Create a white bitmap.
    ///
    /// Fails if the bitmap would have more than 2^32 pixels, or if one of its
    /// dimensions exceeds `i32::MAX`.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width > i32::MAX as u32 || height > i32::MAX as u32 {
            bail!(RegionError::InvalidDimension);
        }

        if width as u64 * height as u64 > MAX_PIXELS {
            bail!(RegionError::TooLarge);
        }

        let stride = width.div_ceil(8);
        let len = usize::try_from(stride as u64 * height as u64)
            .map_err(|_| RegionError::TooLarge)?;

        Ok(Self {
            width,
            height,
            stride,
            data: vec![0; len],
        })
    }

    /// Create a bitmap with every pixel set to `value`.
    pub(crate) fn filled(width: u32, height: u32, value: bool) -> Result<Self> {
        let mut bitmap = Self::new(width, height)?;
        bitmap.fill(value);

        Ok(bitmap)
    }

    /// The width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The number of bytes per row, `⌈width / 8⌉`.
    #[inline]
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// The packed pixel data, `stride * height` bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether the pixel at `(x, y)` is black. Pixels outside of the bitmap
    /// are white.
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }

        let byte = self.data[(y * self.stride + x / 8) as usize];
        (byte >> (7 - x % 8)) & 1 != 0
    }

    /// Set the pixel at `(x, y)`. Writes outside of the bitmap are ignored.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, value: bool) {
        if x >= self.width || y >= self.height {
            return;
        }

        let byte = &mut self.data[(y * self.stride + x / 8) as usize];
        let mask = 0x80 >> (x % 8);

        if value {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }

    /// The byte holding pixels `8 * byte_x` to `8 * byte_x + 7` of row `y`,
    /// or 0 outside of the bitmap.
    #[inline]
    pub fn get_byte(&self, byte_x: u32, y: u32) -> u8 {
        if byte_x >= self.stride || y >= self.height {
            return 0;
        }

        self.data[(y * self.stride + byte_x) as usize]
    }

    /// Replace the byte holding pixels `8 * byte_x` to `8 * byte_x + 7` of
    /// row `y`. Bits beyond the width of the bitmap are dropped.
    #[inline]
    pub fn set_byte(&mut self, byte_x: u32, y: u32, value: u8) {
        if byte_x >= self.stride || y >= self.height {
            return;
        }

        let mask = if byte_x == self.stride - 1 {
            self.last_byte_mask()
        } else {
            0xFF
        };

        self.data[(y * self.stride + byte_x) as usize] = value & mask;
    }

    /// Set every pixel to `value`.
    pub fn fill(&mut self, value: bool) {
        if !value {
            self.data.fill(0);
            return;
        }

        self.data.fill(0xFF);

        let mask = self.last_byte_mask();
        if mask != 0xFF {
            for row in self.data.chunks_exact_mut(self.stride as usize) {
                if let Some(last) = row.last_mut() {
                    *last = mask;
                }
            }
        }
    }

    /// Combine `src` into this bitmap with its top left corner placed at
    /// `(x, y)`. Parts of `src` that fall outside of this bitmap are clipped.
    ///
    /// "These operators describe how the segment's bitmap is to be combined
    /// with the page bitmap." (7.4.1.5)
    pub fn blit(&mut self, src: &Self, x: i32, y: i32, op: CombinationOperator) {
        let x = x as i64;
        let y = y as i64;

        let src_x0 = (-x).max(0);
        let src_y0 = (-y).max(0);
        let src_x1 = (self.width as i64 - x).min(src.width as i64);
        let src_y1 = (self.height as i64 - y).min(src.height as i64);

        if src_x0 >= src_x1 || src_y0 >= src_y1 {
            return;
        }

        if op == CombinationOperator::Or && x % 8 == 0 && src_x0 == 0 {
            self.or_aligned(src, x as u32, y, src_y0, src_y1, src_x1 as u32);
            return;
        }

        for sy in src_y0..src_y1 {
            let dy = (sy + y) as u32;

            for sx in src_x0..src_x1 {
                let dx = (sx + x) as u32;
                let src_pixel = src.get_pixel(sx as u32, sy as u32);
                let dst_pixel = self.get_pixel(dx, dy);

                self.set_pixel(dx, dy, op.apply(dst_pixel, src_pixel));
            }
        }
    }

    /// OR `src` into this bitmap at a byte-aligned column, a whole byte at a
    /// time. This is the common case for placing symbols.
    fn or_aligned(&mut self, src: &Self, x: u32, y: i64, src_y0: i64, src_y1: i64, width: u32) {
        let dst_byte_x = x / 8;
        let full_bytes = width / 8;
        let rest = width % 8;

        for sy in src_y0..src_y1 {
            let dy = (sy + y) as u32;
            let dst_row = (dy * self.stride + dst_byte_x) as usize;
            let src_row = (sy as u32 * src.stride) as usize;

            for i in 0..full_bytes as usize {
                self.data[dst_row + i] |= src.data[src_row + i];
            }

            if rest != 0 {
                let mask = 0xFF_u8 << (8 - rest);
                self.data[dst_row + full_bytes as usize] |=
                    src.data[src_row + full_bytes as usize] & mask;
            }
        }
    }

    /// Copy the area of `width` x `height` pixels at `(x, y)` into a new
    /// bitmap. Pixels outside of this bitmap read as white.
    pub(crate) fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Result<Self> {
        let mut out = Self::new(width, height)?;
        let x = i32::try_from(x).map_err(|_| RegionError::InvalidDimension)?;
        let y = i32::try_from(y).map_err(|_| RegionError::InvalidDimension)?;
        out.blit(self, -x, -y, CombinationOperator::Replace);

        Ok(out)
    }

    /// The pixel at `(x, y)` as a context bit, 0 outside of the bitmap.
    ///
    /// "All pixels lying outside the bounds of the actual bitmap have the
    /// value 0." (6.2.5.2)
    #[inline(always)]
    pub(crate) fn pixel(&self, x: i32, y: i32) -> u32 {
        if x < 0 || y < 0 {
            0
        } else {
            self.get_pixel(x as u32, y as u32) as u32
        }
    }

    /// Copy row `from` over row `to`.
    #[inline]
    pub(crate) fn copy_row(&mut self, from: u32, to: u32) {
        let stride = self.stride as usize;
        let src = from as usize * stride;
        self.data
            .copy_within(src..src + stride, to as usize * stride);
    }

    /// The mask of bits of the last byte of each row that lie inside of the
    /// bitmap.
    #[inline]
    fn last_byte_mask(&self) -> u8 {
        match self.width % 8 {
            0 => 0xFF,
            n => 0xFF << (8 - n),
        }
    }

    /// Convert the bitmap into an 8-bit grayscale image where black pixels
    /// are 0 and white pixels are 255.
    #[cfg(feature = "image")]
    pub fn to_luma8(&self) -> image::GrayImage {
        image::GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([if self.get_pixel(x, y) { 0 } else { 255 }])
        })
    }
}
