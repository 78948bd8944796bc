//! Region decoding procedures and the fields shared by region segments.

pub(crate) mod generic;
pub(crate) mod generic_refinement;
pub(crate) mod halftone;
pub(crate) mod pattern;
pub(crate) mod symbol;
pub(crate) mod text;

use alloc::vec::Vec;

use crate::bitmap::{Bitmap, CombinationOperator};
use crate::error::{Feature, Result, TemplateError, bail};
use crate::reader::Reader;

/// The region segment information field (7.4.1).
#[derive(Debug, Clone)]
pub(crate) struct RegionSegmentInfo {
    /// "This four-byte field gives the width in pixels of the bitmap encoded
    /// in this segment." (7.4.1.1)
    pub(crate) width: u32,
    /// "This four-byte field gives the height in pixels of the bitmap encoded
    /// in this segment." (7.4.1.2)
    pub(crate) height: u32,
    /// "This four-byte field gives the horizontal offset in pixels of the
    /// bitmap encoded in this segment relative to the page bitmap." (7.4.1.3)
    pub(crate) x: u32,
    /// "This four-byte field gives the vertical offset in pixels of the bitmap
    /// encoded in this segment relative to the page bitmap." (7.4.1.4)
    pub(crate) y: u32,
    /// "Bits 0-2: External combination operator." (7.4.1.5)
    pub(crate) operator: CombinationOperator,
}

pub(crate) fn parse_region_segment_info(reader: &mut Reader<'_>) -> Result<RegionSegmentInfo> {
    let width = reader.read_u32()?;
    let height = reader.read_u32()?;
    let x = reader.read_u32()?;
    let y = reader.read_u32()?;
    let flags = reader.read_byte()?;

    let operator = CombinationOperator::from_value(flags & 0x07)?;

    // "Bit 3: Colour extension flag (COLEXTFLAG)."
    if flags & 0x08 != 0 {
        bail!(Feature::ColourExtension);
    }

    // "Bits 4-7: Reserved; must be 0."
    if flags & 0xF0 != 0 {
        lwarn!("reserved region segment flags are set: {:#04x}", flags);
    }

    Ok(RegionSegmentInfo {
        width,
        height,
        x,
        y,
        operator,
    })
}

/// A decoded region together with its placement on the page.
#[derive(Debug, Clone)]
pub(crate) struct DecodedRegion {
    pub(crate) info: RegionSegmentInfo,
    pub(crate) bitmap: Bitmap,
}

/// The template of the generic region decoding procedure (6.2.5.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Template {
    Template0,
    Template1,
    Template2,
    Template3,
}

impl Template {
    pub(crate) fn from_value(value: u8) -> Self {
        match value & 0x03 {
            0 => Self::Template0,
            1 => Self::Template1,
            2 => Self::Template2,
            _ => Self::Template3,
        }
    }

    /// The number of pixels in the template, which is also the number of bits
    /// of its contexts.
    pub(crate) fn context_bits(self) -> u32 {
        match self {
            Self::Template0 => 16,
            Self::Template1 => 13,
            Self::Template2 | Self::Template3 => 10,
        }
    }

    /// "If GBTEMPLATE is 0, then four AT pixels are used. Otherwise, one AT
    /// pixel is used." (6.2.5.4)
    pub(crate) fn at_pixel_count(self) -> usize {
        match self {
            Self::Template0 => 4,
            _ => 1,
        }
    }

    /// The nominal AT pixel locations (Figures 3 to 6), which are also the
    /// fixed locations used by the gray-scale image decoding procedure
    /// (C.5).
    pub(crate) fn nominal_at_pixels(self) -> Vec<AdaptivePixel> {
        let pixels: &[(i32, i32)] = match self {
            Self::Template0 => &[(3, -1), (-3, -1), (2, -2), (-2, -2)],
            Self::Template1 => &[(3, -1)],
            Self::Template2 | Self::Template3 => &[(2, -1)],
        };

        pixels.iter().map(|&(x, y)| AdaptivePixel { x, y }).collect()
    }
}

/// The template of the generic refinement region decoding procedure
/// (6.3.5.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RefinementTemplate {
    Template0,
    Template1,
}

impl RefinementTemplate {
    pub(crate) fn from_bit(bit: bool) -> Self {
        if bit { Self::Template1 } else { Self::Template0 }
    }

    pub(crate) fn context_bits(self) -> u32 {
        match self {
            Self::Template0 => 13,
            Self::Template1 => 10,
        }
    }
}

/// The location of an adaptive template pixel relative to the pixel being
/// decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AdaptivePixel {
    pub(crate) x: i32,
    pub(crate) y: i32,
}

impl AdaptivePixel {
    fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let x = reader.read_i8()? as i32;
        let y = reader.read_i8()? as i32;

        Ok(Self { x, y })
    }

    /// Whether the pixel lies in the part of the bitmap that has already been
    /// decoded (6.2.5.4, Figure 7).
    fn is_causal(self) -> bool {
        self.y < 0 || (self.y == 0 && self.x < 0)
    }
}

/// Read the AT pixels of a generic region or symbol dictionary (7.4.6.3,
/// 7.4.2.1.2).
pub(crate) fn parse_at_pixels(
    reader: &mut Reader<'_>,
    template: Template,
) -> Result<Vec<AdaptivePixel>> {
    (0..template.at_pixel_count())
        .map(|_| {
            let pixel = AdaptivePixel::read(reader)?;

            if !pixel.is_causal() {
                bail!(TemplateError::InvalidAtPixel);
            }

            Ok(pixel)
        })
        .collect()
}

/// Read the two refinement AT pixels (7.4.7.3, 7.4.2.1.3). The first one is
/// in the region being decoded, the second one in the reference bitmap.
pub(crate) fn parse_refinement_at_pixels(reader: &mut Reader<'_>) -> Result<[AdaptivePixel; 2]> {
    let first = AdaptivePixel::read(reader)?;
    let second = AdaptivePixel::read(reader)?;

    if !first.is_causal() {
        bail!(TemplateError::InvalidAtPixel);
    }

    Ok([first, second])
}

/// The refinement AT pixels of a procedure whose segment carries none
/// because it uses template 1.
pub(crate) const UNUSED_REFINEMENT_AT: [AdaptivePixel; 2] =
    [AdaptivePixel { x: -1, y: -1 }, AdaptivePixel { x: -1, y: -1 }];
