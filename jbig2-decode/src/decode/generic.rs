//! Generic region segments (7.4.6) and the generic region decoding procedure
//! (6.2).

use alloc::vec::Vec;

use super::{
    AdaptivePixel, DecodedRegion, Template, parse_at_pixels, parse_region_segment_info,
};
use crate::arithmetic_decoder::ArithmeticDecoder;
use crate::bitmap::{Bitmap, check_region_size};
use crate::context::ContextStats;
use crate::error::{Feature, ParseError, RegionError, Result, bail};
use crate::reader::Reader;

/// Decode a generic region segment.
///
/// `unknown_length` is set for immediate generic regions whose segment header
/// declared an unknown data length. Their data ends with a row count.
pub(crate) fn decode(data: &[u8], unknown_length: bool) -> Result<DecodedRegion> {
    let mut reader = Reader::new(data);
    let mut info = parse_region_segment_info(&mut reader)?;

    // 7.4.6.2
    let flags = reader.read_byte()?;

    // "Bit 0: MMR"
    if flags & 0x01 != 0 {
        bail!(Feature::Mmr);
    }

    // "Bits 1-2: GBTEMPLATE"
    let template = Template::from_value(flags >> 1);
    // "Bit 3: TPGDON"
    let tpgdon = flags & 0x08 != 0;

    // "Bit 4: EXTTEMPLATE"
    if flags & 0x10 != 0 {
        bail!(Feature::ExtendedTemplate);
    }

    if flags & 0xE0 != 0 {
        lwarn!("reserved generic region flags are set: {:#04x}", flags);
    }

    let at = parse_at_pixels(&mut reader, template)?;
    let mut coded = reader.tail();

    // "As a special case, as noted in 7.2.7, an immediate generic region
    // segment may have an unknown length. In this case, it also indicates the
    // height of the generic region (i.e. the number of rows that have been
    // decoded in this segment; it must be no greater than the region segment
    // bitmap height value in the segment's region segment information
    // field." (7.4.6.4)
    if unknown_length {
        let Some(split) = coded.len().checked_sub(4) else {
            bail!(ParseError::UnexpectedEof);
        };

        let (head, tail) = coded.split_at(split);
        let row_count = u32::from_be_bytes([tail[0], tail[1], tail[2], tail[3]]);

        if row_count > info.height {
            bail!(RegionError::InvalidDimension);
        }

        info.height = row_count;
        coded = head;
    }

    check_region_size(info.width, info.height, data.len())?;

    ldebug!(
        "generic region {}x{} at ({}, {}), {:?}, TPGDON {}",
        info.width,
        info.height,
        info.x,
        info.y,
        template,
        tpgdon
    );

    let mut decoder = ArithmeticDecoder::new(coded);
    let mut stats = ContextStats::with_context_bits(template.context_bits());
    let params = GenericParams {
        template,
        at: &at,
        tpgdon,
        skip: None,
    };

    let bitmap = decode_bitmap(&mut decoder, &mut stats, info.width, info.height, &params)?;

    Ok(DecodedRegion { info, bitmap })
}

/// The parameters of the generic region decoding procedure (Table 2) that
/// apply to arithmetic coding.
#[derive(Debug, Clone)]
pub(crate) struct GenericParams<'a> {
    /// `GBTEMPLATE`
    pub(crate) template: Template,
    /// `GBATX` and `GBATY`
    pub(crate) at: &'a [AdaptivePixel],
    /// `TPGDON`
    pub(crate) tpgdon: bool,
    /// `SKIP`, only present if `USESKIP` is 1.
    pub(crate) skip: Option<&'a Bitmap>,
}

/// Decode a `width` x `height` bitmap with the contexts in `stats` (6.2.5.7).
///
/// `stats` must hold `2^context_bits` contexts of the template. They are
/// shared with other invocations of the procedure by symbol dictionaries and
/// gray-scale images.
pub(crate) fn decode_bitmap(
    decoder: &mut ArithmeticDecoder<'_>,
    stats: &mut ContextStats,
    width: u32,
    height: u32,
    params: &GenericParams<'_>,
) -> Result<Bitmap> {
    check_region_size(width, height, decoder.data_len())?;

    let mut bitmap = Bitmap::new(width, height)?;
    let template = ContextTemplate::generic(params.template, params.at);
    let sltp_context = sltp_context(params.template);

    // "1) Set: LTP = 0"
    let mut ltp = false;

    for y in 0..height {
        // "b) If TPGDON is 1, then decode a bit using the arithmetic entropy
        // coder, where the context used to decode this bit is as shown in
        // Figure 8 [...] Let SLTP be the value of this bit. Set:
        // LTP = LTP XOR SLTP"
        if params.tpgdon {
            ltp ^= decoder.decode_bit(stats, sltp_context) != 0;
        }

        // "c) If LTP = 1 then set every pixel of the current row of GBREG
        // equal to the corresponding pixel of the row immediately above."
        if ltp {
            if y > 0 {
                bitmap.copy_row(y - 1, y);
            }

            continue;
        }

        // "d) If LTP = 0 then, from left to right, decode each pixel of the
        // current row of GBREG."
        for x in 0..width {
            // "i) If USESKIP is 1 and the pixel in the bitmap SKIP at the
            // location corresponding to the current pixel is 1, then set the
            // current pixel to 0."
            if params.skip.is_some_and(|skip| skip.get_pixel(x, y)) {
                continue;
            }

            let cx = template.context(&bitmap, x as i32, y as i32);

            if decoder.decode_bit(stats, cx) != 0 {
                bitmap.set_pixel(x, y, true);
            }
        }
    }

    Ok(bitmap)
}

/// The context of the SLTP bit (Figures 8 to 11).
fn sltp_context(template: Template) -> u32 {
    match template {
        Template::Template0 => 0b1001_1011_0010_0101,
        Template::Template1 => 0b0_0111_1001_0101,
        Template::Template2 => 0b00_1110_0101,
        Template::Template3 => 0b01_1001_0101,
    }
}

/// The pixels that form the context of a template, as offsets from the
/// current pixel, in order from the most significant context bit to the least
/// significant one.
#[derive(Debug, Clone)]
pub(crate) struct ContextTemplate {
    pixels: Vec<(i32, i32)>,
}

impl ContextTemplate {
    /// Figures 3 to 6, with the AT pixels substituted.
    pub(crate) fn generic(template: Template, at: &[AdaptivePixel]) -> Self {
        let at = |i: usize| (at[i].x, at[i].y);

        #[rustfmt::skip]
        let pixels = match template {
            Template::Template0 => [
                at(3), (-1, -2), (0, -2), (1, -2), at(2),
                at(1), (-2, -1), (-1, -1), (0, -1), (1, -1), (2, -1), at(0),
                (-4, 0), (-3, 0), (-2, 0), (-1, 0),
            ].to_vec(),
            Template::Template1 => [
                (-1, -2), (0, -2), (1, -2), (2, -2),
                (-2, -1), (-1, -1), (0, -1), (1, -1), (2, -1), at(0),
                (-3, 0), (-2, 0), (-1, 0),
            ].to_vec(),
            Template::Template2 => [
                (-1, -2), (0, -2), (1, -2),
                (-2, -1), (-1, -1), (0, -1), (1, -1), at(0),
                (-2, 0), (-1, 0),
            ].to_vec(),
            Template::Template3 => [
                (-3, -1), (-2, -1), (-1, -1), (0, -1), (1, -1), at(0),
                (-4, 0), (-3, 0), (-2, 0), (-1, 0),
            ].to_vec(),
        };

        Self { pixels }
    }

    pub(crate) fn from_pixels(pixels: Vec<(i32, i32)>) -> Self {
        Self { pixels }
    }

    /// Form the context of the pixel at `(x, y)` from the pixels of `bitmap`.
    #[inline(always)]
    pub(crate) fn context(&self, bitmap: &Bitmap, x: i32, y: i32) -> u32 {
        self.pixels.iter().fold(0, |cx, &(dx, dy)| {
            (cx << 1) | bitmap.pixel(x.wrapping_add(dx), y.wrapping_add(dy))
        })
    }
}
