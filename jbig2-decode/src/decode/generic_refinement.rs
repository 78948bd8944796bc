//! Generic refinement region segments (7.4.7) and the generic refinement
//! region decoding procedure (6.3).

use alloc::vec::Vec;

use super::generic::ContextTemplate;
use super::{
    AdaptivePixel, DecodedRegion, RefinementTemplate, UNUSED_REFINEMENT_AT,
    parse_refinement_at_pixels, parse_region_segment_info,
};
use crate::arithmetic_decoder::ArithmeticDecoder;
use crate::bitmap::{Bitmap, check_region_size};
use crate::context::ContextStats;
use crate::error::{DecodeError, Result};
use crate::reader::Reader;

/// Decode a refinement region segment against `reference`, whose top left
/// corner lies at `(reference_x, reference_y)` on the page.
pub(crate) fn decode(
    data: &[u8],
    reference: &Bitmap,
    reference_x: i64,
    reference_y: i64,
) -> Result<DecodedRegion> {
    let mut reader = Reader::new(data);
    let info = parse_region_segment_info(&mut reader)?;

    // 7.4.7.2
    let flags = reader.read_byte()?;
    // "Bit 0: GRTEMPLATE"
    let template = RefinementTemplate::from_bit(flags & 0x01 != 0);
    // "Bit 1: TPGRON"
    let tpgron = flags & 0x02 != 0;

    if flags & 0xFC != 0 {
        lwarn!("reserved refinement region flags are set: {:#04x}", flags);
    }

    // "This field is only present if GRTEMPLATE is 0." (7.4.7.3)
    let at = if template == RefinementTemplate::Template0 {
        parse_refinement_at_pixels(&mut reader)?
    } else {
        UNUSED_REFINEMENT_AT
    };

    check_region_size(info.width, info.height, data.len())?;

    // "GRREFERENCEDX: The X offset of the reference bitmap with respect to the
    // bitmap being decoded." (Table 6)
    let offset = |reference: i64, region: u32| {
        i32::try_from(reference - region as i64).map_err(|_| DecodeError::Overflow)
    };
    let dx = offset(reference_x, info.x)?;
    let dy = offset(reference_y, info.y)?;

    ldebug!(
        "refinement region {}x{} at ({}, {}), {:?}, TPGRON {}, reference offset ({}, {})",
        info.width,
        info.height,
        info.x,
        info.y,
        template,
        tpgron,
        dx,
        dy
    );

    let mut decoder = ArithmeticDecoder::new(reader.tail());
    let mut stats = ContextStats::with_context_bits(template.context_bits());
    let params = RefinementParams {
        template,
        at,
        reference,
        dx,
        dy,
        tpgron,
    };

    let bitmap = decode_bitmap(&mut decoder, &mut stats, info.width, info.height, &params)?;

    Ok(DecodedRegion { info, bitmap })
}

/// The parameters of the generic refinement region decoding procedure
/// (Table 6).
#[derive(Debug, Clone)]
pub(crate) struct RefinementParams<'a> {
    /// `GRTEMPLATE`
    pub(crate) template: RefinementTemplate,
    /// `GRATX1`, `GRATY1`, `GRATX2` and `GRATY2`
    pub(crate) at: [AdaptivePixel; 2],
    /// `GRREFERENCE`
    pub(crate) reference: &'a Bitmap,
    /// `GRREFERENCEDX`
    pub(crate) dx: i32,
    /// `GRREFERENCEDY`
    pub(crate) dy: i32,
    /// `TPGRON`
    pub(crate) tpgron: bool,
}

/// Decode a `width` x `height` bitmap as a refinement of the reference bitmap
/// (6.3.5.6).
pub(crate) fn decode_bitmap(
    decoder: &mut ArithmeticDecoder<'_>,
    stats: &mut ContextStats,
    width: u32,
    height: u32,
    params: &RefinementParams<'_>,
) -> Result<Bitmap> {
    check_region_size(width, height, decoder.data_len())?;

    let mut bitmap = Bitmap::new(width, height)?;
    let template = RefinementContext::new(params.template, &params.at);
    let reference = params.reference;

    // Figures 14 and 15.
    let sltp_context = match params.template {
        RefinementTemplate::Template0 => 0b0_0000_0001_0000,
        RefinementTemplate::Template1 => 0b00_0000_1000,
    };

    // "1) Set LTP = 0."
    let mut ltp = false;

    for y in 0..height as i32 {
        // "b) If TPGRON is 1, then decode a bit using the arithmetic entropy
        // coder [...] Let SLTP be the value of this bit. Set:
        // LTP = LTP XOR SLTP"
        if params.tpgron {
            ltp ^= decoder.decode_bit(stats, sltp_context) != 0;
        }

        let ry = y - params.dy;

        for x in 0..width as i32 {
            let rx = x - params.dx;

            // "d) If LTP = 1 then, from left to right, implicitly decode
            // certain pixels of the current row of GRREG, and explicitly
            // decode the rest."
            if ltp && let Some(value) = typical_value(reference, rx, ry) {
                // "ii) If TPGRPIX is 1 then implicitly decode the current
                // pixel by setting it equal to its predicted value (TPGRVAL)."
                if value {
                    bitmap.set_pixel(x as u32, y as u32, true);
                }

                continue;
            }

            let cx = template.context(&bitmap, reference, x, y, rx, ry);

            if decoder.decode_bit(stats, cx) != 0 {
                bitmap.set_pixel(x as u32, y as u32, true);
            }
        }
    }

    Ok(bitmap)
}

/// "Set TPGRPIX equal to 1 if [...] a 3 × 3 pixel array in the reference
/// bitmap (Figure 16), centred at the location corresponding to the current
/// pixel, contains pixels all of the same value." (6.3.5.6)
///
/// Returns that value (`TPGRVAL`) if the array is uniform.
fn typical_value(reference: &Bitmap, rx: i32, ry: i32) -> Option<bool> {
    let center = reference.pixel(rx, ry);

    let uniform = (-1..=1).all(|dy| {
        (-1..=1).all(|dx| reference.pixel(rx.wrapping_add(dx), ry.wrapping_add(dy)) == center)
    });

    uniform.then_some(center != 0)
}

/// The context of a refinement template: pixels of the bitmap being decoded
/// followed by pixels of the reference bitmap.
#[derive(Debug, Clone)]
struct RefinementContext {
    region: ContextTemplate,
    reference: ContextTemplate,
    reference_bits: u32,
}

impl RefinementContext {
    /// Figures 12 and 13.
    fn new(template: RefinementTemplate, at: &[AdaptivePixel; 2]) -> Self {
        let (region, reference): (Vec<_>, Vec<_>) = match template {
            RefinementTemplate::Template0 => (
                [(at[0].x, at[0].y), (0, -1), (1, -1), (-1, 0)].to_vec(),
                [
                    (at[1].x, at[1].y),
                    (0, -1),
                    (1, -1),
                    (-1, 0),
                    (0, 0),
                    (1, 0),
                    (-1, 1),
                    (0, 1),
                    (1, 1),
                ]
                .to_vec(),
            ),
            RefinementTemplate::Template1 => (
                [(-1, -1), (0, -1), (1, -1), (-1, 0)].to_vec(),
                [(0, -1), (-1, 0), (0, 0), (1, 0), (0, 1), (1, 1)].to_vec(),
            ),
        };

        Self {
            reference_bits: reference.len() as u32,
            region: ContextTemplate::from_pixels(region),
            reference: ContextTemplate::from_pixels(reference),
        }
    }

    #[inline(always)]
    fn context(&self, bitmap: &Bitmap, reference: &Bitmap, x: i32, y: i32, rx: i32, ry: i32) -> u32 {
        (self.region.context(bitmap, x, y) << self.reference_bits)
            | self.reference.context(reference, rx, ry)
    }
}
