//! The gray-scale image decoding procedure (Annex C).

use alloc::vec;
use alloc::vec::Vec;

use crate::arithmetic_decoder::ArithmeticDecoder;
use crate::bitmap::{Bitmap, CombinationOperator, check_region_size};
use crate::context::ContextStats;
use crate::decode::Template;
use crate::decode::generic::{self, GenericParams};
use crate::error::Result;

/// The parameters of the gray-scale image decoding procedure (Table C.1)
/// that apply to arithmetic coding.
#[derive(Debug, Clone)]
pub(crate) struct GrayScaleParams<'a> {
    /// `GSBPP`
    pub(crate) bits_per_value: u32,
    /// `GSW`
    pub(crate) width: u32,
    /// `GSH`
    pub(crate) height: u32,
    /// `GSTEMPLATE`
    pub(crate) template: Template,
    /// `GSKIP`, if `GSUSESKIP` is 1.
    pub(crate) skip: Option<&'a Bitmap>,
}

/// Decode the gray-scale image `GSVALS` in row-major order (C.5).
pub(crate) fn decode_gray_scale_image(data: &[u8], params: &GrayScaleParams<'_>) -> Result<Vec<u32>> {
    check_region_size(params.width, params.height, data.len())?;

    // Table C.4: "GBTEMPLATE = GSTEMPLATE, TPGDON = 0, USESKIP = GSUSESKIP,
    // SKIP = GSKIP", with the AT pixels at their nominal locations.
    let at = params.template.nominal_at_pixels();
    let generic_params = GenericParams {
        template: params.template,
        at: &at,
        tpgdon: false,
        skip: params.skip,
    };

    // All planes are decoded with the same statistics.
    let mut decoder = ArithmeticDecoder::new(data);
    let mut stats = ContextStats::with_context_bits(params.template.context_bits());
    let mut decode_plane = || {
        generic::decode_bitmap(
            &mut decoder,
            &mut stats,
            params.width,
            params.height,
            &generic_params,
        )
    };

    let mut values = vec![0_u32; params.width as usize * params.height as usize];

    // "1) Decode GSPLANES[GSBPP – 1] using the generic region decoding
    // procedure. [...] 2) Set J = GSBPP – 2. 3) While J >= 0 [...]"
    let mut previous: Option<Bitmap> = None;

    for j in (0..params.bits_per_value).rev() {
        let mut plane = decode_plane()?;

        // "b) For each pixel (x, y) in GSPLANES[J], set:
        // GSPLANES[J][x, y] = GSPLANES[J + 1][x, y] XOR GSPLANES[J][x, y]"
        if let Some(previous) = &previous {
            plane.blit(previous, 0, 0, CombinationOperator::Xor);
        }

        // "4) For each (x, y), set: GSVALS[x, y] = Σ GSPLANES[J][x, y] × 2^J"
        accumulate(&mut values, &plane, j);

        previous = Some(plane);
    }

    Ok(values)
}

fn accumulate(values: &mut [u32], plane: &Bitmap, j: u32) {
    let width = plane.width() as usize;

    for y in 0..plane.height() {
        for x in 0..plane.width() {
            if plane.get_pixel(x, y) {
                values[y as usize * width + x as usize] |= 1 << j;
            }
        }
    }
}
