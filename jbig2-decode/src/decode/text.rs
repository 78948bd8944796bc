//! Text region segments (7.4.3) and the text region decoding procedure
//! (6.4).

use super::generic_refinement::{self, RefinementParams};
use super::{
    AdaptivePixel, DecodedRegion, RefinementTemplate, UNUSED_REFINEMENT_AT,
    parse_refinement_at_pixels, parse_region_segment_info,
};
use crate::arithmetic_decoder::ArithmeticDecoder;
use crate::bitmap::{Bitmap, CombinationOperator, MAX_SYMBOLS_PER_BYTE, check_region_size};
use crate::context::ContextStats;
use crate::error::{DecodeError, Feature, RegionError, Result, SymbolError, bail};
use crate::integer_decoder::IntegerDecoder;
use crate::reader::Reader;
use crate::symbol_id_decoder::SymbolIdDecoder;

/// Decode a text region segment that places instances of `symbols`, the
/// symbols exported by the referred symbol dictionaries.
pub(crate) fn decode(data: &[u8], symbols: &[&Bitmap]) -> Result<DecodedRegion> {
    let mut reader = Reader::new(data);
    let info = parse_region_segment_info(&mut reader)?;

    // 7.4.3.1.1
    let flags = reader.read_u16()?;

    // "Bit 0: SBHUFF"
    if flags & 0x0001 != 0 {
        bail!(Feature::Huffman);
    }

    // "Bit 1: SBREFINE"
    let refine = flags & 0x0002 != 0;
    // "Bits 2-3: LOGSBSTRIPS"
    let log_strips = ((flags >> 2) & 0x03) as u8;
    // "Bits 4-5: REFCORNER"
    let corner = ReferenceCorner::from_value(((flags >> 4) & 0x03) as u8);
    // "Bit 6: TRANSPOSED"
    let transposed = flags & 0x0040 != 0;
    // "Bits 7-8: SBCOMBOP"
    let operator = CombinationOperator::from_value(((flags >> 7) & 0x03) as u8)?;
    // "Bit 9: SBDEFPIXEL"
    let default_pixel = flags & 0x0200 != 0;
    // "Bits 10-14: SBDSOFFSET"
    let ds_offset = ds_offset(flags);
    // "Bit 15: SBRTEMPLATE"
    let refinement_template = RefinementTemplate::from_bit(flags & 0x8000 != 0);

    // "This field is only present if SBREFINE is 1 and SBRTEMPLATE is 0."
    // (7.4.3.1.3)
    let refinement_at = if refine && refinement_template == RefinementTemplate::Template0 {
        parse_refinement_at_pixels(&mut reader)?
    } else {
        UNUSED_REFINEMENT_AT
    };

    // "SBNUMINSTANCES" (7.4.3.1.4)
    let num_instances = reader.read_u32()?;

    check_region_size(info.width, info.height, data.len())?;

    if num_instances as u64 > (data.len() as u64).max(1) * MAX_SYMBOLS_PER_BYTE {
        bail!(SymbolError::TooManySymbols);
    }

    if symbols.is_empty() {
        bail!(SymbolError::NoSymbols);
    }

    ldebug!(
        "text region {}x{} at ({}, {}), {} instances of {} symbols, {:?}, transposed {}",
        info.width,
        info.height,
        info.x,
        info.y,
        num_instances,
        symbols.len(),
        corner,
        transposed
    );

    let params = TextRegionParams {
        width: info.width,
        height: info.height,
        refine,
        log_strips,
        corner,
        transposed,
        operator,
        default_pixel,
        ds_offset,
        num_instances,
        refinement_template,
        refinement_at,
    };

    // "SBSYMCODELEN = ⌈log2(SBNUMSYMS)⌉" (7.4.3.1.7, for SBHUFF = 0)
    let code_len = SymbolIdDecoder::code_len_for(symbols.len() as u32);
    let mut contexts = TextRegionContexts::new(code_len)?;
    let mut refinement_stats = ContextStats::with_context_bits(refinement_template.context_bits());
    let mut decoder = ArithmeticDecoder::new(reader.tail());

    let bitmap = decode_bitmap(
        &mut decoder,
        &mut contexts,
        &mut refinement_stats,
        symbols,
        &params,
    )?;

    Ok(DecodedRegion { info, bitmap })
}

/// SBDSOFFSET is a signed five-bit value in two's complement.
fn ds_offset(flags: u16) -> i32 {
    ((((flags >> 10) & 0x1F) as i32) ^ 0x10) - 0x10
}

/// The corner of a symbol instance that lies at its coordinates (Table 9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReferenceCorner {
    BottomLeft,
    TopLeft,
    BottomRight,
    TopRight,
}

impl ReferenceCorner {
    fn from_value(value: u8) -> Self {
        match value & 0x03 {
            0 => Self::BottomLeft,
            1 => Self::TopLeft,
            2 => Self::BottomRight,
            _ => Self::TopRight,
        }
    }

    fn is_left(self) -> bool {
        matches!(self, Self::TopLeft | Self::BottomLeft)
    }

    fn is_top(self) -> bool {
        matches!(self, Self::TopLeft | Self::TopRight)
    }
}

/// The parameters of the text region decoding procedure (Table 9) that apply
/// to arithmetic coding.
#[derive(Debug, Clone)]
pub(crate) struct TextRegionParams {
    /// `SBW`
    pub(crate) width: u32,
    /// `SBH`
    pub(crate) height: u32,
    /// `SBREFINE`
    pub(crate) refine: bool,
    /// `LOGSBSTRIPS`
    pub(crate) log_strips: u8,
    /// `REFCORNER`
    pub(crate) corner: ReferenceCorner,
    /// `TRANSPOSED`
    pub(crate) transposed: bool,
    /// `SBCOMBOP`
    pub(crate) operator: CombinationOperator,
    /// `SBDEFPIXEL`
    pub(crate) default_pixel: bool,
    /// `SBDSOFFSET`
    pub(crate) ds_offset: i32,
    /// `SBNUMINSTANCES`
    pub(crate) num_instances: u32,
    /// `SBRTEMPLATE`
    pub(crate) refinement_template: RefinementTemplate,
    /// `SBRATX1`, `SBRATY1`, `SBRATX2` and `SBRATY2`
    pub(crate) refinement_at: [AdaptivePixel; 2],
}

impl TextRegionParams {
    /// `SBSTRIPS`
    fn strip_size(&self) -> i32 {
        1 << self.log_strips
    }
}

/// The integer decoders of a text region.
///
/// Symbol dictionaries that use refinement and aggregate coding decode their
/// symbols with a single set of these, shared by all aggregated and refined
/// symbols of the dictionary (6.5.8.2).
#[derive(Debug, Clone)]
pub(crate) struct TextRegionContexts {
    pub(crate) iadt: IntegerDecoder,
    pub(crate) iafs: IntegerDecoder,
    pub(crate) iads: IntegerDecoder,
    pub(crate) iait: IntegerDecoder,
    pub(crate) iaid: SymbolIdDecoder,
    pub(crate) iari: IntegerDecoder,
    pub(crate) iardw: IntegerDecoder,
    pub(crate) iardh: IntegerDecoder,
    pub(crate) iardx: IntegerDecoder,
    pub(crate) iardy: IntegerDecoder,
}

impl TextRegionContexts {
    pub(crate) fn new(code_len: u32) -> Result<Self> {
        Ok(Self {
            iadt: IntegerDecoder::new(),
            iafs: IntegerDecoder::new(),
            iads: IntegerDecoder::new(),
            iait: IntegerDecoder::new(),
            iaid: SymbolIdDecoder::new(code_len)?,
            iari: IntegerDecoder::new(),
            iardw: IntegerDecoder::new(),
            iardh: IntegerDecoder::new(),
            iardx: IntegerDecoder::new(),
            iardy: IntegerDecoder::new(),
        })
    }
}

fn add(a: i32, b: i32) -> Result<i32> {
    a.checked_add(b).ok_or(DecodeError::Overflow)
}

/// Decode a text region bitmap (6.4.5).
pub(crate) fn decode_bitmap(
    decoder: &mut ArithmeticDecoder<'_>,
    contexts: &mut TextRegionContexts,
    refinement_stats: &mut ContextStats,
    symbols: &[&Bitmap],
    params: &TextRegionParams,
) -> Result<Bitmap> {
    check_region_size(params.width, params.height, decoder.data_len())?;

    // "1) Fill a bitmap SBREG, of the size given by SBW and SBH, with the
    // SBDEFPIXEL value."
    let mut region = Bitmap::filled(params.width, params.height, params.default_pixel)?;
    let strips = params.strip_size();

    // "2) Decode the initial STRIPT value as described in 6.4.6. Negate the
    // decoded value and assign this negated value to the variable STRIPT.
    // Assign the value 0 to FIRSTS. Assign the value 0 to NINSTANCES."
    let mut strip_t = contexts.iadt.decode_no_oob(decoder)?
        .checked_mul(-strips)
        .ok_or(DecodeError::Overflow)?;
    let mut first_s = 0_i32;
    let mut instances = 0_u32;

    // "4) Repeat step 3) until NINSTANCES = SBNUMINSTANCES."
    while instances < params.num_instances {
        // "3) a) Decode the strip's delta T value as described in 6.4.6. Let
        // DT be the decoded value. Set: STRIPT = STRIPT + DT"
        let dt = contexts.iadt.decode_no_oob(decoder)?
            .checked_mul(strips)
            .ok_or(DecodeError::Overflow)?;
        strip_t = add(strip_t, dt)?;

        // "b) Decode each symbol instance in the strip as follows:"
        let mut cur_s;

        // "i) If the current symbol instance is the first symbol instance in
        // the strip, then decode the first symbol instance's S coordinate as
        // described in 6.4.7. Let DFS be the decoded value. Set:
        // FIRSTS = FIRSTS + DFS, CURS = FIRSTS"
        let dfs = contexts.iafs.decode_no_oob(decoder)?;
        first_s = add(first_s, dfs)?;
        cur_s = first_s;

        loop {
            // "iii) Decode the symbol instance's T coordinate as described in
            // 6.4.9. Let CURT be the decoded value. Set: TI = STRIPT + CURT"
            let cur_t = if strips == 1 {
                0
            } else {
                contexts.iait.decode_no_oob(decoder)?
            };
            let t = add(strip_t, cur_t)?;

            // "iv) Decode the symbol instance's symbol ID as described in
            // 6.4.10. Let ID be the decoded value."
            let id = contexts.iaid.decode(decoder) as usize;
            let symbol = *symbols.get(id).ok_or(SymbolError::OutOfRange)?;

            // "v) Determine the symbol instance's bitmap IB_I as described in
            // 6.4.11."
            let refined = if params.refine && contexts.iari.decode_no_oob(decoder)? != 0 {
                Some(refine_instance(
                    decoder,
                    contexts,
                    refinement_stats,
                    symbol,
                    params,
                )?)
            } else {
                None
            };
            let instance = refined.as_ref().unwrap_or(symbol);

            let width = instance.width() as i32;
            let height = instance.height() as i32;

            // "vi) Update CURS as follows: [...]"
            if !params.transposed && !params.corner.is_left() {
                cur_s = add(cur_s, width - 1)?;
            } else if params.transposed && !params.corner.is_top() {
                cur_s = add(cur_s, height - 1)?;
            }

            // "vii) Set: SI = CURS"
            let s = cur_s;

            // "viii) Determine the location of the symbol instance bitmap
            // with respect to SBREG as follows: [...]"
            let (x, y) = if params.transposed { (t, s) } else { (s, t) };
            let x = if params.corner.is_left() {
                x
            } else {
                add(x, 1 - width)?
            };
            let y = if params.corner.is_top() {
                y
            } else {
                add(y, 1 - height)?
            };

            // "ix) Draw IB_I into SBREG. Combine each pixel of IB_I with the
            // current value of the corresponding pixel in SBREG, using the
            // combination operator specified by SBCOMBOP."
            region.blit(instance, x, y, params.operator);

            // "x) Update CURS as follows: [...]"
            if !params.transposed && params.corner.is_left() {
                cur_s = add(cur_s, width - 1)?;
            } else if params.transposed && params.corner.is_top() {
                cur_s = add(cur_s, height - 1)?;
            }

            // "xi) Set: NINSTANCES = NINSTANCES + 1"
            instances += 1;

            // "ii) Otherwise, decode the symbol instance's S coordinate as
            // described in 6.4.8. If the result of this decoding is OOB then
            // the last symbol instance of the strip has been decoded; proceed
            // to step 3 d). Otherwise, let IDS be the decoded value. Set:
            // CURS = CURS + IDS + SBDSOFFSET"
            let Some(ids) = contexts.iads.decode(decoder) else {
                break;
            };

            if instances >= params.num_instances {
                bail!(SymbolError::TooManySymbols);
            }

            cur_s = add(add(cur_s, ids)?, params.ds_offset)?;
        }
    }

    Ok(region)
}

/// Decode the refined bitmap of a symbol instance whose refinement image
/// indicator is 1 (6.4.11).
fn refine_instance(
    decoder: &mut ArithmeticDecoder<'_>,
    contexts: &mut TextRegionContexts,
    refinement_stats: &mut ContextStats,
    symbol: &Bitmap,
    params: &TextRegionParams,
) -> Result<Bitmap> {
    // "1) Decode the symbol instance refinement delta width [...]
    // 4) Decode the symbol instance refinement Y offset"
    let rdw = contexts.iardw.decode_no_oob(decoder)?;
    let rdh = contexts.iardh.decode_no_oob(decoder)?;
    let rdx = contexts.iardx.decode_no_oob(decoder)?;
    let rdy = contexts.iardy.decode_no_oob(decoder)?;

    let size = |size: u32, delta: i32| {
        u32::try_from(size as i64 + delta as i64).map_err(|_| RegionError::InvalidDimension)
    };

    // Table 12.
    let width = size(symbol.width(), rdw)?;
    let height = size(symbol.height(), rdh)?;
    let refinement = RefinementParams {
        template: params.refinement_template,
        at: params.refinement_at,
        reference: symbol,
        // "GRREFERENCEDX = ⌊RDW_I / 2⌋ + RDX_I"
        dx: add(rdw.div_euclid(2), rdx)?,
        // "GRREFERENCEDY = ⌊RDH_I / 2⌋ + RDY_I"
        dy: add(rdh.div_euclid(2), rdy)?,
        tpgron: false,
    };

    ltrace!(
        "refined text instance {}x{}, reference offset ({}, {})",
        width,
        height,
        refinement.dx,
        refinement.dy
    );

    generic_refinement::decode_bitmap(decoder, refinement_stats, width, height, &refinement)
}
