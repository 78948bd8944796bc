//! Pattern dictionary segments (7.4.4) and the pattern dictionary decoding
//! procedure (6.7).

use alloc::vec;
use alloc::vec::Vec;

use super::generic::{self, GenericParams};
use super::{AdaptivePixel, Template};
use crate::arithmetic_decoder::ArithmeticDecoder;
use crate::bitmap::{Bitmap, MAX_SYMBOLS_PER_BYTE, check_region_size};
use crate::context::ContextStats;
use crate::error::{DecodeError, Feature, Result, SymbolError, bail};
use crate::reader::Reader;

/// A decoded pattern dictionary.
#[derive(Debug, Clone)]
pub(crate) struct PatternDictionary {
    /// `HDPATS`
    pub(crate) patterns: Vec<Bitmap>,
    /// `HDPW`
    pub(crate) pattern_width: u32,
    /// `HDPH`
    pub(crate) pattern_height: u32,
}

/// Decode a pattern dictionary segment.
pub(crate) fn decode(data: &[u8]) -> Result<PatternDictionary> {
    let mut reader = Reader::new(data);

    // 7.4.4.1.1
    let flags = reader.read_byte()?;

    // "Bit 0: HDMMR"
    if flags & 0x01 != 0 {
        bail!(Feature::Mmr);
    }

    // "Bits 1-2: HDTEMPLATE"
    let template = Template::from_value(flags >> 1);

    if flags & 0xF8 != 0 {
        lwarn!("reserved pattern dictionary flags are set: {:#04x}", flags);
    }

    let pattern_width = reader.read_byte()? as u32;
    let pattern_height = reader.read_byte()? as u32;
    let gray_max = reader.read_u32()?;

    // "1) Create a bitmap B_HDC. The height of this bitmap is HDPH. The width
    // of the bitmap is (GRAYMAX + 1) × HDPW." (6.7.5)
    let num_patterns = gray_max.checked_add(1).ok_or(DecodeError::Overflow)?;

    if num_patterns as u64 > (data.len() as u64).max(1) * MAX_SYMBOLS_PER_BYTE {
        bail!(SymbolError::TooManySymbols);
    }

    let collective_width = num_patterns
        .checked_mul(pattern_width)
        .ok_or(DecodeError::Overflow)?;

    check_region_size(collective_width, pattern_height, data.len())?;

    ldebug!(
        "pattern dictionary of {} patterns of {}x{}, {:?}",
        num_patterns,
        pattern_width,
        pattern_height,
        template
    );

    // Table 27: "GBATX1 = −HDPW, GBATY1 = 0", the other AT pixels of template
    // 0 at their nominal locations.
    let mut at = template.nominal_at_pixels();
    at[0] = AdaptivePixel {
        x: -(pattern_width as i32),
        y: 0,
    };

    // "2) Decode the collective bitmap using a generic region decoding
    // procedure as described in 6.2." (6.7.5)
    let params = GenericParams {
        template,
        at: &at,
        tpgdon: false,
        skip: None,
    };
    let mut decoder = ArithmeticDecoder::new(reader.tail());
    let mut stats = ContextStats::with_context_bits(template.context_bits());
    let collective = generic::decode_bitmap(
        &mut decoder,
        &mut stats,
        collective_width,
        pattern_height,
        &params,
    )?;

    // "4) While GRAY ≤ GRAYMAX: a) Let the subimage of B_HDC consisting of
    // HDPH rows and columns HDPW × GRAY through HDPW × (GRAY + 1) − 1 be
    // denoted B_P. Set: HDPATS[GRAY] = B_P"
    let patterns = (0..num_patterns)
        .map(|gray| collective.crop(gray * pattern_width, 0, pattern_width, pattern_height))
        .collect::<Result<Vec<_>>>()?;

    Ok(PatternDictionary {
        patterns,
        pattern_width,
        pattern_height,
    })
}

impl PatternDictionary {
    /// A dictionary of patterns that are given directly.
    #[cfg(test)]
    pub(crate) fn from_patterns(patterns: Vec<Bitmap>) -> Self {
        let (pattern_width, pattern_height) = patterns
            .first()
            .map_or((0, 0), |p| (p.width(), p.height()));

        Self {
            patterns,
            pattern_width,
            pattern_height,
        }
    }

    /// Collect the patterns of several dictionaries into one.
    pub(crate) fn concat<'a>(dictionaries: impl IntoIterator<Item = &'a Self>) -> Option<Self> {
        let mut dictionaries = dictionaries.into_iter();
        let first = dictionaries.next()?;
        let mut patterns = first.patterns.clone();

        for dictionary in dictionaries {
            if (dictionary.pattern_width, dictionary.pattern_height)
                != (first.pattern_width, first.pattern_height)
            {
                lwarn!("referred pattern dictionaries have different pattern sizes");
            }

            patterns.extend(dictionary.patterns.iter().cloned());
        }

        Some(Self {
            patterns,
            pattern_width: first.pattern_width,
            pattern_height: first.pattern_height,
        })
    }
}
