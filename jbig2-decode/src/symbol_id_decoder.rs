//! The IAID decoding procedure (A.3).

use crate::arithmetic_decoder::ArithmeticDecoder;
use crate::context::ContextStats;
use crate::error::{Result, SymbolError};

/// The longest symbol code this decoder accepts. The contexts of a symbol ID
/// decoder grow with `2^SBSYMCODELEN`.
const MAX_CODE_LEN: u32 = 24;

#[derive(Debug, Clone)]
pub(crate) struct SymbolIdDecoder {
    stats: ContextStats,
    code_len: u32,
}

impl SymbolIdDecoder {
    pub(crate) fn new(code_len: u32) -> Result<Self> {
        if code_len > MAX_CODE_LEN {
            return Err(SymbolError::TooManySymbols.into());
        }

        // "The number of contexts required is 2^SBSYMCODELEN, which is less
        // than twice the maximum symbol ID." (A.3)
        Ok(Self {
            stats: ContextStats::with_context_bits(code_len),
            code_len,
        })
    }

    /// The code length needed to address `num_symbols` symbols,
    /// `⌈log2(num_symbols)⌉` (6.4.5, 6.5.8.2.3).
    pub(crate) fn code_len_for(num_symbols: u32) -> u32 {
        32 - num_symbols.saturating_sub(1).leading_zeros()
    }

    /// Decode a symbol ID.
    #[inline(always)]
    pub(crate) fn decode(&mut self, decoder: &mut ArithmeticDecoder<'_>) -> u32 {
        // "1) Set: PREV = 1"
        let mut prev = 1_u32;

        // "2) Decode SBSYMCODELEN bits as follows: [...] b) Set:
        // PREV = (PREV << 1) OR D"
        for _ in 0..self.code_len {
            let d = decoder.decode_bit(&mut self.stats, prev);
            prev = (prev << 1) | d;
        }

        // "3) Set: PREV = PREV - 2^SBSYMCODELEN"
        prev - (1 << self.code_len)
    }
}
