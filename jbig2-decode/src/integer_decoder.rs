//! The integer arithmetic decoding procedure (Annex A.2).

use crate::arithmetic_decoder::ArithmeticDecoder;
use crate::context::ContextStats;
use crate::error::{Result, SymbolError};

/// An `IAx` decoder, such as IADH or IAFS.
///
/// "Each of these procedures uses its own set of 512 contexts." (A.2)
#[derive(Debug, Clone)]
pub(crate) struct IntegerDecoder {
    stats: ContextStats,
}

/// The value classes of Table A.1, selected by a unary prefix: the number of
/// magnitude bits and the offset that is added to them.
const VALUE_CLASSES: [(u8, u32); 6] = [
    (2, 0),
    (4, 4),
    (6, 20),
    (8, 84),
    (12, 340),
    (32, 4436),
];

impl IntegerDecoder {
    pub(crate) fn new() -> Self {
        Self {
            stats: ContextStats::new(512),
        }
    }

    /// Decode an integer. Returns `None` for OOB.
    ///
    /// Magnitudes that do not fit into an `i32` wrap around; callers validate
    /// decoded values before they are used as sizes or offsets.
    pub(crate) fn decode(&mut self, decoder: &mut ArithmeticDecoder<'_>) -> Option<i32> {
        // "1) Set: PREV = 1"
        let mut prev = 1_u32;

        // "2) Follow the flowchart in Figure A.1."
        let sign = self.decode_bit(decoder, &mut prev);

        // A run of 1-bits selects the value class, the last class has no
        // terminating 0-bit.
        let mut class = VALUE_CLASSES.len() - 1;
        for i in 0..class {
            if self.decode_bit(decoder, &mut prev) == 0 {
                class = i;
                break;
            }
        }

        let (bits, offset) = VALUE_CLASSES[class];

        let mut magnitude = 0_u32;
        for _ in 0..bits {
            magnitude = (magnitude << 1) | self.decode_bit(decoder, &mut prev);
        }

        interpret(sign, magnitude.wrapping_add(offset))
    }

    /// Decode an integer in a place where OOB is not a valid value.
    pub(crate) fn decode_no_oob(&mut self, decoder: &mut ArithmeticDecoder<'_>) -> Result<i32> {
        self.decode(decoder)
            .ok_or(SymbolError::UnexpectedOob.into())
    }

    /// Decode a bit and update PREV (A.2, step 3).
    #[inline(always)]
    fn decode_bit(&mut self, decoder: &mut ArithmeticDecoder<'_>, prev: &mut u32) -> u32 {
        let d = decoder.decode_bit(&mut self.stats, *prev);

        // "If PREV < 256 set: PREV = (PREV << 1) OR D
        // Otherwise set: PREV = (((PREV << 1) OR D) AND 511) OR 256"
        *prev = if *prev < 256 {
            (*prev << 1) | d
        } else {
            (((*prev << 1) | d) & 511) | 256
        };

        d
    }
}

/// Combine the sign bit S and the magnitude V (A.2, step 4).
///
/// "The result is OOB if S = 1 and V = 0, V if S = 0, and -V otherwise."
fn interpret(sign: u32, magnitude: u32) -> Option<i32> {
    match (sign, magnitude) {
        (0, v) => Some(v as i32),
        (_, 0) => None,
        (_, v) => Some((v as i32).wrapping_neg()),
    }
}
