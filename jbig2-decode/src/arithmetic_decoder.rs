//! The MQ arithmetic decoder (Annex E).
//!
//! "The arithmetic decoding procedure receives an arithmetically coded bit
//! sequence and an associated sequence of context labels, and reconstructs
//! the original string of binary symbols." (E.1.1)
//!
//! This is the decoder of E.3, where the code register holds the offset of
//! the coded value from the bottom of the current interval and the MPS
//! sub-interval lies on top of the LPS sub-interval.

use crate::context::{Context, ContextStats};

/// The arithmetic decoder state (E.3.1).
#[derive(Debug, Clone)]
pub(crate) struct ArithmeticDecoder<'a> {
    data: &'a [u8],
    /// `BP`, the position of the byte most recently fed into `C`.
    position: usize,
    /// The A-register, holding the size of the current interval.
    a: u32,
    /// The C-register. `Chigh` are bits 16 to 31.
    c: u32,
    /// `CT`, the number of bits left in `Clow` before the next BYTEIN.
    ct: u32,
}

impl<'a> ArithmeticDecoder<'a> {
    /// Create a new decoder and run INITDEC on `data`.
    pub(crate) fn new(data: &'a [u8]) -> Self {
        let mut decoder = Self {
            data,
            position: 0,
            a: 0,
            c: 0,
            ct: 0,
        };

        decoder.initialize();

        decoder
    }

    /// The length of the coded data.
    pub(crate) fn data_len(&self) -> usize {
        self.data.len()
    }

    /// Decode a bit using the context `cx` of `stats`.
    #[inline(always)]
    pub(crate) fn decode_bit(&mut self, stats: &mut ContextStats, cx: u32) -> u32 {
        self.decode(&mut stats[cx])
    }

    /// The DECODE procedure (E.3.2, Figure E.15).
    #[inline(always)]
    pub(crate) fn decode(&mut self, cx: &mut Context) -> u32 {
        let entry = &QE_TABLE[cx.index as usize];

        // "A = A - Qe(I(CX))"
        self.a -= entry.qe;

        if (self.c >> 16) < entry.qe {
            // The coded value lies in the lower sub-interval.
            let d = self.exchange_lps(cx, entry);
            self.renormalize();

            d
        } else {
            // "Chigh = Chigh - Qe(I(CX))"
            self.c -= entry.qe << 16;

            if self.a & 0x8000 == 0 {
                let d = self.exchange_mps(cx, entry);
                self.renormalize();

                d
            } else {
                cx.mps as u32
            }
        }
    }

    /// The INITDEC procedure (E.3.5, Figure E.20).
    fn initialize(&mut self) {
        // "C = B << 16"
        self.c = (self.current_byte() as u32) << 16;
        self.read_byte();

        // "C = C << 7; CT = CT - 7; A = 0x8000"
        self.c <<= 7;
        self.ct -= 7;
        self.a = 0x8000;
    }

    /// The BYTEIN procedure (E.3.4, Figure E.19).
    ///
    /// Past the end of the data, the decoder behaves as if the data was padded
    /// with 0xFF bytes.
    #[inline(always)]
    fn read_byte(&mut self) {
        if self.current_byte() == 0xFF {
            // "B1 > 0x8F?" A marker code: feed 1-bits without advancing.
            if self.next_byte() > 0x8F {
                self.c = self.c.wrapping_add(0xFF00);
                self.ct = 8;
            } else {
                // The byte following 0xFF carries a stuffed 0-bit.
                self.position += 1;
                self.c = self.c.wrapping_add((self.current_byte() as u32) << 9);
                self.ct = 7;
            }
        } else {
            self.position += 1;
            self.c = self.c.wrapping_add((self.current_byte() as u32) << 8);
            self.ct = 8;
        }
    }

    /// The RENORMD procedure (E.3.3, Figure E.18).
    #[inline(always)]
    fn renormalize(&mut self) {
        loop {
            if self.ct == 0 {
                self.read_byte();
            }

            self.a <<= 1;
            self.c <<= 1;
            self.ct -= 1;

            if self.a & 0x8000 != 0 {
                break;
            }
        }
    }

    /// The `MPS_EXCHANGE` procedure (Figure E.16).
    #[inline(always)]
    fn exchange_mps(&mut self, cx: &mut Context, entry: &QeEntry) -> u32 {
        if self.a < entry.qe {
            // The upper sub-interval was assigned to the LPS.
            let d = 1 - cx.mps;

            if entry.switch {
                cx.mps = 1 - cx.mps;
            }

            cx.index = entry.nlps;

            d as u32
        } else {
            cx.index = entry.nmps;

            cx.mps as u32
        }
    }

    /// The `LPS_EXCHANGE` procedure (Figure E.17).
    #[inline(always)]
    fn exchange_lps(&mut self, cx: &mut Context, entry: &QeEntry) -> u32 {
        let d = if self.a < entry.qe {
            // The lower sub-interval was assigned to the MPS.
            cx.index = entry.nmps;

            cx.mps
        } else {
            let d = 1 - cx.mps;

            if entry.switch {
                cx.mps = 1 - cx.mps;
            }

            cx.index = entry.nlps;

            d
        };

        self.a = entry.qe;

        d as u32
    }

    #[inline(always)]
    fn current_byte(&self) -> u8 {
        self.data.get(self.position).copied().unwrap_or(0xFF)
    }

    #[inline(always)]
    fn next_byte(&self) -> u8 {
        self.data.get(self.position + 1).copied().unwrap_or(0xFF)
    }

    #[cfg(test)]
    pub(crate) fn registers(&self) -> (u32, u32, u32) {
        (self.a, self.c, self.ct)
    }
}

/// A row of the Qe table.
#[derive(Debug, Clone, Copy)]
struct QeEntry {
    /// The LPS probability estimate.
    qe: u32,
    /// The next index after an MPS renormalization.
    nmps: u8,
    /// The next index after an LPS renormalization.
    nlps: u8,
    /// Whether MPS and LPS swap after an LPS renormalization.
    switch: bool,
}

const fn row(qe: u32, nmps: u8, nlps: u8, switch: u8) -> QeEntry {
    QeEntry {
        qe,
        nmps,
        nlps,
        switch: switch == 1,
    }
}

/// "Table E.1 - Qe values and probability estimation process"
#[rustfmt::skip]
static QE_TABLE: [QeEntry; 47] = [
    row(0x5601, 1, 1, 1),   row(0x3401, 2, 6, 0),   row(0x1801, 3, 9, 0),
    row(0x0AC1, 4, 12, 0),  row(0x0521, 5, 29, 0),  row(0x0221, 38, 33, 0),
    row(0x5601, 7, 6, 1),   row(0x5401, 8, 14, 0),  row(0x4801, 9, 14, 0),
    row(0x3801, 10, 14, 0), row(0x3001, 11, 17, 0), row(0x2401, 12, 18, 0),
    row(0x1C01, 13, 20, 0), row(0x1601, 29, 21, 0), row(0x5601, 15, 14, 1),
    row(0x5401, 16, 14, 0), row(0x5101, 17, 15, 0), row(0x4801, 18, 16, 0),
    row(0x3801, 19, 17, 0), row(0x3401, 20, 18, 0), row(0x3001, 21, 19, 0),
    row(0x2801, 22, 19, 0), row(0x2401, 23, 20, 0), row(0x2201, 24, 21, 0),
    row(0x1C01, 25, 22, 0), row(0x1801, 26, 23, 0), row(0x1601, 27, 24, 0),
    row(0x1401, 28, 25, 0), row(0x1201, 29, 26, 0), row(0x1101, 30, 27, 0),
    row(0x0AC1, 31, 28, 0), row(0x09C1, 32, 29, 0), row(0x08A1, 33, 30, 0),
    row(0x0521, 34, 31, 0), row(0x0441, 35, 32, 0), row(0x02A1, 36, 33, 0),
    row(0x0221, 37, 34, 0), row(0x0141, 38, 35, 0), row(0x0111, 39, 36, 0),
    row(0x0085, 40, 37, 0), row(0x0049, 41, 38, 0), row(0x0025, 42, 39, 0),
    row(0x0015, 43, 40, 0), row(0x0009, 44, 41, 0), row(0x0005, 45, 42, 0),
    row(0x0001, 45, 43, 0), row(0x5601, 46, 46, 0),
];
