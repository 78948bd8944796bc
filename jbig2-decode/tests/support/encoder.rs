//! Test-only encoders for producing JBIG2 data with known content.
//!
//! This contains the arithmetic encoder of T.88 Annex E, the matching integer
//! and symbol ID coding procedures, template-based encoders for generic and
//! refinement bitmaps, and builders for segment headers and files. None of
//! this depends on the decoder crate, so that the decoders are checked against
//! an independent implementation.

#![allow(dead_code, missing_docs, unreachable_pub)]

use std::vec;
use std::vec::Vec;

/// The state of one context (E.2.4).
#[derive(Debug, Clone, Copy, Default)]
pub struct Cell {
    index: u8,
    mps: u8,
}

/// Create a context table for contexts formed from `bits` pixels.
pub fn cells(bits: u32) -> Vec<Cell> {
    vec![Cell::default(); 1 << bits]
}

/// Table E.1: `(Qe, NMPS, NLPS, SWITCH)`.
#[rustfmt::skip]
const QE: [(u32, u8, u8, bool); 47] = [
    (0x5601, 1, 1, true), (0x3401, 2, 6, false), (0x1801, 3, 9, false),
    (0x0AC1, 4, 12, false), (0x0521, 5, 29, false), (0x0221, 38, 33, false),
    (0x5601, 7, 6, true), (0x5401, 8, 14, false), (0x4801, 9, 14, false),
    (0x3801, 10, 14, false), (0x3001, 11, 17, false), (0x2401, 12, 18, false),
    (0x1C01, 13, 20, false), (0x1601, 29, 21, false), (0x5601, 15, 14, true),
    (0x5401, 16, 14, false), (0x5101, 17, 15, false), (0x4801, 18, 16, false),
    (0x3801, 19, 17, false), (0x3401, 20, 18, false), (0x3001, 21, 19, false),
    (0x2801, 22, 19, false), (0x2401, 23, 20, false), (0x2201, 24, 21, false),
    (0x1C01, 25, 22, false), (0x1801, 26, 23, false), (0x1601, 27, 24, false),
    (0x1401, 28, 25, false), (0x1201, 29, 26, false), (0x1101, 30, 27, false),
    (0x0AC1, 31, 28, false), (0x09C1, 32, 29, false), (0x08A1, 33, 30, false),
    (0x0521, 34, 31, false), (0x0441, 35, 32, false), (0x02A1, 36, 33, false),
    (0x0221, 37, 34, false), (0x0141, 38, 35, false), (0x0111, 39, 36, false),
    (0x0085, 40, 37, false), (0x0049, 41, 38, false), (0x0025, 42, 39, false),
    (0x0015, 43, 40, false), (0x0009, 44, 41, false), (0x0005, 45, 42, false),
    (0x0001, 45, 43, false), (0x5601, 46, 46, false),
];

/// The arithmetic encoder (E.2).
#[derive(Debug)]
pub struct MqEncoder {
    a: u32,
    c: u32,
    ct: u32,
    out: Vec<u8>,
}

impl MqEncoder {
    /// INITENC (Figure E.5).
    pub fn new() -> Self {
        Self {
            a: 0x8000,
            c: 0,
            ct: 12,
            out: Vec::new(),
        }
    }

    /// Encode `bit` in the context `cx` of `table`.
    pub fn encode_in(&mut self, table: &mut [Cell], cx: u32, bit: u32) {
        self.encode(&mut table[cx as usize], bit);
    }

    /// ENCODE (Figure E.3).
    pub fn encode(&mut self, cell: &mut Cell, bit: u32) {
        let (qe, nmps, nlps, switch) = QE[cell.index as usize];

        self.a -= qe;

        if bit == cell.mps as u32 {
            // CODEMPS (Figure E.6)
            if self.a & 0x8000 == 0 {
                if self.a < qe {
                    self.a = qe;
                } else {
                    self.c += qe;
                }
                cell.index = nmps;
                self.renormalize();
            } else {
                self.c += qe;
            }
        } else {
            // CODELPS (Figure E.5)
            if self.a < qe {
                self.c += qe;
            } else {
                self.a = qe;
            }
            if switch {
                cell.mps = 1 - cell.mps;
            }
            cell.index = nlps;
            self.renormalize();
        }
    }

    /// FLUSH (Figure E.9) followed by the 0xFF 0xAC marker.
    pub fn finish(mut self) -> Vec<u8> {
        // SETBITS
        let temp = self.c + self.a;
        self.c |= 0xFFFF;
        if self.c >= temp {
            self.c -= 0x8000;
        }

        self.c <<= self.ct;
        self.byte_out();
        self.c <<= self.ct;
        self.byte_out();

        if self.out.last() != Some(&0xFF) {
            self.out.push(0xFF);
        }
        self.out.push(0xAC);

        self.out
    }

    /// RENORME (Figure E.7).
    fn renormalize(&mut self) {
        loop {
            self.a <<= 1;
            self.c <<= 1;
            self.ct -= 1;

            if self.ct == 0 {
                self.byte_out();
            }

            if self.a & 0x8000 != 0 {
                break;
            }
        }
    }

    /// BYTEOUT (Figure E.8). The byte before the first output byte is
    /// implicitly 0.
    fn byte_out(&mut self) {
        let last = self.out.last().copied().unwrap_or(0);

        if last == 0xFF {
            self.push_stuffed();
        } else if self.c < 0x800_0000 {
            self.push_plain();
        } else {
            // Propagate the carry into the previous byte.
            let carried = last + 1;
            if let Some(b) = self.out.last_mut() {
                *b = carried;
            }

            if carried == 0xFF {
                self.c &= 0x7FF_FFFF;
                self.push_stuffed();
            } else {
                self.push_plain();
            }
        }
    }

    fn push_stuffed(&mut self) {
        self.out.push((self.c >> 20) as u8);
        self.c &= 0xF_FFFF;
        self.ct = 7;
    }

    fn push_plain(&mut self) {
        self.out.push((self.c >> 19) as u8);
        self.c &= 0x7_FFFF;
        self.ct = 8;
    }
}

/// An `IAx` encoder (A.2).
pub struct IntegerEncoder {
    cells: Vec<Cell>,
}

impl IntegerEncoder {
    pub fn new() -> Self {
        Self { cells: cells(9) }
    }

    /// Encode a value, `None` being OOB.
    pub fn encode(&mut self, mq: &mut MqEncoder, value: Option<i32>) {
        const CLASSES: [(u32, u32); 6] = [(2, 0), (4, 4), (6, 20), (8, 84), (12, 340), (32, 4436)];

        let (sign, magnitude) = match value {
            None => (1, 0),
            Some(v) => (u32::from(v < 0), v.unsigned_abs()),
        };

        let class = CLASSES
            .iter()
            .position(|&(bits, offset)| bits == 32 || magnitude - offset < (1 << bits))
            .unwrap();
        let (bits, offset) = CLASSES[class];

        let mut prev = 1;
        self.encode_bit(mq, &mut prev, sign);

        for _ in 0..class {
            self.encode_bit(mq, &mut prev, 1);
        }
        if class < CLASSES.len() - 1 {
            self.encode_bit(mq, &mut prev, 0);
        }

        let payload = (magnitude - offset) as u64;
        for i in (0..bits).rev() {
            self.encode_bit(mq, &mut prev, ((payload >> i) & 1) as u32);
        }
    }

    fn encode_bit(&mut self, mq: &mut MqEncoder, prev: &mut u32, bit: u32) {
        mq.encode_in(&mut self.cells, *prev, bit);

        *prev = if *prev < 256 {
            (*prev << 1) | bit
        } else {
            (((*prev << 1) | bit) & 511) | 256
        };
    }
}

/// The IAID encoder (A.3).
pub struct IdEncoder {
    cells: Vec<Cell>,
    code_len: u32,
}

impl IdEncoder {
    pub fn new(code_len: u32) -> Self {
        Self {
            cells: cells(code_len),
            code_len,
        }
    }

    pub fn encode(&mut self, mq: &mut MqEncoder, id: u32) {
        let mut prev = 1;

        for i in (0..self.code_len).rev() {
            let bit = (id >> i) & 1;
            mq.encode_in(&mut self.cells, prev, bit);
            prev = (prev << 1) | bit;
        }
    }
}

/// A plain bitonal image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<bool>,
}

impl Image {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![false; (width * height) as usize],
        }
    }

    /// Build an image from rows where `#` is black.
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |r| r.len() as u32);
        let pixels = rows
            .iter()
            .flat_map(|row| row.bytes().map(|b| b == b'#'))
            .collect();

        Self {
            width,
            height,
            pixels,
        }
    }

    /// A deterministic pseudo-random image with roughly `density` percent
    /// black pixels.
    pub fn noise(width: u32, height: u32, seed: u32, density: u32) -> Self {
        let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
        let pixels = (0..width * height)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state % 100 < density
            })
            .collect();

        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn get(&self, x: i32, y: i32) -> u32 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            0
        } else {
            u32::from(self.pixels[(y as u32 * self.width + x as u32) as usize])
        }
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        self.pixels[(y * self.width + x) as usize] = value;
    }

    /// Copy of the rectangle at `(x, y)` of size `width` x `height`.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Self {
        let mut out = Self::new(width, height);
        for row in 0..height {
            for col in 0..width {
                out.set(col, row, self.get((x + col) as i32, (y + row) as i32) == 1);
            }
        }
        out
    }

    /// Pack the image MSB first with rows padded to whole bytes.
    pub fn packed(&self) -> Vec<u8> {
        let stride = self.width.div_ceil(8) as usize;
        let mut out = vec![0_u8; stride * self.height as usize];
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x as i32, y as i32) == 1 {
                    out[y as usize * stride + x as usize / 8] |= 0x80 >> (x % 8);
                }
            }
        }
        out
    }

    fn row_equals_previous(&self, y: u32) -> bool {
        (0..self.width as i32).all(|x| self.get(x, y as i32) == self.get(x, y as i32 - 1))
    }
}

enum Tap {
    Fixed(i32, i32),
    At(usize),
}

use Tap::{At, Fixed};

/// Figures 3 to 6, most significant bit first.
#[rustfmt::skip]
fn generic_taps(template: u8) -> &'static [Tap] {
    match template {
        0 => &[
            At(3), Fixed(-1, -2), Fixed(0, -2), Fixed(1, -2), At(2),
            At(1), Fixed(-2, -1), Fixed(-1, -1), Fixed(0, -1), Fixed(1, -1), Fixed(2, -1), At(0),
            Fixed(-4, 0), Fixed(-3, 0), Fixed(-2, 0), Fixed(-1, 0),
        ],
        1 => &[
            Fixed(-1, -2), Fixed(0, -2), Fixed(1, -2), Fixed(2, -2),
            Fixed(-2, -1), Fixed(-1, -1), Fixed(0, -1), Fixed(1, -1), Fixed(2, -1), At(0),
            Fixed(-3, 0), Fixed(-2, 0), Fixed(-1, 0),
        ],
        2 => &[
            Fixed(-1, -2), Fixed(0, -2), Fixed(1, -2),
            Fixed(-2, -1), Fixed(-1, -1), Fixed(0, -1), Fixed(1, -1), At(0),
            Fixed(-2, 0), Fixed(-1, 0),
        ],
        _ => &[
            Fixed(-3, -1), Fixed(-2, -1), Fixed(-1, -1), Fixed(0, -1), Fixed(1, -1), At(0),
            Fixed(-4, 0), Fixed(-3, 0), Fixed(-2, 0), Fixed(-1, 0),
        ],
    }
}

pub fn generic_context_bits(template: u8) -> u32 {
    generic_taps(template).len() as u32
}

/// The default adaptive pixels of 6.2.5.4 for a template.
pub fn nominal_at(template: u8) -> Vec<(i8, i8)> {
    match template {
        0 => vec![(3, -1), (-3, -1), (2, -2), (-2, -2)],
        1 => vec![(3, -1)],
        _ => vec![(2, -1)],
    }
}

/// Parameters for [`encode_generic`].
pub struct GenericParams<'a> {
    pub template: u8,
    pub at: Vec<(i8, i8)>,
    pub tpgdon: bool,
    /// Pixels that are not coded and read back as 0.
    pub skip: Option<&'a Image>,
}

impl GenericParams<'_> {
    pub fn new(template: u8) -> Self {
        Self {
            template,
            at: nominal_at(template),
            tpgdon: false,
            skip: None,
        }
    }
}

/// Generic region encoding with a template (the inverse of 6.2.5.7).
pub fn encode_generic(
    mq: &mut MqEncoder,
    stats: &mut [Cell],
    image: &Image,
    params: &GenericParams<'_>,
) {
    let taps = generic_taps(params.template);
    let sltp_context = match params.template {
        0 => 0x9B25,
        1 => 0x0795,
        2 => 0x00E5,
        _ => 0x0195,
    };

    let mut ltp = false;

    for y in 0..image.height {
        if params.tpgdon {
            let typical = image.row_equals_previous(y);
            mq.encode_in(stats, sltp_context, u32::from(typical != ltp));
            ltp = typical;

            if ltp {
                continue;
            }
        }

        for x in 0..image.width {
            if params.skip.is_some_and(|skip| skip.get(x as i32, y as i32) == 1) {
                continue;
            }

            let mut cx = 0;
            for tap in taps {
                let (dx, dy) = match *tap {
                    Fixed(dx, dy) => (dx, dy),
                    At(i) => (params.at[i].0 as i32, params.at[i].1 as i32),
                };
                cx = (cx << 1) | image.get(x as i32 + dx, y as i32 + dy);
            }

            mq.encode_in(stats, cx, image.get(x as i32, y as i32));
        }
    }
}

/// Encode an image into a self-contained arithmetic coded stream.
pub fn encode_generic_standalone(image: &Image, params: &GenericParams<'_>) -> Vec<u8> {
    let mut mq = MqEncoder::new();
    let mut stats = cells(generic_context_bits(params.template));
    encode_generic(&mut mq, &mut stats, image, params);
    mq.finish()
}

/// Parameters for [`encode_refinement`].
pub struct RefinementParams<'a> {
    pub template: u8,
    pub at: [(i8, i8); 2],
    pub reference: &'a Image,
    pub dx: i32,
    pub dy: i32,
    pub tpgron: bool,
}

impl<'a> RefinementParams<'a> {
    pub fn new(template: u8, reference: &'a Image) -> Self {
        Self {
            template,
            at: [(-1, -1), (-1, -1)],
            reference,
            dx: 0,
            dy: 0,
            tpgron: false,
        }
    }
}

pub fn refinement_context_bits(template: u8) -> u32 {
    if template == 0 { 13 } else { 10 }
}

/// Refinement encoding (the inverse of 6.3.5.6).
pub fn encode_refinement(
    mq: &mut MqEncoder,
    stats: &mut [Cell],
    image: &Image,
    params: &RefinementParams<'_>,
) {
    let reference = params.reference;
    let sltp_context = if params.template == 0 { 0x0010 } else { 0x0008 };

    let context = |x: i32, y: i32| -> u32 {
        let rx = x - params.dx;
        let ry = y - params.dy;

        let (own, refs): (Vec<(i32, i32)>, Vec<(i32, i32)>) = if params.template == 0 {
            let (a1, a2) = (params.at[0], params.at[1]);
            (
                vec![(a1.0 as i32, a1.1 as i32), (0, -1), (1, -1), (-1, 0)],
                vec![
                    (a2.0 as i32, a2.1 as i32),
                    (0, -1),
                    (1, -1),
                    (-1, 0),
                    (0, 0),
                    (1, 0),
                    (-1, 1),
                    (0, 1),
                    (1, 1),
                ],
            )
        } else {
            (
                vec![(-1, -1), (0, -1), (1, -1), (-1, 0)],
                vec![(0, -1), (-1, 0), (0, 0), (1, 0), (0, 1), (1, 1)],
            )
        };

        let mut cx = 0;
        for (dx, dy) in own {
            cx = (cx << 1) | image.get(x + dx, y + dy);
        }
        for (dx, dy) in refs {
            cx = (cx << 1) | reference.get(rx + dx, ry + dy);
        }
        cx
    };

    // The predicted value of a pixel, if its 3x3 reference neighbourhood is
    // uniform.
    let prediction = |x: i32, y: i32| -> Option<u32> {
        let rx = x - params.dx;
        let ry = y - params.dy;
        let center = reference.get(rx, ry);
        let uniform = (-1..=1).all(|dy| (-1..=1).all(|dx| reference.get(rx + dx, ry + dy) == center));
        uniform.then_some(center)
    };

    let mut ltp = false;

    for y in 0..image.height as i32 {
        if params.tpgron {
            let typical = (0..image.width as i32)
                .all(|x| prediction(x, y).is_none_or(|p| p == image.get(x, y)));
            mq.encode_in(stats, sltp_context, u32::from(typical != ltp));
            ltp = typical;
        }

        for x in 0..image.width as i32 {
            if ltp && prediction(x, y).is_some() {
                continue;
            }

            mq.encode_in(stats, context(x, y), image.get(x, y));
        }
    }
}

/// Gray-scale image encoding with a template (the inverse of C.5). `values`
/// are row-major gray values of a `width` x `height` grid.
pub fn encode_gray_scale(
    values: &[u32],
    width: u32,
    height: u32,
    bits_per_value: u32,
    template: u8,
    skip: Option<&Image>,
) -> Vec<u8> {
    let mut mq = MqEncoder::new();
    let mut stats = cells(generic_context_bits(template));
    let params = GenericParams {
        template,
        at: match template {
            0 => vec![(3, -1), (-3, -1), (2, -2), (-2, -2)],
            1 => vec![(3, -1)],
            _ => vec![(2, -1)],
        },
        tpgdon: false,
        skip,
    };

    // Planes of the Gray code, most significant first.
    for j in (0..bits_per_value).rev() {
        let mut plane = Image::new(width, height);
        for (i, &value) in values.iter().enumerate() {
            let gray = value ^ (value >> 1);
            plane.pixels[i] = (gray >> j) & 1 == 1;
        }
        encode_generic(&mut mq, &mut stats, &plane, &params);
    }

    mq.finish()
}

/// The coders of a text region (6.4): the integer coders, the symbol ID
/// coder and the contexts shared by refined instances.
pub struct TextCoders {
    pub iadt: IntegerEncoder,
    pub iafs: IntegerEncoder,
    pub iads: IntegerEncoder,
    pub iait: IntegerEncoder,
    pub iaid: IdEncoder,
    pub iari: IntegerEncoder,
    pub iardw: IntegerEncoder,
    pub iardh: IntegerEncoder,
    pub iardx: IntegerEncoder,
    pub iardy: IntegerEncoder,
    pub refinement: Vec<Cell>,
}

impl TextCoders {
    pub fn new(code_len: u32, refinement_template: u8) -> Self {
        Self {
            iadt: IntegerEncoder::new(),
            iafs: IntegerEncoder::new(),
            iads: IntegerEncoder::new(),
            iait: IntegerEncoder::new(),
            iaid: IdEncoder::new(code_len),
            iari: IntegerEncoder::new(),
            iardw: IntegerEncoder::new(),
            iardh: IntegerEncoder::new(),
            iardx: IntegerEncoder::new(),
            iardy: IntegerEncoder::new(),
            refinement: cells(refinement_context_bits(refinement_template)),
        }
    }
}

/// A refined symbol instance: the deltas of 6.4.11 and the bitmap the
/// refinement has to produce.
pub struct TextRefinement<'a> {
    pub rdw: i32,
    pub rdh: i32,
    pub rdx: i32,
    pub rdy: i32,
    pub target: &'a Image,
}

/// One symbol instance with its coded values. `ds` is the IAFS value for the
/// first instance of a strip and the IADS value (without SBDSOFFSET) for the
/// others.
pub struct TextInstance<'a> {
    pub ds: i32,
    pub t: i32,
    pub id: u32,
    pub refinement: Option<TextRefinement<'a>>,
}

impl TextInstance<'_> {
    pub fn new(ds: i32, t: i32, id: u32) -> Self {
        Self {
            ds,
            t,
            id,
            refinement: None,
        }
    }
}

/// A strip with its IADT value (in units of SBSTRIPS).
pub struct TextStrip<'a> {
    pub dt: i32,
    pub instances: Vec<TextInstance<'a>>,
}

/// The region-wide parameters the coded values depend on.
pub struct TextParams<'a> {
    pub log_strips: u8,
    pub refine: bool,
    pub refinement_template: u8,
    pub refinement_at: [(i8, i8); 2],
    pub symbols: &'a [Image],
}

/// Text region encoding (the inverse of 6.4.5), starting with the initial
/// IADT value `first_dt`.
pub fn encode_text(
    mq: &mut MqEncoder,
    coders: &mut TextCoders,
    params: &TextParams<'_>,
    first_dt: i32,
    strips: &[TextStrip<'_>],
) {
    coders.iadt.encode(mq, Some(first_dt));

    for strip in strips {
        coders.iadt.encode(mq, Some(strip.dt));

        for (i, instance) in strip.instances.iter().enumerate() {
            if i == 0 {
                coders.iafs.encode(mq, Some(instance.ds));
            } else {
                coders.iads.encode(mq, Some(instance.ds));
            }

            if params.log_strips != 0 {
                coders.iait.encode(mq, Some(instance.t));
            }

            coders.iaid.encode(mq, instance.id);

            if params.refine {
                coders.iari.encode(mq, Some(i32::from(instance.refinement.is_some())));
            }

            if let Some(refinement) = &instance.refinement {
                coders.iardw.encode(mq, Some(refinement.rdw));
                coders.iardh.encode(mq, Some(refinement.rdh));
                coders.iardx.encode(mq, Some(refinement.rdx));
                coders.iardy.encode(mq, Some(refinement.rdy));

                let reference = &params.symbols[instance.id as usize];
                let mut refinement_params = RefinementParams::new(params.refinement_template, reference);
                refinement_params.at = params.refinement_at;
                refinement_params.dx = refinement.rdw.div_euclid(2) + refinement.rdx;
                refinement_params.dy = refinement.rdh.div_euclid(2) + refinement.rdy;
                encode_refinement(mq, &mut coders.refinement, refinement.target, &refinement_params);
            }
        }

        coders.iads.encode(mq, None);
    }
}

/// The coders of a symbol dictionary (6.5).
pub struct SymbolCoders {
    pub iadh: IntegerEncoder,
    pub iadw: IntegerEncoder,
    pub iaex: IntegerEncoder,
    pub iaai: IntegerEncoder,
    pub generic: Vec<Cell>,
    pub refinement: Vec<Cell>,
}

impl SymbolCoders {
    pub fn new(template: u8, refinement_template: u8) -> Self {
        Self {
            iadh: IntegerEncoder::new(),
            iadw: IntegerEncoder::new(),
            iaex: IntegerEncoder::new(),
            iaai: IntegerEncoder::new(),
            generic: cells(generic_context_bits(template)),
            refinement: cells(refinement_context_bits(refinement_template)),
        }
    }
}

/// Symbol dictionary encoding without refinement or aggregation (the inverse
/// of 6.5.5). Each height class lists symbols of the same height, and
/// `export_runs` are the run lengths of 6.5.10.
pub fn encode_symbols(
    template: u8,
    at: &[(i8, i8)],
    height_classes: &[Vec<Image>],
    export_runs: &[i32],
) -> Vec<u8> {
    let mut mq = MqEncoder::new();
    let mut coders = SymbolCoders::new(template, 0);
    let params = GenericParams {
        template,
        at: at.to_vec(),
        tpgdon: false,
        skip: None,
    };

    let mut height = 0_i32;
    for class in height_classes {
        let class_height = class[0].height as i32;
        coders.iadh.encode(&mut mq, Some(class_height - height));
        height = class_height;

        let mut width = 0_i32;
        for symbol in class {
            coders.iadw.encode(&mut mq, Some(symbol.width as i32 - width));
            width = symbol.width as i32;
            encode_generic(&mut mq, &mut coders.generic, symbol, &params);
        }

        coders.iadw.encode(&mut mq, None);
    }

    for &run in export_runs {
        coders.iaex.encode(&mut mq, Some(run));
    }

    mq.finish()
}

/// The data of a symbol dictionary segment that uses arithmetic coding
/// (7.4.2.1).
pub fn symbol_dictionary_payload(
    flags: u16,
    at: &[(i8, i8)],
    refinement_at: Option<[(i8, i8); 2]>,
    num_exported: u32,
    num_new: u32,
    coded: &[u8],
) -> Vec<u8> {
    let mut out = flags.to_be_bytes().to_vec();
    out.extend(at_bytes(at));
    if let Some(refinement_at) = refinement_at {
        out.extend(at_bytes(&refinement_at));
    }
    out.extend_from_slice(&num_exported.to_be_bytes());
    out.extend_from_slice(&num_new.to_be_bytes());
    out.extend_from_slice(coded);
    out
}

/// The data of a text region segment that uses arithmetic coding (7.4.3.1).
pub fn text_region_payload(
    info: &[u8],
    flags: u16,
    refinement_at: Option<[(i8, i8); 2]>,
    num_instances: u32,
    coded: &[u8],
) -> Vec<u8> {
    let mut out = info.to_vec();
    out.extend_from_slice(&flags.to_be_bytes());
    if let Some(refinement_at) = refinement_at {
        out.extend(at_bytes(&refinement_at));
    }
    out.extend_from_slice(&num_instances.to_be_bytes());
    out.extend_from_slice(coded);
    out
}

/// A region segment information field (7.4.1).
pub fn region_info(width: u32, height: u32, x: u32, y: u32, flags: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(17);
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&height.to_be_bytes());
    out.extend_from_slice(&x.to_be_bytes());
    out.extend_from_slice(&y.to_be_bytes());
    out.push(flags);
    out
}

/// Adaptive pixels as they appear in segment data.
pub fn at_bytes(at: &[(i8, i8)]) -> Vec<u8> {
    at.iter().flat_map(|&(x, y)| [x as u8, y as u8]).collect()
}

/// Payload of a generic region segment coded with `params` (7.4.6).
pub fn generic_region_payload(
    image: &Image,
    x: u32,
    y: u32,
    operator: u8,
    params: &GenericParams<'_>,
) -> Vec<u8> {
    let mut out = region_info(image.width, image.height, x, y, operator);
    out.push((params.template << 1) | (u8::from(params.tpgdon) << 3));
    out.extend(at_bytes(&params.at));
    out.extend(encode_generic_standalone(image, params));
    out
}

/// Payload of a page information segment (7.4.8).
pub fn page_info(width: u32, height: u32, flags: u8, striping: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(19);
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&height.to_be_bytes());
    out.extend_from_slice(&0_u32.to_be_bytes());
    out.extend_from_slice(&0_u32.to_be_bytes());
    out.push(flags);
    out.extend_from_slice(&striping.to_be_bytes());
    out
}

/// A segment to be written by [`segment_header`].
pub struct SegmentSpec<'a> {
    pub number: u32,
    pub kind: u8,
    pub referred: &'a [u32],
    pub page: u32,
    pub data: &'a [u8],
}

impl<'a> SegmentSpec<'a> {
    pub fn new(number: u32, kind: u8, page: u32, data: &'a [u8]) -> Self {
        Self {
            number,
            kind,
            referred: &[],
            page,
            data,
        }
    }

    pub fn referring(mut self, referred: &'a [u32]) -> Self {
        self.referred = referred;
        self
    }
}

/// A segment header (7.2) for `spec`. The data length is omitted for end of
/// file segments.
pub fn segment_header(spec: &SegmentSpec<'_>) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&spec.number.to_be_bytes());

    let long_page = spec.page > 0xFF;
    out.push(spec.kind | (u8::from(long_page) << 6));

    let count = spec.referred.len();
    if count <= 4 {
        out.push((count as u8) << 5);
    } else {
        out.extend_from_slice(&((7_u32 << 29) | count as u32).to_be_bytes());
        out.extend(vec![0_u8; (count + 1).div_ceil(8)]);
    }

    for &referred in spec.referred {
        if spec.number <= 256 {
            out.push(referred as u8);
        } else if spec.number <= 65536 {
            out.extend_from_slice(&(referred as u16).to_be_bytes());
        } else {
            out.extend_from_slice(&referred.to_be_bytes());
        }
    }

    if long_page {
        out.extend_from_slice(&spec.page.to_be_bytes());
    } else {
        out.push(spec.page as u8);
    }

    if spec.kind != 51 {
        out.extend_from_slice(&(spec.data.len() as u32).to_be_bytes());
    }

    out
}

/// Segments in the embedded organization (Annex D.3).
pub fn embedded_stream(segments: &[SegmentSpec<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    for spec in segments {
        out.extend(segment_header(spec));
        out.extend_from_slice(spec.data);
    }
    out
}

const FILE_ID: [u8; 8] = [0x97, 0x4A, 0x42, 0x32, 0x0D, 0x0A, 0x1A, 0x0A];

/// A standalone file using the sequential organization (D.1) with an unknown
/// number of pages.
pub fn sequential_file(segments: &[SegmentSpec<'_>]) -> Vec<u8> {
    let mut out = FILE_ID.to_vec();
    out.push(0x03);
    out.extend(embedded_stream(segments));
    out
}

/// A standalone file using the random-access organization (D.2) with a known
/// number of pages.
pub fn random_access_file(segments: &[SegmentSpec<'_>], pages: u32) -> Vec<u8> {
    let mut out = FILE_ID.to_vec();
    out.push(0x00);
    out.extend_from_slice(&pages.to_be_bytes());
    for spec in segments {
        out.extend(segment_header(spec));
    }
    for spec in segments {
        out.extend_from_slice(spec.data);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_test_sequence() {
        // H.2
        let input: [u8; 32] = [
            0x00, 0x02, 0x00, 0x51, 0x00, 0x00, 0x00, 0xC0, 0x03, 0x52, 0x87, 0x2A, 0xAA, 0xAA,
            0xAA, 0xAA, 0x82, 0xC0, 0x20, 0x00, 0xFC, 0xD7, 0x9E, 0xF6, 0xBF, 0x7F, 0xED, 0x90,
            0x4F, 0x46, 0xA3, 0xBF,
        ];
        let expected: [u8; 30] = [
            0x84, 0xC7, 0x3B, 0xFC, 0xE1, 0xA1, 0x43, 0x04, 0x02, 0x20, 0x00, 0x00, 0x41, 0x0D,
            0xBB, 0x86, 0xF4, 0x31, 0x7F, 0xFF, 0x88, 0xFF, 0x37, 0x47, 0x1A, 0xDB, 0x6A, 0xDF,
            0xFF, 0xAC,
        ];

        let mut mq = MqEncoder::new();
        let mut cell = Cell::default();
        for byte in input {
            for i in (0..8).rev() {
                mq.encode(&mut cell, u32::from((byte >> i) & 1));
            }
        }

        assert_eq!(mq.finish(), expected);
    }
}
