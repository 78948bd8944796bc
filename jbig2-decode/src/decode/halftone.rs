//! Halftone region segments (7.4.5) and the halftone region decoding
//! procedure (6.6).

use super::pattern::PatternDictionary;
use super::{DecodedRegion, Template, parse_region_segment_info};
use crate::bitmap::{Bitmap, CombinationOperator, check_region_size};
use crate::error::{Feature, RegionError, Result, SymbolError, bail};
use crate::gray_scale::{GrayScaleParams, decode_gray_scale_image};
use crate::reader::Reader;

/// The halftone grid (7.4.5.1.2 and 7.4.5.1.3).
#[derive(Debug, Clone)]
struct Grid {
    /// `HGW`
    width: u32,
    /// `HGH`
    height: u32,
    /// `HGX`
    x: i32,
    /// `HGY`
    y: i32,
    /// `HRX`, 256 times the horizontal coordinate of the grid vector.
    vector_x: u16,
    /// `HRY`, 256 times the vertical coordinate of the grid vector.
    vector_y: u16,
}

/// Decode a halftone region segment with the patterns of the referred-to
/// pattern dictionaries.
pub(crate) fn decode(data: &[u8], patterns: &PatternDictionary) -> Result<DecodedRegion> {
    let mut reader = Reader::new(data);
    let info = parse_region_segment_info(&mut reader)?;

    // 7.4.5.1.1
    let flags = reader.read_byte()?;
    // "Bit 0: HMMR"
    if flags & 0x01 != 0 {
        bail!(Feature::Mmr);
    }
    // "Bits 1-2: HTEMPLATE"
    let template = Template::from_value(flags >> 1);
    // "Bit 3: HENABLESKIP"
    let enable_skip = flags & 0x08 != 0;
    // "Bits 4-6: HCOMBOP"
    let operator = CombinationOperator::from_value((flags >> 4) & 0x07)?;
    // "Bit 7: HDEFPIXEL"
    let default_pixel = flags & 0x80 != 0;

    let grid = Grid {
        width: reader.read_u32()?,
        height: reader.read_u32()?,
        x: reader.read_i32()?,
        y: reader.read_i32()?,
        vector_x: reader.read_u16()?,
        vector_y: reader.read_u16()?,
    };

    if patterns.patterns.is_empty() {
        bail!(SymbolError::NoSymbols);
    }

    check_region_size(info.width, info.height, data.len())?;
    check_region_size(grid.width, grid.height, data.len())?;

    ldebug!(
        "halftone region {}x{} at ({}, {}), {}x{} grid, {:?}",
        info.width,
        info.height,
        info.x,
        info.y,
        grid.width,
        grid.height,
        template
    );

    // "1) Fill a bitmap HTREG, of the size given by HBW and HBH, with the
    // HDEFPIXEL value." (6.6.5)
    let mut region = Bitmap::filled(info.width, info.height, default_pixel)?;

    // "2) If HENABLESKIP equals 1, compute a bitmap HSKIP as shown in
    // 6.6.5.1."
    let skip = if enable_skip {
        Some(skip_bitmap(&grid, patterns, &region)?)
    } else {
        None
    };

    // "3) Set HBPP to ⌈log2 (HNUMPATS)⌉."
    let bits_per_value = (patterns.patterns.len() as u32)
        .saturating_sub(1)
        .checked_ilog2()
        .map_or(1, |n| n + 1);

    // "4) Decode an image GI of size HGW by HGH with HBPP bits per pixel
    // using the gray-scale image decoding procedure as described in Annex C."
    let params = GrayScaleParams {
        bits_per_value,
        width: grid.width,
        height: grid.height,
        template,
        skip: skip.as_ref(),
    };
    let gray_values = decode_gray_scale_image(reader.tail(), &params)?;

    // "5) Place sequentially the patterns corresponding to the values in GI
    // into HTREG by the procedure described in 6.6.5.2."
    render_patterns(&mut region, &gray_values, &grid, patterns, operator)?;

    Ok(DecodedRegion {
        info,
        bitmap: region,
    })
}

/// Walks the grid positions in row-major order.
///
/// "x = (HGX + m_g × HRY + n_g × HRX) >> 8
///  y = (HGY + m_g × HRX − n_g × HRY) >> 8" (6.6.5.1)
struct GridCoords {
    x: i64,
    y: i64,
    row_x: i64,
    row_y: i64,
    hrx: i64,
    hry: i64,
}

impl GridCoords {
    fn new(grid: &Grid) -> Self {
        Self {
            x: grid.x as i64,
            y: grid.y as i64,
            row_x: grid.x as i64,
            row_y: grid.y as i64,
            hrx: grid.vector_x as i64,
            hry: grid.vector_y as i64,
        }
    }

    #[inline]
    fn get(&self) -> (i64, i64) {
        (self.x >> 8, self.y >> 8)
    }

    #[inline]
    fn advance_col(&mut self) {
        self.x += self.hrx;
        self.y -= self.hry;
    }

    #[inline]
    fn advance_row(&mut self) {
        self.row_x += self.hry;
        self.row_y += self.hrx;
        self.x = self.row_x;
        self.y = self.row_y;
    }
}

/// Whether a pattern placed at `(x, y)` misses the region entirely.
fn outside(x: i64, y: i64, patterns: &PatternDictionary, region: &Bitmap) -> bool {
    x + patterns.pattern_width as i64 <= 0
        || x >= region.width() as i64
        || y + patterns.pattern_height as i64 <= 0
        || y >= region.height() as i64
}

/// Compute `HSKIP` (6.6.5.1).
fn skip_bitmap(grid: &Grid, patterns: &PatternDictionary, region: &Bitmap) -> Result<Bitmap> {
    let mut skip = Bitmap::new(grid.width, grid.height)?;
    let mut coords = GridCoords::new(grid);

    for m_g in 0..grid.height {
        for n_g in 0..grid.width {
            let (x, y) = coords.get();

            // "If ((x + HPW <= 0) OR (x >= HBW) OR (y + HPH <= 0) OR
            // (y >= HBH)) then set: HSKIP[n_g, m_g] = 1"
            if outside(x, y, patterns, region) {
                skip.set_pixel(n_g, m_g, true);
            }

            coords.advance_col();
        }

        coords.advance_row();
    }

    Ok(skip)
}

/// Draw the pattern of every grid cell into the region (6.6.5.2).
fn render_patterns(
    region: &mut Bitmap,
    gray_values: &[u32],
    grid: &Grid,
    patterns: &PatternDictionary,
    operator: CombinationOperator,
) -> Result<()> {
    let mut coords = GridCoords::new(grid);
    let mut values = gray_values.iter();

    for _ in 0..grid.height {
        for _ in 0..grid.width {
            let (x, y) = coords.get();
            coords.advance_col();

            let Some(&gray) = values.next() else {
                bail!(RegionError::InvalidDimension);
            };

            let pattern = patterns
                .patterns
                .get(gray as usize)
                .ok_or(RegionError::GrayScaleOutOfRange)?;

            if outside(x, y, patterns, region) {
                continue;
            }

            // Inside the region both coordinates fit, since the region's
            // dimensions do.
            let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) else {
                continue;
            };

            region.blit(pattern, x, y, operator);
        }

        coords.advance_row();
    }

    Ok(())
}
