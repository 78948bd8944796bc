//! Page information segments (7.4.8).

use crate::bitmap::CombinationOperator;
use crate::error::Result;
use crate::reader::Reader;

/// A parsed page information segment.
#[derive(Debug, Clone)]
pub(crate) struct PageInformation {
    /// "This is a four-byte value containing the width in pixels of the
    /// page's bitmap." (7.4.8.1)
    pub(crate) width: u32,
    /// The height of the page, `None` if it is unknown (0xFFFFFFFF) and
    /// determined by the end of stripe segments of the page.
    pub(crate) height: Option<u32>,
    /// Horizontal resolution in pixels per metre, 0 if unknown (7.4.8.3).
    pub(crate) x_resolution: u32,
    /// Vertical resolution in pixels per metre, 0 if unknown (7.4.8.4).
    pub(crate) y_resolution: u32,
    pub(crate) flags: PageFlags,
    pub(crate) striping: PageStriping,
}

/// Page segment flags (7.4.8.5).
#[derive(Debug, Clone)]
pub(crate) struct PageFlags {
    /// "Bit 0: Page is eventually lossless."
    pub(crate) lossless: bool,
    /// "Bit 1: Page might contain refinements."
    pub(crate) refinements: bool,
    /// "Bit 2: Page default pixel value. This bit contains the initial value
    /// for every pixel in the page, before any region segments are decoded or
    /// drawn."
    pub(crate) default_pixel: bool,
    /// "Bits 3-4: Page default combination operator."
    pub(crate) default_operator: CombinationOperator,
    /// "Bit 5: Page requires auxiliary buffers."
    pub(crate) auxiliary_buffers: bool,
    /// "Bit 6: Page combination operator overridden. If this bit is 0, then
    /// every direct region segment associated with this page must use the
    /// page's default combination operator."
    pub(crate) operator_overridden: bool,
    /// "Bit 7: Page might contain coloured segment."
    pub(crate) coloured: bool,
}

/// Page striping information (7.4.8.6).
#[derive(Debug, Clone, Copy)]
pub(crate) struct PageStriping {
    /// "Bit 15: Page is striped."
    pub(crate) striped: bool,
    /// "Bits 0-14: Maximum stripe size."
    pub(crate) max_stripe_size: u16,
}

pub(crate) fn parse_page_information(reader: &mut Reader<'_>) -> Result<PageInformation> {
    let width = reader.read_u32()?;
    let height = match reader.read_u32()? {
        0xFFFF_FFFF => None,
        height => Some(height),
    };
    let x_resolution = reader.read_u32()?;
    let y_resolution = reader.read_u32()?;

    let flags = reader.read_byte()?;
    let flags = PageFlags {
        lossless: flags & 0x01 != 0,
        refinements: flags & 0x02 != 0,
        default_pixel: flags & 0x04 != 0,
        default_operator: CombinationOperator::from_value((flags >> 3) & 0x03)?,
        auxiliary_buffers: flags & 0x20 != 0,
        operator_overridden: flags & 0x40 != 0,
        coloured: flags & 0x80 != 0,
    };

    let striping = reader.read_u16()?;
    let striping = PageStriping {
        striped: striping & 0x8000 != 0,
        max_stripe_size: striping & 0x7FFF,
    };

    // "If the page's bitmap height is unknown (indicated by a page bitmap
    // height of 0xFFFFFFFF) then the "page is striped" bit must be 1."
    if height.is_none() && !striping.striped {
        lwarn!("page of unknown height is not marked as striped");
    }

    ltrace!(
        "page {}x{:?}, lossless {}, refinements {}, auxiliary buffers {}, coloured {}, max stripe {}",
        width,
        height,
        flags.lossless,
        flags.refinements,
        flags.auxiliary_buffers,
        flags.coloured,
        striping.max_stripe_size
    );

    Ok(PageInformation {
        width,
        height,
        x_resolution,
        y_resolution,
        flags,
        striping,
    })
}
