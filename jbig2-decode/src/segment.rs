//! Segment headers (7.2) and segment types (7.3).

use alloc::vec::Vec;

use crate::error::{Result, SegmentError, bail};
use crate::reader::Reader;

/// Whether a region segment is composed onto the page or kept for later
/// reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegionKind {
    /// The region is only referred to by later segments.
    Intermediate,
    /// The region is combined with the page.
    Immediate,
    /// The region is combined with the page and is coded losslessly.
    ImmediateLossless,
}

impl RegionKind {
    pub(crate) fn is_immediate(self) -> bool {
        !matches!(self, Self::Intermediate)
    }
}

/// "The segment type is a number between 0 and 63, inclusive. Not all values
/// are allowed." (7.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SegmentType {
    /// Type 0, see 7.4.2.
    SymbolDictionary,
    /// Types 4, 6 and 7, see 7.4.3.
    TextRegion(RegionKind),
    /// Type 16, see 7.4.4.
    PatternDictionary,
    /// Types 20, 22 and 23, see 7.4.5.
    HalftoneRegion(RegionKind),
    /// Types 36, 38 and 39, see 7.4.6.
    GenericRegion(RegionKind),
    /// Types 40, 42 and 43, see 7.4.7.
    RefinementRegion(RegionKind),
    /// Type 48, see 7.4.8.
    PageInformation,
    /// Type 49, see 7.4.9.
    EndOfPage,
    /// Type 50, see 7.4.10.
    EndOfStripe,
    /// Type 51, see 7.4.11.
    EndOfFile,
    /// Type 52, see 7.4.12.
    Profiles,
    /// Type 53, see 7.4.13.
    Tables,
    /// Type 54, see 7.4.16.
    ColourPalette,
    /// Type 62, see 7.4.14.
    Extension,
}

impl SegmentType {
    /// "All other segment types are reserved and must not be used." (7.3)
    fn from_value(value: u8) -> Result<Self> {
        use RegionKind::*;

        Ok(match value {
            0 => Self::SymbolDictionary,
            4 => Self::TextRegion(Intermediate),
            6 => Self::TextRegion(Immediate),
            7 => Self::TextRegion(ImmediateLossless),
            16 => Self::PatternDictionary,
            20 => Self::HalftoneRegion(Intermediate),
            22 => Self::HalftoneRegion(Immediate),
            23 => Self::HalftoneRegion(ImmediateLossless),
            36 => Self::GenericRegion(Intermediate),
            38 => Self::GenericRegion(Immediate),
            39 => Self::GenericRegion(ImmediateLossless),
            40 => Self::RefinementRegion(Intermediate),
            42 => Self::RefinementRegion(Immediate),
            43 => Self::RefinementRegion(ImmediateLossless),
            48 => Self::PageInformation,
            49 => Self::EndOfPage,
            50 => Self::EndOfStripe,
            51 => Self::EndOfFile,
            52 => Self::Profiles,
            53 => Self::Tables,
            54 => Self::ColourPalette,
            62 => Self::Extension,
            _ => bail!(SegmentError::UnknownType),
        })
    }
}

/// A parsed segment header (7.2.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SegmentHeader {
    /// "This four-byte field contains the segment's segment number." (7.2.2)
    pub(crate) number: u32,
    /// "Bits 0-5: Segment type." (7.2.3)
    pub(crate) kind: SegmentType,
    /// "Bit 7: Deferred non-retain. If this bit is 1, this segment is flagged
    /// as retained only by itself and its attached extension segments."
    pub(crate) deferred_non_retain: bool,
    /// The retain bit for this segment.
    pub(crate) retain: bool,
    /// The retain bits for the referred-to segments, in reference order.
    pub(crate) retain_referred: Vec<bool>,
    /// "This field contains the segment numbers of the segments that this
    /// segment refers to, if any." (7.2.5)
    pub(crate) referred_to: Vec<u32>,
    /// "The first page must be numbered "1". This field may contain a value
    /// of zero; this value indicates that this segment is not associated with
    /// any page." (7.2.6)
    pub(crate) page: u32,
    /// The length of the data part, `None` if it is unknown (0xFFFFFFFF).
    pub(crate) data_length: Option<u32>,
}

/// A segment header together with its data part.
#[derive(Debug, Clone)]
pub(crate) struct Segment<'a> {
    pub(crate) header: SegmentHeader,
    pub(crate) data: &'a [u8],
}

/// Parse a segment header (7.2).
pub(crate) fn parse_segment_header(reader: &mut Reader<'_>) -> Result<SegmentHeader> {
    let number = reader.read_u32()?;
    let flags = reader.read_byte()?;

    let kind = SegmentType::from_value(flags & 0x3F)?;
    // "Bit 6: Page association field size."
    let long_page = flags & 0x40 != 0;
    let deferred_non_retain = flags & 0x80 != 0;

    // "The three most significant bits of the first byte in this field
    // determine the length of the field. [...] This three-bit subfield must
    // not contain values of 5 and 6." (7.2.4)
    let first = reader.read_byte()?;
    let short_count = first >> 5;

    let (count, retain_bits) = match short_count {
        0..=4 => {
            // "Bits 0-4: Retention flags."
            (short_count as u32, [first & 0x1F].to_vec())
        }
        7 => {
            let rest = reader.read_bytes(3)?;
            let count = u32::from_be_bytes([first & 0x1F, rest[0], rest[1], rest[2]]);

            // "[...] followed by a succession of one-byte fields. [...] the
            // number of bytes is ⌈(count + 1) / 8⌉."
            let retention_len = (count as usize + 1).div_ceil(8);
            (count, reader.read_bytes(retention_len)?.to_vec())
        }
        _ => bail!(SegmentError::InvalidReferredCount),
    };

    let retain_bit = |index: usize| retain_bits[index / 8] & (1 << (index % 8)) != 0;
    let retain = retain_bit(0);
    let retain_referred = (1..=count as usize).map(retain_bit).collect();

    // "When the current segment's number is 256 or less, then each
    // referred-to segment number is one byte long. Otherwise, when the current
    // segment's number is 65536 or less, each referred-to segment number is
    // two bytes long. Otherwise, each referred-to segment number is four
    // bytes long." (7.2.5)
    let mut referred_to = Vec::with_capacity((count as usize).min(reader.remaining()));
    for _ in 0..count {
        let referred = if number <= 256 {
            reader.read_byte()? as u32
        } else if number <= 65536 {
            reader.read_u16()? as u32
        } else {
            reader.read_u32()?
        };

        // "If a segment refers to other segments, it must refer to only
        // segments with lower segment numbers."
        if referred >= number {
            bail!(SegmentError::InvalidReference);
        }

        referred_to.push(referred);
    }

    let page = if long_page {
        reader.read_u32()?
    } else {
        reader.read_byte()? as u32
    };

    let data_length = if kind == SegmentType::EndOfFile {
        end_of_file_length(reader)?
    } else {
        match reader.read_u32()? {
            0xFFFF_FFFF => None,
            length => Some(length),
        }
    };

    let header = SegmentHeader {
        number,
        kind,
        deferred_non_retain,
        retain,
        retain_referred,
        referred_to,
        page,
        data_length,
    };

    ltrace!(
        "segment {}: {:?}, page {}, refers to {:?}, length {:?}, retain {} ({:?}), deferred {}",
        header.number,
        header.kind,
        header.page,
        header.referred_to,
        header.data_length,
        header.retain,
        header.retain_referred,
        header.deferred_non_retain
    );

    Ok(header)
}

/// The end of file segment has no data. Streams written by some encoders omit
/// its length field, so a length is only consumed if it is present and 0.
fn end_of_file_length(reader: &mut Reader<'_>) -> Result<Option<u32>> {
    if reader.peek_bytes(4).is_ok_and(|bytes| bytes == [0; 4]) {
        reader.skip_bytes(4)?;
    }

    Ok(Some(0))
}

/// Read the data part of a segment whose header was just parsed.
pub(crate) fn parse_segment_data<'a>(
    reader: &mut Reader<'a>,
    header: SegmentHeader,
) -> Result<Segment<'a>> {
    let length = match header.data_length {
        Some(length) => length as usize,
        None => unknown_data_length(reader, header.kind)?,
    };

    let data = reader.read_bytes(length)?;

    Ok(Segment { header, data })
}

/// Find the extent of an immediate generic region of unknown length.
///
/// "In order for the decoder to correctly decode the segment, it needs to read
/// the four-byte row count field, which is stored in the last four bytes of
/// the segment's data part. These four bytes can be detected without knowing
/// the length of the data part in advance: if MMR is 1, they are preceded by
/// the two-byte sequence 0x00 0x00; if MMR is 0, they are preceded by the
/// two-byte sequence 0xFF 0xAC." (7.2.7)
///
/// Only immediate generic regions may leave their length open.
fn unknown_data_length(reader: &Reader<'_>, kind: SegmentType) -> Result<usize> {
    if !matches!(kind, SegmentType::GenericRegion(region) if region.is_immediate()) {
        bail!(SegmentError::MissingEndMarker);
    }

    let data = reader.tail();

    // The region segment information field and the generic region flags.
    const FLAGS_OFFSET: usize = 17;

    let Some(flags) = data.get(FLAGS_OFFSET) else {
        bail!(SegmentError::MissingEndMarker);
    };

    let marker: [u8; 2] = if flags & 1 != 0 {
        [0x00, 0x00]
    } else {
        [0xFF, 0xAC]
    };

    data[FLAGS_OFFSET + 1..]
        .windows(6)
        .position(|window| window[..2] == marker)
        .map(|position| FLAGS_OFFSET + 1 + position + 6)
        .ok_or(SegmentError::MissingEndMarker.into())
}
