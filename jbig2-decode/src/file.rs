//! Standalone file organizations (Annex D) and embedded streams.

use alloc::vec::Vec;

use crate::error::{DecodeError, FormatError, Result, bail};
use crate::reader::Reader;
use crate::segment::{Segment, SegmentType, parse_segment_data, parse_segment_header};

/// "There are two standalone file organizations possible for a JBIG2
/// bitstream." (Annex D)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FileOrganization {
    /// "A file header is followed by a sequence of segments. The two parts of
    /// each segment are stored together." (D.1)
    Sequential,
    /// "A file header is followed by a sequence of segments headers; the last
    /// segment header is followed by the data for the first segment, then the
    /// data for the second segment, and so on." (D.2)
    RandomAccess,
}

/// The file header (D.4).
#[derive(Debug, Clone)]
pub(crate) struct FileHeader {
    pub(crate) organization: FileOrganization,
    /// "This is a 4-byte field, and is not present if the "unknown number of
    /// pages" bit was 1." (D.4.3)
    pub(crate) page_count: Option<u32>,
    /// "Bit 2: If this bit is 0, no generic region segments uses the templates
    /// with 12 AT pixels."
    pub(crate) extended_templates: bool,
    /// "Bit 3: If this bit is 0, no region segment is extended to be
    /// coloured."
    pub(crate) coloured_regions: bool,
}

/// The segments of a stream, in stream order.
///
/// Segment framing cannot be recovered after a broken header, so parsing
/// stops there. The segments before it are still decoded.
#[derive(Debug, Default)]
pub(crate) struct Segments<'a> {
    pub(crate) list: Vec<Segment<'a>>,
    pub(crate) error: Option<DecodeError>,
}

/// "This is an 8-byte sequence containing 0x97 0x4A 0x42 0x32 0x0D 0x0A 0x1A
/// 0x0A." (D.4.1)
const FILE_ID: [u8; 8] = [0x97, 0x4A, 0x42, 0x32, 0x0D, 0x0A, 0x1A, 0x0A];

/// Parse a standalone JBIG2 file.
pub(crate) fn parse_file(data: &[u8]) -> Result<(FileHeader, Segments<'_>)> {
    let mut reader = Reader::new(data);
    let header = parse_file_header(&mut reader)?;

    ldebug!(
        "{:?} file, {:?} pages, extended templates {}, coloured regions {}",
        header.organization,
        header.page_count,
        header.extended_templates,
        header.coloured_regions
    );

    let segments = match header.organization {
        FileOrganization::Sequential => parse_sequential(reader),
        FileOrganization::RandomAccess => parse_random_access(reader),
    };

    Ok((header, segments))
}

/// Parse the segments of a stream embedded in a PDF, which uses the
/// sequential organization without a file header (D.3).
pub(crate) fn parse_embedded(data: &[u8]) -> Segments<'_> {
    parse_sequential(Reader::new(data))
}

fn parse_file_header(reader: &mut Reader<'_>) -> Result<FileHeader> {
    if reader.read_bytes(8).ok() != Some(&FILE_ID[..]) {
        bail!(FormatError::InvalidHeader);
    }

    let flags = reader.read_byte()?;

    // "Bit 0: File organization type. If this bit is 0, the file uses the
    // random-access organization. If this bit is 1, the file uses the
    // sequential organization."
    let organization = if flags & 0x01 != 0 {
        FileOrganization::Sequential
    } else {
        FileOrganization::RandomAccess
    };

    // "Bits 4-7: Reserved; must be 0."
    if flags & 0xF0 != 0 {
        lwarn!("reserved file header flags are set: {:#04x}", flags);
    }

    // "Bit 1: Unknown number of pages."
    let page_count = if flags & 0x02 == 0 {
        Some(reader.read_u32()?)
    } else {
        None
    };

    Ok(FileHeader {
        organization,
        page_count,
        extended_templates: flags & 0x04 != 0,
        coloured_regions: flags & 0x08 != 0,
    })
}

fn parse_sequential(mut reader: Reader<'_>) -> Segments<'_> {
    let mut segments = Segments::default();

    while !reader.at_end() {
        let segment = match parse_segment_header(&mut reader)
            .and_then(|header| parse_segment_data(&mut reader, header))
        {
            Ok(segment) => segment,
            Err(e) => {
                segments.error = Some(e);
                break;
            }
        };

        // "If a file contains an end of file segment, it must be the last
        // segment." (7.4.11)
        let is_end = segment.header.kind == SegmentType::EndOfFile;
        segments.list.push(segment);

        if is_end {
            break;
        }
    }

    segments
}

fn parse_random_access(mut reader: Reader<'_>) -> Segments<'_> {
    let mut headers = Vec::new();

    while !reader.at_end() {
        match parse_segment_header(&mut reader) {
            Ok(header) => {
                let is_end = header.kind == SegmentType::EndOfFile;
                headers.push(header);

                if is_end {
                    break;
                }
            }
            // Without all headers, the data of no segment can be located.
            Err(e) => {
                return Segments {
                    list: Vec::new(),
                    error: Some(e),
                };
            }
        }
    }

    let mut segments = Segments::default();

    for header in headers {
        match parse_segment_data(&mut reader, header) {
            Ok(segment) => segments.list.push(segment),
            Err(e) => {
                segments.error = Some(e);
                break;
            }
        }
    }

    segments
}
