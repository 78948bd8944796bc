/*!
A memory-safe, pure-Rust JBIG2 decoder.

`jbig2-decode` decodes JBIG2 images as specified in ITU-T T.88 (also known as
ISO/IEC 14492), the bi-level image compression standard that is commonly used
in PDF documents for scanned text. It implements the arithmetic coding path of
the standard: generic, refinement, text and halftone regions as well as symbol
and pattern dictionaries. Huffman and MMR coded segments are reported as
[`DecodeError::Unsupported`].

# Example
```rust,no_run
let data = std::fs::read("image.jb2").unwrap();
let bitmap = jbig2_decode::decode(&data).unwrap();

println!("{}x{} image", bitmap.width(), bitmap.height());
```

Streams embedded in PDF files have no file header and may come with a second
stream of global segments (the `JBIG2Globals` entry):

```rust,no_run
# let (data, globals) = (Vec::<u8>::new(), Vec::<u8>::new());
let decoded = jbig2_decode::decode_embedded_document(&data, Some(&globals));

for page in &decoded.document.pages {
    println!("page {}: {}x{}", page.number, page.width, page.height);
}

if let Some(error) = decoded.error {
    eprintln!("decoding stopped early: {error}");
}
```

# Features
- `std` (default): Use the standard library.
- `image` (default): Convert bitmaps with [`Bitmap::to_luma8`].
- `logging`: Report recoverable problems in the input through the `log`
  crate.

# Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![no_std]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

#[macro_use]
mod log;

mod arithmetic_decoder;
mod bitmap;
mod context;
mod decode;
mod error;
mod file;
mod gray_scale;
mod integer_decoder;
mod page_info;
mod reader;
mod segment;
mod store;
mod symbol_id_decoder;

#[cfg(test)]
#[path = "../tests/support/encoder.rs"]
mod test_encoder;

use alloc::vec::Vec;

use decode::pattern::PatternDictionary;
use decode::{DecodedRegion, generic, generic_refinement, halftone, pattern, symbol, text};
use error::bail;
use file::Segments;
use page_info::{PageInformation, parse_page_information};
use reader::Reader;
use segment::{RegionKind, Segment, SegmentHeader, SegmentType};
use store::SegmentStore;

pub use bitmap::{Bitmap, CombinationOperator};
pub use error::{
    DecodeError, Feature, FormatError, ParseError, RegionError, Result, SegmentError, SymbolError,
    TemplateError,
};

/// A decoded page.
#[derive(Debug, Clone)]
pub struct Page {
    /// The page number the segments of the page are associated with.
    pub number: u32,
    /// The width of the page in pixels.
    pub width: u32,
    /// The height of the page in pixels. For striped pages of unknown height,
    /// this is the height given by the end of stripe segments.
    pub height: u32,
    /// The horizontal resolution in pixels per metre, 0 if unknown.
    pub x_resolution: u32,
    /// The vertical resolution in pixels per metre, 0 if unknown.
    pub y_resolution: u32,
    /// The page bitmap.
    pub bitmap: Bitmap,
}

/// An immediate region, as it was combined with its page.
#[derive(Debug, Clone)]
pub struct Region {
    /// The number of the segment the region was decoded from.
    pub segment_number: u32,
    /// The number of the page the region was combined with.
    pub page: u32,
    /// The horizontal offset of the region on the page.
    pub x: u32,
    /// The vertical offset of the region on the page.
    pub y: u32,
    /// The operator the region was combined with.
    pub combination_operator: CombinationOperator,
    /// The region bitmap.
    pub bitmap: Bitmap,
}

/// Everything decoded from a JBIG2 stream.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// The pages, in stream order.
    pub pages: Vec<Page>,
    /// The immediate regions of all pages, in stream order.
    pub regions: Vec<Region>,
}

/// The result of decoding a whole JBIG2 stream.
///
/// Decoding stops at the first segment that cannot be decoded. Everything
/// produced before that point is kept, including the page that was being
/// decoded when the error occurred.
#[derive(Debug, Clone)]
pub struct Decoded {
    /// The pages and regions decoded before any error.
    pub document: Document,
    /// The error that stopped decoding, if any.
    pub error: Option<DecodeError>,
}

/// Decode the first page of a standalone JBIG2 file.
///
/// # Example
/// ```rust,no_run
/// let data = std::fs::read("image.jb2").unwrap();
/// let bitmap = jbig2_decode::decode(&data).unwrap();
/// println!("{}x{} image", bitmap.width(), bitmap.height());
/// ```
pub fn decode(data: &[u8]) -> Result<Bitmap> {
    first_page(decode_document(data))
}

/// Decode the first page of a JBIG2 stream embedded in a PDF, with the
/// stream of global segments if there is one.
pub fn decode_embedded(data: &[u8], globals: Option<&[u8]>) -> Result<Bitmap> {
    first_page(decode_embedded_document(data, globals))
}

/// Decode all pages of a standalone JBIG2 file.
pub fn decode_document(data: &[u8]) -> Decoded {
    let (header, segments) = match file::parse_file(data) {
        Ok(parsed) => parsed,
        Err(error) => {
            return Decoded {
                document: Document::default(),
                error: Some(error),
            };
        }
    };

    let decoded = decode_streams(&[segments], data.len());

    if let Some(count) = header.page_count
        && decoded.error.is_none()
        && count as usize != decoded.document.pages.len()
    {
        lwarn!(
            "file declares {} pages but contains {}",
            count,
            decoded.document.pages.len()
        );
    }

    decoded
}

/// Decode all pages of a JBIG2 stream embedded in a PDF.
///
/// The segments of `globals` are decoded first. They usually hold
/// dictionaries that are shared between the images of a document.
pub fn decode_embedded_document(data: &[u8], globals: Option<&[u8]>) -> Decoded {
    let mut streams = Vec::with_capacity(2);

    if let Some(globals) = globals {
        streams.push(file::parse_embedded(globals));
    }

    streams.push(file::parse_embedded(data));

    let data_len = data.len() + globals.map_or(0, <[u8]>::len);

    decode_streams(&streams, data_len)
}

fn first_page(decoded: Decoded) -> Result<Bitmap> {
    if let Some(error) = decoded.error {
        return Err(error);
    }

    decoded
        .document
        .pages
        .into_iter()
        .next()
        .map(|page| page.bitmap)
        .ok_or(FormatError::MissingPageInfo.into())
}

fn decode_streams(streams: &[Segments<'_>], data_len: usize) -> Decoded {
    let mut decoder = DocumentDecoder::new(data_len);

    let error = streams
        .iter()
        .find_map(|stream| decoder.run(&stream.list).err().or(stream.error));

    Decoded {
        document: decoder.finish(),
        error,
    }
}

/// A page whose segments are being decoded.
struct PageState {
    number: u32,
    info: PageInformation,
    bitmap: Bitmap,
}

/// Decoding state across the segments of one document.
struct DocumentDecoder {
    store: SegmentStore,
    page: Option<PageState>,
    document: Document,
    /// The total size of the input, which bounds the size of pages.
    data_len: usize,
}

impl DocumentDecoder {
    fn new(data_len: usize) -> Self {
        Self {
            store: SegmentStore::new(),
            page: None,
            document: Document::default(),
            data_len,
        }
    }

    /// Decode the segments of one stream in order.
    fn run(&mut self, segments: &[Segment<'_>]) -> Result<()> {
        for segment in segments {
            if segment.header.kind == SegmentType::EndOfFile {
                break;
            }

            if let Err(e) = self.decode_segment(segment, segments) {
                lwarn!(
                    "failed to decode segment {} ({:?}): {}",
                    segment.header.number,
                    segment.header.kind,
                    e
                );

                return Err(e);
            }
        }

        Ok(())
    }

    fn finish(mut self) -> Document {
        if let Some(page) = self.page.take() {
            self.finish_page(page);
        }

        self.document
    }

    fn decode_segment(&mut self, segment: &Segment<'_>, stream: &[Segment<'_>]) -> Result<()> {
        let header = &segment.header;
        let data = segment.data;

        match header.kind {
            // "Page information – see 7.4.8."
            SegmentType::PageInformation => {
                let info = parse_page_information(&mut Reader::new(data))?;
                self.start_page(header.page, info, stream)?;
                self.store.store_other(header.number, header.kind);
            }
            // "End of page – see 7.4.9."
            SegmentType::EndOfPage => {
                self.end_page(header.page);
                self.store.store_other(header.number, header.kind);
            }
            // "End of stripe – see 7.4.10." Page heights are determined when
            // the page is started.
            SegmentType::EndOfStripe => {
                ltrace!("end of stripe of page {}", header.page);
                self.store.store_other(header.number, header.kind);
            }
            SegmentType::SymbolDictionary => {
                // "1) Concatenate all the input symbol dictionaries to form
                // SDINSYMS." (6.5.5)
                let dictionaries = self.store.symbol_dictionaries(&header.referred_to)?;
                let input = store::exported_symbols(&dictionaries);
                let dictionary = symbol::decode(data, &input, dictionaries.last().copied())?;
                self.store.store_symbol_dictionary(header.number, dictionary);
            }
            SegmentType::PatternDictionary => {
                let dictionary = pattern::decode(data)?;
                self.store.store_pattern_dictionary(header.number, dictionary);
            }
            SegmentType::TextRegion(kind) => {
                // SBSYMS
                let dictionaries = self.store.symbol_dictionaries(&header.referred_to)?;
                let symbols = store::exported_symbols(&dictionaries);
                let region = text::decode(data, &symbols)?;
                self.place_region(header, kind, region)?;
            }
            SegmentType::HalftoneRegion(kind) => {
                let region = self.decode_halftone(segment)?;
                self.place_region(header, kind, region)?;
            }
            SegmentType::GenericRegion(kind) => {
                let region = generic::decode(data, header.data_length.is_none())?;
                self.place_region(header, kind, region)?;
            }
            SegmentType::RefinementRegion(kind) => {
                let region = self.decode_refinement(segment)?;
                self.place_region(header, kind, region)?;
            }
            SegmentType::Tables
            | SegmentType::Profiles
            | SegmentType::ColourPalette
            | SegmentType::Extension => {
                ldebug!(
                    "skipping segment {} ({:?}, {} bytes)",
                    header.number,
                    header.kind,
                    data.len()
                );
                self.store.store_other(header.number, header.kind);
            }
            SegmentType::EndOfFile => {}
        }

        Ok(())
    }

    fn start_page(
        &mut self,
        number: u32,
        info: PageInformation,
        stream: &[Segment<'_>],
    ) -> Result<()> {
        if let Some(open) = self.page.take() {
            lwarn!("page {} is missing its end of page segment", open.number);
            self.finish_page(open);
        }

        // "A page's bitmap height may be declared in its page information
        // segment to be unknown (by specifying a height of 0xFFFFFFFF). In
        // this case, the page must be striped." (7.4.8.2)
        let height = match info.height {
            Some(height) => height,
            None => {
                if !info.striping.striped {
                    lwarn!("page {} of unknown height is not striped", number);
                }

                stripe_height(stream, number).ok_or(FormatError::UnknownPageHeight)?
            }
        };

        bitmap::check_region_size(info.width, height, self.data_len)?;

        ldebug!(
            "page {}: {}x{}, resolution {}x{}, default pixel {}, {:?} (overridden {}), \
             striped {} ({}), lossless {}, refinements {}, auxiliary buffers {}",
            number,
            info.width,
            height,
            info.x_resolution,
            info.y_resolution,
            info.flags.default_pixel,
            info.flags.default_operator,
            info.flags.operator_overridden,
            info.striping.striped,
            info.striping.max_stripe_size,
            info.flags.lossless,
            info.flags.refinements,
            info.flags.auxiliary_buffers
        );

        if info.flags.coloured {
            lwarn!("page {} might contain coloured segments", number);
        }

        // "Bit 2: Page default pixel value. This bit contains the initial
        // value for every pixel in the page, before any region segments are
        // decoded or drawn." (7.4.8.5)
        let bitmap = Bitmap::filled(info.width, height, info.flags.default_pixel)?;

        self.page = Some(PageState {
            number,
            info,
            bitmap,
        });

        Ok(())
    }

    fn end_page(&mut self, number: u32) {
        match self.page.take() {
            Some(page) => {
                if page.number != number {
                    lwarn!(
                        "end of page segment of page {} ends page {}",
                        number,
                        page.number
                    );
                }

                self.finish_page(page);
            }
            None => lwarn!("end of page segment of page {} without a page", number),
        }
    }

    fn finish_page(&mut self, page: PageState) {
        ldebug!("finished page {}", page.number);

        self.document.pages.push(Page {
            number: page.number,
            width: page.bitmap.width(),
            height: page.bitmap.height(),
            x_resolution: page.info.x_resolution,
            y_resolution: page.info.y_resolution,
            bitmap: page.bitmap,
        });
    }

    /// The open page, which segments associated with page `number` are
    /// combined with.
    fn current_page(&mut self, number: u32) -> Result<&mut PageState> {
        let Some(page) = self.page.as_mut() else {
            bail!(FormatError::MissingPageInfo);
        };

        if page.number != number {
            // Some embedded streams associate their regions with no page.
            if number != 0 {
                bail!(FormatError::UnknownPage);
            }

            lwarn!("region without page association, using page {}", page.number);
        }

        Ok(page)
    }

    fn decode_halftone(&self, segment: &Segment<'_>) -> Result<DecodedRegion> {
        let dictionaries = self
            .store
            .pattern_dictionaries(&segment.header.referred_to)?;

        if let [dictionary] = dictionaries.as_slice() {
            return halftone::decode(segment.data, dictionary);
        }

        lwarn!(
            "halftone region refers to {} pattern dictionaries",
            dictionaries.len()
        );

        let joined = PatternDictionary::concat(dictionaries.iter().copied())
            .ok_or(SegmentError::MissingReference)?;

        halftone::decode(segment.data, &joined)
    }

    /// 7.4.7.5
    fn decode_refinement(&mut self, segment: &Segment<'_>) -> Result<DecodedRegion> {
        let header = &segment.header;

        match header.referred_to.as_slice() {
            // "2) If there are no referred-to segments, then use the page
            // bitmap as the reference buffer."
            [] => {
                let page = self.current_page(header.page)?;
                generic_refinement::decode(segment.data, &page.bitmap, 0, 0)
            }
            // "3) Determine the buffer associated with the region segment
            // that this segment refers to."
            [referred, rest @ ..] => {
                if !rest.is_empty() {
                    lwarn!("refinement region refers to {} segments", rest.len() + 1);
                }

                let reference = self.store.region(*referred)?;
                let region = generic_refinement::decode(
                    segment.data,
                    &reference.bitmap,
                    reference.info.x as i64,
                    reference.info.y as i64,
                )?;

                if (region.bitmap.width(), region.bitmap.height())
                    != (reference.bitmap.width(), reference.bitmap.height())
                {
                    lwarn!(
                        "refinement region {} differs in size from region {}",
                        header.number,
                        referred
                    );
                }

                Ok(region)
            }
        }
    }

    /// Keep an intermediate region for later segments, or combine an
    /// immediate region with its page.
    fn place_region(
        &mut self,
        header: &SegmentHeader,
        kind: RegionKind,
        region: DecodedRegion,
    ) -> Result<()> {
        if !kind.is_immediate() {
            self.store.store_region(header.number, region);
            return Ok(());
        }

        let page = self.current_page(header.page)?;
        let flags = &page.info.flags;
        let mut operator = region.info.operator;

        // "If this bit is 0, then every direct region segment associated with
        // this page must use the page's default combination operator."
        // (7.4.8.5)
        if !flags.operator_overridden && operator != flags.default_operator {
            lwarn!(
                "region {} uses {:?} instead of the page default {:?}",
                header.number,
                operator,
                flags.default_operator
            );
            operator = flags.default_operator;
        }

        match (i32::try_from(region.info.x), i32::try_from(region.info.y)) {
            (Ok(x), Ok(y)) => page.bitmap.blit(&region.bitmap, x, y, operator),
            _ => lwarn!("region {} lies outside of the page", header.number),
        }

        let page = page.number;

        self.document.regions.push(Region {
            segment_number: header.number,
            page,
            x: region.info.x,
            y: region.info.y,
            combination_operator: operator,
            bitmap: region.bitmap,
        });
        self.store.store_other(header.number, header.kind);

        Ok(())
    }
}

/// The height of a striped page of unknown height, one more than the last row
/// of any of its stripes (7.4.10).
fn stripe_height(stream: &[Segment<'_>], page: u32) -> Option<u32> {
    stream
        .iter()
        .filter(|segment| {
            segment.header.kind == SegmentType::EndOfStripe && segment.header.page == page
        })
        .filter_map(|segment| {
            let row: [u8; 4] = segment.data.get(..4)?.try_into().ok()?;
            u32::from_be_bytes(row).checked_add(1)
        })
        .max()
}
