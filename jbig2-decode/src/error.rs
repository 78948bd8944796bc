//! Error types for JBIG2 decoding.

use core::fmt;

/// The main error type for JBIG2 decoding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Errors related to reading raw data.
    Parse(ParseError),
    /// Errors related to the file structure.
    Format(FormatError),
    /// Errors related to segment headers and segment references.
    Segment(SegmentError),
    /// Errors related to region parameters.
    Region(RegionError),
    /// Errors related to template configuration.
    Template(TemplateError),
    /// Errors related to symbol handling.
    Symbol(SymbolError),
    /// Arithmetic overflow in coordinate or size calculations.
    Overflow,
    /// The stream uses a coding mode this decoder does not implement.
    Unsupported(Feature),
}

/// Errors related to reading raw data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Unexpected end of input.
    UnexpectedEof,
}

/// Errors related to the file structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// Invalid file header signature.
    InvalidHeader,
    /// A region segment appeared before the page information segment.
    MissingPageInfo,
    /// Page height unknown with no end of stripe segments.
    UnknownPageHeight,
    /// A segment is associated with a page that has not been started.
    UnknownPage,
}

/// Errors related to segment headers and segment references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentError {
    /// Unknown or reserved segment type.
    UnknownType,
    /// Reserved referred-to segment count (5 or 6).
    InvalidReferredCount,
    /// A segment refers to a segment number that is not lower than its own.
    InvalidReference,
    /// A referred-to segment has not been decoded.
    MissingReference,
    /// A referred-to segment is of an incompatible type.
    TypeMismatch,
    /// Missing end marker for a region of unknown length.
    MissingEndMarker,
}

/// Errors related to region parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionError {
    /// Invalid combination operator value.
    InvalidCombinationOperator,
    /// Region with an invalid dimension.
    InvalidDimension,
    /// The declared bitmap size is out of proportion to the available data.
    TooLarge,
    /// Gray-scale value exceeds the pattern count.
    GrayScaleOutOfRange,
}

/// Errors related to template configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateError {
    /// An invalid template value was used.
    Invalid,
    /// Invalid adaptive template pixel location.
    InvalidAtPixel,
}

/// Errors related to symbol handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolError {
    /// No symbols available for a text region.
    NoSymbols,
    /// More symbols than declared, or more than the data can hold.
    TooManySymbols,
    /// Symbol ID out of valid range.
    OutOfRange,
    /// Unexpected out-of-band value.
    UnexpectedOob,
    /// The number of exported symbols differs from the declared count.
    ExportMismatch,
    /// Inherited coding contexts are missing or were coded with other templates.
    MissingRetainedContext,
}

/// A coding mode that is not implemented by this decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Huffman-coded symbol dictionaries and text regions.
    Huffman,
    /// MMR-coded generic regions.
    Mmr,
    /// Generic region templates with 12 adaptive pixels.
    ExtendedTemplate,
    /// Regions with colour extension.
    ColourExtension,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "{e}"),
            Self::Format(e) => write!(f, "{e}"),
            Self::Segment(e) => write!(f, "{e}"),
            Self::Region(e) => write!(f, "{e}"),
            Self::Template(e) => write!(f, "{e}"),
            Self::Symbol(e) => write!(f, "{e}"),
            Self::Overflow => write!(f, "arithmetic overflow"),
            Self::Unsupported(feature) => write!(f, "unsupported feature: {feature}"),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHeader => write!(f, "invalid JBIG2 file header"),
            Self::MissingPageInfo => write!(f, "missing page information segment"),
            Self::UnknownPageHeight => write!(f, "page height unknown with no stripe segments"),
            Self::UnknownPage => write!(f, "segment belongs to an unknown page"),
        }
    }
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType => write!(f, "unknown or reserved segment type"),
            Self::InvalidReferredCount => write!(f, "invalid referred-to segment count"),
            Self::InvalidReference => write!(f, "segment refers to a later segment"),
            Self::MissingReference => write!(f, "referred-to segment is not available"),
            Self::TypeMismatch => write!(f, "referred-to segment has an incompatible type"),
            Self::MissingEndMarker => write!(f, "missing end marker for unknown-length region"),
        }
    }
}

impl fmt::Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCombinationOperator => write!(f, "invalid combination operator"),
            Self::InvalidDimension => write!(f, "invalid dimension value"),
            Self::TooLarge => write!(f, "bitmap size exceeds the available data"),
            Self::GrayScaleOutOfRange => write!(f, "gray-scale value exceeds pattern count"),
        }
    }
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => write!(f, "invalid template value"),
            Self::InvalidAtPixel => write!(f, "invalid adaptive template pixel location"),
        }
    }
}

impl fmt::Display for SymbolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSymbols => write!(f, "no symbols available"),
            Self::TooManySymbols => write!(f, "too many symbols"),
            Self::OutOfRange => write!(f, "symbol ID out of range"),
            Self::UnexpectedOob => write!(f, "unexpected out-of-band value"),
            Self::ExportMismatch => write!(f, "exported symbol count mismatch"),
            Self::MissingRetainedContext => write!(f, "no compatible retained coding context"),
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Huffman => write!(f, "Huffman coding"),
            Self::Mmr => write!(f, "MMR coding"),
            Self::ExtendedTemplate => write!(f, "extended generic template"),
            Self::ColourExtension => write!(f, "colour extension"),
        }
    }
}

impl core::error::Error for DecodeError {}
impl core::error::Error for ParseError {}
impl core::error::Error for FormatError {}
impl core::error::Error for SegmentError {}
impl core::error::Error for RegionError {}
impl core::error::Error for TemplateError {}
impl core::error::Error for SymbolError {}

impl From<ParseError> for DecodeError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<FormatError> for DecodeError {
    fn from(e: FormatError) -> Self {
        Self::Format(e)
    }
}

impl From<SegmentError> for DecodeError {
    fn from(e: SegmentError) -> Self {
        Self::Segment(e)
    }
}

impl From<RegionError> for DecodeError {
    fn from(e: RegionError) -> Self {
        Self::Region(e)
    }
}

impl From<TemplateError> for DecodeError {
    fn from(e: TemplateError) -> Self {
        Self::Template(e)
    }
}

impl From<SymbolError> for DecodeError {
    fn from(e: SymbolError) -> Self {
        Self::Symbol(e)
    }
}

impl From<Feature> for DecodeError {
    fn from(feature: Feature) -> Self {
        Self::Unsupported(feature)
    }
}

/// Result type for JBIG2 decoding operations.
pub type Result<T> = core::result::Result<T, DecodeError>;

macro_rules! bail {
    ($err:expr) => {
        return Err($err.into())
    };
}

macro_rules! err {
    ($err:expr) => {
        Err($err.into())
    };
}

pub(crate) use bail;
pub(crate) use err;
