//! Decoded segments that later segments may refer to.

use alloc::vec::Vec;

use crate::bitmap::Bitmap;
use crate::decode::DecodedRegion;
use crate::decode::pattern::PatternDictionary;
use crate::decode::symbol::SymbolDictionary;
use crate::error::{Result, SegmentError, bail};
use crate::segment::SegmentType;

/// The result of decoding one segment.
#[derive(Debug)]
enum Entry {
    SymbolDictionary(SymbolDictionary),
    PatternDictionary(PatternDictionary),
    /// An intermediate region.
    Region(DecodedRegion),
    /// A segment that produced nothing to refer to.
    Other(SegmentType),
}

/// All segments decoded so far, ordered by segment number.
///
/// Segments are never dropped, so every reference to a lower segment number
/// of the same stream (or of the global segments) resolves.
#[derive(Debug, Default)]
pub(crate) struct SegmentStore {
    entries: Vec<(u32, Entry)>,
}

impl SegmentStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, number: u32, entry: Entry) {
        // Numbers mostly arrive in increasing order. Global segments and the
        // page stream may interleave, and a repeated number replaces the
        // earlier segment.
        match self.entries.binary_search_by_key(&number, |(n, _)| *n) {
            Ok(idx) => {
                lwarn!("segment number {} is used more than once", number);
                self.entries[idx].1 = entry;
            }
            Err(idx) => self.entries.insert(idx, (number, entry)),
        }
    }

    fn get(&self, number: u32) -> Result<&Entry> {
        match self.entries.binary_search_by_key(&number, |(n, _)| *n) {
            Ok(idx) => Ok(&self.entries[idx].1),
            Err(_) => {
                lwarn!("referred-to segment {} is not available", number);
                bail!(SegmentError::MissingReference)
            }
        }
    }

    pub(crate) fn store_symbol_dictionary(&mut self, number: u32, dictionary: SymbolDictionary) {
        self.insert(number, Entry::SymbolDictionary(dictionary));
    }

    pub(crate) fn store_pattern_dictionary(&mut self, number: u32, dictionary: PatternDictionary) {
        self.insert(number, Entry::PatternDictionary(dictionary));
    }

    pub(crate) fn store_region(&mut self, number: u32, region: DecodedRegion) {
        self.insert(number, Entry::Region(region));
    }

    /// Record a segment that cannot be used as input of another segment.
    pub(crate) fn store_other(&mut self, number: u32, kind: SegmentType) {
        self.insert(number, Entry::Other(kind));
    }

    /// The symbol dictionaries among `referred`, in reference order.
    ///
    /// Tables segments are passed over since they only matter to Huffman
    /// coding, which fails later with a precise error. Any other kind of
    /// segment is a type mismatch.
    pub(crate) fn symbol_dictionaries(&self, referred: &[u32]) -> Result<Vec<&SymbolDictionary>> {
        let mut dictionaries = Vec::new();

        for &number in referred {
            match self.get(number)? {
                Entry::SymbolDictionary(dictionary) => dictionaries.push(dictionary),
                Entry::Other(SegmentType::Tables) => {}
                _ => bail!(SegmentError::TypeMismatch),
            }
        }

        Ok(dictionaries)
    }

    /// The pattern dictionaries among `referred`, in reference order.
    pub(crate) fn pattern_dictionaries(&self, referred: &[u32]) -> Result<Vec<&PatternDictionary>> {
        let mut dictionaries = Vec::with_capacity(referred.len());

        for &number in referred {
            match self.get(number)? {
                Entry::PatternDictionary(dictionary) => dictionaries.push(dictionary),
                _ => bail!(SegmentError::TypeMismatch),
            }
        }

        Ok(dictionaries)
    }

    /// The intermediate region `number` refers to.
    pub(crate) fn region(&self, number: u32) -> Result<&DecodedRegion> {
        match self.get(number)? {
            Entry::Region(region) => Ok(region),
            _ => bail!(SegmentError::TypeMismatch),
        }
    }
}

/// The symbols exported by `dictionaries`, concatenated in order.
pub(crate) fn exported_symbols<'a>(dictionaries: &[&'a SymbolDictionary]) -> Vec<&'a Bitmap> {
    dictionaries
        .iter()
        .flat_map(|dictionary| dictionary.exported.iter())
        .collect()
}
