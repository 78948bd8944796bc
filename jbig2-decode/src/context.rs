//! Adaptive probability state for the arithmetic decoder.

use alloc::vec;
use alloc::vec::Vec;
use core::ops::{Index, IndexMut};

/// The probability state of a single context (E.2.4).
///
/// "Each context has associated with it an index, I(CX), which identifies a
/// particular probability estimate and its associated MPS value."
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Context {
    /// `I(CX)`, a row in the Qe table.
    pub(crate) index: u8,
    /// `MPS(CX)`, either 0 or 1.
    pub(crate) mps: u8,
}

/// A table of contexts, indexed by context value.
///
/// Every coding procedure (a generic region template, a refinement template,
/// each `IAx` procedure) owns one of these. All cells start out with index 0
/// and an MPS of 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContextStats {
    cells: Vec<Context>,
}

impl ContextStats {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            cells: vec![Context::default(); size],
        }
    }

    /// A table for contexts formed from `bits` pixels.
    pub(crate) fn with_context_bits(bits: u32) -> Self {
        Self::new(1 << bits)
    }

    /// Replace the state of every cell with the state stored in `other`,
    /// reusing this table's allocation.
    pub(crate) fn overwrite(&mut self, other: &Self) {
        self.cells.clone_from(&other.cells);
    }
}

impl Index<u32> for ContextStats {
    type Output = Context;

    #[inline(always)]
    fn index(&self, cx: u32) -> &Context {
        &self.cells[cx as usize]
    }
}

impl IndexMut<u32> for ContextStats {
    #[inline(always)]
    fn index_mut(&mut self, cx: u32) -> &mut Context {
        &mut self.cells[cx as usize]
    }
}
