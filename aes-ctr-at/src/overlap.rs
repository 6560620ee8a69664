//! Aliasing check for ranges of one buffer.

use core::ops::Range;

/// How a source range relates to a destination range.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Overlap {
    /// No shared bytes.
    Disjoint,
    /// Same start and length; the operation can run in place.
    Identical,
    /// Shared bytes at different positions.
    Partial,
}

pub(crate) fn classify(src: &Range<usize>, dst: &Range<usize>) -> Overlap {
    if src == dst {
        return Overlap::Identical;
    }
    if src.is_empty() || dst.is_empty() {
        return Overlap::Disjoint;
    }
    if src.start < dst.end && dst.start < src.end {
        Overlap::Partial
    } else {
        Overlap::Disjoint
    }
}
