//! # pool-rs-kernels
//!
//! Portable windowed-reduction micro-kernels consumed by `pool-rs`.
//!
//! Every kernel walks an **indirection table**: a flat list of [`Tap`]s where each entry names
//! one input pixel (a full channel vector) or the shared zero row. A kernel call reduces one
//! output row: for each of its `n` output pixels it reads the pixel's `ks` taps, reduces them
//! element-wise over `kc` channels, writes `kc` outputs and then advances both cursors by the
//! caller-supplied increments.
//!
//! ## Tiling
//!
//! Kernels come in two shapes, named after their tiling constants:
//!
//! - **unipass** (`up9`, `up4`): reduces windows of up to `mr` taps in a single pass.
//! - **multipass** (`mp9p8q`): reduces `mr = 9` taps first, then chunks of `qr = 8` taps,
//!   carrying partial results through a scratch buffer of `kc` elements.
//!
//! Kernels always read whole tiles from the indirection table. Entries past the end of a window
//! are read and then discarded, so callers must leave `mr - 1` guard entries after the last
//! window of a table.

use num_traits::{FromPrimitive, Num, NumAssign, ToPrimitive};
use std::fmt::Debug;

pub mod argmaxpool;
pub mod avgpool;
pub mod maxpool;
pub mod params;
pub mod pavgpool;
pub mod prelu;
pub mod q8_avgpool;

pub use argmaxpool::{f32_argmaxpool_mp9p8q, f32_argmaxpool_up4, f32_argmaxpool_up9};
pub use avgpool::{f32_avgpool_mp9p8q, f32_avgpool_up9};
pub use maxpool::maxpool_9p8q;
pub use params::{F32AvgPoolParams, OutputParams, Q8AvgPoolParams};
pub use pavgpool::{f32_pavgpool_mp9p8q, f32_pavgpool_up9};
pub use prelu::f32_prelu_x4;
pub use q8_avgpool::{q8_avgpool_mp9p8q, q8_avgpool_up9};

/// Trait bound for elements that can be processed by kernels.
pub trait KernelElem:
    Num + NumAssign + Copy + Clone + Debug + Send + Sync + FromPrimitive + ToPrimitive + PartialOrd
{
}

impl<T> KernelElem for T where
    T: Num
        + NumAssign
        + Copy
        + Clone
        + Debug
        + Send
        + Sync
        + FromPrimitive
        + ToPrimitive
        + PartialOrd
{
}

/// One entry of an indirection table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Tap {
    /// Element offset of a pixel's first channel within the input buffer.
    Input(usize),
    /// The zero row: a padded tap, or a filler past the end of a window.
    #[default]
    Zero,
}

/// A view of an indirection table together with the buffers its taps resolve into.
#[derive(Clone, Copy, Debug)]
pub struct IndirectInput<'a, T> {
    taps: &'a [Tap],
    input: &'a [T],
    zero: &'a [T],
}

impl<'a, T> IndirectInput<'a, T> {
    /// Creates a view over `taps`, resolving [`Tap::Input`] into `input` and [`Tap::Zero`]
    /// into `zero`.
    pub fn new(taps: &'a [Tap], input: &'a [T], zero: &'a [T]) -> Self {
        Self { taps, input, zero }
    }

    /// Returns the view starting `offset` entries further into the table.
    pub fn offset(self, offset: usize) -> Self {
        Self {
            taps: &self.taps[offset..],
            ..self
        }
    }

    /// Number of tap entries visible through this view.
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    #[inline]
    pub fn tap(&self, index: usize) -> Tap {
        self.taps[index]
    }

    /// Resolves a tap into the pixel row it names. The row is open-ended; kernels read its
    /// first `kc` elements.
    #[inline]
    pub fn row(&self, tap: Tap) -> &'a [T] {
        match tap {
            Tap::Input(offset) => &self.input[offset..],
            Tap::Zero => self.zero,
        }
    }
}

/// What a kernel substitutes for tile entries past the end of a window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Filler {
    /// The zero row. Neutral for sums.
    Zero,
    /// The first row of the tile. Neutral for max and arg-max.
    First,
}

/// Loads a tile of `N` rows starting at `cursor`, of which the first `valid` are real.
///
/// All `N` entries are read from the table even when they are replaced.
#[inline]
pub(crate) fn load_tile<'a, T, const N: usize>(
    input: &IndirectInput<'a, T>,
    cursor: usize,
    valid: usize,
    filler: Filler,
) -> [&'a [T]; N] {
    let taps: [Tap; N] = std::array::from_fn(|i| input.tap(cursor + i));
    let first = input.row(taps[0]);
    std::array::from_fn(|i| {
        if i < valid {
            input.row(taps[i])
        } else {
            match filler {
                Filler::Zero => input.zero,
                Filler::First => first,
            }
        }
    })
}

/// Moves a tap cursor by a signed increment.
#[inline]
pub(crate) fn advance(cursor: usize, increment: isize) -> usize {
    cursor.wrapping_add_signed(increment)
}
