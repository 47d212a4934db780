//! Dispatch contexts: everything a kernel call needs for one output row, computed by `setup`
//! and read concurrently by `run`.

use crate::capabilities::PoolTile;
use crate::error::{Result, try_grow};
use crate::indirection::IndirectionLayout;
use crate::params::{doz, round_up};
use crate::threadpool::ThreadPool;
use pool_rs_kernels::IndirectInput;

/// Unipass or multipass kernel shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Passes {
    Unipass,
    Multipass,
}

impl Passes {
    pub fn select(pooling_size: usize, tile: PoolTile) -> Self {
        if pooling_size <= tile.mr as usize {
            Passes::Unipass
        } else {
            Passes::Multipass
        }
    }

    /// Per-row accumulator elements the kernel needs.
    pub fn scratch_width(self, channels: usize) -> usize {
        match self {
            Passes::Unipass => 0,
            Passes::Multipass => channels,
        }
    }
}

/// Tap entries a reducing kernel advances internally per window, for kernels whose last pass
/// does not advance (average and arg-max).
pub(crate) fn reduce_adjustment(pooling_size: usize, tile: PoolTile) -> usize {
    let (mr, qr) = (tile.mr as usize, tile.qr as usize);
    if pooling_size > mr {
        round_up(pooling_size - mr, qr) + mr - qr
    } else {
        0
    }
}

/// Tap entries the max kernel advances internally per window; every pass advances.
pub(crate) fn max_adjustment(pooling_size: usize, tile: PoolTile) -> usize {
    let (mr, qr) = (tile.mr as usize, tile.qr as usize);
    round_up(doz(pooling_size, mr), qr) + mr
}

/// Row addressing shared by every pooling context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PoolingRows {
    /// Table entries per output row.
    pub indirect_input_height_stride: usize,
    pub output_width: usize,
    pub pooling_size: usize,
    pub channels: usize,
    /// Signed tap-cursor advance between consecutive windows, net of the kernel's own advance.
    pub input_increment: isize,
    /// Output elements skipped after each pixel's channels.
    pub output_increment: usize,
}

impl PoolingRows {
    pub fn new(layout: &IndirectionLayout, channels: usize, output_pixel_stride: usize, adjustment: usize) -> Self {
        Self {
            indirect_input_height_stride: layout.step_height,
            output_width: layout.output_width,
            pooling_size: layout.pooling_height * layout.pooling_width,
            channels,
            input_increment: (layout.pooling_height * layout.step_width) as isize - adjustment as isize,
            output_increment: output_pixel_stride - channels,
        }
    }

    /// The table view positioned at the first window of output row `row` (batch-major).
    #[inline]
    pub fn row_input<'a, T>(&self, input: IndirectInput<'a, T>, row: usize) -> IndirectInput<'a, T> {
        input.offset(row * self.indirect_input_height_stride)
    }
}

/// Splits the first `len` elements of `output` into rows of `height_stride` elements. The last
/// row may be shorter; it still holds every element a kernel writes.
pub(crate) fn row_cells<T>(output: &mut [T], len: usize, height_stride: usize) -> Vec<&mut [T]> {
    output[..len].chunks_mut(height_stride).collect()
}

/// Grows `scratch` to `rows * width` elements and splits it into one `width`-element slice per
/// output row. Multipass kernels keep their running accumulators there; a zero `width` yields
/// empty slices.
pub(crate) fn scratch_cells<S: Clone>(
    scratch: &mut Vec<S>,
    rows: usize,
    width: usize,
    value: S,
) -> Result<Vec<&mut [S]>> {
    try_grow(scratch, rows.saturating_mul(width), value, "multipass buffer")?;
    let mut rest = scratch.as_mut_slice();
    Ok((0..rows)
        .map(|_| {
            let (cell, tail) = std::mem::take(&mut rest).split_at_mut(width);
            rest = tail;
            cell
        })
        .collect())
}

/// Runs `task(batch, output_y, row, scratch)` for every output row of a
/// `(batch_size, output_height)` grid.
pub(crate) fn dispatch_rows<T, S, P, F>(
    threadpool: &P,
    batch_size: usize,
    output_height: usize,
    cells: &mut [(&mut [T], &mut [S])],
    task: F,
) where
    T: Send,
    S: Send,
    P: ThreadPool,
    F: Fn(usize, usize, &mut [T], &mut [S]) + Sync + Send,
{
    threadpool.parallelize_2d((batch_size, output_height), cells, |batch, output_y, (row, scratch)| {
        task(batch, output_y, &mut row[..], &mut scratch[..])
    });
}
