//! Indirection builder.
//!
//! Lays out, for every `(batch, output_y)` row, the taps of all its windows as one flat run of
//! [`Tap`]s so a kernel can slide across the row by a constant increment. Taps are stored
//! column-major within a window (`kernel_x * pooling_height + kernel_y`), and consecutive
//! windows of a row start `step_width` columns apart. When windows overlap, the shared columns
//! are stored once.
//!
//! Tables hold offsets rather than addresses, so for a fixed geometry the table is a pure
//! function of the tap coordinates and rebuilding any batch range in place is idempotent.

use pool_rs_kernels::Tap;

/// Everything a table depends on, resolved for one `setup`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct IndirectionLayout {
    pub input_height: usize,
    pub input_width: usize,
    pub input_pixel_stride: usize,
    pub output_height: usize,
    pub output_width: usize,
    pub pooling_height: usize,
    pub pooling_width: usize,
    pub stride_height: usize,
    pub stride_width: usize,
    pub dilation_height: usize,
    pub dilation_width: usize,
    pub padding_top: usize,
    pub padding_left: usize,
    /// Tap columns between the starts of consecutive windows.
    pub step_width: usize,
    /// Table entries per output row.
    pub step_height: usize,
}

impl IndirectionLayout {
    /// Table entries covering `batch_size` batch elements, without the guard region.
    pub fn len(&self, batch_size: usize) -> usize {
        batch_size * self.output_height * self.step_height
    }

    #[inline]
    fn index(&self, batch: usize, output_y: usize, output_x: usize, kernel_y: usize, kernel_x: usize) -> usize {
        (batch * self.output_height + output_y) * self.step_height
            + output_x * self.step_width * self.pooling_height
            + kernel_x * self.pooling_height
            + kernel_y
    }

    #[inline]
    fn pixel(&self, batch: usize, y: usize, x: usize) -> Tap {
        Tap::Input(((batch * self.input_height + y) * self.input_width + x) * self.input_pixel_stride)
    }
}

/// Entries per output row for windows `step_width` columns apart.
pub(crate) fn step_height(
    pooling_height: usize,
    pooling_width: usize,
    output_width: usize,
    step_width: usize,
) -> usize {
    pooling_height * pooling_width + (output_width * step_width - 1) * pooling_height
}

/// Fills batches `batch_start..batch_end` for zero-padded windows: taps in the padding resolve
/// to the zero row.
pub(crate) fn init_zero_padded(
    table: &mut [Tap],
    layout: &IndirectionLayout,
    batch_start: usize,
    batch_end: usize,
) {
    let l = layout;
    for batch in batch_start..batch_end {
        for output_y in 0..l.output_height {
            for kernel_y in 0..l.pooling_height {
                let input_y = (output_y * l.stride_height + kernel_y * l.dilation_height)
                    .checked_sub(l.padding_top)
                    .filter(|&y| y < l.input_height);
                for output_x in 0..l.output_width {
                    for kernel_x in 0..l.pooling_width {
                        let input_x = (output_x * l.stride_width + kernel_x * l.dilation_width)
                            .checked_sub(l.padding_left)
                            .filter(|&x| x < l.input_width);
                        let tap = match (input_y, input_x) {
                            (Some(y), Some(x)) => l.pixel(batch, y, x),
                            _ => Tap::Zero,
                        };
                        table[l.index(batch, output_y, output_x, kernel_y, kernel_x)] = tap;
                    }
                }
            }
        }
    }
}

/// Resolves padded tap `kernel` of a window starting at padded coordinate `start` to an input
/// coordinate inside `0..size`.
///
/// In-bounds taps map to themselves. Out-of-bounds taps map to the nearest in-bounds tap of the
/// same window, or to the nearest input edge when the window has none.
fn clamp_tap(start: usize, kernel: usize, dilation: usize, padding: usize, size: usize, taps: usize) -> usize {
    let at = |k: usize| (start + k * dilation).checked_sub(padding);
    match at(kernel) {
        Some(c) if c < size => c,
        Some(_) => (0..kernel)
            .rev()
            .filter_map(at)
            .find(|&c| c < size)
            .unwrap_or(size - 1),
        None => (kernel + 1..taps)
            .filter_map(at)
            .find(|&c| c < size)
            .unwrap_or(0),
    }
}

/// Fills batches `batch_start..batch_end` for windows whose padded taps repeat a real input
/// pixel of the same window, so padding never wins a max reduction.
pub(crate) fn init_edge_clamped(
    table: &mut [Tap],
    layout: &IndirectionLayout,
    batch_start: usize,
    batch_end: usize,
) {
    let l = layout;
    for batch in batch_start..batch_end {
        for output_y in 0..l.output_height {
            for kernel_y in 0..l.pooling_height {
                let input_y = clamp_tap(
                    output_y * l.stride_height,
                    kernel_y,
                    l.dilation_height,
                    l.padding_top,
                    l.input_height,
                    l.pooling_height,
                );
                for output_x in 0..l.output_width {
                    for kernel_x in 0..l.pooling_width {
                        let input_x = clamp_tap(
                            output_x * l.stride_width,
                            kernel_x,
                            l.dilation_width,
                            l.padding_left,
                            l.input_width,
                            l.pooling_width,
                        );
                        table[l.index(batch, output_y, output_x, kernel_y, kernel_x)] =
                            l.pixel(batch, input_y, input_x);
                    }
                }
            }
        }
    }
}

/// Overwrites the `guard` entries after the last window of `batch_size` batches with the zero
/// row, so over-reads never resolve to a stale offset.
pub(crate) fn fill_guard(table: &mut [Tap], layout: &IndirectionLayout, batch_size: usize, guard: usize) {
    let end = layout.len(batch_size);
    table[end..end + guard].fill(Tap::Zero);
}

/// Reference tap for one padded window coordinate, ignoring the table layout.
#[cfg(test)]
fn reference_tap(
    layout: &IndirectionLayout,
    batch: usize,
    output_y: usize,
    output_x: usize,
    kernel_y: usize,
    kernel_x: usize,
) -> Tap {
    let y = (output_y * layout.stride_height + kernel_y * layout.dilation_height) as isize - layout.padding_top as isize;
    let x = (output_x * layout.stride_width + kernel_x * layout.dilation_width) as isize - layout.padding_left as isize;
    if y < 0 || x < 0 || y as usize >= layout.input_height || x as usize >= layout.input_width {
        Tap::Zero
    } else {
        layout.pixel(batch, y as usize, x as usize)
    }
}
