use crate::{Filler, IndirectInput, KernelElem, OutputParams, advance, load_tile};

#[inline]
fn max_of<T: KernelElem, const N: usize>(rows: &[&[T]; N], k: usize, init: T) -> T {
    rows.iter()
        .map(|row| row[k])
        .fold(init, |acc, v| if v > acc { v } else { acc })
}

/// Max pooling over windows of any size, for any ordered element type.
///
/// The first pass reduces 9 taps straight into `output`; every following pass reduces 8 more
/// taps together with the partial maximum already in `output`. Windows shorter than a tile are
/// padded with their first tap, which never changes the maximum.
///
/// Both passes advance the tap cursor, so `input_increment` must subtract
/// `round_up(max(ks - 9, 0), 8) + 9`.
#[allow(clippy::too_many_arguments)]
pub fn maxpool_9p8q<T: KernelElem>(
    n: usize,
    ks: usize,
    kc: usize,
    input: IndirectInput<'_, T>,
    output: &mut [T],
    input_increment: isize,
    output_increment: usize,
    params: &OutputParams<T>,
) {
    debug_assert!(n != 0);
    debug_assert!(ks != 0);
    debug_assert!(kc != 0);

    let mut cursor = 0;
    let mut o = 0;
    for _ in 0..n {
        let out = &mut output[o..o + kc];

        let rows: [&[T]; 9] = load_tile(&input, cursor, ks, Filler::First);
        cursor += 9;
        for (k, y) in out.iter_mut().enumerate() {
            *y = params.clamp(max_of(&rows, k, rows[0][k]));
        }

        let mut m = ks as isize - 9;
        while m > 0 {
            let rows: [&[T]; 8] = load_tile(&input, cursor, m as usize, Filler::First);
            cursor += 8;
            for (k, y) in out.iter_mut().enumerate() {
                *y = params.clamp(max_of(&rows, k, *y));
            }
            m -= 8;
        }

        cursor = advance(cursor, input_increment);
        o += kc + output_increment;
    }
}
