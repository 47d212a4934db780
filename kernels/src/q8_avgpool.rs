//! Quantized (`u8`, affine) average pooling.
//!
//! The zero row is filled with the input zero point, so padded taps and tile fillers contribute
//! exactly the value that `params.bias` cancels.

use crate::{Filler, IndirectInput, Q8AvgPoolParams, advance, load_tile};

#[inline]
fn row_sum<const N: usize>(rows: &[&[u8]; N], k: usize) -> i32 {
    rows.iter().map(|row| i32::from(row[k])).sum()
}

/// Unipass quantized average pooling over windows of up to 9 taps.
#[allow(clippy::too_many_arguments)]
pub fn q8_avgpool_up9(
    n: usize,
    ks: usize,
    kc: usize,
    input: IndirectInput<'_, u8>,
    output: &mut [u8],
    input_increment: isize,
    output_increment: usize,
    params: &Q8AvgPoolParams,
) {
    debug_assert!(n != 0);
    debug_assert!(ks != 0 && ks <= 9);
    debug_assert!(kc != 0);

    let mut cursor = 0;
    let mut o = 0;
    for _ in 0..n {
        let rows: [&[u8]; 9] = load_tile(&input, cursor, ks, Filler::Zero);
        for (k, y) in output[o..o + kc].iter_mut().enumerate() {
            let acc = params.bias.wrapping_add(row_sum(&rows, k));
            *y = params.requantize(acc);
        }
        cursor = advance(cursor, input_increment);
        o += kc + output_increment;
    }
}

/// Multipass quantized average pooling over windows of more than 9 taps, accumulating in
/// 32-bit integers.
#[allow(clippy::too_many_arguments)]
pub fn q8_avgpool_mp9p8q(
    n: usize,
    ks: usize,
    kc: usize,
    input: IndirectInput<'_, u8>,
    buffer: &mut [i32],
    output: &mut [u8],
    input_increment: isize,
    output_increment: usize,
    params: &Q8AvgPoolParams,
) {
    debug_assert!(n != 0);
    debug_assert!(ks > 9);
    debug_assert!(kc != 0);

    let buffer = &mut buffer[..kc];
    let mut cursor = 0;
    let mut o = 0;
    for _ in 0..n {
        let rows: [&[u8]; 9] = load_tile(&input, cursor, 9, Filler::Zero);
        cursor += 9;
        for (k, acc) in buffer.iter_mut().enumerate() {
            *acc = params.bias.wrapping_add(row_sum(&rows, k));
        }

        let mut m = ks - 9;
        while m > 8 {
            let rows: [&[u8]; 8] = load_tile(&input, cursor, 8, Filler::Zero);
            cursor += 8;
            for (k, acc) in buffer.iter_mut().enumerate() {
                *acc = acc.wrapping_add(row_sum(&rows, k));
            }
            m -= 8;
        }

        let rows: [&[u8]; 8] = load_tile(&input, cursor, m, Filler::Zero);
        for (k, (y, acc)) in output[o..o + kc].iter_mut().zip(buffer.iter()).enumerate() {
            *y = params.requantize(acc.wrapping_add(row_sum(&rows, k)));
        }
        cursor = advance(cursor, input_increment);
        o += kc + output_increment;
    }
}
