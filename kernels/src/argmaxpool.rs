//! `f32` arg-max pooling.
//!
//! Besides the (clamped) maximum, each output channel records the window-local index of the
//! tap that produced it, counted in indirection-table order. Ties keep the earliest tap.

use crate::{Filler, IndirectInput, OutputParams, advance, load_tile};

/// Running maximum and its index for one channel.
#[inline]
fn scan<const N: usize>(rows: &[&[f32]; N], k: usize, base: u32, mut best: (f32, u32)) -> (f32, u32) {
    for (i, row) in rows.iter().enumerate() {
        if row[k] > best.0 {
            best = (row[k], base + i as u32);
        }
    }
    best
}

#[allow(clippy::too_many_arguments)]
fn argmaxpool_up<const MR: usize>(
    n: usize,
    ks: usize,
    kc: usize,
    input: IndirectInput<'_, f32>,
    output: &mut [f32],
    index: &mut [u32],
    input_increment: isize,
    output_increment: usize,
    params: &OutputParams<f32>,
) {
    debug_assert!(n != 0);
    debug_assert!(ks != 0 && ks <= MR);
    debug_assert!(kc != 0);

    let mut cursor = 0;
    let mut o = 0;
    let mut i = 0;
    for _ in 0..n {
        let rows: [&[f32]; MR] = load_tile(&input, cursor, ks, Filler::First);
        let out = output[o..o + kc].iter_mut();
        let idx = index[i..i + kc].iter_mut();
        for (k, (y, j)) in out.zip(idx).enumerate() {
            let (max, at) = scan(&rows, k, 0, (rows[0][k], 0));
            *y = params.clamp(max);
            *j = at;
        }
        cursor = advance(cursor, input_increment);
        o += kc + output_increment;
        i += kc;
    }
}

/// Unipass arg-max pooling over windows of up to 4 taps.
#[allow(clippy::too_many_arguments)]
pub fn f32_argmaxpool_up4(
    n: usize,
    ks: usize,
    kc: usize,
    input: IndirectInput<'_, f32>,
    output: &mut [f32],
    index: &mut [u32],
    input_increment: isize,
    output_increment: usize,
    params: &OutputParams<f32>,
) {
    argmaxpool_up::<4>(
        n,
        ks,
        kc,
        input,
        output,
        index,
        input_increment,
        output_increment,
        params,
    );
}

/// Unipass arg-max pooling over windows of up to 9 taps.
#[allow(clippy::too_many_arguments)]
pub fn f32_argmaxpool_up9(
    n: usize,
    ks: usize,
    kc: usize,
    input: IndirectInput<'_, f32>,
    output: &mut [f32],
    index: &mut [u32],
    input_increment: isize,
    output_increment: usize,
    params: &OutputParams<f32>,
) {
    argmaxpool_up::<9>(
        n,
        ks,
        kc,
        input,
        output,
        index,
        input_increment,
        output_increment,
        params,
    );
}

/// Multipass arg-max pooling over windows of more than 9 taps.
///
/// `acc_buffer` and `index_buffer` hold the running maximum and index per channel (at least
/// `kc` elements each).
#[allow(clippy::too_many_arguments)]
pub fn f32_argmaxpool_mp9p8q(
    n: usize,
    ks: usize,
    kc: usize,
    input: IndirectInput<'_, f32>,
    acc_buffer: &mut [f32],
    index_buffer: &mut [u32],
    output: &mut [f32],
    index: &mut [u32],
    input_increment: isize,
    output_increment: usize,
    params: &OutputParams<f32>,
) {
    debug_assert!(n != 0);
    debug_assert!(ks > 9);
    debug_assert!(kc != 0);

    let acc_buffer = &mut acc_buffer[..kc];
    let index_buffer = &mut index_buffer[..kc];
    let mut cursor = 0;
    let mut o = 0;
    let mut i = 0;
    for _ in 0..n {
        let rows: [&[f32]; 9] = load_tile(&input, cursor, 9, Filler::First);
        cursor += 9;
        for (k, (ab, ib)) in acc_buffer.iter_mut().zip(index_buffer.iter_mut()).enumerate() {
            (*ab, *ib) = scan(&rows, k, 0, (rows[0][k], 0));
        }

        let mut base = 9u32;
        let mut m = ks - 9;
        while m > 8 {
            let rows: [&[f32]; 8] = load_tile(&input, cursor, 8, Filler::First);
            cursor += 8;
            for (k, (ab, ib)) in acc_buffer.iter_mut().zip(index_buffer.iter_mut()).enumerate() {
                (*ab, *ib) = scan(&rows, k, base, (*ab, *ib));
            }
            base += 8;
            m -= 8;
        }

        let rows: [&[f32]; 8] = load_tile(&input, cursor, m, Filler::First);
        let out = output[o..o + kc].iter_mut().zip(index[i..i + kc].iter_mut());
        for (k, ((y, j), (ab, ib))) in out.zip(acc_buffer.iter().zip(index_buffer.iter())).enumerate() {
            let (max, at) = scan(&rows, k, base, (*ab, *ib));
            *y = params.clamp(max);
            *j = at;
        }
        cursor = advance(cursor, input_increment);
        o += kc + output_increment;
        i += kc;
    }
}
