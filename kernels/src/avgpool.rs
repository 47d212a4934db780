use crate::{F32AvgPoolParams, Filler, IndirectInput, advance, load_tile};

/// Unipass `f32` average pooling over windows of up to 9 taps.
///
/// # Arguments
///
/// * `n` - Number of output pixels in the row.
/// * `ks` - Taps per window (`1..=9`).
/// * `kc` - Channels per pixel.
/// * `input` - Indirection view positioned at the first window of the row.
/// * `output` - Output row; pixel `i` starts at `i * (kc + output_increment)`.
/// * `input_increment` - Tap entries between consecutive windows.
/// * `output_increment` - Elements skipped after each pixel's `kc` outputs.
#[allow(clippy::too_many_arguments)]
pub fn f32_avgpool_up9(
    n: usize,
    ks: usize,
    kc: usize,
    input: IndirectInput<'_, f32>,
    output: &mut [f32],
    input_increment: isize,
    output_increment: usize,
    params: &F32AvgPoolParams,
) {
    debug_assert!(n != 0);
    debug_assert!(ks != 0 && ks <= 9);
    debug_assert!(kc != 0);

    let mut cursor = 0;
    let mut o = 0;
    for _ in 0..n {
        let rows: [&[f32]; 9] = load_tile(&input, cursor, ks, Filler::Zero);
        for (k, y) in output[o..o + kc].iter_mut().enumerate() {
            let sum: f32 = rows.iter().map(|row| row[k]).sum();
            *y = params.scale_and_clamp(sum);
        }
        cursor = advance(cursor, input_increment);
        o += kc + output_increment;
    }
}

/// Multipass `f32` average pooling over windows of more than 9 taps.
///
/// Reads 9 taps, then chunks of 8, accumulating partial sums into `buffer` (at least `kc`
/// elements). The last chunk is read without advancing the tap cursor; `input_increment` is
/// expected to account for that.
#[allow(clippy::too_many_arguments)]
pub fn f32_avgpool_mp9p8q(
    n: usize,
    ks: usize,
    kc: usize,
    input: IndirectInput<'_, f32>,
    buffer: &mut [f32],
    output: &mut [f32],
    input_increment: isize,
    output_increment: usize,
    params: &F32AvgPoolParams,
) {
    debug_assert!(n != 0);
    debug_assert!(ks > 9);
    debug_assert!(kc != 0);

    let buffer = &mut buffer[..kc];
    let mut cursor = 0;
    let mut o = 0;
    for _ in 0..n {
        let rows: [&[f32]; 9] = load_tile(&input, cursor, 9, Filler::Zero);
        cursor += 9;
        for (k, acc) in buffer.iter_mut().enumerate() {
            *acc = rows.iter().map(|row| row[k]).sum();
        }

        let mut m = ks - 9;
        while m > 8 {
            let rows: [&[f32]; 8] = load_tile(&input, cursor, 8, Filler::Zero);
            cursor += 8;
            for (k, acc) in buffer.iter_mut().enumerate() {
                *acc += rows.iter().map(|row| row[k]).sum::<f32>();
            }
            m -= 8;
        }

        let rows: [&[f32]; 8] = load_tile(&input, cursor, m, Filler::Zero);
        for (k, (y, acc)) in output[o..o + kc].iter_mut().zip(buffer.iter()).enumerate() {
            let sum = *acc + rows.iter().map(|row| row[k]).sum::<f32>();
            *y = params.scale_and_clamp(sum);
        }
        cursor = advance(cursor, input_increment);
        o += kc + output_increment;
    }
}
