//! Pixelwise `f32` average pooling: like [`crate::avgpool`], but every output pixel carries its
//! own divisor, so windows clipped by padding average only over their real taps.

use crate::{Filler, IndirectInput, OutputParams, advance, load_tile};

/// Unipass pixelwise average pooling over windows of up to 9 taps.
///
/// `multiplier[i]` is the reciprocal tap count of output pixel `i`.
#[allow(clippy::too_many_arguments)]
pub fn f32_pavgpool_up9(
    n: usize,
    ks: usize,
    kc: usize,
    input: IndirectInput<'_, f32>,
    multiplier: &[f32],
    output: &mut [f32],
    input_increment: isize,
    output_increment: usize,
    params: &OutputParams<f32>,
) {
    debug_assert!(n != 0);
    debug_assert!(ks != 0 && ks <= 9);
    debug_assert!(kc != 0);

    let mut cursor = 0;
    let mut o = 0;
    for &scale in &multiplier[..n] {
        let rows: [&[f32]; 9] = load_tile(&input, cursor, ks, Filler::Zero);
        for (k, y) in output[o..o + kc].iter_mut().enumerate() {
            let sum: f32 = rows.iter().map(|row| row[k]).sum();
            *y = params.clamp(sum * scale);
        }
        cursor = advance(cursor, input_increment);
        o += kc + output_increment;
    }
}

/// Multipass pixelwise average pooling over windows of more than 9 taps.
#[allow(clippy::too_many_arguments)]
pub fn f32_pavgpool_mp9p8q(
    n: usize,
    ks: usize,
    kc: usize,
    input: IndirectInput<'_, f32>,
    multiplier: &[f32],
    buffer: &mut [f32],
    output: &mut [f32],
    input_increment: isize,
    output_increment: usize,
    params: &OutputParams<f32>,
) {
    debug_assert!(n != 0);
    debug_assert!(ks > 9);
    debug_assert!(kc != 0);

    let buffer = &mut buffer[..kc];
    let mut cursor = 0;
    let mut o = 0;
    for &scale in &multiplier[..n] {
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
            *y = params.clamp(sum * scale);
        }
        cursor = advance(cursor, input_increment);
        o += kc + output_increment;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tap;

    const UNBOUNDED: OutputParams<f32> = OutputParams {
        min: f32::NEG_INFINITY,
        max: f32::INFINITY,
    };

    #[test]
    fn test_up9_uses_per_pixel_divisor() {
        // Pixel 0 has one real tap and one padded tap; pixel 1 has two real taps.
        let input = vec![4.0, 6.0, 8.0];
        let zero = vec![0.0];
        let mut taps = vec![Tap::Zero, Tap::Input(0), Tap::Input(1), Tap::Input(2)];
        taps.extend([Tap::Zero; 8]);
        let multiplier = vec![1.0, 0.5];
        let mut output = vec![0.0; 2];

        f32_pavgpool_up9(
            2,
            2,
            1,
            IndirectInput::new(&taps, &input, &zero),
            &multiplier,
            &mut output,
            2,
            0,
            &UNBOUNDED,
        );
        assert_eq!(output, vec![4.0, 7.0]);
    }

    #[test]
    fn test_mp9p8q_uses_per_pixel_divisor() {
        let ks = 12;
        let input = vec![2.0; 10];
        let zero = vec![0.0];
        let mut taps: Vec<Tap> = (0..10).map(Tap::Input).collect();
        taps.extend([Tap::Zero, Tap::Zero]);
        taps.extend([Tap::Zero; 8]);
        let mut buffer = vec![0.0];
        let mut output = vec![0.0];

        f32_pavgpool_mp9p8q(
            1,
            ks,
            1,
            IndirectInput::new(&taps, &input, &zero),
            &[0.1],
            &mut buffer,
            &mut output,
            0,
            0,
            &UNBOUNDED,
        );
        assert!((output[0] - 2.0).abs() < 1e-6);
    }
}
