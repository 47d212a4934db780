use crate::OutputParams;

/// Parametric ReLU over a tile of up to 4 rows.
///
/// Row `r` of the input starts at `r * input_stride`; each of its `channels` elements is kept
/// when non-negative and multiplied by the channel's slope otherwise, then clamped.
#[allow(clippy::too_many_arguments)]
pub fn f32_prelu_x4(
    rows: usize,
    channels: usize,
    input: &[f32],
    input_stride: usize,
    slopes: &[f32],
    output: &mut [f32],
    output_stride: usize,
    params: &OutputParams<f32>,
) {
    debug_assert!(rows != 0 && rows <= 4);
    debug_assert!(channels != 0);

    let slopes = &slopes[..channels];
    for r in 0..rows {
        let x = &input[r * input_stride..r * input_stride + channels];
        let y = &mut output[r * output_stride..r * output_stride + channels];
        for ((y, &x), &slope) in y.iter_mut().zip(x).zip(slopes) {
            let value = if x < 0.0 { x * slope } else { x };
            *y = params.clamp(value);
        }
    }
}
