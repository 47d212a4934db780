//! Numeric parameter compiler.
//!
//! Turns user-facing clamp bounds, scales and zero points into the parameter blocks the kernels
//! consume. The `compute_*` functions are pure and assume validated input; the `validate_*`
//! functions perform the checks `create` runs before computing anything.

use crate::capabilities::PoolTile;
use crate::config::{F32Clamp, Q8AvgPoolQuantization, U8Clamp};
use crate::error::{Result, fail};
use pool_rs_kernels::{F32AvgPoolParams, OutputParams, Q8AvgPoolParams};

/// Difference or zero: `a - b` saturated at zero.
#[inline]
pub(crate) fn doz(a: usize, b: usize) -> usize {
    a.saturating_sub(b)
}

#[inline]
pub(crate) fn round_up(n: usize, q: usize) -> usize {
    n.div_ceil(q) * q
}

/// Number of tap rows a kernel with `tile` reads for a window of `pooling_size` taps.
pub(crate) fn kernel_rows(pooling_size: usize, tile: PoolTile) -> usize {
    let (mr, qr) = (tile.mr as usize, tile.qr as usize);
    if qr == 0 {
        mr
    } else {
        round_up(doz(pooling_size, mr), qr) + mr
    }
}

/// Whether a window of `pooling_size` taps makes the kernel read fillers past its end.
pub(crate) fn needs_fillers(pooling_size: usize, tile: PoolTile) -> bool {
    kernel_rows(pooling_size, tile) != pooling_size
}

pub fn compute_f32_output_params(min: f32, max: f32) -> OutputParams<f32> {
    OutputParams { min, max }
}

pub fn compute_u8_output_params(min: u8, max: u8) -> OutputParams<u8> {
    debug_assert!(min < max);
    OutputParams { min, max }
}

/// Uniform-divisor average pooling: `multiplier` is `1 / pooling_size`.
pub fn compute_f32_avgpool_params(multiplier: f32, min: f32, max: f32) -> F32AvgPoolParams {
    F32AvgPoolParams {
        multiplier,
        output_min: min,
        output_max: max,
    }
}

/// Quantized average pooling.
///
/// # Arguments
///
/// * `bias` - Initial accumulator value, cancelling the input zero point of every row read.
/// * `scale` - `input_scale / (output_scale * pooling_size)`, in `[2^-32, 2^8)`.
/// * `output_zero_point`, `output_min`, `output_max` - Output quantization and clamp.
pub fn compute_q8_avgpool_params(
    bias: i32,
    scale: f32,
    output_zero_point: u8,
    output_min: u8,
    output_max: u8,
) -> Q8AvgPoolParams {
    debug_assert!(scale >= f32::from_bits(0x2F80_0000)); // 2^-32
    debug_assert!(scale < 256.0);

    let bits = scale.to_bits();
    let multiplier = ((bits & 0x007F_FFFF) | 0x0080_0000) as i32;
    let right_shift = 127 + 23 - (bits >> 23);
    debug_assert!((16..64).contains(&right_shift));
    let rounding = 1i64 << (right_shift - 1);

    let zero_point = i32::from(output_zero_point);
    Q8AvgPoolParams {
        bias,
        multiplier,
        rounding,
        right_shift,
        output_min_less_zero_point: i32::from(output_min) - zero_point,
        output_max_less_zero_point: i32::from(output_max) - zero_point,
        output_zero_point: zero_point,
    }
}

/// Parameters of a quantized average pooling operator over windows of `pooling_size` taps.
pub(crate) fn q8_avgpool_params(
    quantization: &Q8AvgPoolQuantization,
    pooling_size: usize,
    tile: PoolTile,
) -> Q8AvgPoolParams {
    let nrows = kernel_rows(pooling_size, tile) as u32;
    let bias = (u32::from(quantization.input_zero_point).wrapping_mul(nrows) as i32).wrapping_neg();
    let scale = quantization.input_scale / (quantization.output_scale * pooling_size as f32);
    compute_q8_avgpool_params(
        bias,
        scale,
        quantization.output_zero_point,
        quantization.output_min,
        quantization.output_max,
    )
}

pub(crate) fn validate_f32_clamp(name: &str, clamp: &F32Clamp) -> Result<()> {
    if clamp.min.is_nan() {
        return Err(fail!(
            InvalidParameter,
            "failed to create {} operator with NaN output lower bound: lower bound must be non-NaN",
            name
        ));
    }
    if clamp.max.is_nan() {
        return Err(fail!(
            InvalidParameter,
            "failed to create {} operator with NaN output upper bound: upper bound must be non-NaN",
            name
        ));
    }
    if clamp.min >= clamp.max {
        return Err(fail!(
            InvalidParameter,
            "failed to create {} operator with [{}, {}] output range: lower bound must be below upper bound",
            name,
            clamp.min,
            clamp.max
        ));
    }
    Ok(())
}

pub(crate) fn validate_u8_clamp(name: &str, clamp: &U8Clamp) -> Result<()> {
    if clamp.min >= clamp.max {
        return Err(fail!(
            InvalidParameter,
            "failed to create {} operator with [{}, {}] output range: range min must be below range max",
            name,
            clamp.min,
            clamp.max
        ));
    }
    Ok(())
}

fn validate_scale(name: &str, which: &str, scale: f32) -> Result<()> {
    if scale <= 0.0 || !scale.is_normal() {
        return Err(fail!(
            InvalidParameter,
            "failed to create {} operator with {} {} scale: scale must be finite, normalized, and positive",
            name,
            scale,
            which
        ));
    }
    Ok(())
}

/// Checks quantization for a window of `pooling_size` taps: malformed values are
/// `InvalidParameter`, values the fixed-point path cannot represent are `UnsupportedParameter`.
pub(crate) fn validate_q8_quantization(
    name: &str,
    quantization: &Q8AvgPoolQuantization,
    pooling_size: usize,
) -> Result<()> {
    validate_scale(name, "input", quantization.input_scale)?;
    validate_scale(name, "output", quantization.output_scale)?;
    validate_u8_clamp(
        name,
        &U8Clamp::new(quantization.output_min, quantization.output_max),
    )?;

    let ratio = quantization.input_scale / quantization.output_scale;
    if !(1.0 / 256.0..256.0).contains(&ratio) {
        return Err(fail!(
            UnsupportedParameter,
            "failed to create {} operator with {} input scale and {} output scale: \
             input-to-output scale ratio ({}) must be in [2**-8, 2**8) range",
            name,
            quantization.input_scale,
            quantization.output_scale,
            ratio
        ));
    }
    if pooling_size >= 1 << 24 {
        return Err(fail!(
            UnsupportedParameter,
            "failed to create {} operator with {} pooling elements: \
             the number of elements in the pooling area must be below 2**24",
            name,
            pooling_size
        ));
    }
    Ok(())
}
