//! Numeric parameter blocks consumed by the kernels.
//!
//! These are plain data. `pool-rs` derives them from user-facing scales, zero points and clamp
//! bounds; kernels only read them.

/// Output clamp bounds, shared by max, arg-max, pixelwise-average and PReLU kernels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutputParams<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> OutputParams<T> {
    #[inline]
    pub fn clamp(&self, value: T) -> T {
        let value = if value < self.min { self.min } else { value };
        if value > self.max { self.max } else { value }
    }
}

/// Parameters of the uniform-divisor `f32` average pooling kernels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct F32AvgPoolParams {
    /// `1 / pooling_size`.
    pub multiplier: f32,
    pub output_min: f32,
    pub output_max: f32,
}

impl F32AvgPoolParams {
    #[inline]
    pub fn scale_and_clamp(&self, sum: f32) -> f32 {
        (sum * self.multiplier)
            .max(self.output_min)
            .min(self.output_max)
    }
}

/// Parameters of the quantized average pooling kernels.
///
/// The accumulator starts at `bias`, which cancels the input zero point of every row the kernel
/// reads. The sum is then requantized with a Q31-style fixed point multiplier: `multiplier`
/// carries the 24-bit mantissa of the combined scale and `right_shift` its exponent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Q8AvgPoolParams {
    pub bias: i32,
    pub multiplier: i32,
    pub rounding: i64,
    pub right_shift: u32,
    pub output_min_less_zero_point: i32,
    pub output_max_less_zero_point: i32,
    pub output_zero_point: i32,
}

impl Q8AvgPoolParams {
    /// Scales an accumulator into the output domain, rounding half away from zero.
    #[inline]
    pub fn requantize(&self, acc: i32) -> u8 {
        let product = i64::from(acc) * i64::from(self.multiplier);
        let adjusted = product - i64::from(acc < 0);
        let scaled = ((adjusted + self.rounding) >> self.right_shift) as i32;
        let clamped = scaled
            .max(self.output_min_less_zero_point)
            .min(self.output_max_less_zero_point);
        (clamped + self.output_zero_point) as u8
    }
}
