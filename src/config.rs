//! Static operator configuration.
//!
//! Config structs are plain `Copy` values. They are validated once by the operator's `create`
//! and never change afterwards; a different configuration needs a new operator.

/// Implicit zero padding around the input, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Padding {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Padding {
    pub const fn new(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// The same padding on all four sides.
    pub const fn uniform(padding: u32) -> Self {
        Self::new(padding, padding, padding, padding)
    }

    pub fn is_zero(&self) -> bool {
        (self.top | self.right | self.bottom | self.left) == 0
    }
}

/// Output clamp bounds for `f32` operators.
///
/// Bounds must not be NaN and `min` must be below `max`. Infinite bounds are allowed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct F32Clamp {
    pub min: f32,
    pub max: f32,
}

impl F32Clamp {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }
}

impl Default for F32Clamp {
    fn default() -> Self {
        Self::new(f32::NEG_INFINITY, f32::INFINITY)
    }
}

/// Output clamp bounds for `u8` operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct U8Clamp {
    pub min: u8,
    pub max: u8,
}

impl U8Clamp {
    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }
}

impl Default for U8Clamp {
    fn default() -> Self {
        Self::new(u8::MIN, u8::MAX)
    }
}

/// Affine quantization of the input and output of quantized average pooling.
///
/// A quantized value `q` represents `scale * (q - zero_point)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Q8AvgPoolQuantization {
    pub input_zero_point: u8,
    pub input_scale: f32,
    pub output_zero_point: u8,
    pub output_scale: f32,
    pub output_min: u8,
    pub output_max: u8,
}

impl Q8AvgPoolQuantization {
    /// Same zero point and scale on both sides, full output range.
    pub const fn symmetric(zero_point: u8, scale: f32) -> Self {
        Self {
            input_zero_point: zero_point,
            input_scale: scale,
            output_zero_point: zero_point,
            output_scale: scale,
            output_min: u8::MIN,
            output_max: u8::MAX,
        }
    }

    pub fn with_output(mut self, zero_point: u8, scale: f32) -> Self {
        self.output_zero_point = zero_point;
        self.output_scale = scale;
        self
    }

    pub fn with_output_range(mut self, min: u8, max: u8) -> Self {
        self.output_min = min;
        self.output_max = max;
        self
    }
}

impl Default for Q8AvgPoolQuantization {
    fn default() -> Self {
        Self::symmetric(0, 1.0)
    }
}

/// Configuration of an average pooling operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AveragePoolingConfig {
    pub padding: Padding,
    pub pooling_height: u32,
    pub pooling_width: u32,
    pub stride_height: u32,
    pub stride_width: u32,
    pub channels: usize,
    pub input_pixel_stride: usize,
    pub output_pixel_stride: usize,
    /// Reserved. No bits are recognized.
    pub flags: u32,
}

impl AveragePoolingConfig {
    /// A `pooling_height x pooling_width` window with unit stride over densely packed pixels.
    pub fn new(pooling_height: u32, pooling_width: u32, channels: usize) -> Self {
        Self {
            padding: Padding::default(),
            pooling_height,
            pooling_width,
            stride_height: 1,
            stride_width: 1,
            channels,
            input_pixel_stride: channels,
            output_pixel_stride: channels,
            flags: 0,
        }
    }

    pub fn with_stride(mut self, stride_height: u32, stride_width: u32) -> Self {
        self.stride_height = stride_height;
        self.stride_width = stride_width;
        self
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_pixel_strides(mut self, input_pixel_stride: usize, output_pixel_stride: usize) -> Self {
        self.input_pixel_stride = input_pixel_stride;
        self.output_pixel_stride = output_pixel_stride;
        self
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }
}

impl Default for AveragePoolingConfig {
    fn default() -> Self {
        Self::new(2, 2, 1).with_stride(2, 2)
    }
}

/// Configuration of a max pooling operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaxPoolingConfig {
    pub padding: Padding,
    pub pooling_height: u32,
    pub pooling_width: u32,
    pub stride_height: u32,
    pub stride_width: u32,
    pub dilation_height: u32,
    pub dilation_width: u32,
    pub channels: usize,
    pub input_pixel_stride: usize,
    pub output_pixel_stride: usize,
    /// Reserved. No bits are recognized.
    pub flags: u32,
}

impl MaxPoolingConfig {
    /// A `pooling_height x pooling_width` window with unit stride and dilation over densely
    /// packed pixels.
    pub fn new(pooling_height: u32, pooling_width: u32, channels: usize) -> Self {
        Self {
            padding: Padding::default(),
            pooling_height,
            pooling_width,
            stride_height: 1,
            stride_width: 1,
            dilation_height: 1,
            dilation_width: 1,
            channels,
            input_pixel_stride: channels,
            output_pixel_stride: channels,
            flags: 0,
        }
    }

    pub fn with_stride(mut self, stride_height: u32, stride_width: u32) -> Self {
        self.stride_height = stride_height;
        self.stride_width = stride_width;
        self
    }

    pub fn with_dilation(mut self, dilation_height: u32, dilation_width: u32) -> Self {
        self.dilation_height = dilation_height;
        self.dilation_width = dilation_width;
        self
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_pixel_strides(mut self, input_pixel_stride: usize, output_pixel_stride: usize) -> Self {
        self.input_pixel_stride = input_pixel_stride;
        self.output_pixel_stride = output_pixel_stride;
        self
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }
}

impl Default for MaxPoolingConfig {
    fn default() -> Self {
        Self::new(2, 2, 1).with_stride(2, 2)
    }
}

/// Configuration of an arg-max pooling operator. The stride always equals the window size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArgmaxPoolingConfig {
    pub padding: Padding,
    pub pooling_height: u32,
    pub pooling_width: u32,
    pub channels: usize,
    pub input_pixel_stride: usize,
    pub output_pixel_stride: usize,
    /// Reserved. No bits are recognized.
    pub flags: u32,
}

impl ArgmaxPoolingConfig {
    pub fn new(pooling_height: u32, pooling_width: u32, channels: usize) -> Self {
        Self {
            padding: Padding::default(),
            pooling_height,
            pooling_width,
            channels,
            input_pixel_stride: channels,
            output_pixel_stride: channels,
            flags: 0,
        }
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_pixel_strides(mut self, input_pixel_stride: usize, output_pixel_stride: usize) -> Self {
        self.input_pixel_stride = input_pixel_stride;
        self.output_pixel_stride = output_pixel_stride;
        self
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }
}

impl Default for ArgmaxPoolingConfig {
    fn default() -> Self {
        Self::new(2, 2, 1)
    }
}

/// Configuration of a PReLU operator over `[batch, channels]` rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreluConfig {
    pub channels: usize,
    pub input_stride: usize,
    pub output_stride: usize,
    /// Reserved. No bits are recognized.
    pub flags: u32,
}

impl PreluConfig {
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            input_stride: channels,
            output_stride: channels,
            flags: 0,
        }
    }

    pub fn with_strides(mut self, input_stride: usize, output_stride: usize) -> Self {
        self.input_stride = input_stride;
        self.output_stride = output_stride;
        self
    }
}

impl Default for PreluConfig {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding() {
        assert!(Padding::default().is_zero());
        assert!(!Padding::new(0, 0, 1, 0).is_zero());
        assert_eq!(Padding::uniform(2), Padding::new(2, 2, 2, 2));
    }

    #[test]
    fn test_builders() {
        let config = MaxPoolingConfig::new(3, 3, 8)
            .with_stride(2, 2)
            .with_dilation(2, 1)
            .with_pixel_strides(10, 12);
        assert_eq!(config.stride_width, 2);
        assert_eq!(config.dilation_height, 2);
        assert_eq!(config.dilation_width, 1);
        assert_eq!(config.input_pixel_stride, 10);
        assert_eq!(config.output_pixel_stride, 12);

        let quantization = Q8AvgPoolQuantization::symmetric(128, 0.5).with_output(100, 0.25);
        assert_eq!(quantization.input_zero_point, 128);
        assert_eq!(quantization.output_zero_point, 100);
        assert_eq!(quantization.output_scale, 0.25);
    }
}
