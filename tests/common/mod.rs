//! Brute-force reference implementations shared by the integration tests.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Window geometry for the reference reductions.
#[derive(Clone, Copy, Debug)]
pub struct Window {
    pub pooling: (usize, usize),
    pub stride: (usize, usize),
    pub dilation: (usize, usize),
    /// (top, right, bottom, left)
    pub padding: (usize, usize, usize, usize),
}

impl Window {
    pub fn new(pooling: (usize, usize), stride: (usize, usize)) -> Self {
        Self {
            pooling,
            stride,
            dilation: (1, 1),
            padding: (0, 0, 0, 0),
        }
    }

    pub fn dilation(mut self, dilation: (usize, usize)) -> Self {
        self.dilation = dilation;
        self
    }

    pub fn padding(mut self, padding: (usize, usize, usize, usize)) -> Self {
        self.padding = padding;
        self
    }

    /// Output size by counting window positions one by one.
    pub fn count_positions(&self, height: usize, width: usize) -> (usize, usize) {
        let (top, right, bottom, left) = self.padding;
        let count = |padded: usize, kernel: usize, dilation: usize, stride: usize| {
            let extent = (kernel - 1) * dilation + 1;
            let mut start = 0;
            let mut positions = 0;
            while start + extent <= padded {
                positions += 1;
                start += stride;
            }
            positions
        };
        (
            count(top + height + bottom, self.pooling.0, self.dilation.0, self.stride.0),
            count(left + width + right, self.pooling.1, self.dilation.1, self.stride.1),
        )
    }

    /// Real input coordinates of the window at `(oy, ox)`, column-major, with their tap ordinal.
    pub fn taps(&self, height: usize, width: usize, oy: usize, ox: usize) -> Vec<(usize, usize, usize)> {
        let (top, _, _, left) = self.padding;
        let mut taps = Vec::new();
        for kx in 0..self.pooling.1 {
            for ky in 0..self.pooling.0 {
                let y = (oy * self.stride.0 + ky * self.dilation.0) as isize - top as isize;
                let x = (ox * self.stride.1 + kx * self.dilation.1) as isize - left as isize;
                if y >= 0 && x >= 0 && (y as usize) < height && (x as usize) < width {
                    taps.push((kx * self.pooling.0 + ky, y as usize, x as usize));
                }
            }
        }
        taps
    }
}

/// Dense NHWC images with `pixel_stride` elements per pixel.
#[derive(Clone, Debug)]
pub struct Images<T> {
    pub batch: usize,
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    pub pixel_stride: usize,
    pub data: Vec<T>,
}

impl<T: Copy> Images<T> {
    pub fn at(&self, n: usize, y: usize, x: usize, c: usize) -> T {
        self.data[((n * self.height + y) * self.width + x) * self.pixel_stride + c]
    }
}

pub fn random_f32(batch: usize, height: usize, width: usize, channels: usize, pixel_stride: usize, seed: u64) -> Images<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..batch * height * width * pixel_stride)
        .map(|_| rng.random_range(-10.0f32..10.0))
        .collect();
    Images {
        batch,
        height,
        width,
        channels,
        pixel_stride,
        data,
    }
}

pub fn random_u8(batch: usize, height: usize, width: usize, channels: usize, pixel_stride: usize, seed: u64) -> Images<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..batch * height * width * pixel_stride).map(|_| rng.random()).collect();
    Images {
        batch,
        height,
        width,
        channels,
        pixel_stride,
        data,
    }
}

/// Applies `reduce` to the real taps of every window; output is dense
/// `[batch, oh, ow, channels]`.
fn reduce<T: Copy, R>(
    images: &Images<T>,
    window: &Window,
    mut reduce: impl FnMut(&[(usize, T)]) -> R,
) -> Vec<R> {
    let (oh, ow) = window.count_positions(images.height, images.width);
    let mut output = Vec::with_capacity(images.batch * oh * ow * images.channels);
    for n in 0..images.batch {
        for oy in 0..oh {
            for ox in 0..ow {
                let taps = window.taps(images.height, images.width, oy, ox);
                for c in 0..images.channels {
                    let values: Vec<(usize, T)> = taps
                        .iter()
                        .map(|&(ordinal, y, x)| (ordinal, images.at(n, y, x, c)))
                        .collect();
                    output.push(reduce(&values));
                }
            }
        }
    }
    output
}

/// Mean over the real taps of each window.
pub fn average_pool_f32(images: &Images<f32>, window: &Window) -> Vec<f32> {
    reduce(images, window, |values| {
        let sum: f64 = values.iter().map(|&(_, v)| f64::from(v)).sum();
        (sum / values.len().max(1) as f64) as f32
    })
}

/// Maximum over the real taps of each window.
pub fn max_pool<T: Copy + PartialOrd>(images: &Images<T>, window: &Window) -> Vec<T> {
    reduce(images, window, |values| {
        values
            .iter()
            .map(|&(_, v)| v)
            .reduce(|a, b| if b > a { b } else { a })
            .expect("window without real taps")
    })
}

/// Maximum and its lowest tap ordinal over the real taps of each window.
pub fn argmax_pool_f32(images: &Images<f32>, window: &Window) -> Vec<(f32, u32)> {
    reduce(images, window, |values| {
        let mut best = values[0];
        for &(ordinal, v) in &values[1..] {
            if v > best.1 {
                best = (ordinal, v);
            }
        }
        (best.1, best.0 as u32)
    })
}

/// Quantized mean over the full window, with padded taps at the input zero point.
pub fn average_pool_q8(
    images: &Images<u8>,
    window: &Window,
    input_zero_point: u8,
    scale: f64,
    output_zero_point: u8,
) -> Vec<u8> {
    let pooling_size = (window.pooling.0 * window.pooling.1) as f64;
    reduce(images, window, |values| {
        let sum: f64 = values
            .iter()
            .map(|&(_, v)| f64::from(v) - f64::from(input_zero_point))
            .sum();
        let scaled = (sum * scale / pooling_size).round() + f64::from(output_zero_point);
        scaled.clamp(0.0, 255.0) as u8
    })
}

/// Gathers the first `channels` elements of every pixel of a strided output.
pub fn gather<T: Copy>(output: &[T], pixels: usize, pixel_stride: usize, channels: usize) -> Vec<T> {
    (0..pixels)
        .flat_map(|p| output[p * pixel_stride..p * pixel_stride + channels].iter().copied())
        .collect()
}
