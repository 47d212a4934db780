//! A minimal owned NHWC tensor used by the [`nn`](crate::nn) layers.
//!
//! # Examples
//!
//! ```rust
//! use pool_rs::tensor::NhwcTensor;
//!
//! let tensor = NhwcTensor::from_fn([1, 2, 2, 1], |[_, y, x, _]| (y * 2 + x) as f32);
//! assert_eq!(tensor.data(), &[0.0, 1.0, 2.0, 3.0]);
//! ```

use num_traits::Zero;
use thiserror::Error;

/// Error type for tensor construction and access.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    #[error("Shape mismatch: expected {expected} elements for shape {shape:?}, got {got}")]
    ShapeMismatch {
        shape: [usize; 4],
        expected: usize,
        got: usize,
    },
    #[error("Index out of bounds: index {index:?} for shape {shape:?}")]
    IndexOutOfBounds { index: [usize; 4], shape: [usize; 4] },
}

pub type Result<T> = std::result::Result<T, TensorError>;

/// A densely packed `[batch, height, width, channels]` tensor.
#[derive(Clone, Debug, PartialEq)]
pub struct NhwcTensor<T> {
    shape: [usize; 4],
    data: Vec<T>,
}

impl<T> NhwcTensor<T> {
    /// Wraps `data` laid out as `shape`.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::ShapeMismatch` if `data.len()` is not the product of `shape`.
    pub fn new(data: Vec<T>, shape: [usize; 4]) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(TensorError::ShapeMismatch {
                shape,
                expected,
                got: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Builds a tensor by evaluating `f` at every `[n, y, x, c]` coordinate, in memory order.
    pub fn from_fn(shape: [usize; 4], mut f: impl FnMut([usize; 4]) -> T) -> Self {
        let [batch, height, width, channels] = shape;
        let mut data = Vec::with_capacity(shape.iter().product());
        for n in 0..batch {
            for y in 0..height {
                for x in 0..width {
                    for c in 0..channels {
                        data.push(f([n, y, x, c]));
                    }
                }
            }
        }
        Self { shape, data }
    }

    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn batch(&self) -> usize {
        self.shape[0]
    }

    pub fn height(&self) -> usize {
        self.shape[1]
    }

    pub fn width(&self) -> usize {
        self.shape[2]
    }

    pub fn channels(&self) -> usize {
        self.shape[3]
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    fn offset(&self, index: [usize; 4]) -> Result<usize> {
        if index.iter().zip(&self.shape).any(|(i, s)| i >= s) {
            return Err(TensorError::IndexOutOfBounds {
                index,
                shape: self.shape,
            });
        }
        let [n, y, x, c] = index;
        let [_, height, width, channels] = self.shape;
        Ok(((n * height + y) * width + x) * channels + c)
    }

    pub fn get(&self, index: [usize; 4]) -> Result<&T> {
        let offset = self.offset(index)?;
        Ok(&self.data[offset])
    }
}

impl<T: Zero + Clone> NhwcTensor<T> {
    /// Creates a tensor filled with zeros.
    pub fn zeros(shape: [usize; 4]) -> Self {
        Self {
            shape,
            data: vec![T::zero(); shape.iter().product()],
        }
    }
}
