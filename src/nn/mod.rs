//! Pooling layers over [`NhwcTensor`](crate::tensor::NhwcTensor)s.
//!
//! Each layer owns one operator and a thread pool and drives `setup` and `run` on every
//! `forward`, allocating the output tensor.

pub mod pool;

pub use pool::{ArgmaxPool2d, AvgPool2d, MaxPool2d};
