//! # pool-rs
//!
//! `pool-rs` is an inference-time pooling engine for batched NHWC tensors: average, max and
//! arg-max pooling over sliding windows, with padding, stride, dilation (max pooling) and an
//! affine-quantized `u8` average pooling path. A PReLU operator shares the same lifecycle.
//!
//! Every operator goes through three phases:
//!
//! 1. **create** validates the static configuration against a [`Capabilities`] table and
//!    compiles numeric parameters.
//! 2. **setup** binds a batch size, input geometry and the input/output buffers, and builds
//!    the indirection table. Repeated `setup` calls on the same input buffer reuse the table.
//! 3. **run** reduces every output row through the selected kernel, in parallel on a
//!    [`ThreadPool`].
//!
//! Kernels live in the `pool-rs-kernels` crate.
//!
//! ## Modules
//!
//! - [`average_pooling`], [`max_pooling`], [`argmax_pooling`], [`prelu`]: operators.
//! - [`config`]: static configuration structs.
//! - [`params`]: numeric parameter compiler.
//! - [`threadpool`]: parallel dispatch.
//! - [`mod@tensor`] and [`nn`]: an NHWC tensor and layers built on the operators.
//!
//! ## Example
//!
//! ```rust
//! use pool_rs::{AveragePoolingConfig, AveragePoolingF32, Capabilities, F32Clamp, Sequential};
//!
//! let caps = Capabilities::initialize();
//! let config = AveragePoolingConfig::new(2, 2, 1).with_stride(2, 2);
//! let mut op = AveragePoolingF32::create(&caps, &config, F32Clamp::default()).unwrap();
//!
//! let input: Vec<f32> = (1..=16).map(|v| v as f32).collect();
//! let mut output = vec![0.0; 4];
//! op.setup(&caps, 1, 4, 4, &input, &mut output).unwrap();
//! op.run(&input, &mut output, &Sequential).unwrap();
//! assert_eq!(output, vec![3.5, 5.5, 11.5, 13.5]);
//! ```

pub mod argmax_pooling;
pub mod average_pooling;
pub mod capabilities;
mod compute;
pub mod config;
pub mod error;
mod indirection;
pub mod max_pooling;
pub mod nn;
pub mod operator;
pub mod params;
pub mod prelu;
pub mod tensor;
pub mod threadpool;

pub use argmax_pooling::ArgmaxPoolingF32;
pub use average_pooling::{AveragePoolingF32, AveragePoolingQ8};
pub use capabilities::{Capabilities, PoolTile};
pub use config::{
    ArgmaxPoolingConfig, AveragePoolingConfig, F32Clamp, MaxPoolingConfig, Padding, PreluConfig,
    Q8AvgPoolQuantization, U8Clamp,
};
pub use error::{PoolError, Result};
pub use max_pooling::{MaxPoolElement, MaxPooling, MaxPoolingF32, MaxPoolingU8};
pub use operator::{OperatorType, RunState};
pub use prelu::PreluF32;
pub use threadpool::{RayonThreadPool, Sequential, ThreadPool};
