//! Max pooling operators, generic over the element type.
//!
//! Padded taps are redirected to a real pixel of the same window, so padding never wins the
//! reduction and no zero row is needed.

use crate::capabilities::{Capabilities, PoolTile};
use crate::compute::{PoolingRows, dispatch_rows, max_adjustment, row_cells};
use crate::config::{F32Clamp, MaxPoolingConfig, U8Clamp};
use crate::error::{PoolError, Result};
use crate::operator::{OperatorType, PaddingMode, PoolingDescriptor, PoolingGeometry, RunState, SetupPlan};
use crate::params::{compute_f32_output_params, compute_u8_output_params, validate_f32_clamp, validate_u8_clamp};
use crate::threadpool::ThreadPool;
use pool_rs_kernels::{IndirectInput, KernelElem, OutputParams, maxpool_9p8q};
use std::fmt::Debug;

mod private {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for u8 {}
}

/// Element types with a max pooling kernel.
pub trait MaxPoolElement: KernelElem + private::Sealed {
    /// Output clamp configuration for this domain.
    type Clamp: Copy + Debug + Default;

    const OPERATOR_TYPE: OperatorType;

    fn tile(caps: &Capabilities) -> PoolTile;

    /// Validates `clamp` and compiles it into kernel parameters.
    fn output_params(clamp: &Self::Clamp) -> Result<OutputParams<Self>>;
}

impl MaxPoolElement for f32 {
    type Clamp = F32Clamp;

    const OPERATOR_TYPE: OperatorType = OperatorType::MaxPoolingF32;

    fn tile(caps: &Capabilities) -> PoolTile {
        caps.f32_maxpool()
    }

    fn output_params(clamp: &F32Clamp) -> Result<OutputParams<f32>> {
        validate_f32_clamp(Self::OPERATOR_TYPE.name(), clamp)?;
        Ok(compute_f32_output_params(clamp.min, clamp.max))
    }
}

impl MaxPoolElement for u8 {
    type Clamp = U8Clamp;

    const OPERATOR_TYPE: OperatorType = OperatorType::MaxPoolingU8;

    fn tile(caps: &Capabilities) -> PoolTile {
        caps.u8_maxpool()
    }

    fn output_params(clamp: &U8Clamp) -> Result<OutputParams<u8>> {
        validate_u8_clamp(Self::OPERATOR_TYPE.name(), clamp)?;
        Ok(compute_u8_output_params(clamp.min, clamp.max))
    }
}

/// Max pooling over NHWC input, with stride and dilation.
#[derive(Debug)]
pub struct MaxPooling<T: MaxPoolElement> {
    desc: PoolingDescriptor<T>,
    params: OutputParams<T>,
    tile: PoolTile,
    rows: Option<PoolingRows>,
}

pub type MaxPoolingF32 = MaxPooling<f32>;
pub type MaxPoolingU8 = MaxPooling<u8>;

impl<T: MaxPoolElement> MaxPooling<T> {
    /// Validates `config` and `clamp` and creates the operator.
    ///
    /// # Errors
    ///
    /// * `Uninitialized` if `caps` was never initialized.
    /// * `InvalidParameter` for a zero or 1x1 window, zero stride, dilation or channels, pixel
    ///   strides below the channel count, or an invalid clamp range.
    pub fn create(caps: &Capabilities, config: &MaxPoolingConfig, clamp: T::Clamp) -> Result<Self> {
        let geometry = PoolingGeometry {
            padding: config.padding,
            pooling_height: config.pooling_height as usize,
            pooling_width: config.pooling_width as usize,
            stride_height: config.stride_height as usize,
            stride_width: config.stride_width as usize,
            dilation_height: config.dilation_height as usize,
            dilation_width: config.dilation_width as usize,
            channels: config.channels,
            input_pixel_stride: config.input_pixel_stride,
            output_pixel_stride: config.output_pixel_stride,
        };
        let desc = PoolingDescriptor::new(caps, T::OPERATOR_TYPE, geometry)?;
        let params = T::output_params(&clamp)?;
        Ok(Self {
            desc,
            params,
            tile: T::tile(caps),
            rows: None,
        })
    }

    pub fn state(&self) -> RunState {
        self.desc.state
    }

    pub fn output_size(&self, input_height: usize, input_width: usize) -> Option<(usize, usize)> {
        self.desc.geometry.output_size(input_height, input_width)
    }

    /// Binds `batch_size` images of `input_height x input_width` pixels.
    pub fn setup(
        &mut self,
        caps: &Capabilities,
        batch_size: usize,
        input_height: usize,
        input_width: usize,
        input: &[T],
        output: &mut [T],
    ) -> Result<()> {
        let plan = self
            .desc
            .begin_setup(caps, batch_size, input_height, input_width, input, output)?;
        let SetupPlan::Rebuild { valid_batch_size } = plan else {
            return Ok(());
        };

        let g = self.desc.geometry;
        // Dilated windows of neighbouring pixels interleave, so they cannot share columns.
        let step_width = if g.dilation_width > 1 {
            g.pooling_width
        } else {
            g.stride_width.min(g.pooling_width)
        };
        let layout = self.desc.prepare_indirection(
            self.tile.mr as usize,
            step_width,
            PaddingMode::Clamp,
            valid_batch_size,
        )?;
        self.rows = Some(PoolingRows::new(
            &layout,
            g.channels,
            g.output_pixel_stride,
            max_adjustment(g.pooling_size(), self.tile),
        ));
        self.desc.finish_setup(valid_batch_size);
        Ok(())
    }

    /// Computes the output bound by the last `setup`.
    pub fn run<P: ThreadPool>(&self, input: &[T], output: &mut [T], threadpool: &P) -> Result<()> {
        if !self.desc.check_run(input, output)? {
            return Ok(());
        }
        let Some(rows) = self.rows else {
            return Err(PoolError::InvalidState(self.desc.state));
        };

        let d = &self.desc;
        let taps = IndirectInput::new(&d.indirection, input, &d.zero);
        let output_height = d.output_height;
        let params = self.params;
        // Every pass of the max kernel writes straight to the output row, so no scratch.
        let mut cells: Vec<(&mut [T], &mut [T])> = row_cells(output, d.output_len(), d.output_height_stride())
            .into_iter()
            .map(|row| (row, Default::default()))
            .collect();

        dispatch_rows(threadpool, d.batch_size, output_height, &mut cells, |batch, output_y, row, _| {
            maxpool_9p8q(
                rows.output_width,
                rows.pooling_size,
                rows.channels,
                rows.row_input(taps, batch * output_height + output_y),
                row,
                rows.input_increment,
                rows.output_increment,
                &params,
            )
        });
        Ok(())
    }
}
