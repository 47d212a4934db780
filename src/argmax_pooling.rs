//! Arg-max pooling: max pooling that also reports where each maximum came from.
//!
//! Windows never overlap (the stride equals the window size). For every output channel the
//! operator writes the maximum and its tap index within the window, counted column-major:
//! `index = kernel_x * pooling_height + kernel_y`. Ties report the lowest index.
//!
//! Padded taps read a row of negative infinities, so a padded position only shows up in the
//! index buffer when every real tap of its window is negative infinity too.

use crate::capabilities::{Capabilities, PoolTile};
use crate::compute::{PoolingRows, reduce_adjustment, row_cells, scratch_cells};
use crate::config::{ArgmaxPoolingConfig, F32Clamp};
use crate::error::{PoolError, Result, fail};
use crate::operator::{BufferId, OperatorType, PaddingMode, PoolingDescriptor, PoolingGeometry, RunState, SetupPlan};
use crate::params::{compute_f32_output_params, validate_f32_clamp};
use crate::threadpool::ThreadPool;
use pool_rs_kernels::{
    IndirectInput, OutputParams, f32_argmaxpool_mp9p8q, f32_argmaxpool_up4, f32_argmaxpool_up9,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ArgmaxPoolUkernel {
    Up4,
    Up9,
    Mp9p8q,
}

/// Picks the first unipass kernel whose tile holds the window, else the multipass kernel.
fn select_ukernel(caps: &Capabilities, pooling_size: usize) -> (ArgmaxPoolUkernel, PoolTile) {
    let [up4, up9, mp] = *caps.f32_argmaxpool();
    if pooling_size <= up4.mr as usize {
        (ArgmaxPoolUkernel::Up4, up4)
    } else if pooling_size <= up9.mr as usize {
        (ArgmaxPoolUkernel::Up9, up9)
    } else {
        (ArgmaxPoolUkernel::Mp9p8q, mp)
    }
}

/// `f32` arg-max pooling over NHWC input.
#[derive(Debug)]
pub struct ArgmaxPoolingF32 {
    desc: PoolingDescriptor<f32>,
    params: OutputParams<f32>,
    ukernel: ArgmaxPoolUkernel,
    tile: PoolTile,
    index: BufferId,
    rows: Option<PoolingRows>,
}

impl ArgmaxPoolingF32 {
    /// Validates `config` and `clamp` and creates the operator.
    ///
    /// # Errors
    ///
    /// * `Uninitialized` if `caps` was never initialized.
    /// * `InvalidParameter` for a zero or 1x1 window, zero channels, pixel strides below the
    ///   channel count, or a NaN or empty clamp range.
    pub fn create(caps: &Capabilities, config: &ArgmaxPoolingConfig, clamp: F32Clamp) -> Result<Self> {
        let op_type = OperatorType::ArgmaxPoolingF32;
        let geometry = PoolingGeometry {
            padding: config.padding,
            pooling_height: config.pooling_height as usize,
            pooling_width: config.pooling_width as usize,
            stride_height: config.pooling_height as usize,
            stride_width: config.pooling_width as usize,
            dilation_height: 1,
            dilation_width: 1,
            channels: config.channels,
            input_pixel_stride: config.input_pixel_stride,
            output_pixel_stride: config.output_pixel_stride,
        };
        let mut desc = PoolingDescriptor::new(caps, op_type, geometry)?;
        validate_f32_clamp(op_type.name(), &clamp)?;
        if geometry.any_padding() {
            desc.allocate_zero(f32::NEG_INFINITY)?;
        }

        let (ukernel, tile) = select_ukernel(caps, geometry.pooling_size());
        Ok(Self {
            desc,
            params: compute_f32_output_params(clamp.min, clamp.max),
            ukernel,
            tile,
            index: BufferId::default(),
            rows: None,
        })
    }

    pub fn state(&self) -> RunState {
        self.desc.state
    }

    pub fn output_size(&self, input_height: usize, input_width: usize) -> Option<(usize, usize)> {
        self.desc.geometry.output_size(input_height, input_width)
    }

    fn index_len(&self) -> usize {
        let d = &self.desc;
        d.batch_size * d.output_height * d.output_width * d.geometry.channels
    }

    /// Binds `batch_size` images of `input_height x input_width` pixels.
    ///
    /// `index` receives one `u32` per output channel, densely packed as
    /// `[batch, output_height, output_width, channels]` regardless of the output pixel stride.
    pub fn setup(
        &mut self,
        caps: &Capabilities,
        batch_size: usize,
        input_height: usize,
        input_width: usize,
        input: &[f32],
        output: &mut [f32],
        index: &mut [u32],
    ) -> Result<()> {
        let plan = self
            .desc
            .begin_setup(caps, batch_size, input_height, input_width, input, output)?;
        if plan == SetupPlan::Skip {
            return Ok(());
        }

        let index_len = self.index_len();
        if index.len() < index_len {
            self.desc.state = RunState::Invalid;
            return Err(fail!(
                InvalidParameter,
                "failed to setup {} operator: index buffer holds {} elements, {} required",
                self.desc.op_type.name(),
                index.len(),
                index_len
            ));
        }
        self.index = BufferId::of(index);

        let SetupPlan::Rebuild { valid_batch_size } = plan else {
            return Ok(());
        };
        let g = self.desc.geometry;
        let layout = self.desc.prepare_indirection(
            self.tile.mr as usize,
            g.pooling_width,
            PaddingMode::Zero,
            valid_batch_size,
        )?;
        self.rows = Some(PoolingRows::new(
            &layout,
            g.channels,
            g.output_pixel_stride,
            reduce_adjustment(g.pooling_size(), self.tile),
        ));
        self.desc.finish_setup(valid_batch_size);
        Ok(())
    }

    /// Computes the output and indices bound by the last `setup`.
    pub fn run<P: ThreadPool>(
        &self,
        input: &[f32],
        output: &mut [f32],
        index: &mut [u32],
        threadpool: &P,
    ) -> Result<()> {
        if !self.desc.check_run(input, output)? {
            return Ok(());
        }
        if BufferId::of(index) != self.index {
            return Err(fail!(
                InvalidParameter,
                "failed to run {} operator: index buffer differs from the one passed to setup",
                self.desc.op_type.name()
            ));
        }
        let Some(rows) = self.rows else {
            return Err(PoolError::InvalidState(self.desc.state));
        };

        let d = &self.desc;
        let taps = IndirectInput::new(&d.indirection, input, &d.zero);
        let params = self.params;
        let ukernel = self.ukernel;
        let index_height_stride = d.output_width * d.geometry.channels;
        let output_rows = row_cells(output, d.output_len(), d.output_height_stride());
        let index_rows = row_cells(index, self.index_len(), index_height_stride);
        let width = match ukernel {
            ArgmaxPoolUkernel::Mp9p8q => d.geometry.channels,
            ArgmaxPoolUkernel::Up4 | ArgmaxPoolUkernel::Up9 => 0,
        };
        let (mut acc_scratch, mut index_scratch) = (Vec::new(), Vec::new());
        let acc_buffers = scratch_cells(&mut acc_scratch, output_rows.len(), width, 0.0f32)?;
        let index_buffers = scratch_cells(&mut index_scratch, output_rows.len(), width, 0u32)?;
        let mut cells: Vec<(&mut [f32], &mut [u32], &mut [f32], &mut [u32])> = output_rows
            .into_iter()
            .zip(index_rows)
            .zip(acc_buffers.into_iter().zip(index_buffers))
            .map(|((row, index_row), (acc_buffer, index_buffer))| (row, index_row, acc_buffer, index_buffer))
            .collect();

        let output_height = d.output_height;
        threadpool.parallelize_2d((d.batch_size, output_height), &mut cells, |batch, output_y, cell| {
            let (row, index_row, acc_buffer, index_buffer) = cell;
            let input = rows.row_input(taps, batch * output_height + output_y);
            let (n, ks, kc) = (rows.output_width, rows.pooling_size, rows.channels);
            let (inc, out_inc) = (rows.input_increment, rows.output_increment);
            match ukernel {
                ArgmaxPoolUkernel::Up4 => {
                    f32_argmaxpool_up4(n, ks, kc, input, row, index_row, inc, out_inc, &params)
                }
                ArgmaxPoolUkernel::Up9 => {
                    f32_argmaxpool_up9(n, ks, kc, input, row, index_row, inc, out_inc, &params)
                }
                ArgmaxPoolUkernel::Mp9p8q => {
                    f32_argmaxpool_mp9p8q(
                        n,
                        ks,
                        kc,
                        input,
                        acc_buffer,
                        index_buffer,
                        row,
                        index_row,
                        inc,
                        out_inc,
                        &params,
                    )
                }
            }
        });
        Ok(())
    }
}
