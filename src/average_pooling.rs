//! Average pooling operators.
//!
//! Without padding every window holds `pooling_size` real taps, so one reciprocal divides every
//! sum. With padding, windows on the border hold fewer real taps: the `f32` operator then keeps
//! a per-pixel divisor buffer, rebuilt only when the input height or width changes. The
//! quantized operator always divides by `pooling_size`; its padded taps read the input zero
//! point and contribute nothing to the dequantized sum.

use crate::capabilities::{Capabilities, PoolTile};
use crate::compute::{Passes, PoolingRows, dispatch_rows, reduce_adjustment, row_cells, scratch_cells};
use crate::config::{AveragePoolingConfig, F32Clamp, Q8AvgPoolQuantization};
use crate::error::{PoolError, Result, try_grow};
use crate::operator::{OperatorType, PaddingMode, PoolingDescriptor, PoolingGeometry, RunState, SetupPlan};
use crate::params::{
    compute_f32_avgpool_params, compute_f32_output_params, doz, needs_fillers, q8_avgpool_params,
    validate_f32_clamp, validate_q8_quantization,
};
use crate::threadpool::ThreadPool;
use pool_rs_kernels::{
    F32AvgPoolParams, IndirectInput, OutputParams, Q8AvgPoolParams, f32_avgpool_mp9p8q,
    f32_avgpool_up9, f32_pavgpool_mp9p8q, f32_pavgpool_up9, q8_avgpool_mp9p8q, q8_avgpool_up9,
};

fn geometry(config: &AveragePoolingConfig) -> PoolingGeometry {
    PoolingGeometry {
        padding: config.padding,
        pooling_height: config.pooling_height as usize,
        pooling_width: config.pooling_width as usize,
        stride_height: config.stride_height as usize,
        stride_width: config.stride_width as usize,
        dilation_height: 1,
        dilation_width: 1,
        channels: config.channels,
        input_pixel_stride: config.input_pixel_stride,
        output_pixel_stride: config.output_pixel_stride,
    }
}

/// Builds the indirection table for a rebuild plan and returns the row context.
fn prepare_rows<T: Copy>(
    desc: &mut PoolingDescriptor<T>,
    tile: PoolTile,
    valid_batch_size: usize,
) -> Result<(PoolingRows, Passes)> {
    let g = desc.geometry;
    let step_width = g.stride_width.min(g.pooling_width);
    let layout = desc.prepare_indirection(tile.mr as usize, step_width, PaddingMode::Zero, valid_batch_size)?;
    let pooling_size = g.pooling_size();
    let rows = PoolingRows::new(
        &layout,
        g.channels,
        g.output_pixel_stride,
        reduce_adjustment(pooling_size, tile),
    );
    Ok((rows, Passes::select(pooling_size, tile)))
}

#[derive(Clone, Copy, Debug)]
enum F32AvgPoolUkernel {
    Uniform(F32AvgPoolParams),
    Pixelwise(OutputParams<f32>),
}

/// `f32` average pooling over NHWC input.
#[derive(Debug)]
pub struct AveragePoolingF32 {
    desc: PoolingDescriptor<f32>,
    ukernel: F32AvgPoolUkernel,
    tile: PoolTile,
    /// Reciprocal tap count per output pixel; only used with padding.
    divisors: Vec<f32>,
    divisors_size: Option<(usize, usize)>,
    context: Option<(PoolingRows, Passes)>,
}

impl AveragePoolingF32 {
    /// Validates `config` and `clamp` and creates the operator.
    ///
    /// # Errors
    ///
    /// * `Uninitialized` if `caps` was never initialized.
    /// * `InvalidParameter` for a zero or 1x1 window, zero stride or channels, pixel strides
    ///   below the channel count, or a NaN or empty clamp range.
    /// * `OutOfMemory` if the zero row cannot be allocated.
    pub fn create(caps: &Capabilities, config: &AveragePoolingConfig, clamp: F32Clamp) -> Result<Self> {
        let op_type = OperatorType::AveragePoolingF32;
        let geometry = geometry(config);
        let mut desc = PoolingDescriptor::new(caps, op_type, geometry)?;
        validate_f32_clamp(op_type.name(), &clamp)?;

        let pooling_size = geometry.pooling_size();
        let (ukernel, tile) = if geometry.any_padding() {
            let params = compute_f32_output_params(clamp.min, clamp.max);
            (F32AvgPoolUkernel::Pixelwise(params), caps.f32_pavgpool())
        } else {
            let params = compute_f32_avgpool_params(1.0 / pooling_size as f32, clamp.min, clamp.max);
            (F32AvgPoolUkernel::Uniform(params), caps.f32_avgpool())
        };
        debug_assert_eq!(caps.f32_avgpool().mr, caps.f32_pavgpool().mr);
        if geometry.any_padding() || needs_fillers(pooling_size, tile) {
            desc.allocate_zero(0.0)?;
        }

        Ok(Self {
            desc,
            ukernel,
            tile,
            divisors: Vec::new(),
            divisors_size: None,
            context: None,
        })
    }

    pub fn state(&self) -> RunState {
        self.desc.state
    }

    /// Output height and width for an `input_height x input_width` input, if the window fits.
    pub fn output_size(&self, input_height: usize, input_width: usize) -> Option<(usize, usize)> {
        self.desc.geometry.output_size(input_height, input_width)
    }

    /// Binds `batch_size` images of `input_height x input_width` pixels.
    ///
    /// `run` must later be called with the same `input` and `output` buffers. A zero
    /// `batch_size` is accepted and makes `run` a no-op.
    pub fn setup(
        &mut self,
        caps: &Capabilities,
        batch_size: usize,
        input_height: usize,
        input_width: usize,
        input: &[f32],
        output: &mut [f32],
    ) -> Result<()> {
        let plan = self
            .desc
            .begin_setup(caps, batch_size, input_height, input_width, input, output)?;
        let SetupPlan::Rebuild { valid_batch_size } = plan else {
            return Ok(());
        };

        let context = prepare_rows(&mut self.desc, self.tile, valid_batch_size)?;
        if matches!(self.ukernel, F32AvgPoolUkernel::Pixelwise(_))
            && self.divisors_size != Some((input_height, input_width))
        {
            self.build_divisors()?;
        }
        self.context = Some(context);
        self.desc.finish_setup(valid_batch_size);
        Ok(())
    }

    fn build_divisors(&mut self) -> Result<()> {
        let d = &self.desc;
        let g = &d.geometry;
        let (output_height, output_width) = (d.output_height, d.output_width);
        let (input_height, input_width) = (d.input_height, d.input_width);
        let (padding_top, padding_left) = (g.padding.top as usize, g.padding.left as usize);

        try_grow(&mut self.divisors, output_height * output_width, 0.0, "pixelwise buffer")?;
        self.divisors_size = None;
        log::debug!(
            "{}: building pixelwise divisors for {}x{} input",
            d.op_type.name(),
            input_width,
            input_height
        );

        for (output_y, row) in self.divisors.chunks_mut(output_width).take(output_height).enumerate() {
            let y_start = doz(output_y * g.stride_height, padding_top);
            let y_end = doz(output_y * g.stride_height + g.pooling_height, padding_top).min(input_height);
            for (output_x, divisor) in row.iter_mut().enumerate() {
                let x_start = doz(output_x * g.stride_width, padding_left);
                let x_end = doz(output_x * g.stride_width + g.pooling_width, padding_left).min(input_width);
                let count = doz(y_end, y_start) * doz(x_end, x_start);
                *divisor = 1.0 / count.max(1) as f32;
            }
        }
        self.divisors_size = Some((input_height, input_width));
        Ok(())
    }

    /// Computes the output bound by the last `setup`.
    pub fn run<P: ThreadPool>(&self, input: &[f32], output: &mut [f32], threadpool: &P) -> Result<()> {
        if !self.desc.check_run(input, output)? {
            return Ok(());
        }
        let Some((rows, passes)) = self.context else {
            return Err(PoolError::InvalidState(self.desc.state));
        };

        let d = &self.desc;
        let taps = IndirectInput::new(&d.indirection, input, &d.zero);
        let (output_height, output_width) = (d.output_height, d.output_width);
        let divisors = self.divisors.as_slice();
        let ukernel = self.ukernel;
        let output_rows = row_cells(output, d.output_len(), d.output_height_stride());
        let mut scratch = Vec::new();
        let buffers = scratch_cells(&mut scratch, output_rows.len(), passes.scratch_width(rows.channels), 0.0f32)?;
        let mut cells: Vec<(&mut [f32], &mut [f32])> = output_rows.into_iter().zip(buffers).collect();

        dispatch_rows(threadpool, d.batch_size, output_height, &mut cells, |batch, output_y, row, buffer| {
            let input = rows.row_input(taps, batch * output_height + output_y);
            let (n, ks, kc) = (rows.output_width, rows.pooling_size, rows.channels);
            let (inc, out_inc) = (rows.input_increment, rows.output_increment);
            match (ukernel, passes) {
                (F32AvgPoolUkernel::Uniform(params), Passes::Unipass) => {
                    f32_avgpool_up9(n, ks, kc, input, row, inc, out_inc, &params)
                }
                (F32AvgPoolUkernel::Uniform(params), Passes::Multipass) => {
                    f32_avgpool_mp9p8q(n, ks, kc, input, buffer, row, inc, out_inc, &params)
                }
                (F32AvgPoolUkernel::Pixelwise(params), Passes::Unipass) => {
                    let multiplier = &divisors[output_y * output_width..][..output_width];
                    f32_pavgpool_up9(n, ks, kc, input, multiplier, row, inc, out_inc, &params)
                }
                (F32AvgPoolUkernel::Pixelwise(params), Passes::Multipass) => {
                    let multiplier = &divisors[output_y * output_width..][..output_width];
                    f32_pavgpool_mp9p8q(n, ks, kc, input, multiplier, buffer, row, inc, out_inc, &params)
                }
            }
        });
        Ok(())
    }
}

/// Quantized (`u8`, affine) average pooling over NHWC input.
#[derive(Debug)]
pub struct AveragePoolingQ8 {
    desc: PoolingDescriptor<u8>,
    params: Q8AvgPoolParams,
    tile: PoolTile,
    context: Option<(PoolingRows, Passes)>,
}

impl AveragePoolingQ8 {
    /// Validates `config` and `quantization` and creates the operator.
    ///
    /// # Errors
    ///
    /// Besides the geometry checks of [`AveragePoolingF32::create`]:
    ///
    /// * `InvalidParameter` for a scale that is not normal and positive, or an empty output range.
    /// * `UnsupportedParameter` for an input-to-output scale ratio outside `[2^-8, 2^8)` or a
    ///   window of `2^24` taps or more.
    pub fn create(
        caps: &Capabilities,
        config: &AveragePoolingConfig,
        quantization: Q8AvgPoolQuantization,
    ) -> Result<Self> {
        let op_type = OperatorType::AveragePoolingQ8;
        let geometry = geometry(config);
        let mut desc = PoolingDescriptor::new(caps, op_type, geometry)?;
        let pooling_size = geometry.pooling_size();
        validate_q8_quantization(op_type.name(), &quantization, pooling_size)?;

        let tile = caps.q8_avgpool();
        if geometry.any_padding() || needs_fillers(pooling_size, tile) {
            desc.allocate_zero(quantization.input_zero_point)?;
        }
        let params = q8_avgpool_params(&quantization, pooling_size, tile);

        Ok(Self {
            desc,
            params,
            tile,
            context: None,
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
        input: &[u8],
        output: &mut [u8],
    ) -> Result<()> {
        let plan = self
            .desc
            .begin_setup(caps, batch_size, input_height, input_width, input, output)?;
        let SetupPlan::Rebuild { valid_batch_size } = plan else {
            return Ok(());
        };
        self.context = Some(prepare_rows(&mut self.desc, self.tile, valid_batch_size)?);
        self.desc.finish_setup(valid_batch_size);
        Ok(())
    }

    /// Computes the output bound by the last `setup`.
    pub fn run<P: ThreadPool>(&self, input: &[u8], output: &mut [u8], threadpool: &P) -> Result<()> {
        if !self.desc.check_run(input, output)? {
            return Ok(());
        }
        let Some((rows, passes)) = self.context else {
            return Err(PoolError::InvalidState(self.desc.state));
        };

        let d = &self.desc;
        let taps = IndirectInput::new(&d.indirection, input, &d.zero);
        let output_height = d.output_height;
        let params = self.params;
        let output_rows = row_cells(output, d.output_len(), d.output_height_stride());
        let mut scratch = Vec::new();
        let buffers = scratch_cells(&mut scratch, output_rows.len(), passes.scratch_width(rows.channels), 0i32)?;
        let mut cells: Vec<(&mut [u8], &mut [i32])> = output_rows.into_iter().zip(buffers).collect();

        dispatch_rows(threadpool, d.batch_size, output_height, &mut cells, |batch, output_y, row, buffer| {
            let input = rows.row_input(taps, batch * output_height + output_y);
            let (n, ks, kc) = (rows.output_width, rows.pooling_size, rows.channels);
            let (inc, out_inc) = (rows.input_increment, rows.output_increment);
            match passes {
                Passes::Unipass => q8_avgpool_up9(n, ks, kc, input, row, inc, out_inc, &params),
                Passes::Multipass => q8_avgpool_mp9p8q(n, ks, kc, input, buffer, row, inc, out_inc, &params),
            }
        });
        Ok(())
    }
}
