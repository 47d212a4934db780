//! Operator descriptor and lifecycle state shared by every pooling family.
//!
//! A descriptor owns the static geometry validated by `create`, the indirection table and zero
//! row, and the fingerprint of the last successful `setup`. Family modules drive it through
//! [`PoolingDescriptor::begin_setup`], [`PoolingDescriptor::prepare_indirection`] and
//! [`PoolingDescriptor::finish_setup`], and ask it for the bound buffers on `run`.

use crate::capabilities::Capabilities;
use crate::config::Padding;
use crate::error::{PoolError, Result, fail, try_grow};
use crate::indirection::{self, IndirectionLayout};
use pool_rs_kernels::Tap;

/// Lifecycle state of an operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// Created, never set up.
    Uninitialized,
    /// The last `setup` failed, or is in progress.
    Invalid,
    /// Set up for an empty batch; `run` does nothing.
    Skip,
    /// Set up; `run` executes.
    Ready,
}

/// Operator family and numeric domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorType {
    AveragePoolingF32,
    AveragePoolingQ8,
    MaxPoolingF32,
    MaxPoolingU8,
    ArgmaxPoolingF32,
    PreluF32,
}

impl OperatorType {
    /// Name used in log and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            OperatorType::AveragePoolingF32 => "Average Pooling (F32)",
            OperatorType::AveragePoolingQ8 => "Average Pooling (Q8)",
            OperatorType::MaxPoolingF32 => "Max Pooling (F32)",
            OperatorType::MaxPoolingU8 => "Max Pooling (U8)",
            OperatorType::ArgmaxPoolingF32 => "Argmax Pooling (F32)",
            OperatorType::PreluF32 => "PReLU (F32)",
        }
    }
}

/// Identity of a caller buffer: its address and length. Never dereferenced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct BufferId {
    addr: usize,
    len: usize,
}

impl BufferId {
    pub fn of<T>(buffer: &[T]) -> Self {
        Self {
            addr: buffer.as_ptr() as usize,
            len: buffer.len(),
        }
    }

    pub fn addr(&self) -> usize {
        self.addr
    }
}

/// What an indirection table was built for. Taps are offsets from the input base, so any
/// input at the same address that is long enough can reuse the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Fingerprint {
    pub input: usize,
    pub input_height: usize,
    pub input_width: usize,
}

/// Elements a buffer of `pixels` pixels, `pixel_stride` apart, must hold.
pub(crate) fn required_len(pixels: usize, pixel_stride: usize, channels: usize) -> usize {
    if pixels == 0 {
        0
    } else {
        (pixels - 1) * pixel_stride + channels
    }
}

/// `(padded - effective_kernel) / stride + 1`, or `None` when the window does not fit.
pub(crate) fn output_dimension(padded: usize, kernel: usize, dilation: usize, stride: usize) -> Option<usize> {
    let effective = (kernel - 1) * dilation + 1;
    padded.checked_sub(effective).map(|d| d / stride + 1)
}

/// Static window geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PoolingGeometry {
    pub padding: Padding,
    pub pooling_height: usize,
    pub pooling_width: usize,
    pub stride_height: usize,
    pub stride_width: usize,
    pub dilation_height: usize,
    pub dilation_width: usize,
    pub channels: usize,
    pub input_pixel_stride: usize,
    pub output_pixel_stride: usize,
}

impl PoolingGeometry {
    pub fn pooling_size(&self) -> usize {
        self.pooling_height * self.pooling_width
    }

    pub fn any_padding(&self) -> bool {
        !self.padding.is_zero()
    }

    /// Checks run by every pooling `create`, in order.
    pub fn validate(&self, name: &str) -> Result<()> {
        let pooling_size = self.pooling_size();
        if pooling_size == 0 {
            return Err(fail!(
                InvalidParameter,
                "failed to create {} operator with {}x{} pooling size: pooling size dimensions must be non-zero",
                name,
                self.pooling_width,
                self.pooling_height
            ));
        }
        if pooling_size == 1 {
            return Err(fail!(
                InvalidParameter,
                "failed to create {} operator with 1 pooling element: 1x1 pooling is meaningless",
                name
            ));
        }
        if self.stride_height == 0 || self.stride_width == 0 {
            return Err(fail!(
                InvalidParameter,
                "failed to create {} operator with {}x{} stride: stride dimensions must be non-zero",
                name,
                self.stride_width,
                self.stride_height
            ));
        }
        if self.dilation_height == 0 || self.dilation_width == 0 {
            return Err(fail!(
                InvalidParameter,
                "failed to create {} operator with {}x{} dilation: dilation dimensions must be non-zero",
                name,
                self.dilation_width,
                self.dilation_height
            ));
        }
        if self.channels == 0 {
            return Err(fail!(
                InvalidParameter,
                "failed to create {} operator with {} channels: number of channels must be non-zero",
                name,
                self.channels
            ));
        }
        if self.input_pixel_stride < self.channels {
            return Err(fail!(
                InvalidParameter,
                "failed to create {} operator with input pixel stride of {}: \
                 stride must be at least as large as the number of channels ({})",
                name,
                self.input_pixel_stride,
                self.channels
            ));
        }
        if self.output_pixel_stride < self.channels {
            return Err(fail!(
                InvalidParameter,
                "failed to create {} operator with output pixel stride of {}: \
                 stride must be at least as large as the number of channels ({})",
                name,
                self.output_pixel_stride,
                self.channels
            ));
        }
        Ok(())
    }

    /// Output height and width for an `input_height x input_width` input.
    pub fn output_size(&self, input_height: usize, input_width: usize) -> Option<(usize, usize)> {
        let p = &self.padding;
        let output_height = output_dimension(
            p.top as usize + input_height + p.bottom as usize,
            self.pooling_height,
            self.dilation_height,
            self.stride_height,
        )?;
        let output_width = output_dimension(
            p.left as usize + input_width + p.right as usize,
            self.pooling_width,
            self.dilation_width,
            self.stride_width,
        )?;
        Some((output_height, output_width))
    }
}

/// How `setup` proceeds after the shared checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SetupPlan {
    /// Empty batch; the operator is in the `Skip` state.
    Skip,
    /// The indirection table already covers the batch; the operator is `Ready`.
    Cached,
    /// Batches `valid_batch_size..batch_size` of the table must be (re)built.
    Rebuild { valid_batch_size: usize },
}

/// How padded taps are resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PaddingMode {
    /// Padded taps read the zero row: zeros or the zero point for averages, negative infinity
    /// for arg-max.
    Zero,
    /// Padded taps repeat a real pixel of their window. Max pooling only.
    Clamp,
}

/// Descriptor state shared by every pooling family.
#[derive(Debug)]
pub(crate) struct PoolingDescriptor<T> {
    pub op_type: OperatorType,
    pub geometry: PoolingGeometry,
    /// One channel vector, or empty when no kernel call can read it.
    pub zero: Vec<T>,
    pub indirection: Vec<Tap>,
    pub state: RunState,
    pub batch_size: usize,
    pub input_height: usize,
    pub input_width: usize,
    pub output_height: usize,
    pub output_width: usize,
    pub layout: Option<IndirectionLayout>,
    input: BufferId,
    output: BufferId,
    last: Option<Fingerprint>,
    valid_batch_size: usize,
}

impl<T: Copy> PoolingDescriptor<T> {
    /// Validates `caps` and `geometry`. Numeric validation is left to the caller.
    pub fn new(caps: &Capabilities, op_type: OperatorType, geometry: PoolingGeometry) -> Result<Self> {
        let name = op_type.name();
        if !caps.is_initialized() {
            log::error!("failed to create {} operator: pool-rs is not initialized", name);
            return Err(PoolError::Uninitialized);
        }
        geometry.validate(name)?;
        Ok(Self {
            op_type,
            geometry,
            zero: Vec::new(),
            indirection: Vec::new(),
            state: RunState::Uninitialized,
            batch_size: 0,
            input_height: 0,
            input_width: 0,
            output_height: 0,
            output_width: 0,
            layout: None,
            input: BufferId::default(),
            output: BufferId::default(),
            last: None,
            valid_batch_size: 0,
        })
    }

    /// Allocates the zero row, filled with `value`.
    pub fn allocate_zero(&mut self, value: T) -> Result<()> {
        try_grow(&mut self.zero, self.geometry.channels, value, "zero padding")
    }

    /// Shared first half of `setup`: forces the `Invalid` state, validates runtime geometry and
    /// buffers, binds them, and decides whether the indirection table can be reused.
    pub fn begin_setup(
        &mut self,
        caps: &Capabilities,
        batch_size: usize,
        input_height: usize,
        input_width: usize,
        input: &[T],
        output: &[T],
    ) -> Result<SetupPlan> {
        self.state = RunState::Invalid;
        let name = self.op_type.name();

        if !caps.is_initialized() {
            log::error!("failed to setup {} operator: pool-rs is not initialized", name);
            return Err(PoolError::Uninitialized);
        }
        if input_width == 0 || input_height == 0 {
            return Err(fail!(
                InvalidParameter,
                "failed to setup {} operator with {}x{} input: input dimensions must be non-zero",
                name,
                input_width,
                input_height
            ));
        }
        if batch_size == 0 {
            self.state = RunState::Skip;
            return Ok(SetupPlan::Skip);
        }

        let g = &self.geometry;
        let (output_height, output_width) = g.output_size(input_height, input_width).ok_or_else(|| {
            fail!(
                InvalidParameter,
                "failed to setup {} operator with {}x{} input: padded input is smaller than the {}x{} pooling window",
                name,
                input_width,
                input_height,
                (g.pooling_width - 1) * g.dilation_width + 1,
                (g.pooling_height - 1) * g.dilation_height + 1
            )
        })?;

        let input_len = required_len(batch_size * input_height * input_width, g.input_pixel_stride, g.channels);
        if input.len() < input_len {
            return Err(fail!(
                InvalidParameter,
                "failed to setup {} operator: input buffer holds {} elements, {} required",
                name,
                input.len(),
                input_len
            ));
        }
        let output_len = required_len(batch_size * output_height * output_width, g.output_pixel_stride, g.channels);
        if output.len() < output_len {
            return Err(fail!(
                InvalidParameter,
                "failed to setup {} operator: output buffer holds {} elements, {} required",
                name,
                output.len(),
                output_len
            ));
        }

        self.batch_size = batch_size;
        self.input_height = input_height;
        self.input_width = input_width;
        self.output_height = output_height;
        self.output_width = output_width;
        self.input = BufferId::of(input);
        self.output = BufferId::of(output);

        let fingerprint = self.fingerprint();
        if self.last == Some(fingerprint) {
            if batch_size <= self.valid_batch_size {
                log::debug!(
                    "{}: reusing indirection buffer built for batch size {}",
                    name,
                    self.valid_batch_size
                );
                self.state = RunState::Ready;
                return Ok(SetupPlan::Cached);
            }
            return Ok(SetupPlan::Rebuild {
                valid_batch_size: self.valid_batch_size,
            });
        }
        Ok(SetupPlan::Rebuild { valid_batch_size: 0 })
    }

    fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            input: self.input.addr(),
            input_height: self.input_height,
            input_width: self.input_width,
        }
    }

    /// Grows the indirection table for the bound batch and fills batches
    /// `valid_batch_size..batch_size` plus `mr - 1` guard entries.
    ///
    /// The fingerprint is cleared before the table is touched and only restored by
    /// [`Self::finish_setup`].
    pub fn prepare_indirection(
        &mut self,
        mr: usize,
        step_width: usize,
        mode: PaddingMode,
        valid_batch_size: usize,
    ) -> Result<IndirectionLayout> {
        let g = &self.geometry;
        let layout = IndirectionLayout {
            input_height: self.input_height,
            input_width: self.input_width,
            input_pixel_stride: g.input_pixel_stride,
            output_height: self.output_height,
            output_width: self.output_width,
            pooling_height: g.pooling_height,
            pooling_width: g.pooling_width,
            stride_height: g.stride_height,
            stride_width: g.stride_width,
            dilation_height: g.dilation_height,
            dilation_width: g.dilation_width,
            padding_top: g.padding.top as usize,
            padding_left: g.padding.left as usize,
            step_width,
            step_height: indirection::step_height(g.pooling_height, g.pooling_width, self.output_width, step_width),
        };

        let guard = mr - 1;
        try_grow(
            &mut self.indirection,
            layout.len(self.batch_size) + guard,
            Tap::Zero,
            "indirection buffer",
        )?;
        self.last = None;

        log::debug!(
            "{}: building indirection buffer for batches {}..{} ({} entries per row)",
            self.op_type.name(),
            valid_batch_size,
            self.batch_size,
            layout.step_height
        );
        match mode {
            PaddingMode::Zero => {
                indirection::init_zero_padded(&mut self.indirection, &layout, valid_batch_size, self.batch_size)
            }
            PaddingMode::Clamp => {
                indirection::init_edge_clamped(&mut self.indirection, &layout, valid_batch_size, self.batch_size)
            }
        }
        indirection::fill_guard(&mut self.indirection, &layout, self.batch_size, guard);
        self.layout = Some(layout);
        Ok(layout)
    }

    /// Records the fingerprint the table now covers and marks the operator `Ready`.
    pub fn finish_setup(&mut self, valid_batch_size: usize) {
        self.last = Some(self.fingerprint());
        self.valid_batch_size = valid_batch_size.max(self.batch_size);
        self.state = RunState::Ready;
    }

    /// Checks that `run` may proceed with these buffers. Returns `false` for `Skip`.
    pub fn check_run(&self, input: &[T], output: &[T]) -> Result<bool> {
        match self.state {
            RunState::Skip => Ok(false),
            RunState::Ready => {
                if BufferId::of(input) != self.input || BufferId::of(output) != self.output {
                    return Err(fail!(
                        InvalidParameter,
                        "failed to run {} operator: buffers differ from the ones passed to setup",
                        self.op_type.name()
                    ));
                }
                Ok(true)
            }
            state => {
                log::error!("failed to run {} operator in the {:?} state", self.op_type.name(), state);
                Err(PoolError::InvalidState(state))
            }
        }
    }

    /// Output elements written by `run`.
    pub fn output_len(&self) -> usize {
        required_len(
            self.batch_size * self.output_height * self.output_width,
            self.geometry.output_pixel_stride,
            self.geometry.channels,
        )
    }

    /// Elements between the starts of consecutive output rows.
    pub fn output_height_stride(&self) -> usize {
        self.output_width * self.geometry.output_pixel_stride
    }
}
