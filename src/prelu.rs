//! Parametric ReLU over `[batch, channels]` rows: `y = x` for `x >= 0`, `y = slope[c] * x`
//! otherwise, then clamped.

use crate::capabilities::Capabilities;
use crate::config::{F32Clamp, PreluConfig};
use crate::error::{PoolError, Result, fail, try_grow};
use crate::operator::{BufferId, OperatorType, RunState, required_len};
use crate::params::{compute_f32_output_params, validate_f32_clamp};
use crate::threadpool::ThreadPool;
use pool_rs_kernels::{OutputParams, f32_prelu_x4};

/// `f32` PReLU operator.
#[derive(Debug)]
pub struct PreluF32 {
    config: PreluConfig,
    slopes: Vec<f32>,
    params: OutputParams<f32>,
    row_tile: usize,
    state: RunState,
    batch_size: usize,
    input: BufferId,
    output: BufferId,
}

impl PreluF32 {
    /// Validates the configuration and packs the first `config.channels` slopes.
    pub fn create(caps: &Capabilities, config: &PreluConfig, slopes: &[f32], clamp: F32Clamp) -> Result<Self> {
        let name = OperatorType::PreluF32.name();
        if !caps.is_initialized() {
            log::error!("failed to create {} operator: pool-rs is not initialized", name);
            return Err(PoolError::Uninitialized);
        }
        let channels = config.channels;
        if channels == 0 {
            return Err(fail!(
                InvalidParameter,
                "failed to create {} operator with {} channels: number of channels must be non-zero",
                name,
                channels
            ));
        }
        if config.input_stride < channels {
            return Err(fail!(
                InvalidParameter,
                "failed to create {} operator with input element stride of {}: \
                 stride must be at least as large as the number of channels ({})",
                name,
                config.input_stride,
                channels
            ));
        }
        if config.output_stride < channels {
            return Err(fail!(
                InvalidParameter,
                "failed to create {} operator with output element stride of {}: \
                 stride must be at least as large as the number of channels ({})",
                name,
                config.output_stride,
                channels
            ));
        }
        if slopes.len() < channels {
            return Err(fail!(
                InvalidParameter,
                "failed to create {} operator with {} slopes for {} channels",
                name,
                slopes.len(),
                channels
            ));
        }
        validate_f32_clamp(name, &clamp)?;

        let mut packed = Vec::new();
        try_grow(&mut packed, channels, 0.0, "packed slope data")?;
        packed.copy_from_slice(&slopes[..channels]);

        Ok(Self {
            config: *config,
            slopes: packed,
            params: compute_f32_output_params(clamp.min, clamp.max),
            row_tile: caps.prelu_row_tile(),
            state: RunState::Uninitialized,
            batch_size: 0,
            input: BufferId::default(),
            output: BufferId::default(),
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Binds `batch_size` rows of input and output.
    pub fn setup(&mut self, caps: &Capabilities, batch_size: usize, input: &[f32], output: &mut [f32]) -> Result<()> {
        self.state = RunState::Invalid;
        let name = OperatorType::PreluF32.name();
        if !caps.is_initialized() {
            log::error!("failed to setup {} operator: pool-rs is not initialized", name);
            return Err(PoolError::Uninitialized);
        }
        if batch_size == 0 {
            self.state = RunState::Skip;
            return Ok(());
        }

        let c = &self.config;
        let input_len = required_len(batch_size, c.input_stride, c.channels);
        let output_len = required_len(batch_size, c.output_stride, c.channels);
        if input.len() < input_len || output.len() < output_len {
            return Err(fail!(
                InvalidParameter,
                "failed to setup {} operator with batch size {}: buffers hold {} and {} elements, {} and {} required",
                name,
                batch_size,
                input.len(),
                output.len(),
                input_len,
                output_len
            ));
        }

        self.batch_size = batch_size;
        self.input = BufferId::of(input);
        self.output = BufferId::of(output);
        self.state = RunState::Ready;
        Ok(())
    }

    /// Applies PReLU to the rows bound by the last `setup`, in tiles of rows.
    pub fn run<P: ThreadPool>(&self, input: &[f32], output: &mut [f32], threadpool: &P) -> Result<()> {
        let name = OperatorType::PreluF32.name();
        match self.state {
            RunState::Skip => return Ok(()),
            RunState::Ready => {}
            state => {
                log::error!("failed to run {} operator in the {:?} state", name, state);
                return Err(PoolError::InvalidState(state));
            }
        }
        if BufferId::of(input) != self.input || BufferId::of(output) != self.output {
            return Err(fail!(
                InvalidParameter,
                "failed to run {} operator: buffers differ from the ones passed to setup",
                name
            ));
        }

        let c = &self.config;
        let tile = self.row_tile;
        let output_len = required_len(self.batch_size, c.output_stride, c.channels);
        let mut cells: Vec<&mut [f32]> = output[..output_len].chunks_mut(tile * c.output_stride).collect();
        let (batch_size, slopes, params) = (self.batch_size, &self.slopes, &self.params);

        threadpool.parallelize_1d(&mut cells, |index, rows| {
            let start = index * tile;
            let count = tile.min(batch_size - start);
            f32_prelu_x4(
                count,
                c.channels,
                &input[start * c.input_stride..],
                c.input_stride,
                slopes,
                rows,
                c.output_stride,
                params,
            );
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threadpool::{RayonThreadPool, Sequential};

    #[test]
    fn test_prelu_rows_and_tail_tile() {
        let caps = Capabilities::initialize();
        let config = PreluConfig::new(2);
        let mut op = PreluF32::create(&caps, &config, &[0.5, 0.25], F32Clamp::default()).unwrap();

        let input: Vec<f32> = (0..10).map(|i| if i % 3 == 0 { -(i as f32) } else { i as f32 }).collect();
        let mut output = vec![0.0f32; 10];
        op.setup(&caps, 5, &input, &mut output).unwrap();
        op.run(&input, &mut output, &RayonThreadPool::global()).unwrap();

        let expected: Vec<f32> = input
            .iter()
            .enumerate()
            .map(|(i, &x)| if x < 0.0 { x * [0.5, 0.25][i % 2] } else { x })
            .collect();
        assert_eq!(output, expected);
    }

    #[test]
    fn test_prelu_strides_leave_gaps_untouched() {
        let caps = Capabilities::initialize();
        let config = PreluConfig::new(1).with_strides(2, 3);
        let mut op = PreluF32::create(&caps, &config, &[2.0], F32Clamp::new(-3.0, 3.0)).unwrap();

        let input = vec![-1.0, 7.0, -4.0, 7.0, 5.0];
        let mut output = vec![9.0f32; 7];
        op.setup(&caps, 3, &input, &mut output).unwrap();
        op.run(&input, &mut output, &Sequential).unwrap();
        assert_eq!(output, vec![-2.0, 9.0, 9.0, -3.0, 9.0, 9.0, 3.0]);
    }

    #[test]
    fn test_prelu_validation() {
        let caps = Capabilities::initialize();
        assert!(matches!(
            PreluF32::create(&Capabilities::uninitialized(), &PreluConfig::new(2), &[0.1, 0.1], F32Clamp::default()),
            Err(PoolError::Uninitialized)
        ));
        assert!(matches!(
            PreluF32::create(&caps, &PreluConfig::new(0), &[], F32Clamp::default()),
            Err(PoolError::InvalidParameter(_))
        ));
        assert!(matches!(
            PreluF32::create(&caps, &PreluConfig::new(2).with_strides(1, 2), &[0.1, 0.1], F32Clamp::default()),
            Err(PoolError::InvalidParameter(_))
        ));
        assert!(matches!(
            PreluF32::create(&caps, &PreluConfig::new(3), &[0.1, 0.1], F32Clamp::default()),
            Err(PoolError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_prelu_zero_batch() {
        let caps = Capabilities::initialize();
        let mut op = PreluF32::create(&caps, &PreluConfig::new(1), &[0.5], F32Clamp::default()).unwrap();
        let mut output = vec![1.0f32; 2];
        op.setup(&caps, 0, &[], &mut output).unwrap();
        assert_eq!(op.state(), RunState::Skip);
        op.run(&[], &mut output, &Sequential).unwrap();
        assert_eq!(output, vec![1.0, 1.0]);
    }
}
