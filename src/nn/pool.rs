use crate::argmax_pooling::ArgmaxPoolingF32;
use crate::average_pooling::AveragePoolingF32;
use crate::capabilities::Capabilities;
use crate::config::{ArgmaxPoolingConfig, AveragePoolingConfig, F32Clamp, MaxPoolingConfig, Padding};
use crate::error::{Result, fail};
use crate::max_pooling::MaxPoolingF32;
use crate::tensor::NhwcTensor;
use crate::threadpool::{Sequential, ThreadPool};

fn output_shape(
    input: &NhwcTensor<f32>,
    output_size: Option<(usize, usize)>,
    name: &str,
) -> Result<[usize; 4]> {
    let (height, width) = output_size.ok_or_else(|| {
        fail!(
            InvalidParameter,
            "{}: {}x{} input is smaller than the pooling window",
            name,
            input.width(),
            input.height()
        )
    })?;
    Ok([input.batch(), height, width, input.channels()])
}

/// 2D Average Pooling Layer. Padded taps are excluded from each window's mean.
#[derive(Debug)]
pub struct AvgPool2d<P: ThreadPool = Sequential> {
    caps: Capabilities,
    op: AveragePoolingF32,
    threadpool: P,
}

impl AvgPool2d {
    /// Creates a new AvgPool2d layer running on the calling thread.
    ///
    /// # Arguments
    ///
    /// * `kernel_size` - Size of the square pooling window.
    /// * `stride` - Stride of the pooling.
    /// * `padding` - Zero-padding added to all sides of the input.
    /// * `channels` - Channels of every input tensor.
    pub fn new(kernel_size: u32, stride: u32, padding: u32, channels: usize) -> Result<Self> {
        Self::with_threadpool(kernel_size, stride, padding, channels, Sequential)
    }
}

impl<P: ThreadPool> AvgPool2d<P> {
    pub fn with_threadpool(
        kernel_size: u32,
        stride: u32,
        padding: u32,
        channels: usize,
        threadpool: P,
    ) -> Result<Self> {
        let caps = Capabilities::initialize();
        let config = AveragePoolingConfig::new(kernel_size, kernel_size, channels)
            .with_stride(stride, stride)
            .with_padding(Padding::uniform(padding));
        let op = AveragePoolingF32::create(&caps, &config, F32Clamp::default())?;
        Ok(Self { caps, op, threadpool })
    }

    /// Performs the forward pass.
    pub fn forward(&mut self, input: &NhwcTensor<f32>) -> Result<NhwcTensor<f32>> {
        let [batch, height, width, _] = input.shape();
        let shape = output_shape(input, self.op.output_size(height, width), "AvgPool2d")?;
        let mut output = NhwcTensor::zeros(shape);
        self.op
            .setup(&self.caps, batch, height, width, input.data(), output.data_mut())?;
        self.op.run(input.data(), output.data_mut(), &self.threadpool)?;
        Ok(output)
    }
}

/// 2D Max Pooling Layer.
#[derive(Debug)]
pub struct MaxPool2d<P: ThreadPool = Sequential> {
    caps: Capabilities,
    op: MaxPoolingF32,
    threadpool: P,
}

impl MaxPool2d {
    /// Creates a new MaxPool2d layer running on the calling thread.
    ///
    /// # Arguments
    ///
    /// * `kernel_size` - Size of the square pooling window.
    /// * `stride` - Stride of the pooling.
    /// * `padding` - Padding added to all sides of the input. Padding never wins the maximum.
    /// * `channels` - Channels of every input tensor.
    pub fn new(kernel_size: u32, stride: u32, padding: u32, channels: usize) -> Result<Self> {
        Self::with_threadpool(kernel_size, stride, padding, channels, Sequential)
    }
}

impl<P: ThreadPool> MaxPool2d<P> {
    pub fn with_threadpool(
        kernel_size: u32,
        stride: u32,
        padding: u32,
        channels: usize,
        threadpool: P,
    ) -> Result<Self> {
        let caps = Capabilities::initialize();
        let config = MaxPoolingConfig::new(kernel_size, kernel_size, channels)
            .with_stride(stride, stride)
            .with_padding(Padding::uniform(padding));
        let op = MaxPoolingF32::create(&caps, &config, F32Clamp::default())?;
        Ok(Self { caps, op, threadpool })
    }

    /// Performs the forward pass.
    pub fn forward(&mut self, input: &NhwcTensor<f32>) -> Result<NhwcTensor<f32>> {
        let [batch, height, width, _] = input.shape();
        let shape = output_shape(input, self.op.output_size(height, width), "MaxPool2d")?;
        let mut output = NhwcTensor::zeros(shape);
        self.op
            .setup(&self.caps, batch, height, width, input.data(), output.data_mut())?;
        self.op.run(input.data(), output.data_mut(), &self.threadpool)?;
        Ok(output)
    }
}

/// 2D Arg-Max Pooling Layer over non-overlapping windows.
#[derive(Debug)]
pub struct ArgmaxPool2d<P: ThreadPool = Sequential> {
    caps: Capabilities,
    op: ArgmaxPoolingF32,
    threadpool: P,
}

impl ArgmaxPool2d {
    pub fn new(kernel_size: u32, channels: usize) -> Result<Self> {
        Self::with_threadpool(kernel_size, channels, Sequential)
    }
}

impl<P: ThreadPool> ArgmaxPool2d<P> {
    pub fn with_threadpool(kernel_size: u32, channels: usize, threadpool: P) -> Result<Self> {
        let caps = Capabilities::initialize();
        let config = ArgmaxPoolingConfig::new(kernel_size, kernel_size, channels);
        let op = ArgmaxPoolingF32::create(&caps, &config, F32Clamp::default())?;
        Ok(Self { caps, op, threadpool })
    }

    /// Performs the forward pass, returning the pooled values and the window index of every
    /// maximum.
    pub fn forward(&mut self, input: &NhwcTensor<f32>) -> Result<(NhwcTensor<f32>, NhwcTensor<u32>)> {
        let [batch, height, width, _] = input.shape();
        let shape = output_shape(input, self.op.output_size(height, width), "ArgmaxPool2d")?;
        let mut output = NhwcTensor::zeros(shape);
        let mut index = NhwcTensor::zeros(shape);
        self.op.setup(
            &self.caps,
            batch,
            height,
            width,
            input.data(),
            output.data_mut(),
            index.data_mut(),
        )?;
        self.op
            .run(input.data(), output.data_mut(), index.data_mut(), &self.threadpool)?;
        Ok((output, index))
    }
}
