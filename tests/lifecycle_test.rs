mod common;

use common::{Window, random_f32, random_u8};
use pool_rs::{
    ArgmaxPoolingConfig, ArgmaxPoolingF32, AveragePoolingConfig, AveragePoolingF32, AveragePoolingQ8, Capabilities,
    F32Clamp, MaxPoolingConfig, MaxPoolingF32, MaxPoolingU8, Padding, PoolError, PreluConfig, PreluF32,
    Q8AvgPoolQuantization, RunState, Sequential, U8Clamp,
};

#[test]
fn test_output_size_matches_window_count() {
    let caps = Capabilities::initialize();
    for (pooling, stride, dilation, padding) in [
        ((2, 2), (2, 2), (1, 1), (0, 0, 0, 0)),
        ((3, 3), (1, 1), (2, 2), (2, 2, 2, 2)),
        ((3, 2), (2, 3), (1, 3), (1, 0, 2, 1)),
        ((1, 4), (1, 1), (1, 1), (0, 3, 0, 0)),
    ] {
        let window = Window::new(pooling, stride).dilation(dilation).padding(padding);
        let config = MaxPoolingConfig::new(pooling.0 as u32, pooling.1 as u32, 1)
            .with_stride(stride.0 as u32, stride.1 as u32)
            .with_dilation(dilation.0 as u32, dilation.1 as u32)
            .with_padding(Padding::new(
                padding.0 as u32,
                padding.1 as u32,
                padding.2 as u32,
                padding.3 as u32,
            ));
        let op = MaxPoolingF32::create(&caps, &config, F32Clamp::default()).unwrap();
        for height in 4..12 {
            for width in 4..12 {
                assert_eq!(
                    op.output_size(height, width),
                    Some(window.count_positions(height, width)),
                    "{window:?} {height}x{width}"
                );
            }
        }
    }
}

#[test]
fn test_repeated_setup_is_idempotent() {
    let caps = Capabilities::initialize();
    let config = AveragePoolingConfig::new(3, 3, 4).with_padding(Padding::uniform(1));
    let mut op = AveragePoolingF32::create(&caps, &config, F32Clamp::default()).unwrap();

    let images = random_f32(2, 6, 5, 4, 4, 31);
    let mut first = vec![0.0f32; 2 * 6 * 5 * 4];
    op.setup(&caps, 2, 6, 5, &images.data, &mut first).unwrap();
    op.run(&images.data, &mut first, &Sequential).unwrap();

    let mut second = vec![0.0f32; first.len()];
    for _ in 0..3 {
        op.setup(&caps, 2, 6, 5, &images.data, &mut second).unwrap();
        op.run(&images.data, &mut second, &Sequential).unwrap();
    }
    assert_eq!(bits(&first), bits(&second));
}

#[test]
fn test_growing_batch_keeps_prefix() {
    let caps = Capabilities::initialize();
    let config = MaxPoolingConfig::new(2, 3, 3).with_padding(Padding::new(1, 0, 0, 1));
    let mut op = MaxPoolingU8::create(&caps, &config, U8Clamp::default()).unwrap();

    let images = random_u8(4, 5, 6, 3, 3, 37);
    let (oh, ow) = op.output_size(5, 6).unwrap();
    let image_len = oh * ow * 3;
    let mut output = vec![0u8; 4 * image_len];

    let mut previous: Vec<u8> = Vec::new();
    for batch in [1, 3, 2, 4] {
        op.setup(&caps, batch, 5, 6, &images.data, &mut output).unwrap();
        op.run(&images.data, &mut output, &Sequential).unwrap();
        let shared = previous.len().min(batch * image_len);
        assert_eq!(&output[..shared], &previous[..shared], "batch {batch}");
        previous = output[..batch * image_len].to_vec();
    }
}

fn bits(values: &[f32]) -> Vec<u32> {
    values.iter().map(|v| v.to_bits()).collect()
}

#[test]
fn test_incremental_setup_matches_fresh_operator() {
    let caps = Capabilities::initialize();
    let (height, width) = (9, 8);
    let images = random_f32(5, height, width, 5, 7, 71);
    let image_len = height * width * 7;

    // 12 taps with padding selects the multipass pixelwise kernel.
    let config = AveragePoolingConfig::new(4, 3, 5)
        .with_stride(3, 2)
        .with_padding(Padding::new(1, 2, 1, 2))
        .with_pixel_strides(7, 6);
    let mut warm = AveragePoolingF32::create(&caps, &config, F32Clamp::default()).unwrap();
    let (oh, ow) = warm.output_size(height, width).unwrap();
    let output_len = oh * ow * 6;
    let mut incremental = vec![0.0f32; 5 * output_len];
    for batch in [1, 2, 5] {
        let input = &images.data[..batch * image_len];
        let output = &mut incremental[..batch * output_len];
        warm.setup(&caps, batch, height, width, input, output).unwrap();
        warm.run(input, output, &Sequential).unwrap();
    }
    let mut cold = AveragePoolingF32::create(&caps, &config, F32Clamp::default()).unwrap();
    let mut fresh = vec![0.0f32; 5 * output_len];
    cold.setup(&caps, 5, height, width, &images.data, &mut fresh).unwrap();
    cold.run(&images.data, &mut fresh, &Sequential).unwrap();
    assert_eq!(bits(&incremental), bits(&fresh));

    let config = MaxPoolingConfig::new(3, 3, 5)
        .with_stride(1, 2)
        .with_dilation(2, 1)
        .with_padding(Padding::new(2, 1, 0, 1))
        .with_pixel_strides(7, 6);
    let mut warm = MaxPoolingF32::create(&caps, &config, F32Clamp::default()).unwrap();
    let (oh, ow) = warm.output_size(height, width).unwrap();
    let output_len = oh * ow * 6;
    let mut incremental = vec![0.0f32; 5 * output_len];
    for batch in [1, 2, 5] {
        let input = &images.data[..batch * image_len];
        let output = &mut incremental[..batch * output_len];
        warm.setup(&caps, batch, height, width, input, output).unwrap();
        warm.run(input, output, &Sequential).unwrap();
    }
    let mut cold = MaxPoolingF32::create(&caps, &config, F32Clamp::default()).unwrap();
    let mut fresh = vec![0.0f32; 5 * output_len];
    cold.setup(&caps, 5, height, width, &images.data, &mut fresh).unwrap();
    cold.run(&images.data, &mut fresh, &Sequential).unwrap();
    assert_eq!(bits(&incremental), bits(&fresh));
}

#[test]
fn test_zero_batch_leaves_output_untouched() {
    let caps = Capabilities::initialize();
    let config = AveragePoolingConfig::new(2, 2, 1);
    let mut op = AveragePoolingF32::create(&caps, &config, F32Clamp::default()).unwrap();

    let input: Vec<f32> = Vec::new();
    let mut output = vec![-7.0f32; 3];
    op.setup(&caps, 0, 4, 4, &input, &mut output).unwrap();
    assert_eq!(op.state(), RunState::Skip);
    op.run(&input, &mut output, &Sequential).unwrap();
    assert_eq!(output, vec![-7.0; 3]);
}

#[test]
fn test_uninitialized_capabilities() {
    let caps = Capabilities::uninitialized();
    assert_eq!(
        AveragePoolingF32::create(&caps, &AveragePoolingConfig::default(), F32Clamp::default()).unwrap_err(),
        PoolError::Uninitialized
    );
    assert_eq!(
        AveragePoolingQ8::create(&caps, &AveragePoolingConfig::default(), Q8AvgPoolQuantization::default())
            .unwrap_err(),
        PoolError::Uninitialized
    );
    assert_eq!(
        MaxPoolingF32::create(&caps, &MaxPoolingConfig::default(), F32Clamp::default()).unwrap_err(),
        PoolError::Uninitialized
    );
    assert_eq!(
        MaxPoolingU8::create(&caps, &MaxPoolingConfig::default(), U8Clamp::default()).unwrap_err(),
        PoolError::Uninitialized
    );
    assert_eq!(
        ArgmaxPoolingF32::create(&caps, &ArgmaxPoolingConfig::default(), F32Clamp::default()).unwrap_err(),
        PoolError::Uninitialized
    );
    assert_eq!(
        PreluF32::create(&caps, &PreluConfig::new(2), &[0.1, 0.2], F32Clamp::default()).unwrap_err(),
        PoolError::Uninitialized
    );
}

#[test]
fn test_setup_after_initialization_is_required() {
    let caps = Capabilities::initialize();
    let config = AveragePoolingConfig::new(2, 2, 1);
    let mut op = AveragePoolingF32::create(&caps, &config, F32Clamp::default()).unwrap();

    let input = vec![0.0f32; 16];
    let mut output = vec![0.0f32; 9];
    op.setup(&caps, 1, 4, 4, &input, &mut output).unwrap();
    assert_eq!(
        op.setup(&Capabilities::uninitialized(), 1, 4, 4, &input, &mut output),
        Err(PoolError::Uninitialized)
    );
    assert_eq!(op.state(), RunState::Invalid);
}

#[test]
fn test_run_before_setup() {
    let caps = Capabilities::initialize();
    let op = AveragePoolingF32::create(&caps, &AveragePoolingConfig::new(2, 2, 1), F32Clamp::default()).unwrap();
    let input = vec![0.0f32; 16];
    let mut output = vec![0.0f32; 9];
    assert_eq!(op.state(), RunState::Uninitialized);
    assert_eq!(
        op.run(&input, &mut output, &Sequential),
        Err(PoolError::InvalidState(RunState::Uninitialized))
    );
}

#[test]
fn test_failed_setup_blocks_run() {
    let caps = Capabilities::initialize();
    let config = MaxPoolingConfig::new(2, 2, 1);
    let mut op = MaxPoolingF32::create(&caps, &config, F32Clamp::default()).unwrap();

    let input = vec![0.0f32; 16];
    let mut output = vec![0.0f32; 9];
    op.setup(&caps, 1, 4, 4, &input, &mut output).unwrap();
    op.run(&input, &mut output, &Sequential).unwrap();

    assert!(matches!(
        op.setup(&caps, 1, 0, 4, &input, &mut output),
        Err(PoolError::InvalidParameter(_))
    ));
    assert_eq!(op.state(), RunState::Invalid);
    assert_eq!(
        op.run(&input, &mut output, &Sequential),
        Err(PoolError::InvalidState(RunState::Invalid))
    );
}

#[test]
fn test_run_with_other_buffers() {
    let caps = Capabilities::initialize();
    let config = AveragePoolingConfig::new(2, 2, 1);
    let mut op = AveragePoolingF32::create(&caps, &config, F32Clamp::default()).unwrap();

    let input = vec![1.0f32; 16];
    let mut output = vec![0.0f32; 9];
    op.setup(&caps, 1, 4, 4, &input, &mut output).unwrap();

    let other_input = input.clone();
    assert!(matches!(
        op.run(&other_input, &mut output, &Sequential),
        Err(PoolError::InvalidParameter(_))
    ));
    let mut other_output = vec![0.0f32; 9];
    assert!(matches!(
        op.run(&input, &mut other_output, &Sequential),
        Err(PoolError::InvalidParameter(_))
    ));
    op.run(&input, &mut output, &Sequential).unwrap();
    assert_eq!(output, vec![1.0; 9]);
}

#[test]
fn test_short_buffers_are_rejected() {
    let caps = Capabilities::initialize();
    let config = AveragePoolingConfig::new(2, 2, 3).with_pixel_strides(4, 5);
    let mut op = AveragePoolingF32::create(&caps, &config, F32Clamp::default()).unwrap();

    // The last pixel only needs `channels` elements.
    let input = vec![0.0f32; 15 * 4 + 3];
    let mut output = vec![0.0f32; 8 * 5 + 3];
    op.setup(&caps, 1, 4, 4, &input, &mut output).unwrap();

    let short_input = vec![0.0f32; 15 * 4 + 2];
    assert!(matches!(
        op.setup(&caps, 1, 4, 4, &short_input, &mut output),
        Err(PoolError::InvalidParameter(_))
    ));
    let mut short_output = vec![0.0f32; 8 * 5 + 2];
    assert!(matches!(
        op.setup(&caps, 1, 4, 4, &input, &mut short_output),
        Err(PoolError::InvalidParameter(_))
    ));
}

#[test]
fn test_window_larger_than_padded_input() {
    let caps = Capabilities::initialize();
    let config = AveragePoolingConfig::new(5, 5, 1).with_padding(Padding::uniform(1));
    let mut op = AveragePoolingF32::create(&caps, &config, F32Clamp::default()).unwrap();

    assert_eq!(op.output_size(2, 2), None);
    let input = vec![0.0f32; 4];
    let mut output = vec![0.0f32; 4];
    assert!(matches!(
        op.setup(&caps, 1, 2, 2, &input, &mut output),
        Err(PoolError::InvalidParameter(_))
    ));
}

#[test]
fn test_argmax_short_index_buffer() {
    let caps = Capabilities::initialize();
    let mut op =
        ArgmaxPoolingF32::create(&caps, &ArgmaxPoolingConfig::new(2, 2, 2), F32Clamp::default()).unwrap();

    let input = vec![0.0f32; 4 * 4 * 2];
    let mut output = vec![0.0f32; 2 * 2 * 2];
    let mut index = vec![0u32; 7];
    assert!(matches!(
        op.setup(&caps, 1, 4, 4, &input, &mut output, &mut index),
        Err(PoolError::InvalidParameter(_))
    ));
    assert_eq!(op.state(), RunState::Invalid);
}
