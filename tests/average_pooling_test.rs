mod common;

use approx::assert_relative_eq;
use common::{Images, Window, average_pool_f32, gather, random_f32};
use pool_rs::{
    AveragePoolingConfig, AveragePoolingF32, Capabilities, F32Clamp, Padding, RayonThreadPool, Sequential,
};

fn config_for(window: &Window, channels: usize) -> AveragePoolingConfig {
    let (top, right, bottom, left) = window.padding;
    AveragePoolingConfig::new(window.pooling.0 as u32, window.pooling.1 as u32, channels)
        .with_stride(window.stride.0 as u32, window.stride.1 as u32)
        .with_padding(Padding::new(top as u32, right as u32, bottom as u32, left as u32))
}

fn run_f32(images: &Images<f32>, window: &Window, output_pixel_stride: usize) -> Vec<f32> {
    let caps = Capabilities::initialize();
    let config = config_for(window, images.channels).with_pixel_strides(images.pixel_stride, output_pixel_stride);
    let mut op = AveragePoolingF32::create(&caps, &config, F32Clamp::default()).unwrap();

    let (oh, ow) = op.output_size(images.height, images.width).unwrap();
    let pixels = images.batch * oh * ow;
    let mut output = vec![f32::NAN; pixels * output_pixel_stride];
    op.setup(&caps, images.batch, images.height, images.width, &images.data, &mut output)
        .unwrap();
    op.run(&images.data, &mut output, &Sequential).unwrap();
    gather(&output, pixels, output_pixel_stride, images.channels)
}

fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert_relative_eq!(*a, *e, epsilon = 1e-4, max_relative = 1e-4);
    }
}

#[test]
fn test_two_by_two_blocks() {
    let caps = Capabilities::initialize();
    let config = AveragePoolingConfig::new(2, 2, 1).with_stride(2, 2);
    let mut op = AveragePoolingF32::create(&caps, &config, F32Clamp::default()).unwrap();

    let input: Vec<f32> = (1..=16).map(|v| v as f32).collect();
    let mut output = vec![0.0f32; 4];
    op.setup(&caps, 1, 4, 4, &input, &mut output).unwrap();
    op.run(&input, &mut output, &Sequential).unwrap();
    assert_eq!(output, vec![3.5, 5.5, 11.5, 13.5]);
}

#[test]
fn test_unipass_matches_reference() {
    for (pooling, stride) in [((2, 2), (2, 2)), ((3, 3), (1, 1)), ((1, 5), (1, 2)), ((3, 2), (2, 3))] {
        let window = Window::new(pooling, stride);
        let images = random_f32(2, 7, 8, 5, 5, 7);
        assert_close(&run_f32(&images, &window, 5), &average_pool_f32(&images, &window));
    }
}

#[test]
fn test_multipass_matches_reference() {
    for pooling in [(2, 5), (4, 4), (3, 6), (5, 5), (6, 7)] {
        let window = Window::new(pooling, (2, 1));
        let images = random_f32(2, 9, 10, 3, 3, 11);
        assert_close(&run_f32(&images, &window, 3), &average_pool_f32(&images, &window));
    }
}

#[test]
fn test_padding_excludes_padded_taps() {
    let cases = [
        Window::new((3, 3), (1, 1)).padding((1, 1, 1, 1)),
        Window::new((2, 2), (2, 2)).padding((1, 0, 1, 0)),
        Window::new((3, 3), (2, 2)).padding((0, 2, 1, 1)),
        Window::new((5, 5), (1, 1)).padding((2, 2, 2, 2)),
        Window::new((4, 3), (3, 2)).padding((3, 1, 2, 2)),
    ];
    for window in cases {
        let images = random_f32(2, 6, 7, 4, 4, 3);
        assert_close(&run_f32(&images, &window, 4), &average_pool_f32(&images, &window));
    }
}

#[test]
fn test_pixel_strides() {
    let window = Window::new((3, 3), (2, 2)).padding((1, 1, 1, 1));
    let images = random_f32(1, 5, 5, 3, 8, 21);
    let caps = Capabilities::initialize();
    let config = config_for(&window, 3).with_pixel_strides(8, 5);
    let mut op = AveragePoolingF32::create(&caps, &config, F32Clamp::default()).unwrap();

    let mut output = vec![-7.0f32; 9 * 5];
    op.setup(&caps, 1, 5, 5, &images.data, &mut output).unwrap();
    op.run(&images.data, &mut output, &Sequential).unwrap();

    assert_close(&gather(&output, 9, 5, 3), &average_pool_f32(&images, &window));
    for pixel in output.chunks(5) {
        assert_eq!(&pixel[3..], &[-7.0, -7.0]);
    }
}

#[test]
fn test_output_clamp() {
    let caps = Capabilities::initialize();
    let config = AveragePoolingConfig::new(2, 2, 1).with_stride(2, 2);
    let mut op = AveragePoolingF32::create(&caps, &config, F32Clamp::new(4.0, 12.0)).unwrap();

    let input: Vec<f32> = (1..=16).map(|v| v as f32).collect();
    let mut output = vec![0.0f32; 4];
    op.setup(&caps, 1, 4, 4, &input, &mut output).unwrap();
    op.run(&input, &mut output, &Sequential).unwrap();
    assert_eq!(output, vec![4.0, 5.5, 11.5, 12.0]);
}

#[test]
fn test_rayon_matches_sequential() {
    // 3x3 runs the unipass kernel; 5x4 the multipass one, each row with its own accumulator.
    for window in [
        Window::new((3, 3), (1, 1)).padding((1, 1, 1, 1)),
        Window::new((5, 4), (1, 2)).padding((2, 1, 2, 1)),
    ] {
        let images = random_f32(4, 12, 12, 6, 6, 5);
        let caps = Capabilities::initialize();
        let config = config_for(&window, 6);
        let mut op = AveragePoolingF32::create(&caps, &config, F32Clamp::default()).unwrap();
        let (oh, ow) = op.output_size(12, 12).unwrap();

        let mut sequential = vec![0.0f32; 4 * oh * ow * 6];
        op.setup(&caps, 4, 12, 12, &images.data, &mut sequential).unwrap();
        op.run(&images.data, &mut sequential, &Sequential).unwrap();

        let mut parallel = vec![0.0f32; 4 * oh * ow * 6];
        op.setup(&caps, 4, 12, 12, &images.data, &mut parallel).unwrap();
        op.run(&images.data, &mut parallel, &RayonThreadPool::with_threads(4).unwrap())
            .unwrap();

        assert_eq!(sequential, parallel, "{window:?}");
    }
}
