//! Benchmarks for edge detection.
//!
//! Run with: `cargo bench -p vfx-edge-bench`

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use vfx_edge::kernels::{self, BlurDirection, GradientConfig, TexelView};
use vfx_edge::{
    Backend, BlurKernel, EdgeDetector, EdgeParams, EdgePolarity, HostImage, Hysteresis, PixelFormat,
};

fn test_frame(width: u32, height: u32) -> HostImage {
    HostImage::from_fn(width, height, PixelFormat::Rgba, |x, y, ch| {
        if ch == 3 {
            return 1.0;
        }
        let v = ((x as f32 * 0.07).sin() * (y as f32 * 0.05).cos()) * 0.5 + 0.5;
        if (x / 32 + y / 32) % 2 == 0 { v } else { 1.0 - v }
    })
}

/// Benchmark single-texel kernels.
fn bench_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernels");

    let frame = test_frame(256, 256);
    let view = TexelView::new(frame.data(), frame.desc());

    for sigma in [1.0f32, 4.0] {
        let kernel = BlurKernel::gaussian(sigma);
        group.bench_with_input(BenchmarkId::new("blur_texel", sigma), &kernel, |b, k| {
            b.iter(|| kernels::blur_texel(&view, black_box(128), black_box(128), 0, k.weights(), BlurDirection::Horizontal))
        });
    }

    let config = GradientConfig {
        step_x: 1.0,
        step_y: 1.0,
        threshold: 0.5,
        low_threshold: None,
        polarity: EdgePolarity::Light,
        output: PixelFormat::Luminance,
    };
    group.bench_function("gradient_texel", |b| {
        let mut out = [0.0f32; 1];
        b.iter(|| kernels::gradient_texel(&view, black_box(128), black_box(128), &config, &mut out))
    });

    group.finish();
}

/// Benchmark full frames on the reference backend.
fn bench_reference_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("reference_pipeline");
    group.sample_size(20);

    for (w, h) in [(256u32, 256u32), (1280, 720)] {
        let frame = test_frame(w, h);
        group.throughput(Throughput::Elements(u64::from(w) * u64::from(h)));

        let mut plain = EdgeDetector::new(Backend::Reference).unwrap();
        group.bench_with_input(BenchmarkId::new("canny", format!("{w}x{h}")), &frame, |b, f| {
            b.iter(|| plain.detect(black_box(f)).unwrap())
        });

        let params = EdgeParams {
            hysteresis: Some(Hysteresis::new(0.2, 4)),
            ..Default::default()
        };
        let mut linked = EdgeDetector::with_params(Backend::Reference, params).unwrap();
        group.bench_with_input(BenchmarkId::new("canny_hysteresis", format!("{w}x{h}")), &frame, |b, f| {
            b.iter(|| linked.detect(black_box(f)).unwrap())
        });
    }

    group.finish();
}

/// Benchmark full frames on the GPU, when one is present.
fn bench_wgpu_pipeline(c: &mut Criterion) {
    let Ok(mut detector) = EdgeDetector::new(Backend::Wgpu) else {
        eprintln!("wgpu unavailable, skipping GPU benchmarks");
        return;
    };

    let mut group = c.benchmark_group("wgpu_pipeline");
    group.sample_size(20);
    for (w, h) in [(1280u32, 720u32), (1920, 1080)] {
        let frame = test_frame(w, h);
        group.throughput(Throughput::Elements(u64::from(w) * u64::from(h)));
        group.bench_with_input(BenchmarkId::new("canny", format!("{w}x{h}")), &frame, |b, f| {
            b.iter(|| detector.detect(black_box(f)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_kernels, bench_reference_pipeline, bench_wgpu_pipeline);
criterion_main!(benches);
