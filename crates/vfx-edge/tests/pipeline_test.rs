//! End-to-end pipeline tests on the reference backend.

use vfx_edge::backend::{PipelineRunner, ProcessingBackend};
use vfx_edge::kernels::{LumaWindow, TexelView};
use vfx_edge::{
    Backend, EdgeDetector, EdgeError, EdgeParams, EdgePipeline, EdgePolarity, FilterStage,
    GaussianBlurStage, GpuLimits, HostImage, Hysteresis, PixelFormat, ReferencePrimitives,
    StagePrimitives, WeakEdgeStage,
};

/// Luminance image: 0 left of `step`, 1 from `step` on.
fn vertical_step(width: u32, height: u32, step: u32) -> HostImage {
    HostImage::from_fn(width, height, PixelFormat::Luminance, |x, _, _| {
        if x >= step { 1.0 } else { 0.0 }
    })
}

/// Deterministic textured RGBA test pattern.
fn pattern(width: u32, height: u32) -> HostImage {
    HostImage::from_fn(width, height, PixelFormat::Rgba, |x, y, ch| {
        if ch == 3 {
            return 1.0;
        }
        let fx = x as f32 * 0.37 + ch as f32;
        let fy = y as f32 * 0.23;
        let v = (fx.sin() * fy.cos() + (x as f32 * 0.05 + y as f32 * 0.11).sin()) * 0.25 + 0.5;
        let block = if (x / 7 + y / 5) % 2 == 0 { 0.3 } else { 0.0 };
        (v + block).clamp(0.0, 1.0)
    })
}

fn detector(params: EdgeParams) -> EdgeDetector {
    EdgeDetector::with_params(Backend::Reference, params).unwrap()
}

fn edge_count(img: &HostImage) -> usize {
    img.data().iter().filter(|&&v| v > 0.5).count()
}

fn edge_columns(img: &HostImage, y: u32) -> Vec<u32> {
    (0..img.width()).filter(|&x| img.pixel(x, y)[0] > 0.5).collect()
}

#[test]
fn test_zero_blur_is_identity() {
    let prims = ReferencePrimitives::new();
    let input = pattern(23, 11);
    let stage = GaussianBlurStage::new(0.0).unwrap();

    let tex = prims.upload(&input).unwrap();
    let out = prims.download(&stage.process(&prims, &tex).unwrap()).unwrap();
    assert_eq!(out, input);
}

#[test]
fn test_blur_preserves_flat_image() {
    let prims = ReferencePrimitives::new();
    let input = HostImage::from_fn(9, 9, PixelFormat::Rgba, |_, _, ch| 0.25 * (ch + 1) as f32);
    let stage = GaussianBlurStage::new(2.5).unwrap();

    let tex = prims.upload(&input).unwrap();
    let out = prims.download(&stage.process(&prims, &tex).unwrap()).unwrap();
    for (a, b) in out.data().iter().zip(input.data()) {
        assert!((a - b).abs() < 1e-5, "{a} vs {b}");
    }
}

#[test]
fn test_output_is_binary() {
    let mut det = detector(EdgeParams { threshold: 0.1, ..Default::default() });
    let out = det.detect(&pattern(48, 32)).unwrap();
    assert_eq!(out.format(), PixelFormat::Luminance);
    assert!(out.data().iter().all(|&v| v == 0.0 || v == 1.0));
    assert!(edge_count(&out) > 0);
}

#[test]
fn test_threshold_monotonic() {
    let input = pattern(40, 40);
    let mut det = detector(EdgeParams::default());
    let mut previous = usize::MAX;
    for i in 0..=10 {
        det.set_threshold(i as f32 / 10.0).unwrap();
        let count = edge_count(&det.detect(&input).unwrap());
        assert!(count <= previous, "threshold {} gave {count} > {previous}", i as f32 / 10.0);
        previous = count;
    }
}

#[test]
fn test_vertical_step_gives_thin_line() {
    let step = 16;
    let mut det = detector(EdgeParams { threshold: 0.5, blur_size: 1.0, ..Default::default() });
    let out = det.detect(&vertical_step(32, 12, step)).unwrap();

    for y in 0..out.height() {
        let cols = edge_columns(&out, y);
        assert!(!cols.is_empty() && cols.len() <= 2, "row {y}: {cols:?}");
        assert!(cols.iter().all(|&x| x == step - 1 || x == step), "row {y}: {cols:?}");
    }
}

#[test]
fn test_suppression_thins_soft_ramp() {
    let (width, height, step) = (48, 8, 24);
    let input = vertical_step(width, height, step);
    let threshold = 0.05;

    // Without suppression, the blurred ramp clears the threshold over many columns.
    let prims = ReferencePrimitives::new();
    let blur = GaussianBlurStage::new(3.0).unwrap();
    let blurred = prims.download(&blur.process(&prims, &prims.upload(&input).unwrap()).unwrap()).unwrap();
    let view = TexelView::new(blurred.data(), blurred.desc());
    let above = (0..width)
        .filter(|&x| LumaWindow::gather(&view, x, height / 2, 1.0, 1.0).magnitude_at(2, 2) >= threshold)
        .count();
    assert!(above >= 3, "only {above} columns above threshold");

    let mut det = detector(EdgeParams { blur_size: 3.0, threshold, ..Default::default() });
    let out = det.detect(&input).unwrap();
    for y in 0..height {
        let cols = edge_columns(&out, y);
        assert!(!cols.is_empty() && cols.len() <= 2, "row {y}: {cols:?}");
        assert!(cols.iter().all(|&x| x == step - 1 || x == step), "row {y}: {cols:?}");
    }
}

#[test]
fn test_tiny_blur_matches_no_blur() {
    let input = vertical_step(32, 8, 16);
    let sharp = detector(EdgeParams { blur_size: 0.0, ..Default::default() }).detect(&input).unwrap();
    let tiny = detector(EdgeParams { blur_size: 1e-30, ..Default::default() }).detect(&input).unwrap();
    assert_eq!(edge_count(&sharp), 16);
    assert_eq!(tiny, sharp);
}

#[test]
fn test_resolution_invariance() {
    let mut det = detector(EdgeParams::default());
    let small = det.detect(&vertical_step(32, 8, 16)).unwrap();
    let large = det.detect(&vertical_step(64, 16, 32)).unwrap();

    let small_cols = edge_columns(&small, 4);
    let mut large_cols: Vec<u32> = edge_columns(&large, 8).iter().map(|x| x / 2).collect();
    large_cols.dedup();

    assert!(!small_cols.is_empty());
    assert!(small_cols.iter().all(|x| (15..=16).contains(x)));
    assert!(large_cols.iter().all(|x| (15..=16).contains(x)));
}

#[test]
fn test_explicit_factors_matching_size() {
    let input = pattern(30, 20);
    let tracked = detector(EdgeParams::default()).detect(&input).unwrap();
    let explicit = detector(EdgeParams {
        image_width_factor: Some(30.0),
        image_height_factor: Some(20.0),
        ..Default::default()
    })
    .detect(&input)
    .unwrap();
    assert_eq!(tracked, explicit);
}

#[test]
fn test_minimal_sizes() {
    for (w, h) in [(1, 1), (2, 2), (1, 5), (3, 1)] {
        for params in [
            EdgeParams::default(),
            EdgeParams { blur_size: 4.0, threshold: 0.0, ..Default::default() },
            EdgeParams { image_width_factor: Some(0.5), image_height_factor: Some(3.0), ..Default::default() },
            EdgeParams { hysteresis: Some(Hysteresis::new(0.1, 4)), ..Default::default() },
        ] {
            let out = detector(params).detect(&pattern(w, h)).unwrap();
            assert_eq!((out.width(), out.height()), (w, h));
            assert!(out.data().iter().all(|v| v.is_finite()));
        }
    }
}

#[test]
fn test_solid_image() {
    let solid = HostImage::from_fn(16, 16, PixelFormat::Rgba, |_, _, _| 0.6);
    let mut det = detector(EdgeParams::default());

    for t in [1.0, 0.5, 0.01] {
        det.set_threshold(t).unwrap();
        assert_eq!(edge_count(&det.detect(&solid).unwrap()), 0, "threshold {t}");
    }

    // `>=` against a zero threshold marks everything
    det.set_threshold(0.0).unwrap();
    assert_eq!(edge_count(&det.detect(&solid).unwrap()), 16 * 16);
}

#[test]
fn test_invalid_threshold_keeps_previous() {
    let input = pattern(24, 24);
    let mut det = detector(EdgeParams::default());
    det.set_threshold(0.2).unwrap();
    let before = det.detect(&input).unwrap();

    let err = det.set_threshold(1.5).unwrap_err();
    assert!(matches!(err, EdgeError::InvalidParameter(_)));
    assert_eq!(det.params().threshold, 0.2);
    assert_eq!(det.detect(&input).unwrap(), before);
}

#[test]
fn test_invalid_parameter_kinds() {
    let mut det = detector(EdgeParams::default());
    assert!(matches!(det.set_blur_size(-0.5), Err(EdgeError::InvalidParameter(_))));
    assert!(matches!(
        det.set_parameters(EdgeParams { image_width_factor: Some(0.0), ..Default::default() }),
        Err(EdgeError::InvalidParameter(_))
    ));
    assert!(matches!(
        det.set_parameters(EdgeParams { image_height_factor: Some(-2.0), ..Default::default() }),
        Err(EdgeError::InvalidParameter(_))
    ));
    assert_eq!(det.params(), &EdgeParams::default());
}

#[test]
fn test_weak_edges_promoted_within_passes() {
    let prims = ReferencePrimitives::new();
    let classes = HostImage::from_f32(vec![1.0, 0.5, 0.5, 0.5, 0.0, 0.5], 6, 1, PixelFormat::Luminance).unwrap();
    let stage = WeakEdgeStage::new(2, EdgePolarity::Light, PixelFormat::Luminance).unwrap();

    let tex = prims.upload(&classes).unwrap();
    let out = prims.download(&stage.process(&prims, &tex).unwrap()).unwrap();
    assert_eq!(out.data(), &[1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
}

#[test]
fn test_hysteresis_keeps_strong_edges() {
    let input = pattern(40, 30);
    let plain = detector(EdgeParams { threshold: 0.3, ..Default::default() }).detect(&input).unwrap();
    let linked = detector(EdgeParams {
        threshold: 0.3,
        hysteresis: Some(Hysteresis::new(0.1, 3)),
        ..Default::default()
    })
    .detect(&input)
    .unwrap();

    assert!(linked.data().iter().all(|&v| v == 0.0 || v == 1.0));
    for (a, b) in plain.data().iter().zip(linked.data()) {
        if *a == 1.0 {
            assert_eq!(*b, 1.0);
        }
    }
    assert!(edge_count(&linked) >= edge_count(&plain));
}

#[test]
fn test_dark_polarity_inverts() {
    let input = pattern(32, 24);
    let light = detector(EdgeParams { threshold: 0.2, ..Default::default() }).detect(&input).unwrap();
    let dark = detector(EdgeParams {
        threshold: 0.2,
        polarity: EdgePolarity::Dark,
        ..Default::default()
    })
    .detect(&input)
    .unwrap();

    for (l, d) in light.data().iter().zip(dark.data()) {
        assert_eq!(*d, 1.0 - *l);
    }
}

#[test]
fn test_rgba_output_equal_channels() {
    let input = pattern(20, 20);
    let luma = detector(EdgeParams { threshold: 0.2, ..Default::default() }).detect(&input).unwrap();
    let rgba = detector(EdgeParams {
        threshold: 0.2,
        output_format: PixelFormat::Rgba,
        ..Default::default()
    })
    .detect(&input)
    .unwrap();

    assert_eq!(rgba.format(), PixelFormat::Rgba);
    for y in 0..20 {
        for x in 0..20 {
            let v = luma.pixel(x, y)[0];
            assert_eq!(rgba.pixel(x, y), &[v, v, v, 1.0]);
        }
    }
}

#[test]
fn test_empty_input_is_upstream_failure() {
    let mut det = detector(EdgeParams::default());
    let empty = HostImage::from_f32(Vec::new(), 0, 10, PixelFormat::Rgba).unwrap();
    assert!(matches!(det.detect(&empty), Err(EdgeError::UpstreamFailure(_))));
}

#[test]
fn test_allocation_failure_is_resource_exhausted() {
    let prims = ReferencePrimitives::with_limits(GpuLimits {
        max_texture_dim: 16384,
        max_buffer_bytes: u64::MAX,
        available_memory: 1024,
    });
    let mut runner = PipelineRunner::new(prims, EdgePipeline::new());
    let result = runner.process_frame(&pattern(64, 64));
    assert!(matches!(result, Err(EdgeError::ResourceExhausted(_))));
    assert_eq!(runner.frames_processed(), 0);
}

#[test]
fn test_pipeline_output_desc() {
    let pipeline = EdgePipeline::new();
    let desc = pipeline.output_desc(pattern(7, 3).desc());
    assert_eq!((desc.width, desc.height), (7, 3));
}

#[cfg(feature = "wgpu")]
#[test]
fn test_wgpu_matches_reference() {
    use vfx_edge::WgpuPrimitives;

    if !WgpuPrimitives::is_available() {
        println!("no GPU adapter, skipping");
        return;
    }

    let input = pattern(67, 45);
    for params in [
        EdgeParams { threshold: 0.2, ..Default::default() },
        EdgeParams { blur_size: 0.0, threshold: 0.4, output_format: PixelFormat::Rgba, ..Default::default() },
        EdgeParams {
            threshold: 0.3,
            hysteresis: Some(Hysteresis::new(0.1, 2)),
            polarity: EdgePolarity::Dark,
            ..Default::default()
        },
    ] {
        let cpu = detector(params.clone()).detect(&input).unwrap();
        let gpu = EdgeDetector::with_params(Backend::Wgpu, params).unwrap().detect(&input).unwrap();
        assert_eq!(cpu.desc(), gpu.desc());

        // Rounding differs slightly near the threshold
        let mismatched = cpu.data().iter().zip(gpu.data()).filter(|(a, b)| (*a - *b).abs() > 1e-4).count();
        assert!(mismatched * 50 <= cpu.data().len(), "{mismatched} texels differ");
    }
}
