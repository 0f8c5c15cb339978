//! Batch optimization end-to-end tests
//!
//! Real decode, resize and encode through the public async entry points.

use super::test_harness::*;
use storefront_images::image_optimizer::{
    optimize_image, optimize_images, BatchError, CancelHandle, Dimensions, ErrorKind,
    OptimizationPolicy, Optimizer, OutputFormat, PolicyOverrides,
};

#[tokio::test]
async fn test_large_photo_with_defaults() {
    let source = jpeg_source(4000, 3000, "hero.jpg");

    let out = optimize_image(&source, None).await.unwrap();

    assert_eq!(out.dimensions, Dimensions::new(1920, 1440));
    assert_eq!(decoded_dimensions(&out.data), (1920, 1440));
    assert_eq!(out.file_name, "hero.jpeg");
    assert_eq!(out.media_type, "image/jpeg");
    assert!(out.len() < source.len());
}

#[tokio::test]
async fn test_small_png_is_converted_not_resized() {
    let source = png_source(800, 600, "swatch.png");

    let out = optimize_image(&source, None).await.unwrap();

    assert_eq!(decoded_dimensions(&out.data), (800, 600));
    assert_eq!(out.file_name, "swatch.jpeg");
    assert_eq!(
        image::guess_format(&out.data).unwrap(),
        image::ImageFormat::Jpeg
    );
    assert!(!out.metrics.was_resized());
}

#[tokio::test]
async fn test_mixed_source_formats_in_one_batch() {
    let sources = vec![
        jpeg_source(600, 300, "a.jpg"),
        png_source(300, 600, "b.png"),
        gif_source(120, 80, "c.gif"),
        webp_source(500, 500, "d.webp"),
    ];
    let overrides: PolicyOverrides = "w:200,h:200".parse().unwrap();

    let out = optimize_images(&sources, Some(overrides)).await.unwrap();

    let names: Vec<_> = out.iter().map(|o| o.file_name.as_str()).collect();
    assert_eq!(names, vec!["a.jpeg", "b.jpeg", "c.jpeg", "d.jpeg"]);

    let dims: Vec<_> = out.iter().map(|o| decoded_dimensions(&o.data)).collect();
    assert_eq!(dims, vec![(200, 100), (100, 200), (120, 80), (200, 200)]);
}

#[tokio::test]
async fn test_webp_batch_output() {
    let sources = vec![png_source(400, 100, "banner.png"), jpeg_source(90, 90, "x.jpg")];
    let overrides: PolicyOverrides = "w:200,h:200,f:webp,q:0.7".parse().unwrap();

    let out = optimize_images(&sources, Some(overrides)).await.unwrap();

    for image in &out {
        assert_eq!(image.format, OutputFormat::Webp);
        assert_eq!(&image.data[0..4], b"RIFF");
        assert_eq!(&image.data[8..12], b"WEBP");
    }
    assert_eq!(out[0].file_name, "banner.webp");
    assert_eq!(decoded_dimensions(&out[0].data), (200, 50));
    assert_eq!(decoded_dimensions(&out[1].data), (90, 90));
}

#[tokio::test]
async fn test_batch_fails_as_a_whole() {
    let sources = vec![
        png_source(64, 64, "ok-1.png"),
        png_source(64, 64, "ok-2.png"),
        garbage_source("corrupt.png"),
        png_source(64, 64, "ok-3.png"),
    ];

    let err = optimize_images(&sources, None).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Decode);
    match err {
        BatchError::Item {
            index,
            file_name,
            failed,
            ..
        } => {
            assert_eq!(index, 2);
            assert_eq!(file_name, "corrupt.png");
            assert_eq!(failed, 1);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_settled_batch_keeps_good_results() {
    let optimizer = Optimizer::new(OptimizationPolicy::default()).unwrap();
    let sources = vec![garbage_source("bad.png"), png_source(10, 20, "good.png")];

    let results = optimizer.optimize_each(&sources).await;

    assert_eq!(results[0].as_ref().unwrap_err().kind(), ErrorKind::Decode);
    assert_eq!(results[1].as_ref().unwrap().file_name, "good.jpeg");
}

#[tokio::test]
async fn test_quality_controls_size_across_batch() {
    let sources = vec![
        png_source(320, 240, "a.png"),
        jpeg_source(300, 300, "b.jpg"),
        webp_source(256, 128, "c.webp"),
    ];
    let low: PolicyOverrides = "q:0.5".parse().unwrap();
    let high: PolicyOverrides = "q:0.95".parse().unwrap();

    let low = optimize_images(&sources, Some(low)).await.unwrap();
    let high = optimize_images(&sources, Some(high)).await.unwrap();

    let low_total: usize = low.iter().map(|o| o.len()).sum();
    let high_total: usize = high.iter().map(|o| o.len()).sum();
    assert!(low_total < high_total, "{} >= {}", low_total, high_total);
}

#[tokio::test]
async fn test_defaults_are_idempotent() {
    let source = png_source(500, 400, "p.png");
    let explicit: PolicyOverrides = "w:1920,h:1920,q:0.85,f:jpeg".parse().unwrap();

    let first = optimize_image(&source, None).await.unwrap();
    let second = optimize_image(&source, Some(explicit)).await.unwrap();

    assert_eq!(first.data, second.data);
    assert_eq!(first.file_name, second.file_name);
}

#[tokio::test]
async fn test_cancelled_batch_reports_cancellation() {
    let (handle, signal) = CancelHandle::new();
    let optimizer = Optimizer::new(OptimizationPolicy::default())
        .unwrap()
        .with_cancellation(signal);
    handle.cancel();

    let err = optimizer
        .optimize_all(&[png_source(32, 32, "a.png")])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(err.index(), Some(0));
}
