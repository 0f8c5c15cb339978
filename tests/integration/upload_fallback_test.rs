//! Optimize-and-store tests against a real directory

use super::test_harness::*;
use std::path::Path;
use std::sync::Arc;
use storefront_images::config::Config;
use storefront_images::error::AppError;
use storefront_images::upload::{upload_with_fallback, DirectoryUploader};

fn config_for(dir: &Path, extra: &str) -> Config {
    let yaml = format!(
        "upload:\n  output_dir: \"{}\"\n{}",
        dir.display(),
        extra
    );
    let config = Config::from_yaml_with_env(&yaml).unwrap();
    config.validate().unwrap();
    config
}

#[tokio::test]
async fn test_optimized_files_written_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), "policy:\n  max_width: 300\n  max_height: 300\n");
    let uploader = DirectoryUploader::new(&config.upload.output_dir);
    let optimizer = config.optimizer().unwrap();

    let sources = vec![
        png_source(900, 600, "front.png"),
        jpeg_source(200, 100, "back.jpg"),
        png_source(900, 600, "front.png"),
    ];

    let outcome = upload_with_fallback(&optimizer, &uploader, "sku-1001", &sources, true)
        .await
        .unwrap();
    assert!(outcome.optimized);

    let product_dir = dir.path().join("sku-1001");
    let expected = ["000-front.jpeg", "001-back.jpeg", "002-front.jpeg"];
    for (location, name) in outcome.locations.iter().zip(expected) {
        assert_eq!(location, &product_dir.join(name).display().to_string());
    }

    let first = std::fs::read(product_dir.join("000-front.jpeg")).unwrap();
    assert_eq!(decoded_dimensions(&first), (300, 200));
    let second = std::fs::read(product_dir.join("001-back.jpeg")).unwrap();
    assert_eq!(decoded_dimensions(&second), (200, 100));
}

#[tokio::test]
async fn test_failed_optimization_stores_originals() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), "");
    let uploader = DirectoryUploader::new(&config.upload.output_dir);
    let optimizer = config.optimizer().unwrap();

    let good = png_source(40, 40, "good.png");
    let bad = garbage_source("bad.png");
    let sources = vec![good.clone(), bad.clone()];

    let outcome = upload_with_fallback(
        &optimizer,
        &uploader,
        "category-3",
        &sources,
        config.upload.fallback_to_original,
    )
    .await
    .unwrap();

    assert!(!outcome.optimized);
    let category_dir = dir.path().join("category-3");
    assert_eq!(
        std::fs::read(category_dir.join("000-good.png")).unwrap(),
        good.data.to_vec()
    );
    assert_eq!(
        std::fs::read(category_dir.join("001-bad.png")).unwrap(),
        bad.data.to_vec()
    );
}

#[tokio::test]
async fn test_disabled_fallback_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), "");
    let uploader = DirectoryUploader::new(dir.path());
    let optimizer = config.optimizer().unwrap();

    let err = upload_with_fallback(
        &optimizer,
        &uploader,
        "sku-2",
        &[garbage_source("x.png")],
        false,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::Optimize(_)));
    assert!(!dir.path().join("sku-2").exists());
}

#[tokio::test]
async fn test_source_limits_trigger_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), "limits:\n  max_source_pixels: 10000\n");
    let uploader = Arc::new(DirectoryUploader::new(dir.path()));
    let optimizer = config.optimizer().unwrap();

    let sources = vec![png_source(200, 200, "huge.png")];
    let outcome = upload_with_fallback(&optimizer, uploader.as_ref(), "sku-3", &sources, true)
        .await
        .unwrap();

    assert!(!outcome.optimized);
    assert!(outcome
        .fallback_reason
        .unwrap()
        .contains("exceed limit"));
}
