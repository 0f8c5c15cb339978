// Configuration unit tests

use std::io::Write;
use storefront_images::config::*;
use storefront_images::image_optimizer::{
    ErrorKind, ImageError, OutputFormat, ResampleFilter, SourceImage,
};
use tempfile::NamedTempFile;

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| image::Rgb([x as u8, y as u8, 0]));
    let mut buffer = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, image::ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

#[test]
fn test_can_parse_complete_config_example() {
    let yaml = r#"
policy:
  max_width: 1920
  max_height: 1920
  quality: 0.85
  format: jpeg
  filter: lanczos3
batch:
  timeout_ms: 30000
  max_in_flight: 8
limits:
  max_source_file_size: 52428800
  max_source_pixels: 100000000
logging:
  level: info
  format: pretty
upload:
  output_dir: ./uploads
  fallback_to_original: true
"#;
    let config = Config::from_yaml_with_env(yaml).expect("Failed to parse config");

    assert_eq!(config.policy.format, OutputFormat::Jpeg);
    assert_eq!(config.policy.filter, ResampleFilter::Lanczos3);
    assert_eq!(config.batch.timeout_ms, Some(30000));
    assert_eq!(config.batch.max_in_flight, Some(8));
    assert_eq!(config.limits.max_source_file_size, 50 * 1024 * 1024);
    assert_eq!(config.limits.max_source_pixels, 100_000_000);
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert!(config.validate().is_ok());
}

#[test]
fn test_bicubic_filter_alias() {
    let config = Config::from_yaml_with_env("policy:\n  filter: bicubic\n").unwrap();
    assert_eq!(config.policy.filter, ResampleFilter::CatmullRom);
}

#[test]
fn test_can_substitute_env_var_in_quality() {
    std::env::set_var("STOREFRONT_UNIT_QUALITY", "0.6");
    let config = Config::from_yaml_with_env("policy:\n  quality: ${STOREFRONT_UNIT_QUALITY}\n")
        .expect("Failed to substitute env var");
    assert_eq!(config.policy.quality, 0.6);
    std::env::remove_var("STOREFRONT_UNIT_QUALITY");
}

#[test]
fn test_invalid_yaml_is_error() {
    assert!(Config::from_yaml_with_env("policy: [unclosed").is_err());
    assert!(Config::from_yaml_with_env("policy:\n  max_width: wide\n").is_err());
}

#[test]
fn test_config_file_with_invalid_values_loads_but_fails_validation() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(b"policy:\n  quality: 1.5\n")
        .unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.contains("quality"), "unexpected error: {}", err);
}

#[tokio::test]
async fn test_configured_limits_apply_to_optimizer() {
    let config =
        Config::from_yaml_with_env("limits:\n  max_source_pixels: 1000\n").unwrap();
    let optimizer = config.optimizer().unwrap();

    let source = SourceImage::new(png(50, 50), "image/png", "big.png");
    let err = optimizer.optimize(&source).await.unwrap_err();
    assert!(matches!(err, ImageError::ImageBombDetected { .. }));
    assert_eq!(err.kind(), ErrorKind::Decode);

    let source = SourceImage::new(png(20, 20), "image/png", "small.png");
    assert!(optimizer.optimize(&source).await.is_ok());
}

#[tokio::test]
async fn test_configured_policy_applies_to_optimizer() {
    let config = Config::from_yaml_with_env(
        "policy:\n  max_width: 32\n  max_height: 32\n  format: webp\n",
    )
    .unwrap();
    let optimizer = config.optimizer().unwrap();

    let source = SourceImage::new(png(64, 16), "image/png", "banner.png");
    let out = optimizer.optimize(&source).await.unwrap();
    assert_eq!(out.file_name, "banner.webp");
    assert_eq!((out.dimensions.width, out.dimensions.height), (32, 8));
}
