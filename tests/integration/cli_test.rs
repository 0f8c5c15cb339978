//! Command line end-to-end tests

use super::test_harness::*;
use image::ImageFormat;
use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_storefront-images"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run storefront-images")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn test_cli_optimizes_into_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(
        dir.path(),
        "packshot.png",
        &encode(gradient(640, 480), ImageFormat::Png),
    );
    let out_dir = dir.path().join("out");

    let output = run(&[
        input.to_str().unwrap(),
        "--output",
        out_dir.to_str().unwrap(),
        "--parent",
        "sku-77",
        "--options",
        "w:320,h:320,f:webp",
        "--json",
    ]);
    assert!(output.status.success(), "{:?}", output);

    let json = stdout_json(&output);
    assert_eq!(json["optimized"], true);
    assert_eq!(json["summary"]["images"], 1);
    assert_eq!(json["summary"]["resized"], 1);

    let stored = out_dir.join("sku-77").join("000-packshot.webp");
    assert_eq!(json["locations"][0], stored.display().to_string());
    let data = std::fs::read(stored).unwrap();
    assert_eq!(decoded_dimensions(&data), (320, 240));
}

#[test]
fn test_cli_falls_back_for_corrupt_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "corrupt.jpg", b"not a jpeg");
    let out_dir = dir.path().join("out");

    let output = run(&[
        input.to_str().unwrap(),
        "--output",
        out_dir.to_str().unwrap(),
        "--json",
    ]);
    assert!(output.status.success(), "{:?}", output);

    let json = stdout_json(&output);
    assert_eq!(json["optimized"], false);
    assert!(json["fallback_reason"]
        .as_str()
        .unwrap()
        .contains("corrupt.jpg"));

    let stored = out_dir.join("default").join("000-corrupt.jpg");
    assert_eq!(std::fs::read(stored).unwrap(), b"not a jpeg");
}

#[test]
fn test_cli_no_fallback_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "corrupt.png", b"\x89PNG but truncated");
    let out_dir = dir.path().join("out");

    let output = run(&[
        input.to_str().unwrap(),
        "--output",
        out_dir.to_str().unwrap(),
        "--no-fallback",
    ]);

    assert!(!output.status.success());
    assert!(!out_dir.join("default").exists());
}

#[test]
fn test_cli_reads_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("configured");
    let config = write_file(
        dir.path(),
        "storefront.yaml",
        format!(
            "policy:\n  max_width: 100\n  max_height: 100\n  quality: 0.6\nupload:\n  output_dir: \"{}\"\n",
            out_dir.display()
        )
        .as_bytes(),
    );
    let input = write_file(
        dir.path(),
        "thumb.jpg",
        &encode(gradient(400, 200), ImageFormat::Jpeg),
    );

    let output = run(&[
        input.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "--parent",
        "cat-5",
    ]);
    assert!(output.status.success(), "{:?}", output);

    let stored = out_dir.join("cat-5").join("000-thumb.jpeg");
    let data = std::fs::read(stored).unwrap();
    assert_eq!(decoded_dimensions(&data), (100, 50));
}

#[test]
fn test_cli_rejects_invalid_quality() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(
        dir.path(),
        "a.png",
        &encode(gradient(8, 8), ImageFormat::Png),
    );

    let output = run(&[input.to_str().unwrap(), "--quality", "150"]);
    assert!(!output.status.success());
}

#[test]
fn test_cli_missing_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.png");

    let output = run(&[
        missing.to_str().unwrap(),
        "--output",
        dir.path().to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing.png"), "{}", stderr);
}
