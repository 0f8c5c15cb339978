// Logging unit tests

use storefront_images::config::{LogFormat, LoggingConfig};
use storefront_images::logging::{env_filter, init_subscriber};

#[test]
fn test_env_filter_accepts_levels_and_directives() {
    for directive in ["trace", "debug", "info", "warn", "error"] {
        assert!(env_filter(directive).is_ok(), "{} rejected", directive);
    }
    assert!(env_filter("storefront_images=debug,info").is_ok());
}

#[test]
fn test_env_filter_rejects_garbage_without_rust_log() {
    // RUST_LOG takes precedence, so the fallback is only parsed when unset
    if std::env::var("RUST_LOG").is_ok() {
        return;
    }
    assert!(env_filter("storefront_images=loud").is_err());
}

/// Only one global subscriber can be installed per process
#[test]
fn test_second_initialization_fails() {
    let config = LoggingConfig {
        level: "debug".to_string(),
        format: LogFormat::Json,
    };

    let _ = init_subscriber(&config);
    tracing::info!(test = "logging", "Subscriber installed");

    assert!(init_subscriber(&LoggingConfig::default()).is_err());
}
