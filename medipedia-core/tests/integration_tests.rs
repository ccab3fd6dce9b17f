//! Integration tests for medipedia-core infrastructure

use medipedia_core::{
    config_error, init_logging, validation_error, with_timeout, ErrorContext, FailureReason,
    LogFormat, LoggingConfig, MedipediaConfig, MedipediaError,
};
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test]
async fn test_error_handling() {
    let error = validation_error!("query must not be empty", "query", "test_component");

    match &error {
        MedipediaError::InvalidRequest {
            message,
            field,
            context,
        } => {
            assert_eq!(message, "query must not be empty");
            assert_eq!(field.as_deref(), Some("query"));
            assert_eq!(context.component, "test_component");
            assert!(!context.error_id.is_empty());
        }
        _ => panic!("Expected InvalidRequest error"),
    }

    // Should not panic
    error.log();

    let network_error = MedipediaError::Network {
        message: "Connection refused".to_string(),
        source: None,
        context: ErrorContext::new("test"),
    };
    assert!(network_error.is_recoverable());
    assert_eq!(network_error.failure_reason(), FailureReason::NetworkError);

    let config_error = config_error!("Invalid config", "test");
    assert!(!config_error.is_recoverable());
    assert_eq!(
        config_error.context().unwrap().recovery_suggestions.len(),
        2
    );
}

#[tokio::test]
async fn test_logging_initialization() {
    let config = LoggingConfig {
        level: "debug".to_string(),
        format: LogFormat::Compact,
        include_location: false,
        include_thread: false,
        log_to_file: false,
        log_file_path: None,
        enable_performance_monitoring: false,
        filter_directives: vec!["medipedia_core=debug".to_string()],
    };

    assert!(init_logging(&config).is_ok());
    // A second global subscriber is refused instead of panicking
    assert!(init_logging(&config).is_err());
}

#[tokio::test]
async fn test_timeout_mechanism() {
    let result = with_timeout(
        async {
            sleep(Duration::from_millis(100)).await;
            "done"
        },
        500,
        "quick",
    )
    .await;
    assert_eq!(result.unwrap(), "done");

    let result = with_timeout(sleep(Duration::from_millis(500)), 50, "slow").await;
    let error = result.unwrap_err();
    assert_eq!(error.failure_reason(), FailureReason::Timeout);
}

#[test]
fn test_config_file_missing() {
    let result = MedipediaConfig::from_file("/definitely/not/here/medipedia.toml");
    assert!(matches!(result, Err(MedipediaError::Config { .. })));
}

#[tokio::test]
async fn measured_future_returns_its_output() {
    let value = medipedia_core::performance::measure_async("answer", async { 42 }).await;
    assert_eq!(value, 42);
}

#[test]
fn file_logging_without_path_is_rejected() {
    let config = LoggingConfig {
        log_to_file: true,
        log_file_path: None,
        ..LoggingConfig::default()
    };
    assert!(init_logging(&config).is_err());
}
