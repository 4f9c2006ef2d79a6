//! Configuration loading and global subscriber installation

use cellular_call_core::config::CellularCallConfig;
use cellular_call_core::logging::{setup_logging, LoggingConfig};
use cellular_call_core::types::DomainPreferenceMode;
use cellular_call_core::CallError;
use serial_test::serial;
use tracing::Level;

#[test]
#[serial]
fn test_subscriber_installs_once() {
    let config = LoggingConfig::new(Level::DEBUG, "cellular-call-test").with_json();
    assert!(setup_logging(&config).is_ok());

    let again = setup_logging(&LoggingConfig::default());
    assert!(matches!(again, Err(CallError::Config { .. })));
}

#[test]
#[serial]
fn test_config_from_file() {
    let path = std::env::temp_dir().join(format!("cellular-call-{}.toml", std::process::id()));
    std::fs::write(
        &path,
        r#"
slot_count = 2
max_connections = 4
domain_preference_mode = "cs_voice_only"

[logging]
level = "debug"
json = true
"#,
    )
    .expect("write config");

    let config = CellularCallConfig::from_file(&path).expect("valid config");
    let _ = std::fs::remove_file(&path);

    assert_eq!(config.slot_count, 2);
    assert_eq!(config.max_connections, 4);
    assert_eq!(config.domain_preference_mode, DomainPreferenceMode::CsVoiceOnly);
    assert!(config.logging.json);
    assert_eq!(config.logging.app_name, "cellular-call");
    assert!(config.ims_switch_on);
}

#[test]
fn test_config_file_errors() {
    assert!(matches!(
        CellularCallConfig::from_file("/nonexistent/cellular-call.toml"),
        Err(CallError::Config { .. })
    ));
    assert!(matches!(
        CellularCallConfig::from_toml_str("slot_count = 3"),
        Err(CallError::Config { .. })
    ));
    assert!(matches!(
        CellularCallConfig::from_toml_str("slot_count = \"two\""),
        Err(CallError::Config { .. })
    ));
}
