use std::io::Write;
use std::path::PathBuf;

use crate::config::models::{AppConfig, LogFormat};

#[test]
fn test_default_config() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());

    assert_eq!(config.database.max_connections, 10);
    assert_eq!(config.repository.dir_mode, 0o2775);
    assert_eq!(config.repository.file_mode, 0o664);
    assert!(config.notification.webhook_url.is_none());
    assert_eq!(config.observability.log_format, LogFormat::Pretty);
}

#[test]
fn test_config_from_toml() {
    let toml_content = r#"
[database]
url = "sqlite:/var/lib/datasync/test.db"
max_connections = 15
min_connections = 2
connection_timeout_seconds = 30
idle_timeout_seconds = 600

[api]
bind_address = "127.0.0.1:9090"
cors_enabled = false
cors_origins = []
request_timeout_seconds = 30
max_request_size_mb = 50

[repository]
root = "/srv/repository"
persistent_root = "/srv/persistent"
group_id = 1500
dir_mode = 0o2770
file_mode = 0o660

[notification]
enabled = true
return_address = "lims@example.org"
logs_to = ["ops@example.org"]
keys_to = ["sysadmin@example.org"]
webhook_url = "https://hooks.example.org/datasync"
timeout_seconds = 5

[observability]
log_level = "debug"
log_format = "json"
log_directory = "/var/log/datasync"
metrics_enabled = true
metrics_endpoint = "/metrics"
"#;

    let config = AppConfig::from_toml(toml_content).unwrap();

    assert_eq!(config.database.file_path(), Some("/var/lib/datasync/test.db"));
    assert_eq!(config.api.bind_address, "127.0.0.1:9090");
    assert_eq!(config.api.max_request_size_bytes(), 50 * 1024 * 1024);
    assert_eq!(config.repository.group_id, Some(1500));
    assert_eq!(config.repository.dir_mode, 0o2770);
    assert_eq!(
        config.repository.persistent_root(),
        PathBuf::from("/srv/persistent")
    );
    assert_eq!(config.notification.keys_to, vec!["sysadmin@example.org"]);
    assert_eq!(config.observability.log_format, LogFormat::Json);
    assert_eq!(
        config.observability.log_directory,
        Some(PathBuf::from("/var/log/datasync"))
    );
}

#[test]
fn test_missing_sections_fall_back_to_defaults() {
    let config = AppConfig::from_toml(
        r#"
[repository]
root = "/srv/repository"
dir_mode = 0o2775
file_mode = 0o664
"#,
    )
    .unwrap();

    assert_eq!(config.api.bind_address, "0.0.0.0:8080");
    assert_eq!(
        config.repository.persistent_root(),
        PathBuf::from("/srv/repository")
    );
}

#[test]
fn test_config_to_toml_round_trip() {
    let config = AppConfig::default();
    let toml_str = config.to_toml().unwrap();
    assert!(toml_str.contains("[repository]"));

    let parsed = AppConfig::from_toml(&toml_str).unwrap();
    assert_eq!(parsed.database.url, config.database.url);
    assert_eq!(parsed.repository.dir_mode, config.repository.dir_mode);
}

#[test]
fn test_validation_failures() {
    let mut config = AppConfig::default();
    config.database.url = "postgresql://localhost/datasync".to_string();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.observability.log_level = "verbose".to_string();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.notification.webhook_url = Some("ftp://example.org".to_string());
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.repository.dir_mode = 0o10000;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.api.bind_address = "localhost".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_legacy_numeric_log_level_accepted() {
    let mut config = AppConfig::default();
    config.observability.log_level = "30".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[api]
bind_address = "127.0.0.1:18080"
cors_enabled = true
cors_origins = ["*"]
request_timeout_seconds = 10
max_request_size_mb = 1
"#
    )
    .unwrap();

    let path = file.path().to_str().unwrap().to_string();
    let config = AppConfig::load(Some(&path)).unwrap();
    assert_eq!(config.api.bind_address, "127.0.0.1:18080");
    assert_eq!(config.database.url, "sqlite:data/datasync.db");
}

#[test]
fn test_load_missing_file_fails() {
    let err = AppConfig::load(Some("/nonexistent/datasync.toml")).unwrap_err();
    assert!(err.to_string().contains("配置文件不存在"));
}
