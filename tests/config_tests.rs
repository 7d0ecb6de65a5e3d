// Config loading and validation tests

use hostpulse::config::AppConfig;

const VALID_CONFIG: &str = r#"
[server]
port = 8081
host = "0.0.0.0"
server_id = "nas"
auth_token = "secret"

[publishing]
system_interval_ms = 1000
docker_interval_ms = 5000
services_interval_ms = 10000
keepalive_secs = 30
channel_capacity = 16

[monitoring]
top_process_count = 10
stats_log_interval_secs = 60
"#;

const MINIMAL_CONFIG: &str = r#"
[server]
port = 8081
host = "0.0.0.0"
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.server.port, 8081);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.resolved_server_id(), "nas");
    assert_eq!(config.server.token(), Some("secret"));
    assert_eq!(config.publishing.docker_interval_ms, 5000);
    assert_eq!(config.monitoring.top_process_count, 10);
}

#[test]
fn test_config_defaults_when_sections_omitted() {
    let config = AppConfig::load_from_str(MINIMAL_CONFIG).expect("minimal config");
    assert_eq!(config.publishing.system_interval_ms, 1000);
    assert_eq!(config.publishing.docker_interval_ms, 5000);
    assert_eq!(config.publishing.services_interval_ms, 10_000);
    assert_eq!(config.publishing.keepalive_secs, 30);
    assert_eq!(config.publishing.channel_capacity, 16);
    assert_eq!(config.monitoring.top_process_count, 10);
    assert_eq!(config.monitoring.stats_log_interval_secs, 60);
    assert!(config.server.token().is_none());
    assert!(!config.server.resolved_server_id().is_empty());
}

#[test]
fn test_config_empty_token_means_no_auth() {
    let cfg = MINIMAL_CONFIG.replace("host = \"0.0.0.0\"", "host = \"0.0.0.0\"\nauth_token = \"\"");
    let config = AppConfig::load_from_str(&cfg).expect("valid");
    assert!(config.server.token().is_none());
}

#[test]
fn test_config_validation_rejects_invalid_port() {
    let bad = VALID_CONFIG.replace("port = 8081", "port = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("server.port"));
}

#[test]
fn test_config_validation_rejects_empty_host() {
    let bad = VALID_CONFIG.replace("host = \"0.0.0.0\"", "host = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("server.host"));
}

#[test]
fn test_config_validation_rejects_zero_intervals() {
    for key in [
        "system_interval_ms",
        "docker_interval_ms",
        "services_interval_ms",
        "keepalive_secs",
        "channel_capacity",
        "stats_log_interval_secs",
    ] {
        let line = VALID_CONFIG
            .lines()
            .find(|l| l.starts_with(key))
            .expect("key present");
        let bad = VALID_CONFIG.replace(line, &format!("{key} = 0"));
        let err = AppConfig::load_from_str(&bad).unwrap_err();
        assert!(err.to_string().contains(key), "{key}: {err}");
    }
}

#[test]
fn test_config_validation_rejects_invalid_toml() {
    let err = AppConfig::load_from_str("not valid toml [[[").unwrap_err();
    assert!(!err.to_string().is_empty());
}

#[test]
fn test_config_load_from_file_via_env() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, VALID_CONFIG).unwrap();
    unsafe { std::env::set_var("CONFIG_FILE", path.to_str().unwrap()) };
    unsafe { std::env::set_var("AUTH_TOKEN", "from-env") };
    let result = AppConfig::load();
    unsafe { std::env::remove_var("CONFIG_FILE") };
    unsafe { std::env::remove_var("AUTH_TOKEN") };
    let config = result.expect("load from CONFIG_FILE");
    assert_eq!(config.server.port, 8081);
    assert_eq!(config.server.token(), Some("from-env"));
}
