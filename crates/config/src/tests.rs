use crate::{AppConfig, ConfigError, RedisConfig};
use figment::{
    Figment,
    providers::{Format, Toml},
};
use secrecy::{ExposeSecret, Secret};

#[test]
fn test_defaults_without_sources() {
    let config = AppConfig::from_figment(Figment::new()).unwrap();

    assert_eq!(config.service.name, "unknown");
    assert_eq!(config.service.environment, "dev");
    assert_eq!(config.redis.host, "127.0.0.1");
    assert_eq!(config.redis.port, 6379);
    assert_eq!(config.redis.database, 0);
    assert!(config.redis.password.is_none());
    assert_eq!(config.middleware.ttl_secs, 3600);
    assert_eq!(config.telemetry.log_level, "info");
    assert!(!config.is_production());
}

#[test]
fn test_toml_overrides_and_keeps_defaults() {
    let figment = Figment::new().merge(Toml::string(
        r#"
        [service]
        name = "billing"
        environment = "prod"

        [redis]
        host = "cache.internal"
        password = "hunter2"

        [middleware]
        ttl_secs = 120
        "#,
    ));
    let config = AppConfig::from_figment(figment).unwrap();

    assert_eq!(config.service.name, "billing");
    assert!(config.is_production());
    assert_eq!(config.redis.host, "cache.internal");
    assert_eq!(config.redis.port, 6379);
    assert_eq!(
        config
            .redis
            .password
            .as_ref()
            .map(|p| p.expose_secret().as_str()),
        Some("hunter2")
    );
    assert_eq!(config.middleware.ttl_secs, 120);
    assert_eq!(config.middleware.max_body_bytes, 1024 * 1024);
}

#[test]
fn test_invalid_value_is_load_error() {
    let figment = Figment::new().merge(Toml::string("[redis]\nport = \"not a port\""));
    assert!(AppConfig::from_figment(figment).is_err());
}

#[test]
fn test_zero_ttl_is_invalid() {
    let figment = Figment::new().merge(Toml::string("[middleware]\nttl_secs = 0"));
    let result = AppConfig::from_figment(figment);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_empty_service_name_is_invalid() {
    let figment = Figment::new().merge(Toml::string("[service]\nname = \"\""));
    let result = AppConfig::from_figment(figment);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_secret_redaction() {
    let secret = Secret::new("my_secret_password".to_string());
    let debug_output = format!("{:?}", secret);
    assert!(debug_output.contains("Secret([REDACTED"));
    assert!(!debug_output.contains("my_secret_password"));
}

#[test]
fn test_config_struct_redaction() {
    let config = RedisConfig {
        password: Some(Secret::new("p4ssw0rd".to_string())),
        ..Default::default()
    };
    let debug_output = format!("{:?}", config);
    assert!(!debug_output.contains("p4ssw0rd"));
    assert!(debug_output.contains("Secret([REDACTED"));
}
