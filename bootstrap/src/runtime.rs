//! 服务运行时

use stash_config::{AppConfig, ConfigError};
use stash_telemetry::{PrometheusHandle, init_metrics, init_telemetry};
use tracing::{info, warn};

/// 服务运行时配置
pub struct RuntimeConfig {
    pub config_dir: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            config_dir: "config".to_string(),
        }
    }
}

/// 加载配置（先读取 `.env`）
pub fn load_config(runtime: &RuntimeConfig) -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    AppConfig::load(&runtime.config_dir)
}

/// 初始化服务运行时
///
/// `telemetry.metrics` 开启时安装 Prometheus recorder 并返回句柄，
/// 由宿主应用挂载到 `/metrics` 之类的路由；关闭时计数器不会被记录
pub fn init_runtime(config: &AppConfig) -> Option<PrometheusHandle> {
    init_telemetry(
        &config.telemetry.log_level,
        config.telemetry.json || config.is_production(),
    );

    let metrics = if config.telemetry.metrics {
        match init_metrics() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "Failed to install Prometheus recorder, metrics disabled");
                None
            }
        }
    } else {
        None
    };

    info!(
        service = %config.service.name,
        environment = %config.service.environment,
        metrics = metrics.is_some(),
        "Runtime initialized"
    );
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_from_missing_dir_uses_defaults() {
        let runtime = RuntimeConfig {
            config_dir: "/nonexistent/stash-config".to_string(),
        };
        let config = load_config(&runtime).unwrap();

        assert_eq!(config.middleware.ttl_secs, 3600);
        assert!(init_runtime(&config).is_none());
    }

    #[test]
    fn test_metrics_flag_installs_recorder() {
        let mut config = AppConfig::default();
        config.telemetry.metrics = true;

        let handle = init_runtime(&config).unwrap();
        metrics::counter!("stash_cache_hits_total", "service" => "billing").increment(1);
        assert!(handle.render().contains("stash_cache_hits_total"));
    }
}
