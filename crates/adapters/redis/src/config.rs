//! Redis 配置模块
//!
//! 主机、端口、数据库索引和凭据，未设置时使用默认值

use std::time::Duration;

/// Redis 配置
#[derive(Clone)]
pub struct RedisConfig {
    /// 主机
    pub host: String,
    /// 端口
    pub port: u16,
    /// 数据库索引
    pub database: u8,
    /// 用户名（ACL）
    pub username: Option<String>,
    /// 密码
    pub password: Option<String>,
    /// 连接超时
    pub connection_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            database: 0,
            username: None,
            password: None,
            connection_timeout: Duration::from_secs(10),
        }
    }
}

impl std::fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("connection_timeout", &self.connection_timeout)
            .finish()
    }
}

impl RedisConfig {
    /// 创建新的配置
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// 设置密码
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// 设置用户名
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// 设置数据库索引
    pub fn with_database(mut self, database: u8) -> Self {
        self.database = database;
        self
    }

    /// 设置连接超时
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// 连接 URL（包含凭据，不要写入日志）
    pub fn url(&self) -> String {
        let credentials = match (&self.username, &self.password) {
            (Some(user), Some(password)) => format!(
                "{}:{}@",
                urlencoding::encode(user),
                urlencoding::encode(password)
            ),
            (None, Some(password)) => format!(":{}@", urlencoding::encode(password)),
            (Some(user), None) => format!("{}@", urlencoding::encode(user)),
            (None, None) => String::new(),
        };
        format!(
            "redis://{}{}:{}/{}",
            credentials, self.host, self.port, self.database
        )
    }

    /// 可安全记录日志的地址
    pub fn redacted_url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.database)
    }
}
