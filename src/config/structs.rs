use serde::{Deserialize, Serialize};

use crate::storage::backend::retry::RetryConfig;

/// 静态配置（从 TOML 加载，启动时使用）
///
/// - server: 监听地址、端口、worker 数量
/// - database: 存储连接与重试
/// - logging: 日志
/// - resolver: 解析端点与结果页路由、phantom 链接的退役方式
/// - links: token 生成
/// - plans: 套餐上限（服务端强制）
/// - api: 所有者 API 的访问令牌
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub links: LinksConfig,
    #[serde(default)]
    pub plans: PlansConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：LG，分隔符：__
    /// 示例：LG__SERVER__PORT=9999
    pub fn load_from(path: &str) -> Self {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("LG")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("plans.pro_owners"),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `memory://` 选择进程内存储；空字符串视为缺失凭据，解析器将拒绝所有 token
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    /// 单次消费事务的超时（毫秒）
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.retry_count,
            base_delay_ms: self.retry_base_delay_ms,
            max_delay_ms: self.retry_max_delay_ms,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 解析端点配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,
    #[serde(default = "default_blocked_page")]
    pub blocked_page: String,
    #[serde(default = "default_pending_page")]
    pub pending_page: String,
    /// true: phantom 链接消费后删除整行；false: 仅置 active=false
    #[serde(default)]
    pub delete_consumed_phantoms: bool,
    /// HEAD 请求不会导航，按预取处理
    #[serde(default = "default_true")]
    pub head_is_speculative: bool,
}

/// Token 生成配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    #[serde(default = "default_token_length")]
    pub token_length: usize,
    #[serde(default = "default_token_attempts")]
    pub token_attempts: u32,
}

/// 套餐配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlansConfig {
    #[serde(default = "default_free_max_clicks")]
    pub free_max_clicks: i64,
    #[serde(default = "default_free_max_clicks")]
    pub free_default_max_clicks: i64,
    #[serde(default)]
    pub pro_owners: Vec<String>,
}

/// 所有者 API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// 为空时所有者 API 不开放
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_owner_header")]
    pub owner_header: String,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_database_url() -> String {
    "links.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    50
}

fn default_retry_max_delay_ms() -> u64 {
    1000
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_route_prefix() -> String {
    "/l".to_string()
}

fn default_blocked_page() -> String {
    "/expired".to_string()
}

fn default_pending_page() -> String {
    "/not-yet-available".to_string()
}

fn default_true() -> bool {
    true
}

fn default_token_length() -> usize {
    10
}

fn default_token_attempts() -> u32 {
    3
}

fn default_free_max_clicks() -> i64 {
    3
}

fn default_owner_header() -> String {
    "X-Owner-Id".to_string()
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            route_prefix: default_route_prefix(),
            blocked_page: default_blocked_page(),
            pending_page: default_pending_page(),
            delete_consumed_phantoms: false,
            head_is_speculative: default_true(),
        }
    }
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            token_length: default_token_length(),
            token_attempts: default_token_attempts(),
        }
    }
}

impl Default for PlansConfig {
    fn default() -> Self {
        Self {
            free_max_clicks: default_free_max_clicks(),
            free_default_max_clicks: default_free_max_clicks(),
            pro_owners: Vec::new(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            owner_header: default_owner_header(),
        }
    }
}
