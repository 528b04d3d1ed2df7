use std::fmt;

#[derive(Debug, Clone)]
pub enum LinkgateError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    TransientStore(String),
    Conflict(String),
    NotFound(String),
    Validation { field: &'static str, message: String },
    TokenExhausted(String),
    PasswordHash(String),
    Serialization(String),
    FileOperation(String),
    DateParse(String),
    Unavailable(String),
}

impl LinkgateError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            LinkgateError::DatabaseConfig(_) => "E001",
            LinkgateError::DatabaseConnection(_) => "E002",
            LinkgateError::DatabaseOperation(_) => "E003",
            LinkgateError::TransientStore(_) => "E004",
            LinkgateError::Conflict(_) => "E005",
            LinkgateError::NotFound(_) => "E006",
            LinkgateError::Validation { .. } => "E007",
            LinkgateError::TokenExhausted(_) => "E008",
            LinkgateError::PasswordHash(_) => "E009",
            LinkgateError::Serialization(_) => "E010",
            LinkgateError::FileOperation(_) => "E011",
            LinkgateError::DateParse(_) => "E012",
            LinkgateError::Unavailable(_) => "E013",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            LinkgateError::DatabaseConfig(_) => "Database Configuration Error",
            LinkgateError::DatabaseConnection(_) => "Database Connection Error",
            LinkgateError::DatabaseOperation(_) => "Database Operation Error",
            LinkgateError::TransientStore(_) => "Transient Store Error",
            LinkgateError::Conflict(_) => "Conflict",
            LinkgateError::NotFound(_) => "Resource Not Found",
            LinkgateError::Validation { .. } => "Validation Error",
            LinkgateError::TokenExhausted(_) => "Token Generation Failed",
            LinkgateError::PasswordHash(_) => "Password Hash Error",
            LinkgateError::Serialization(_) => "Serialization Error",
            LinkgateError::FileOperation(_) => "File Operation Error",
            LinkgateError::DateParse(_) => "Date Parse Error",
            LinkgateError::Unavailable(_) => "Service Unavailable",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            LinkgateError::DatabaseConfig(msg)
            | LinkgateError::DatabaseConnection(msg)
            | LinkgateError::DatabaseOperation(msg)
            | LinkgateError::TransientStore(msg)
            | LinkgateError::Conflict(msg)
            | LinkgateError::NotFound(msg)
            | LinkgateError::TokenExhausted(msg)
            | LinkgateError::PasswordHash(msg)
            | LinkgateError::Serialization(msg)
            | LinkgateError::FileOperation(msg)
            | LinkgateError::DateParse(msg)
            | LinkgateError::Unavailable(msg) => msg,
            LinkgateError::Validation { message, .. } => message,
        }
    }

    /// 校验失败时对应的字段名
    pub fn field(&self) -> Option<&'static str> {
        match self {
            LinkgateError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    /// 映射到 HTTP 状态码（只用于所有者 API，解析路径从不返回错误体）
    pub fn http_status(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match self {
            LinkgateError::Validation { .. } | LinkgateError::DateParse(_) => {
                StatusCode::BAD_REQUEST
            }
            LinkgateError::NotFound(_) => StatusCode::NOT_FOUND,
            LinkgateError::Conflict(_) => StatusCode::CONFLICT,
            LinkgateError::Unavailable(_) | LinkgateError::TransientStore(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（用于 Server 模式）
    #[cfg(feature = "server")]
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于 CLI 模式）
    pub fn format_simple(&self) -> String {
        match self {
            LinkgateError::Validation { field, message } => {
                format!("{}: {}: {}", self.error_type(), field, message)
            }
            _ => format!("{}: {}", self.error_type(), self.message()),
        }
    }
}

impl fmt::Display for LinkgateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for LinkgateError {}

// 便捷的构造函数
impl LinkgateError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        LinkgateError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        LinkgateError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        LinkgateError::DatabaseOperation(msg.into())
    }

    pub fn transient_store<T: Into<String>>(msg: T) -> Self {
        LinkgateError::TransientStore(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        LinkgateError::Conflict(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        LinkgateError::NotFound(msg.into())
    }

    pub fn validation<T: Into<String>>(field: &'static str, msg: T) -> Self {
        LinkgateError::Validation {
            field,
            message: msg.into(),
        }
    }

    pub fn token_exhausted<T: Into<String>>(msg: T) -> Self {
        LinkgateError::TokenExhausted(msg.into())
    }

    pub fn password_hash<T: Into<String>>(msg: T) -> Self {
        LinkgateError::PasswordHash(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        LinkgateError::Serialization(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        LinkgateError::FileOperation(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        LinkgateError::DateParse(msg.into())
    }

    pub fn unavailable<T: Into<String>>(msg: T) -> Self {
        LinkgateError::Unavailable(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for LinkgateError {
    fn from(err: sea_orm::DbErr) -> Self {
        LinkgateError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for LinkgateError {
    fn from(err: std::io::Error) -> Self {
        LinkgateError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for LinkgateError {
    fn from(err: serde_json::Error) -> Self {
        LinkgateError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for LinkgateError {
    fn from(err: chrono::ParseError) -> Self {
        LinkgateError::DateParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LinkgateError>;
