use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {message}")]
    Upstream { status: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfig { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Input,
    NotFound,
    Parse,
    Network,
    Config,
}

impl EngineError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest { .. } => ErrorCategory::Input,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Parse { .. } | Self::Json(_) | Self::Toml(_) => ErrorCategory::Parse,
            Self::Network(_) | Self::Upstream { .. } => ErrorCategory::Network,
            Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ErrorCategory::NotFound,
            Self::Io(_) => ErrorCategory::Parse,
            Self::Config { .. } | Self::MissingConfig { .. } | Self::InvalidConfigValue { .. } => {
                ErrorCategory::Config
            }
        }
    }

    /// 給呈現層顯示的說明文字
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::InvalidRequest { message } => format!("請求無效: {}", message),
            Self::NotFound { what } => format!("找不到資料: {}", what),
            Self::Parse { message } => format!("資料格式錯誤: {}", message),
            Self::Json(e) => format!("資料格式錯誤: {}", e),
            Self::Toml(e) => format!("設定檔格式錯誤: {}", e),
            Self::Network(e) if e.is_timeout() => "連線逾時，請稍後再試".to_string(),
            Self::Network(_) => "無法連線到評論服務，請檢查網路".to_string(),
            Self::Upstream { status, .. } => format!("API 響應錯誤: {}", status),
            Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                format!("找不到檔案: {}", e)
            }
            Self::Io(e) => format!("讀取檔案時發生錯誤: {}", e),
            Self::Config { message } => format!("設定錯誤: {}", message),
            Self::MissingConfig { field } => format!("缺少設定: {}", field),
            Self::InvalidConfigValue { field, reason, .. } => {
                format!("設定值無效 ({}): {}", field, reason)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
