use thiserror::Error;

/// 跟踪器错误类型
///
/// 重试策略依赖 `is_retryable` 的结构化分类，而不是在调用方
/// 对异常消息做字符串匹配。
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("network error: {message}")]
    Network { message: String, url: Option<String> },

    #[error("request timed out: {operation}")]
    Timeout { operation: String },

    #[error("rate limited, reset in {reset_in_secs}s")]
    RateLimited { reset_in_secs: u64 },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("parsing error ({content_type}): {message}")]
    Parsing { message: String, content_type: String },

    #[error("storage error: {message}")]
    Storage { message: String },

    #[error("configuration error: {message}")]
    Configuration { message: String },
}

/// 不透明 API 错误体里的瞬态故障标记
///
/// 只有在状态码不足以分类时才检查消息内容（例如网关返回
/// HTML 错误页或纯文本限流提示）。
const TRANSIENT_MARKERS: &[&str] = &[
    "forbidden",
    "<html",
    "rate limit",
    "too many requests",
    "timeout",
    "timed out",
    "temporarily",
];

impl TrackerError {
    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            TrackerError::Network { .. } => true,
            TrackerError::Timeout { .. } => true,
            TrackerError::RateLimited { .. } => true,
            TrackerError::Api { status, message } => match status {
                // 鉴权抖动与限流视为瞬态，404 及其余 4xx 为终态
                401 | 403 | 429 => true,
                500..=599 => true,
                404 => false,
                _ => {
                    let lower = message.to_lowercase();
                    TRANSIENT_MARKERS.iter().any(|m| lower.contains(m))
                }
            },
            _ => false,
        }
    }

    /// 创建校验错误
    pub fn validation(message: impl Into<String>) -> Self {
        TrackerError::Validation {
            message: message.into(),
        }
    }

    /// 创建网络错误
    pub fn network(message: impl Into<String>, url: Option<String>) -> Self {
        TrackerError::Network {
            message: message.into(),
            url,
        }
    }

    /// 创建 API 错误
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        TrackerError::Api {
            status,
            message: message.into(),
        }
    }

    /// 创建解析错误
    pub fn parsing(message: impl Into<String>, content_type: impl Into<String>) -> Self {
        TrackerError::Parsing {
            message: message.into(),
            content_type: content_type.into(),
        }
    }

    /// 创建存储错误
    pub fn storage(message: impl Into<String>) -> Self {
        TrackerError::Storage {
            message: message.into(),
        }
    }

    /// 创建配置错误
    pub fn config(message: impl Into<String>) -> Self {
        TrackerError::Configuration {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TrackerError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TrackerError::Timeout {
                operation: error
                    .url()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "http request".to_string()),
            }
        } else {
            TrackerError::Network {
                message: error.to_string(),
                url: error.url().map(|u| u.to_string()),
            }
        }
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(error: serde_json::Error) -> Self {
        TrackerError::Parsing {
            message: error.to_string(),
            content_type: "JSON".to_string(),
        }
    }
}

impl From<mongodb::error::Error> for TrackerError {
    fn from(error: mongodb::error::Error) -> Self {
        TrackerError::Storage {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(TrackerError::network("connection reset", None).is_retryable());
        assert!(TrackerError::RateLimited { reset_in_secs: 30 }.is_retryable());
        assert!(TrackerError::api(500, "internal server error").is_retryable());
        assert!(TrackerError::api(429, "slow down").is_retryable());
        assert!(TrackerError::api(403, "Forbidden").is_retryable());
        assert!(TrackerError::api(401, "bad token").is_retryable());
    }

    #[test]
    fn test_terminal_classification() {
        assert!(!TrackerError::api(404, "Not Found").is_retryable());
        assert!(!TrackerError::api(422, "unprocessable entity").is_retryable());
        assert!(!TrackerError::validation("bad repo url").is_retryable());
        assert!(!TrackerError::parsing("unexpected token", "JSON").is_retryable());
        assert!(!TrackerError::storage("write failed").is_retryable());
    }

    #[test]
    fn test_transient_markers_fallback() {
        assert!(TrackerError::api(400, "<html><body>Bad Gateway</body></html>").is_retryable());
        assert!(TrackerError::api(418, "rate limit exceeded for resource").is_retryable());
        assert!(!TrackerError::api(400, "invalid request payload").is_retryable());
    }
}
