use std::env;
use std::time::Duration;

use crate::error::TrackerError;

/// 全局配置
///
/// 配置来源优先级：环境变量 > `.env` 文件 > 默认值。
/// API 地址可注入，测试里指向 wiremock 实例。
#[derive(Debug, Clone)]
pub struct Config {
    pub github_token: String,
    pub github_api_url: String,
    pub openai_api_key: String,
    pub openai_api_url: String,
    pub openai_model: String,
    pub mongo_host: String,
    pub mongo_db: String,
    pub mongo_collection: String,
    /// 传给 `logging::setup_logging` 的默认日志级别
    pub log_level: String,
    /// 单日提交数据允许的最大 token 数（为响应预留余量）
    pub token_ceiling: usize,
    /// diff 拉取的并发上限（避免触发二级限流）
    pub diff_concurrency: usize,
    /// diff 拉取的固定重试间隔与次数
    pub diff_retry_delay: Duration,
    pub diff_max_attempts: u32,
    /// LLM 调用的指数退避参数
    pub openai_initial_retry_delay: Duration,
    pub openai_backoff_multiplier: f64,
    pub openai_max_retries: u32,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_token: String::new(),
            github_api_url: "https://api.github.com".to_string(),
            openai_api_key: String::new(),
            openai_api_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4o".to_string(),
            mongo_host: "mongodb://localhost:27017".to_string(),
            mongo_db: "github_tracker".to_string(),
            mongo_collection: "users".to_string(),
            log_level: "info".to_string(),
            token_ceiling: 120_000,
            diff_concurrency: 5,
            diff_retry_delay: Duration::from_secs(2),
            diff_max_attempts: 5,
            openai_initial_retry_delay: Duration::from_secs(1),
            openai_backoff_multiplier: 2.0,
            openai_max_retries: 3,
            http_timeout: Duration::from_secs(60),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        let mut config = Config::default();

        #[cfg(not(test))]
        config.load_from_env_file();
        config.load_from_env();

        config
    }

    pub fn load_from_env_file(&mut self) {
        dotenvy::dotenv().ok();
    }

    pub fn load_from_env(&mut self) {
        if let Ok(token) = env::var("GITHUB_TOKEN") {
            self.github_token = token;
        }
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            self.openai_api_key = key;
        }
        if let Ok(host) = env::var("MONGO_HOST") {
            self.mongo_host = host;
        }
        if let Ok(db) = env::var("MONGO_DB") {
            self.mongo_db = db;
        }
        if let Ok(collection) = env::var("MONGO_COLLECTION") {
            self.mongo_collection = collection;
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            self.log_level = level;
        }
        if let Ok(url) = env::var("GITHUB_TRACKER_GITHUB_API_URL") {
            self.github_api_url = url;
        }
        if let Ok(url) = env::var("GITHUB_TRACKER_OPENAI_API_URL") {
            self.openai_api_url = url;
        }
        if let Ok(model) = env::var("GITHUB_TRACKER_OPENAI_MODEL") {
            self.openai_model = model;
        }
        if let Ok(ceiling) = env::var("GITHUB_TRACKER_TOKEN_CEILING") {
            if let Ok(ceiling) = ceiling.parse() {
                self.token_ceiling = ceiling;
            }
        }
        if let Ok(concurrency) = env::var("GITHUB_TRACKER_DIFF_CONCURRENCY") {
            if let Ok(concurrency) = concurrency.parse() {
                self.diff_concurrency = concurrency;
            }
        }
        if let Ok(retries) = env::var("GITHUB_TRACKER_OPENAI_MAX_RETRIES") {
            if let Ok(retries) = retries.parse() {
                self.openai_max_retries = retries;
            }
        }
        if let Ok(delay) = env::var("GITHUB_TRACKER_OPENAI_INITIAL_RETRY_DELAY_MS") {
            if let Ok(ms) = delay.parse() {
                self.openai_initial_retry_delay = Duration::from_millis(ms);
            }
        }
    }

    /// 校验运行必需的配置项
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.github_token.is_empty() {
            return Err(TrackerError::config(
                "GITHUB_TOKEN is required but not set. Please set it in the environment or in a .env file",
            ));
        }
        if self.openai_api_key.is_empty() {
            return Err(TrackerError::config(
                "OPENAI_API_KEY is required but not set. Please set it in the environment or in a .env file",
            ));
        }
        Ok(())
    }

    /// 构建共享 HTTP 客户端
    pub fn build_http_client(&self) -> Result<reqwest::Client, TrackerError> {
        reqwest::ClientBuilder::new()
            .timeout(self.http_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("github-tracker/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TrackerError::network(format!("Failed to create HTTP client: {}", e), None))
    }
}
