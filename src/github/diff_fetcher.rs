use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::{Result, TrackerError};
use crate::retry::RetryStrategy;

/// 二级限流响应缺少重置头时的默认冷却时长
const DEFAULT_RATE_LIMIT_SLEEP_SECS: u64 = 60;

/// 拉取单个提交的统一 diff 文本
///
/// 并发由固定容量的信号量限制，避免触发 GitHub 二级限流。
pub struct DiffFetcher {
    client: Client,
    api_url: String,
    token: String,
    semaphore: Arc<Semaphore>,
    strategy: RetryStrategy,
}

impl DiffFetcher {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            api_url: config.github_api_url.trim_end_matches('/').to_string(),
            token: config.github_token.clone(),
            semaphore: Arc::new(Semaphore::new(config.diff_concurrency)),
            strategy: RetryStrategy::FixedDelay {
                delay: config.diff_retry_delay,
                max_retries: config.diff_max_attempts,
            },
        }
    }

    /// 获取 `repo@sha` 的 diff
    ///
    /// `Ok(None)` 表示该提交的 diff 终态不可用（非限流的失败响应），
    /// 调用方按"无 diff"继续处理；瞬态错误在内部按固定间隔重试，
    /// 重试耗尽后把最后一个错误交给调用方。
    pub async fn fetch_diff(&self, repo_full_name: &str, sha: &str) -> Result<Option<String>> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| TrackerError::network(format!("diff semaphore closed: {}", e), None))?;

        let max_attempts = self.strategy.max_retries().max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.fetch_once(repo_full_name, sha).await {
                Ok(diff) => return Ok(diff),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(
                        "Diff fetch for {}@{} failed (attempt {}): {}, retrying",
                        repo_full_name, sha, attempt, e
                    );
                    tokio::time::sleep(self.strategy.calculate_delay(attempt)).await;
                    last_error = Some(e);
                }
                Err(e) => {
                    error!(
                        "Diff fetch for {}@{} failed terminally after attempt {}: {}",
                        repo_full_name, sha, attempt, e
                    );
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| TrackerError::network("diff fetch retries exhausted", None)))
    }

    async fn fetch_once(&self, repo_full_name: &str, sha: &str) -> Result<Option<String>> {
        let url = format!("{}/repos/{}/commits/{}", self.api_url, repo_full_name, sha);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.diff")
            .send()
            .await?;

        let status = response.status();
        match status.as_u16() {
            200 => {
                let diff = response.text().await?;
                debug!("Fetched diff for {}@{} ({} bytes)", repo_full_name, sha, diff.len());
                Ok(Some(diff))
            }
            403 => {
                // 二级限流：睡到重置点再交给外层重试
                let wait_secs = rate_limit_wait_secs(&response);
                warn!(
                    "403 Forbidden for {}@{}, sleeping {}s until rate limit reset",
                    repo_full_name, sha, wait_secs
                );
                tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                Err(TrackerError::RateLimited {
                    reset_in_secs: wait_secs,
                })
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                error!(
                    "Failed to fetch diff for {}@{} ({}): {}",
                    repo_full_name, sha, status, body
                );
                Ok(None)
            }
        }
    }
}

/// 从 `X-RateLimit-Reset` 计算冷却秒数：`max(reset - now + 1, 1)`
fn rate_limit_wait_secs(response: &reqwest::Response) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    response
        .headers()
        .get("X-RateLimit-Reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok())
        .map(|reset| (reset - now + 1).max(1) as u64)
        .unwrap_or(DEFAULT_RATE_LIMIT_SLEEP_SECS)
}
