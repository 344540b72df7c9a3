use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::ai::prompt::{process_message, SYSTEM_MESSAGE_DAILY_DECIDE_COMMIT};
use crate::config::Config;
use crate::error::{Result, TrackerError};
use crate::models::{CommitRecord, DailyContributionResponse};
use crate::retry::RetryStrategy;

/// 可复现性参数：低温加固定 seed
const TEMPERATURE: f32 = 0.1;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<i64>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// 调用 LLM 判定单日提交是否构成合格贡献
pub struct LlmClassifier {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    strategy: RetryStrategy,
}

impl LlmClassifier {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            api_url: config.openai_api_url.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            strategy: RetryStrategy::ExponentialBackoff {
                initial_delay: config.openai_initial_retry_delay,
                max_delay: std::time::Duration::from_secs(60),
                backoff_multiplier: config.openai_backoff_multiplier,
                max_retries: config.openai_max_retries,
                jitter: true,
            },
        }
    }

    /// 判定一天的提交
    ///
    /// 所有终态情况——空批次、不可重试的 API 错误、模型返回的
    /// JSON 不合形、重试耗尽——都记日志并返回 `None`，调用方
    /// 跳过这一天而不中断整轮运行。
    pub async fn classify_day(
        &self,
        date: &str,
        day_commits: &[CommitRecord],
        seed: Option<i64>,
    ) -> Option<DailyContributionResponse> {
        if day_commits.is_empty() {
            warn!("Empty commit batch for {}, skipping classification", date);
            return None;
        }

        let message = process_message(date, day_commits);
        let max_retries = self.strategy.max_retries();

        for attempt in 0..=max_retries {
            match self.call_once(&message, seed).await {
                Ok(content) => {
                    return match serde_json::from_str::<DailyContributionResponse>(&content) {
                        Ok(response) => {
                            debug!(
                                "AI decision for {}: qualified={}",
                                date, response.is_qualified
                            );
                            Some(response)
                        }
                        Err(e) => {
                            // 模型输出不合形是终态，重试不会修复
                            error!("Malformed model response for {}: {}", date, e);
                            None
                        }
                    };
                }
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    let delay = self.strategy.calculate_delay(attempt + 1);
                    warn!(
                        "LLM call for {} failed (attempt {}): {}, retrying in {:?}",
                        date,
                        attempt + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_retryable() => {
                    warn!("LLM retries exhausted for {}, no decision: {}", date, e);
                    return None;
                }
                Err(e) => {
                    error!("LLM call for {} failed terminally: {}", date, e);
                    return None;
                }
            }
        }

        None
    }

    async fn call_once(&self, message: &str, seed: Option<i64>) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_MESSAGE_DAILY_DECIDE_COMMIT,
                },
                ChatMessage {
                    role: "user",
                    content: message,
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            seed,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::api(status.as_u16(), body));
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| TrackerError::parsing("completion has no choices", "chat response"))
    }
}
