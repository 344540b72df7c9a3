use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// 单条提交记录
///
/// 由 CommitFetcher / DiffFetcher 生成后不再修改；跨分支按 SHA 去重，
/// `branch` 记录首次发现该提交的分支。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// `owner/repo` 形式的仓库标识
    pub repo: String,
    /// 提交作者的展示名
    pub author: String,
    /// 被跟踪用户的 GitHub 用户名
    pub username: String,
    /// ISO-8601 提交时间（committer date）
    pub date: String,
    pub message: String,
    pub sha: String,
    pub branch: String,
    pub diff: String,
}

impl CommitRecord {
    /// 提交时间的 UTC 日历日（时间戳前 10 个字符）
    pub fn day(&self) -> &str {
        self.date.get(..10).unwrap_or(&self.date)
    }
}

/// LLM 对单日提交的判定结果
///
/// 必须恰好包含这四个字段，多余或缺失字段都按解析失败处理。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DailyContributionResponse {
    pub username: String,
    pub date: String,
    pub is_qualified: bool,
    pub explanation: String,
}

/// 一条按 (repository, date) 唯一标识的 AI 判定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AIDecision {
    pub username: String,
    pub repository: String,
    pub date: String,
    pub response: DailyContributionResponse,
    /// 该判定覆盖的提交 SHA（升序，用于审计与按区间删除）
    #[serde(default)]
    pub commit_hashes: Vec<String>,
}

/// 用户文档，以 `user_handle` 为主键存储
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_handle: String,
    pub github_name: String,
    pub repositories: Vec<String>,
    /// 判定历史，每次聚合运行追加一组
    #[serde(default)]
    pub ai_decisions: Vec<Vec<AIDecision>>,
    #[serde(default)]
    pub total_daily_contribution_number: usize,
    #[serde(default)]
    pub total_qualified_daily_contribution_number: usize,
    #[serde(default)]
    pub qualified_daily_contribution_number_by_month: BTreeMap<String, usize>,
    #[serde(default)]
    pub qualified_daily_contribution_dates: BTreeSet<String>,
    #[serde(default)]
    pub qualified_daily_contribution_streak: usize,
}

impl User {
    pub fn new(
        user_handle: impl Into<String>,
        github_name: impl Into<String>,
        repositories: Vec<String>,
    ) -> Self {
        Self {
            user_handle: user_handle.into(),
            github_name: github_name.into(),
            repositories,
            ai_decisions: Vec::new(),
            total_daily_contribution_number: 0,
            total_qualified_daily_contribution_number: 0,
            qualified_daily_contribution_number_by_month: BTreeMap::new(),
            qualified_daily_contribution_dates: BTreeSet::new(),
            qualified_daily_contribution_streak: 0,
        }
    }

    /// 写库前的结构校验
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.user_handle.is_empty() {
            return Err(TrackerError::validation("user_handle must not be empty"));
        }
        if self.repositories.iter().any(|repo| repo.is_empty()) {
            return Err(TrackerError::validation(
                "repository list contains an empty entry",
            ));
        }
        Ok(())
    }
}
