use std::collections::HashSet;

use futures_util::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, TrackerError};
use crate::models::CommitRecord;

static REPO_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://github\.com/[a-zA-Z0-9_.-]+/[a-zA-Z0-9_.-]+/?$").unwrap()
});

static LINK_NEXT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<([^>]+)>;\s*rel="next""#).unwrap());

#[derive(Debug, Deserialize)]
struct BranchInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CommitListItem {
    sha: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    message: String,
    #[serde(default)]
    author: Option<GitIdentity>,
    #[serde(default)]
    committer: Option<GitIdentity>,
}

#[derive(Debug, Deserialize)]
struct GitIdentity {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

/// 按用户与时间窗拉取仓库所有分支上的提交
pub struct CommitFetcher {
    client: Client,
    api_url: String,
    token: String,
}

impl CommitFetcher {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            api_url: config.github_api_url.trim_end_matches('/').to_string(),
            token: config.github_token.clone(),
        }
    }

    /// 拉取用户在 `[since, until)` 内的全部提交，跨分支按 SHA 去重
    ///
    /// 单个分支的失败只影响该分支，其余分支继续；没有提交时返回
    /// 空列表，仅在仓库或分支列表解析失败时返回错误。
    pub async fn fetch_user_commits(
        &self,
        username: &str,
        repo_url: &str,
        since: &str,
        until: &str,
    ) -> Result<Vec<CommitRecord>> {
        let (owner, repo) = parse_repo_url(repo_url)?;
        let owner_repo = format!("{}/{}", owner, repo);

        let branches = self.list_branches(&owner_repo).await?;
        debug!("{} has {} branches", owner_repo, branches.len());

        // 各分支并发拉取，结果收集到驱动任务后再统一去重
        let fetches = branches.iter().map(|branch| {
            let owner_repo = owner_repo.clone();
            async move {
                let result = self
                    .fetch_branch_commits(&owner_repo, branch, username, since, until)
                    .await;
                (branch.clone(), result)
            }
        });

        let mut seen_shas: HashSet<String> = HashSet::new();
        let mut records = Vec::new();

        for (branch, result) in join_all(fetches).await {
            let items = match result {
                Ok(items) => items,
                Err(e) => {
                    warn!(
                        "Failed to fetch commits for {} on branch {}: {}",
                        owner_repo, branch, e
                    );
                    continue;
                }
            };

            // 首个分支优先：按分支列表顺序保留首次出现的 SHA
            for item in items {
                if !seen_shas.insert(item.sha.clone()) {
                    continue;
                }

                let author = item
                    .commit
                    .author
                    .as_ref()
                    .and_then(|a| a.name.clone())
                    .unwrap_or_else(|| username.to_string());
                let date = item
                    .commit
                    .committer
                    .as_ref()
                    .and_then(|c| c.date.clone())
                    .unwrap_or_default();

                records.push(CommitRecord {
                    repo: owner_repo.clone(),
                    author,
                    username: username.to_string(),
                    date,
                    message: item.commit.message,
                    sha: item.sha,
                    branch: branch.clone(),
                    diff: String::new(),
                });
            }
        }

        if records.is_empty() {
            info!("No commits found for user {} in {}", username, owner_repo);
        } else {
            debug!("{} has {} commits in {}", username, records.len(), owner_repo);
        }

        Ok(records)
    }

    /// 列出仓库的全部分支名
    async fn list_branches(&self, owner_repo: &str) -> Result<Vec<String>> {
        let url = format!("{}/repos/{}/branches?per_page=100", self.api_url, owner_repo);
        let branches: Vec<BranchInfo> = self.fetch_paginated(&url).await?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    async fn fetch_branch_commits(
        &self,
        owner_repo: &str,
        branch: &str,
        username: &str,
        since: &str,
        until: &str,
    ) -> Result<Vec<CommitListItem>> {
        let url = format!(
            "{}/repos/{}/commits?author={}&since={}&until={}&sha={}&per_page=100",
            self.api_url, owner_repo, username, since, until, branch
        );
        self.fetch_paginated(&url).await
    }

    /// 跟随 `Link: rel="next"` 响应头取完所有分页
    async fn fetch_paginated<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        let mut next_url = Some(url.to_string());
        let mut all_items = Vec::new();

        while let Some(url) = next_url.take() {
            let response = self
                .client
                .get(&url)
                .header("Authorization", format!("token {}", self.token))
                .header("Accept", "application/vnd.github+json")
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(TrackerError::api(status.as_u16(), body));
            }

            next_url = response
                .headers()
                .get("Link")
                .and_then(|v| v.to_str().ok())
                .and_then(|links| LINK_NEXT_REGEX.captures(links))
                .map(|c| c[1].to_string());

            let items: Vec<T> = response.json().await?;
            all_items.extend(items);
        }

        Ok(all_items)
    }
}

/// 校验并拆解 `https://github.com/{owner}/{repo}` 形式的仓库链接
pub fn parse_repo_url(repo_url: &str) -> Result<(String, String)> {
    if !REPO_URL_REGEX.is_match(repo_url) {
        return Err(TrackerError::validation(format!(
            "Invalid GitHub repository link format: {}",
            repo_url
        )));
    }

    let (_, owner_repo) = repo_url
        .split_once("github.com/")
        .ok_or_else(|| TrackerError::validation("repository link missing github.com"))?;
    let mut parts = owner_repo.trim_end_matches('/').splitn(2, '/');
    let owner = parts.next().unwrap_or_default().to_string();
    let repo = parts.next().unwrap_or_default().to_string();

    Ok((owner, repo))
}
