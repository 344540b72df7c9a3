use futures_util::future::join_all;
use tracing::{info, warn};

use crate::ai::LlmClassifier;
use crate::github::{CommitFetcher, DiffFetcher};
use crate::models::{AIDecision, CommitRecord};
use crate::pipeline::grouper;
use crate::token_budget::TokenBudget;

/// 端到端编排：拉提交、取 diff、按日分组、逐日判定
///
/// 仓库之间、单日批次之间互相隔离，任何一个单元失败都只丢弃
/// 自己的结果并记日志，不影响同轮其余单元。
pub struct DecisionAggregator {
    commit_fetcher: CommitFetcher,
    diff_fetcher: DiffFetcher,
    classifier: LlmClassifier,
    budget: TokenBudget,
}

impl DecisionAggregator {
    pub fn new(
        commit_fetcher: CommitFetcher,
        diff_fetcher: DiffFetcher,
        classifier: LlmClassifier,
        budget: TokenBudget,
    ) -> Self {
        Self {
            commit_fetcher,
            diff_fetcher,
            classifier,
            budget,
        }
    }

    /// 对用户的全部仓库跑一轮判定
    ///
    /// 返回每个产出了至少一条判定的仓库各一组 `AIDecision`；
    /// 没有任何提交或全部判定失败的仓库不出现在结果里。
    pub async fn run_for_user(
        &self,
        username: &str,
        repo_urls: &[String],
        since: &str,
        until: &str,
    ) -> Vec<Vec<AIDecision>> {
        let runs = repo_urls
            .iter()
            .map(|repo_url| self.run_for_repo(username, repo_url, since, until));

        join_all(runs)
            .await
            .into_iter()
            .filter(|decisions| !decisions.is_empty())
            .collect()
    }

    /// 单仓库一轮：失败都收敛为空结果
    async fn run_for_repo(
        &self,
        username: &str,
        repo_url: &str,
        since: &str,
        until: &str,
    ) -> Vec<AIDecision> {
        let commits = match self
            .commit_fetcher
            .fetch_user_commits(username, repo_url, since, until)
            .await
        {
            Ok(commits) => commits,
            Err(e) => {
                warn!("Skipping repository {}: {}", repo_url, e);
                return Vec::new();
            }
        };

        if commits.is_empty() {
            info!("No commits for {} in {}, skipping", username, repo_url);
            return Vec::new();
        }

        let commits = self.attach_diffs(commits).await;
        let grouped = grouper::group_and_prepare(commits, &self.budget);

        let classifications = grouped.into_iter().map(|(date, batch)| async move {
            let shas = sorted_shas(&batch);
            let repository = batch
                .first()
                .map(|c| c.repo.clone())
                .unwrap_or_default();
            let decision = self.classifier.classify_day(&date, &batch, None).await;
            (date, repository, shas, decision)
        });

        let mut decisions = Vec::new();
        for (date, repository, shas, decision) in join_all(classifications).await {
            match decision {
                Some(response) => decisions.push(AIDecision {
                    username: username.to_string(),
                    repository,
                    date,
                    response,
                    commit_hashes: shas,
                }),
                None => {
                    warn!("No decision produced for {} on {}", repository, date);
                }
            }
        }

        decisions
    }

    /// 并发补齐每条提交的 diff，上限由信号量控制
    ///
    /// 拿不到 diff 的提交保留空 diff 继续走流程。
    async fn attach_diffs(&self, commits: Vec<CommitRecord>) -> Vec<CommitRecord> {
        let fetches = commits.into_iter().map(|mut commit| async move {
            match self.diff_fetcher.fetch_diff(&commit.repo, &commit.sha).await {
                Ok(Some(diff)) => commit.diff = diff,
                Ok(None) => {}
                Err(e) => {
                    warn!("Diff unavailable for {}@{}: {}", commit.repo, commit.sha, e);
                }
            }
            commit
        });

        join_all(fetches).await
    }
}

fn sorted_shas(batch: &[CommitRecord]) -> Vec<String> {
    let mut shas: Vec<String> = batch.iter().map(|c| c.sha.clone()).collect();
    shas.sort();
    shas.dedup();
    shas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sha: &str) -> CommitRecord {
        CommitRecord {
            repo: "org/repo".to_string(),
            author: "Alice".to_string(),
            username: "alice".to_string(),
            date: "2024-05-01T10:00:00Z".to_string(),
            message: "work".to_string(),
            sha: sha.to_string(),
            branch: "main".to_string(),
            diff: String::new(),
        }
    }

    #[test]
    fn test_sorted_shas_deduped_ascending() {
        let batch = vec![record("ccc"), record("aaa"), record("bbb"), record("aaa")];
        assert_eq!(sorted_shas(&batch), vec!["aaa", "bbb", "ccc"]);
    }
}
