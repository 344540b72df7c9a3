//! 判定历史的派生统计，全部从历史整体重算，不做增量维护

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::models::{AIDecision, User};

/// 把一轮新判定合并进历史
///
/// 新判定与任意既有组里 (repository, date) 相同的条目视为同一天的
/// 重判：替换其 response，并把两侧的提交 SHA 并集后升序去重。没有
/// 匹配到的新判定作为一个新组整体追加。输入不被原地修改。
pub fn merge_decision_groups(
    groups: Vec<Vec<AIDecision>>,
    new_decisions: Vec<AIDecision>,
) -> Vec<Vec<AIDecision>> {
    let mut groups = groups;
    let mut leftovers: Vec<AIDecision> = Vec::new();

    'next_decision: for decision in new_decisions {
        for group in groups.iter_mut() {
            for existing in group.iter_mut() {
                if existing.repository == decision.repository && existing.date == decision.date {
                    existing.response = decision.response;
                    existing
                        .commit_hashes
                        .extend(decision.commit_hashes);
                    existing.commit_hashes.sort();
                    existing.commit_hashes.dedup();
                    continue 'next_decision;
                }
            }
        }
        leftovers.push(decision);
    }

    if !leftovers.is_empty() {
        groups.push(leftovers);
    }

    groups
}

/// 历史里的判定总条数
pub fn count_all_decisions(groups: &[Vec<AIDecision>]) -> usize {
    groups.iter().map(|group| group.len()).sum()
}

/// 判定覆盖的日期集合，不区分是否合格
///
/// 同一天在多个仓库各有一条判定时只算一个贡献日。
pub fn contribution_dates(groups: &[Vec<AIDecision>]) -> BTreeSet<String> {
    groups
        .iter()
        .flatten()
        .map(|decision| decision.date.clone())
        .collect()
}

/// 合格判定覆盖的日期集合
pub fn qualified_dates(groups: &[Vec<AIDecision>]) -> BTreeSet<String> {
    groups
        .iter()
        .flatten()
        .filter(|decision| decision.response.is_qualified)
        .map(|decision| decision.date.clone())
        .collect()
}

/// 合格日期按 `YYYY-MM` 的直方图
pub fn qualified_by_month(dates: &BTreeSet<String>) -> BTreeMap<String, usize> {
    let mut histogram = BTreeMap::new();
    for date in dates {
        if let Some(month) = date.get(..7) {
            *histogram.entry(month.to_string()).or_insert(0) += 1;
        }
    }
    histogram
}

/// 合格日期集合里最长的连续天数
///
/// 相邻两天相差恰好一天视为延续；空集合是 0，单个日期是 1。
/// 无法解析的日期不参与计算。
pub fn calculate_streak(dates: &BTreeSet<String>) -> usize {
    let parsed: Vec<NaiveDate> = dates
        .iter()
        .filter_map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .collect();

    if parsed.is_empty() {
        return 0;
    }

    let mut longest = 1;
    let mut current = 1;
    for pair in parsed.windows(2) {
        if pair[1] - pair[0] == chrono::Duration::days(1) {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 1;
        }
    }

    longest
}

/// 统计 `[since, until]` 闭区间内的合格判定条数
pub fn count_qualified_in_range(groups: &[Vec<AIDecision>], since: &str, until: &str) -> usize {
    groups
        .iter()
        .flatten()
        .filter(|decision| {
            decision.response.is_qualified
                && decision.date.as_str() >= since
                && decision.date.as_str() <= until
        })
        .count()
}

/// 按判定历史整体重算用户的全部派生字段
pub fn recompute(user: &mut User) {
    let dates = qualified_dates(&user.ai_decisions);

    user.total_daily_contribution_number = contribution_dates(&user.ai_decisions).len();
    user.total_qualified_daily_contribution_number = dates.len();
    user.qualified_daily_contribution_number_by_month = qualified_by_month(&dates);
    user.qualified_daily_contribution_streak = calculate_streak(&dates);
    user.qualified_daily_contribution_dates = dates;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DailyContributionResponse;

    fn decision(repo: &str, date: &str, qualified: bool, shas: &[&str]) -> AIDecision {
        AIDecision {
            username: "alice".to_string(),
            repository: repo.to_string(),
            date: date.to_string(),
            response: DailyContributionResponse {
                username: "alice".to_string(),
                date: date.to_string(),
                is_qualified: qualified,
                explanation: "test".to_string(),
            },
            commit_hashes: shas.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn dates(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merge_replaces_matching_and_unions_hashes() {
        let groups = vec![vec![decision("org/repo", "2024-05-01", false, &["aaa"])]];
        let merged = merge_decision_groups(
            groups,
            vec![decision("org/repo", "2024-05-01", true, &["bbb", "aaa"])],
        );

        assert_eq!(merged.len(), 1);
        let updated = &merged[0][0];
        assert!(updated.response.is_qualified);
        assert_eq!(updated.commit_hashes, vec!["aaa", "bbb"]);
    }

    #[test]
    fn test_merge_appends_unmatched_as_one_group() {
        let groups = vec![vec![decision("org/repo", "2024-05-01", true, &["aaa"])]];
        let merged = merge_decision_groups(
            groups,
            vec![
                decision("org/repo", "2024-05-02", true, &["bbb"]),
                decision("org/other", "2024-05-01", false, &["ccc"]),
            ],
        );

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].len(), 2);
    }

    #[test]
    fn test_merge_same_date_different_repo_is_distinct() {
        let groups = vec![vec![decision("org/repo", "2024-05-01", true, &["aaa"])]];
        let merged = merge_decision_groups(
            groups,
            vec![decision("org/other", "2024-05-01", true, &["bbb"])],
        );

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0][0].commit_hashes, vec!["aaa"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let new = vec![decision("org/repo", "2024-05-01", true, &["aaa", "bbb"])];
        let once = merge_decision_groups(Vec::new(), new.clone());
        let twice = merge_decision_groups(once.clone(), new);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_streak_empty_is_zero() {
        assert_eq!(calculate_streak(&BTreeSet::new()), 0);
    }

    #[test]
    fn test_streak_single_day_is_one() {
        assert_eq!(calculate_streak(&dates(&["2024-05-01"])), 1);
    }

    #[test]
    fn test_streak_consecutive_days() {
        assert_eq!(
            calculate_streak(&dates(&["2024-05-01", "2024-05-02", "2024-05-03"])),
            3
        );
    }

    #[test]
    fn test_streak_takes_longest_run() {
        assert_eq!(
            calculate_streak(&dates(&[
                "2024-04-01",
                "2024-04-02",
                "2024-05-01",
                "2024-05-02",
                "2024-05-03",
                "2024-05-10",
            ])),
            3
        );
    }

    #[test]
    fn test_streak_crosses_month_boundary() {
        assert_eq!(
            calculate_streak(&dates(&["2024-04-30", "2024-05-01", "2024-05-02"])),
            3
        );
    }

    #[test]
    fn test_month_histogram() {
        let histogram =
            qualified_by_month(&dates(&["2024-04-30", "2024-05-01", "2024-05-02"]));
        assert_eq!(histogram["2024-04"], 1);
        assert_eq!(histogram["2024-05"], 2);
    }

    #[test]
    fn test_count_qualified_in_range_is_inclusive() {
        let groups = vec![vec![
            decision("org/repo", "2024-05-01", true, &[]),
            decision("org/repo", "2024-05-02", true, &[]),
            decision("org/repo", "2024-05-03", false, &[]),
            decision("org/repo", "2024-05-04", true, &[]),
        ]];

        assert_eq!(count_qualified_in_range(&groups, "2024-05-01", "2024-05-04"), 3);
        assert_eq!(count_qualified_in_range(&groups, "2024-05-02", "2024-05-02"), 1);
        assert_eq!(count_qualified_in_range(&groups, "2024-05-05", "2024-05-06"), 0);
    }

    #[test]
    fn test_total_days_count_distinct_dates_across_repositories() {
        // 同一天在两个仓库各有一条判定，贡献日只算一个
        let mut user = User::new("alice", "alice-gh", vec![]);
        user.ai_decisions = vec![vec![
            decision("org/repo-a", "2024-05-01", true, &["aaa"]),
            decision("org/repo-b", "2024-05-01", false, &["bbb"]),
        ]];

        recompute(&mut user);

        assert_eq!(user.total_daily_contribution_number, 1);
        assert_eq!(user.total_qualified_daily_contribution_number, 1);
        assert_eq!(user.qualified_daily_contribution_streak, 1);
        assert_eq!(
            contribution_dates(&user.ai_decisions),
            dates(&["2024-05-01"])
        );
    }

    #[test]
    fn test_month_histogram_skips_unsliceable_dates() {
        let mut odd = dates(&["2024-05-01"]);
        odd.insert("２０２４".to_string());

        let histogram = qualified_by_month(&odd);
        assert_eq!(histogram.len(), 1);
        assert_eq!(histogram["2024-05"], 1);
    }

    #[test]
    fn test_recompute_fills_all_aggregates() {
        let mut user = User::new("alice", "alice-gh", vec![]);
        user.ai_decisions = vec![
            vec![
                decision("org/repo", "2024-05-01", true, &["aaa"]),
                decision("org/repo", "2024-05-02", true, &["bbb"]),
            ],
            vec![decision("org/repo", "2024-05-04", false, &["ccc"])],
        ];

        recompute(&mut user);

        assert_eq!(user.total_daily_contribution_number, 3);
        assert_eq!(user.total_qualified_daily_contribution_number, 2);
        assert_eq!(user.qualified_daily_contribution_streak, 2);
        assert!(user.qualified_daily_contribution_dates.contains("2024-05-01"));
        assert!(!user.qualified_daily_contribution_dates.contains("2024-05-04"));
        assert_eq!(user.qualified_daily_contribution_number_by_month["2024-05"], 2);
    }
}
