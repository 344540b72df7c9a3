use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::diff_filter;
use crate::models::CommitRecord;
use crate::token_budget::TokenBudget;

/// 超出 token 预算的日子里，每个提交的 diff 被替换成这段固定文本
pub const EXCEED_PLACEHOLDER: &str =
    "The diff file exceeds OPENAI token limit. The diff data possibly includes spam data.";

/// 按 UTC 日历日分组并为分类做准备
///
/// 每个桶内按完整时间戳升序排序，逐条过滤非代码 diff，
/// 再对整天做 token 预算检查。纯函数，相同输入产出相同分组。
pub fn group_and_prepare(
    records: Vec<CommitRecord>,
    budget: &TokenBudget,
) -> BTreeMap<String, Vec<CommitRecord>> {
    let mut grouped: BTreeMap<String, Vec<CommitRecord>> = BTreeMap::new();

    for record in records {
        grouped.entry(record.day().to_string()).or_default().push(record);
    }

    grouped
        .into_iter()
        .map(|(day, mut batch)| {
            batch.sort_by(|a, b| commit_instant(a).cmp(&commit_instant(b)));

            let filtered: Vec<CommitRecord> = batch
                .into_iter()
                .map(|mut record| {
                    record.diff = diff_filter::filter_diffs(&record.diff);
                    record
                })
                .collect();

            (day, handle_daily_exceed(filtered, budget))
        })
        .collect()
}

/// 处理单日数据超出 token 预算的情况
///
/// 超限时返回的副本里每个提交的 diff 都被替换为占位文本，
/// 保留消息与元数据让这一天仍可判定；提交数量不变。
pub fn handle_daily_exceed(batch: Vec<CommitRecord>, budget: &TokenBudget) -> Vec<CommitRecord> {
    let serialized = serde_json::to_string(&batch).unwrap_or_default();

    if budget.fits(&serialized) {
        return batch;
    }

    batch
        .into_iter()
        .map(|mut record| {
            record.diff = EXCEED_PLACEHOLDER.to_string();
            record
        })
        .collect()
}

/// 排序键：解析失败的时间戳排在可解析的之前，彼此间按原文本比较
fn commit_instant(record: &CommitRecord) -> (Option<DateTime<Utc>>, &str) {
    let parsed = DateTime::parse_from_rfc3339(&record.date)
        .ok()
        .map(|dt| dt.with_timezone(&Utc));
    (parsed, record.date.as_str())
}
