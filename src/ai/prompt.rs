use crate::models::CommitRecord;

/// 每日提交判定的系统提示词
///
/// 判定以整天为单位：当天只要有一个合格提交，整天即合格；
/// 仅有配置修改、merge/revert、依赖升级或琐碎文档改动的一天
/// 不合格。要求模型返回固定四字段的 JSON 对象。
pub const SYSTEM_MESSAGE_DAILY_DECIDE_COMMIT: &str = r#"### **GitHub Commit Parameters**

During your development process, it's crucial that the code you add to the GitHub repositories makes sense and actually works. We really appreciate code that aims to make a difference and involves serious thinking behind it. Codes that require hard technical knowledge and deep thinking and are written with the aim of making a difference are the types of commits we're looking for from you.

Here are the details regarding commit types that are not counted:

**Configuration Changes:** Adding/modifying Node IP, RPC endpoint, network ID, short name, API ID, title, etc. might not be accepted.

**Merge Conflict Commits:** Commits resolving conflicts but not containing actual progress or fixes might not be accepted.

**Revert or Undo Commits:** Commits reverting previous changes or correcting an error without adding new value to the project might not be accepted.

**Dependency Update Commits:** Commits that only include dependency updates and don't contribute directly to the main project might not be accepted.

**Spam Commits:** Commits that repeatedly make very small or insignificant changes without contributing value to the project might not be accepted. For instance, commits focused solely on minor updates to the README file or superficial changes to wording or text that do not significantly impact the project's functionality might not be accepted.

Be really strict! If you believe the commit is really add features to the code then you can say it is qualified. Consider the diff file. Not consider only commit message.

You will receive one calendar day of commits for a single user. Judge the day as a whole: if at least one commit in the day is a qualified contribution, the whole day is qualified. Respond with a JSON object containing exactly these fields and nothing else:

{"username": string, "date": "YYYY-MM-DD", "is_qualified": boolean, "explanation": string}"#;

/// 构造包含日期与当日提交数据的用户消息
pub fn process_message(date: &str, day_commits: &[CommitRecord]) -> String {
    let serialized =
        serde_json::to_string_pretty(day_commits).unwrap_or_else(|_| "[]".to_string());

    format!(
        "Here are the GitHub commits of the user for {date} as a JSON array. \
Each entry carries the commit message, the branch, the SHA and the (possibly filtered) diff:\n\n{serialized}"
    )
}
