use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};

/// 非代码文件的路径模式
///
/// 锁文件、CI/工具配置、构建产物、二进制与媒体文件等，
/// 这些文件的 diff 对判定贡献没有信号，只会浪费 token。
const NON_CODE_PATTERNS: &[&str] = &[
    r"^yarn\.lock$",
    r"^package-lock\.json$",
    r"^pnpm-lock\.yaml$",
    r"^pipfile\.lock$",
    r"^\.gitignore$",
    r"^\.editorconfig$",
    r"^\.eslintignore$",
    r"^\.eslintrc\.json$",
    r"^\.prettierrc$",
    r"^\.prettierrc\.json$",
    r"^\.prettierrc\.yaml$",
    r"^\.stylelintrc$",
    r"^\.stylelintrc\.json$",
    r"^\.stylelintrc\.yaml$",
    r"^\.browserslistrc$",
    r"^\.npmrc$",
    r"^\.yarnrc$",
    r"^\.nvmrc$",
    r"^\.env$",
    r"^\.env\.example$",
    r"^CONTRIBUTING\.md$",
    r"^CHANGELOG\.md$",
    r"^Dockerfile$",
    r"^Jenkinsfile$",
    r"^\.travis\.yml$",
    r"^\.circleci/config\.yml$",
    r"^Makefile$",
    r".*\.(png|jpg|gif|svg)$",
    r".*\.(pdf|docx)$",
    r".*\.log$",
    r".*\.csv$",
    r".*\.json$",
    r"^node_modules/.*",
    r"^vendor/.*",
    r"^dist/.*",
    r"^build/.*",
    r"^target/.*",
    r"^\.DS_Store$",
    r"^thumbs\.db$",
    r"^\.vscode/.*",
    r"^\.idea/.*",
    r"^\.github/workflows/.*",
    r"^azure-pipelines\.yml$",
    r"^bitbucket-pipelines\.yml$",
    r"^\.gitlab-ci\.yml$",
    r"^Cargo\.toml$",
    r"^Cargo\.lock$",
    r"^tsconfig\.json$",
    r"^jsconfig\.json$",
    r"^tslint\.json$",
    r"^jest\.config\.js$",
    r"^babel\.config\.js$",
    r"^webpack\.config\.js$",
    r"^rollup\.config\.js$",
    r"^Pipfile$",
    r"^requirements\.txt$",
    r"^pyproject\.toml$",
    r"^tox\.ini$",
];

static NON_CODE_SET: Lazy<RegexSet> =
    Lazy::new(|| RegexSet::new(NON_CODE_PATTERNS).expect("non-code patterns must compile"));

static HUNK_PATH_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"a/(.*) b/(.*)").unwrap());

/// 判断路径是否属于非代码文件
pub fn is_non_code_file(file_path: &str) -> bool {
    NON_CODE_SET.is_match(file_path)
}

/// 从统一 diff 文本中剔除非代码文件的 hunk
///
/// 按 `diff --git` 边界切分，解析 `a/<path> b/<path>` 头部；
/// 任一路径命中非代码模式的 hunk 被丢弃，头部无法解析的也按
/// 非代码处理。输出做了行尾规整，因此重复过滤是幂等的。
pub fn filter_diffs(diff_text: &str) -> String {
    let mut filtered = Vec::new();

    for hunk in diff_text.trim().split("diff --git") {
        if hunk.trim().is_empty() {
            continue;
        }

        let Some(captures) = HUNK_PATH_REGEX.captures(hunk) else {
            continue;
        };

        let path_a = captures.get(1).map_or("", |m| m.as_str());
        let path_b = captures.get(2).map_or("", |m| m.as_str());

        if is_non_code_file(path_a) || is_non_code_file(path_b) {
            continue;
        }

        filtered.push(format!("diff --git{}", hunk.trim_end()));
    }

    filtered.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIXED_DIFF: &str = "\
diff --git a/src/main.py b/src/main.py
index 1111111..2222222 100644
--- a/src/main.py
+++ b/src/main.py
@@ -1,3 +1,4 @@
+def main():
+    pass
diff --git a/yarn.lock b/yarn.lock
index 3333333..4444444 100644
--- a/yarn.lock
+++ b/yarn.lock
@@ -1,2 +1,2 @@
-lodash@^4.0.0
+lodash@^4.1.0
diff --git a/src/lib.rs b/src/lib.rs
index 5555555..6666666 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,1 +1,2 @@
+pub mod parser;
";

    #[test]
    fn test_is_non_code_file() {
        assert!(is_non_code_file("yarn.lock"));
        assert!(is_non_code_file("package-lock.json"));
        assert!(is_non_code_file(".github/workflows/ci.yml"));
        assert!(is_non_code_file("assets/logo.png"));
        assert!(is_non_code_file("node_modules/lodash/index.js"));
        assert!(is_non_code_file("Cargo.lock"));
        assert!(is_non_code_file("data/report.csv"));

        assert!(!is_non_code_file("src/main.py"));
        assert!(!is_non_code_file("src/lib.rs"));
        assert!(!is_non_code_file("lib/parser.ts"));
    }

    #[test]
    fn test_filter_drops_non_code_hunks() {
        let filtered = filter_diffs(MIXED_DIFF);

        assert!(filtered.contains("a/src/main.py"));
        assert!(filtered.contains("a/src/lib.rs"));
        assert!(!filtered.contains("yarn.lock"));
        assert_eq!(filtered.matches("diff --git").count(), 2);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let once = filter_diffs(MIXED_DIFF);
        let twice = filter_diffs(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unparsable_header_is_dropped() {
        let diff = "diff --git garbage header without paths\n+something\n";
        assert_eq!(filter_diffs(diff), "");
    }

    #[test]
    fn test_all_non_code_yields_empty() {
        let diff = "\
diff --git a/package-lock.json b/package-lock.json
@@ -1 +1 @@
-x
+y
";
        assert_eq!(filter_diffs(diff), "");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(filter_diffs(""), "");
    }
}
