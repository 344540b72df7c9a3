use once_cell::sync::Lazy;
use tiktoken_rs::{o200k_base, CoreBPE};

use crate::ai::prompt::SYSTEM_MESSAGE_DAILY_DECIDE_COMMIT;

/// 除提交数据外，消息结构本身占用的 token 余量
const MESSAGE_OVERHEAD_TOKENS: usize = 1000;

/// gpt-4o 系列使用 o200k 编码
static BPE: Lazy<CoreBPE> = Lazy::new(|| o200k_base().expect("o200k_base encoding must load"));

/// token 预算守卫
///
/// 上限低于模型真实上下文窗口，为响应保留空间；具体数值
/// 是配置项而非契约。
#[derive(Debug, Clone)]
pub struct TokenBudget {
    ceiling: usize,
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self { ceiling: 120_000 }
    }
}

impl TokenBudget {
    pub fn new(ceiling: usize) -> Self {
        Self { ceiling }
    }

    /// 统计文本的 token 数
    pub fn count_tokens(text: &str) -> usize {
        BPE.encode_ordinary(text).len()
    }

    /// 判断单日提交数据是否装得进上下文窗口
    ///
    /// 计入系统提示词与固定的消息结构开销。
    pub fn fits(&self, day_data: &str) -> bool {
        let combined = format!("{} {}", SYSTEM_MESSAGE_DAILY_DECIDE_COMMIT, day_data);
        let total = Self::count_tokens(&combined) + MESSAGE_OVERHEAD_TOKENS;
        total < self.ceiling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_tokens_monotonic() {
        let a = "fn main() { println!(\"hello\"); }";
        let b = format!("{} // and a trailing comment", a);
        assert!(TokenBudget::count_tokens(a) <= TokenBudget::count_tokens(&b));
    }

    #[test]
    fn test_empty_string_has_no_tokens() {
        assert_eq!(TokenBudget::count_tokens(""), 0);
    }

    #[test]
    fn test_small_day_fits() {
        let budget = TokenBudget::default();
        assert!(budget.fits("one small commit with a tiny diff"));
    }

    #[test]
    fn test_tiny_ceiling_rejects() {
        // 系统提示词加 1000 token 开销已超过这个上限
        let budget = TokenBudget::new(500);
        assert!(!budget.fits("anything"));
    }

    #[test]
    fn test_fits_is_monotonic_in_input() {
        let budget = TokenBudget::new(3000);
        let small = "x ".repeat(10);
        let large = "x ".repeat(10_000);

        assert!(budget.fits(&small));
        assert!(!budget.fits(&large));
    }
}
