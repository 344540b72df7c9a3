use std::time::Duration;

/// 重试策略类型
///
/// diff 拉取用固定间隔，LLM 调用用带抖动的指数退避。
#[derive(Debug, Clone)]
pub enum RetryStrategy {
    /// 固定延迟重试
    FixedDelay { delay: Duration, max_retries: u32 },
    /// 指数退避重试
    ExponentialBackoff {
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
        max_retries: u32,
        jitter: bool,
    },
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::ExponentialBackoff {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            max_retries: 3,
            jitter: true,
        }
    }
}

impl RetryStrategy {
    pub fn max_retries(&self) -> u32 {
        match self {
            RetryStrategy::FixedDelay { max_retries, .. } => *max_retries,
            RetryStrategy::ExponentialBackoff { max_retries, .. } => *max_retries,
        }
    }

    /// 计算第 `attempt` 次失败后的等待时长（attempt 从 1 开始）
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            RetryStrategy::FixedDelay { delay, .. } => *delay,
            RetryStrategy::ExponentialBackoff {
                initial_delay,
                max_delay,
                backoff_multiplier,
                jitter,
                ..
            } => {
                let base = initial_delay.as_millis() as f64
                    * backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
                let mut delay = Duration::from_millis(base as u64);

                if delay > *max_delay {
                    delay = *max_delay;
                }

                // 抖动取计算值的 50%–100%
                if *jitter {
                    let factor: f64 = 0.5 + rand::random::<f64>() * 0.5;
                    delay = Duration::from_millis((delay.as_millis() as f64 * factor) as u64);
                }

                delay
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay() {
        let strategy = RetryStrategy::FixedDelay {
            delay: Duration::from_secs(2),
            max_retries: 5,
        };

        assert_eq!(strategy.calculate_delay(1), Duration::from_secs(2));
        assert_eq!(strategy.calculate_delay(4), Duration::from_secs(2));
        assert_eq!(strategy.max_retries(), 5);
    }

    #[test]
    fn test_exponential_backoff_without_jitter() {
        let strategy = RetryStrategy::ExponentialBackoff {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            max_retries: 5,
            jitter: false,
        };

        assert_eq!(strategy.calculate_delay(1), Duration::from_millis(100));
        assert_eq!(strategy.calculate_delay(2), Duration::from_millis(200));
        assert_eq!(strategy.calculate_delay(3), Duration::from_millis(400));
    }

    #[test]
    fn test_exponential_backoff_caps_at_max_delay() {
        let strategy = RetryStrategy::ExponentialBackoff {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 10.0,
            max_retries: 5,
            jitter: false,
        };

        assert_eq!(strategy.calculate_delay(3), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_stays_within_half_to_full_delay() {
        let strategy = RetryStrategy::ExponentialBackoff {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 1.0,
            max_retries: 3,
            jitter: true,
        };

        for _ in 0..50 {
            let delay = strategy.calculate_delay(1);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(1000));
        }
    }
}
