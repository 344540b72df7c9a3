use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 设置日志系统
///
/// `RUST_LOG` 存在时优先生效，否则按传入级别过滤本 crate 的日志。
/// 重复初始化（例如多个测试）静默忽略。
pub fn setup_logging(level: &str) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("github_tracker={}", level)))?;

    let fmt_layer = fmt::layer().with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .ok();

    Ok(())
}
