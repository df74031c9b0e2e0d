//! # 诊断日志
//!
//! 初始化 `tracing` 订阅器。`RUST_LOG` 优先于命令行 `--log-level`；
//! 日志写到标准错误，避免与表格、CSV 路径等标准输出混在一起。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `tracing-subscriber` 的 `EnvFilter` 与 `console::Term`

use tracing_subscriber::EnvFilter;

/// 安装全局订阅器；重复调用时保留第一次的设置
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(console::Term::stderr)
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
