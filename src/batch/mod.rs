//! # 并行扫描模块
//!
//! 提供扫描单元的有序并行求值能力。
//!
//! ## 功能
//! - 线程数可配置（0 为全部 CPU）
//! - 结果顺序与输入一致
//! - 进度反馈
//!
//! ## 依赖关系
//! - 被 `transport/`、`commands/` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod runner;

pub use runner::SweepRunner;
