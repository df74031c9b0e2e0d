//! # filter 子命令 CLI 定义
//!
//! 势垒区间缺省取运行文件的 `[filtering]` 段，命令行参数可覆盖。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/filter.rs`

use super::RunArgs;
use clap::Args;
use std::path::PathBuf;

/// filter 子命令参数
#[derive(Args, Debug)]
pub struct FilterArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Output CSV file (long format, barrier-major)
    #[arg(short, long, default_value = "filtering.csv")]
    pub output: PathBuf,

    /// First barrier height (eV)
    #[arg(long)]
    pub barrier_start: Option<f64>,

    /// Last barrier height, exclusive (eV)
    #[arg(long)]
    pub barrier_stop: Option<f64>,

    /// Barrier step (eV)
    #[arg(long)]
    pub barrier_step: Option<f64>,
}
