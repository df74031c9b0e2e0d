//! # fermi 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/fermi.rs`

use super::RunArgs;
use clap::Args;
use std::path::PathBuf;

/// fermi 子命令参数
#[derive(Args, Debug)]
pub struct FermiArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Output CSV file
    #[arg(short, long, default_value = "fermi_levels.csv")]
    pub output: PathBuf,

    /// Number of rows shown in the summary table
    #[arg(long, default_value_t = 10)]
    pub top_n: usize,
}
