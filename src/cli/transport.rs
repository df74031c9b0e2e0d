//! # transport 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/transport.rs`

use super::RunArgs;
use clap::Args;
use std::path::PathBuf;

/// transport 子命令参数
#[derive(Args, Debug)]
pub struct TransportArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Output CSV file
    #[arg(short, long, default_value = "transport.csv")]
    pub output: PathBuf,

    /// Also write Fermi levels to this CSV file
    #[arg(long)]
    pub fermi_output: Option<PathBuf>,

    /// Number of rows shown in the summary table
    #[arg(long, default_value_t = 10)]
    pub top_n: usize,
}
