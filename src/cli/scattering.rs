//! # scattering 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/scattering.rs`

use super::RunArgs;
use clap::Args;
use std::path::PathBuf;

/// scattering 子命令参数
#[derive(Args, Debug)]
pub struct ScatteringArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Output CSV file (one row per sweep point and energy)
    #[arg(short, long, default_value = "lifetimes.csv")]
    pub output: PathBuf,

    /// Sweep index shown in the summary table
    #[arg(long, default_value_t = 0)]
    pub sweep_index: usize,

    /// Energies (eV) shown in the summary table
    #[arg(long, value_delimiter = ',', default_values_t = [0.05, 0.1, 0.2, 0.3, 0.5])]
    pub energies: Vec<f64>,
}
