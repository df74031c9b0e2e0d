//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `fermi`: Joyce–Dixon 初值与自洽费米能级
//! - `scattering`: 各散射机制的能量分辨弛豫时间
//! - `transport`: 每个扫描点的输运系数
//! - `filter`: 能量过滤扫描（势垒 × 扫描点）
//!
//! ## 依赖关系
//! - 被 `main.rs`、`commands/` 使用
//! - 子模块: fermi, scattering, transport, filter

pub mod fermi;
pub mod filter;
pub mod scattering;
pub mod transport;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// tefilter - 热电输运与能量过滤计算
#[derive(Parser)]
#[command(name = "tefilter")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(
    about = "Thermoelectric transport and energy-filtering calculations from DFT band structures",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Diagnostic log level (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Solve Fermi levels for every sweep point
    Fermi(fermi::FermiArgs),

    /// Tabulate energy-resolved scattering lifetimes per mechanism
    Scattering(scattering::ScatteringArgs),

    /// Compute transport coefficients for every sweep point
    Transport(transport::TransportArgs),

    /// Sweep barrier heights and compute the filtering matrix
    Filter(filter::FilterArgs),
}

/// 所有子命令共用的运行参数
#[derive(Args, Debug)]
pub struct RunArgs {
    /// TOML run file
    #[arg(short, long, default_value = "tefilter.toml", env = "TEFILTER_CONFIG")]
    pub config: PathBuf,

    /// Number of parallel jobs (0 = all CPUs)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,
}
