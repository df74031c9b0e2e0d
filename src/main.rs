//! # tefilter - 热电输运与能量过滤计算
//!
//! 由 DFT 能带结构（EIGENVAL、DOSCAR）出发，在弛豫时间近似下求
//! 电导率、Seebeck 系数、功率因子与电子热导率，并扫描能量过滤势垒。
//!
//! ## 子命令
//! - `fermi`      - 自洽费米能级
//! - `scattering` - 各散射机制的弛豫时间
//! - `transport`  - 输运系数
//! - `filter`     - 能量过滤扫描
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑与共享计算流程)
//!   │     ├── config/    (运行配置)
//!   │     ├── parsers/   (输入文件解析)
//!   │     ├── transport/ (载流子、散射、输运积分、过滤扫描)
//!   │     ├── numerics/  (积分与插值)
//!   │     └── models/    (常数、材料、网格、扫描轴)
//!   ├── batch/      (并行扫描执行器)
//!   ├── utils/      (输出、进度条、日志)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod config;
mod error;
mod models;
mod numerics;
mod parsers;
mod transport;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();
    utils::logging::init(&cli.log_level);

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
