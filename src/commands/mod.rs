//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑，共用 `pipeline` 中的计算阶段。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `config/`, `transport/`, `utils/`
//! - 子模块: pipeline, fermi, scattering, transport, filter

pub mod fermi;
pub mod filter;
pub mod pipeline;
pub mod scattering;
pub mod transport;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Fermi(args) => fermi::execute(args),
        Commands::Scattering(args) => scattering::execute(args),
        Commands::Transport(args) => transport::execute(args),
        Commands::Filter(args) => filter::execute(args),
    }
}
