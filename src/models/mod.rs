//! # 数据模型模块
//!
//! 定义物理常数、材料参数、能量网格、扫描轴和晶格。
//!
//! ## 依赖关系
//! - 被 `parsers/`、`transport/` 和 `commands/` 使用
//! - 子模块: constants, grid, lattice, material, sweep

pub mod constants;
pub mod grid;
pub mod lattice;
pub mod material;
pub mod sweep;

pub use grid::{EnergyArray, EnergyGrid, SweepEnergyArray};
pub use lattice::Lattice;
pub use material::MaterialModel;
pub use sweep::Sweep;
