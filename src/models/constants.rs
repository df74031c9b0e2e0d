//! # 物理常数
//!
//! 全局只读物理常数。能量以 eV 为单位，长度以 m 为单位。
//!
//! ## 依赖关系
//! - 被 `models/`、`transport/` 使用
//! - 纯静态数据，无外部依赖

/// 约化普朗克常数 (eV·s)
pub const HBAR: f64 = 6.582119e-16;

/// 玻尔兹曼常数 (eV/K)
pub const KB: f64 = 8.617330350e-5;

/// 元电荷 (C)，同时用作 eV → J 换算
pub const E2C: f64 = 1.6021765e-19;

/// 真空介电常数 (F/m)
pub const EPS0: f64 = 8.854187817e-12;

/// 电子静止质量 (kg)
pub const ME: f64 = 9.109e-31;

/// cm⁻³ → m⁻³
pub const PER_CM3_TO_PER_M3: f64 = 1e6;
