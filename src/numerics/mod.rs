//! # 数值工具模块
//!
//! 能量积分、采样与插值所需的基础数值例程。
//!
//! ## 子模块
//! - `quadrature`: 梯形积分、等距采样、唯一值分箱平均
//! - `interp`: 单调 PCHIP 与 not-a-knot 三次样条
//! - `special`: 一阶 Bessel 函数 J₁
//!
//! ## 依赖关系
//! - 被 `parsers/` 和 `transport/` 使用
//! - 使用 `ndarray`

pub mod interp;
pub mod quadrature;
pub mod special;

pub use interp::{CubicSpline, Interpolate, Pchip};
pub use quadrature::{linspace, trapz, unique_mean};
