//! # 能量网格
//!
//! 所有能量分辨量（DoS、群速度、占据数、弛豫时间）共享的一维能量坐标。
//!
//! 所有下游积分均以本网格为积分变量、采用梯形公式；网格间距 ΔE 直接
//! 限定了自洽费米能级与输运系数的精度。粗网格（ΔE 与 kB·T 可比）会使
//! `∫DoS·f dE` 的离散误差进入费米能级搜索，使其系统性偏移，
//! 因此 ΔE 应远小于扫描中最低温度的 kB·T。
//!
//! ## 依赖关系
//! - 被 `parsers/doscar.rs`、`transport/` 使用
//! - 使用 `numerics/quadrature.rs`

use crate::error::{Result, TeFilterError};
use crate::numerics::{linspace, trapz};

use ndarray::{Array1, Array2, ArrayView1};

/// 与 `EnergyGrid` 共索引的一维数组
pub type EnergyArray = Array1<f64>;

/// 行为扫描点下标、列为 `EnergyGrid` 下标的二维数组
pub type SweepEnergyArray = Array2<f64>;

/// 不可变能量网格（严格递增、包含端点、等间距）
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyGrid {
    energies: Array1<f64>,
}

impl EnergyGrid {
    /// 在 [min, max] 上生成 `count` 个等距能量点
    pub fn new(min: f64, max: f64, count: usize) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || max <= min {
            return Err(TeFilterError::InvalidRange(format!(
                "energy grid requires min < max, got [{}, {}]",
                min, max
            )));
        }
        if count < 2 {
            return Err(TeFilterError::InvalidRange(format!(
                "energy grid requires at least 2 points, got {}",
                count
            )));
        }
        Ok(Self {
            energies: linspace(min, max, count),
        })
    }

    pub fn energies(&self) -> ArrayView1<'_, f64> {
        self.energies.view()
    }

    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn min(&self) -> f64 {
        self.energies[0]
    }

    pub fn max(&self) -> f64 {
        self.energies[self.energies.len() - 1]
    }

    /// 网格间距 ΔE
    pub fn spacing(&self) -> f64 {
        (self.max() - self.min()) / (self.len() - 1) as f64
    }

    /// 以网格为积分变量的梯形积分
    pub fn integrate(&self, values: ArrayView1<f64>) -> f64 {
        trapz(values, self.energies.view())
    }

    /// 对每个能量点求值，得到共索引数组
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> EnergyArray {
        self.energies.mapv(f)
    }

    /// 检查能量分辨数组与网格共索引
    pub fn check(&self, what: &str, values: ArrayView1<f64>) -> Result<()> {
        TeFilterError::check_len(what, self.len(), values.len())
    }

    /// 检查 (扫描点 × 能量) 二维数组形状
    pub fn check_rows(&self, what: &str, values: &SweepEnergyArray, rows: usize) -> Result<()> {
        TeFilterError::check_len(&format!("{} rows", what), rows, values.nrows())?;
        TeFilterError::check_len(&format!("{} columns", what), self.len(), values.ncols())
    }
}
