//! # 温度 / 载流子浓度扫描轴
//!
//! 扫描由成对的 (T_i, n_i) 组成。所有按扫描分辨的量（费米能级、弛豫时间、
//! 输运系数）均以扫描下标 i 为键，而非物理值，因此顺序必须端到端保持。
//!
//! ## 依赖关系
//! - 被 `transport/`、`commands/` 使用

use crate::error::{Result, TeFilterError};
use crate::models::constants::PER_CM3_TO_PER_M3;
use crate::numerics::linspace;

use ndarray::{Array1, ArrayView1};

/// 单个扫描点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPoint {
    /// 温度 (K)
    pub temperature: f64,
    /// 目标载流子浓度 (m⁻³)
    pub concentration: f64,
}

/// 有序扫描轴
#[derive(Debug, Clone)]
pub struct Sweep {
    temperatures: Array1<f64>,
    concentrations: Array1<f64>,
}

impl Sweep {
    /// 由等长的温度与浓度序列构造
    pub fn new(temperatures: Vec<f64>, concentrations: Vec<f64>) -> Result<Self> {
        TeFilterError::check_len("sweep concentrations", temperatures.len(), concentrations.len())?;
        if temperatures.is_empty() {
            return Err(TeFilterError::InvalidRange("sweep is empty".to_string()));
        }
        if let Some(t) = temperatures.iter().find(|t| !(**t > 0.0) || !t.is_finite()) {
            return Err(TeFilterError::InvalidRange(format!(
                "temperature must be positive, got {}",
                t
            )));
        }
        if let Some(n) = concentrations.iter().find(|n| !(**n > 0.0) || !n.is_finite()) {
            return Err(TeFilterError::InvalidRange(format!(
                "carrier concentration must be positive, got {}",
                n
            )));
        }
        Ok(Self {
            temperatures: Array1::from(temperatures),
            concentrations: Array1::from(concentrations),
        })
    }

    /// 固定温度下、log10(n / cm⁻³) 等距的浓度扫描
    pub fn isothermal_log10(
        temperature: f64,
        log10_min: f64,
        log10_max: f64,
        points: usize,
    ) -> Result<Self> {
        if points == 0 || log10_max < log10_min {
            return Err(TeFilterError::InvalidRange(format!(
                "log10 concentration range [{}, {}] with {} points",
                log10_min, log10_max, points
            )));
        }
        let concentrations: Vec<f64> = linspace(log10_min, log10_max, points)
            .iter()
            .map(|p| 10f64.powf(*p) * PER_CM3_TO_PER_M3)
            .collect();
        Self::new(vec![temperature; points], concentrations)
    }

    pub fn len(&self) -> usize {
        self.temperatures.len()
    }

    pub fn point(&self, index: usize) -> SweepPoint {
        SweepPoint {
            temperature: self.temperatures[index],
            concentration: self.concentrations[index],
        }
    }

    pub fn points(&self) -> impl Iterator<Item = SweepPoint> + '_ {
        (0..self.len()).map(|i| self.point(i))
    }

    pub fn temperatures(&self) -> ArrayView1<'_, f64> {
        self.temperatures.view()
    }

    pub fn concentrations(&self) -> ArrayView1<'_, f64> {
        self.concentrations.view()
    }

    /// 检查按扫描分辨的数组长度
    pub fn check(&self, what: &str, len: usize) -> Result<()> {
        TeFilterError::check_len(what, self.len(), len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_isothermal_log10_sweep() {
        let sweep = Sweep::isothermal_log10(300.0, 19.0, 21.0, 3).unwrap();
        assert_eq!(sweep.len(), 3);
        assert_relative_eq!(sweep.point(0).concentration, 1e25, max_relative = 1e-12);
        assert_relative_eq!(sweep.point(1).concentration, 1e26, max_relative = 1e-12);
        assert_relative_eq!(sweep.point(2).concentration, 1e27, max_relative = 1e-12);
        assert!(sweep.points().all(|p| p.temperature == 300.0));
    }

    #[test]
    fn test_sweep_rejects_mismatched_axes() {
        assert!(matches!(
            Sweep::new(vec![300.0, 500.0], vec![1e25]),
            Err(TeFilterError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            Sweep::new(vec![0.0], vec![1e25]),
            Err(TeFilterError::InvalidRange(_))
        ));
    }
}
