//! # 输运系数
//!
//! Boltzmann 输运方程弛豫时间近似下的矩积分。记
//! X(E) = DoS·v_g²·df/dE，Y = (E − Ef)·X，Z = (E − Ef)·Y，全部积分以
//! 能量网格为积分变量、采用梯形公式：
//!
//! - σ = −(1/3)·e·∫Xτ
//! - S = −∫Yτ / ∫Xτ / T
//! - PF = σ·S²
//! - κₑ = −(∫Zτ − (∫Yτ)²/∫Xτ) / (3T) · e
//! - δ₁ = ∫XτE / ∫Xτ，δ₂ = ∫XτE² / ∫Xτ
//! - L = (δ₂ − δ₁²) / T²
//!
//! ∫Xτ 趋于 0（载流子贡献消失）时 S、κₑ、δ₁、δ₂、L 按 IEEE 规则得到
//! NaN 或 ±∞，不做截断，仅记录警告。
//!
//! ## 依赖关系
//! - 被 `transport/filtering.rs`、`commands/` 使用
//! - 使用 `models/grid.rs`

use crate::error::Result;
use crate::models::constants::E2C;
use crate::models::EnergyGrid;

use ndarray::{Array1, ArrayView1, Zip};
use serde::Serialize;

/// 单个扫描点的输运系数
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TransportCoefficients {
    /// 电导率 σ (S/m)
    pub conductivity: f64,
    /// Seebeck 系数 S (V/K)
    pub seebeck: f64,
    /// 功率因子 σS² (W/m/K²)
    pub power_factor: f64,
    /// 电子热导率 κₑ (W/m/K)
    pub thermal_conductivity: f64,
    /// 一阶能量矩 δ₁ (eV)
    pub delta1: f64,
    /// 二阶能量矩 δ₂ (eV²)
    pub delta2: f64,
    /// Lorenz 数
    pub lorenz: f64,
}

/// 一个扫描点的输运积分输入，全部与能量网格共索引
#[derive(Debug, Clone, Copy)]
pub struct TransportInputs<'a> {
    pub grid: &'a EnergyGrid,
    pub dos: ArrayView1<'a, f64>,
    pub group_velocity: ArrayView1<'a, f64>,
    pub fermi_level: f64,
    pub dfde: ArrayView1<'a, f64>,
    pub temperature: f64,
}

impl<'a> TransportInputs<'a> {
    /// 检查各能量分辨数组与网格共索引
    pub fn check(&self) -> Result<()> {
        self.grid.check("DoS", self.dos)?;
        self.grid.check("group velocity", self.group_velocity)?;
        self.grid.check("dfdE", self.dfde)
    }

    /// X(E) = DoS·v_g²·df/dE
    pub fn kernel(&self) -> Array1<f64> {
        let mut x = Array1::<f64>::zeros(self.grid.len());
        Zip::from(&mut x)
            .and(&self.dos)
            .and(&self.group_velocity)
            .and(&self.dfde)
            .for_each(|x, &d, &v, &f| *x = d * v * v * f);
        x
    }
}

/// 按给定的弛豫时间求输运系数
pub fn compute_coefficients(
    inputs: &TransportInputs<'_>,
    lifetime: ArrayView1<f64>,
) -> Result<TransportCoefficients> {
    inputs.check()?;
    inputs.grid.check("lifetime", lifetime)?;
    Ok(integrate(inputs, &inputs.kernel(), lifetime))
}

/// 已知 X(E) 时的矩积分；调用方保证共索引
pub(crate) fn integrate(
    inputs: &TransportInputs<'_>,
    kernel: &Array1<f64>,
    lifetime: ArrayView1<f64>,
) -> TransportCoefficients {
    let grid = inputs.grid;
    let energies = grid.energies();
    let ef = inputs.fermi_level;
    let t = inputs.temperature;

    let n = grid.len();
    let mut xt = Array1::<f64>::zeros(n);
    let mut yt = Array1::<f64>::zeros(n);
    let mut zt = Array1::<f64>::zeros(n);
    let mut xte = Array1::<f64>::zeros(n);
    let mut xte2 = Array1::<f64>::zeros(n);
    for i in 0..n {
        let e = energies[i];
        let de = e - ef;
        let x = kernel[i] * lifetime[i];
        xt[i] = x;
        yt[i] = de * x;
        zt[i] = de * de * x;
        xte[i] = e * x;
        xte2[i] = e * e * x;
    }

    let ix = grid.integrate(xt.view());
    let iy = grid.integrate(yt.view());
    let iz = grid.integrate(zt.view());
    let ie = grid.integrate(xte.view());
    let ie2 = grid.integrate(xte2.view());

    if ix == 0.0 || !ix.is_finite() {
        tracing::warn!(
            fermi_level = ef,
            temperature = t,
            integral = ix,
            "vanishing carrier contribution, transport ratios are not finite"
        );
    }

    let conductivity = -ix / 3.0 * E2C;
    let seebeck = -iy / ix / t;
    let power_factor = conductivity * seebeck * seebeck;
    let thermal_conductivity = -(iz - iy * iy / ix) / t / 3.0 * E2C;
    let delta1 = ie / ix;
    let delta2 = ie2 / ix;
    let lorenz = (delta2 - delta1 * delta1) / t / t;

    TransportCoefficients {
        conductivity,
        seebeck,
        power_factor,
        thermal_conductivity,
        delta1,
        delta2,
        lorenz,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::constants::KB;
    use crate::transport::carriers::fermi_dirac;
    use approx::assert_relative_eq;

    fn flat_band(grid: &EnergyGrid) -> (Array1<f64>, Array1<f64>) {
        (
            Array1::from_elem(grid.len(), 1e27),
            Array1::from_elem(grid.len(), 2e5),
        )
    }

    #[test]
    fn test_seebeck_nondegenerate_limit() {
        // 常数 DoS、v_g、τ，Ef 远低于带底：⟨E − Ef⟩ = kBT − Ef，
        // S ≈ −(kBT − Ef)/T，容差 1%
        let grid = EnergyGrid::new(0.0, 1.0, 4001).unwrap();
        let (dos, vg) = flat_band(&grid);
        let t = 300.0;
        let ef = -0.3;
        let fd = fermi_dirac(&grid, ef, t);
        let inputs = TransportInputs {
            grid: &grid,
            dos: dos.view(),
            group_velocity: vg.view(),
            fermi_level: ef,
            dfde: fd.derivative.view(),
            temperature: t,
        };
        let tau = Array1::from_elem(grid.len(), 1e-14);
        let c = compute_coefficients(&inputs, tau.view()).unwrap();

        let expected = -(KB * t - ef) / t;
        assert_relative_eq!(c.seebeck, expected, max_relative = 1e-2);
        assert!(c.conductivity > 0.0);
        assert!(c.power_factor > 0.0);
        assert_relative_eq!(c.power_factor, c.conductivity * c.seebeck * c.seebeck);
        // 指数分布：方差 (kBT)²
        assert_relative_eq!(c.lorenz, (KB * t).powi(2) / (t * t), max_relative = 2e-2);
    }

    #[test]
    fn test_lifetime_misaligned_with_grid() {
        let grid = EnergyGrid::new(0.0, 1.0, 101).unwrap();
        let (dos, vg) = flat_band(&grid);
        let fd = fermi_dirac(&grid, 0.1, 300.0);
        let inputs = TransportInputs {
            grid: &grid,
            dos: dos.view(),
            group_velocity: vg.view(),
            fermi_level: 0.1,
            dfde: fd.derivative.view(),
            temperature: 300.0,
        };
        let tau = Array1::from_elem(100, 1e-14);
        assert!(compute_coefficients(&inputs, tau.view()).is_err());
    }

    #[test]
    fn test_zero_lifetime_gives_nan_ratios() {
        let grid = EnergyGrid::new(0.0, 1.0, 101).unwrap();
        let (dos, vg) = flat_band(&grid);
        let fd = fermi_dirac(&grid, 0.1, 300.0);
        let inputs = TransportInputs {
            grid: &grid,
            dos: dos.view(),
            group_velocity: vg.view(),
            fermi_level: 0.1,
            dfde: fd.derivative.view(),
            temperature: 300.0,
        };
        let tau = Array1::zeros(grid.len());
        let c = compute_coefficients(&inputs, tau.view()).unwrap();
        assert_eq!(c.conductivity, 0.0);
        assert!(c.seebeck.is_nan());
        assert!(c.lorenz.is_nan());
    }
}
