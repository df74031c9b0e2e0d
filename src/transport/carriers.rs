//! # 载流子统计
//!
//! - Joyce–Dixon 解析费米能级初值
//! - 数值稳定的费米-狄拉克占据数及其能量导数（"费米窗口"）
//! - 以密集候选集最近匹配的方式求自洽费米能级
//! - 本征 + 外来载流子浓度、有效态密度、屏蔽长度
//!
//! 自洽搜索不是基于导数的求根：在初值两侧 `half_width` 内取 `points`
//! 个候选，对每个候选求 |∫DoS·f dE|，取与目标浓度差的绝对值最小者，
//! 并列时取能量最低（最先遇到）的候选。若窗口未包住目标浓度，
//! 窗口按 2 倍扩展（候选数同步加倍，分辨率不变），
//! 超过 `max_widenings` 次后返回 `NoConvergence`。
//!
//! ## 依赖关系
//! - 被 `commands/pipeline.rs`、`transport/filtering.rs` 测试使用
//! - 使用 `models/`、`numerics/`、`parsers/tables.rs`

use crate::error::{Result, TeFilterError};
use crate::models::constants::{E2C, EPS0, HBAR, KB};
use crate::models::{EnergyArray, EnergyGrid, MaterialModel};
use crate::numerics::linspace;
use crate::parsers::ExtrinsicCarrierTable;

use ndarray::{Array1, ArrayView1, Zip};
use serde::Deserialize;
use std::f64::consts::PI;

/// Joyce–Dixon 解析费米能级 (eV)，Nc = A·T^{3/2}
pub fn joyce_dixon(concentration: f64, temperature: f64, nc_prefactor: f64) -> Result<f64> {
    if !(concentration > 0.0) {
        return Err(TeFilterError::InvalidRange(format!(
            "Joyce-Dixon estimate requires a positive concentration, got {}",
            concentration
        )));
    }
    let nc = nc_prefactor * temperature.powf(1.5);
    let r = concentration / nc;
    let eta = r.ln() + r / 8f64.sqrt() - (3.0 / 16.0 - 3f64.sqrt() / 9.0) * r * r;
    Ok(KB * temperature * eta)
}

/// 费米-狄拉克占据数与 df/dE，与能量网格共索引
#[derive(Debug, Clone)]
pub struct FermiDirac {
    pub occupation: EnergyArray,
    pub derivative: EnergyArray,
}

/// 单点占据数 1/(1 + e^x)，x = (E − Ef)/kBT
///
/// 按 x 的符号分支，避免 e^x 上溢；x = 0 时严格为 0.5。
/// 严格的 0 < f < 1 只在 |x| ≲ 745 内成立：更大的 x 下 e^{−x} 下溢，f 恰为 0.0；
/// x ≲ −37 时 f 舍入为 1.0。对输运积分无影响。
#[inline]
pub fn occupation(x: f64) -> f64 {
    if x >= 0.0 {
        let ex = (-x).exp();
        ex / (1.0 + ex)
    } else {
        1.0 / (1.0 + x.exp())
    }
}

/// 网格上的费米-狄拉克分布及其导数 df/dE = −f(1 − f)/kBT
pub fn fermi_dirac(grid: &EnergyGrid, fermi_level: f64, temperature: f64) -> FermiDirac {
    let kt = KB * temperature;
    let occupation = grid.map(|e| occupation((e - fermi_level) / kt));
    let derivative = occupation.mapv(|f| -f * (1.0 - f) / kt);
    FermiDirac {
        occupation,
        derivative,
    }
}

/// 载流子浓度 ∫DoS·f dE (m⁻³)
pub fn carrier_density(grid: &EnergyGrid, dos: ArrayView1<f64>, fermi_level: f64, temperature: f64) -> f64 {
    let kt = KB * temperature;
    let energies = grid.energies();
    let mut integrand = Array1::<f64>::zeros(grid.len());
    Zip::from(&mut integrand)
        .and(&energies)
        .and(&dos)
        .for_each(|out, &e, &d| *out = d * occupation((e - fermi_level) / kt));
    grid.integrate(integrand.view())
}

/// 自洽费米能级搜索参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FermiSearch {
    /// 初始窗口半宽 (eV)
    pub half_width: f64,
    /// 初始窗口候选数
    pub points: usize,
    /// 最大扩展次数
    pub max_widenings: u32,
}

impl Default for FermiSearch {
    fn default() -> Self {
        Self {
            half_width: 0.2,
            points: 4000,
            max_widenings: 4,
        }
    }
}

/// 自洽费米能级结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FermiSolution {
    /// 费米能级 (eV)
    pub fermi_level: f64,
    /// 该费米能级实际给出的浓度 (m⁻³)
    pub concentration: f64,
    /// 在最终候选集中的下标
    pub index: usize,
}

impl FermiSearch {
    /// 求满足 ∫DoS·f dE ≈ 目标浓度的费米能级
    pub fn solve(
        &self,
        target: f64,
        temperature: f64,
        grid: &EnergyGrid,
        dos: ArrayView1<f64>,
        initial_guess: f64,
    ) -> Result<FermiSolution> {
        grid.check("DoS", dos)?;
        if self.points < 2 || !(self.half_width > 0.0) {
            return Err(TeFilterError::InvalidArgument(format!(
                "Fermi search needs half_width > 0 and at least 2 points, got {} / {}",
                self.half_width, self.points
            )));
        }

        let mut half_width = self.half_width;
        let mut points = self.points;
        for attempt in 0..=self.max_widenings {
            let candidates = linspace(initial_guess - half_width, initial_guess + half_width, points);
            let realized: Vec<f64> = candidates
                .iter()
                .map(|ef| carrier_density(grid, dos, *ef, temperature).abs())
                .collect();

            let lowest = realized.iter().cloned().fold(f64::INFINITY, f64::min);
            let highest = realized.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

            if lowest <= target && target <= highest {
                let index = nearest_index(&realized, target);
                tracing::debug!(
                    index,
                    attempt,
                    fermi_level = candidates[index],
                    "self-consistent Fermi level selected"
                );
                return Ok(FermiSolution {
                    fermi_level: candidates[index],
                    concentration: realized[index],
                    index,
                });
            }

            if attempt < self.max_widenings {
                tracing::warn!(
                    target,
                    lowest,
                    highest,
                    half_width,
                    "Fermi search window does not bracket the target concentration, widening"
                );
            }
            half_width *= 2.0;
            points = points.saturating_mul(2);
        }

        half_width /= 2.0;
        Err(TeFilterError::NoConvergence {
            target,
            initial_half_width: self.half_width,
            widenings: self.max_widenings,
            window_low: initial_guess - half_width,
            window_high: initial_guess + half_width,
        })
    }
}

/// 与目标差值绝对值最小的下标，并列取最小下标
fn nearest_index(values: &[f64], target: f64) -> usize {
    let mut best = 0;
    let mut best_diff = f64::INFINITY;
    for (i, v) in values.iter().enumerate() {
        let diff = (target - v).abs();
        if diff < best_diff {
            best = i;
            best_diff = diff;
        }
    }
    best
}

/// 本征载流子浓度 √(NcNv)·exp(−Eg/2kBT) (m⁻³)
pub fn intrinsic_concentration(material: &MaterialModel, temperature: f64) -> f64 {
    let t15 = temperature.powf(1.5);
    let nc = material.nc_prefactor * t15;
    let nv = material.nv_prefactor * t15;
    (nc * nv).sqrt() * (-material.band_gap.at(temperature) / (2.0 * KB * temperature)).exp()
}

/// 总载流子浓度：本征 + |外来|
pub fn total_concentration(
    material: &MaterialModel,
    extrinsic: &ExtrinsicCarrierTable,
    temperature: f64,
) -> f64 {
    intrinsic_concentration(material, temperature) + extrinsic.concentration_at(temperature).abs()
}

/// 导带有效态密度 Nc = 2(m_cb·kB·T/(2πħ²)/e)^{3/2} (m⁻³)
pub fn effective_density_of_states(material: &MaterialModel, temperature: f64) -> f64 {
    let m = material.conduction_band_mass_at(temperature);
    2.0 * (m * KB * temperature / (HBAR * HBAR) / (2.0 * PI) / E2C).powf(1.5)
}

/// 非简并 Debye 屏蔽长度 √(4πεε₀kBT/(e·n)) (m)
pub fn nondegenerate_screening_length(dielectric: f64, temperature: f64, concentration: f64) -> f64 {
    (4.0 * PI * dielectric * EPS0 * KB / E2C * temperature / concentration).sqrt()
}

/// 简并屏蔽长度 (Nc·e/(εε₀kBT)·(F₁ + 15αkBT/4·F₀))^{-1/2} (m)
///
/// `f0`、`f1` 为该扫描点上的 0 阶、1 阶费米积分。
pub fn degenerate_screening_length(
    effective_dos: f64,
    dielectric: f64,
    alpha: f64,
    temperature: f64,
    f0: f64,
    f1: f64,
) -> f64 {
    let kt = KB * temperature;
    let bracket = f1 + 15.0 * alpha * kt / 4.0 * f0;
    (1.0 / (effective_dos / dielectric / EPS0 / kt * E2C * bracket)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_occupation_at_fermi_level_is_half() {
        let grid = EnergyGrid::new(-0.5, 0.5, 101).unwrap();
        let fd = fermi_dirac(&grid, 0.0, 300.0);
        assert_eq!(fd.occupation[50], 0.5);
        assert_eq!(occupation(0.0), 0.5);
    }

    #[test]
    fn test_occupation_no_overflow() {
        assert_eq!(occupation(1e4), 0.0);
        assert_eq!(occupation(-1e4), 1.0);
        let grid = EnergyGrid::new(0.0, 1.0, 11).unwrap();
        let fd = fermi_dirac(&grid, -50.0, 10.0);
        assert!(fd.occupation.iter().all(|f| f.is_finite()));
        assert!(fd.derivative.iter().all(|d| d.is_finite()));
    }

    #[test]
    fn test_joyce_dixon_requires_positive_concentration() {
        assert!(matches!(
            joyce_dixon(0.0, 300.0, 5.3e21),
            Err(TeFilterError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_joyce_dixon_nondegenerate_limit() {
        // n ≪ Nc 时 Ef ≈ kBT·ln(n/Nc)
        let t: f64 = 300.0;
        let nc = 5.3e21 * t.powf(1.5);
        let ef = joyce_dixon(1e20, t, 5.3e21).unwrap();
        assert_relative_eq!(ef, KB * t * (1e20 / nc).ln(), max_relative = 1e-4);
    }

    #[test]
    fn test_self_consistent_constant_dos() {
        // 常数 DoS：∫D·f dE = D·kBT·ln(1 + e^{(Ef − Emin)/kBT}) 在 Emax 足够大时
        let grid = EnergyGrid::new(0.0, 1.0, 2001).unwrap();
        let d0 = 1e27;
        let dos = Array1::from_elem(grid.len(), d0);
        let t = 300.0;
        let kt = KB * t;
        let ef_true = 0.05;
        let target = d0 * kt * (1.0 + (ef_true / kt).exp()).ln();

        let search = FermiSearch::default();
        let sol = search.solve(target, t, &grid, dos.view(), 0.0).unwrap();
        assert!((sol.fermi_level - ef_true).abs() < 1e-3);

        let realized = carrier_density(&grid, dos.view(), sol.fermi_level, t);
        let step = 2.0 * search.half_width / (search.points - 1) as f64;
        let tolerance = d0 * step + d0 * grid.spacing().powi(2);
        assert!((realized - target).abs() <= tolerance);
    }

    #[test]
    fn test_self_consistent_is_deterministic() {
        let grid = EnergyGrid::new(0.0, 1.0, 501).unwrap();
        let dos = grid.map(|e| 1e27 * e.sqrt());
        let search = FermiSearch {
            half_width: 0.2,
            points: 400,
            max_widenings: 0,
        };
        let a = search.solve(1e25, 500.0, &grid, dos.view(), -0.05).unwrap();
        let b = search.solve(1e25, 500.0, &grid, dos.view(), -0.05).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_nearest_index_prefers_lowest_energy_on_tie() {
        assert_eq!(nearest_index(&[1.0, 3.0, 5.0, 3.0], 4.0), 1);
    }

    #[test]
    fn test_self_consistent_widens_window() {
        let grid = EnergyGrid::new(0.0, 1.0, 1001).unwrap();
        let dos = Array1::from_elem(grid.len(), 1e27);
        let t = 300.0;
        let target = carrier_density(&grid, dos.view(), 0.3, t);
        let search = FermiSearch {
            half_width: 0.05,
            points: 200,
            max_widenings: 4,
        };
        let sol = search.solve(target, t, &grid, dos.view(), 0.0).unwrap();
        assert!((sol.fermi_level - 0.3).abs() < 2e-3);
    }

    #[test]
    fn test_self_consistent_reports_no_convergence() {
        let grid = EnergyGrid::new(0.0, 1.0, 201).unwrap();
        let dos = Array1::from_elem(grid.len(), 1e27);
        let search = FermiSearch {
            half_width: 0.01,
            points: 20,
            max_widenings: 1,
        };
        let err = search.solve(1e40, 300.0, &grid, dos.view(), 0.0);
        match err {
            Err(TeFilterError::NoConvergence {
                initial_half_width,
                widenings,
                window_low,
                window_high,
                ..
            }) => {
                assert_eq!(initial_half_width, 0.01);
                assert_eq!(widenings, 1);
                assert_relative_eq!(window_low, -0.02);
                assert_relative_eq!(window_high, 0.02);
            }
            other => panic!("expected NoConvergence, got {:?}", other),
        }
    }

    #[test]
    fn test_no_convergence_message_names_search_history() {
        let err = TeFilterError::NoConvergence {
            target: 1e40,
            initial_half_width: 0.01,
            widenings: 3,
            window_low: -0.08,
            window_high: 0.08,
        };
        let msg = err.to_string();
        assert!(msg.contains("initial half-width 0.0100 eV"));
        assert!(msg.contains("3 widening(s)"));
    }

    #[test]
    fn test_occupation_strict_bounds_range() {
        assert!(occupation(700.0) > 0.0);
        assert_eq!(occupation(800.0), 0.0);
        assert!(occupation(-30.0) < 1.0);
        assert_eq!(occupation(-40.0), 1.0);
    }

    #[test]
    fn test_nondegenerate_screening_length() {
        let ld = nondegenerate_screening_length(11.7, 300.0, 1e24);
        let expected = (4.0 * PI * 11.7 * EPS0 * KB / E2C * 300.0 / 1e24).sqrt();
        assert_relative_eq!(ld, expected);
        assert!(ld > 0.0 && ld < 1e-7);
    }

    #[test]
    fn test_effective_density_of_states_silicon_scale() {
        let nc = effective_density_of_states(&MaterialModel::silicon(), 300.0);
        // m_cb ≈ 0.245 mₑ → Nc ~ 3e24 m⁻³
        assert!(nc > 1e24 && nc < 1e25);
    }

    #[test]
    fn test_intrinsic_concentration_grows_with_temperature() {
        let si = MaterialModel::silicon();
        assert!(intrinsic_concentration(&si, 600.0) > intrinsic_concentration(&si, 300.0));
    }

    proptest! {
        #[test]
        fn test_fermi_dirac_bounds(
            e in -1.0f64..1.0,
            ef in -0.5f64..0.5,
            t in 100.0f64..1500.0,
        ) {
            let x = (e - ef) / (KB * t);
            prop_assume!(x.abs() < 30.0);
            let f = occupation(x);
            prop_assert!(f > 0.0 && f < 1.0);
            let d = -f * (1.0 - f) / (KB * t);
            prop_assert!(d < 0.0);
        }
    }
}
