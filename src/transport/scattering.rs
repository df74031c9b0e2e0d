//! # 散射弛豫时间
//!
//! 能量分辨的弛豫时间 τ(E) (s)，与能量网格共索引：
//! - 声学 / 光学形变势声子散射，带 Kane 非抛物修正
//! - 电离杂质散射：屏蔽、未屏蔽、强屏蔽三种形式
//! - Matthiessen 规则合并多种机制
//!
//! 电离杂质公式中对数自变量非正等情况产生的 NaN 一律映射为 τ = 0，
//! 即该能量处散射率无穷大、对输运无贡献。Matthiessen 合并时，
//! 任一输入为 0 的位置结果严格为 0。
//!
//! ## 依赖关系
//! - 被 `transport/filtering.rs`、`commands/pipeline.rs` 使用
//! - 使用 `models/`

use crate::error::{Result, TeFilterError};
use crate::models::constants::{E2C, EPS0, HBAR, KB};
use crate::models::{EnergyArray, EnergyGrid};

use ndarray::{Array1, ArrayView1, Zip};
use serde::Deserialize;
use std::f64::consts::PI;

/// 形变势 (eV)
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct DeformationPotentials {
    /// 价带形变势 Dv
    pub dv: f64,
    /// 声学形变势 DA
    pub da: f64,
}

impl Default for DeformationPotentials {
    fn default() -> Self {
        Self { dv: 2.94, da: 9.5 }
    }
}

/// 声子散射的抛物与非抛物弛豫时间
#[derive(Debug, Clone)]
pub struct PhononLifetime {
    pub parabolic: EnergyArray,
    pub nonparabolic: EnergyArray,
}

/// 形变势声子散射
///
/// τ = ρv²ħ/(π·kB·T·DA²·e·D(E))，非抛物修正因子
/// (1 − αE/(1+2αE)·(1 − Dv/DA))² − 8/3·αE(1+αE)/(1+2αE)²·Dv/DA 作除数。
pub fn phonon_lifetime(
    grid: &EnergyGrid,
    alpha: f64,
    potentials: DeformationPotentials,
    temperature: f64,
    sound_velocity: f64,
    dos: ArrayView1<f64>,
    density: f64,
) -> Result<PhononLifetime> {
    grid.check("DoS", dos)?;
    let DeformationPotentials { dv, da } = potentials;
    let prefactor =
        density * sound_velocity * sound_velocity * HBAR / PI / KB / temperature / (da * da) / E2C;

    let parabolic = dos.mapv(|d| prefactor / d);
    let correction = grid.map(|e| {
        let ae = alpha * e;
        let denom = 1.0 + 2.0 * ae;
        (1.0 - ae / denom * (1.0 - dv / da)).powi(2)
            - 8.0 / 3.0 * ae * (1.0 + ae) / (denom * denom) * (dv / da)
    });
    let nonparabolic = &parabolic / &correction;

    Ok(PhononLifetime {
        parabolic,
        nonparabolic,
    })
}

/// 电离杂质散射形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ImpurityModel {
    #[default]
    StronglyScreened,
    Screened,
    Unscreened,
}

impl std::fmt::Display for ImpurityModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ImpurityModel::StronglyScreened => "strongly-screened",
            ImpurityModel::Screened => "screened",
            ImpurityModel::Unscreened => "unscreened",
        };
        write!(f, "{}", name)
    }
}

/// 电离杂质散射的输入
#[derive(Debug, Clone, Copy)]
pub struct ImpurityParameters {
    /// 电导有效质量 (kg)
    pub effective_mass: f64,
    /// 屏蔽长度 (m)
    pub screening_length: f64,
    /// 杂质浓度 (m⁻³)
    pub concentration: f64,
    /// 相对介电常数
    pub dielectric: f64,
}

impl ImpurityModel {
    /// 按所选形式计算电离杂质弛豫时间
    pub fn lifetime(
        &self,
        grid: &EnergyGrid,
        dos: ArrayView1<f64>,
        params: &ImpurityParameters,
    ) -> Result<EnergyArray> {
        grid.check("DoS", dos)?;
        let tau = match self {
            ImpurityModel::StronglyScreened => strongly_screened_coulomb(
                dos,
                params.screening_length,
                params.concentration,
                params.dielectric,
            ),
            ImpurityModel::Screened => screened_coulomb(
                grid,
                params.effective_mass,
                params.screening_length,
                params.concentration,
                params.dielectric,
            ),
            ImpurityModel::Unscreened => unscreened_coulomb(
                grid,
                params.effective_mass,
                params.concentration,
                params.dielectric,
            ),
        };
        Ok(tau)
    }
}

/// NaN → 0
fn zero_nan(mut tau: EnergyArray, mechanism: &str) -> EnergyArray {
    let mut count = 0usize;
    tau.mapv_inplace(|t| {
        if t.is_nan() {
            count += 1;
            0.0
        } else {
            t
        }
    });
    if count > 0 {
        tracing::debug!(mechanism, count, "NaN lifetimes mapped to zero");
    }
    tau
}

/// Brooks–Herring 型屏蔽库仑散射
pub fn screened_coulomb(
    grid: &EnergyGrid,
    effective_mass: f64,
    screening_length: f64,
    concentration: f64,
    dielectric: f64,
) -> EnergyArray {
    let permittivity = 4.0 * PI * dielectric * EPS0;
    let tau = grid.map(|e| {
        let g = 8.0 * effective_mass * screening_length.powi(2) * e / (HBAR * HBAR) / E2C;
        let var = (1.0 + g).ln() - g / (1.0 + g);
        16.0 * PI * (2.0 * effective_mass).sqrt() * permittivity.powi(2) / concentration / var
            * e.powf(1.5)
            / E2C.powf(2.5)
    });
    zero_nan(tau, "screened Coulomb")
}

/// Conwell–Weisskopf 型未屏蔽库仑散射
pub fn unscreened_coulomb(
    grid: &EnergyGrid,
    effective_mass: f64,
    concentration: f64,
    dielectric: f64,
) -> EnergyArray {
    let permittivity = 4.0 * PI * dielectric * EPS0;
    let tau = grid.map(|e| {
        let g = 4.0 * PI * permittivity * e / concentration.cbrt() / E2C;
        let var = (1.0 + g * g).ln();
        16.0 * PI * (2.0 * effective_mass).sqrt() * permittivity.powi(2) / concentration / var
            * e.powf(1.5)
            / E2C.powf(2.5)
    });
    zero_nan(tau, "unscreened Coulomb")
}

/// 强屏蔽库仑散射 τ = ħ/(N·π·D·(LD²/(4πεε₀))²·e²)
pub fn strongly_screened_coulomb(
    dos: ArrayView1<f64>,
    screening_length: f64,
    concentration: f64,
    dielectric: f64,
) -> EnergyArray {
    let coupling = screening_length.powi(2) / (4.0 * PI * dielectric * EPS0);
    let tau = dos.mapv(|d| HBAR / concentration / PI / d / (coupling * coupling) / (E2C * E2C));
    zero_nan(tau, "strongly screened Coulomb")
}

/// 两个弛豫时间按 Matthiessen 规则合并；结果为 ∞ 时取 0
#[inline]
pub fn matthiessen_pair(a: f64, b: f64) -> f64 {
    let tau = 1.0 / (1.0 / a + 1.0 / b);
    if tau.is_infinite() {
        0.0
    } else {
        tau
    }
}

/// Matthiessen 规则 τ = (Σ 1/τᵢ)⁻¹，逐点
///
/// 任一输入为 0 的位置结果为 0；全部输入为 ∞ 的位置结果也为 0。
pub fn matthiessen(lifetimes: &[ArrayView1<f64>]) -> Result<EnergyArray> {
    let first = lifetimes.first().ok_or_else(|| {
        TeFilterError::InvalidArgument("Matthiessen rule needs at least one lifetime".to_string())
    })?;
    let len = first.len();
    for (i, tau) in lifetimes.iter().enumerate() {
        TeFilterError::check_len(&format!("lifetime #{}", i), len, tau.len())?;
    }

    let mut rate = Array1::<f64>::zeros(len);
    for tau in lifetimes {
        Zip::from(&mut rate).and(tau).for_each(|r, &t| *r += 1.0 / t);
    }
    Ok(rate.mapv(|r| {
        let tau = 1.0 / r;
        if tau.is_infinite() {
            0.0
        } else {
            tau
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_strongly_screened_regression() {
        let dos = Array1::from_elem(3, 1e45);
        let tau = strongly_screened_coulomb(dos.view(), 1e-9, 1e25, 11.7);
        for t in tau.iter() {
            assert!(*t > 0.0);
            assert_relative_eq!(*t, 1.383197049790767e-30, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_screened_coulomb_nan_maps_to_zero() {
        // E = 0: g = 0 → var = 0, E^{3/2} = 0 → 0/0
        let grid = EnergyGrid::new(0.0, 0.5, 6).unwrap();
        let tau = screened_coulomb(&grid, 0.26 * crate::models::constants::ME, 5e-9, 1e25, 11.7);
        assert_eq!(tau[0], 0.0);
        assert!(tau.iter().skip(1).all(|t| t.is_finite() && *t > 0.0));
    }

    #[test]
    fn test_unscreened_coulomb_nan_maps_to_zero() {
        let grid = EnergyGrid::new(0.0, 0.5, 6).unwrap();
        let tau = unscreened_coulomb(&grid, 0.26 * crate::models::constants::ME, 1e25, 11.7);
        assert_eq!(tau[0], 0.0);
        assert!(tau.iter().all(|t| !t.is_nan()));
    }

    #[test]
    fn test_phonon_nonparabolic_reduces_to_parabolic() {
        let grid = EnergyGrid::new(0.01, 1.0, 50).unwrap();
        let dos = grid.map(|e| 1e27 * e.sqrt());
        let p = phonon_lifetime(
            &grid,
            0.0,
            DeformationPotentials::default(),
            300.0,
            6486.77,
            dos.view(),
            2329.0,
        )
        .unwrap();
        for (a, b) in p.parabolic.iter().zip(p.nonparabolic.iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_phonon_correction_factor_at_one_ev() {
        let grid = EnergyGrid::new(0.0, 1.0, 2).unwrap();
        let dos = Array1::from_elem(2, 1e27);
        let p = phonon_lifetime(
            &grid,
            0.5,
            DeformationPotentials { dv: 2.94, da: 9.5 },
            300.0,
            6486.77,
            dos.view(),
            2329.0,
        )
        .unwrap();
        // αE = 0.5: (1 − 0.25·(1 − r))² − 8/3·0.75/4·r, r = Dv/DA
        let r: f64 = 2.94 / 9.5;
        let factor = (1.0 - 0.25 * (1.0 - r)).powi(2) - 8.0 / 3.0 * 0.75 / 4.0 * r;
        assert_relative_eq!(p.nonparabolic[1], p.parabolic[1] / factor, max_relative = 1e-12);
    }

    #[test]
    fn test_phonon_rejects_misaligned_dos() {
        let grid = EnergyGrid::new(0.0, 1.0, 10).unwrap();
        let dos = Array1::from_elem(9, 1e27);
        let err = phonon_lifetime(
            &grid,
            0.5,
            DeformationPotentials::default(),
            300.0,
            6486.77,
            dos.view(),
            2329.0,
        );
        assert!(matches!(err, Err(TeFilterError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_matthiessen_zero_lifetime_dominates() {
        let a = Array1::from(vec![1e-14, 2e-14, 3e-14]);
        let zero = Array1::zeros(3);
        let tau = matthiessen(&[a.view(), zero.view()]).unwrap();
        assert!(tau.iter().all(|t| *t == 0.0));
    }

    #[test]
    fn test_matthiessen_all_infinite_is_zero() {
        let inf = Array1::from_elem(2, f64::INFINITY);
        let tau = matthiessen(&[inf.view(), inf.view()]).unwrap();
        assert!(tau.iter().all(|t| *t == 0.0));
        assert_eq!(matthiessen_pair(f64::INFINITY, f64::INFINITY), 0.0);
    }

    #[test]
    fn test_matthiessen_shape_mismatch() {
        let a = Array1::from_elem(3, 1.0);
        let b = Array1::from_elem(4, 1.0);
        assert!(matches!(
            matthiessen(&[a.view(), b.view()]),
            Err(TeFilterError::ShapeMismatch { .. })
        ));
        assert!(matches!(matthiessen(&[]), Err(TeFilterError::InvalidArgument(_))));
    }

    fn lifetimes() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(1e-16f64..1e-12, 8)
    }

    proptest! {
        #[test]
        fn test_matthiessen_single_is_identity(a in lifetimes()) {
            let a = Array1::from(a);
            let tau = matthiessen(&[a.view()]).unwrap();
            for (x, y) in tau.iter().zip(a.iter()) {
                prop_assert!((x - y).abs() <= 1e-15 * y);
            }
        }

        #[test]
        fn test_matthiessen_commutative_associative(
            a in lifetimes(),
            b in lifetimes(),
            c in lifetimes(),
        ) {
            let (a, b, c) = (Array1::from(a), Array1::from(b), Array1::from(c));
            let abc = matthiessen(&[a.view(), b.view(), c.view()]).unwrap();
            let cba = matthiessen(&[c.view(), b.view(), a.view()]).unwrap();
            let ab = matthiessen(&[a.view(), b.view()]).unwrap();
            let ab_c = matthiessen(&[ab.view(), c.view()]).unwrap();
            let again = matthiessen(&[a.view(), b.view(), c.view()]).unwrap();
            for i in 0..abc.len() {
                prop_assert!((abc[i] - cba[i]).abs() <= 1e-12 * abc[i]);
                prop_assert!((abc[i] - ab_c[i]).abs() <= 1e-12 * abc[i]);
                prop_assert_eq!(abc[i], again[i]);
            }
        }
    }
}
