//! # 能带派生量
//!
//! 由离散能带数据构造连续的能量分辨函数：
//! - 导带能谷段的选取（沿 k 路径的局部极大到极小）
//! - 数值微分得到的群速度 v_g(E)
//! - 解析态密度（抛物 / Kane 非抛物）
//! - 椭球非抛物能谷上的解析群速度
//! - 以能谷为中心的 k 点网格（解析群速度与纳米颗粒散射共用）
//!
//! ## 依赖关系
//! - 被 `transport/nanoparticle.rs`、`commands/pipeline.rs` 使用
//! - 使用 `numerics/`、`models/`

use crate::error::{Result, TeFilterError};
use crate::models::constants::{E2C, HBAR, KB};
use crate::models::{EnergyArray, EnergyGrid};
use crate::numerics::{unique_mean, CubicSpline, Interpolate, Pchip};

use ndarray::ArrayView1;
use serde::Deserialize;
use std::f64::consts::PI;

/// 沿 k 路径的单调能谷段，按能量升序排列
#[derive(Debug, Clone)]
pub struct ValleySegment {
    /// k 点模长 (1/m)
    pub k: Vec<f64>,
    /// 相对能带极小的能量 (eV)
    pub energies: Vec<f64>,
}

/// 在 k 下标窗口 `[start, end)` 内选取能带从局部极大到局部极小的一段
///
/// 能量以窗口内极小值为零点，结果按能量升序（稳定排序）。
pub fn select_valley_segment(
    k_magnitudes: ArrayView1<f64>,
    band: ArrayView1<f64>,
    start: usize,
    end: usize,
) -> Result<ValleySegment> {
    TeFilterError::check_len("band energies", k_magnitudes.len(), band.len())?;
    if start >= end || end > band.len() {
        return Err(TeFilterError::InvalidRange(format!(
            "valley window [{}, {}) invalid for {} k-points",
            start,
            end,
            band.len()
        )));
    }

    let window = band.slice(ndarray::s![start..end]);
    let mut i_max = 0;
    let mut i_min = 0;
    for (i, e) in window.iter().enumerate() {
        if *e > window[i_max] {
            i_max = i;
        }
        if *e < window[i_min] {
            i_min = i;
        }
    }

    let band_minimum = window[i_min];
    let (lo, hi) = if i_max <= i_min {
        (start + i_max, start + i_min)
    } else {
        (start + i_min, start + i_max)
    };

    let mut pairs: Vec<(f64, f64)> = (lo..=hi)
        .map(|i| (k_magnitudes[i], band[i] - band_minimum))
        .collect();
    pairs.sort_by(|a, b| a.1.total_cmp(&b.1));

    tracing::debug!(lo, hi, band_minimum, "valley segment selected");

    let (k, energies) = pairs.into_iter().unzip();
    Ok(ValleySegment { k, energies })
}

/// 数值微分群速度 (m/s)，在能量网格上制表
///
/// 内点取中心差分，两端取单侧差分；对 (E, dE/dk) 按唯一能量取平均后
/// 以三次样条拟合，再除以 ħ。
pub fn group_velocity(segment: &ValleySegment, grid: &EnergyGrid) -> Result<EnergyArray> {
    let k = &segment.k;
    let e = &segment.energies;
    TeFilterError::check_len("valley segment energies", k.len(), e.len())?;

    let n = e.len();
    if n < 3 {
        return Err(TeFilterError::DegenerateSegment(format!(
            "group velocity needs at least 3 samples, got {}",
            n
        )));
    }

    let mut dedk = vec![0.0; n];
    dedk[0] = (e[1] - e[0]) / (k[1] - k[0]);
    dedk[n - 1] = (e[n - 1] - e[n - 2]) / (k[n - 1] - k[n - 2]);
    for i in 1..n - 1 {
        dedk[i] = (e[i + 1] - e[i - 1]) / (k[i + 1] - k[i - 1]);
    }

    let (ec, slope) = unique_mean(e, &dedk);
    if ec.len() < 3 {
        return Err(TeFilterError::DegenerateSegment(format!(
            "only {} distinct energies with finite dE/dk",
            ec.len()
        )));
    }

    let spline = CubicSpline::new(&ec, &slope)?;
    Ok(spline.sample(grid.energies()) / HBAR)
}

/// 抛物带解析态密度 √E·√2·m^{3/2}/(π²ħ³)/e^{3/2}
pub fn parabolic_dos(grid: &EnergyGrid, effective_mass_kg: f64) -> EnergyArray {
    let prefactor = 2f64.sqrt() / (PI * PI) / HBAR.powi(3) * effective_mass_kg.powf(1.5)
        / E2C.powf(1.5);
    grid.map(|e| e.max(0.0).sqrt() * prefactor)
}

/// Kane 非抛物带解析态密度
pub fn nonparabolic_dos(grid: &EnergyGrid, effective_mass_kg: f64, alpha: f64) -> EnergyArray {
    let mass_term = (effective_mass_kg / (HBAR * HBAR)).sqrt().powi(3);
    grid.map(|e| {
        let e = e.max(0.0);
        (2.0 * e * (1.0 + alpha * e)).sqrt() * mass_term * (1.0 + 2.0 * alpha * e)
            / (PI * PI)
            / E2C.powf(1.5)
    })
}

/// k 点网格参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KMeshConfig {
    /// 各方向 k 点数
    pub counts: [usize; 3],
    /// 能谷中心（2π/a 为单位）
    pub valley: [f64; 3],
    /// 网格边长（2π/a 为单位）
    pub extent: f64,
}

impl Default for KMeshConfig {
    fn default() -> Self {
        Self {
            counts: [40, 40, 40],
            valley: [0.85, 0.0, 0.0],
            extent: 0.1,
        }
    }
}

/// 以能谷为起点的矩形 k 点网格 (1/m)
#[derive(Debug, Clone)]
pub struct KMesh {
    origin: [f64; 3],
    points: Vec<[f64; 3]>,
}

impl KMesh {
    pub fn new(lattice_parameter: f64, config: &KMeshConfig) -> Result<Self> {
        if config.counts.iter().any(|&c| c < 2) {
            return Err(TeFilterError::InvalidRange(format!(
                "k-mesh needs at least 2 points per axis, got {:?}",
                config.counts
            )));
        }
        let unit = 2.0 * PI / lattice_parameter;
        let origin = config.valley.map(|v| v * unit);
        let step = config.extent * unit;

        let axes: Vec<ndarray::Array1<f64>> = (0..3)
            .map(|d| crate::numerics::linspace(origin[d], origin[d] + step, config.counts[d]))
            .collect();

        let mut points = Vec::with_capacity(config.counts.iter().product());
        for &kx in axes[0].iter() {
            for &ky in axes[1].iter() {
                for &kz in axes[2].iter() {
                    points.push([kx, ky, kz]);
                }
            }
        }
        Ok(Self { origin, points })
    }

    /// 能谷中心 k₀
    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// 椭球抛物色散 E = ħ²/2·Σ(k−k₀)²/m (eV)，质量单位 kg
    pub fn energy(&self, k: &[f64; 3], masses_kg: [f64; 3]) -> f64 {
        let sum: f64 = (0..3)
            .map(|d| (k[d] - self.origin[d]).powi(2) / masses_kg[d])
            .sum();
        HBAR * HBAR / 2.0 * sum * E2C
    }

    /// 全部网格点上的能量
    pub fn energies(&self, masses_kg: [f64; 3]) -> Vec<f64> {
        self.points
            .iter()
            .map(|k| self.energy(k, masses_kg))
            .collect()
    }
}

/// 温度 T 下椭球非抛物能谷的解析群速度 (m/s)
///
/// 带边质量随温度修正为 m(1 + 5αkBT)，|v| = ħ|k−k₀|/m/(1+2αE)；
/// 按唯一能量平均后以 PCHIP 拟合到能量网格。
pub fn analytic_group_velocity(
    mesh: &KMesh,
    masses_kg: [f64; 3],
    alpha: f64,
    temperature: f64,
    grid: &EnergyGrid,
) -> Result<EnergyArray> {
    let scale = 1.0 + 5.0 * alpha * KB * temperature;
    let meff = masses_kg.map(|m| m * scale);
    let ko = mesh.origin();

    let (energies, speeds): (Vec<f64>, Vec<f64>) = mesh
        .points()
        .iter()
        .map(|k| {
            let e = mesh.energy(k, meff);
            let v2: f64 = (0..3)
                .map(|d| (HBAR * (k[d] - ko[d]) / meff[d] / (1.0 + 2.0 * alpha * e) * E2C).powi(2))
                .sum();
            (e, v2.sqrt())
        })
        .unzip();

    let (ec, vc) = unique_mean(&energies, &speeds);
    let fit = Pchip::new(&ec, &vc)?;
    Ok(fit.sample(grid.energies()))
}
