//! # 能量过滤扫描
//!
//! 对每个势垒高度 U 与每个扫描点 j，构造过滤后的弛豫时间：
//! E < U 处 τ = Matthiessen(τ_b, τ_off)，E ≥ U 处 τ = τ_b（逐位不变），
//! 再重新求输运积分。
//!
//! 结果矩阵按势垒优先排列：行 = 势垒下标，列 = 扫描下标，形状严格为
//! (势垒数, 扫描点数)。每个格点相互独立，经 `SweepRunner` 并行求值后
//! 按下标直接写入预分配的二维数组。
//!
//! ## 依赖关系
//! - 被 `commands/filter.rs` 使用
//! - 使用 `transport/coefficients.rs`、`transport/scattering.rs`
//! - 使用 `batch/runner.rs`

use crate::batch::SweepRunner;
use crate::error::{Result, TeFilterError};
use crate::models::{EnergyArray, EnergyGrid, SweepEnergyArray};
use crate::transport::coefficients::{integrate, TransportCoefficients, TransportInputs};
use crate::transport::scattering::matthiessen_pair;

use ndarray::{Array1, Array2, ArrayView1};
use serde::Deserialize;

/// 过滤扫描参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilteringConfig {
    /// 势垒起点 (eV)
    pub barrier_start: f64,
    /// 势垒终点（不含）(eV)
    pub barrier_stop: f64,
    /// 势垒步长 (eV)
    pub barrier_step: f64,
    /// 势垒以下被"过滤"的弛豫时间 (s)
    pub filtered_lifetime: f64,
}

impl Default for FilteringConfig {
    fn default() -> Self {
        Self {
            barrier_start: 0.0,
            barrier_stop: 0.5,
            barrier_step: 0.02,
            filtered_lifetime: 1e-20,
        }
    }
}

/// 势垒高度轴
#[derive(Debug, Clone)]
pub struct BarrierSweep {
    heights: Array1<f64>,
}

impl BarrierSweep {
    pub fn new(heights: Vec<f64>) -> Result<Self> {
        if heights.is_empty() || heights.iter().any(|u| !u.is_finite()) {
            return Err(TeFilterError::InvalidRange(
                "barrier heights must be a non-empty list of finite values".to_string(),
            ));
        }
        Ok(Self {
            heights: Array1::from(heights),
        })
    }

    /// start, start + step, … < stop
    pub fn arange(start: f64, stop: f64, step: f64) -> Result<Self> {
        if !(step > 0.0) || !(stop > start) {
            return Err(TeFilterError::InvalidRange(format!(
                "barrier range [{}, {}) with step {}",
                start, stop, step
            )));
        }
        let count = ((stop - start) / step).ceil() as usize;
        Self::new((0..count).map(|i| start + step * i as f64).collect())
    }

    pub fn from_config(config: &FilteringConfig) -> Result<Self> {
        Self::arange(config.barrier_start, config.barrier_stop, config.barrier_step)
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }
}

/// 势垒 U 下的过滤弛豫时间
pub fn filtered_lifetime(
    grid: &EnergyGrid,
    baseline: ArrayView1<f64>,
    barrier: f64,
    filtered: f64,
) -> EnergyArray {
    let mut tau = baseline.to_owned();
    for (t, &e) in tau.iter_mut().zip(grid.energies().iter()) {
        if e < barrier {
            *t = matthiessen_pair(*t, filtered);
        }
    }
    tau
}

/// 过滤扫描的共享输入；按扫描分辨的二维数组行 = 扫描下标
#[derive(Debug, Clone, Copy)]
pub struct FilteringInputs<'a> {
    pub grid: &'a EnergyGrid,
    pub dos: ArrayView1<'a, f64>,
    pub group_velocity: &'a SweepEnergyArray,
    pub fermi_levels: ArrayView1<'a, f64>,
    pub temperatures: ArrayView1<'a, f64>,
    pub dfde: &'a SweepEnergyArray,
    pub baseline_lifetime: &'a SweepEnergyArray,
}

impl<'a> FilteringInputs<'a> {
    pub fn sweep_len(&self) -> usize {
        self.fermi_levels.len()
    }

    fn check(&self) -> Result<()> {
        let n = self.sweep_len();
        TeFilterError::check_len("temperatures", n, self.temperatures.len())?;
        self.grid.check("DoS", self.dos)?;
        self.grid.check_rows("group velocity", self.group_velocity, n)?;
        self.grid.check_rows("dfdE", self.dfde, n)?;
        self.grid.check_rows("baseline lifetime", self.baseline_lifetime, n)
    }

    fn point(&self, j: usize) -> TransportInputs<'a> {
        TransportInputs {
            grid: self.grid,
            dos: self.dos,
            group_velocity: self.group_velocity.row(j),
            fermi_level: self.fermi_levels[j],
            dfde: self.dfde.row(j),
            temperature: self.temperatures[j],
        }
    }
}

/// 过滤结果矩阵（行 = 势垒，列 = 扫描点）
#[derive(Debug, Clone)]
pub struct FilteringResult {
    pub barrier_heights: Array1<f64>,
    pub coefficients: Array2<TransportCoefficients>,
}

impl FilteringResult {
    pub fn shape(&self) -> (usize, usize) {
        self.coefficients.dim()
    }

    pub fn power_factor(&self) -> Array2<f64> {
        self.coefficients.mapv(|c| c.power_factor)
    }

    pub fn seebeck(&self) -> Array2<f64> {
        self.coefficients.mapv(|c| c.seebeck)
    }
}

/// 在 (势垒, 扫描点) 全部格点上求输运系数
pub fn sweep_filtering_effect(
    barriers: &BarrierSweep,
    inputs: &FilteringInputs<'_>,
    filtered: f64,
    runner: &SweepRunner,
) -> Result<FilteringResult> {
    inputs.check()?;
    let nb = barriers.len();
    let ns = inputs.sweep_len();

    let kernels: Vec<Array1<f64>> = (0..ns).map(|j| inputs.point(j).kernel()).collect();
    let cells: Vec<(usize, usize)> = (0..nb)
        .flat_map(|b| (0..ns).map(move |j| (b, j)))
        .collect();

    let values = runner.map(&cells, "Filtering sweep", |&(b, j)| {
        let tau = filtered_lifetime(
            inputs.grid,
            inputs.baseline_lifetime.row(j),
            barriers.heights[b],
            filtered,
        );
        integrate(&inputs.point(j), &kernels[j], tau.view())
    });

    let mut coefficients = Array2::<TransportCoefficients>::default((nb, ns));
    for (&(b, j), c) in cells.iter().zip(values) {
        coefficients[[b, j]] = c;
    }

    tracing::info!(barriers = nb, sweep_points = ns, "filtering sweep complete");
    Ok(FilteringResult {
        barrier_heights: barriers.heights.clone(),
        coefficients,
    })
}
