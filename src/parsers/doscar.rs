//! # VASP DOSCAR 解析器
//!
//! 读取 (能量, 态数) 两列表，以参考行能量为零点平移，按晶胞体积归一化，
//! 对参考行之后的非负能量尾部做单调 PCHIP 拟合。
//!
//! 拟合只在表的能量范围内有效，`tabulate` 在网格越界时直接报错，
//! 不做外推。
//!
//! ## 依赖关系
//! - 被 `commands/pipeline.rs` 使用
//! - 使用 `numerics/interp.rs`、`models/grid.rs`

use crate::error::{Result, TeFilterError};
use crate::models::{EnergyArray, EnergyGrid};
use crate::numerics::{Interpolate, Pchip};
use crate::parsers::{parse_numbers, read_text};

use serde::Deserialize;
use std::path::Path;

/// DOSCAR 固定布局
#[derive(Debug, Clone, Deserialize)]
pub struct DosLayout {
    /// 文件头行数
    pub header_lines: usize,
    /// 最多读取的数据行数
    pub max_rows: usize,
    /// 能量零点所在的数据行（导带底）
    pub reference_row: usize,
    /// 归一化用晶胞体积 (m³)
    pub unit_cell_volume: f64,
}

/// 连续的态密度函数 (states/eV/m³)，能量以导带底为零点
#[derive(Debug, Clone)]
pub struct DensityOfStatesFunction {
    fit: Pchip,
}

impl DensityOfStatesFunction {
    /// 由已平移、已归一化的样本构造
    pub fn from_samples(energies: &[f64], values: &[f64]) -> Result<Self> {
        Ok(Self {
            fit: Pchip::new(energies, values)?,
        })
    }

    /// 拟合覆盖的能量区间
    pub fn domain(&self) -> (f64, f64) {
        self.fit.domain()
    }

    /// 在能量网格上制表，`scale` 为体积分数修正等整体乘子
    pub fn tabulate(&self, grid: &EnergyGrid, scale: f64) -> Result<EnergyArray> {
        let (lo, hi) = self.domain();
        if grid.min() < lo || grid.max() > hi {
            return Err(TeFilterError::InvalidRange(format!(
                "energy grid [{}, {}] eV exceeds tabulated DOS range [{}, {}] eV",
                grid.min(),
                grid.max(),
                lo,
                hi
            )));
        }
        Ok(self.fit.sample(grid.energies()) * scale)
    }
}

/// 读取 DOSCAR 文件
pub fn load_density_of_states(path: &Path, layout: &DosLayout) -> Result<DensityOfStatesFunction> {
    let content = read_text(path)?;
    parse_density_of_states_content(&content, layout, &path.display().to_string())
}

/// 从字符串内容解析 DOSCAR
pub fn parse_density_of_states_content(
    content: &str,
    layout: &DosLayout,
    source: &str,
) -> Result<DensityOfStatesFunction> {
    let malformed = |reason: String| TeFilterError::malformed("DOSCAR", source, reason);

    if !(layout.unit_cell_volume > 0.0) {
        return Err(malformed(format!(
            "unit cell volume must be positive, got {}",
            layout.unit_cell_volume
        )));
    }

    let mut rows: Vec<(f64, f64)> = Vec::with_capacity(layout.max_rows);
    for (line_no, line) in content
        .lines()
        .enumerate()
        .skip(layout.header_lines)
        .take(layout.max_rows)
    {
        let values = parse_numbers(line)
            .filter(|v| v.len() >= 2)
            .ok_or_else(|| malformed(format!("expected (energy, count) at line {}", line_no + 1)))?;
        rows.push((values[0], values[1]));
    }

    if layout.reference_row >= rows.len() {
        return Err(malformed(format!(
            "reference row {} beyond the {} data rows read",
            layout.reference_row,
            rows.len()
        )));
    }

    let reference = rows[layout.reference_row].0;
    let (energies, values): (Vec<f64>, Vec<f64>) = rows[layout.reference_row..]
        .iter()
        .map(|(e, n)| (e - reference, n / layout.unit_cell_volume))
        .unzip();

    tracing::debug!(
        rows = rows.len(),
        reference_energy = reference,
        "DOSCAR tail fitted from {} samples",
        energies.len()
    );

    DensityOfStatesFunction::from_samples(&energies, &values).map_err(|e| malformed(e.to_string()))
}
