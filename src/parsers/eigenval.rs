//! # VASP EIGENVAL 解析器
//!
//! 解析能带本征值文本，得到 (k 点, 能带) 能量表。
//!
//! ## EIGENVAL 布局
//! ```text
//! header (header_lines 行，忽略)
//!
//! kx ky kz weight          # k 点行（分数坐标，其余列忽略）
//! 1  E_1  [occ]            # bands_per_kpoint 行：能带序号 + 能量
//! 2  E_2  [occ]
//! ...
//! (空行)
//! kx ky kz weight
//! ...
//! ```
//! 空行仅作分隔，不参与计数。
//!
//! ## 依赖关系
//! - 被 `commands/pipeline.rs` 使用
//! - 使用 `models/lattice.rs` 计算 k 点模长

use crate::error::{Result, TeFilterError};
use crate::models::lattice::norm;
use crate::models::Lattice;
use crate::parsers::{parse_numbers, read_text};

use ndarray::{Array1, Array2, ArrayView1};
use serde::Deserialize;
use std::path::Path;

/// EIGENVAL 固定布局
#[derive(Debug, Clone, Deserialize)]
pub struct EigenvalLayout {
    /// 文件头行数
    pub header_lines: usize,
    /// 每个 k 点的能带数
    pub bands_per_kpoint: usize,
    /// 期望的 k 点数；为空时由文件推断
    #[serde(default)]
    pub num_kpoints: Option<usize>,
}

/// 原始能带结构：k 点（分数坐标）与 (k 点 × 能带) 能量矩阵 (eV)
#[derive(Debug, Clone)]
pub struct RawBandStructure {
    kpoints: Vec<[f64; 3]>,
    energies: Array2<f64>,
}

impl RawBandStructure {
    pub fn num_kpoints(&self) -> usize {
        self.kpoints.len()
    }

    pub fn num_bands(&self) -> usize {
        self.energies.ncols()
    }

    pub fn kpoints(&self) -> &[[f64; 3]] {
        &self.kpoints
    }

    /// 第 `band` 条能带沿 k 路径的能量
    pub fn band(&self, band: usize) -> Result<ArrayView1<'_, f64>> {
        if band >= self.num_bands() {
            return Err(TeFilterError::InvalidArgument(format!(
                "band index {} out of range (file has {} bands)",
                band,
                self.num_bands()
            )));
        }
        Ok(self.energies.column(band))
    }

    /// 笛卡尔 k 点模长 (1/m)
    pub fn kpoint_magnitudes(&self, lattice: &Lattice) -> Array1<f64> {
        self.kpoints
            .iter()
            .map(|k| norm(&lattice.cartesian_k(k)))
            .collect()
    }
}

/// 读取 EIGENVAL 文件
pub fn load_band_structure(path: &Path, layout: &EigenvalLayout) -> Result<RawBandStructure> {
    let content = read_text(path)?;
    parse_band_structure_content(&content, layout, &path.display().to_string())
}

/// 从字符串内容解析 EIGENVAL
pub fn parse_band_structure_content(
    content: &str,
    layout: &EigenvalLayout,
    source: &str,
) -> Result<RawBandStructure> {
    let malformed = |reason: String| TeFilterError::malformed("EIGENVAL", source, reason);

    if layout.bands_per_kpoint == 0 {
        return Err(malformed("bands_per_kpoint must be positive".to_string()));
    }

    let lines: Vec<(usize, &str)> = content
        .lines()
        .enumerate()
        .skip(layout.header_lines)
        .filter(|(_, l)| !l.trim().is_empty())
        .collect();

    let stride = layout.bands_per_kpoint + 1;
    if lines.is_empty() || lines.len() % stride != 0 {
        return Err(malformed(format!(
            "{} data lines is not a whole number of (1 + {}) line blocks",
            lines.len(),
            layout.bands_per_kpoint
        )));
    }

    let num_kpoints = lines.len() / stride;
    if let Some(expected) = layout.num_kpoints {
        if expected != num_kpoints {
            return Err(malformed(format!(
                "expected {} x {} energy lines, found {} k-point blocks",
                expected, layout.bands_per_kpoint, num_kpoints
            )));
        }
    }

    let mut kpoints = Vec::with_capacity(num_kpoints);
    let mut energies = Array2::<f64>::zeros((num_kpoints, layout.bands_per_kpoint));

    for (k, block) in lines.chunks(stride).enumerate() {
        let (line_no, kline) = block[0];
        let kvals = parse_numbers(kline)
            .filter(|v| v.len() >= 3)
            .ok_or_else(|| malformed(format!("invalid k-point line {}", line_no + 1)))?;
        kpoints.push([kvals[0], kvals[1], kvals[2]]);

        for (b, (line_no, eline)) in block[1..].iter().enumerate() {
            let evals = parse_numbers(eline)
                .filter(|v| v.len() >= 2)
                .ok_or_else(|| malformed(format!("invalid band line {}", line_no + 1)))?;
            energies[[k, b]] = evals[1];
        }
    }

    Ok(RawBandStructure { kpoints, energies })
}
