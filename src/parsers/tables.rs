//! # 预计算数值表
//!
//! - `FermiIntegralTable`: 逗号分隔的费米积分表，按行原样载入，第 j 行为
//!   j 阶积分 F_j 在各扫描点上的取值
//! - `ExtrinsicCarrierTable`: 空白分隔的两行表（温度行、浓度行 cm⁻³），
//!   以三次样条在任意温度插值
//!
//! ## 依赖关系
//! - 被 `transport/carriers.rs`、`commands/pipeline.rs` 使用
//! - 使用 `numerics/interp.rs`

use crate::error::{Result, TeFilterError};
use crate::models::constants::PER_CM3_TO_PER_M3;
use crate::numerics::{CubicSpline, Interpolate};
use crate::parsers::{parse_numbers, read_text};

use csv::{ReaderBuilder, Trim};
use ndarray::ArrayView1;
use std::io::Read;
use std::path::Path;

/// 逗号分隔的费米积分表
#[derive(Debug, Clone)]
pub struct FermiIntegralTable {
    rows: Vec<Vec<f64>>,
}

impl FermiIntegralTable {
    /// 从文件载入
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| TeFilterError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_reader(file, &path.display().to_string())
    }

    /// 从任意读取器载入，`source` 仅用于错误信息
    pub fn from_reader<R: Read>(reader: R, source: &str) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut rows = Vec::new();
        for (row_idx, record) in csv_reader.records().enumerate() {
            let record = record?;
            let row = record
                .iter()
                .filter(|field| !field.is_empty())
                .map(|field| {
                    field.parse::<f64>().map_err(|_| {
                        TeFilterError::malformed(
                            "Fermi integral table",
                            source,
                            format!("non-numeric field '{}' in row {}", field, row_idx + 1),
                        )
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            if !row.is_empty() {
                rows.push(row);
            }
        }

        if rows.is_empty() {
            return Err(TeFilterError::malformed(
                "Fermi integral table",
                source,
                "table has no rows",
            ));
        }
        Ok(Self { rows })
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// 第 `index` 行（j 阶费米积分）
    pub fn row(&self, index: usize) -> Result<ArrayView1<'_, f64>> {
        self.rows
            .get(index)
            .map(|r| ArrayView1::from(r.as_slice()))
            .ok_or_else(|| {
                TeFilterError::InvalidArgument(format!(
                    "Fermi integral table has {} rows, row {} requested",
                    self.rows.len(),
                    index
                ))
            })
    }
}

/// 外来（掺杂）载流子浓度随温度的表
#[derive(Debug, Clone)]
pub struct ExtrinsicCarrierTable {
    spline: CubicSpline,
}

impl ExtrinsicCarrierTable {
    pub fn load(path: &Path) -> Result<Self> {
        let content = read_text(path)?;
        Self::parse_content(&content, &path.display().to_string())
    }

    /// 解析两行表：第一行温度 (K)，第二行浓度 (cm⁻³)
    pub fn parse_content(content: &str, source: &str) -> Result<Self> {
        let malformed =
            |reason: String| TeFilterError::malformed("extrinsic carrier table", source, reason);

        let mut lines = content.lines().filter(|l| !l.trim().is_empty());
        let mut next_row = |what: &str| -> Result<Vec<f64>> {
            let line = lines
                .next()
                .ok_or_else(|| malformed(format!("missing {} row", what)))?;
            parse_numbers(line).ok_or_else(|| malformed(format!("non-numeric {} row", what)))
        };

        let temperatures = next_row("temperature")?;
        let concentrations: Vec<f64> = next_row("concentration")?
            .into_iter()
            .map(|n| n * PER_CM3_TO_PER_M3)
            .collect();

        let spline = CubicSpline::new(&temperatures, &concentrations)
            .map_err(|e| malformed(e.to_string()))?;
        Ok(Self { spline })
    }

    /// 温度 T 下的外来载流子浓度 (m⁻³)
    pub fn concentration_at(&self, temperature: f64) -> f64 {
        self.spline.value(temperature)
    }
}
