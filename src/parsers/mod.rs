//! # 解析器模块
//!
//! 读取固定布局的外部输入：VASP EIGENVAL / DOSCAR 文本、预计算费米积分表、
//! 外来载流子浓度表。所有解析器都提供 `*_content` 形式，便于从内存字符串测试。
//!
//! ## 依赖关系
//! - 被 `commands/pipeline.rs` 使用
//! - 使用 `models/`、`numerics/`
//! - 子模块: eigenval, doscar, tables

pub mod doscar;
pub mod eigenval;
pub mod tables;

pub use doscar::DosLayout;
pub use eigenval::EigenvalLayout;
pub use tables::{ExtrinsicCarrierTable, FermiIntegralTable};

use crate::error::{Result, TeFilterError};
use std::fs;
use std::path::Path;

/// 读取整个文本文件
pub(crate) fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| TeFilterError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })
}

/// 解析一行中的全部浮点数；任一字段非数字时返回 None
pub(crate) fn parse_numbers(line: &str) -> Option<Vec<f64>> {
    line.split_whitespace()
        .map(|s| s.parse::<f64>().ok())
        .collect()
}
