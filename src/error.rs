//! # 统一错误处理模块
//!
//! 定义 tefilter 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 错误分类
//! - 输入范围错误：能量网格、扫描区间非法
//! - 输入格式错误：EIGENVAL / DOSCAR / 费米积分表与约定布局不符
//! - 数值错误：差分样本不足、自洽费米能级搜索窗口不含解
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// tefilter 统一错误类型
#[derive(Error, Debug)]
pub enum TeFilterError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────
    // 输入错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Malformed {format} input: {path}\nReason: {reason}")]
    MalformedInput {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // 数值错误
    // ─────────────────────────────────────────────────────────────
    #[error("Degenerate segment: {0}")]
    DegenerateSegment(String),

    #[error(
        "Self-consistent Fermi level not bracketed: target {target:.4e} m^-3 outside \
         window [{window_low:.4}, {window_high:.4}] eV (initial half-width \
         {initial_half_width:.4} eV, {widenings} widening(s))"
    )]
    NoConvergence {
        target: f64,
        initial_half_width: f64,
        widenings: u32,
        window_low: f64,
        window_high: f64,
    },

    #[error("Shape mismatch: {what} has length {found}, expected {expected}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    // ─────────────────────────────────────────────────────────────
    // 外部库错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("{0}")]
    Other(String),
}

impl TeFilterError {
    /// 构造格式错误
    pub fn malformed(format: &str, path: &str, reason: impl Into<String>) -> Self {
        TeFilterError::MalformedInput {
            format: format.to_string(),
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// 检查能量分辨 / 扫描分辨数组长度一致
    pub fn check_len(what: &str, expected: usize, found: usize) -> Result<()> {
        if expected == found {
            Ok(())
        } else {
            Err(TeFilterError::ShapeMismatch {
                what: what.to_string(),
                expected,
                found,
            })
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, TeFilterError>;
