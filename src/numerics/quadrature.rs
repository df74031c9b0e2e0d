//! # 积分与采样
//!
//! 梯形积分、包含端点的等距采样以及按横坐标唯一值的分箱平均。
//!
//! ## 依赖关系
//! - 被 `models/grid.rs`、`transport/` 使用

use ndarray::{Array1, ArrayView1};

/// 梯形积分 ∫y dx，横坐标可以非均匀
///
/// `y` 与 `x` 必须等长，少于两个点时积分为 0。
pub fn trapz(y: ArrayView1<f64>, x: ArrayView1<f64>) -> f64 {
    debug_assert_eq!(y.len(), x.len());
    let n = y.len().min(x.len());
    let mut sum = 0.0;
    for i in 1..n {
        sum += 0.5 * (y[i] + y[i - 1]) * (x[i] - x[i - 1]);
    }
    sum
}

/// 在 [start, end] 上生成 `count` 个等距点，首尾严格等于端点
pub fn linspace(start: f64, end: f64, count: usize) -> Array1<f64> {
    match count {
        0 => Array1::zeros(0),
        1 => Array1::from_elem(1, start),
        _ => {
            let step = (end - start) / (count - 1) as f64;
            let mut out = Array1::from_shape_fn(count, |i| start + step * i as f64);
            out[count - 1] = end;
            out
        }
    }
}

/// 对横坐标取唯一值，并对相同横坐标的纵坐标求平均
///
/// 返回的横坐标严格递增。非有限值的样本被丢弃。
pub fn unique_mean(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(a, b)| (*a, *b))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut xs: Vec<f64> = Vec::with_capacity(pairs.len());
    let mut sums: Vec<(f64, usize)> = Vec::with_capacity(pairs.len());

    for (xi, yi) in pairs {
        match (xs.last(), sums.last_mut()) {
            (Some(&last), Some(acc)) if last == xi => {
                acc.0 += yi;
                acc.1 += 1;
            }
            _ => {
                xs.push(xi);
                sums.push((yi, 1));
            }
        }
    }

    let ys = sums.into_iter().map(|(s, n)| s / n as f64).collect();
    (xs, ys)
}
