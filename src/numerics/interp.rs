//! # 一维插值
//!
//! 两种分段三次 Hermite 插值：
//! - `Pchip`: 保单调的 PCHIP（Fritsch–Carlson 斜率，端点采用三点公式）
//! - `CubicSpline`: not-a-knot 三次样条（3 点退化为抛物线，2 点退化为直线）
//!
//! 两者在数据区间外使用端点区间的多项式外推。
//!
//! ## 依赖关系
//! - 被 `parsers/doscar.rs`、`transport/band.rs`、`transport/nanoparticle.rs` 使用

use crate::error::{Result, TeFilterError};

use ndarray::{Array1, ArrayView1};

/// 一维插值函数
pub trait Interpolate {
    /// 在单点求值
    fn value(&self, x: f64) -> f64;

    /// 在整组横坐标上求值
    fn sample(&self, xs: ArrayView1<f64>) -> Array1<f64> {
        xs.mapv(|x| self.value(x))
    }

    /// 数据的横坐标范围
    fn domain(&self) -> (f64, f64);
}

/// 分段三次 Hermite 曲线：节点、节点值、节点斜率
#[derive(Debug, Clone)]
struct HermiteCurve {
    x: Vec<f64>,
    y: Vec<f64>,
    d: Vec<f64>,
}

impl HermiteCurve {
    fn value(&self, t: f64) -> f64 {
        let n = self.x.len();
        // 区间下标：外推时使用首/尾区间
        let k = self.x.partition_point(|&xi| xi <= t).clamp(1, n - 1) - 1;

        let h = self.x[k + 1] - self.x[k];
        let s = (t - self.x[k]) / h;
        let s2 = s * s;
        let s3 = s2 * s;

        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;

        h00 * self.y[k] + h10 * h * self.d[k] + h01 * self.y[k + 1] + h11 * h * self.d[k + 1]
    }
}

/// 校验节点：等长、至少两点、横坐标严格递增且有限
fn validate_knots(x: &[f64], y: &[f64]) -> Result<()> {
    TeFilterError::check_len("interpolation ordinates", x.len(), y.len())?;
    if x.len() < 2 {
        return Err(TeFilterError::DegenerateSegment(format!(
            "interpolation needs at least 2 samples, got {}",
            x.len()
        )));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(TeFilterError::InvalidArgument(
            "interpolation samples must be finite".to_string(),
        ));
    }
    if x.windows(2).any(|w| w[1] <= w[0]) {
        return Err(TeFilterError::DegenerateSegment(
            "interpolation abscissae must be strictly increasing".to_string(),
        ));
    }
    Ok(())
}

fn secants(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let m: Vec<f64> = y
        .windows(2)
        .zip(h.iter())
        .map(|(w, hk)| (w[1] - w[0]) / hk)
        .collect();
    (h, m)
}

// ─────────────────────────────────────────────────────────────
// PCHIP
// ─────────────────────────────────────────────────────────────

/// 保单调分段三次 Hermite 插值
#[derive(Debug, Clone)]
pub struct Pchip {
    curve: HermiteCurve,
}

impl Pchip {
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        validate_knots(x, y)?;
        let (h, m) = secants(x, y);
        let n = x.len();

        let d = if n == 2 {
            vec![m[0], m[0]]
        } else {
            let mut d = vec![0.0; n];
            for k in 1..n - 1 {
                if m[k - 1] * m[k] <= 0.0 {
                    d[k] = 0.0;
                } else {
                    let w1 = 2.0 * h[k] + h[k - 1];
                    let w2 = h[k] + 2.0 * h[k - 1];
                    d[k] = (w1 + w2) / (w1 / m[k - 1] + w2 / m[k]);
                }
            }
            d[0] = pchip_edge(h[0], h[1], m[0], m[1]);
            d[n - 1] = pchip_edge(h[n - 2], h[n - 3], m[n - 2], m[n - 3]);
            d
        };

        Ok(Self {
            curve: HermiteCurve {
                x: x.to_vec(),
                y: y.to_vec(),
                d,
            },
        })
    }
}

/// 端点斜率：非中心三点公式，并保持形状
fn pchip_edge(h0: f64, h1: f64, m0: f64, m1: f64) -> f64 {
    let d = ((2.0 * h0 + h1) * m0 - h0 * m1) / (h0 + h1);
    if sign(d) != sign(m0) {
        0.0
    } else if sign(m0) != sign(m1) && d.abs() > 3.0 * m0.abs() {
        3.0 * m0
    } else {
        d
    }
}

/// 零值返回 0 的符号函数
fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

impl Interpolate for Pchip {
    fn value(&self, x: f64) -> f64 {
        self.curve.value(x)
    }

    fn domain(&self) -> (f64, f64) {
        domain_of(&self.curve)
    }
}

// ─────────────────────────────────────────────────────────────
// not-a-knot 三次样条
// ─────────────────────────────────────────────────────────────

/// not-a-knot 边界条件的插值三次样条
#[derive(Debug, Clone)]
pub struct CubicSpline {
    curve: HermiteCurve,
}

impl CubicSpline {
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        validate_knots(x, y)?;
        let (h, m) = secants(x, y);
        let n = x.len();

        let d = match n {
            2 => vec![m[0], m[0]],
            3 => {
                // 过三点的抛物线在节点处的导数
                let c = (m[1] - m[0]) / (x[2] - x[0]);
                vec![
                    m[0] - c * h[0],
                    m[0] + c * h[0],
                    m[1] + c * h[1],
                ]
            }
            _ => not_a_knot_slopes(&h, &m),
        };

        Ok(Self {
            curve: HermiteCurve {
                x: x.to_vec(),
                y: y.to_vec(),
                d,
            },
        })
    }
}

/// 求解节点斜率的三对角方程组（n >= 4）
fn not_a_knot_slopes(h: &[f64], m: &[f64]) -> Vec<f64> {
    let n = h.len() + 1;
    let mut lower = vec![0.0; n];
    let mut diag = vec![0.0; n];
    let mut upper = vec![0.0; n];
    let mut rhs = vec![0.0; n];

    let span = h[0] + h[1];
    diag[0] = h[1];
    upper[0] = span;
    rhs[0] = ((h[0] + 2.0 * span) * h[1] * m[0] + h[0] * h[0] * m[1]) / span;

    for i in 1..n - 1 {
        lower[i] = h[i];
        diag[i] = 2.0 * (h[i - 1] + h[i]);
        upper[i] = h[i - 1];
        rhs[i] = 3.0 * (h[i] * m[i - 1] + h[i - 1] * m[i]);
    }

    let span = h[n - 2] + h[n - 3];
    lower[n - 1] = span;
    diag[n - 1] = h[n - 3];
    rhs[n - 1] =
        (h[n - 2] * h[n - 2] * m[n - 3] + (2.0 * span + h[n - 2]) * h[n - 3] * m[n - 2]) / span;

    solve_tridiagonal(&lower, &diag, &upper, &rhs)
}

/// Thomas 算法
fn solve_tridiagonal(lower: &[f64], diag: &[f64], upper: &[f64], rhs: &[f64]) -> Vec<f64> {
    let n = diag.len();
    let mut c = vec![0.0; n];
    let mut d = vec![0.0; n];

    c[0] = upper[0] / diag[0];
    d[0] = rhs[0] / diag[0];
    for i in 1..n {
        let denom = diag[i] - lower[i] * c[i - 1];
        c[i] = if i < n - 1 { upper[i] / denom } else { 0.0 };
        d[i] = (rhs[i] - lower[i] * d[i - 1]) / denom;
    }

    let mut x = vec![0.0; n];
    x[n - 1] = d[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = d[i] - c[i] * x[i + 1];
    }
    x
}

impl Interpolate for CubicSpline {
    fn value(&self, x: f64) -> f64 {
        self.curve.value(x)
    }

    fn domain(&self) -> (f64, f64) {
        domain_of(&self.curve)
    }
}

fn domain_of(curve: &HermiteCurve) -> (f64, f64) {
    (curve.x[0], curve.x[curve.x.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_spline_reproduces_cubic() {
        let x = [0.0, 0.4, 1.1, 1.5, 2.3, 3.0];
        let y: Vec<f64> = x.iter().map(|v| v * v * v - 2.0 * v + 1.0).collect();
        let spline = CubicSpline::new(&x, &y).unwrap();
        for t in [0.2, 0.9, 1.7, 2.9, 3.2] {
            let expected = t * t * t - 2.0 * t + 1.0;
            assert_relative_eq!(spline.value(t), expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_spline_three_points_is_parabola() {
        let x = [0.0, 1.0, 3.0];
        let y = [1.0, 2.0, 10.0]; // y = x² + 1
        let spline = CubicSpline::new(&x, &y).unwrap();
        assert_relative_eq!(spline.value(2.0), 5.0, epsilon = 1e-12);
        assert_relative_eq!(spline.value(-1.0), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pchip_is_monotone_on_monotone_data() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [0.0, 0.1, 0.2, 5.0, 5.1];
        let p = Pchip::new(&x, &y).unwrap();
        let mut prev = p.value(0.0);
        for i in 1..=400 {
            let v = p.value(i as f64 * 0.01);
            assert!(v >= prev - 1e-12, "PCHIP overshoot at step {}", i);
            prev = v;
        }
    }

    #[test]
    fn test_pchip_hits_knots() {
        let x = [0.0, 0.5, 1.5, 2.0];
        let y = [3.0, 1.0, 4.0, 1.5];
        let p = Pchip::new(&x, &y).unwrap();
        for (xi, yi) in x.iter().zip(y.iter()) {
            assert_relative_eq!(p.value(*xi), *yi, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rejects_unsorted_abscissae() {
        assert!(matches!(
            Pchip::new(&[0.0, 2.0, 1.0], &[0.0, 1.0, 2.0]),
            Err(TeFilterError::DegenerateSegment(_))
        ));
        assert!(CubicSpline::new(&[1.0], &[1.0]).is_err());
    }
}
