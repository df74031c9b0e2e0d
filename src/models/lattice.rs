//! # 晶格
//!
//! 实空间晶格与倒格矢，用于把 EIGENVAL 中的分数 k 点换算为笛卡尔波矢。
//!
//! ## 依赖关系
//! - 被 `parsers/eigenval.rs`、`commands/pipeline.rs` 使用
//! - 无外部模块依赖

use std::f64::consts::PI;

/// 晶格向量（行向量表示 a, b, c，单位 m）
#[derive(Debug, Clone)]
pub struct Lattice {
    pub matrix: [[f64; 3]; 3],
}

impl Lattice {
    /// 面心立方原胞：a/2·(1,1,0), a/2·(0,1,1), a/2·(1,0,1)
    pub fn fcc(a: f64) -> Self {
        let h = a / 2.0;
        Lattice {
            matrix: [[h, h, 0.0], [0.0, h, h], [h, 0.0, h]],
        }
    }

    /// 晶胞体积 a · (b × c)
    pub fn volume(&self) -> f64 {
        let [a, b, c] = self.matrix;
        dot(&a, &cross(&b, &c))
    }

    /// 倒格矢（含 2π 因子），行向量 b1, b2, b3
    pub fn reciprocal(&self) -> [[f64; 3]; 3] {
        let [a, b, c] = self.matrix;
        let volume = self.volume();
        if volume.abs() < f64::MIN_POSITIVE {
            return [[0.0; 3]; 3];
        }

        let factor = 2.0 * PI / volume;
        let scale = |v: [f64; 3]| [v[0] * factor, v[1] * factor, v[2] * factor];

        [
            scale(cross(&b, &c)),
            scale(cross(&c, &a)),
            scale(cross(&a, &b)),
        ]
    }

    /// 分数 k 点 → 笛卡尔波矢 (1/m)
    pub fn cartesian_k(&self, frac: &[f64; 3]) -> [f64; 3] {
        let r = self.reciprocal();
        [
            frac[0] * r[0][0] + frac[1] * r[1][0] + frac[2] * r[2][0],
            frac[0] * r[0][1] + frac[1] * r[1][1] + frac[2] * r[2][1],
            frac[0] * r[0][2] + frac[1] * r[1][2] + frac[2] * r[2][2],
        ]
    }
}

/// 向量叉积
fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// 向量点积
fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// 向量模
pub fn norm(v: &[f64; 3]) -> f64 {
    dot(v, v).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fcc_volume_is_quarter_cube() {
        let a = 5.43e-10;
        let lattice = Lattice::fcc(a);
        assert_relative_eq!(lattice.volume().abs(), a * a * a / 4.0, max_relative = 1e-12);
    }

    #[test]
    fn test_reciprocal_orthogonality() {
        let lattice = Lattice::fcc(5.43e-10);
        let r = lattice.reciprocal();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 2.0 * PI } else { 0.0 };
                assert!((dot(&lattice.matrix[i], &r[j]) - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_x_point_magnitude() {
        // X = (0.5, 0, 0.5) 分数坐标 → |k| = 2π/a
        let a = 5.43e-10;
        let lattice = Lattice::fcc(a);
        let k = lattice.cartesian_k(&[0.5, 0.0, 0.5]);
        assert_relative_eq!(norm(&k), 2.0 * PI / a, max_relative = 1e-12);
    }
}
