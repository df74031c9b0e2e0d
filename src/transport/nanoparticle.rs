//! # 纳米颗粒夹杂散射
//!
//! 半径 r、势垒高度 U₀ 的夹杂对能谷电子的弹性散射。对能谷 k 点网格上的
//! 每个 k 点在等能面上做数值积分得到 τ(k)，按唯一能量平均，丢弃最低的
//! 若干个能量（k₀ 附近的奇异区），再以 PCHIP 拟合到能量网格。
//!
//! 两种几何：
//! - `Cylinder2D`: 无限长圆柱，在椭圆截面周长上对参数角 t 做梯形积分，
//!   形状因子含 J₁(r·q)
//! - `Sphere3D`: 球形，等能椭球面三角剖分后按面元求和，
//!   形状因子 4πU₀(sin(rq)/q − r·cos(rq))/q²
//!
//! ## 依赖关系
//! - 被 `commands/pipeline.rs` 使用
//! - 使用 `transport/band.rs` 的 `KMesh`
//! - 使用 `batch/runner.rs` 并行遍历 k 点

use crate::batch::SweepRunner;
use crate::error::{Result, TeFilterError};
use crate::models::constants::{E2C, HBAR};
use crate::models::lattice::norm;
use crate::models::{EnergyArray, EnergyGrid};
use crate::numerics::special::bessel_j1;
use crate::numerics::{linspace, trapz, unique_mean, Interpolate, Pchip};
use crate::transport::band::KMesh;

use serde::Deserialize;
use std::f64::consts::PI;

/// 夹杂参数
#[derive(Debug, Clone, Copy)]
pub struct Inclusion {
    /// 势垒高度 U₀ (eV)
    pub barrier_height: f64,
    /// 半径 (m)
    pub radius: f64,
    /// 体积分数
    pub volume_fraction: f64,
}

/// 椭球能谷：中心 k₀ 与三个主轴质量 (kg)
#[derive(Debug, Clone, Copy)]
pub struct Valley {
    pub origin: [f64; 3],
    pub masses: [f64; 3],
}

impl Valley {
    /// 等能面主半轴 √(2m·E/ħ²/e)
    fn semi_axis(&self, axis: usize, energy: f64) -> f64 {
        (2.0 * self.masses[axis] / (HBAR * HBAR) * energy / E2C).sqrt()
    }

    /// 沿三个主轴的能量梯度之和的绝对值 ħ²|Σ(k − k₀)/m|
    fn energy_slope(&self, k: &[f64; 3]) -> f64 {
        let sum: f64 = (0..3).map(|d| (k[d] - self.origin[d]) / self.masses[d]).sum();
        (HBAR * HBAR * sum).abs()
    }
}

/// 夹杂几何
pub trait InclusionGeometry: Sync {
    fn name(&self) -> &'static str;

    /// 夹杂数密度
    fn number_density(&self, inclusion: &Inclusion) -> f64;

    /// 单个 k 点（能量 `energy`）的弛豫时间 (s)；非有限值在分箱时丢弃
    fn lifetime_at(&self, k: &[f64; 3], energy: f64, valley: &Valley, inclusion: &Inclusion) -> f64;
}

/// 夹杂形状
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InclusionShape {
    Cylinder,
    Sphere,
}

impl InclusionShape {
    /// 以 `points` 个积分点构造对应几何
    pub fn geometry(&self, points: usize) -> Result<Box<dyn InclusionGeometry>> {
        match self {
            InclusionShape::Cylinder => Ok(Box::new(Cylinder2D::new(points)?)),
            InclusionShape::Sphere => Ok(Box::new(Sphere3D::new(points)?)),
        }
    }
}

// ─────────────────────────────────────────────────────────────
// 圆柱
// ─────────────────────────────────────────────────────────────

/// 二维圆柱夹杂
///
/// 圆柱轴沿 k_z。垂直于轴的等能截面为椭圆，半轴 a、b 分别取谷质量
/// `masses[0]`、`masses[1]`（即 k_x、k_y 方向），k_z 保持入射值。
/// 能量斜率与球形夹杂相同，取 ħ²|Σ(k−k₀)/m|。
#[derive(Debug, Clone)]
pub struct Cylinder2D {
    angles: Vec<f64>,
}

impl Cylinder2D {
    pub fn new(points: usize) -> Result<Self> {
        if points < 2 {
            return Err(TeFilterError::InvalidArgument(format!(
                "cylinder quadrature needs at least 2 points, got {}",
                points
            )));
        }
        Ok(Self {
            angles: linspace(0.0, 2.0 * PI, points).to_vec(),
        })
    }
}

impl InclusionGeometry for Cylinder2D {
    fn name(&self) -> &'static str {
        "cylinder"
    }

    fn number_density(&self, inclusion: &Inclusion) -> f64 {
        inclusion.volume_fraction / PI / inclusion.radius.powi(2)
    }

    fn lifetime_at(&self, k: &[f64; 3], energy: f64, valley: &Valley, inclusion: &Inclusion) -> f64 {
        let a = valley.semi_axis(0, energy);
        let b = valley.semi_axis(1, energy);
        let k_mag = norm(k);
        let r = inclusion.radius;
        let coupling = 2.0 * PI / HBAR * inclusion.barrier_height.powi(2) * (2.0 * PI).powi(3);

        let integrand: Vec<f64> = self
            .angles
            .iter()
            .map(|&t| {
                let (sin_t, cos_t) = t.sin_cos();
                let final_k = [a * cos_t, b * sin_t, k[2]];
                let ds = ((a * sin_t).powi(2) + (b * cos_t).powi(2)).sqrt();
                let cos_theta = (final_k[0] * k[0] + final_k[1] * k[1] + k[2] * k[2])
                    / norm(&final_k)
                    / k_mag;
                let del_e = valley.energy_slope(&final_k);

                let q = ((k[0] - final_k[0]).powi(2) + (k[1] - final_k[1]).powi(2)).sqrt();
                let form = r * bessel_j1(r * q) / q;
                coupling * form * form * (1.0 - cos_theta) / del_e * ds
            })
            .collect();

        let integral = trapz(
            ndarray::ArrayView1::from(integrand.as_slice()),
            ndarray::ArrayView1::from(self.angles.as_slice()),
        );
        let n = self.number_density(inclusion);
        1.0 / (n / (2.0 * PI).powi(3) * integral) * E2C
    }
}

// ─────────────────────────────────────────────────────────────
// 球
// ─────────────────────────────────────────────────────────────

type Vertex = (usize, usize);

/// 三维球形夹杂
///
/// 等能椭球面以 (极角 ν, 方位角 θ) 各 `points` 个采样点参数化，
/// 剖分为 2(n−2)(n−1) 个三角面元。
#[derive(Debug, Clone)]
pub struct Sphere3D {
    points: usize,
    /// 单位球面参数：z 与 ρ = √(1 − z²)
    z: Vec<f64>,
    rho: Vec<f64>,
    cos_phi: Vec<f64>,
    sin_phi: Vec<f64>,
    facets: Vec<[Vertex; 3]>,
}

impl Sphere3D {
    pub fn new(points: usize) -> Result<Self> {
        if points < 3 {
            return Err(TeFilterError::InvalidArgument(format!(
                "sphere quadrature needs at least 3 points, got {}",
                points
            )));
        }
        let n = points;
        let z: Vec<f64> = linspace(0.0, PI, n).iter().map(|nu| -nu.cos()).collect();
        let rho: Vec<f64> = z.iter().map(|z| (1.0 - z * z).max(0.0).sqrt()).collect();
        let phi = linspace(0.0, 2.0 * PI, n);
        let cos_phi = phi.iter().map(|p| p.cos()).collect();
        let sin_phi = phi.iter().map(|p| p.sin()).collect();

        let mut facets = Vec::with_capacity(2 * (n - 2) * (n - 1));
        for j in 1..n - 1 {
            for i in 2..n {
                facets.push([(i, j), (i - 1, j), (i - 1, j - 1)]);
            }
        }
        for j in 1..n - 1 {
            for i in 1..n - 1 {
                facets.push([(i, j - 1), (i, j), (i - 1, j - 1)]);
            }
        }
        // 方位角接缝：第 0 列与第 n−2 列相连
        for i in 2..n {
            facets.push([(i, 0), (i - 1, 0), (i - 1, n - 2)]);
        }
        for i in 1..n - 1 {
            facets.push([(i, n - 2), (i, 0), (i - 1, n - 2)]);
        }

        Ok(Self {
            points,
            z,
            rho,
            cos_phi,
            sin_phi,
            facets,
        })
    }

    pub fn num_facets(&self) -> usize {
        self.facets.len()
    }

    fn vertex(&self, (i, j): Vertex, axes: [f64; 3], origin: [f64; 3]) -> [f64; 3] {
        [
            -axes[0] * self.rho[i] * self.cos_phi[j] + origin[0],
            -axes[1] * self.rho[i] * self.sin_phi[j] + origin[1],
            axes[2] * self.z[i] + origin[2],
        ]
    }
}

/// Heron 公式三角形面积
fn heron_area(p: &[f64; 3], q: &[f64; 3], r: &[f64; 3]) -> f64 {
    let dist = |u: &[f64; 3], v: &[f64; 3]| norm(&[u[0] - v[0], u[1] - v[1], u[2] - v[2]]);
    let a = dist(p, q);
    let b = dist(q, r);
    let c = dist(r, p);
    let s = (a + b + c) / 2.0;
    (s * (s - a) * (s - b) * (s - c)).max(0.0).sqrt()
}

impl InclusionGeometry for Sphere3D {
    fn name(&self) -> &'static str {
        "sphere"
    }

    fn number_density(&self, inclusion: &Inclusion) -> f64 {
        3.0 * inclusion.volume_fraction / 4.0 / PI / inclusion.radius.powi(3)
    }

    fn lifetime_at(&self, k: &[f64; 3], energy: f64, valley: &Valley, inclusion: &Inclusion) -> f64 {
        debug_assert_eq!(self.z.len(), self.points);
        let axes = [
            valley.semi_axis(0, energy),
            valley.semi_axis(1, energy),
            valley.semi_axis(2, energy),
        ];
        let k_mag = norm(k);
        let r = inclusion.radius;
        let u0 = inclusion.barrier_height;

        let mut sum = 0.0;
        for facet in &self.facets {
            let [p, q, s] = facet.map(|v| self.vertex(v, axes, valley.origin));
            let centroid = [
                (p[0] + q[0] + s[0]) / 3.0,
                (p[1] + q[1] + s[1]) / 3.0,
                (p[2] + q[2] + s[2]) / 3.0,
            ];
            let area = heron_area(&p, &q, &s);

            let dq = norm(&[k[0] - centroid[0], k[1] - centroid[1], k[2] - centroid[2]]);
            let cos_theta = (k[0] * centroid[0] + k[1] * centroid[1] + k[2] * centroid[2])
                / k_mag
                / norm(&centroid);
            let del_e = valley.energy_slope(&centroid);

            let m = 4.0 * PI * u0 * ((r * dq).sin() / dq - r * (r * dq).cos()) / (dq * dq);
            let rate = 2.0 * PI / HBAR * m * m;
            sum += rate / del_e * (1.0 - cos_theta) * area;
        }

        let n = self.number_density(inclusion);
        E2C / (n / (2.0 * PI).powi(3) * sum)
    }
}

// ─────────────────────────────────────────────────────────────
// 能量网格上的弛豫时间
// ─────────────────────────────────────────────────────────────

/// 在 k 点网格上求 τ(k)，按唯一能量分箱后拟合到能量网格
///
/// `skip_lowest` 个最低唯一能量在拟合前丢弃。
pub fn nanoparticle_lifetime(
    geometry: &dyn InclusionGeometry,
    mesh: &KMesh,
    masses_kg: [f64; 3],
    inclusion: &Inclusion,
    skip_lowest: usize,
    grid: &EnergyGrid,
    runner: &SweepRunner,
) -> Result<EnergyArray> {
    if !(inclusion.radius > 0.0) || !(inclusion.volume_fraction > 0.0) {
        return Err(TeFilterError::InvalidArgument(format!(
            "inclusion radius and volume fraction must be positive, got {} / {}",
            inclusion.radius, inclusion.volume_fraction
        )));
    }

    let valley = Valley {
        origin: mesh.origin(),
        masses: masses_kg,
    };
    let energies = mesh.energies(masses_kg);
    let samples: Vec<([f64; 3], f64)> = mesh
        .points()
        .iter()
        .cloned()
        .zip(energies.iter().cloned())
        .collect();

    let label = format!("{} inclusion r = {:.2e} m", geometry.name(), inclusion.radius);
    let lifetimes = runner.map(&samples, &label, |(k, e)| {
        geometry.lifetime_at(k, *e, &valley, inclusion)
    });

    let (ec, tc) = unique_mean(&energies, &lifetimes);
    if ec.len() < skip_lowest + 2 {
        return Err(TeFilterError::DegenerateSegment(format!(
            "{} distinct energies on the k-mesh, {} skipped; need at least 2 to fit",
            ec.len(),
            skip_lowest
        )));
    }
    tracing::debug!(
        geometry = geometry.name(),
        distinct = ec.len(),
        skip_lowest,
        "nanoparticle lifetimes binned"
    );

    let fit = Pchip::new(&ec[skip_lowest..], &tc[skip_lowest..])?;
    Ok(fit.sample(grid.energies()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::constants::ME;
    use crate::transport::band::KMeshConfig;
    use approx::assert_relative_eq;

    fn silicon_valley() -> (KMesh, [f64; 3]) {
        let config = KMeshConfig {
            counts: [5, 5, 5],
            valley: [0.85, 0.0, 0.0],
            extent: 0.1,
        };
        let mesh = KMesh::new(5.401803661945516e-10, &config).unwrap();
        (mesh, [0.98 * ME, 0.19 * ME, 0.19 * ME])
    }

    fn inclusion(barrier_height: f64) -> Inclusion {
        Inclusion {
            barrier_height,
            radius: 4e-9,
            volume_fraction: 0.05,
        }
    }

    #[test]
    fn test_cylinder_semi_axes_follow_first_two_masses() {
        let (_, masses) = silicon_valley();
        let valley = Valley {
            origin: [0.0; 3],
            masses,
        };
        let e = 0.05;
        let expected = |m: f64| (2.0 * m / (HBAR * HBAR) * e / E2C).sqrt();
        assert_relative_eq!(valley.semi_axis(0, e), expected(masses[0]), max_relative = 1e-12);
        assert_relative_eq!(valley.semi_axis(1, e), expected(masses[1]), max_relative = 1e-12);

        // 交换前两个主轴质量后，圆柱截面改变，寿命随之改变
        let cyl = Cylinder2D::new(200).unwrap();
        let k = [1e8, 2e8, 3e8];
        let inc = inclusion(0.1);
        let swapped = Valley {
            origin: [0.0; 3],
            masses: [masses[1], masses[0], masses[2]],
        };
        let tau = cyl.lifetime_at(&k, e, &valley, &inc);
        let tau_swapped = cyl.lifetime_at(&k, e, &swapped, &inc);
        assert!(tau.is_finite() && tau_swapped.is_finite());
        assert!((tau - tau_swapped).abs() > 1e-9 * tau.abs());
    }

    #[test]
    fn test_sphere_facet_count() {
        let sphere = Sphere3D::new(8).unwrap();
        assert_eq!(sphere.num_facets(), 2 * 6 * 7);
    }

    #[test]
    fn test_number_densities() {
        let inc = inclusion(0.1);
        let cyl = Cylinder2D::new(10).unwrap();
        let sph = Sphere3D::new(4).unwrap();
        assert_relative_eq!(cyl.number_density(&inc), 0.05 / PI / 16e-18, max_relative = 1e-12);
        assert_relative_eq!(
            sph.number_density(&inc),
            0.15 / 4.0 / PI / 64e-27,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_lifetime_scales_with_inverse_barrier_squared() {
        let (mesh, masses) = silicon_valley();
        let valley = Valley {
            origin: mesh.origin(),
            masses,
        };
        let k = mesh.points()[mesh.len() - 1];
        let e = mesh.energy(&k, masses);
        let geometries: Vec<Box<dyn InclusionGeometry>> = vec![
            Box::new(Cylinder2D::new(200).unwrap()),
            Box::new(Sphere3D::new(16).unwrap()),
        ];
        for g in geometries {
            let t1 = g.lifetime_at(&k, e, &valley, &inclusion(0.1));
            let t2 = g.lifetime_at(&k, e, &valley, &inclusion(0.2));
            assert!(t1.is_finite() && t1 > 0.0, "{} lifetime {}", g.name(), t1);
            assert_relative_eq!(t1 / t2, 4.0, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_nanoparticle_lifetime_on_grid() {
        let (mesh, masses) = silicon_valley();
        let runner = SweepRunner::new(2).unwrap().quiet();
        let grid = EnergyGrid::new(0.0, 0.3, 31).unwrap();
        let cylinder = Cylinder2D::new(100).unwrap();
        let tau = nanoparticle_lifetime(&cylinder, &mesh, masses, &inclusion(0.1), 3, &grid, &runner)
            .unwrap();
        assert_eq!(tau.len(), grid.len());
        assert!(tau.iter().all(|t| t.is_finite()));
    }

    #[test]
    fn test_nanoparticle_lifetime_too_few_energies() {
        let (mesh, masses) = silicon_valley();
        let runner = SweepRunner::new(1).unwrap().quiet();
        let grid = EnergyGrid::new(0.0, 0.3, 31).unwrap();
        let sphere = Sphere3D::new(6).unwrap();
        let err = nanoparticle_lifetime(&sphere, &mesh, masses, &inclusion(0.1), 500, &grid, &runner);
        assert!(matches!(err, Err(TeFilterError::DegenerateSegment(_))));
    }
}
