//! # 共享计算流程
//!
//! 四个子命令共用的阶段：
//! 载入配置 → 能量网格与扫描 → DoS → 群速度 → 费米能级 → 弛豫时间 → 输运系数。
//! 每个子命令只运行到它需要的阶段。
//!
//! 按扫描分辨的二维数组一律为 (扫描点 × 能量)，行下标即扫描下标。
//!
//! ## 依赖关系
//! - 被 `commands/{fermi,scattering,transport,filter}.rs` 使用
//! - 使用 `config/`、`parsers/`、`transport/`、`batch/`

use crate::batch::SweepRunner;
use crate::cli::RunArgs;
use crate::config::{DosSource, RunConfig, ScreeningModel, VelocitySource};
use crate::error::{Result, TeFilterError};
use crate::models::constants::ME;
use crate::models::{EnergyArray, EnergyGrid, Sweep, SweepEnergyArray};
use crate::parsers::{self, ExtrinsicCarrierTable, FermiIntegralTable};
use crate::transport::band::{self, KMesh};
use crate::transport::carriers::{self, fermi_dirac};
use crate::transport::export::FermiRecord;
use crate::transport::nanoparticle::nanoparticle_lifetime;
use crate::transport::scattering::phonon_lifetime;
use crate::transport::{
    compute_coefficients, matthiessen, ImpurityParameters, TransportCoefficients, TransportInputs,
};
use crate::utils::output;

use ndarray::{Array1, ArrayView1};

/// 能带输入：DoS 与群速度
pub struct BandInputs {
    /// 态密度 (states/eV/m³)，已乘体积分数修正
    pub dos: EnergyArray,
    /// 群速度 (m/s)，(扫描点 × 能量)
    pub group_velocity: SweepEnergyArray,
}

/// 费米能级阶段的结果
pub struct FermiStage {
    pub records: Vec<FermiRecord>,
    pub fermi_levels: Array1<f64>,
    /// df/dE，(扫描点 × 能量)
    pub dfde: SweepEnergyArray,
}

/// 各散射机制的弛豫时间，(扫描点 × 能量)
pub struct LifetimeStage {
    pub phonon_parabolic: SweepEnergyArray,
    pub phonon_nonparabolic: SweepEnergyArray,
    pub impurity: SweepEnergyArray,
    /// 与扫描无关，仅在配置了纳米颗粒时存在
    pub nanoparticle: Option<EnergyArray>,
    pub combined: SweepEnergyArray,
}

impl LifetimeStage {
    /// 以 (名称, 数组) 列出全部机制，纳米颗粒按扫描点展开
    pub fn columns(&self) -> Vec<(&'static str, SweepEnergyArray)> {
        let mut columns = vec![
            ("phonon_parabolic", self.phonon_parabolic.clone()),
            ("phonon_nonparabolic", self.phonon_nonparabolic.clone()),
            ("impurity", self.impurity.clone()),
        ];
        if let Some(np) = &self.nanoparticle {
            let rows = self.combined.nrows();
            columns.push((
                "nanoparticle",
                SweepEnergyArray::from_shape_fn((rows, np.len()), |(_, i)| np[i]),
            ));
        }
        columns.push(("combined", self.combined.clone()));
        columns
    }
}

/// 一次运行的上下文
pub struct Pipeline {
    pub config: RunConfig,
    pub grid: EnergyGrid,
    pub sweep: Sweep,
    pub runner: SweepRunner,
}

impl Pipeline {
    /// 按命令行参数载入运行文件并构造上下文
    pub fn prepare(args: &RunArgs) -> Result<Self> {
        output::print_info(&format!("Loading run file '{}'", args.config.display()));
        let config = RunConfig::load(&args.config)?;
        Self::from_config(config, SweepRunner::new(args.jobs)?)
    }

    pub fn from_config(config: RunConfig, runner: SweepRunner) -> Result<Self> {
        let grid = config.grid.build()?;
        let sweep = build_sweep(&config)?;
        output::print_info(&format!(
            "Energy grid [{}, {}] eV x {}, {} sweep points, {} threads",
            grid.min(),
            grid.max(),
            grid.len(),
            sweep.len(),
            runner.jobs()
        ));
        Ok(Self {
            config,
            grid,
            sweep,
            runner,
        })
    }

    // ─────────────────────────────────────────────────────────────
    // DoS 与群速度
    // ─────────────────────────────────────────────────────────────

    pub fn band_inputs(&self) -> Result<BandInputs> {
        let dos = self.density_of_states()?;
        let group_velocity = self.group_velocity()?;
        Ok(BandInputs {
            dos,
            group_velocity,
        })
    }

    fn density_of_states(&self) -> Result<EnergyArray> {
        let material = &self.config.material;
        let inputs = &self.config.inputs;
        let scale = self.config.dos_scale();
        let dos = match inputs.dos {
            DosSource::Doscar => {
                let fit = parsers::doscar::load_density_of_states(&inputs.doscar, &inputs.dos_layout)?;
                fit.tabulate(&self.grid, scale)?
            }
            DosSource::Parabolic => {
                band::parabolic_dos(&self.grid, material.effective_mass_kg()) * scale
            }
            DosSource::Nonparabolic => {
                band::nonparabolic_dos(
                    &self.grid,
                    material.effective_mass_kg(),
                    material.nonparabolicity,
                ) * scale
            }
        };
        tracing::info!(source = ?inputs.dos, scale, "density of states tabulated");
        Ok(dos)
    }

    fn group_velocity(&self) -> Result<SweepEnergyArray> {
        let inputs = &self.config.inputs;
        let (ns, ne) = (self.sweep.len(), self.grid.len());

        match inputs.velocity {
            VelocitySource::BandStructure => {
                let raw =
                    parsers::eigenval::load_band_structure(&inputs.eigenval, &inputs.eigenval_layout)?;
                let k = raw.kpoint_magnitudes(&self.config.material.lattice());
                let [start, end] = inputs.valley_window;
                let segment =
                    band::select_valley_segment(k.view(), raw.band(inputs.band_index)?, start, end)?;
                let vg = band::group_velocity(&segment, &self.grid)?;
                Ok(SweepEnergyArray::from_shape_fn((ns, ne), |(_, i)| vg[i]))
            }
            VelocitySource::Analytic => {
                let material = &self.config.material;
                let mesh = KMesh::new(material.lattice_parameter, &inputs.velocity_mesh)?;
                let masses = material.valley_masses().map(|m| m * ME);

                // 相同温度只算一次
                let mut unique: Vec<f64> = Vec::new();
                let mut row_of = Vec::with_capacity(ns);
                for t in self.sweep.temperatures().iter() {
                    let idx = match unique.iter().position(|u| u.to_bits() == t.to_bits()) {
                        Some(idx) => idx,
                        None => {
                            unique.push(*t);
                            unique.len() - 1
                        }
                    };
                    row_of.push(idx);
                }

                let rows = self.runner.try_map(&unique, "Analytic group velocity", |t| {
                    band::analytic_group_velocity(
                        &mesh,
                        masses,
                        material.nonparabolicity,
                        *t,
                        &self.grid,
                    )
                })?;
                Ok(SweepEnergyArray::from_shape_fn((ns, ne), |(j, i)| {
                    rows[row_of[j]][i]
                }))
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // 费米能级
    // ─────────────────────────────────────────────────────────────

    pub fn fermi_levels(&self, band: &BandInputs) -> Result<FermiStage> {
        let material = &self.config.material;
        let search = &self.config.fermi_search;
        let grid = &self.grid;
        let dos = band.dos.view();

        let indices: Vec<usize> = (0..self.sweep.len()).collect();
        let records = self.runner.try_map(&indices, "Self-consistent Fermi levels", |&j| {
            let point = self.sweep.point(j);
            let t = point.temperature;
            let n = point.concentration;
            let jd = carriers::joyce_dixon(n, t, material.nc_prefactor)?;
            let solution = search.solve(n, t, grid, dos, jd)?;
            Ok(FermiRecord {
                temperature: t,
                target_concentration: n,
                analytic_fermi_level: jd,
                analytic_concentration: carriers::carrier_density(grid, dos, jd, t),
                fermi_level: solution.fermi_level,
                concentration: solution.concentration,
            })
        })?;

        let fermi_levels: Array1<f64> = records.iter().map(|r| r.fermi_level).collect();
        let mut dfde = SweepEnergyArray::zeros((self.sweep.len(), grid.len()));
        for (j, r) in records.iter().enumerate() {
            dfde.row_mut(j)
                .assign(&fermi_dirac(grid, r.fermi_level, r.temperature).derivative);
        }

        Ok(FermiStage {
            records,
            fermi_levels,
            dfde,
        })
    }

    // ─────────────────────────────────────────────────────────────
    // 弛豫时间
    // ─────────────────────────────────────────────────────────────

    pub fn lifetimes(&self, band: &BandInputs, fermi: &FermiStage) -> Result<LifetimeStage> {
        let nanoparticle = self.nanoparticle_lifetime()?;
        let screening = self.screening_lengths(fermi)?;

        let material = &self.config.material;
        let scattering = &self.config.scattering;
        let grid = &self.grid;
        let dos = band.dos.view();
        let scale = scattering.lifetime_scale;

        let indices: Vec<usize> = (0..self.sweep.len()).collect();
        let rows = self.runner.try_map(&indices, "Scattering lifetimes", |&j| {
            let point = self.sweep.point(j);
            let t = point.temperature;
            let phonon = phonon_lifetime(
                grid,
                material.nonparabolicity,
                scattering.deformation,
                t,
                material.sound_velocity(),
                dos,
                material.density,
            )?;
            let impurity = scattering.impurity.lifetime(
                grid,
                dos,
                &ImpurityParameters {
                    effective_mass: material.conduction_band_mass_at(t),
                    screening_length: screening[j],
                    concentration: fermi.records[j].concentration,
                    dielectric: material.dielectric,
                },
            )?;

            let phonon_scaled = &phonon.nonparabolic * scale;
            let impurity_scaled = &impurity * scale;
            let mut parts = vec![phonon_scaled.view(), impurity_scaled.view()];
            if let Some(np) = &nanoparticle {
                parts.push(np.view());
            }
            let combined = matthiessen(&parts)?;
            Ok((phonon, impurity, combined))
        })?;

        let shape = (self.sweep.len(), grid.len());
        let mut stage = LifetimeStage {
            phonon_parabolic: SweepEnergyArray::zeros(shape),
            phonon_nonparabolic: SweepEnergyArray::zeros(shape),
            impurity: SweepEnergyArray::zeros(shape),
            nanoparticle,
            combined: SweepEnergyArray::zeros(shape),
        };
        for (j, (phonon, impurity, combined)) in rows.into_iter().enumerate() {
            stage.phonon_parabolic.row_mut(j).assign(&phonon.parabolic);
            stage.phonon_nonparabolic.row_mut(j).assign(&phonon.nonparabolic);
            stage.impurity.row_mut(j).assign(&impurity);
            stage.combined.row_mut(j).assign(&combined);
        }
        Ok(stage)
    }

    /// 每个扫描点的屏蔽长度 (m)
    fn screening_lengths(&self, fermi: &FermiStage) -> Result<Array1<f64>> {
        let material = &self.config.material;
        let eps = material.dielectric;

        match self.config.scattering.screening {
            ScreeningModel::Nondegenerate => Ok(fermi
                .records
                .iter()
                .map(|r| carriers::nondegenerate_screening_length(eps, r.temperature, r.concentration))
                .collect()),
            ScreeningModel::Degenerate => {
                let path = self.config.inputs.fermi_integrals.as_ref().ok_or_else(|| {
                    TeFilterError::InvalidArgument(
                        "degenerate screening requires inputs.fermi_integrals".to_string(),
                    )
                })?;
                let table = FermiIntegralTable::load(path)?;
                let f0 = table.row(0)?;
                let f1 = table.row(1)?;
                self.sweep.check("Fermi integral F0 row", f0.len())?;
                self.sweep.check("Fermi integral F1 row", f1.len())?;
                Ok(degenerate_lengths(self, f0, f1))
            }
        }
    }

    fn nanoparticle_lifetime(&self) -> Result<Option<EnergyArray>> {
        let Some(np) = &self.config.nanoparticle else {
            return Ok(None);
        };
        let material = &self.config.material;
        let geometry = np.shape.geometry(np.quadrature_points())?;
        let mesh = KMesh::new(material.lattice_parameter, &np.mesh)?;
        let masses = material.valley_masses().map(|m| m * ME);

        output::print_info(&format!(
            "Nanoparticle scattering: {} inclusion, r = {:.2e} m, U0 = {} eV, {} k-points",
            geometry.name(),
            np.radius,
            np.barrier_height,
            mesh.len()
        ));
        let tau = nanoparticle_lifetime(
            geometry.as_ref(),
            &mesh,
            masses,
            &np.inclusion(),
            np.skip_lowest,
            &self.grid,
            &self.runner,
        )?;
        Ok(Some(tau))
    }

    // ─────────────────────────────────────────────────────────────
    // 输运系数
    // ─────────────────────────────────────────────────────────────

    pub fn coefficients(
        &self,
        band: &BandInputs,
        fermi: &FermiStage,
        lifetimes: &LifetimeStage,
    ) -> Result<Vec<TransportCoefficients>> {
        let indices: Vec<usize> = (0..self.sweep.len()).collect();
        self.runner.try_map(&indices, "Transport integrals", |&j| {
            let inputs = TransportInputs {
                grid: &self.grid,
                dos: band.dos.view(),
                group_velocity: band.group_velocity.row(j),
                fermi_level: fermi.fermi_levels[j],
                dfde: fermi.dfde.row(j),
                temperature: self.sweep.point(j).temperature,
            };
            compute_coefficients(&inputs, lifetimes.combined.row(j))
        })
    }
}

fn degenerate_lengths(pipeline: &Pipeline, f0: ArrayView1<f64>, f1: ArrayView1<f64>) -> Array1<f64> {
    let material = &pipeline.config.material;
    pipeline
        .sweep
        .points()
        .enumerate()
        .map(|(j, p)| {
            carriers::degenerate_screening_length(
                carriers::effective_density_of_states(material, p.temperature),
                material.dielectric,
                material.nonparabolicity,
                p.temperature,
                f0[j],
                f1[j],
            )
        })
        .collect()
}

/// 扫描轴：给出外来载流子表时为温度扫描（浓度 = 本征 + 外来），
/// 否则按 log10 浓度区间
fn build_sweep(config: &RunConfig) -> Result<Sweep> {
    match &config.inputs.extrinsic_carriers {
        Some(path) => {
            let table = ExtrinsicCarrierTable::load(path)?;
            let temperatures = config.sweep.temperatures.clone();
            let concentrations = temperatures
                .iter()
                .map(|t| carriers::total_concentration(&config.material, &table, *t))
                .collect();
            Sweep::new(temperatures, concentrations)
        }
        None => config.sweep.build(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NanoparticleConfig;
    use crate::transport::band::KMeshConfig;
    use crate::transport::InclusionShape;

    /// 无需输入文件的解析配置
    fn analytic_config() -> RunConfig {
        let mut config = RunConfig::default();
        config.grid.points = 400;
        config.sweep.points = 4;
        config.inputs.dos = DosSource::Nonparabolic;
        config.inputs.velocity = VelocitySource::Analytic;
        config.inputs.velocity_mesh = KMeshConfig {
            counts: [12, 12, 12],
            ..KMeshConfig::default()
        };
        config.scattering.screening = ScreeningModel::Nondegenerate;
        config.fermi_search.points = 800;
        config
    }

    fn pipeline(config: RunConfig) -> Pipeline {
        Pipeline::from_config(config, SweepRunner::new(2).unwrap().quiet()).unwrap()
    }

    #[test]
    fn test_analytic_pipeline_end_to_end() {
        let p = pipeline(analytic_config());
        let band = p.band_inputs().unwrap();
        assert_eq!(band.group_velocity.dim(), (4, 400));

        let fermi = p.fermi_levels(&band).unwrap();
        assert_eq!(fermi.records.len(), 4);
        // 浓度升高，费米能级单调上升
        for w in fermi.fermi_levels.windows(2) {
            assert!(w[1] > w[0]);
        }
        for r in &fermi.records {
            assert!((r.concentration - r.target_concentration).abs() / r.target_concentration < 0.05);
        }

        let lifetimes = p.lifetimes(&band, &fermi).unwrap();
        assert_eq!(lifetimes.combined.dim(), (4, 400));
        assert!(lifetimes.nanoparticle.is_none());
        assert_eq!(lifetimes.columns().len(), 4);
        assert!(lifetimes.combined.iter().all(|t| *t >= 0.0 && t.is_finite()));

        let coefficients = p.coefficients(&band, &fermi, &lifetimes).unwrap();
        assert_eq!(coefficients.len(), 4);
        for c in &coefficients {
            assert!(c.conductivity > 0.0);
            assert!(c.seebeck < 0.0);
        }
        // 电导率随掺杂升高
        assert!(coefficients[3].conductivity > coefficients[0].conductivity);
    }

    #[test]
    fn test_degenerate_screening_requires_table() {
        let mut config = analytic_config();
        config.scattering.screening = ScreeningModel::Degenerate;
        let p = pipeline(config);
        let band = p.band_inputs().unwrap();
        let fermi = p.fermi_levels(&band).unwrap();
        assert!(matches!(
            p.lifetimes(&band, &fermi),
            Err(TeFilterError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_nanoparticle_scales_dos_and_adds_mechanism() {
        let mut config = analytic_config();
        config.nanoparticle = Some(NanoparticleConfig {
            shape: InclusionShape::Cylinder,
            radius: 4e-9,
            barrier_height: 0.1,
            volume_fraction: 0.05,
            mesh: KMeshConfig {
                counts: [10, 10, 10],
                ..KMeshConfig::default()
            },
            quadrature_points: Some(200),
            skip_lowest: 5,
        });
        let p = pipeline(config);
        let band = p.band_inputs().unwrap();
        let plain = pipeline(analytic_config()).band_inputs().unwrap();
        let i = 200;
        assert!((band.dos[i] / plain.dos[i] - 1.05).abs() < 1e-12);

        let fermi = p.fermi_levels(&band).unwrap();
        let lifetimes = p.lifetimes(&band, &fermi).unwrap();
        assert!(lifetimes.nanoparticle.is_some());
        let columns = lifetimes.columns();
        assert_eq!(columns.len(), 5);
        assert_eq!(columns[3].0, "nanoparticle");
        assert_eq!(columns[3].1.dim(), (4, 400));
    }

    #[test]
    fn test_impurity_lifetime_uses_realized_concentration() {
        let config = analytic_config();
        let model = config.scattering.impurity;
        let material = config.material.clone();
        let p = pipeline(config);
        let band = p.band_inputs().unwrap();
        let mut fermi = p.fermi_levels(&band).unwrap();
        for r in fermi.records.iter_mut() {
            r.concentration *= 2.0;
        }
        let lifetimes = p.lifetimes(&band, &fermi).unwrap();

        for (j, r) in fermi.records.iter().enumerate() {
            let params = |concentration: f64| ImpurityParameters {
                effective_mass: material.conduction_band_mass_at(r.temperature),
                screening_length: carriers::nondegenerate_screening_length(
                    material.dielectric,
                    r.temperature,
                    r.concentration,
                ),
                concentration,
                dielectric: material.dielectric,
            };
            let realized = model
                .lifetime(&p.grid, band.dos.view(), &params(r.concentration))
                .unwrap();
            let target = model
                .lifetime(&p.grid, band.dos.view(), &params(r.target_concentration))
                .unwrap();
            assert_eq!(lifetimes.impurity.row(j), realized);
            assert_ne!(lifetimes.impurity.row(j), target);
        }
    }

    #[test]
    fn test_missing_doscar_is_reported() {
        let mut config = analytic_config();
        config.inputs.dos = DosSource::Doscar;
        config.inputs.doscar = "/nonexistent/DOSCAR".into();
        let p = pipeline(config);
        assert!(matches!(
            p.band_inputs(),
            Err(TeFilterError::FileReadError { .. })
        ));
    }
}
