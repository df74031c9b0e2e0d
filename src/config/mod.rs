//! # 运行配置
//!
//! 从 TOML 运行文件读取全部计算参数，可用 `TEFILTER__<段>__<键>` 形式的
//! 环境变量覆盖单个键（例如 `TEFILTER__GRID__POINTS=2000`）。
//! 缺省值对应体硅的参考计算。
//!
//! 输入文件的相对路径以运行文件所在目录为基准。
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `config` crate 合并文件与环境变量，`serde` 反序列化
//! - 各段类型定义于 `models/`、`parsers/`、`transport/`

use crate::error::{Result, TeFilterError};
use crate::models::constants::PER_CM3_TO_PER_M3;
use crate::models::{EnergyGrid, MaterialModel, Sweep};
use crate::numerics::linspace;
use crate::parsers::{DosLayout, EigenvalLayout};
use crate::transport::band::KMeshConfig;
use crate::transport::{
    DeformationPotentials, FermiSearch, FilteringConfig, ImpurityModel, Inclusion, InclusionShape,
};

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 完整的运行配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RunConfig {
    pub material: MaterialModel,
    pub grid: GridConfig,
    pub sweep: SweepConfig,
    pub inputs: InputsConfig,
    pub fermi_search: FermiSearch,
    pub scattering: ScatteringConfig,
    pub nanoparticle: Option<NanoparticleConfig>,
    pub filtering: FilteringConfig,
}

impl RunConfig {
    /// 读取运行文件并叠加环境变量覆盖
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(TeFilterError::FileReadError {
                path: path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "run file not found"),
            });
        }
        let settings = Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix("TEFILTER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let mut config: RunConfig = settings.try_deserialize()?;

        if let Some(base) = path.parent() {
            config.inputs.resolve_paths(base);
        }
        tracing::debug!(path = %path.display(), "run configuration loaded");
        Ok(config)
    }

    /// DoS 整体乘子：有纳米颗粒时按 1 + 体积分数放大
    pub fn dos_scale(&self) -> f64 {
        self.nanoparticle
            .as_ref()
            .map_or(1.0, |np| 1.0 + np.volume_fraction)
    }
}

/// 能量网格 (eV)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub energy_min: f64,
    pub energy_max: f64,
    pub points: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            energy_min: 0.0,
            energy_max: 1.0,
            points: 1000,
        }
    }
}

impl GridConfig {
    pub fn build(&self) -> Result<EnergyGrid> {
        EnergyGrid::new(self.energy_min, self.energy_max, self.points)
    }
}

/// 温度 / 浓度扫描
///
/// `temperatures` 只有一个值时为等温扫描；否则长度须等于 `points`，
/// 与浓度逐点配对。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// 温度 (K)
    pub temperatures: Vec<f64>,
    /// log10(n / cm⁻³) 下限
    pub log10_concentration_min: f64,
    /// log10(n / cm⁻³) 上限
    pub log10_concentration_max: f64,
    pub points: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            temperatures: vec![300.0],
            log10_concentration_min: 19.0,
            log10_concentration_max: 21.0,
            points: 100,
        }
    }
}

impl SweepConfig {
    pub fn build(&self) -> Result<Sweep> {
        match self.temperatures.as_slice() {
            [] => Err(TeFilterError::InvalidArgument(
                "sweep.temperatures must not be empty".to_string(),
            )),
            [t] => Sweep::isothermal_log10(
                *t,
                self.log10_concentration_min,
                self.log10_concentration_max,
                self.points,
            ),
            temperatures => {
                TeFilterError::check_len("sweep.temperatures", self.points, temperatures.len())?;
                let concentrations = linspace(
                    self.log10_concentration_min,
                    self.log10_concentration_max,
                    self.points,
                )
                .iter()
                .map(|p| 10f64.powf(*p) * PER_CM3_TO_PER_M3)
                .collect();
                Sweep::new(temperatures.to_vec(), concentrations)
            }
        }
    }
}

/// 态密度来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DosSource {
    #[default]
    Doscar,
    Parabolic,
    Nonparabolic,
}

/// 群速度来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum VelocitySource {
    /// EIGENVAL 能谷段数值微分
    #[default]
    BandStructure,
    /// 椭球非抛物能谷解析式，随温度变化
    Analytic,
}

/// 输入文件及其布局
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputsConfig {
    pub dos: DosSource,
    pub velocity: VelocitySource,
    pub eigenval: PathBuf,
    pub eigenval_layout: EigenvalLayout,
    /// 导带所在的能带下标
    pub band_index: usize,
    /// 能谷段所在的 k 点下标窗口 [起, 止)
    pub valley_window: [usize; 2],
    /// 解析群速度使用的 k 点网格
    pub velocity_mesh: KMeshConfig,
    pub doscar: PathBuf,
    pub dos_layout: DosLayout,
    /// 0 阶 / 1 阶费米积分表，简并屏蔽时必需
    pub fermi_integrals: Option<PathBuf>,
    /// 外来载流子浓度表；给出时扫描浓度取本征 + 外来
    pub extrinsic_carriers: Option<PathBuf>,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            dos: DosSource::default(),
            velocity: VelocitySource::default(),
            eigenval: PathBuf::from("EIGENVAL"),
            eigenval_layout: EigenvalLayout {
                header_lines: 6,
                bands_per_kpoint: 8,
                num_kpoints: Some(800),
            },
            band_index: 4,
            valley_window: [400, 600],
            velocity_mesh: KMeshConfig::default(),
            doscar: PathBuf::from("DOSCAR"),
            dos_layout: DosLayout {
                header_lines: 6,
                max_rows: 2000,
                reference_row: 1118,
                unit_cell_volume: 2.0 * 19.70272e-30,
            },
            fermi_integrals: None,
            extrinsic_carriers: None,
        }
    }
}

impl InputsConfig {
    fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.eigenval);
        join(&mut self.doscar);
        if let Some(p) = self.fermi_integrals.as_mut() {
            join(p);
        }
        if let Some(p) = self.extrinsic_carriers.as_mut() {
            join(p);
        }
    }
}

/// 屏蔽长度形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ScreeningModel {
    #[default]
    Degenerate,
    Nondegenerate,
}

/// 声子与电离杂质散射
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScatteringConfig {
    #[serde(flatten)]
    pub deformation: DeformationPotentials,
    pub impurity: ImpurityModel,
    pub screening: ScreeningModel,
    /// 声子与杂质弛豫时间在合并前的整体乘子
    pub lifetime_scale: f64,
}

impl Default for ScatteringConfig {
    fn default() -> Self {
        Self {
            deformation: DeformationPotentials::default(),
            impurity: ImpurityModel::default(),
            screening: ScreeningModel::default(),
            lifetime_scale: 6.0,
        }
    }
}

/// 纳米颗粒夹杂
#[derive(Debug, Clone, Deserialize)]
pub struct NanoparticleConfig {
    pub shape: InclusionShape,
    /// 半径 (m)
    pub radius: f64,
    /// 势垒高度 (eV)
    pub barrier_height: f64,
    #[serde(default = "NanoparticleConfig::default_volume_fraction")]
    pub volume_fraction: f64,
    #[serde(default)]
    pub mesh: KMeshConfig,
    /// 圆柱为参数角点数，球为三角剖分分辨率；为空时按形状取缺省
    #[serde(default)]
    pub quadrature_points: Option<usize>,
    /// 拟合前丢弃的最低唯一能量个数
    #[serde(default = "NanoparticleConfig::default_skip_lowest")]
    pub skip_lowest: usize,
}

impl NanoparticleConfig {
    fn default_volume_fraction() -> f64 {
        0.05
    }

    fn default_skip_lowest() -> usize {
        30
    }

    pub fn inclusion(&self) -> Inclusion {
        Inclusion {
            barrier_height: self.barrier_height,
            radius: self.radius,
            volume_fraction: self.volume_fraction,
        }
    }

    pub fn quadrature_points(&self) -> usize {
        self.quadrature_points.unwrap_or(match self.shape {
            InclusionShape::Cylinder => 2000,
            InclusionShape::Sphere => 32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn parse(toml: &str) -> RunConfig {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_empty_file_gives_silicon_defaults() {
        let config = parse("");
        assert_eq!(config.grid.points, 1000);
        assert_eq!(config.sweep.temperatures, vec![300.0]);
        assert_eq!(config.inputs.band_index, 4);
        assert_eq!(config.inputs.valley_window, [400, 600]);
        assert_eq!(config.scattering.deformation.da, 9.5);
        assert_eq!(config.scattering.lifetime_scale, 6.0);
        assert_eq!(config.material.dielectric, 11.7);
        assert!(config.nanoparticle.is_none());
        assert_eq!(config.dos_scale(), 1.0);

        let sweep = config.sweep.build().unwrap();
        assert_eq!(sweep.len(), 100);
        assert_eq!(config.grid.build().unwrap().len(), 1000);
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = parse(
            r#"
            [grid]
            energy_max = 0.8
            points = 400

            [sweep]
            temperatures = [300.0, 400.0, 500.0]
            points = 3

            [inputs]
            dos = "nonparabolic"
            velocity = "analytic"
            fermi_integrals = "f_300K.csv"

            [scattering]
            dv = 3.0
            impurity = "screened"
            screening = "nondegenerate"

            [nanoparticle]
            shape = "sphere"
            radius = 4e-9
            barrier_height = 0.1

            [filtering]
            barrier_step = 0.05
            "#,
        );
        assert_eq!(config.grid.energy_max, 0.8);
        assert_eq!(config.inputs.dos, DosSource::Nonparabolic);
        assert_eq!(config.inputs.velocity, VelocitySource::Analytic);
        assert_eq!(config.scattering.deformation.dv, 3.0);
        assert_eq!(config.scattering.deformation.da, 9.5);
        assert_eq!(config.scattering.impurity, ImpurityModel::Screened);
        assert_eq!(config.scattering.screening, ScreeningModel::Nondegenerate);
        assert_eq!(config.filtering.barrier_step, 0.05);
        assert_eq!(config.filtering.filtered_lifetime, 1e-20);

        let np = config.nanoparticle.as_ref().unwrap();
        assert_eq!(np.shape, InclusionShape::Sphere);
        assert_eq!(np.volume_fraction, 0.05);
        assert_eq!(np.skip_lowest, 30);
        assert_eq!(np.quadrature_points(), 32);
        assert!((config.dos_scale() - 1.05).abs() < 1e-12);

        let sweep = config.sweep.build().unwrap();
        assert_eq!(sweep.temperatures().to_vec(), vec![300.0, 400.0, 500.0]);
    }

    #[test]
    fn test_sweep_temperature_count_must_match() {
        let sweep = SweepConfig {
            temperatures: vec![300.0, 400.0],
            points: 5,
            ..SweepConfig::default()
        };
        assert!(matches!(
            sweep.build(),
            Err(TeFilterError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_relative_inputs_resolve_against_run_file() {
        let mut inputs = InputsConfig {
            fermi_integrals: Some(PathBuf::from("tables/f.csv")),
            ..InputsConfig::default()
        };
        inputs.resolve_paths(Path::new("/data/run"));
        assert_eq!(inputs.eigenval, PathBuf::from("/data/run/EIGENVAL"));
        assert_eq!(
            inputs.fermi_integrals,
            Some(PathBuf::from("/data/run/tables/f.csv"))
        );
    }

    #[test]
    fn test_missing_run_file() {
        assert!(matches!(
            RunConfig::load(Path::new("/nonexistent/run.toml")),
            Err(TeFilterError::FileReadError { .. })
        ));
    }
}
