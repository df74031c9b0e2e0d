//! # 材料参数
//!
//! 单一材料的只读参数集合，缺省值为体硅（参考计算所用参数）。
//! 可从运行配置文件 `[material]` 段反序列化。
//!
//! ## 依赖关系
//! - 被 `config/`、`transport/` 使用
//! - 使用 `models/constants.rs`

use crate::models::constants::{KB, ME};
use crate::models::Lattice;

use serde::Deserialize;

/// Varshni 带隙模型 Eg(T) = Eg₀ − A·T²/(T + B)
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BandGapModel {
    /// 0 K 带隙 (eV)
    pub eg0: f64,
    /// A (eV/K)
    pub alpha: f64,
    /// B (K)
    pub beta: f64,
}

impl BandGapModel {
    pub fn at(&self, temperature: f64) -> f64 {
        self.eg0 - self.alpha * temperature * temperature / (temperature + self.beta)
    }
}

/// 材料参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MaterialModel {
    /// 晶格常数 (m)
    pub lattice_parameter: f64,
    /// 态密度有效质量 (mₑ)
    pub effective_mass: f64,
    /// 导带底有效质量 (mₑ)，用于屏蔽长度与有效态密度
    pub conduction_band_mass: f64,
    /// 纵向有效质量 (mₑ)
    pub longitudinal_mass: f64,
    /// 横向有效质量 (mₑ)
    pub transverse_mass: f64,
    /// 相对介电常数
    pub dielectric: f64,
    /// 体弹性模量 (GPa)
    pub bulk_modulus: f64,
    /// 质量密度 (kg/m³)
    pub density: f64,
    /// 非抛物性参数 α (1/eV)
    pub nonparabolicity: f64,
    /// 带隙
    pub band_gap: BandGapModel,
    /// 导带有效态密度前因子 Nc = A·T^{3/2} (m⁻³·K^{-3/2})
    pub nc_prefactor: f64,
    /// 价带有效态密度前因子 Nv = B·T^{3/2} (m⁻³·K^{-3/2})
    pub nv_prefactor: f64,
}

impl Default for MaterialModel {
    fn default() -> Self {
        MaterialModel::silicon()
    }
}

impl MaterialModel {
    /// 体硅
    pub fn silicon() -> Self {
        MaterialModel {
            lattice_parameter: 5.401803661945516e-10,
            effective_mass: 1.08,
            conduction_band_mass: 0.23,
            longitudinal_mass: 0.98,
            transverse_mass: 0.19,
            dielectric: 11.7,
            bulk_modulus: 98.0,
            density: 2329.0,
            nonparabolicity: 0.5,
            band_gap: BandGapModel {
                eg0: 1.17,
                alpha: 4.73e-4,
                beta: 636.0,
            },
            nc_prefactor: 5.3e21,
            nv_prefactor: 2.0e21,
        }
    }

    /// 声速 √(B/ρ) (m/s)
    pub fn sound_velocity(&self) -> f64 {
        (self.bulk_modulus * 1e9 / self.density).sqrt()
    }

    /// 态密度有效质量 (kg)
    pub fn effective_mass_kg(&self) -> f64 {
        self.effective_mass * ME
    }

    /// 随温度变化的导带底质量 m₀(1 + 5αkBT) (kg)
    pub fn conduction_band_mass_at(&self, temperature: f64) -> f64 {
        self.conduction_band_mass * ME * (1.0 + 5.0 * self.nonparabolicity * KB * temperature)
    }

    /// 椭球能谷三个主轴质量 [m_l, m_t, m_t] (mₑ)
    pub fn valley_masses(&self) -> [f64; 3] {
        [
            self.longitudinal_mass,
            self.transverse_mass,
            self.transverse_mass,
        ]
    }

    /// 面心立方原胞
    pub fn lattice(&self) -> Lattice {
        Lattice::fcc(self.lattice_parameter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_silicon_sound_velocity() {
        let si = MaterialModel::silicon();
        assert_relative_eq!(si.sound_velocity(), 6486.77, max_relative = 1e-5);
    }

    #[test]
    fn test_silicon_band_gap_at_300k() {
        let si = MaterialModel::silicon();
        // 1.17 − 4.73e-4·90000/936
        assert_relative_eq!(si.band_gap.at(300.0), 1.124519, max_relative = 1e-5);
    }
}
