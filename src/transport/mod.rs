//! # 输运计算模块
//!
//! 由能带数据、载流子统计与散射模型求输运系数，并扫描能量过滤效应。
//!
//! ## 数据流
//! ```text
//! band (DoS, v_g) → carriers (Ef, df/dE) → scattering / nanoparticle (τ)
//!                 → Matthiessen → coefficients / filtering → export
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `models/`、`numerics/`、`parsers/`、`batch/`
//! - 子模块: band, carriers, scattering, nanoparticle, coefficients, filtering, export

pub mod band;
pub mod carriers;
pub mod coefficients;
pub mod export;
pub mod filtering;
pub mod nanoparticle;
pub mod scattering;

pub use carriers::FermiSearch;
pub use coefficients::{compute_coefficients, TransportCoefficients, TransportInputs};
pub use filtering::{
    sweep_filtering_effect, BarrierSweep, FilteringConfig, FilteringInputs, FilteringResult,
};
pub use nanoparticle::{Inclusion, InclusionShape};
pub use scattering::{matthiessen, DeformationPotentials, ImpurityModel, ImpurityParameters};
