//! # 结果导出
//!
//! 将计算结果导出为 CSV，供下游绘图使用。
//!
//! ## 支持的表
//! - 费米能级：每个扫描点一行（Joyce–Dixon 初值与自洽结果）
//! - 弛豫时间：每个 (扫描点, 能量) 一行，每种机制一列
//! - 输运系数：每个扫描点一行
//! - 过滤矩阵：长表，每个 (势垒, 扫描点) 一行
//!
//! ## 依赖关系
//! - 被 `commands/` 调用
//! - 使用 `csv` 库写入 CSV 文件

use crate::error::{Result, TeFilterError};
use crate::models::{EnergyGrid, Sweep, SweepEnergyArray};
use crate::transport::coefficients::TransportCoefficients;
use crate::transport::filtering::FilteringResult;

use std::io::Write;
use std::path::Path;

/// 单个扫描点的费米能级记录
#[derive(Debug, Clone, Copy)]
pub struct FermiRecord {
    pub temperature: f64,
    pub target_concentration: f64,
    pub analytic_fermi_level: f64,
    pub analytic_concentration: f64,
    pub fermi_level: f64,
    pub concentration: f64,
}

fn open(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    Ok(csv::Writer::from_path(path)?)
}

fn finish<W: Write>(mut wtr: csv::Writer<W>, path: &Path) -> Result<()> {
    wtr.flush().map_err(|e| TeFilterError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

fn sci(v: f64) -> String {
    format!("{:.8e}", v)
}

// ─────────────────────────────────────────────────────────────
// 费米能级
// ─────────────────────────────────────────────────────────────

/// 导出费米能级表
pub fn fermi_to_csv(records: &[FermiRecord], path: &Path) -> Result<()> {
    let mut wtr = open(path)?;
    write_fermi(&mut wtr, records)?;
    finish(wtr, path)
}

fn write_fermi<W: Write>(wtr: &mut csv::Writer<W>, records: &[FermiRecord]) -> Result<()> {
    wtr.write_record([
        "sweep_index",
        "temperature_K",
        "target_concentration_m3",
        "jd_fermi_level_eV",
        "jd_concentration_m3",
        "fermi_level_eV",
        "concentration_m3",
    ])?;
    for (i, r) in records.iter().enumerate() {
        wtr.write_record([
            i.to_string(),
            format!("{:.2}", r.temperature),
            sci(r.target_concentration),
            format!("{:.8}", r.analytic_fermi_level),
            sci(r.analytic_concentration),
            format!("{:.8}", r.fermi_level),
            sci(r.concentration),
        ])?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────
// 弛豫时间
// ─────────────────────────────────────────────────────────────

/// 导出弛豫时间表；每列为一种机制，形状均为 (扫描点 × 能量)
pub fn lifetimes_to_csv(
    grid: &EnergyGrid,
    sweep: &Sweep,
    columns: &[(&str, &SweepEnergyArray)],
    path: &Path,
) -> Result<()> {
    let mut wtr = open(path)?;
    write_lifetimes(&mut wtr, grid, sweep, columns)?;
    finish(wtr, path)
}

fn write_lifetimes<W: Write>(
    wtr: &mut csv::Writer<W>,
    grid: &EnergyGrid,
    sweep: &Sweep,
    columns: &[(&str, &SweepEnergyArray)],
) -> Result<()> {
    for (name, values) in columns {
        grid.check_rows(name, values, sweep.len())?;
    }

    let mut header = vec![
        "sweep_index".to_string(),
        "temperature_K".to_string(),
        "concentration_m3".to_string(),
        "energy_eV".to_string(),
    ];
    header.extend(columns.iter().map(|(name, _)| format!("tau_{}_s", name)));
    wtr.write_record(&header)?;

    let energies = grid.energies();
    for (j, point) in sweep.points().enumerate() {
        for (e_idx, e) in energies.iter().enumerate() {
            let mut row = vec![
                j.to_string(),
                format!("{:.2}", point.temperature),
                sci(point.concentration),
                format!("{:.6}", e),
            ];
            row.extend(columns.iter().map(|(_, v)| sci(v[[j, e_idx]])));
            wtr.write_record(&row)?;
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────
// 输运系数
// ─────────────────────────────────────────────────────────────

const COEFFICIENT_COLUMNS: [&str; 7] = [
    "sigma_S_m",
    "seebeck_V_K",
    "power_factor_W_mK2",
    "kappa_e_W_mK",
    "delta1_eV",
    "delta2_eV2",
    "lorenz",
];

fn coefficient_fields(c: &TransportCoefficients) -> [String; 7] {
    [
        sci(c.conductivity),
        sci(c.seebeck),
        sci(c.power_factor),
        sci(c.thermal_conductivity),
        sci(c.delta1),
        sci(c.delta2),
        sci(c.lorenz),
    ]
}

/// 导出每个扫描点的输运系数
pub fn transport_to_csv(
    sweep: &Sweep,
    fermi_levels: &[f64],
    coefficients: &[TransportCoefficients],
    path: &Path,
) -> Result<()> {
    let mut wtr = open(path)?;
    write_transport(&mut wtr, sweep, fermi_levels, coefficients)?;
    finish(wtr, path)
}

fn write_transport<W: Write>(
    wtr: &mut csv::Writer<W>,
    sweep: &Sweep,
    fermi_levels: &[f64],
    coefficients: &[TransportCoefficients],
) -> Result<()> {
    sweep.check("Fermi levels", fermi_levels.len())?;
    sweep.check("transport coefficients", coefficients.len())?;

    let mut header = vec![
        "sweep_index",
        "temperature_K",
        "concentration_m3",
        "fermi_level_eV",
    ];
    header.extend(COEFFICIENT_COLUMNS);
    wtr.write_record(&header)?;

    for (j, point) in sweep.points().enumerate() {
        let mut row = vec![
            j.to_string(),
            format!("{:.2}", point.temperature),
            sci(point.concentration),
            format!("{:.8}", fermi_levels[j]),
        ];
        row.extend(coefficient_fields(&coefficients[j]));
        wtr.write_record(&row)?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────
// 过滤矩阵
// ─────────────────────────────────────────────────────────────

/// 导出过滤矩阵（长表，势垒优先）
pub fn filtering_to_csv(result: &FilteringResult, sweep: &Sweep, path: &Path) -> Result<()> {
    let mut wtr = open(path)?;
    write_filtering(&mut wtr, result, sweep)?;
    finish(wtr, path)
}

fn write_filtering<W: Write>(
    wtr: &mut csv::Writer<W>,
    result: &FilteringResult,
    sweep: &Sweep,
) -> Result<()> {
    let (nb, ns) = result.shape();
    sweep.check("filtering matrix columns", ns)?;

    let mut header = vec![
        "barrier_index",
        "barrier_eV",
        "sweep_index",
        "temperature_K",
        "concentration_m3",
    ];
    header.extend(COEFFICIENT_COLUMNS);
    wtr.write_record(&header)?;

    for b in 0..nb {
        for (j, point) in sweep.points().enumerate() {
            let mut row = vec![
                b.to_string(),
                format!("{:.6}", result.barrier_heights[b]),
                j.to_string(),
                format!("{:.2}", point.temperature),
                sci(point.concentration),
            ];
            row.extend(coefficient_fields(&result.coefficients[[b, j]]));
            wtr.write_record(&row)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn to_string(wtr: csv::Writer<Vec<u8>>) -> String {
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_lifetime_table_layout() {
        let grid = EnergyGrid::new(0.0, 1.0, 3).unwrap();
        let sweep = Sweep::new(vec![300.0, 300.0], vec![1e25, 1e26]).unwrap();
        let tau = SweepEnergyArray::from_elem((2, 3), 1e-14);
        let mut wtr = csv::Writer::from_writer(vec![]);
        write_lifetimes(&mut wtr, &grid, &sweep, &[("phonon", &tau), ("combined", &tau)])
            .unwrap();
        let text = to_string(wtr);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1 + 2 * 3);
        assert!(lines[0].ends_with("tau_phonon_s,tau_combined_s"));
        assert!(lines[4].starts_with("1,300.00,"));
    }

    #[test]
    fn test_lifetime_table_rejects_wrong_shape() {
        let grid = EnergyGrid::new(0.0, 1.0, 3).unwrap();
        let sweep = Sweep::new(vec![300.0], vec![1e25]).unwrap();
        let tau = SweepEnergyArray::zeros((3, 1));
        let mut wtr = csv::Writer::from_writer(vec![]);
        assert!(matches!(
            write_lifetimes(&mut wtr, &grid, &sweep, &[("phonon", &tau)]),
            Err(TeFilterError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_filtering_table_is_barrier_major() {
        let sweep = Sweep::new(vec![300.0, 500.0], vec![1e25, 1e25]).unwrap();
        let mut coefficients = Array2::<TransportCoefficients>::default((2, 2));
        coefficients[[1, 0]].power_factor = 3.0;
        let result = FilteringResult {
            barrier_heights: Array1::from(vec![0.0, 0.1]),
            coefficients,
        };
        let mut wtr = csv::Writer::from_writer(vec![]);
        write_filtering(&mut wtr, &result, &sweep).unwrap();
        let text = to_string(wtr);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[3].starts_with("1,0.100000,0,300.00,"));
        assert!(lines[3].contains("3.00000000e0"));
    }

    #[test]
    fn test_fermi_table_row_per_sweep_point() {
        let records = vec![
            FermiRecord {
                temperature: 300.0,
                target_concentration: 1e25,
                analytic_fermi_level: -0.1,
                analytic_concentration: 9e24,
                fermi_level: -0.09,
                concentration: 1e25,
            };
            4
        ];
        let mut wtr = csv::Writer::from_writer(vec![]);
        write_fermi(&mut wtr, &records).unwrap();
        assert_eq!(to_string(wtr).lines().count(), 5);
    }
}
