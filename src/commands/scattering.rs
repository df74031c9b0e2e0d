//! # scattering 命令实现
//!
//! 计算各散射机制的能量分辨弛豫时间，打印所选扫描点在若干能量处的
//! 取值，并把 (扫描点 × 能量) 全表写入 CSV。
//!
//! ## 依赖关系
//! - 使用 `cli/scattering.rs` 定义的参数
//! - 使用 `commands/pipeline.rs`、`transport/export.rs`
//! - 使用 `utils/output.rs`

use super::pipeline::Pipeline;
use crate::cli::scattering::ScatteringArgs;
use crate::error::{Result, TeFilterError};
use crate::models::{EnergyGrid, SweepEnergyArray};
use crate::transport::export;
use crate::utils::output;

use tabled::builder::Builder;

/// 执行 scattering 命令
pub fn execute(args: ScatteringArgs) -> Result<()> {
    output::print_header("Scattering Lifetimes");

    let pipeline = Pipeline::prepare(&args.run)?;
    if args.sweep_index >= pipeline.sweep.len() {
        return Err(TeFilterError::InvalidArgument(format!(
            "sweep index {} out of range ({} sweep points)",
            args.sweep_index,
            pipeline.sweep.len()
        )));
    }

    let band = pipeline.band_inputs()?;
    let fermi = pipeline.fermi_levels(&band)?;
    let lifetimes = pipeline.lifetimes(&band, &fermi)?;
    let columns = lifetimes.columns();

    let point = pipeline.sweep.point(args.sweep_index);
    output::print_header(&format!(
        "Lifetimes (s) at T = {:.1} K, n = {:.3e} cm^-3",
        point.temperature,
        point.concentration / 1e6
    ));
    println!(
        "{}",
        summary_table(&pipeline.grid, &columns, args.sweep_index, &args.energies)
    );

    let named: Vec<(&str, &SweepEnergyArray)> =
        columns.iter().map(|(name, values)| (*name, values)).collect();
    export::lifetimes_to_csv(&pipeline.grid, &pipeline.sweep, &named, &args.output)?;
    output::print_success(&format!("Lifetimes saved to '{}'", args.output.display()));
    Ok(())
}

/// 机制为列、所选能量为行的表；能量取网格上最近的点
fn summary_table(
    grid: &EnergyGrid,
    columns: &[(&'static str, SweepEnergyArray)],
    sweep_index: usize,
    energies: &[f64],
) -> tabled::Table {
    let mut builder = Builder::default();
    let mut header = vec!["E (eV)".to_string()];
    header.extend(columns.iter().map(|(name, _)| name.to_string()));
    builder.push_record(header);

    let grid_energies = grid.energies();
    for &target in energies {
        if target < grid.min() || target > grid.max() {
            output::print_warning(&format!("{} eV is outside the energy grid, skipped", target));
            continue;
        }
        let i = ((target - grid.min()) / grid.spacing()).round() as usize;
        let i = i.min(grid.len() - 1);
        let mut row = vec![format!("{:.4}", grid_energies[i])];
        row.extend(
            columns
                .iter()
                .map(|(_, values)| format!("{:.3e}", values[[sweep_index, i]])),
        );
        builder.push_record(row);
    }
    builder.build()
}
