//! # filter 命令实现
//!
//! 以全流程得到的合并弛豫时间为基线，对每个势垒高度与扫描点求过滤后的
//! 输运系数，输出每个势垒下的最优功率因子与长表 CSV。
//!
//! ## 依赖关系
//! - 使用 `cli/filter.rs` 定义的参数
//! - 使用 `commands/pipeline.rs`、`transport/filtering.rs`、`transport/export.rs`
//! - 使用 `utils/output.rs`

use super::pipeline::Pipeline;
use crate::cli::filter::FilterArgs;
use crate::error::Result;
use crate::transport::export;
use crate::transport::{sweep_filtering_effect, BarrierSweep, FilteringInputs, FilteringResult};
use crate::utils::output;

use tabled::{Table, Tabled};

/// 每个势垒一行
#[derive(Debug, Clone, Tabled)]
struct BarrierRow {
    #[tabled(rename = "U (eV)")]
    barrier: String,
    #[tabled(rename = "max PF (mW/mK²)")]
    power_factor: String,
    #[tabled(rename = "at sweep #")]
    sweep_index: String,
    #[tabled(rename = "S (μV/K)")]
    seebeck: String,
}

/// 执行 filter 命令
pub fn execute(args: FilterArgs) -> Result<()> {
    output::print_header("Energy Filtering Sweep");

    let pipeline = Pipeline::prepare(&args.run)?;
    let mut range = pipeline.config.filtering.clone();
    if let Some(v) = args.barrier_start {
        range.barrier_start = v;
    }
    if let Some(v) = args.barrier_stop {
        range.barrier_stop = v;
    }
    if let Some(v) = args.barrier_step {
        range.barrier_step = v;
    }
    let barriers = BarrierSweep::from_config(&range)?;

    let band = pipeline.band_inputs()?;
    let fermi = pipeline.fermi_levels(&band)?;
    let lifetimes = pipeline.lifetimes(&band, &fermi)?;

    output::print_info(&format!(
        "{} barrier heights x {} sweep points",
        barriers.len(),
        pipeline.sweep.len()
    ));
    let inputs = FilteringInputs {
        grid: &pipeline.grid,
        dos: band.dos.view(),
        group_velocity: &band.group_velocity,
        fermi_levels: fermi.fermi_levels.view(),
        temperatures: pipeline.sweep.temperatures(),
        dfde: &fermi.dfde,
        baseline_lifetime: &lifetimes.combined,
    };
    let result = sweep_filtering_effect(
        &barriers,
        &inputs,
        range.filtered_lifetime,
        &pipeline.runner,
    )?;

    output::print_header("Best Power Factor per Barrier");
    println!("{}", Table::new(summary_rows(&result)));

    export::filtering_to_csv(&result, &pipeline.sweep, &args.output)?;
    output::print_success(&format!(
        "Filtering matrix ({} x {}) saved to '{}'",
        result.shape().0,
        result.shape().1,
        args.output.display()
    ));
    Ok(())
}

fn summary_rows(result: &FilteringResult) -> Vec<BarrierRow> {
    result
        .coefficients
        .outer_iter()
        .zip(result.barrier_heights.iter())
        .map(|(row, u)| {
            let best = row
                .iter()
                .enumerate()
                .filter(|(_, c)| c.power_factor.is_finite())
                .max_by(|a, b| a.1.power_factor.total_cmp(&b.1.power_factor));
            match best {
                Some((j, c)) => BarrierRow {
                    barrier: format!("{:.3}", u),
                    power_factor: format!("{:.4}", c.power_factor * 1e3),
                    sweep_index: j.to_string(),
                    seebeck: format!("{:.2}", c.seebeck * 1e6),
                },
                None => BarrierRow {
                    barrier: format!("{:.3}", u),
                    power_factor: "-".to_string(),
                    sweep_index: "-".to_string(),
                    seebeck: "-".to_string(),
                },
            }
        })
        .collect()
}
