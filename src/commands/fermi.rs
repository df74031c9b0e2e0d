//! # fermi 命令实现
//!
//! 对每个扫描点求 Joyce–Dixon 初值与自洽费米能级，输出汇总表与 CSV。
//!
//! ## 依赖关系
//! - 使用 `cli/fermi.rs` 定义的参数
//! - 使用 `commands/pipeline.rs`、`transport/export.rs`
//! - 使用 `utils/output.rs`

use super::pipeline::Pipeline;
use crate::cli::fermi::FermiArgs;
use crate::error::Result;
use crate::transport::export::{self, FermiRecord};
use crate::utils::output;

use tabled::{Table, Tabled};

/// 汇总表中的一行
#[derive(Debug, Clone, Tabled)]
struct FermiRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "T (K)")]
    temperature: String,
    #[tabled(rename = "n target (cm^-3)")]
    target: String,
    #[tabled(rename = "Ef JD (eV)")]
    analytic: String,
    #[tabled(rename = "Ef SC (eV)")]
    fermi_level: String,
    #[tabled(rename = "n SC (cm^-3)")]
    realized: String,
}

/// 执行 fermi 命令
pub fn execute(args: FermiArgs) -> Result<()> {
    output::print_header("Self-consistent Fermi Levels");

    let pipeline = Pipeline::prepare(&args.run)?;
    let band = pipeline.band_inputs()?;
    let fermi = pipeline.fermi_levels(&band)?;

    output::print_header(&format!(
        "Fermi Levels (first {} of {} sweep points)",
        args.top_n.min(fermi.records.len()),
        fermi.records.len()
    ));
    println!("{}", Table::new(summary_rows(&fermi.records, args.top_n)));

    export::fermi_to_csv(&fermi.records, &args.output)?;
    output::print_success(&format!("Fermi levels saved to '{}'", args.output.display()));
    Ok(())
}

fn summary_rows(records: &[FermiRecord], top_n: usize) -> Vec<FermiRow> {
    records
        .iter()
        .take(top_n)
        .enumerate()
        .map(|(i, r)| FermiRow {
            index: i,
            temperature: format!("{:.1}", r.temperature),
            target: format!("{:.3e}", r.target_concentration / 1e6),
            analytic: format!("{:.5}", r.analytic_fermi_level),
            fermi_level: format!("{:.5}", r.fermi_level),
            realized: format!("{:.3e}", r.concentration / 1e6),
        })
        .collect()
}
