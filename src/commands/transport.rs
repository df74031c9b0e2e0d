//! # transport 命令实现
//!
//! 全流程：费米能级 → 弛豫时间 → 输运系数，输出汇总表与 CSV。
//!
//! ## 依赖关系
//! - 使用 `cli/transport.rs` 定义的参数
//! - 使用 `commands/pipeline.rs`、`transport/export.rs`
//! - 使用 `utils/output.rs`

use super::pipeline::Pipeline;
use crate::cli::transport::TransportArgs;
use crate::error::Result;
use crate::models::Sweep;
use crate::transport::export;
use crate::transport::TransportCoefficients;
use crate::utils::output;

use tabled::{Table, Tabled};

/// 汇总表中的一行
#[derive(Debug, Clone, Tabled)]
struct TransportRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "T (K)")]
    temperature: String,
    #[tabled(rename = "n (cm^-3)")]
    concentration: String,
    #[tabled(rename = "Ef (eV)")]
    fermi_level: String,
    #[tabled(rename = "σ (S/m)")]
    conductivity: String,
    #[tabled(rename = "S (μV/K)")]
    seebeck: String,
    #[tabled(rename = "PF (mW/mK²)")]
    power_factor: String,
    #[tabled(rename = "κe (W/mK)")]
    thermal_conductivity: String,
}

/// 执行 transport 命令
pub fn execute(args: TransportArgs) -> Result<()> {
    output::print_header("Transport Coefficients");

    let pipeline = Pipeline::prepare(&args.run)?;
    let band = pipeline.band_inputs()?;
    let fermi = pipeline.fermi_levels(&band)?;
    let lifetimes = pipeline.lifetimes(&band, &fermi)?;
    let coefficients = pipeline.coefficients(&band, &fermi, &lifetimes)?;

    let non_finite = coefficients
        .iter()
        .filter(|c| !c.seebeck.is_finite())
        .count();
    if non_finite > 0 {
        output::print_warning(&format!(
            "{} sweep points have a vanishing carrier contribution (non-finite Seebeck)",
            non_finite
        ));
    }

    if let Some(best) = peak_power_factor(&coefficients) {
        let point = pipeline.sweep.point(best);
        output::print_info(&format!(
            "Peak power factor {:.3} mW/mK² at sweep point {} (T = {:.1} K, n = {:.3e} cm^-3)",
            coefficients[best].power_factor * 1e3,
            best,
            point.temperature,
            point.concentration / 1e6
        ));
    }

    output::print_header(&format!(
        "Transport (first {} of {} sweep points)",
        args.top_n.min(coefficients.len()),
        coefficients.len()
    ));
    let fermi_levels = fermi.fermi_levels.to_vec();
    println!(
        "{}",
        Table::new(summary_rows(&pipeline.sweep, &fermi_levels, &coefficients, args.top_n))
    );

    export::transport_to_csv(&pipeline.sweep, &fermi_levels, &coefficients, &args.output)?;
    output::print_success(&format!(
        "Transport coefficients saved to '{}'",
        args.output.display()
    ));

    if let Some(path) = &args.fermi_output {
        export::fermi_to_csv(&fermi.records, path)?;
        output::print_success(&format!("Fermi levels saved to '{}'", path.display()));
    }
    Ok(())
}

/// 功率因子最大的扫描点，忽略非有限值
fn peak_power_factor(coefficients: &[TransportCoefficients]) -> Option<usize> {
    coefficients
        .iter()
        .enumerate()
        .filter(|(_, c)| c.power_factor.is_finite())
        .max_by(|a, b| a.1.power_factor.total_cmp(&b.1.power_factor))
        .map(|(i, _)| i)
}

fn summary_rows(
    sweep: &Sweep,
    fermi_levels: &[f64],
    coefficients: &[TransportCoefficients],
    top_n: usize,
) -> Vec<TransportRow> {
    sweep
        .points()
        .zip(fermi_levels)
        .zip(coefficients)
        .take(top_n)
        .enumerate()
        .map(|(i, ((p, ef), c))| TransportRow {
            index: i,
            temperature: format!("{:.1}", p.temperature),
            concentration: format!("{:.3e}", p.concentration / 1e6),
            fermi_level: format!("{:.5}", ef),
            conductivity: format!("{:.4e}", c.conductivity),
            seebeck: format!("{:.2}", c.seebeck * 1e6),
            power_factor: format!("{:.4}", c.power_factor * 1e3),
            thermal_conductivity: format!("{:.4}", c.thermal_conductivity),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_power_factor_skips_nan() {
        let mut coefficients = vec![TransportCoefficients::default(); 3];
        coefficients[0].power_factor = f64::NAN;
        coefficients[1].power_factor = 2e-3;
        coefficients[2].power_factor = 1e-3;
        assert_eq!(peak_power_factor(&coefficients), Some(1));
        assert_eq!(peak_power_factor(&[]), None);
    }
}
