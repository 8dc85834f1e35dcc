use bringup_core::report::RunReport;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_report(report: &RunReport) {
    println!("bring-up: {}", report.status);
    println!("  {}", report.message);

    if !report.endpoints.is_empty() {
        println!();
        for endpoint in &report.endpoints {
            println!("  {:<8} {}", format!("{}:", endpoint.name), endpoint.url);
        }
    }

    for hint in &report.hints {
        println!("  hint: {hint}");
    }
}
