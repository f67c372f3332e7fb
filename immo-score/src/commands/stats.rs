// immo-score/src/commands/stats.rs
//
// USE CASE: Province-wide min/max of the canonical metrics -> {province}_stats.json.

use chrono::Local;
use comfy_table::{Table, presets::UTF8_FULL};

use immo_score_core::application::{CANONICAL_METRICS, ExtremeValues, files_by_province, find_extreme_values, write_stats};
use immo_score_core::domain::settings::{ReportSettings, province_dir_name};

fn display(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

pub fn summary_table(extremes: &ExtremeValues) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Metric", "Min", "Commune (min)", "Max", "Commune (max)"]);
    for (metric, values) in &extremes.metrics {
        let short = metric.rsplit('.').next().unwrap_or(metric);
        table.add_row(vec![
            short.to_string(),
            display(values.min.value),
            values.min.commune.clone(),
            display(values.max.value),
            values.max.commune.clone(),
        ]);
    }
    table
}

pub fn execute(settings: &ReportSettings, province: Option<String>) -> anyhow::Result<()> {
    println!("📊 Computing comparative statistics...");
    let mut provinces = files_by_province(&settings.output_dir);

    if let Some(requested) = province {
        let folder = province_dir_name(&requested);
        match provinces.remove(&folder) {
            Some(files) => provinces = [(folder, files)].into_iter().collect(),
            None => anyhow::bail!("❌ Province '{}' not found under {}", requested, settings.output_dir.display()),
        }
    }

    let today = Local::now().date_naive();
    for (name, files) in &provinces {
        println!("\n🔎 {} ({} reports)", name, files.len());
        let extremes = find_extreme_values(files, &CANONICAL_METRICS);
        println!("{}", summary_table(&extremes));
        let path = write_stats(&settings.output_dir, name, &extremes, today, &settings.json_format)?;
        println!("✨ Statistics saved to {}", path.display());
    }
    Ok(())
}
