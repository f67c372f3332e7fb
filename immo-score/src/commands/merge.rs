// immo-score/src/commands/merge.rs
//
// USE CASE: Merge every report of a province -> {province}_all.json.

use chrono::Local;

use immo_score_core::application::{files_by_province, merge_reports};
use immo_score_core::domain::settings::{ReportSettings, province_dir_name};

pub fn execute(settings: &ReportSettings, province: String) -> anyhow::Result<()> {
    let folder = province_dir_name(&province);
    println!("🗂️  Merging reports for province {}...", folder);

    let provinces = files_by_province(&settings.output_dir);
    let Some(files) = provinces.get(&folder) else {
        anyhow::bail!("❌ Province '{}' not found under {}", province, settings.output_dir.display());
    };
    if files.is_empty() {
        anyhow::bail!("❌ No report found for province {}", folder);
    }

    let output = settings.output_dir.join(format!("{folder}_all.json"));
    let today = Local::now().date_naive();
    if merge_reports(files, &output, today, &settings.json_format)? {
        println!("✨ Merged {} files into {}", files.len(), output.display());
        Ok(())
    } else {
        anyhow::bail!("❌ Merge failed for province {}: no readable report", folder)
    }
}
