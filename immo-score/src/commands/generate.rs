// immo-score/src/commands/generate.rs
//
// USE CASE: Generate one commune report, or every report of a province.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use immo_score_core::application::MunicipalityGenerator;
use immo_score_core::domain::Period;
use immo_score_core::domain::settings::{DataDomain, ReportSettings};
use immo_score_core::infrastructure::adapters::DuckDbWarehouse;
use tracing::info;

use crate::cli::PeriodOverrides;

pub fn apply_periods(settings: &mut ReportSettings, overrides: &PeriodOverrides) -> anyhow::Result<()> {
    let flags = [
        (DataDomain::RealEstateData, &overrides.real_estate_period),
        (DataDomain::EconomicData, &overrides.economic_period),
        (DataDomain::DemographicData, &overrides.demographic_period),
        (DataDomain::TaxData, &overrides.tax_period),
        (DataDomain::ConstructionData, &overrides.construction_period),
    ];
    for (domain, value) in flags {
        if let Some(period) = value {
            Period::parse(period).with_context(|| format!("Invalid period for {}", domain.as_str()))?;
            settings.periods.set(domain, period.as_str());
        }
    }
    Ok(())
}

pub async fn execute(
    mut settings: ReportSettings,
    commune: Option<i64>,
    province: Option<String>,
    periods: PeriodOverrides,
) -> anyhow::Result<()> {
    apply_periods(&mut settings, &periods)?;

    let db_path = settings.database_path.clone();
    if db_path != ":memory:" && !Path::new(&db_path).exists() {
        anyhow::bail!("❌ Warehouse not found at: {}\n👉 Check --db-path or IMMO_SCORE_DATABASE", db_path);
    }
    let warehouse = DuckDbWarehouse::new(&db_path)
        .with_context(|| format!("Failed to open the warehouse at {}", db_path))?;

    println!("🏘️  Generating reports (warehouse: {})", db_path);
    let generator = MunicipalityGenerator::new(settings, Arc::new(warehouse), province);
    generator.prepare_output_dirs()?;

    match commune {
        Some(id) => {
            if generator.generate_for_commune(id).await {
                println!("✨ Report generated for commune {}", id);
            } else {
                anyhow::bail!("❌ Generation failed for commune {}", id);
            }
        }
        None => {
            let summary = generator.generate_all().await;
            println!(
                "📝 Generation finished: {}/{} reports generated",
                summary.succeeded(),
                summary.total()
            );
            if summary.total() == 0 {
                anyhow::bail!("❌ No commune matched the requested scope");
            }
            let failed = summary.failed_ids();
            if !failed.is_empty() {
                info!(?failed, "Some communes failed");
            }
        }
    }
    Ok(())
}
