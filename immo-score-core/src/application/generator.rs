// immo-score-core/src/application/generator.rs

use chrono::{Local, NaiveDate};
use serde_json::{Map, Value, json};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::application::extractors::{
    BuildingExtractor, DemographicsExtractor, EconomicsExtractor, Extractor, ExtractorBase, ExtractorScope,
    GeographyExtractor, RealEstateExtractor,
};
use crate::application::processors::{
    BuildingProcessor, DemographicSections, DemographicsProcessor, EconomicsProcessor, InvestmentProcessor,
    ProcessingContext, RealEstateProcessor, empty_section,
};
use crate::domain::error::DomainError;
use crate::domain::metadata::{ReportMetadata, validate_report_structure};
use crate::domain::outcome::ExtractionOutcome;
use crate::domain::settings::{ReportSettings, province_dir_name};
use crate::domain::value::f64_at_path;
use crate::error::ImmoScoreError;
use crate::infrastructure::json::write_json;
use crate::ports::warehouse::Warehouse;

const PROVINCE_PREFIXES: [&str; 4] = ["Province de ", "Province du ", "Province d'", "Zone administrative de "];

/// Output folder for a province label as stored in the warehouse ("Province de Namur" -> "namur").
pub fn province_folder(province: &str) -> String {
    let bare = PROVINCE_PREFIXES
        .iter()
        .find_map(|prefix| province.strip_prefix(prefix))
        .unwrap_or(province);
    province_dir_name(bare.trim())
}

/// Result of a batch run, one entry per municipality in enumeration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationSummary {
    pub results: Vec<(i64, bool)>,
}

impl GenerationSummary {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|(_, ok)| *ok).count()
    }

    pub fn failed_ids(&self) -> Vec<i64> {
        self.results.iter().filter(|(_, ok)| !ok).map(|(id, _)| *id).collect()
    }
}

/// Drives extraction, processing and writing for one municipality or a whole province.
pub struct MunicipalityGenerator {
    settings: ReportSettings,
    warehouse: Arc<dyn Warehouse>,
    scope: ExtractorScope,
    context: ProcessingContext,
    today: NaiveDate,
}

impl MunicipalityGenerator {
    pub fn new(settings: ReportSettings, warehouse: Arc<dyn Warehouse>, province: Option<String>) -> Self {
        let scope = ExtractorScope::new(None, province, settings.periods.clone());
        let context = ProcessingContext::from_settings(&settings);
        Self {
            settings,
            warehouse,
            scope,
            context,
            today: Local::now().date_naive(),
        }
    }

    /// Pins the generation date written into the metadata.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Creates the output root and one folder per configured province.
    pub fn prepare_output_dirs(&self) -> Result<(), ImmoScoreError> {
        fs::create_dir_all(&self.settings.output_dir)?;
        for province in &self.settings.provinces {
            fs::create_dir_all(self.settings.output_dir.join(province_dir_name(province)))?;
        }
        Ok(())
    }

    fn scope_for(&self, municipality_id: i64) -> ExtractorScope {
        let mut scope = self.scope.clone();
        scope.municipality_id = Some(municipality_id);
        scope
    }

    /// Generates and writes one report. Every failure stops at this boundary.
    #[instrument(skip(self), fields(commune = municipality_id))]
    pub async fn generate_for_commune(&self, municipality_id: i64) -> bool {
        match self.write_report(municipality_id).await {
            Ok(path) => {
                info!(commune = municipality_id, path = %path.display(), "✅ Report written");
                true
            }
            Err(e) => {
                error!(commune = municipality_id, error = %e, "❌ Report generation failed");
                false
            }
        }
    }

    /// Generates every current municipality of the scoped province (or all of them).
    #[instrument(skip(self), fields(province = self.scope.province.as_deref().unwrap_or("all")))]
    pub async fn generate_all(&self) -> GenerationSummary {
        let base = ExtractorBase::new(self.warehouse.clone(), self.scope.clone());
        let municipalities = match base.list_municipalities().await {
            ExtractionOutcome::Data(list) => list,
            ExtractionOutcome::Empty => {
                warn!("No municipality matches the requested scope");
                Vec::new()
            }
            ExtractionOutcome::Failed(cause) => {
                error!(cause = %cause, "Could not enumerate municipalities");
                Vec::new()
            }
        };

        let mut summary = GenerationSummary::default();
        for municipality in municipalities {
            info!(commune = municipality.id, name = %municipality.name, "Generating report");
            let ok = self.generate_for_commune(municipality.id).await;
            summary.results.push((municipality.id, ok));
        }

        info!(
            "Generation finished: {}/{} succeeded",
            summary.succeeded(),
            summary.total()
        );
        summary
    }

    async fn write_report(&self, municipality_id: i64) -> Result<PathBuf, ImmoScoreError> {
        let (report, path) = self.build_report(municipality_id).await?;
        write_json(&path, &report, &self.settings.json_format)?;
        Ok(path)
    }

    /// Assembles the full report without touching the filesystem.
    pub async fn build_report(&self, municipality_id: i64) -> Result<(Value, PathBuf), ImmoScoreError> {
        let base = ExtractorBase::new(self.warehouse.clone(), self.scope_for(municipality_id));
        let geography = GeographyExtractor::from_base(base.clone());

        let profile = match geography.commune_profile(municipality_id).await {
            ExtractionOutcome::Data(profile) => profile,
            ExtractionOutcome::Empty => {
                return Err(DomainError::MunicipalityNotFound(municipality_id.to_string()).into());
            }
            ExtractionOutcome::Failed(cause) => {
                return Err(ImmoScoreError::InternalError(format!(
                    "commune {municipality_id} could not be resolved: {cause}"
                )));
            }
        };

        let province = profile.identity.province.clone().unwrap_or_default();
        let path = self
            .settings
            .output_dir
            .join(province_folder(&province))
            .join(format!("immo_score_{municipality_id}.json"));

        let raw_real_estate = extract_topic(&RealEstateExtractor::from_base(base.clone()), municipality_id).await;
        let raw_demographics = extract_topic(&DemographicsExtractor::from_base(base.clone()), municipality_id).await;
        let raw_economics = extract_topic(&EconomicsExtractor::from_base(base.clone()), municipality_id).await;
        let raw_building = extract_topic(&BuildingExtractor::from_base(base), municipality_id).await;

        let real_estate = section_or_empty(
            municipality_id,
            "real_estate_market",
            RealEstateProcessor::new(self.context.clone()).process_data(&raw_real_estate.into_value()),
        );
        let DemographicSections { demographics, mobility } = DemographicsProcessor::new(self.context.clone())
            .process_data(&raw_demographics.into_value(), profile.area_km2)
            .unwrap_or_else(|e| {
                error!(commune = municipality_id, domain = "demographics", error = %e, "Processing failed");
                DemographicSections {
                    demographics: empty_section(),
                    mobility: empty_section(),
                }
            });
        let economics = section_or_empty(
            municipality_id,
            "economic_indicators",
            EconomicsProcessor::new(self.context.clone()).process_data(&raw_economics.into_value()),
        );
        let building = section_or_empty(
            municipality_id,
            "building_development",
            BuildingProcessor::new(self.context.clone()).process_data(&raw_building.into_value()),
        );
        let investment = InvestmentProcessor::new(self.context.clone()).process_data(
            &real_estate,
            &economics,
            Some(&demographics),
            Some(&building),
        );

        let sectors = geography
            .statistical_sectors(municipality_id)
            .await
            .data()
            .map(|sectors| Value::Array(sectors.into_values().collect()))
            .unwrap_or_else(|| Value::Array(Vec::new()));
        let mut geographical_context = match serde_json::to_value(&profile)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        geographical_context.insert("statistical_sectors".into(), sectors);
        geographical_context.insert("mobility".into(), mobility);

        let mut metadata = ReportMetadata::new(profile.identity, &self.settings.periods, self.today);
        metadata.low_sample_sections = self.low_sample_sections(municipality_id, &real_estate, &demographics, &economics);

        let report = json!({
            "metadata": serde_json::to_value(&metadata)?,
            "real_estate_market": real_estate,
            "building_development": building,
            "demographics": demographics,
            "economic_indicators": economics,
            "geographical_context": Value::Object(geographical_context),
            "investment_analysis": investment,
        });
        validate_report_structure(&report)?;
        Ok((report, path))
    }

    fn low_sample_sections(&self, municipality_id: i64, real_estate: &Value, demographics: &Value, economics: &Value) -> Vec<String> {
        let validity = &self.settings.data_validity;
        let checks = [
            (
                "real_estate_market",
                f64_at_path(real_estate, "municipality_overview.last_period.total_transactions"),
                validity.min_transactions,
            ),
            (
                "demographics",
                f64_at_path(demographics, "population_overview.total_population"),
                validity.min_population,
            ),
            (
                "economic_indicators",
                f64_at_path(economics, "business_activity.enterprise_overview.total_enterprises"),
                validity.min_enterprises,
            ),
        ];

        checks
            .into_iter()
            .filter_map(|(section, sample, minimum)| {
                let sample = sample?;
                (sample < minimum as f64).then(|| {
                    warn!(commune = municipality_id, section, sample, minimum, "Low sample size");
                    section.to_string()
                })
            })
            .collect()
    }
}

async fn extract_topic(extractor: &dyn Extractor, municipality_id: i64) -> ExtractionOutcome<Map<String, Value>> {
    let outcome = extractor.extract_for(municipality_id).await;
    if let Some(cause) = outcome.failure() {
        warn!(
            commune = municipality_id,
            topic = extractor.topic(),
            cause,
            "Extraction failed, section will be empty"
        );
    }
    outcome
}

fn section_or_empty(municipality_id: i64, section: &str, result: Result<Value, DomainError>) -> Value {
    result.unwrap_or_else(|e| {
        error!(commune = municipality_id, section, error = %e, "Processing failed, section left empty");
        empty_section()
    })
}
