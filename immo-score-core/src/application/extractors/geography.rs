// immo-score-core/src/application/extractors/geography.rs

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

use super::{ExtractorBase, ExtractorScope, Extractor, combine_topics, text};
use crate::domain::metadata::CommuneIdentity;
use crate::domain::outcome::ExtractionOutcome;
use crate::domain::value::{as_f64, key_string};
use crate::ports::warehouse::{Row, Warehouse};

const COMMUNE_INFO: &str = "
    SELECT g.id_geography,
           g.tx_name_fr AS commune_name,
           g.tx_name_nl AS commune_name_nl,
           g.cd_lau AS postal_code,
           g.cd_parent,
           g.cd_level,
           g.cd_refnis
    FROM dw.dim_geography g
    WHERE g.id_geography = ?
      AND g.fl_current = TRUE";

// commune -> district (level 3) -> province (level 2) -> region (level 1), on parent codes.
const HIERARCHY: &str = "
    WITH commune AS (
        SELECT id_geography AS commune_id,
               tx_name_fr AS commune_name,
               cd_refnis,
               cd_parent AS district_code
        FROM dw.dim_geography
        WHERE id_geography = ?
          AND fl_current = TRUE
    ),
    district AS (
        SELECT commune.*,
               d.id_geography AS district_id,
               d.tx_name_fr AS district_name,
               d.cd_parent AS province_code
        FROM commune
        LEFT JOIN dw.dim_geography d
               ON d.cd_lau = commune.district_code AND d.cd_level = 3 AND d.fl_current = TRUE
    ),
    province AS (
        SELECT district.*,
               p.id_geography AS province_id,
               p.tx_name_fr AS province_name,
               p.cd_parent AS region_code
        FROM district
        LEFT JOIN dw.dim_geography p
               ON p.cd_lau = district.province_code AND p.cd_level = 2 AND p.fl_current = TRUE
    ),
    region AS (
        SELECT province.*,
               r.id_geography AS region_id,
               r.tx_name_fr AS region_name
        FROM province
        LEFT JOIN dw.dim_geography r
               ON r.cd_lau = province.region_code AND r.cd_level = 1 AND r.fl_current = TRUE
    )
    SELECT * FROM region";

const AREA: &str = "
    SELECT SUM(ss.ms_area_ha) / 100 AS area_km2
    FROM dw.dim_statistical_sectors ss
    WHERE ss.cd_refnis = ?
      AND ss.dt_end IS NULL";

const SECTORS: &str = "
    SELECT ss.id_sector_sk,
           ss.cd_sector,
           ss.tx_sector_fr AS sector_name,
           ss.tx_sector_nl AS sector_name_nl,
           ss.ms_area_ha / 100 AS area_km2
    FROM dw.dim_statistical_sectors ss
    WHERE ss.cd_refnis = ?
      AND ss.dt_end IS NULL
    ORDER BY ss.tx_sector_fr";

pub const WALLOON_REGION_ID: i64 = 2061;
pub const FLEMISH_REGION_ID: i64 = 2031;
pub const BRUSSELS_REGION_ID: i64 = 2028;

/// District -> province -> region chain of one municipality.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdminHierarchy {
    pub commune_id: i64,
    pub commune_name: String,
    pub district_id: Option<i64>,
    pub district_name: Option<String>,
    pub province_id: Option<i64>,
    pub province_name: Option<String>,
    pub region_id: Option<i64>,
    pub region_name: Option<String>,
    /// Set when the chain was derived from the refnis prefix instead of the joins.
    pub is_estimated: bool,
}

impl AdminHierarchy {
    fn from_row(row: &Row) -> Self {
        let opt_text = |key: &str| row.get(key).and_then(Value::as_str).map(String::from);
        Self {
            commune_id: row.get("commune_id").and_then(Value::as_i64).unwrap_or_default(),
            commune_name: text(row, "commune_name"),
            district_id: row.get("district_id").and_then(Value::as_i64),
            district_name: opt_text("district_name"),
            province_id: row.get("province_id").and_then(Value::as_i64),
            province_name: opt_text("province_name"),
            region_id: row.get("region_id").and_then(Value::as_i64),
            region_name: opt_text("region_name"),
            is_estimated: false,
        }
    }

    /// Degraded path: region and province from the leading refnis digits.
    /// Brussels-Capital has no real province, the administrative zone stands in.
    pub fn from_refnis(commune_id: i64, commune_name: &str, refnis: &str) -> Self {
        let mut hierarchy = Self {
            commune_id,
            commune_name: commune_name.to_string(),
            is_estimated: true,
            ..Self::default()
        };
        let prefix = refnis.get(..2).unwrap_or(refnis);

        match refnis.chars().next() {
            Some('1') => {
                hierarchy.region_id = Some(WALLOON_REGION_ID);
                hierarchy.region_name = Some("Région wallonne".into());
                let province = match prefix {
                    "10" => Some((1, "Province de Brabant wallon")),
                    "13" => Some((2, "Province de Hainaut")),
                    "15" => Some((3, "Province de Liège")),
                    "16" => Some((4, "Province de Luxembourg")),
                    "17" => Some((5, "Province de Namur")),
                    _ => None,
                };
                hierarchy.set_province(province);
            }
            Some('2') => {
                hierarchy.region_id = Some(FLEMISH_REGION_ID);
                hierarchy.region_name = Some("Région flamande".into());
                let province = match prefix {
                    "20" => Some((6, "Province d'Anvers")),
                    "21" => Some((7, "Province de Brabant flamand")),
                    "23" => Some((8, "Province de Flandre occidentale")),
                    "24" => Some((9, "Province de Flandre orientale")),
                    "26" => Some((10, "Province de Limbourg")),
                    _ => None,
                };
                hierarchy.set_province(province);
            }
            Some('3') => {
                hierarchy.region_id = Some(BRUSSELS_REGION_ID);
                hierarchy.region_name = Some("Région de Bruxelles-Capitale".into());
                hierarchy.province_id = Some(BRUSSELS_REGION_ID);
                hierarchy.province_name = Some("Zone administrative de Bruxelles-Capitale".into());
            }
            _ => {}
        }
        hierarchy
    }

    fn set_province(&mut self, province: Option<(i64, &str)>) {
        match province {
            Some((id, name)) => {
                self.province_id = Some(id);
                self.province_name = Some(name.to_string());
            }
            None => self.province_name = Some("Province inconnue".into()),
        }
    }
}

/// Resolves the administrative chain; falls back to the refnis heuristic when the
/// joins do not reach a region. `Empty` when the municipality itself is unknown.
pub async fn resolve_hierarchy(base: &ExtractorBase, municipality_id: i64) -> ExtractionOutcome<AdminHierarchy> {
    let row = match base
        .fetch_one("administrative hierarchy", HIERARCHY, &[municipality_id.into()])
        .await
        .into_data()
    {
        Ok(row) => row,
        Err(other) => return other,
    };

    let hierarchy = AdminHierarchy::from_row(&row);
    if hierarchy.region_id.is_some() {
        return ExtractionOutcome::Data(hierarchy);
    }

    let refnis = row.get("cd_refnis").map(key_string).unwrap_or_default();
    warn!(commune = municipality_id, refnis = %refnis, "Hierarchy joins incomplete, using refnis fallback");
    let mut fallback = AdminHierarchy::from_refnis(municipality_id, &hierarchy.commune_name, &refnis);
    fallback.district_id = hierarchy.district_id;
    fallback.district_name = hierarchy.district_name;
    ExtractionOutcome::Data(fallback)
}

/// Everything the generator needs to place and label one report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommuneProfile {
    #[serde(flatten)]
    pub identity: CommuneIdentity,
    pub commune_name_nl: Option<String>,
    pub cd_refnis: Option<String>,
    pub cd_parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_km2: Option<f64>,
    pub hierarchy_estimated: bool,
}

pub struct GeographyExtractor {
    base: ExtractorBase,
}

impl GeographyExtractor {
    pub fn new(warehouse: Arc<dyn Warehouse>, scope: ExtractorScope) -> Self {
        Self {
            base: ExtractorBase::new(warehouse, scope),
        }
    }

    pub fn from_base(base: ExtractorBase) -> Self {
        Self { base }
    }

    pub async fn commune_profile(&self, municipality_id: i64) -> ExtractionOutcome<CommuneProfile> {
        self.base.log_start("commune info", municipality_id);

        let row = match self
            .base
            .fetch_one("commune info", COMMUNE_INFO, &[municipality_id.into()])
            .await
            .into_data()
        {
            Ok(row) => row,
            Err(other) => return other,
        };

        let hierarchy = match resolve_hierarchy(&self.base, municipality_id).await.into_data() {
            Ok(h) => h,
            Err(other) => return other,
        };

        let refnis = row.get("cd_refnis").filter(|v| !v.is_null()).map(key_string);
        let area_km2 = match &refnis {
            Some(code) => self.area_km2(code).await,
            None => None,
        };

        let profile = CommuneProfile {
            identity: CommuneIdentity {
                commune_id: municipality_id,
                commune_name: text(&row, "commune_name"),
                postal_code: row.get("postal_code").filter(|v| !v.is_null()).map(key_string),
                district: Some(
                    hierarchy
                        .district_name
                        .unwrap_or_else(|| "Arrondissement inconnu".to_string()),
                ),
                province: Some(
                    hierarchy
                        .province_name
                        .unwrap_or_else(|| "Province inconnue".to_string()),
                ),
                region: Some(
                    hierarchy
                        .region_name
                        .unwrap_or_else(|| "Région inconnue".to_string()),
                ),
            },
            commune_name_nl: row.get("commune_name_nl").and_then(Value::as_str).map(String::from),
            cd_refnis: refnis,
            cd_parent: row.get("cd_parent").filter(|v| !v.is_null()).map(key_string),
            area_km2,
            hierarchy_estimated: hierarchy.is_estimated,
        };

        self.base.log_end("commune info", municipality_id, 1);
        ExtractionOutcome::Data(profile)
    }

    /// Surface in km² summed over the current statistical sectors.
    pub async fn area_km2(&self, refnis: &str) -> Option<f64> {
        self.base
            .fetch_one("commune area", AREA, &[refnis.into()])
            .await
            .data()
            .and_then(|row| row.get("area_km2").and_then(as_f64))
    }

    pub async fn statistical_sectors(&self, municipality_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        self.base.log_start("statistical sectors", municipality_id);

        let refnis = match self
            .base
            .fetch_one("commune refnis", COMMUNE_INFO, &[municipality_id.into()])
            .await
            .into_data()
        {
            Ok(row) => row.get("cd_refnis").map(key_string).unwrap_or_default(),
            Err(other) => return other,
        };

        let rows = match self
            .base
            .fetch("statistical sectors", SECTORS, &[refnis.into()])
            .await
            .into_data()
        {
            Ok(rows) => rows,
            Err(other) => return other,
        };

        let mut sectors = Map::new();
        for row in &rows {
            let id = row.get("id_sector_sk").map(key_string).unwrap_or_default();
            let mut sector = Map::new();
            sector.insert("sector_id".into(), row.get("id_sector_sk").cloned().unwrap_or(Value::Null));
            for key in ["cd_sector", "sector_name", "sector_name_nl", "area_km2"] {
                sector.insert(key.into(), row.get(key).cloned().unwrap_or(Value::Null));
            }
            sectors.insert(id, Value::Object(sector));
        }

        self.base.log_end("statistical sectors", municipality_id, sectors.len());
        ExtractionOutcome::from_map(sectors)
    }
}

#[async_trait]
impl Extractor for GeographyExtractor {
    fn base(&self) -> &ExtractorBase {
        &self.base
    }

    fn topic(&self) -> &'static str {
        "geography"
    }

    async fn extract_for(&self, municipality_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        let info = self.commune_profile(municipality_id).await.and_then(|profile| {
            match serde_json::to_value(&profile) {
                Ok(Value::Object(map)) => ExtractionOutcome::Data(map),
                Ok(_) => ExtractionOutcome::Empty,
                Err(e) => ExtractionOutcome::Failed(e.to_string()),
            }
        });
        let sectors = self.statistical_sectors(municipality_id).await;
        info!(commune = municipality_id, profile = info.label(), sectors = sectors.label(), "Geography extracted");

        combine_topics(vec![("commune_info", info), ("statistical_sectors", sectors)])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::application::testing::{failing_warehouse, seeded_warehouse};
    use anyhow::Result;

    fn extractor() -> GeographyExtractor {
        GeographyExtractor::new(seeded_warehouse(), ExtractorScope::default())
    }

    #[tokio::test]
    async fn test_full_hierarchy_through_joins() -> Result<()> {
        let base = ExtractorBase::new(seeded_warehouse(), ExtractorScope::default());
        let h = resolve_hierarchy(&base, 92094).await.data().unwrap();
        assert_eq!(h.district_name.as_deref(), Some("Arrondissement de Namur"));
        assert_eq!(h.province_name.as_deref(), Some("Province de Namur"));
        assert_eq!(h.region_name.as_deref(), Some("Région wallonne"));
        assert!(!h.is_estimated);
        Ok(())
    }

    #[tokio::test]
    async fn test_refnis_fallback_when_joins_stop_short() -> Result<()> {
        // 99999 has no district row in the fixture.
        let base = ExtractorBase::new(seeded_warehouse(), ExtractorScope::default());
        let h = resolve_hierarchy(&base, 99999).await.data().unwrap();
        assert!(h.is_estimated);
        assert_eq!(h.region_id, Some(BRUSSELS_REGION_ID));
        assert_eq!(h.province_name.as_deref(), Some("Zone administrative de Bruxelles-Capitale"));
        Ok(())
    }

    #[test]
    fn test_refnis_prefix_table() {
        let h = AdminHierarchy::from_refnis(1, "X", "15001");
        assert_eq!(h.province_id, Some(3));
        assert_eq!(h.region_id, Some(WALLOON_REGION_ID));

        let h = AdminHierarchy::from_refnis(1, "X", "26001");
        assert_eq!(h.province_name.as_deref(), Some("Province de Limbourg"));

        let h = AdminHierarchy::from_refnis(1, "X", "19001");
        assert_eq!(h.province_name.as_deref(), Some("Province inconnue"));

        let h = AdminHierarchy::from_refnis(1, "X", "");
        assert!(h.region_id.is_none());
    }

    #[tokio::test]
    async fn test_commune_profile_with_area() -> Result<()> {
        let profile = extractor().commune_profile(92094).await.data().unwrap();
        assert_eq!(profile.identity.commune_name, "Namur");
        assert_eq!(profile.identity.postal_code.as_deref(), Some("5000"));
        assert_eq!(profile.area_km2, Some(175.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_commune_is_empty() {
        assert!(extractor().commune_profile(1).await.is_empty());
    }

    #[tokio::test]
    async fn test_extract_data_single_and_failing() -> Result<()> {
        let record = extractor().extract_data(Some(92094)).await.data().unwrap();
        assert_eq!(record["commune_info"]["province"], "Province de Namur");
        assert_eq!(record["statistical_sectors"].as_object().unwrap().len(), 2);

        let broken = GeographyExtractor::new(failing_warehouse(), ExtractorScope::default());
        assert!(broken.extract_data(Some(92094)).await.is_failed());
        Ok(())
    }
}
