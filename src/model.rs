use serde::{Deserialize, Serialize};

/// Everything mined from one source filing, keyed by the well's API
/// number. Absent fields mean "not found in the source".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WellAggregate {
    pub api: Option<String>,
    pub operator_name: Option<String>,
    pub well_info: WellInfo,
    pub location: Location,
    pub casings: Vec<CasingRecord>,
    pub perforations: Vec<PerforationRecord>,
    pub plug_schedules: Vec<PlugScheduleRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WellInfo {
    pub district_number: Option<i64>,
    pub permit_number: Option<i64>,
    pub well_number: Option<String>,
    pub field_name: Option<String>,
    pub lease_name: Option<String>,
    pub completion_type: Option<String>,
    pub total_depth: Option<i64>,
    pub well_type: Option<String>,
}

impl WellInfo {
    pub fn has_any_field(&self) -> bool {
        self.district_number.is_some()
            || self.permit_number.is_some()
            || self.well_number.is_some()
            || self.field_name.is_some()
            || self.lease_name.is_some()
            || self.completion_type.is_some()
            || self.total_depth.is_some()
            || self.well_type.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Location {
    pub county: Option<String>,
    pub section: Option<String>,
    pub block: Option<String>,
    pub survey: Option<String>,
    pub distance_from_town: Option<String>,
}

impl Location {
    pub fn has_any_field(&self) -> bool {
        self.county.is_some()
            || self.section.is_some()
            || self.block.is_some()
            || self.survey.is_some()
            || self.distance_from_town.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CasingRecord {
    pub size: String,
    pub diameter: String,
    pub depth: i64,
    pub cement: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerforationRecord {
    pub stage: i64,
    pub top_depth: i64,
    pub bottom_depth: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlugScheduleRecord {
    pub top_depth: i64,
    pub bottom_depth: i64,
    pub isolation_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingEntry {
    pub filename: String,
    pub kind: String,
    pub api_hint: Option<String>,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub filing_count: usize,
    pub filings: Vec<FilingEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolVersions {
    pub rustc: String,
    pub cargo: String,
    pub pdftotext: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MinePaths {
    pub cache_root: String,
    pub manifest_dir: String,
    pub source_path: String,
    pub db_path: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MineCounts {
    pub scalar_fields_extracted: usize,
    pub casings_extracted: usize,
    pub perforations_extracted: usize,
    pub plug_schedules_extracted: usize,
    pub casings_inserted: usize,
    pub perforations_inserted: usize,
    pub plug_schedules_inserted: usize,
    pub casing_enums_created: usize,
    pub casing_enums_reused: usize,
    pub isolation_enums_created: usize,
    pub isolation_enums_reused: usize,
    pub children_superseded: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MineRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub source_kind: String,
    pub source_sha256: String,
    pub tool_versions: ToolVersions,
    pub paths: MinePaths,
    pub counts: MineCounts,
    pub warnings: Vec<String>,
    pub well: WellAggregate,
}
