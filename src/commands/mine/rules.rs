use anyhow::{Context, Result};
use regex::Regex;

/// Canonical scalar fields a filing can supply, regardless of which
/// historical label spelling the source used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScalarField {
    Api,
    OperatorName,
    DistrictNumber,
    PermitNumber,
    WellNumber,
    FieldName,
    LeaseName,
    CompletionType,
    TotalDepth,
    WellType,
    County,
    Section,
    Block,
    Survey,
    DistanceFromTown,
}

impl ScalarField {
    pub(crate) fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::DistrictNumber | Self::PermitNumber | Self::TotalDepth
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListSection {
    Casing,
    Perforation,
    PlugSchedule,
}

/// Ordered label rules for the PDF text path. Each pattern matches one
/// label line (after leading form numbering is stripped); the value is
/// captured from the following lines. First match per field wins.
const SCALAR_RULES: &[(ScalarField, &str)] = &[
    (ScalarField::Api, r"(?i)^api(?:\s+(?:no\.?|number))?$"),
    (ScalarField::OperatorName, r"(?i)^operator(?:\s+name)?$"),
    (
        ScalarField::DistrictNumber,
        r"(?i)^(?:rrc\s+)?district(?:\s+no\.?)?$",
    ),
    (ScalarField::PermitNumber, r"(?i)^permit(?:\s+no\.?)?$"),
    (ScalarField::WellNumber, r"(?i)^well\s+no\.?$"),
    (ScalarField::FieldName, r"(?i)^field(?:\s+name)?$"),
    (ScalarField::LeaseName, r"(?i)^lease(?:\s+name)?$"),
    (
        ScalarField::CompletionType,
        r"(?i)^(?:type\s+of\s+completion|completion\s+type)$",
    ),
    (ScalarField::TotalDepth, r"(?i)^total\s+depth$"),
    (
        ScalarField::WellType,
        r"(?i)^(?:type\s+of\s+well|well\s+type)$",
    ),
    (ScalarField::County, r"(?i)^county$"),
    (ScalarField::Section, r"(?i)^section$"),
    (ScalarField::Block, r"(?i)^block$"),
    (ScalarField::Survey, r"(?i)^survey$"),
    (
        ScalarField::DistanceFromTown,
        r"(?i)^distance\s+(?:and\s+direction\s+)?from\s+(?:nearest\s+)?town$",
    ),
];

const SECTION_RULES: &[(ListSection, &str)] = &[
    (ListSection::Casing, r"(?i)^casing\s+record$"),
    (
        ListSection::Perforation,
        r"(?i)^perforation(?:s)?(?:\s+record)?$",
    ),
    (
        ListSection::PlugSchedule,
        r"(?i)^plug(?:ging)?\s+(?:schedule|record)$",
    ),
];

/// Header spellings accepted by the spreadsheet path, canonical field
/// first. Matching is case-insensitive on trimmed headers; the first
/// present alias wins for a given row.
pub(crate) const SCALAR_ALIASES: &[(ScalarField, &[&str])] = &[
    (ScalarField::Api, &["API No", "API"]),
    (ScalarField::OperatorName, &["Operator", "Operator Name"]),
    (ScalarField::DistrictNumber, &["District", "District No"]),
    (ScalarField::PermitNumber, &["Permit", "Permit No"]),
    (ScalarField::WellNumber, &["Well No", "Well Number"]),
    (ScalarField::FieldName, &["Field", "Field Name"]),
    (ScalarField::LeaseName, &["Lease", "Lease Name"]),
    (
        ScalarField::CompletionType,
        &["Completion Type", "Type of Completion"],
    ),
    (ScalarField::TotalDepth, &["Total Depth", "TD"]),
    (ScalarField::WellType, &["Well Type", "Type of Well"]),
    (ScalarField::County, &["County"]),
    (ScalarField::Section, &["Section"]),
    (ScalarField::Block, &["Block"]),
    (ScalarField::Survey, &["Survey"]),
    (
        ScalarField::DistanceFromTown,
        &["Distance from Town", "Distance and Direction from Town"],
    ),
];

pub(crate) const CASING_SIZE_ALIASES: &[&str] = &["Casing Size", "Size"];
pub(crate) const CASING_DIAMETER_ALIASES: &[&str] = &["Casing Diameter", "Diameter"];
pub(crate) const CASING_DEPTH_ALIASES: &[&str] = &["Depth", "Setting Depth"];
pub(crate) const CASING_CEMENT_ALIASES: &[&str] = &["Cement", "Sacks Cement"];
pub(crate) const PERF_TOP_ALIASES: &[&str] = &["Perf Top", "Perforation Top"];
pub(crate) const PERF_BOTTOM_ALIASES: &[&str] = &["Perf Bottom", "Perforation Bottom"];
pub(crate) const PLUG_TOP_ALIASES: &[&str] = &["Plug Top"];
pub(crate) const PLUG_BOTTOM_ALIASES: &[&str] = &["Plug Bottom"];
pub(crate) const PLUG_TYPE_ALIASES: &[&str] = &["Plug Type", "Isolation Type"];

/// Compiled rule tables shared by one mining run.
pub(crate) struct RuleSet {
    pub(crate) scalar_rules: Vec<(ScalarField, Regex)>,
    pub(crate) section_rules: Vec<(ListSection, Regex)>,
    pub(crate) line_numbering: Regex,
    pub(crate) numbered_section: Regex,
    pub(crate) boilerplate_sentinel: Regex,
    pub(crate) casing_line: Regex,
    pub(crate) perforation_line: Regex,
    pub(crate) plug_line: Regex,
}

impl RuleSet {
    pub(crate) fn new() -> Result<Self> {
        let scalar_rules = SCALAR_RULES
            .iter()
            .map(|(field, pattern)| {
                Regex::new(pattern)
                    .map(|regex| (*field, regex))
                    .with_context(|| format!("failed to compile scalar rule {pattern}"))
            })
            .collect::<Result<Vec<_>>>()?;

        let section_rules = SECTION_RULES
            .iter()
            .map(|(section, pattern)| {
                Regex::new(pattern)
                    .map(|regex| (*section, regex))
                    .with_context(|| format!("failed to compile section rule {pattern}"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            scalar_rules,
            section_rules,
            line_numbering: Regex::new(r"^\d+[.)]\s*")
                .context("failed to compile line-numbering pattern")?,
            numbered_section: Regex::new(r"^\d+[.)]\s+\S")
                .context("failed to compile numbered-section pattern")?,
            boilerplate_sentinel: Regex::new(r"(?i)this\s+form\s+is\s+available\s+online")
                .context("failed to compile boilerplate sentinel pattern")?,
            casing_line: Regex::new(r"^(\S+)\s+(\S+)\s+(\d+)\s+(\d+)$")
                .context("failed to compile casing line pattern")?,
            perforation_line: Regex::new(r"^(\d+)\s+(\d+)$")
                .context("failed to compile perforation line pattern")?,
            plug_line: Regex::new(r"^(\d+)\s+(\d+)\s+(\S.*)$")
                .context("failed to compile plug line pattern")?,
        })
    }

    /// Strip the form's own item numbering ("14. Total depth") so label
    /// rules match the label text alone.
    pub(crate) fn strip_numbering<'a>(&self, line: &'a str) -> &'a str {
        let trimmed = line.trim();
        match self.line_numbering.find(trimmed) {
            Some(found) => trimmed[found.end()..].trim(),
            None => trimmed,
        }
    }

    pub(crate) fn is_label_line(&self, stripped: &str) -> bool {
        self.scalar_rules
            .iter()
            .any(|(_, regex)| regex.is_match(stripped))
            || self
                .section_rules
                .iter()
                .any(|(_, regex)| regex.is_match(stripped))
    }
}

/// All-capital heading lines ("CASING RECORD", "REMARKS") terminate a
/// running capture.
pub(crate) fn is_capital_line(line: &str) -> bool {
    let trimmed = line.trim();
    let mut letters = 0_usize;

    for character in trimmed.chars() {
        if character.is_ascii_lowercase() {
            return false;
        }
        if character.is_ascii_uppercase() {
            letters += 1;
        }
    }

    letters >= 2
}
