use anyhow::{Context, Result};
use regex::Regex;

use crate::model::{CasingRecord, PerforationRecord, PlugScheduleRecord, WellAggregate};

use super::rules::{ListSection, RuleSet, ScalarField, is_capital_line};

/// Guarded base-10 parse: a malformed capture yields absence, never an
/// error. Thousands separators are tolerated ("5,000").
pub(crate) fn parse_integer(raw: &str) -> Option<i64> {
    let cleaned = raw.trim().replace(',', "");
    cleaned.parse::<i64>().ok()
}

pub(crate) fn require_api(aggregate: &WellAggregate) -> Result<&str> {
    aggregate
        .api
        .as_deref()
        .context("no API number extracted from source")
}

/// Run the ordered rule tables over one flattened text buffer and
/// produce the partial aggregate. Unmatched rules leave fields absent;
/// missing sections leave lists empty.
pub(crate) fn extract_aggregate(rules: &RuleSet, text: &str) -> WellAggregate {
    let lines: Vec<&str> = text.lines().collect();
    let mut aggregate = WellAggregate::default();

    for (field, regex) in &rules.scalar_rules {
        extract_scalar(rules, &lines, *field, regex, &mut aggregate);
    }

    for (section, regex) in &rules.section_rules {
        let record = match section {
            ListSection::Casing => &rules.casing_line,
            ListSection::Perforation => &rules.perforation_line,
            ListSection::PlugSchedule => &rules.plug_line,
        };
        let Some(body) = section_body(rules, &lines, regex, record) else {
            continue;
        };

        match section {
            ListSection::Casing => extract_casing_lines(rules, &body, &mut aggregate),
            ListSection::Perforation => extract_perforation_lines(rules, &body, &mut aggregate),
            ListSection::PlugSchedule => extract_plug_lines(rules, &body, &mut aggregate),
        }
    }

    aggregate
}

fn extract_scalar(
    rules: &RuleSet,
    lines: &[&str],
    field: ScalarField,
    label: &Regex,
    aggregate: &mut WellAggregate,
) {
    for (index, line) in lines.iter().enumerate() {
        let stripped = rules.strip_numbering(line);
        if stripped.is_empty() || !label.is_match(stripped) {
            continue;
        }

        if let Some(value) = capture_value(rules, lines, index + 1) {
            assign_scalar(aggregate, field, &value);
        }
        // first match wins, whether or not it carried a usable value
        return;
    }
}

/// Capture the lines following a label until a stop line: the next
/// numbered form item, an all-caps heading, another known label, the
/// online-reference boilerplate, or a blank line after content.
fn capture_value(rules: &RuleSet, lines: &[&str], start: usize) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();

    for line in lines.iter().skip(start) {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            if parts.is_empty() {
                continue;
            }
            break;
        }

        if rules.numbered_section.is_match(trimmed)
            || is_capital_line(trimmed)
            || rules.boilerplate_sentinel.is_match(trimmed)
            || rules.is_label_line(rules.strip_numbering(line))
        {
            break;
        }

        parts.push(trimmed);
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Isolate the lines between a section header and the first stop line
/// (next numbered item, all-caps heading, or boilerplate sentinel). A
/// line matching the section's own record pattern is always data, even
/// when its free text is rendered in capitals ("1000 1100 CIBP").
fn section_body<'a>(
    rules: &RuleSet,
    lines: &[&'a str],
    header: &Regex,
    record: &Regex,
) -> Option<Vec<&'a str>> {
    let start = lines
        .iter()
        .position(|line| header.is_match(rules.strip_numbering(line)))?;

    let mut body = Vec::new();
    for line in lines.iter().skip(start + 1) {
        let trimmed = line.trim();
        if record.is_match(trimmed) {
            body.push(*line);
            continue;
        }
        if rules.numbered_section.is_match(trimmed)
            || is_capital_line(trimmed)
            || rules.boilerplate_sentinel.is_match(trimmed)
        {
            break;
        }
        body.push(*line);
    }

    Some(body)
}

fn extract_casing_lines(rules: &RuleSet, body: &[&str], aggregate: &mut WellAggregate) {
    for line in body {
        let Some(captures) = rules.casing_line.captures(line.trim()) else {
            continue;
        };

        let size = captures[1].to_string();
        let diameter = captures[2].to_string();
        let (Some(depth), Some(cement)) =
            (parse_integer(&captures[3]), parse_integer(&captures[4]))
        else {
            continue;
        };

        aggregate.casings.push(CasingRecord {
            size,
            diameter,
            depth,
            cement,
        });
    }
}

fn extract_perforation_lines(rules: &RuleSet, body: &[&str], aggregate: &mut WellAggregate) {
    for line in body {
        let Some(captures) = rules.perforation_line.captures(line.trim()) else {
            continue;
        };

        let (Some(top_depth), Some(bottom_depth)) =
            (parse_integer(&captures[1]), parse_integer(&captures[2]))
        else {
            continue;
        };

        let stage = aggregate.perforations.len() as i64 + 1;
        aggregate.perforations.push(PerforationRecord {
            stage,
            top_depth,
            bottom_depth,
        });
    }
}

fn extract_plug_lines(rules: &RuleSet, body: &[&str], aggregate: &mut WellAggregate) {
    for line in body {
        let Some(captures) = rules.plug_line.captures(line.trim()) else {
            continue;
        };

        let (Some(top_depth), Some(bottom_depth)) =
            (parse_integer(&captures[1]), parse_integer(&captures[2]))
        else {
            continue;
        };

        aggregate.plug_schedules.push(PlugScheduleRecord {
            top_depth,
            bottom_depth,
            isolation_type: captures[3].trim().to_string(),
        });
    }
}

/// Shared by both extraction paths: route a raw capture to its field,
/// guarding numeric fields through `parse_integer`.
pub(crate) fn assign_scalar(aggregate: &mut WellAggregate, field: ScalarField, raw: &str) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }

    if field.is_numeric() {
        let Some(value) = parse_integer(trimmed) else {
            return;
        };
        match field {
            ScalarField::DistrictNumber => aggregate.well_info.district_number = Some(value),
            ScalarField::PermitNumber => aggregate.well_info.permit_number = Some(value),
            ScalarField::TotalDepth => aggregate.well_info.total_depth = Some(value),
            _ => {}
        }
        return;
    }

    match field {
        ScalarField::Api => {
            let digits: String = trimmed
                .chars()
                .filter(|character| character.is_ascii_digit())
                .collect();
            if !digits.is_empty() {
                aggregate.api = Some(digits);
            }
        }
        ScalarField::OperatorName => aggregate.operator_name = Some(trimmed.to_string()),
        ScalarField::WellNumber => aggregate.well_info.well_number = Some(trimmed.to_string()),
        ScalarField::FieldName => aggregate.well_info.field_name = Some(trimmed.to_string()),
        ScalarField::LeaseName => aggregate.well_info.lease_name = Some(trimmed.to_string()),
        ScalarField::CompletionType => {
            aggregate.well_info.completion_type = Some(trimmed.to_string());
        }
        ScalarField::WellType => aggregate.well_info.well_type = Some(trimmed.to_string()),
        ScalarField::County => aggregate.location.county = Some(trimmed.to_string()),
        ScalarField::Section => aggregate.location.section = Some(trimmed.to_string()),
        ScalarField::Block => aggregate.location.block = Some(trimmed.to_string()),
        ScalarField::Survey => aggregate.location.survey = Some(trimmed.to_string()),
        ScalarField::DistanceFromTown => {
            aggregate.location.distance_from_town = Some(trimmed.to_string());
        }
        ScalarField::DistrictNumber | ScalarField::PermitNumber | ScalarField::TotalDepth => {}
    }
}
