use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use calamine::{Data, Range, Reader, open_workbook_auto};

use crate::model::{CasingRecord, PerforationRecord, PlugScheduleRecord, WellAggregate};

use super::field_extract::{assign_scalar, parse_integer};
use super::rules::{
    CASING_CEMENT_ALIASES, CASING_DEPTH_ALIASES, CASING_DIAMETER_ALIASES, CASING_SIZE_ALIASES,
    PERF_BOTTOM_ALIASES, PERF_TOP_ALIASES, PLUG_BOTTOM_ALIASES, PLUG_TOP_ALIASES,
    PLUG_TYPE_ALIASES, SCALAR_ALIASES,
};

/// Mine one spreadsheet filing: first worksheet only, row 1 is the
/// header row, every later row contributes cells through the alias
/// table.
pub fn mine_spreadsheet(workbook_path: &Path) -> Result<WellAggregate> {
    let range = first_worksheet(workbook_path)
        .with_context(|| format!("failed to mine spreadsheet {}", workbook_path.display()))?;

    Ok(map_rows(range.rows()))
}

fn first_worksheet(workbook_path: &Path) -> Result<Range<Data>> {
    let mut workbook = open_workbook_auto(workbook_path)
        .with_context(|| format!("failed to open workbook {}", workbook_path.display()))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let Some(first_sheet) = sheet_names.first() else {
        bail!("no worksheet in {}", workbook_path.display());
    };

    workbook
        .worksheet_range(first_sheet)
        .with_context(|| format!("failed to read worksheet {first_sheet}"))
}

pub(crate) fn map_rows<'a, I>(mut rows: I) -> WellAggregate
where
    I: Iterator<Item = &'a [Data]>,
{
    let mut aggregate = WellAggregate::default();

    let Some(header_row) = rows.next() else {
        return aggregate;
    };
    let headers: Vec<String> = header_row.iter().map(cell_to_string).collect();

    for row in rows {
        let cells = named_cells(&headers, row);
        if cells.is_empty() {
            continue;
        }

        map_scalar_cells(&cells, &mut aggregate);
        map_casing_cells(&cells, &mut aggregate);
        map_perforation_cells(&cells, &mut aggregate);
        map_plug_cells(&cells, &mut aggregate);
    }

    aggregate
}

/// Zip header positions to cell values; blank headers and blank cells
/// contribute nothing. Header lookup is case-insensitive.
fn named_cells(headers: &[String], row: &[Data]) -> HashMap<String, String> {
    let mut cells = HashMap::new();

    for (header, cell) in headers.iter().zip(row.iter()) {
        let header = header.trim();
        if header.is_empty() {
            continue;
        }

        let value = cell_to_string(cell);
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        cells.insert(header.to_ascii_lowercase(), value.to_string());
    }

    cells
}

fn find_cell<'a>(cells: &'a HashMap<String, String>, aliases: &[&str]) -> Option<&'a str> {
    aliases
        .iter()
        .find_map(|alias| cells.get(&alias.to_ascii_lowercase()))
        .map(String::as_str)
}

/// Scalars are overwrite-latest: a later row's value replaces an
/// earlier one, and an unparseable numeric cell leaves the earlier
/// value in place.
fn map_scalar_cells(cells: &HashMap<String, String>, aggregate: &mut WellAggregate) {
    for (field, aliases) in SCALAR_ALIASES {
        if let Some(value) = find_cell(cells, aliases) {
            assign_scalar(aggregate, *field, value);
        }
    }
}

/// A row contributes one casing entry only when all four required
/// columns are present and the numeric ones parse.
fn map_casing_cells(cells: &HashMap<String, String>, aggregate: &mut WellAggregate) {
    let (Some(size), Some(diameter), Some(depth), Some(cement)) = (
        find_cell(cells, CASING_SIZE_ALIASES),
        find_cell(cells, CASING_DIAMETER_ALIASES),
        find_cell(cells, CASING_DEPTH_ALIASES),
        find_cell(cells, CASING_CEMENT_ALIASES),
    ) else {
        return;
    };

    let (Some(depth), Some(cement)) = (parse_integer(depth), parse_integer(cement)) else {
        return;
    };

    aggregate.casings.push(CasingRecord {
        size: size.to_string(),
        diameter: diameter.to_string(),
        depth,
        cement,
    });
}

fn map_perforation_cells(cells: &HashMap<String, String>, aggregate: &mut WellAggregate) {
    let (Some(top), Some(bottom)) = (
        find_cell(cells, PERF_TOP_ALIASES),
        find_cell(cells, PERF_BOTTOM_ALIASES),
    ) else {
        return;
    };

    let (Some(top_depth), Some(bottom_depth)) = (parse_integer(top), parse_integer(bottom)) else {
        return;
    };

    let stage = aggregate.perforations.len() as i64 + 1;
    aggregate.perforations.push(PerforationRecord {
        stage,
        top_depth,
        bottom_depth,
    });
}

fn map_plug_cells(cells: &HashMap<String, String>, aggregate: &mut WellAggregate) {
    let (Some(top), Some(bottom), Some(isolation_type)) = (
        find_cell(cells, PLUG_TOP_ALIASES),
        find_cell(cells, PLUG_BOTTOM_ALIASES),
        find_cell(cells, PLUG_TYPE_ALIASES),
    ) else {
        return;
    };

    let (Some(top_depth), Some(bottom_depth)) = (parse_integer(top), parse_integer(bottom)) else {
        return;
    };

    aggregate.plug_schedules.push(PlugScheduleRecord {
        top_depth,
        bottom_depth,
        isolation_type: isolation_type.to_string(),
    });
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(value) => value.clone(),
        Data::Int(value) => value.to_string(),
        Data::Float(value) => {
            if value.fract() == 0.0 {
                format!("{value:.0}")
            } else {
                value.to_string()
            }
        }
        Data::Bool(value) => value.to_string(),
        other => other.to_string(),
    }
}
