use calamine::Data;
use rusqlite::Connection;

use crate::model::{CasingRecord, PerforationRecord, PlugScheduleRecord, WellAggregate};

use super::*;

use crate::util::count_rows;

use super::db_setup::ensure_schema;
use super::field_extract::{extract_aggregate, parse_integer, require_api};
use super::persist::persist_aggregate;
use super::rules::RuleSet;
use super::sheet_extract::map_rows;

fn test_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("open in-memory db");
    ensure_schema(&connection).expect("ensure schema");
    connection
}

fn data_rows(rows: &[&[&str]]) -> Vec<Vec<Data>> {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|cell| Data::String((*cell).to_string()))
                .collect()
        })
        .collect()
}

fn aggregate_for(api: &str) -> WellAggregate {
    WellAggregate {
        api: Some(api.to_string()),
        ..WellAggregate::default()
    }
}

#[test]
fn parse_integer_guards_malformed_captures() {
    assert_eq!(parse_integer("5000"), Some(5000));
    assert_eq!(parse_integer(" 5,000 "), Some(5000));
    assert_eq!(parse_integer("unknown"), None);
    assert_eq!(parse_integer(""), None);
}

#[test]
fn extracts_scalar_fields_from_labeled_lines() {
    let rules = RuleSet::new().expect("compile rules");
    let text = "API No.\n1234567890\nTotal depth\n5000\n";

    let aggregate = extract_aggregate(&rules, text);

    assert_eq!(aggregate.api.as_deref(), Some("1234567890"));
    assert_eq!(aggregate.well_info.total_depth, Some(5000));
    assert!(aggregate.casings.is_empty());
    assert!(aggregate.perforations.is_empty());
    assert!(aggregate.plug_schedules.is_empty());
}

#[test]
fn scalar_capture_stops_at_numbered_and_capital_lines() {
    let rules = RuleSet::new().expect("compile rules");
    let text = "Lease Name\nJohnson Ranch\n14. Total depth\n5000\nOperator\nAcme Oil\nCASING RECORD\n";

    let aggregate = extract_aggregate(&rules, text);

    assert_eq!(
        aggregate.well_info.lease_name.as_deref(),
        Some("Johnson Ranch")
    );
    assert_eq!(aggregate.well_info.total_depth, Some(5000));
    assert_eq!(aggregate.operator_name.as_deref(), Some("Acme Oil"));
}

#[test]
fn malformed_numeric_capture_leaves_field_absent() {
    let rules = RuleSet::new().expect("compile rules");
    let text = "API No.\n1234567890\nTotal depth\nnot a number\n";

    let aggregate = extract_aggregate(&rules, text);

    assert_eq!(aggregate.api.as_deref(), Some("1234567890"));
    assert_eq!(aggregate.well_info.total_depth, None);
}

#[test]
fn extracts_casing_section_lines() {
    let rules = RuleSet::new().expect("compile rules");
    let text = "API No.\n1234567890\nCASING RECORD\n5.5 6.0 4000 100\n9.625 10.75 1200 250\nbad line without numbers\nPERFORATION RECORD\n";

    let aggregate = extract_aggregate(&rules, text);

    assert_eq!(aggregate.casings.len(), 2);
    assert_eq!(aggregate.casings[0].size, "5.5");
    assert_eq!(aggregate.casings[0].diameter, "6.0");
    assert_eq!(aggregate.casings[0].depth, 4000);
    assert_eq!(aggregate.casings[0].cement, 100);
    assert_eq!(aggregate.casings[1].depth, 1200);
}

#[test]
fn perforation_stages_are_sequential_in_encounter_order() {
    let rules = RuleSet::new().expect("compile rules");
    let text = "PERFORATION RECORD\n4000 4100\n4200 4300\n4400 4500\n";

    let aggregate = extract_aggregate(&rules, text);

    assert_eq!(aggregate.perforations.len(), 3);
    for (index, perforation) in aggregate.perforations.iter().enumerate() {
        assert_eq!(perforation.stage, index as i64 + 1);
    }
    assert_eq!(aggregate.perforations[2].top_depth, 4400);
}

#[test]
fn block_section_stops_at_boilerplate_sentinel() {
    let rules = RuleSet::new().expect("compile rules");
    let text = "PERFORATION RECORD\n4000 4100\nThis form is available online at the commission website\n5000 5100\n";

    let aggregate = extract_aggregate(&rules, text);

    assert_eq!(aggregate.perforations.len(), 1);
    assert_eq!(aggregate.perforations[0].bottom_depth, 4100);
}

#[test]
fn extracts_plug_schedule_lines_with_free_text_type() {
    let rules = RuleSet::new().expect("compile rules");
    let text = "PLUGGING RECORD\n1000 1100 cement plug\n2000 2050 bridge plug\n";

    let aggregate = extract_aggregate(&rules, text);

    assert_eq!(aggregate.plug_schedules.len(), 2);
    assert_eq!(aggregate.plug_schedules[0].isolation_type, "cement plug");
    assert_eq!(aggregate.plug_schedules[1].top_depth, 2000);
}

#[test]
fn uppercase_record_lines_do_not_terminate_sections() {
    let rules = RuleSet::new().expect("compile rules");
    let text = "PLUGGING RECORD\n1000 1100 CIBP\n2000 2050 cement plug\nREMARKS\n3000 3100 lost line\n";

    let aggregate = extract_aggregate(&rules, text);

    assert_eq!(aggregate.plug_schedules.len(), 2);
    assert_eq!(aggregate.plug_schedules[0].isolation_type, "CIBP");
    assert_eq!(aggregate.plug_schedules[1].isolation_type, "cement plug");
}

#[test]
fn missing_sections_yield_empty_lists() {
    let rules = RuleSet::new().expect("compile rules");
    let aggregate = extract_aggregate(&rules, "API No.\n1234567890\n");

    assert!(aggregate.casings.is_empty());
    assert!(aggregate.perforations.is_empty());
    assert!(aggregate.plug_schedules.is_empty());
}

#[test]
fn row_mapper_accepts_either_api_header_spelling() {
    for header in ["API No", "API"] {
        let rows = data_rows(&[&[header], &["1234567890"]]);
        let aggregate = map_rows(rows.iter().map(|row| row.as_slice()));
        assert_eq!(aggregate.api.as_deref(), Some("1234567890"), "{header}");
    }
}

#[test]
fn row_mapper_keeps_latest_scalar_value() {
    let rows = data_rows(&[
        &["API No", "Operator"],
        &["1234567890", "Acme Oil"],
        &["1234567890", "Acme Oil & Gas"],
    ]);

    let aggregate = map_rows(rows.iter().map(|row| row.as_slice()));
    assert_eq!(aggregate.operator_name.as_deref(), Some("Acme Oil & Gas"));
}

#[test]
fn row_mapper_builds_casing_entry_from_complete_row() {
    let rows = data_rows(&[
        &["API No", "Casing Size", "Casing Diameter", "Depth", "Cement"],
        &["1234567890", "5.5", "6.0", "4000", "100"],
    ]);

    let aggregate = map_rows(rows.iter().map(|row| row.as_slice()));

    assert_eq!(aggregate.api.as_deref(), Some("1234567890"));
    assert_eq!(aggregate.casings.len(), 1);
    assert_eq!(aggregate.casings[0].size, "5.5");
    assert_eq!(aggregate.casings[0].diameter, "6.0");
    assert_eq!(aggregate.casings[0].depth, 4000);
    assert_eq!(aggregate.casings[0].cement, 100);
}

#[test]
fn row_mapper_skips_casing_rows_with_missing_or_malformed_columns() {
    let rows = data_rows(&[
        &["API No", "Casing Size", "Casing Diameter", "Depth", "Cement"],
        &["1234567890", "5.5", "6.0", "", "100"],
        &["1234567890", "5.5", "6.0", "not a depth", "100"],
        &["1234567890", "5.5", "6.0", "4000", "100"],
    ]);

    let aggregate = map_rows(rows.iter().map(|row| row.as_slice()));
    assert_eq!(aggregate.casings.len(), 1);
    assert_eq!(aggregate.casings[0].depth, 4000);
}

#[test]
fn row_mapper_assigns_perforation_stages_by_list_length() {
    let rows = data_rows(&[
        &["API No", "Perf Top", "Perf Bottom"],
        &["1234567890", "4000", "4100"],
        &["1234567890", "4200", "4300"],
    ]);

    let aggregate = map_rows(rows.iter().map(|row| row.as_slice()));
    assert_eq!(aggregate.perforations.len(), 2);
    assert_eq!(aggregate.perforations[0].stage, 1);
    assert_eq!(aggregate.perforations[1].stage, 2);
}

#[test]
fn require_api_rejects_unidentified_wells() {
    let aggregate = WellAggregate::default();
    assert!(require_api(&aggregate).is_err());
}

#[test]
fn persist_rejects_aggregate_without_api() {
    let mut connection = test_connection();
    let aggregate = WellAggregate::default();

    assert!(persist_aggregate(&mut connection, &aggregate, false).is_err());
    let wells = count_rows(&connection, "SELECT COUNT(*) FROM wells").expect("count wells");
    assert_eq!(wells, 0);
}

#[test]
fn persist_upserts_well_and_scalar_tables_idempotently() {
    let mut connection = test_connection();
    let mut aggregate = aggregate_for("1234567890");
    aggregate.well_info.total_depth = Some(5000);
    aggregate.location.county = Some("Ector".to_string());

    persist_aggregate(&mut connection, &aggregate, false).expect("first run");
    aggregate.well_info.total_depth = Some(5200);
    persist_aggregate(&mut connection, &aggregate, false).expect("second run");

    assert_eq!(
        count_rows(&connection, "SELECT COUNT(*) FROM wells").expect("count"),
        1
    );
    assert_eq!(
        count_rows(&connection, "SELECT COUNT(*) FROM well_info").expect("count"),
        1
    );
    assert_eq!(
        count_rows(&connection, "SELECT COUNT(*) FROM locations").expect("count"),
        1
    );

    let total_depth: i64 = connection
        .query_row(
            "SELECT total_depth FROM well_info WHERE api = '1234567890'",
            [],
            |row| row.get(0),
        )
        .expect("total depth");
    assert_eq!(total_depth, 5200);
}

#[test]
fn persist_skips_scalar_tables_when_no_fields_present() {
    let mut connection = test_connection();
    let aggregate = aggregate_for("1234567890");

    persist_aggregate(&mut connection, &aggregate, false).expect("persist");

    assert_eq!(
        count_rows(&connection, "SELECT COUNT(*) FROM wells").expect("count"),
        1
    );
    assert_eq!(
        count_rows(&connection, "SELECT COUNT(*) FROM well_info").expect("count"),
        0
    );
    assert_eq!(
        count_rows(&connection, "SELECT COUNT(*) FROM locations").expect("count"),
        0
    );
}

#[test]
fn identical_casing_pairs_share_one_lookup_row() {
    let mut connection = test_connection();
    let mut aggregate = aggregate_for("1234567890");
    for _ in 0..2 {
        aggregate.casings.push(CasingRecord {
            size: "5.5".to_string(),
            diameter: "6.0".to_string(),
            depth: 4000,
            cement: 100,
        });
    }

    let counts = persist_aggregate(&mut connection, &aggregate, false).expect("persist");

    assert_eq!(counts.casing_enums_created, 1);
    assert_eq!(counts.casing_enums_reused, 1);
    assert_eq!(
        count_rows(&connection, "SELECT COUNT(*) FROM casing_enums").expect("count"),
        1
    );

    let distinct_refs: i64 = connection
        .query_row(
            "SELECT COUNT(DISTINCT casing_enum_id) FROM casings",
            [],
            |row| row.get(0),
        )
        .expect("distinct enum refs");
    assert_eq!(distinct_refs, 1);
}

#[test]
fn casing_enum_keys_map_size_to_external_and_diameter_to_internal() {
    let mut connection = test_connection();
    let mut aggregate = aggregate_for("1234567890");
    aggregate.casings.push(CasingRecord {
        size: "5.5".to_string(),
        diameter: "6.0".to_string(),
        depth: 4000,
        cement: 100,
    });

    persist_aggregate(&mut connection, &aggregate, false).expect("persist");

    let (internal, external): (f64, f64) = connection
        .query_row(
            "SELECT internal_diameter, external_diameter FROM casing_enums",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("enum key");
    assert_eq!(internal, 6.0);
    assert_eq!(external, 5.5);

    let (top, bottom): (i64, i64) = connection
        .query_row("SELECT top_depth, bottom_depth FROM casings", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .expect("casing depths");
    assert_eq!(top, 4000);
    assert_eq!(bottom, 4000);
}

#[test]
fn lookup_rows_are_reused_across_runs() {
    let mut connection = test_connection();
    let mut aggregate = aggregate_for("1234567890");
    aggregate.plug_schedules.push(PlugScheduleRecord {
        top_depth: 1000,
        bottom_depth: 1100,
        isolation_type: "cement plug".to_string(),
    });

    let first = persist_aggregate(&mut connection, &aggregate, false).expect("first run");
    let second = persist_aggregate(&mut connection, &aggregate, false).expect("second run");

    assert_eq!(first.isolation_enums_created, 1);
    assert_eq!(second.isolation_enums_created, 0);
    assert_eq!(second.isolation_enums_reused, 1);
    assert_eq!(
        count_rows(&connection, "SELECT COUNT(*) FROM mechanical_isolation_enums")
            .expect("count"),
        1
    );
}

#[test]
fn child_rows_append_by_default_and_supersede_on_request() {
    let mut connection = test_connection();
    let mut aggregate = aggregate_for("1234567890");
    aggregate.perforations.push(PerforationRecord {
        stage: 1,
        top_depth: 4000,
        bottom_depth: 4100,
    });

    persist_aggregate(&mut connection, &aggregate, false).expect("first run");
    persist_aggregate(&mut connection, &aggregate, false).expect("second run");
    assert_eq!(
        count_rows(&connection, "SELECT COUNT(*) FROM perforations").expect("count"),
        2
    );

    let counts = persist_aggregate(&mut connection, &aggregate, true).expect("supersede run");
    assert_eq!(counts.children_superseded, 2);
    assert_eq!(
        count_rows(&connection, "SELECT COUNT(*) FROM perforations").expect("count"),
        1
    );
}

#[test]
fn text_example_round_trips_into_the_store() {
    let rules = RuleSet::new().expect("compile rules");
    let text = "API No.\n1234567890\nTotal depth\n5000\n";
    let aggregate = extract_aggregate(&rules, text);

    let mut connection = test_connection();
    persist_aggregate(&mut connection, &aggregate, false).expect("persist");

    let (api, total_depth): (String, i64) = connection
        .query_row(
            "SELECT w.api, i.total_depth FROM wells w JOIN well_info i ON i.api = w.api",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("well row");
    assert_eq!(api, "1234567890");
    assert_eq!(total_depth, 5000);
}

#[test]
fn mine_source_rejects_unsupported_extensions() {
    let result = mine_source(
        std::path::Path::new("filing.txt"),
        crate::cli::SourceKind::Auto,
    );
    let error = result.expect_err("unsupported extension must fail");
    assert!(error.to_string().contains("unsupported filing extension"));
}
