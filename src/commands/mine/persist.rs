use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use tracing::debug;

use crate::model::{Location, MineCounts, WellAggregate, WellInfo};
use crate::util::now_utc_string;

use super::field_extract::require_api;

/// Persist one validated aggregate. The whole write sequence runs in a
/// single transaction: a mid-sequence failure rolls back and no
/// partially written well graph remains.
pub(crate) fn persist_aggregate(
    connection: &mut Connection,
    aggregate: &WellAggregate,
    supersede: bool,
) -> Result<MineCounts> {
    let api = require_api(aggregate)?.to_string();
    let mut counts = MineCounts::default();

    let tx = connection
        .transaction()
        .context("failed to begin persistence transaction")?;

    upsert_well(&tx, &api, aggregate.operator_name.as_deref())?;

    if aggregate.well_info.has_any_field() {
        upsert_well_info(&tx, &api, &aggregate.well_info)?;
    }
    if aggregate.location.has_any_field() {
        upsert_location(&tx, &api, &aggregate.location)?;
    }

    if supersede {
        counts.children_superseded = supersede_children(&tx, &api)?;
    }

    for casing in &aggregate.casings {
        let (casing_enum_id, created) = resolve_casing_enum(&tx, &casing.size, &casing.diameter)?;
        if created {
            counts.casing_enums_created += 1;
        } else {
            counts.casing_enums_reused += 1;
        }

        tx.execute(
            "INSERT INTO casings(api, casing_enum_id, top_depth, bottom_depth, cement)
             VALUES(?1, ?2, ?3, ?4, ?5)",
            params![api, casing_enum_id, casing.depth, casing.depth, casing.cement],
        )
        .context("failed to insert casing row")?;
        counts.casings_inserted += 1;
    }

    for perforation in &aggregate.perforations {
        tx.execute(
            "INSERT INTO perforations(api, stage, top_depth, bottom_depth)
             VALUES(?1, ?2, ?3, ?4)",
            params![
                api,
                perforation.stage,
                perforation.top_depth,
                perforation.bottom_depth
            ],
        )
        .context("failed to insert perforation row")?;
        counts.perforations_inserted += 1;
    }

    for plug in &aggregate.plug_schedules {
        let (isolation_enum_id, created) = resolve_isolation_enum(&tx, &plug.isolation_type)?;
        if created {
            counts.isolation_enums_created += 1;
        } else {
            counts.isolation_enums_reused += 1;
        }

        tx.execute(
            "INSERT INTO plug_schedules(api, isolation_enum_id, top_depth, bottom_depth)
             VALUES(?1, ?2, ?3, ?4)",
            params![api, isolation_enum_id, plug.top_depth, plug.bottom_depth],
        )
        .context("failed to insert plug schedule row")?;
        counts.plug_schedules_inserted += 1;
    }

    tx.commit()
        .context("failed to commit persistence transaction")?;

    debug!(
        api = %api,
        casings = counts.casings_inserted,
        perforations = counts.perforations_inserted,
        plug_schedules = counts.plug_schedules_inserted,
        "persisted well graph"
    );

    Ok(counts)
}

fn upsert_well(tx: &Transaction, api: &str, operator_name: Option<&str>) -> Result<()> {
    tx.execute(
        "INSERT INTO wells(api, operator_name, updated_at) VALUES(?1, ?2, ?3)
         ON CONFLICT(api) DO UPDATE SET
           operator_name=COALESCE(excluded.operator_name, wells.operator_name),
           updated_at=excluded.updated_at",
        params![api, operator_name, now_utc_string()],
    )
    .context("failed to upsert well")?;
    Ok(())
}

fn upsert_well_info(tx: &Transaction, api: &str, info: &WellInfo) -> Result<()> {
    tx.execute(
        "INSERT INTO well_info(
           api, district_number, permit_number, well_number, field_name,
           lease_name, completion_type, total_depth, well_type)
         VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(api) DO UPDATE SET
           district_number=excluded.district_number,
           permit_number=excluded.permit_number,
           well_number=excluded.well_number,
           field_name=excluded.field_name,
           lease_name=excluded.lease_name,
           completion_type=excluded.completion_type,
           total_depth=excluded.total_depth,
           well_type=excluded.well_type",
        params![
            api,
            info.district_number,
            info.permit_number,
            info.well_number,
            info.field_name,
            info.lease_name,
            info.completion_type,
            info.total_depth,
            info.well_type
        ],
    )
    .context("failed to upsert well info")?;
    Ok(())
}

fn upsert_location(tx: &Transaction, api: &str, location: &Location) -> Result<()> {
    tx.execute(
        "INSERT INTO locations(api, county, section, block, survey, distance_from_town)
         VALUES(?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(api) DO UPDATE SET
           county=excluded.county,
           section=excluded.section,
           block=excluded.block,
           survey=excluded.survey,
           distance_from_town=excluded.distance_from_town",
        params![
            api,
            location.county,
            location.section,
            location.block,
            location.survey,
            location.distance_from_town
        ],
    )
    .context("failed to upsert location")?;
    Ok(())
}

fn supersede_children(tx: &Transaction, api: &str) -> Result<usize> {
    let mut removed = 0_usize;
    for sql in [
        "DELETE FROM casings WHERE api = ?1",
        "DELETE FROM perforations WHERE api = ?1",
        "DELETE FROM plug_schedules WHERE api = ?1",
    ] {
        removed += tx
            .execute(sql, params![api])
            .context("failed to supersede existing child rows")?;
    }
    Ok(removed)
}

/// Find-or-create a casing lookup row keyed by the diameter pair. The
/// insert ignores a uniqueness conflict and re-selects, so a concurrent
/// run creating the same key first is treated as "already exists".
fn resolve_casing_enum(tx: &Transaction, size: &str, diameter: &str) -> Result<(i64, bool)> {
    let external_diameter = parse_diameter(size);
    let internal_diameter = parse_diameter(diameter);

    if let Some(casing_enum_id) = find_casing_enum(tx, internal_diameter, external_diameter)? {
        return Ok((casing_enum_id, false));
    }

    tx.execute(
        "INSERT INTO casing_enums(internal_diameter, external_diameter, anchor_depth)
         VALUES(?1, ?2, 0)
         ON CONFLICT(internal_diameter, external_diameter) DO NOTHING",
        params![internal_diameter, external_diameter],
    )
    .context("failed to insert casing enum")?;

    let casing_enum_id = find_casing_enum(tx, internal_diameter, external_diameter)?
        .context("casing enum missing after insert")?;
    Ok((casing_enum_id, true))
}

fn find_casing_enum(
    tx: &Transaction,
    internal_diameter: f64,
    external_diameter: f64,
) -> Result<Option<i64>> {
    let found = tx
        .query_row(
            "SELECT casing_enum_id FROM casing_enums
             WHERE internal_diameter = ?1 AND external_diameter = ?2",
            params![internal_diameter, external_diameter],
            |row| row.get(0),
        )
        .optional()
        .context("failed to query casing enums")?;
    Ok(found)
}

fn resolve_isolation_enum(tx: &Transaction, isolation_type: &str) -> Result<(i64, bool)> {
    if let Some(isolation_enum_id) = find_isolation_enum(tx, isolation_type)? {
        return Ok((isolation_enum_id, false));
    }

    tx.execute(
        "INSERT INTO mechanical_isolation_enums(isolation_type) VALUES(?1)
         ON CONFLICT(isolation_type) DO NOTHING",
        params![isolation_type],
    )
    .context("failed to insert isolation enum")?;

    let isolation_enum_id = find_isolation_enum(tx, isolation_type)?
        .context("isolation enum missing after insert")?;
    Ok((isolation_enum_id, true))
}

fn find_isolation_enum(tx: &Transaction, isolation_type: &str) -> Result<Option<i64>> {
    let found = tx
        .query_row(
            "SELECT isolation_enum_id FROM mechanical_isolation_enums WHERE isolation_type = ?1",
            params![isolation_type],
            |row| row.get(0),
        )
        .optional()
        .context("failed to query isolation enums")?;
    Ok(found)
}

/// Diameters are matched as floating point; a size token the form
/// renders non-numerically keys as 0.0 rather than failing the run.
fn parse_diameter(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(0.0)
}
