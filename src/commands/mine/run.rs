use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rusqlite::Connection;
use tracing::info;

use crate::cli::{MineArgs, SourceKind};
use crate::commands::inventory::filing_kind;
use crate::model::{MinePaths, MineRunManifest, ToolVersions, WellAggregate};
use crate::util::{
    default_db_path, ensure_directory, filing_sha256, manifest_dir, now_utc_string, run_stamp,
    write_manifest,
};

use super::db_setup::{DB_SCHEMA_VERSION, configure_connection, ensure_schema};
use super::field_extract::require_api;
use super::persist::persist_aggregate;
use super::{mine_pdf, mine_spreadsheet};

pub fn run(args: MineArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", run_stamp(started_ts));

    let cache_root = args.cache_root.clone();
    let manifest_dir = manifest_dir(&cache_root);
    ensure_directory(&manifest_dir)?;

    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| default_db_path(&cache_root));
    let run_manifest_path = args
        .run_manifest_path
        .clone()
        .unwrap_or_else(|| manifest_dir.join(format!("mine_run_{}.json", run_stamp(started_ts))));

    let kind = resolve_kind(&args.source, args.kind)?;

    info!(
        source = %args.source.display(),
        kind = kind.as_str(),
        run_id = %run_id,
        "starting mining run"
    );

    let source_sha256 = filing_sha256(&args.source)?;

    let aggregate = mine_source(&args.source, kind)?;

    let api = require_api(&aggregate)
        .with_context(|| format!("failed to identify a well in {}", args.source.display()))?
        .to_string();

    info!(
        api = %api,
        casings = aggregate.casings.len(),
        perforations = aggregate.perforations.len(),
        plug_schedules = aggregate.plug_schedules.len(),
        "extraction completed"
    );

    let mut connection = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;

    let mut counts = persist_aggregate(&mut connection, &aggregate, args.supersede)
        .context("failed to save mined data to database")?;
    counts.scalar_fields_extracted = count_scalar_fields(&aggregate);
    counts.casings_extracted = aggregate.casings.len();
    counts.perforations_extracted = aggregate.perforations.len();
    counts.plug_schedules_extracted = aggregate.plug_schedules.len();

    let mut warnings = Vec::new();
    if aggregate.casings.is_empty()
        && aggregate.perforations.is_empty()
        && aggregate.plug_schedules.is_empty()
    {
        warnings.push(format!(
            "no casing, perforation, or plug-schedule records extracted from {}",
            args.source.display()
        ));
    }

    let manifest = MineRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: render_mine_command(&args),
        source_kind: kind.as_str().to_string(),
        source_sha256,
        tool_versions: collect_tool_versions()?,
        paths: MinePaths {
            cache_root: cache_root.display().to_string(),
            manifest_dir: manifest_dir.display().to_string(),
            source_path: args.source.display().to_string(),
            db_path: db_path.display().to_string(),
        },
        counts,
        warnings,
        well: aggregate,
    };

    write_manifest(&run_manifest_path, &manifest)?;

    info!(path = %run_manifest_path.display(), "wrote mine run manifest");
    info!(api = %api, run_id = %run_id, "mining run completed");

    Ok(())
}

/// Mine without touching the store: the library seam the run command
/// and tests share.
pub fn mine_source(source: &Path, kind: SourceKind) -> Result<WellAggregate> {
    match resolve_kind(source, kind)? {
        SourceKind::Pdf => mine_pdf(source),
        SourceKind::Spreadsheet => mine_spreadsheet(source),
        SourceKind::Auto => bail!(
            "source kind could not be resolved for {}",
            source.display()
        ),
    }
}

fn resolve_kind(source: &Path, requested: SourceKind) -> Result<SourceKind> {
    if requested != SourceKind::Auto {
        return Ok(requested);
    }

    match filing_kind(source) {
        Some("pdf") => Ok(SourceKind::Pdf),
        Some("spreadsheet") => Ok(SourceKind::Spreadsheet),
        _ => bail!("unsupported filing extension: {}", source.display()),
    }
}

fn count_scalar_fields(aggregate: &WellAggregate) -> usize {
    let info = &aggregate.well_info;
    let location = &aggregate.location;

    [
        aggregate.api.is_some(),
        aggregate.operator_name.is_some(),
        info.district_number.is_some(),
        info.permit_number.is_some(),
        info.well_number.is_some(),
        info.field_name.is_some(),
        info.lease_name.is_some(),
        info.completion_type.is_some(),
        info.total_depth.is_some(),
        info.well_type.is_some(),
        location.county.is_some(),
        location.section.is_some(),
        location.block.is_some(),
        location.survey.is_some(),
        location.distance_from_town.is_some(),
    ]
    .iter()
    .filter(|present| **present)
    .count()
}

fn collect_tool_versions() -> Result<ToolVersions> {
    Ok(ToolVersions {
        rustc: command_version("rustc", &["--version"])?,
        cargo: command_version("cargo", &["--version"])?,
        pdftotext: command_version_optional("pdftotext", &["-v"]),
    })
}

fn command_version(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("failed to run {} {}", program, args.join(" ")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{} {} failed: {}", program, args.join(" "), stderr.trim());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    let version_line = source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .unwrap_or("unknown");

    Ok(version_line.to_string())
}

fn command_version_optional(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}

fn render_mine_command(args: &MineArgs) -> String {
    let mut command = vec![
        "wellmine".to_string(),
        "mine".to_string(),
        args.source.display().to_string(),
        "--cache-root".to_string(),
        args.cache_root.display().to_string(),
    ];

    if let Some(path) = &args.db_path {
        command.push("--db-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.run_manifest_path {
        command.push("--run-manifest-path".to_string());
        command.push(path.display().to_string());
    }
    if args.kind != SourceKind::Auto {
        command.push("--kind".to_string());
        command.push(args.kind.as_str().to_string());
    }
    if args.supersede {
        command.push("--supersede".to_string());
    }

    command.join(" ")
}
