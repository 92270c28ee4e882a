use std::fs;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::model::FilingInventoryManifest;
use crate::util::{count_rows, default_db_path, manifest_dir};

pub fn run(args: StatusArgs) -> Result<()> {
    let inventory_path = manifest_dir(&args.cache_root).join("filing_inventory.json");
    let db_path = default_db_path(&args.cache_root);

    info!(cache_root = %args.cache_root.display(), "status requested");

    if inventory_path.exists() {
        let raw = fs::read(&inventory_path)
            .with_context(|| format!("failed to read {}", inventory_path.display()))?;
        let inventory: FilingInventoryManifest = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", inventory_path.display()))?;

        info!(
            generated_at = %inventory.generated_at,
            filing_count = inventory.filing_count,
            "loaded inventory manifest"
        );
    } else {
        warn!(path = %inventory_path.display(), "inventory manifest missing");
    }

    if db_path.exists() {
        let conn = Connection::open(&db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;

        let wells = count_rows(&conn, "SELECT COUNT(*) FROM wells").unwrap_or(0);
        let casings = count_rows(&conn, "SELECT COUNT(*) FROM casings").unwrap_or(0);
        let perforations = count_rows(&conn, "SELECT COUNT(*) FROM perforations").unwrap_or(0);
        let plug_schedules = count_rows(&conn, "SELECT COUNT(*) FROM plug_schedules").unwrap_or(0);
        let casing_enums = count_rows(&conn, "SELECT COUNT(*) FROM casing_enums").unwrap_or(0);
        let isolation_enums =
            count_rows(&conn, "SELECT COUNT(*) FROM mechanical_isolation_enums").unwrap_or(0);

        info!(
            path = %db_path.display(),
            wells = wells,
            casings = casings,
            perforations = perforations,
            plug_schedules = plug_schedules,
            casing_enums = casing_enums,
            isolation_enums = isolation_enums,
            "database status"
        );
    } else {
        warn!(path = %db_path.display(), "database file missing");
    }

    Ok(())
}
