use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::info;

use crate::cli::InventoryArgs;
use crate::model::{FilingEntry, FilingInventoryManifest};
use crate::util::{filing_sha256, manifest_dir, now_utc_string, write_manifest};

pub fn run(args: InventoryArgs) -> Result<()> {
    let source_dir = args.source_dir.unwrap_or_else(|| args.cache_root.clone());
    let manifest = build_manifest(&source_dir)?;

    if args.dry_run {
        info!(
            filing_count = manifest.filing_count,
            source = %manifest.source_directory,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| manifest_dir(&args.cache_root).join("filing_inventory.json"));

    write_manifest(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(filing_count = manifest.filing_count, "inventory completed");

    Ok(())
}

pub fn build_manifest(source_dir: &Path) -> Result<FilingInventoryManifest> {
    let api_pattern =
        Regex::new(r"(\d{10,14})").context("failed to compile filename API pattern")?;

    let mut filing_paths = discover_filings(source_dir)?;
    filing_paths.sort();

    if filing_paths.is_empty() {
        bail!("no filings found in {}", source_dir.display());
    }

    let mut filings = Vec::with_capacity(filing_paths.len());
    for path in filing_paths {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

        let kind = filing_kind(&path)
            .with_context(|| format!("unsupported filing extension: {}", path.display()))?;
        let api_hint = api_pattern
            .captures(&filename)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string());
        let sha256 = filing_sha256(&path)?;

        filings.push(FilingEntry {
            filename,
            kind: kind.to_string(),
            api_hint,
            sha256,
        });
    }

    filings.sort_by(|a, b| a.filename.cmp(&b.filename));

    Ok(FilingInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: source_dir.display().to_string(),
        filing_count: filings.len(),
        filings,
    })
}

pub fn filing_kind(path: &Path) -> Option<&'static str> {
    let extension = path.extension().and_then(|ext| ext.to_str())?;

    if extension.eq_ignore_ascii_case("pdf") {
        Some("pdf")
    } else if extension.eq_ignore_ascii_case("xlsx") || extension.eq_ignore_ascii_case("xls") {
        Some("spreadsheet")
    } else {
        None
    }
}

fn discover_filings(source_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut filings = Vec::new();

    let entries = fs::read_dir(source_dir)
        .with_context(|| format!("failed to read {}", source_dir.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", source_dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        if filing_kind(&path).is_some() {
            filings.push(path);
        }
    }

    Ok(filings)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;

    fn scratch_dir(label: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "wellmine_inventory_{}_{}",
            label,
            std::process::id()
        ));
        fs::create_dir_all(&dir).expect("create scratch dir");
        dir
    }

    #[test]
    fn filing_kind_accepts_only_supported_extensions() {
        assert_eq!(filing_kind(Path::new("w2.pdf")), Some("pdf"));
        assert_eq!(filing_kind(Path::new("w2.PDF")), Some("pdf"));
        assert_eq!(filing_kind(Path::new("w2.xlsx")), Some("spreadsheet"));
        assert_eq!(filing_kind(Path::new("w2.xls")), Some("spreadsheet"));
        assert_eq!(filing_kind(Path::new("w2.txt")), None);
        assert_eq!(filing_kind(Path::new("w2")), None);
    }

    #[test]
    fn build_manifest_records_kind_and_api_hint() {
        let dir = scratch_dir("hints");
        fs::write(dir.join("w2_4212345678.pdf"), b"%PDF-1.4").expect("write pdf");
        fs::write(dir.join("legacy_filing.xlsx"), b"stub workbook").expect("write xlsx");
        fs::write(dir.join("notes.txt"), b"ignored").expect("write txt");

        let manifest = build_manifest(&dir).expect("build manifest");
        fs::remove_dir_all(&dir).ok();

        assert_eq!(manifest.filing_count, 2);

        let pdf = manifest
            .filings
            .iter()
            .find(|filing| filing.filename.ends_with(".pdf"))
            .expect("pdf entry");
        assert_eq!(pdf.kind, "pdf");
        assert_eq!(pdf.api_hint.as_deref(), Some("4212345678"));
        assert!(!pdf.sha256.is_empty());

        let sheet = manifest
            .filings
            .iter()
            .find(|filing| filing.filename.ends_with(".xlsx"))
            .expect("spreadsheet entry");
        assert_eq!(sheet.kind, "spreadsheet");
        assert_eq!(sheet.api_hint, None);
    }

    #[test]
    fn build_manifest_fails_when_no_filings_present() {
        let dir = scratch_dir("empty");

        let result = build_manifest(&dir);
        fs::remove_dir_all(&dir).ok();

        let error = result.expect_err("empty directory must fail");
        assert!(error.to_string().contains("no filings found"));
    }
}
