use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};

use crate::model::WellAggregate;

use super::field_extract::extract_aggregate;
use super::rules::RuleSet;

/// Mine one PDF filing: flatten its decoded text and run the rule
/// tables over it. The page/line structure of the PDF is irrelevant to
/// the label rules, so page boundaries are discarded.
pub fn mine_pdf(pdf_path: &Path) -> Result<WellAggregate> {
    let text = flatten_pdf_text(pdf_path)
        .with_context(|| format!("failed to mine PDF {}", pdf_path.display()))?;
    let rules = RuleSet::new()?;

    Ok(extract_aggregate(&rules, &text))
}

/// Source adapter for the PDF path: extract every page's text layer
/// with pdftotext and concatenate the pages into one continuous string.
pub(crate) fn flatten_pdf_text(pdf_path: &Path) -> Result<String> {
    let pages = extract_pages_with_pdftotext(pdf_path)?;
    Ok(pages.join("\n"))
}

fn extract_pages_with_pdftotext(pdf_path: &Path) -> Result<Vec<String>> {
    let output = Command::new("pdftotext")
        .arg("-enc")
        .arg("UTF-8")
        .arg(pdf_path)
        .arg("-")
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    let mut pages: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    while let Some(last_page) = pages.last() {
        if last_page.trim().is_empty() {
            pages.pop();
            continue;
        }
        break;
    }

    Ok(pages)
}
