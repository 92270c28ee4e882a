use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "wellmine",
    version,
    about = "Well completion filing extraction and persistence tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inventory(InventoryArgs),
    Mine(MineArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long, default_value = ".cache/wellmine")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MineArgs {
    /// Source filing to mine (PDF form or spreadsheet).
    pub source: PathBuf,

    #[arg(long, default_value = ".cache/wellmine")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub run_manifest_path: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = SourceKind::Auto)]
    pub kind: SourceKind,

    /// Replace the well's previously stored casing, perforation, and
    /// plug-schedule rows instead of appending to them.
    #[arg(long, default_value_t = false)]
    pub supersede: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum SourceKind {
    Auto,
    Pdf,
    Spreadsheet,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Pdf => "pdf",
            Self::Spreadsheet => "spreadsheet",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/wellmine")]
    pub cache_root: PathBuf,
}
