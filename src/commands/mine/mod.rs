mod db_setup;
mod field_extract;
mod persist;
mod rules;
mod run;
mod sheet_extract;
#[cfg(test)]
mod tests;
mod text_extract;

pub use run::{mine_source, run};
pub use sheet_extract::mine_spreadsheet;
pub use text_extract::mine_pdf;
