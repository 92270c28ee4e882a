pub mod inventory;
pub mod mine;
pub mod status;
