//! Report assemblers and stores.

pub mod file_store;
pub mod json;

pub use file_store::FileReportStore;
pub use json::JsonReportAssembler;
