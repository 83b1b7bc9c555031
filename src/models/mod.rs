pub mod api;
pub mod records;
pub mod report;
