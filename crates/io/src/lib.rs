pub mod merges;
pub mod tsv;
pub mod xlsx;

pub use xlsx::{load_workbook, LoadResult};
