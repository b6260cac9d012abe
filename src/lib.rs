//! Ketch - a columnar, memory-mapped data table engine.

pub use ketch_core::{Error, LType, Result, SType, Value};
pub use ketch_io::{open, save};
pub use ketch_models::{Ftrl, FtrlParams};
pub use ketch_storage::{Column, ColumnStats, DataTable, MType, RowIndex, TableColumn};

/// Version of the ketch package.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
