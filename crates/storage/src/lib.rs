mod buffer;
mod column;
mod rowindex;
mod stats;
mod table;

pub use buffer::{Buffer, Element, MType};
pub use column::Column;
pub use rowindex::RowIndex;
pub use stats::ColumnStats;
pub use table::{DataTable, TableColumn};
