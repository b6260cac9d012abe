use std::sync::Arc;

use indexmap::IndexMap;
use itertools::Itertools;
use ketch_core::{Error, Result, SType, Value};
use log::trace;

use crate::column::Column;
use crate::rowindex::RowIndex;
use crate::stats::ColumnStats;

/// One column slot inside a frame: either materialized data or, inside a
/// view, a reference to a column of the source frame by position.
#[derive(Debug, Clone)]
pub enum TableColumn {
    Data(Column),
    View { srcindex: usize, stype: SType },
}

impl TableColumn {
    pub fn stype(&self) -> SType {
        match self {
            TableColumn::Data(col) => col.stype(),
            TableColumn::View { stype, .. } => *stype,
        }
    }

    pub fn is_view(&self) -> bool {
        matches!(self, TableColumn::View { .. })
    }

    /// The materialized column, if this slot holds one.
    pub fn data(&self) -> Option<&Column> {
        match self {
            TableColumn::Data(col) => Some(col),
            TableColumn::View { .. } => None,
        }
    }
}

/// A two-dimensional frame of named, equally long columns.
///
/// A frame is either plain, or a view: it then holds a reference to a plain
/// source frame plus a row index describing which source rows are selected.
/// The source of a view is never itself a view, so row resolution is at most
/// one hop.
#[derive(Debug, Clone)]
pub struct DataTable {
    nrows: usize,
    columns: IndexMap<String, TableColumn>,
    source: Option<Arc<DataTable>>,
    rowindex: Option<RowIndex>,
}

impl DataTable {
    /// Build a plain frame from named data columns.
    ///
    /// Names must be unique and non-empty; all columns must have the same
    /// number of rows. A frame with zero columns has zero rows.
    pub fn new(columns: Vec<(String, Column)>) -> Result<DataTable> {
        if columns.iter().any(|(n, _)| n.is_empty()) {
            return Err(Error::value("column names must be non-empty"));
        }
        if let Some(dup) = columns.iter().map(|(n, _)| n).duplicates().next() {
            return Err(Error::value(format!("duplicate column name '{dup}'")));
        }
        let nrows = columns.first().map_or(0, |(_, c)| c.nrows());
        for (name, col) in &columns {
            if col.nrows() != nrows {
                return Err(Error::value(format!(
                    "column '{name}' has {} rows, expected {nrows}",
                    col.nrows()
                )));
            }
        }
        Ok(DataTable {
            nrows,
            columns: columns
                .into_iter()
                .map(|(n, c)| (n, TableColumn::Data(c)))
                .collect(),
            source: None,
            rowindex: None,
        })
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.keys().map(|s| s.as_str()).collect()
    }

    pub fn name_at(&self, idx: usize) -> Option<&str> {
        self.columns.get_index(idx).map(|(n, _)| n.as_str())
    }

    pub fn column(&self, idx: usize) -> Option<&TableColumn> {
        self.columns.get_index(idx).map(|(_, c)| c)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&TableColumn> {
        self.columns.get(name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.get_index_of(name)
    }

    pub fn is_view(&self) -> bool {
        self.source.is_some()
    }

    pub fn source(&self) -> Option<&Arc<DataTable>> {
        self.source.as_ref()
    }

    pub fn rowindex(&self) -> Option<&RowIndex> {
        self.rowindex.as_ref()
    }

    /// The cell at `(row, col)`, resolved through view indirection.
    ///
    /// `None` when the position is out of range; NA cells read as
    /// `Value::Null`.
    pub fn cell(&self, row: usize, col: usize) -> Option<Value> {
        if row >= self.nrows {
            return None;
        }
        match self.column(col)? {
            TableColumn::Data(column) => Some(column.value(row)),
            TableColumn::View { srcindex, .. } => {
                let source = self.source.as_ref()?;
                let rowindex = self.rowindex.as_ref()?;
                let srccol = source.column(*srcindex)?.data()?;
                match rowindex.get(row) {
                    Some(srcrow) => Some(srccol.value(srcrow)),
                    None => Some(Value::Null),
                }
            }
        }
    }

    pub fn cell_by_name(&self, row: usize, name: &str) -> Option<Value> {
        self.cell(row, self.column_index(name)?)
    }

    /// All cells of one row, in column order.
    pub fn row(&self, row: usize) -> Option<Vec<Value>> {
        if row >= self.nrows {
            return None;
        }
        (0..self.ncols()).map(|c| self.cell(row, c)).collect()
    }

    /// Select rows and (optionally) columns, producing a view.
    ///
    /// Selecting from a plain frame wraps it as the view's source. Selecting
    /// from a view composes the row indexes against the base frame, so the
    /// one-hop invariant is preserved: data columns held by the view are
    /// gathered, view columns keep pointing at the base.
    pub fn select(&self, rows: &RowIndex, cols: Option<&[usize]>) -> Result<DataTable> {
        if let Some(max) = rows.max() {
            if max >= self.nrows {
                return Err(Error::value(format!(
                    "row index target {max} out of {} rows",
                    self.nrows
                )));
            }
        }
        let selected: Vec<usize> = match cols {
            Some(indices) => {
                for &idx in indices {
                    if idx >= self.ncols() {
                        return Err(Error::value(format!(
                            "column index {idx} out of {} columns",
                            self.ncols()
                        )));
                    }
                }
                if let Some(dup) = indices.iter().duplicates().next() {
                    return Err(Error::value(format!(
                        "column {dup} selected more than once"
                    )));
                }
                indices.to_vec()
            }
            None => (0..self.ncols()).collect(),
        };
        trace!(
            "select: {} rows, {} of {} columns",
            rows.len(),
            selected.len(),
            self.ncols()
        );

        let (source, rowindex) = match (&self.source, &self.rowindex) {
            (Some(source), Some(rowindex)) => (Arc::clone(source), rowindex.compose(rows)),
            _ => (Arc::new(self.clone()), rows.clone()),
        };

        let mut columns = IndexMap::with_capacity(selected.len());
        for idx in selected {
            let (name, slot) = self
                .columns
                .get_index(idx)
                .ok_or_else(|| Error::value(format!("column index {idx} out of range")))?;
            let slot = match slot {
                TableColumn::Data(col) if self.is_view() => {
                    // A materialized column inside a view is indexed by the
                    // incoming positions directly, not through the base.
                    TableColumn::Data(col.gather(rows)?)
                }
                TableColumn::Data(col) => TableColumn::View {
                    srcindex: idx,
                    stype: col.stype(),
                },
                TableColumn::View { srcindex, stype } => TableColumn::View {
                    srcindex: *srcindex,
                    stype: *stype,
                },
            };
            columns.insert(name.clone(), slot);
        }

        Ok(DataTable {
            nrows: rows.len(),
            columns,
            source: Some(source),
            rowindex: Some(rowindex),
        })
    }

    /// Flatten a view into a plain frame; plain frames are cloned as-is.
    pub fn materialize(&self) -> Result<DataTable> {
        let (source, rowindex) = match (&self.source, &self.rowindex) {
            (Some(source), Some(rowindex)) => (source, rowindex),
            _ => return Ok(self.clone()),
        };
        let mut columns = IndexMap::with_capacity(self.ncols());
        for (name, slot) in &self.columns {
            let col = match slot {
                TableColumn::Data(col) => col.clone(),
                TableColumn::View { srcindex, .. } => {
                    let srccol = source
                        .column(*srcindex)
                        .and_then(TableColumn::data)
                        .ok_or_else(|| {
                            Error::value(format!("view column '{name}' has no source data"))
                        })?;
                    srccol.gather(rowindex)?
                }
            };
            columns.insert(name.clone(), TableColumn::Data(col));
        }
        Ok(DataTable {
            nrows: self.nrows,
            columns,
            source: None,
            rowindex: None,
        })
    }

    /// Rollup statistics for one column, materializing it if the frame is a
    /// view.
    pub fn column_stats(&self, name: &str) -> Result<ColumnStats> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| Error::column_not_found(name))?;
        match self.column(idx) {
            Some(TableColumn::Data(col)) => Ok(col.stats()),
            Some(TableColumn::View { srcindex, .. }) => {
                let source = self.source.as_ref().ok_or_else(|| {
                    Error::value(format!("view column '{name}' outside a view frame"))
                })?;
                let rowindex = self
                    .rowindex
                    .as_ref()
                    .ok_or_else(|| Error::value("view frame without a row index"))?;
                let srccol = source
                    .column(*srcindex)
                    .and_then(TableColumn::data)
                    .ok_or_else(|| {
                        Error::value(format!("view column '{name}' has no source data"))
                    })?;
                Ok(srccol.gather(rowindex)?.stats())
            }
            None => Err(Error::column_not_found(name)),
        }
    }
}
