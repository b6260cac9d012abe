use ketch_core::{LType, Na, SType};

use crate::buffer::Element;
use crate::column::Column;

/// Rollup statistics for one column.
///
/// Numeric aggregates are computed in `f64` and absent for string columns or
/// when every element is NA.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub nrows: usize,
    pub na_count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub sum: Option<f64>,
    pub mean: Option<f64>,
}

impl ColumnStats {
    pub(crate) fn compute(col: &Column) -> ColumnStats {
        match col.stype() {
            SType::Bool8 | SType::Int8 => numeric::<i8>(col, |v| v as f64),
            SType::Int16 => numeric::<i16>(col, |v| v as f64),
            SType::Int32 => numeric::<i32>(col, |v| v as f64),
            SType::Int64 => numeric::<i64>(col, |v| v as f64),
            SType::Float32 => numeric::<f32>(col, |v| v as f64),
            SType::Float64 => numeric::<f64>(col, |v| v),
            SType::Str32 => {
                let na_count = (0..col.nrows()).filter(|&i| col.str_at(i).is_none()).count();
                ColumnStats {
                    nrows: col.nrows(),
                    na_count,
                    min: None,
                    max: None,
                    sum: None,
                    mean: None,
                }
            }
        }
    }

    pub fn valid_count(&self) -> usize {
        self.nrows - self.na_count
    }
}

fn numeric<T: Element>(col: &Column, widen: impl Fn(T) -> f64) -> ColumnStats {
    debug_assert!(col.ltype() != LType::String);
    let mut na_count = 0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for row in 0..col.nrows() {
        let v = col.elem::<T>(row);
        if v.is_na() {
            na_count += 1;
            continue;
        }
        let x = widen(v);
        min = min.min(x);
        max = max.max(x);
        sum += x;
    }
    let valid = col.nrows() - na_count;
    if valid == 0 {
        ColumnStats {
            nrows: col.nrows(),
            na_count,
            min: None,
            max: None,
            sum: None,
            mean: None,
        }
    } else {
        ColumnStats {
            nrows: col.nrows(),
            na_count,
            min: Some(min),
            max: Some(max),
            sum: Some(sum),
            mean: Some(sum / valid as f64),
        }
    }
}
