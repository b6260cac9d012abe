use ketch_core::{Error, LType, Na, Result, SType, Value};

use crate::buffer::{Buffer, Element, MType};
use crate::rowindex::RowIndex;
use crate::stats::ColumnStats;

/// String sections are padded so the offset array starts 8-byte aligned.
const STR_PAD: usize = 8;

/// A single column: a storage type, a row count and the buffer holding the
/// packed elements.
///
/// Fixed-width columns store `nrows` little-endian elements with NA encoded
/// as the type's sentinel. `Str32` columns use a varchar layout: the string
/// bytes first, padded to an 8-byte boundary, then `nrows` i32 offsets
/// starting at byte `offoff`. Offsets are 1-based end positions; a negative
/// offset marks an NA row while preserving the running position, so
/// `start(i) = |off(i-1)| - 1` and `end(i) = off(i) - 1`.
#[derive(Debug, Clone)]
pub struct Column {
    stype: SType,
    nrows: usize,
    buffer: Buffer,
    offoff: Option<usize>,
}

macro_rules! fixed_ctor {
    ($name:ident, $t:ty, $stype:expr) => {
        pub fn $name(values: &[Option<$t>]) -> Column {
            let mut data = Vec::with_capacity(values.len() * std::mem::size_of::<$t>());
            for v in values {
                v.unwrap_or(<$t as Na>::NA).write_le(&mut data);
            }
            Column {
                stype: $stype,
                nrows: values.len(),
                buffer: Buffer::from_vec(data),
                offoff: None,
            }
        }
    };
}

impl Column {
    fixed_ctor!(int8, i8, SType::Int8);
    fixed_ctor!(int16, i16, SType::Int16);
    fixed_ctor!(int32, i32, SType::Int32);
    fixed_ctor!(int64, i64, SType::Int64);
    fixed_ctor!(float32, f32, SType::Float32);
    fixed_ctor!(float64, f64, SType::Float64);

    pub fn bool8(values: &[Option<bool>]) -> Column {
        let mut data = Vec::with_capacity(values.len());
        for v in values {
            let elem: i8 = match v {
                Some(true) => 1,
                Some(false) => 0,
                None => i8::NA,
            };
            elem.write_le(&mut data);
        }
        Column {
            stype: SType::Bool8,
            nrows: values.len(),
            buffer: Buffer::from_vec(data),
            offoff: None,
        }
    }

    pub fn str32<S: AsRef<str>>(values: &[Option<S>]) -> Result<Column> {
        let mut data = Vec::new();
        let mut offsets: Vec<i32> = Vec::with_capacity(values.len());
        let mut prev: i64 = 1;
        for v in values {
            match v {
                Some(s) => {
                    let s = s.as_ref();
                    data.extend_from_slice(s.as_bytes());
                    prev += s.len() as i64;
                    if prev > i32::MAX as i64 {
                        return Err(Error::value(
                            "string column exceeds the 2 GiB str32 capacity",
                        ));
                    }
                    offsets.push(prev as i32);
                }
                None => offsets.push(-(prev as i32)),
            }
        }
        let offoff = data.len().div_ceil(STR_PAD) * STR_PAD;
        data.resize(offoff, 0);
        for off in &offsets {
            off.write_le(&mut data);
        }
        Ok(Column {
            stype: SType::Str32,
            nrows: values.len(),
            buffer: Buffer::from_vec(data),
            offoff: Some(offoff),
        })
    }

    /// Assemble a column over an existing buffer, typically a file mapping.
    ///
    /// This is the trust boundary for bytes coming from disk: dimensions,
    /// offset monotonicity and string UTF-8 are all validated here so element
    /// access can stay check-free afterwards.
    pub fn from_buffer(
        stype: SType,
        nrows: usize,
        buffer: Buffer,
        offoff: Option<usize>,
    ) -> Result<Column> {
        if stype.is_string() {
            let offoff = offoff.ok_or_else(|| {
                Error::format(format!("column of stype {stype} requires offoff meta"))
            })?;
            if offoff % STR_PAD != 0 {
                return Err(Error::format(format!(
                    "offoff {offoff} is not a multiple of {STR_PAD}"
                )));
            }
            let need = offoff + nrows * stype.elem_size();
            if buffer.len() < need {
                return Err(Error::format(format!(
                    "string column needs {need} bytes, buffer has {}",
                    buffer.len()
                )));
            }
            let col = Column {
                stype,
                nrows,
                buffer,
                offoff: Some(offoff),
            };
            col.validate_strings()?;
            Ok(col)
        } else {
            if offoff.is_some() {
                return Err(Error::format(format!(
                    "column of stype {stype} does not take offoff meta"
                )));
            }
            let need = nrows * stype.elem_size();
            if buffer.len() < need {
                return Err(Error::format(format!(
                    "column of stype {stype} needs {need} bytes, buffer has {}",
                    buffer.len()
                )));
            }
            Ok(Column {
                stype,
                nrows,
                buffer,
                offoff: None,
            })
        }
    }

    fn validate_strings(&self) -> Result<()> {
        let offoff = self.offoff.unwrap_or(0);
        let mut prev: u32 = 1;
        for i in 0..self.nrows {
            let off = self.offset_at(i);
            let abs = off.unsigned_abs();
            if abs == 0 {
                return Err(Error::format(format!("zero offset at row {i}")));
            }
            if off < 0 {
                if abs != prev {
                    return Err(Error::format(format!(
                        "NA offset at row {i} does not preserve position"
                    )));
                }
            } else {
                if abs < prev {
                    return Err(Error::format(format!(
                        "offsets decrease at row {i}: {abs} after {prev}"
                    )));
                }
                let start = prev as usize - 1;
                let end = abs as usize - 1;
                if end > offoff {
                    return Err(Error::format(format!(
                        "offset at row {i} points past the string section"
                    )));
                }
                let bytes = &self.buffer.as_bytes()[start..end];
                if std::str::from_utf8(bytes).is_err() {
                    return Err(Error::format(format!("invalid UTF-8 at row {i}")));
                }
                prev = abs;
            }
        }
        Ok(())
    }

    pub fn stype(&self) -> SType {
        self.stype
    }

    pub fn ltype(&self) -> LType {
        self.stype.ltype()
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn mtype(&self) -> MType {
        self.buffer.mtype()
    }

    /// Bytes taken by the column's data.
    pub fn data_size(&self) -> usize {
        self.buffer.len()
    }

    pub(crate) fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Raw bytes of the column's buffer, exactly as persisted on disk.
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    /// String meta: byte position of the offset array, `Str32` only.
    pub fn offoff(&self) -> Option<usize> {
        self.offoff
    }

    /// Read a fixed-width element without NA interpretation.
    ///
    /// Panics if `T` does not match the column's element width or the column
    /// is a string column; callers dispatch on `stype()` first.
    #[inline]
    pub fn elem<T: Element>(&self, row: usize) -> T {
        assert!(
            !self.stype.is_string() && std::mem::size_of::<T>() == self.stype.elem_size(),
            "element type does not match column stype {}",
            self.stype
        );
        self.buffer.get::<T>(row)
    }

    #[inline]
    fn offset_at(&self, row: usize) -> i32 {
        let offoff = self.offoff.unwrap_or(0);
        self.buffer.get_at_byte::<i32>(offoff, row)
    }

    /// String at `row`, or `None` for NA. `Str32` columns only.
    pub fn str_at(&self, row: usize) -> Option<&str> {
        assert!(self.stype.is_string(), "str_at on non-string column");
        assert!(row < self.nrows, "row {row} out of {}", self.nrows);
        let off = self.offset_at(row);
        if off < 0 {
            return None;
        }
        let start = if row == 0 {
            0
        } else {
            self.offset_at(row - 1).unsigned_abs() as usize - 1
        };
        let end = off as usize - 1;
        let bytes = &self.buffer.as_bytes()[start..end];
        // UTF-8 was validated when the column was built or mapped.
        std::str::from_utf8(bytes).ok()
    }

    /// Materialize the element at `row` as a boxed value.
    pub fn value(&self, row: usize) -> Value {
        assert!(row < self.nrows, "row {row} out of {}", self.nrows);
        match self.stype {
            SType::Bool8 => {
                let v: i8 = self.buffer.get(row);
                if v.is_na() {
                    Value::Null
                } else {
                    Value::Bool(v != 0)
                }
            }
            SType::Int8 => int_value(self.buffer.get::<i8>(row) as i64, self.buffer.get::<i8>(row).is_na()),
            SType::Int16 => int_value(self.buffer.get::<i16>(row) as i64, self.buffer.get::<i16>(row).is_na()),
            SType::Int32 => int_value(self.buffer.get::<i32>(row) as i64, self.buffer.get::<i32>(row).is_na()),
            SType::Int64 => int_value(self.buffer.get::<i64>(row), self.buffer.get::<i64>(row).is_na()),
            SType::Float32 => {
                let v: f32 = self.buffer.get(row);
                if v.is_na() {
                    Value::Null
                } else {
                    Value::Real(v as f64)
                }
            }
            SType::Float64 => {
                let v: f64 = self.buffer.get(row);
                if v.is_na() {
                    Value::Null
                } else {
                    Value::Real(v)
                }
            }
            SType::Str32 => match self.str_at(row) {
                Some(s) => Value::Str(s.to_string()),
                None => Value::Null,
            },
        }
    }

    /// Materialize the rows selected by `rows` into a new owned column.
    ///
    /// NA entries in the row index become NA elements.
    pub fn gather(&self, rows: &RowIndex) -> Result<Column> {
        if let Some(max) = rows.max() {
            if max >= self.nrows {
                return Err(Error::value(format!(
                    "row index target {max} out of {} rows",
                    self.nrows
                )));
            }
        }
        match self.stype {
            SType::Bool8 => Ok(self.gather_fixed::<i8>(SType::Bool8, rows)),
            SType::Int8 => Ok(self.gather_fixed::<i8>(SType::Int8, rows)),
            SType::Int16 => Ok(self.gather_fixed::<i16>(SType::Int16, rows)),
            SType::Int32 => Ok(self.gather_fixed::<i32>(SType::Int32, rows)),
            SType::Int64 => Ok(self.gather_fixed::<i64>(SType::Int64, rows)),
            SType::Float32 => Ok(self.gather_fixed::<f32>(SType::Float32, rows)),
            SType::Float64 => Ok(self.gather_fixed::<f64>(SType::Float64, rows)),
            SType::Str32 => {
                let values: Vec<Option<&str>> = rows
                    .iter()
                    .map(|target| target.and_then(|j| self.str_at(j)))
                    .collect();
                Column::str32(&values)
            }
        }
    }

    fn gather_fixed<T: Element>(&self, stype: SType, rows: &RowIndex) -> Column {
        let mut data = Vec::with_capacity(rows.len() * std::mem::size_of::<T>());
        for target in rows.iter() {
            let elem = match target {
                Some(j) => self.buffer.get::<T>(j),
                None => T::NA,
            };
            elem.write_le(&mut data);
        }
        Column {
            stype,
            nrows: rows.len(),
            buffer: Buffer::from_vec(data),
            offoff: None,
        }
    }

    /// Rollup statistics over the column.
    pub fn stats(&self) -> ColumnStats {
        ColumnStats::compute(self)
    }
}

#[inline]
fn int_value(widened: i64, is_na: bool) -> Value {
    if is_na { Value::Null } else { Value::Int(widened) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_columns_encode_na() {
        let col = Column::int32(&[Some(1), None, Some(-7)]);
        assert_eq!(col.stype(), SType::Int32);
        assert_eq!(col.nrows(), 3);
        assert_eq!(col.mtype(), MType::Data);
        assert_eq!(col.value(0), Value::Int(1));
        assert_eq!(col.value(1), Value::Null);
        assert_eq!(col.value(2), Value::Int(-7));
    }

    #[test]
    fn bool_column() {
        let col = Column::bool8(&[Some(true), Some(false), None]);
        assert_eq!(col.value(0), Value::Bool(true));
        assert_eq!(col.value(1), Value::Bool(false));
        assert_eq!(col.value(2), Value::Null);
    }

    #[test]
    fn float_na_is_nan() {
        let col = Column::float64(&[Some(2.5), None]);
        assert_eq!(col.value(0), Value::Real(2.5));
        assert_eq!(col.value(1), Value::Null);
        assert!(col.elem::<f64>(1).is_nan());
    }

    #[test]
    fn string_layout_and_access() {
        let col = Column::str32(&[Some("hello"), None, Some(""), Some("worlds")]).unwrap();
        assert_eq!(col.stype(), SType::Str32);
        assert_eq!(col.str_at(0), Some("hello"));
        assert_eq!(col.str_at(1), None);
        assert_eq!(col.str_at(2), Some(""));
        assert_eq!(col.str_at(3), Some("worlds"));
        assert_eq!(col.value(3), Value::Str("worlds".to_string()));
        // 11 bytes of characters, padded to 16.
        assert_eq!(col.offoff(), Some(16));
    }

    #[test]
    fn string_offsets_follow_sign_convention() {
        let col = Column::str32(&[Some("ab"), None, Some("c")]).unwrap();
        let offoff = col.offoff().unwrap();
        let bytes = col.buffer().as_bytes();
        let off = |i: usize| {
            i32::from_le_bytes(bytes[offoff + 4 * i..offoff + 4 * i + 4].try_into().unwrap())
        };
        assert_eq!(off(0), 3);
        assert_eq!(off(1), -3);
        assert_eq!(off(2), 4);
    }

    #[test]
    fn from_buffer_rejects_short_data() {
        let buf = Buffer::from_vec(vec![0u8; 7]);
        let err = Column::from_buffer(SType::Int64, 1, buf, None).unwrap_err();
        assert!(err.to_string().contains("needs 8 bytes"));
    }

    #[test]
    fn from_buffer_rejects_bad_offsets() {
        // One row claiming to end past the 8-byte string section.
        let mut data = vec![b'a'; 8];
        100i32.write_le(&mut data);
        let buf = Buffer::from_vec(data);
        assert!(Column::from_buffer(SType::Str32, 1, buf, Some(8)).is_err());
    }

    #[test]
    fn from_buffer_rejects_invalid_utf8() {
        let mut data = vec![0xFF, 0xFE, 0, 0, 0, 0, 0, 0];
        3i32.write_le(&mut data);
        let buf = Buffer::from_vec(data);
        let err = Column::from_buffer(SType::Str32, 1, buf, Some(8)).unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn from_buffer_requires_meta_for_strings() {
        let buf = Buffer::from_vec(vec![0u8; 16]);
        assert!(Column::from_buffer(SType::Str32, 1, buf.clone(), None).is_err());
        assert!(Column::from_buffer(SType::Int32, 1, buf, Some(8)).is_err());
    }

    #[test]
    fn gather_fixed_and_na() {
        let col = Column::int64(&[Some(10), Some(20), Some(30)]);
        let ri = RowIndex::from_array(vec![Some(2), None, Some(0), Some(0)]);
        let picked = col.gather(&ri).unwrap();
        assert_eq!(picked.nrows(), 4);
        assert_eq!(picked.value(0), Value::Int(30));
        assert_eq!(picked.value(1), Value::Null);
        assert_eq!(picked.value(2), Value::Int(10));
        assert_eq!(picked.value(3), Value::Int(10));
    }

    #[test]
    fn gather_strings() {
        let col = Column::str32(&[Some("a"), Some("bb"), None]).unwrap();
        let ri = RowIndex::from_slice(2, 3, -1).unwrap();
        let picked = col.gather(&ri).unwrap();
        assert_eq!(picked.str_at(0), None);
        assert_eq!(picked.str_at(1), Some("bb"));
        assert_eq!(picked.str_at(2), Some("a"));
    }

    #[test]
    fn gather_out_of_bounds() {
        let col = Column::int32(&[Some(1)]);
        let ri = RowIndex::from_array(vec![Some(5)]);
        assert!(col.gather(&ri).is_err());
    }
}
