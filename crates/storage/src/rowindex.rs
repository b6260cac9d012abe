use ketch_core::{Error, Result};

/// A selection of rows over a source frame.
///
/// Either a strided slice or an explicit array of targets. Array entries may
/// be NA (`None`); every column reads NA at such rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowIndex {
    Slice {
        start: usize,
        count: usize,
        step: isize,
    },
    Array(Vec<Option<usize>>),
}

impl RowIndex {
    pub fn from_slice(start: usize, count: usize, step: isize) -> Result<RowIndex> {
        if count > 0 && step < 0 {
            let last = start as i128 + (count as i128 - 1) * step as i128;
            if last < 0 {
                return Err(Error::value(format!(
                    "slice [{start};{count};{step}] runs below row 0"
                )));
            }
        }
        Ok(RowIndex::Slice { start, count, step })
    }

    pub fn from_array(targets: Vec<Option<usize>>) -> RowIndex {
        RowIndex::Array(targets)
    }

    pub fn len(&self) -> usize {
        match self {
            RowIndex::Slice { count, .. } => *count,
            RowIndex::Array(targets) => targets.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Source row selected at position `i`, or `None` for an NA entry.
    ///
    /// Panics if `i >= len()`.
    #[inline]
    pub fn get(&self, i: usize) -> Option<usize> {
        match self {
            RowIndex::Slice { start, count, step } => {
                assert!(i < *count, "row index position {i} out of {count}");
                Some((*start as isize + i as isize * *step) as usize)
            }
            RowIndex::Array(targets) => {
                assert!(
                    i < targets.len(),
                    "row index position {i} out of {}",
                    targets.len()
                );
                targets[i]
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<usize>> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    /// Largest selected source row, ignoring NA entries.
    pub fn max(&self) -> Option<usize> {
        match self {
            RowIndex::Slice { start, count, step } => {
                if *count == 0 {
                    None
                } else if *step >= 0 {
                    Some((*start as isize + (*count as isize - 1) * *step) as usize)
                } else {
                    Some(*start)
                }
            }
            RowIndex::Array(targets) => targets.iter().filter_map(|t| *t).max(),
        }
    }

    /// Index the rows selected by `self` with `other`.
    ///
    /// The result selects, at position `i`, the row `self` selects at position
    /// `other.get(i)`. Positions in `other` must lie within `self.len()`;
    /// slice-over-slice composition stays a slice.
    pub fn compose(&self, other: &RowIndex) -> RowIndex {
        if let (
            RowIndex::Slice {
                start: s1,
                count: c1,
                step: t1,
            },
            RowIndex::Slice {
                start: s2,
                count: c2,
                step: t2,
            },
        ) = (self, other)
        {
            debug_assert!(*c2 == 0 || other.max().map_or(true, |m| m < *c1));
            let start = (*s1 as isize + *s2 as isize * *t1) as usize;
            return RowIndex::Slice {
                start,
                count: *c2,
                step: *t1 * *t2,
            };
        }
        let targets = (0..other.len())
            .map(|i| other.get(i).and_then(|j| self.get(j)))
            .collect();
        RowIndex::Array(targets)
    }
}
