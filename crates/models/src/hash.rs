use ketch_core::{Na, SType};
use ketch_storage::Column;

/// MurmurHash64A.
pub fn murmur2(bytes: &[u8], seed: u64) -> u64 {
    const M: u64 = 0xc6a4_a793_5bd1_e995;
    const R: u32 = 47;

    let mut h = seed ^ (bytes.len() as u64).wrapping_mul(M);

    let mut chunks = bytes.chunks_exact(8);
    for chunk in &mut chunks {
        let mut k = 0u64;
        for (i, &b) in chunk.iter().enumerate() {
            k |= (b as u64) << (8 * i);
        }
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);
        h ^= k;
        h = h.wrapping_mul(M);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut k = 0u64;
        for (i, &b) in tail.iter().enumerate() {
            k |= (b as u64) << (8 * i);
        }
        h ^= k;
        h = h.wrapping_mul(M);
    }

    h ^= h >> R;
    h = h.wrapping_mul(M);
    h ^= h >> R;
    h
}

/// Hashes the elements of one column row by row.
///
/// Booleans and integers hash by value cast to `u64`, so the NA sentinel
/// hashes like any other value. Floats hash by the bit pattern of the value
/// widened to `f64`. Strings hash their bytes with murmur2; an NA string
/// hashes as the offset sentinel.
pub struct RowHasher<'a> {
    col: &'a Column,
}

impl<'a> RowHasher<'a> {
    pub fn new(col: &'a Column) -> RowHasher<'a> {
        RowHasher { col }
    }

    pub fn hash(&self, row: usize) -> u64 {
        match self.col.stype() {
            SType::Bool8 | SType::Int8 => self.col.elem::<i8>(row) as u64,
            SType::Int16 => self.col.elem::<i16>(row) as u64,
            SType::Int32 => self.col.elem::<i32>(row) as u64,
            SType::Int64 => self.col.elem::<i64>(row) as u64,
            SType::Float32 => (self.col.elem::<f32>(row) as f64).to_bits(),
            SType::Float64 => self.col.elem::<f64>(row).to_bits(),
            SType::Str32 => match self.col.str_at(row) {
                Some(s) => murmur2(s.as_bytes(), 0),
                None => i32::NA as u64,
            },
        }
    }
}
