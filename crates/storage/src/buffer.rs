use std::sync::Arc;

use ketch_core::Na;
use memmap2::Mmap;

/// Memory type of a column buffer: heap-allocated data or a file mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MType {
    Data,
    Mapped,
}

/// A fixed-width element that can live in a column buffer.
///
/// Elements are stored packed and little-endian. Reads go through
/// `read_unaligned` because mapped string sections place the offset array at
/// an 8-byte boundary while owned buffers give no alignment promise at all.
pub trait Element: Na + Copy + 'static {
    fn write_le(&self, out: &mut Vec<u8>);
}

macro_rules! impl_element {
    ($($t:ty),*) => {
        $(impl Element for $t {
            #[inline]
            fn write_le(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        })*
    };
}

impl_element!(i8, i16, i32, i64, f32, f64);

/// The memory behind one column.
///
/// Cloning is cheap in both variants; mapped buffers stay alive for as long
/// as any column references them.
#[derive(Debug, Clone)]
pub enum Buffer {
    Owned(Arc<Vec<u8>>),
    Mapped(Arc<Mmap>),
}

impl Buffer {
    pub fn from_vec(data: Vec<u8>) -> Self {
        Buffer::Owned(Arc::new(data))
    }

    pub fn from_mmap(map: Mmap) -> Self {
        Buffer::Mapped(Arc::new(map))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Buffer::Owned(v) => v,
            Buffer::Mapped(m) => m,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    pub fn mtype(&self) -> MType {
        match self {
            Buffer::Owned(_) => MType::Data,
            Buffer::Mapped(_) => MType::Mapped,
        }
    }

    /// Read the `index`-th element of type `T`.
    ///
    /// Panics if the element lies outside the buffer; callers are expected to
    /// have validated dimensions at construction time.
    #[inline]
    pub fn get<T: Element>(&self, index: usize) -> T {
        let size = std::mem::size_of::<T>();
        let bytes = self.as_bytes();
        let start = index * size;
        assert!(
            start + size <= bytes.len(),
            "element read out of range: index {index} in buffer of {} bytes",
            bytes.len()
        );
        // Bounds checked above; unaligned read keeps mapped buffers safe.
        unsafe { bytes.as_ptr().add(start).cast::<T>().read_unaligned() }
    }

    /// Read an element starting at an explicit byte offset.
    #[inline]
    pub fn get_at_byte<T: Element>(&self, byte_offset: usize, index: usize) -> T {
        let size = std::mem::size_of::<T>();
        let bytes = self.as_bytes();
        let start = byte_offset + index * size;
        assert!(
            start + size <= bytes.len(),
            "element read out of range: byte {start} in buffer of {} bytes",
            bytes.len()
        );
        unsafe { bytes.as_ptr().add(start).cast::<T>().read_unaligned() }
    }
}
