mod ftrl;
mod hash;

pub use ftrl::{Ftrl, FtrlParams};
pub use hash::{RowHasher, murmur2};
