mod na;
mod stype;
mod value;

pub use na::Na;
pub use stype::{LType, SType};
pub use value::Value;
