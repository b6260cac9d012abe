mod nff;

pub use nff::{MANIFEST_FILE, open, save};
