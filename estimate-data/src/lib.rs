mod loader;

pub use loader::{FringeConstantLoader, FringeConstantRecord, FringeLoaderError};
