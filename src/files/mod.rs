//! File helpers shared by the stores.
//!
//! - `atomic` - crash-safe whole-file replacement
//! - `naming` - derived file names (checkpoint sidecars, classification outputs)

pub mod atomic;
pub mod naming;

pub use atomic::write_atomic;
pub use naming::{classification_outputs, metadata_path_for, ClassificationPaths};
