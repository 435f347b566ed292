//! Display preparation

mod folding;

pub use folding::{fold, DEFAULT_FOLD_WIDTH, DEFAULT_MARKER};
