//! Utility modules shared by the loaders and the scoring pipeline
//!
//! - Lookup: total lookup-with-default for node names absent from training

pub mod lookup;

pub use lookup::lookup_or_default;
