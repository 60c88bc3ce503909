//! Report module - run summary and JSON artifacts

pub mod export;
pub mod summary;

pub use export::*;
pub use summary::*;
