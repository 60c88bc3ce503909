//! Pipeline module - the forecasting stages, in run order

pub mod correlation;
pub mod error;
pub mod features;
pub mod join;
pub mod loader;
pub mod missing;
pub mod model;
pub mod prune;
pub mod split;
pub mod writer;

pub use correlation::*;
pub use error::PipelineError;
pub use features::*;
pub use join::*;
pub use loader::*;
pub use missing::*;
pub use model::*;
pub use prune::*;
pub use split::*;
pub use writer::*;
