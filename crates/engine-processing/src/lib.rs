pub mod curation;
pub mod error;
pub mod incremental;
pub mod pipeline;
