pub mod error;
pub mod metadata;
pub mod sink;
pub mod source;
