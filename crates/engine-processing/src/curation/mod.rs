pub mod cdc;
pub mod dedup;
pub mod history;
